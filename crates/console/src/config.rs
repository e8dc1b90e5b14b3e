//! Console configuration: a JSON document with every field optional, overridden
//! by command-line flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dynaview::protocol::{ControlKey, ControlParams};
use dynaview::pulse::PulseClock;
use dynaview::render::RenderParams;
use dynaview::sensor::{SensorParams, CAPTURE_HEIGHT, CAPTURE_WIDTH};
use serde::{Deserialize, Serialize};

use crate::error::ConsoleError;

pub const DEFAULT_ADDR: &str = "127.0.0.1:8765";

/// Sensor readings go upstream at most once per this many milliseconds.
pub const MIN_SENSOR_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaptureConfig {
    /// File or FIFO delivering raw RGBA frames back to back.
    pub path: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Start capturing as soon as a session opens.
    pub autostart: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            path: None,
            width: CAPTURE_WIDTH,
            height: CAPTURE_HEIGHT,
            fps: 30,
            autostart: false,
        }
    }
}

impl CaptureConfig {
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    pub fn frame_period(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.fps.max(1) as u64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConsoleConfig {
    pub addr: String,
    pub reconnect_delay_ms: u64,
    /// Longest accepted inbound line.
    pub max_line_bytes: usize,
    pub render: RenderParams,
    pub pulse_clock: PulseClock,
    /// Write `scene.svg`/`chart.svg` every N snapshots; 0 disables output.
    pub svg_every: u64,
    /// Output directory for rendered frames; defaults to the data directory.
    pub out_dir: Option<PathBuf>,
    pub controls: ControlParams,
    pub sensor: SensorParams,
    pub sensor_interval_ms: u64,
    pub capture: CaptureConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            reconnect_delay_ms: 1500,
            max_line_bytes: 8 * 1024 * 1024,
            render: RenderParams::default(),
            pulse_clock: PulseClock::default(),
            svg_every: 15,
            out_dir: None,
            controls: ControlParams::default(),
            sensor: SensorParams::default(),
            sensor_interval_ms: 100,
            capture: CaptureConfig::default(),
        }
    }
}

fn check(ok: bool, what: &str) -> Result<(), ConsoleError> {
    if ok {
        Ok(())
    } else {
        Err(ConsoleError::Config(what.to_string()))
    }
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

impl ConsoleConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConsoleError> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text).map_err(|source| ConsoleError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConsoleError> {
        check(!self.addr.trim().is_empty(), "addr must not be empty")?;
        check(self.max_line_bytes > 0, "max_line_bytes must be positive")?;

        let r = &self.render;
        check(
            positive(r.scene_width) && positive(r.scene_height),
            "render.scene_width/scene_height must be positive",
        )?;
        check(
            positive(r.chart_width) && positive(r.chart_height),
            "render.chart_width/chart_height must be positive",
        )?;
        check(r.history_len > 0, "render.history_len must be positive")?;

        let f = &r.fit;
        check(f.ema > 0.0 && f.ema <= 1.0, "render.fit.ema must be in (0, 1]")?;
        check(
            f.padding >= 0.0 && f.padding < 0.5,
            "render.fit.padding must be in [0, 0.5)",
        )?;
        check(
            positive(f.scale_min) && f.scale_max.is_finite() && f.scale_max >= f.scale_min,
            "render.fit.scale_min must be positive and not above scale_max",
        )?;
        check(positive(f.ref_width), "render.fit.ref_width must be positive")?;

        let e = &r.edges;
        check(
            positive(e.weight_scale) && e.gain.is_finite(),
            "render.edges.weight_scale must be positive",
        )?;
        check(
            e.min_width.is_finite() && e.max_width.is_finite() && e.min_width <= e.max_width,
            "render.edges.min_width must not exceed max_width",
        )?;
        check(
            r.nodes.core_radius.is_finite()
                && r.nodes.halo_radius.is_finite()
                && r.nodes.core_radius >= 0.0
                && r.nodes.halo_radius >= 0.0,
            "render.nodes radii must be non-negative",
        )?;

        match self.pulse_clock {
            PulseClock::Arrival { max_dt } => {
                check(positive(max_dt), "pulse_clock.max_dt must be positive")?
            }
            PulseClock::Fixed { hz } => check(positive(hz), "pulse_clock.hz must be positive")?,
        }

        for key in ControlKey::all() {
            check(
                self.controls.get(*key).is_finite(),
                &format!("controls.{} must be finite", key.label()),
            )?;
        }

        check(
            self.sensor.motion_gain.is_finite() && self.sensor.motion_gain >= 0.0,
            "sensor.motion_gain must be non-negative",
        )?;
        check(
            self.sensor_interval_ms >= MIN_SENSOR_INTERVAL_MS,
            &format!("sensor_interval_ms must be at least {MIN_SENSOR_INTERVAL_MS}"),
        )?;
        let c = &self.capture;
        check(
            c.width > 0 && c.height > 0,
            "capture.width/height must be positive",
        )?;
        check(
            (1..=240).contains(&c.fps),
            "capture.fps must be in 1..=240",
        )?;
        Ok(())
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn sensor_interval(&self) -> Duration {
        Duration::from_millis(self.sensor_interval_ms)
    }
}

/// Command-line overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliArgs {
    pub addr: Option<String>,
    pub config: Option<PathBuf>,
    pub camera: Option<PathBuf>,
    pub out: Option<PathBuf>,
}

pub fn usage() -> &'static str {
    "dynaview-console [--addr host:port] [--config file.json] [--camera rgba-source] [--out dir]\n\
     \n\
     Operator commands (stdin):\n\
     \x20 set <speed_dt|pull_k|edge_threshold|alpha|beta|gamma> <value>\n\
     \x20 freeze | reset | camera | status | quit"
}

impl CliArgs {
    pub fn parse_from<I: IntoIterator<Item = String>>(args: I) -> Result<Self, String> {
        let mut out = CliArgs::default();
        let mut it = args.into_iter();
        while let Some(flag) = it.next() {
            let mut value = || {
                it.next()
                    .ok_or_else(|| format!("{flag} requires a value"))
            };
            match flag.as_str() {
                "--addr" => out.addr = Some(value()?),
                "--config" => out.config = Some(PathBuf::from(value()?)),
                "--camera" => out.camera = Some(PathBuf::from(value()?)),
                "--out" => out.out = Some(PathBuf::from(value()?)),
                other => return Err(format!("unknown argument '{other}'")),
            }
        }
        Ok(out)
    }

    pub fn apply(&self, cfg: &mut ConsoleConfig) {
        if let Some(addr) = &self.addr {
            cfg.addr = addr.clone();
        }
        if let Some(camera) = &self.camera {
            cfg.capture.path = Some(camera.clone());
        }
        if let Some(out) = &self.out {
            cfg.out_dir = Some(out.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = ConsoleConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.reconnect_delay(), Duration::from_millis(1500));
        assert_eq!(cfg.sensor_interval(), Duration::from_millis(100));
        assert_eq!(cfg.render.edges.weight_scale, 3.2e7);
        assert_eq!(cfg.sensor.motion_gain, 3.0);
        assert_eq!(cfg.capture.frame_len(), 320 * 240 * 4);
    }

    #[test]
    fn partial_document_fills_defaults() {
        let cfg: ConsoleConfig = serde_json::from_str(
            r#"{"addr":"10.0.0.2:9000","render":{"scene_width":1280,"fit":{"padding":0.05}},"pulse_clock":{"mode":"fixed","hz":30}}"#,
        )
        .unwrap();
        assert_eq!(cfg.addr, "10.0.0.2:9000");
        assert_eq!(cfg.render.scene_width, 1280.0);
        assert_eq!(cfg.render.scene_height, 600.0);
        assert_eq!(cfg.render.fit.padding, 0.05);
        assert_eq!(cfg.render.fit.ema, 0.15);
        assert_eq!(cfg.pulse_clock, PulseClock::Fixed { hz: 30.0 });
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_invalid_values() {
        let mut cfg = ConsoleConfig::default();
        cfg.render.scene_width = 0.0;
        assert!(matches!(cfg.validate(), Err(ConsoleError::Config(_))));

        let mut cfg = ConsoleConfig::default();
        cfg.render.fit.scale_max = 0.1;
        assert!(cfg.validate().is_err());

        let mut cfg = ConsoleConfig::default();
        cfg.controls.alpha = f64::NAN;
        assert!(cfg.validate().is_err());

        let mut cfg = ConsoleConfig::default();
        cfg.capture.fps = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = ConsoleConfig::default();
        cfg.sensor_interval_ms = 0;
        assert!(matches!(cfg.validate(), Err(ConsoleError::Config(_))));
        cfg.sensor_interval_ms = 99;
        assert!(cfg.validate().is_err());
        cfg.sensor_interval_ms = 250;
        cfg.validate().unwrap();
    }

    #[test]
    fn missing_file_means_defaults() {
        let path = std::env::temp_dir().join("dynaview-console-test-missing.json");
        let _ = fs::remove_file(&path);
        assert_eq!(ConsoleConfig::load(&path).unwrap(), ConsoleConfig::default());
    }

    #[test]
    fn malformed_file_reports_path() {
        let path = std::env::temp_dir().join(format!(
            "dynaview-console-test-bad-{}.json",
            std::process::id()
        ));
        fs::write(&path, "{ not json").unwrap();
        let err = ConsoleConfig::load(&path).unwrap_err();
        let _ = fs::remove_file(&path);
        assert!(matches!(err, ConsoleError::ConfigParse { .. }));
    }

    #[test]
    fn cli_flags_override_config() {
        let cli = CliArgs::parse_from(args(&["--addr", "1.2.3.4:5", "--camera", "/tmp/cam.fifo"]))
            .unwrap();
        let mut cfg = ConsoleConfig::default();
        cli.apply(&mut cfg);
        assert_eq!(cfg.addr, "1.2.3.4:5");
        assert_eq!(cfg.capture.path, Some(PathBuf::from("/tmp/cam.fifo")));
        assert_eq!(cfg.out_dir, None);

        assert!(CliArgs::parse_from(args(&["--addr"])).is_err());
        assert!(CliArgs::parse_from(args(&["--bogus"])).is_err());
    }
}
