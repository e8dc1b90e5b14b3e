//! Dynaview Console - live observation console for a remote simulation
//!
//! The console keeps one connection to the simulation open and:
//! - Fits and renders every snapshot (scene + trend chart, written as SVG)
//! - Sends control parameters on connect and on every operator change
//! - Optionally feeds sensor readings from a raw RGBA capture source upstream
//!
//! When the connection drops, all session state is discarded and the console
//! reconnects after a fixed delay.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dynaview::prelude::*;
use dynaview::render::svg;
use dynaview::time::Instant;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

mod capture;
mod config;
mod error;
mod link;
mod operator;
mod paths;

use capture::{Capture, ReadingSlot};
use config::{CliArgs, ConsoleConfig};
use error::ConsoleError;
use link::{Link, LinkEvent};
use operator::{OperatorCommand, OperatorInput};
use paths::AppPaths;

// ═══════════════════════════════════════════════════════════════════════════
// Output
// ═══════════════════════════════════════════════════════════════════════════

/// Replace `path` with `contents` via a sibling temp file and a rename.
fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let tmp = path.with_extension("svg.tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}

struct SvgOutput {
    dir: PathBuf,
    every: u64,
    failed: bool,
}

impl SvgOutput {
    fn new(dir: PathBuf, every: u64) -> Self {
        Self {
            dir,
            every,
            failed: false,
        }
    }

    fn due(&self, frames: u64) -> bool {
        self.every > 0 && frames % self.every == 0
    }

    fn write(&mut self, rendered: &Rendered) {
        let draw = |frame: &Frame| {
            svg::render(frame).map_err(|e| std::io::Error::other(e.to_string()))
        };
        let result = fs::create_dir_all(&self.dir)
            .and_then(|_| write_atomic(&AppPaths::scene_file(&self.dir), &draw(&rendered.scene)?))
            .and_then(|_| write_atomic(&AppPaths::chart_file(&self.dir), &draw(&rendered.chart)?));

        match result {
            Ok(()) => {
                if self.failed {
                    info!("SVG output to {:?} recovered", self.dir);
                    self.failed = false;
                }
            }
            Err(e) => {
                // Warn once per failure streak.
                if !self.failed {
                    warn!("Could not write SVG output to {:?}: {}", self.dir, e);
                    self.failed = true;
                }
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Session
// ═══════════════════════════════════════════════════════════════════════════

enum SessionEnd {
    Closed,
    Quit,
}

/// Everything that lives exactly as long as one connection.
struct Session {
    viewport: Viewport,
    clock: ArrivalClock,
    capture: Option<Capture>,
    upstream_controls: Option<ControlParams>,
}

impl Session {
    fn new(cfg: &ConsoleConfig) -> Self {
        Self {
            viewport: Viewport::new(cfg.render),
            clock: ArrivalClock::new(),
            capture: None,
            upstream_controls: None,
        }
    }

    fn reset(&mut self) {
        self.viewport.reset();
        self.clock.reset();
    }
}

/// State that survives reconnects.
struct Console {
    cfg: ConsoleConfig,
    controls: Controls,
    readings: ReadingSlot,
    output: SvgOutput,
    /// Set when the capture source could not be opened; autostart stays off
    /// until the operator asks for the camera again.
    capture_failed: bool,
}

impl Console {
    fn new(cfg: ConsoleConfig, out_dir: PathBuf) -> Self {
        let (readings, _) = watch::channel(None);
        Self {
            controls: Controls::new(cfg.controls),
            output: SvgOutput::new(out_dir, cfg.svg_every),
            readings: Arc::new(readings),
            capture_failed: false,
            cfg,
        }
    }

    async fn run_session(
        &mut self,
        operator: &mut OperatorInput,
    ) -> Result<SessionEnd, ConsoleError> {
        let stream = link::connect(&self.cfg.addr).await?;
        info!("Connected to {}", self.cfg.addr);

        let mut link = Link::open(stream, self.cfg.max_line_bytes, self.readings.subscribe());
        let mut session = Session::new(&self.cfg);

        link.send(self.controls.message()).await;
        self.autostart_capture(&mut session).await;

        loop {
            tokio::select! {
                event = link.next_event() => match event {
                    LinkEvent::Inbound(msg) => self.on_inbound(&mut session, msg),
                    LinkEvent::Closed(None) => {
                        info!("Connection closed by peer");
                        return Ok(SessionEnd::Closed);
                    }
                    LinkEvent::Closed(Some(e)) => {
                        warn!("Connection lost: {}", e);
                        return Ok(SessionEnd::Closed);
                    }
                },
                cmd = operator.recv() => {
                    if let OperatorCommand::Quit = cmd {
                        return Ok(SessionEnd::Quit);
                    }
                    self.on_operator(&mut session, &link, cmd).await;
                }
            }
        }
    }

    fn on_inbound(&mut self, session: &mut Session, msg: Inbound) {
        match msg {
            Inbound::Snapshot(snap) => {
                let measured = session.clock.mark(Instant::now());
                let dt = self.cfg.pulse_clock.step(measured);
                let rendered = session.viewport.render(&snap, dt);
                debug!(
                    "snapshot #{}: nodes={} edges={} scale={:.3} pulse={:.3}",
                    session.viewport.frames(),
                    snap.emb.len(),
                    rendered.scene.lines().count(),
                    rendered.transform.scale,
                    rendered.pulse
                );
                if self.output.due(session.viewport.frames()) {
                    self.output.write(&rendered);
                }
            }
            Inbound::Reset => {
                info!("Simulation reset; re-seeding viewport");
                session.reset();
            }
            Inbound::Control(params) => {
                debug!("Simulation reports controls {:?}", params);
                session.upstream_controls = Some(params);
            }
            Inbound::Ignored(kind) => warn!("Ignoring message of type '{}'", kind),
        }
    }

    async fn on_operator(&mut self, session: &mut Session, link: &Link, cmd: OperatorCommand) {
        match cmd {
            OperatorCommand::Set(key, value) => {
                self.controls.params.set(key, value);
                info!("{} = {}", key.label(), value);
                link.send(self.controls.message()).await;
            }
            OperatorCommand::Freeze => {
                let frozen = self.controls.toggle_freeze();
                info!("Flow {}", if frozen { "frozen" } else { "resumed" });
                link.send(self.controls.message()).await;
            }
            OperatorCommand::Reset => {
                link.send(Command::Reset).await;
                session.reset();
                info!("Reset sent");
            }
            OperatorCommand::Camera => {
                self.capture_failed = false;
                self.toggle_capture(session).await;
            }
            OperatorCommand::Status => self.log_status(session),
            // Handled by the session loop.
            OperatorCommand::Quit => {}
        }
    }

    async fn autostart_capture(&mut self, session: &mut Session) {
        if self.cfg.capture.autostart && !self.capture_failed {
            self.toggle_capture(session).await;
        }
    }

    async fn toggle_capture(&mut self, session: &mut Session) {
        if let Some(capture) = session.capture.take() {
            if capture.is_running() {
                info!("Capture stopped ({:?})", capture.path());
                return;
            }
            // The previous loop already ended; start a fresh one.
        }

        match Capture::start(
            &self.cfg.capture,
            self.cfg.sensor,
            self.cfg.sensor_interval(),
            Arc::clone(&self.readings),
        )
        .await
        {
            Ok(capture) => session.capture = Some(capture),
            Err(e) => {
                warn!("Capture disabled: {}", e);
                self.capture_failed = true;
            }
        }
    }

    fn log_status(&self, session: &Session) {
        let vp = &session.viewport;
        let t = vp.fit().transform();
        info!(
            "frames={} fitted={} scale={:.3} offset=({:.1}, {:.1}) pulse_amp={:.3} history={}",
            vp.frames(),
            vp.fit().is_initialized(),
            t.scale,
            t.offset_x,
            t.offset_y,
            vp.pulse().amplitude(),
            vp.history().len()
        );
        let history = vp.history();
        if let (Some(drift), Some(entropy)) = (history.drift().last(), history.entropy().last()) {
            info!("drift={:.4} entropy={:.4}", drift, entropy);
        }
        info!(
            "controls={:?} frozen={} capture={}",
            self.controls.params,
            self.controls.frozen,
            session.capture.as_ref().is_some_and(Capture::is_running)
        );
        if let Some(upstream) = &session.upstream_controls {
            info!("simulation controls={:?}", upstream);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Entry point
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = match CliArgs::parse_from(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{e}\n\n{}", config::usage());
            std::process::exit(2);
        }
    };

    let paths = AppPaths::new()?;
    let config_file = cli.config.clone().unwrap_or_else(|| paths.config_file());
    let mut cfg = ConsoleConfig::load(&config_file)?;
    cli.apply(&mut cfg);
    cfg.validate()?;
    info!("Configuration loaded from {:?}", config_file);

    let out_dir = cfg
        .out_dir
        .clone()
        .unwrap_or_else(|| paths.data_dir().clone());
    info!("Rendering to {:?} every {} snapshots", out_dir, cfg.svg_every);

    // Exit promptly on Ctrl-C even while a connect attempt is pending.
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C: exiting");
            std::process::exit(0);
        }
    });

    let mut operator = OperatorInput::spawn_stdin();
    let mut console = Console::new(cfg, out_dir);

    loop {
        match console.run_session(&mut operator).await {
            Ok(SessionEnd::Quit) => break,
            Ok(SessionEnd::Closed) => {}
            Err(e) => error!("Session failed: {}", e),
        }

        let delay = console.cfg.reconnect_delay();
        info!("Reconnecting in {:?}", delay);
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => break,
                cmd = operator.recv() => match cmd {
                    OperatorCommand::Quit => return Ok(()),
                    OperatorCommand::Set(key, value) => {
                        console.controls.params.set(key, value);
                        info!("{} = {} (sent on reconnect)", key.label(), value);
                    }
                    OperatorCommand::Freeze => {
                        console.controls.toggle_freeze();
                    }
                    _ => info!("Not connected"),
                }
            }
        }
    }

    info!("Bye");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};

    fn console(cfg: ConsoleConfig) -> Console {
        Console::new(
            ConsoleConfig {
                svg_every: 0,
                ..cfg
            },
            std::env::temp_dir(),
        )
    }

    fn snapshot(shift: f64) -> Inbound {
        Inbound::Snapshot(Snapshot {
            emb: vec![[shift, 0.0], [shift + 4.0, 3.0]],
            edges: vec![Edge(0.0, 1.0, 1.0e7)],
            drift: Some(0.5),
            entropy: Some(1.0),
        })
    }

    #[test]
    fn inbound_reset_reseeds_the_viewport() {
        let mut console = console(ConsoleConfig::default());
        let mut session = Session::new(&console.cfg);

        console.on_inbound(&mut session, snapshot(0.0));
        console.on_inbound(&mut session, snapshot(1.0));
        assert!(session.viewport.fit().is_initialized());
        assert_eq!(session.viewport.history().len(), 2);

        console.on_inbound(&mut session, Inbound::Reset);
        assert!(!session.viewport.fit().is_initialized());
        assert!(session.viewport.history().is_empty());
        assert_eq!(session.viewport.frames(), 0);

        console.on_inbound(&mut session, snapshot(10.0));
        assert!(session.viewport.fit().is_initialized());
        assert_eq!(session.viewport.history().len(), 1);
    }

    #[tokio::test]
    async fn operator_reset_goes_upstream_and_resets_locally() {
        let mut console = console(ConsoleConfig::default());
        let mut session = Session::new(&console.cfg);
        let (client, server) = tokio::io::duplex(4096);
        let (read_half, write_half) = tokio::io::split(client);
        let link = Link::from_halves(read_half, write_half, 1 << 16, console.readings.subscribe());
        let mut lines = BufReader::new(server).lines();

        console.on_inbound(&mut session, snapshot(0.0));
        console
            .on_operator(&mut session, &link, OperatorCommand::Reset)
            .await;

        let sent: serde_json::Value =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(sent, serde_json::json!({"type": "reset"}));
        assert!(!session.viewport.fit().is_initialized());
        assert!(session.viewport.history().is_empty());
    }

    #[tokio::test]
    async fn unavailable_capture_is_not_retried_on_reconnect() {
        let source = std::env::temp_dir().join(format!(
            "dynaview-console-autostart-{}.rgba",
            std::process::id()
        ));
        let _ = fs::remove_file(&source);

        let mut cfg = ConsoleConfig::default();
        cfg.capture.path = Some(source.clone());
        cfg.capture.autostart = true;
        let mut console = console(cfg);

        let mut session = Session::new(&console.cfg);
        console.autostart_capture(&mut session).await;
        assert!(session.capture.is_none());
        assert!(console.capture_failed);

        // The source appears, but a new session does not try again on its own.
        fs::write(&source, vec![0u8; console.cfg.capture.frame_len()]).unwrap();
        let mut session = Session::new(&console.cfg);
        console.autostart_capture(&mut session).await;
        assert!(session.capture.is_none());

        // An explicit camera toggle does.
        let (client, _server) = tokio::io::duplex(4096);
        let (read_half, write_half) = tokio::io::split(client);
        let link = Link::from_halves(read_half, write_half, 1 << 16, console.readings.subscribe());
        console
            .on_operator(&mut session, &link, OperatorCommand::Camera)
            .await;
        assert!(session.capture.is_some());
        assert!(!console.capture_failed);

        drop(session);
        let _ = fs::remove_file(&source);
    }
}
