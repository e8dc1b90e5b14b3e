//! Video capture: raw RGBA frames from a file or FIFO, reduced to sensor
//! readings on a fixed cadence.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dynaview::sensor::{SensorExtractor, SensorParams, SensorReading};
use dynaview::time::{Instant, RateLimiter};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::CaptureConfig;
use crate::error::ConsoleError;

/// Fixed-size frames read back to back from a byte stream.
pub struct FrameSource<R = File> {
    reader: R,
    buf: Vec<u8>,
}

impl FrameSource<File> {
    pub async fn open(path: &Path, frame_len: usize) -> Result<Self, ConsoleError> {
        let file = File::open(path)
            .await
            .map_err(|source| ConsoleError::CaptureUnavailable {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(file, frame_len))
    }
}

impl<R: AsyncRead + Unpin> FrameSource<R> {
    pub fn new(reader: R, frame_len: usize) -> Self {
        Self {
            reader,
            buf: vec![0; frame_len],
        }
    }

    /// The next whole frame, or `None` once the source is exhausted.
    pub async fn next_frame(&mut self) -> Result<Option<&[u8]>, ConsoleError> {
        match self.reader.read_exact(&mut self.buf).await {
            Ok(_) => Ok(Some(&self.buf)),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Where readings go. The writer task holds the receiving side.
pub type ReadingSlot = Arc<watch::Sender<Option<SensorReading>>>;

/// A running capture loop. Dropping it clears the enable flag; the loop
/// notices at the top of its next iteration.
pub struct Capture {
    path: PathBuf,
    enabled: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl Capture {
    pub async fn start(
        cfg: &CaptureConfig,
        sensor: SensorParams,
        send_interval: Duration,
        slot: ReadingSlot,
    ) -> Result<Self, ConsoleError> {
        let path = cfg.path.clone().ok_or(ConsoleError::CaptureNotConfigured)?;
        let source = FrameSource::open(&path, cfg.frame_len()).await?;
        info!(
            "Capture started: {:?} ({}x{} @ {} fps)",
            path, cfg.width, cfg.height, cfg.fps
        );

        let enabled = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(capture_loop(
            source,
            SensorExtractor::new(sensor),
            RateLimiter::new(send_interval),
            cfg.frame_period(),
            Arc::clone(&enabled),
            slot,
        ));

        Ok(Self {
            path,
            enabled,
            task,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// False once the loop has ended on its own (source exhausted or failed).
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        self.enabled.store(false, Ordering::Release);
    }
}

async fn capture_loop<R: AsyncRead + Unpin>(
    mut source: FrameSource<R>,
    mut extractor: SensorExtractor,
    mut limiter: RateLimiter,
    period: Duration,
    enabled: Arc<AtomicBool>,
    slot: ReadingSlot,
) {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut frames = 0u64;
    while enabled.load(Ordering::Acquire) {
        ticker.tick().await;

        let frame = match source.next_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!("Capture source exhausted after {} frames", frames);
                break;
            }
            Err(e) => {
                warn!("Capture read failed: {}", e);
                break;
            }
        };
        frames += 1;

        let reading = extractor.extract(frame);
        if enabled.load(Ordering::Acquire) && limiter.try_acquire(Instant::now()) {
            slot.send_replace(Some(reading));
        }
    }

    debug!("Capture loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(pixels: usize, v: u8) -> Vec<u8> {
        (0..pixels).flat_map(|_| [v, v, v, 255]).collect()
    }

    #[tokio::test]
    async fn frame_source_yields_whole_frames_only() {
        let mut bytes = solid(4, 10);
        bytes.extend(solid(4, 20));
        bytes.extend([1, 2, 3]);

        let mut src = FrameSource::new(&bytes[..], 16);
        assert_eq!(src.next_frame().await.unwrap().unwrap()[0], 10);
        assert_eq!(src.next_frame().await.unwrap().unwrap()[0], 20);
        assert!(src.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn loop_publishes_readings_until_source_ends() {
        let mut bytes = solid(4, 0);
        bytes.extend(solid(4, 255));
        let (tx, mut rx) = watch::channel(None);
        let enabled = Arc::new(AtomicBool::new(true));

        capture_loop(
            FrameSource::new(&bytes[..], 16),
            SensorExtractor::default(),
            RateLimiter::new(Duration::ZERO),
            Duration::from_millis(1),
            Arc::clone(&enabled),
            Arc::new(tx),
        )
        .await;

        let reading = rx.borrow_and_update().unwrap();
        assert!(reading.brightness > 0.99);
        assert!(reading.motion > 0.99);
    }

    #[tokio::test]
    async fn cleared_flag_stops_before_reading() {
        let bytes = solid(4, 100);
        let (tx, rx) = watch::channel(None);
        let enabled = Arc::new(AtomicBool::new(false));

        capture_loop(
            FrameSource::new(&bytes[..], 16),
            SensorExtractor::default(),
            RateLimiter::new(Duration::ZERO),
            Duration::from_millis(1),
            enabled,
            Arc::new(tx),
        )
        .await;

        assert!(rx.borrow().is_none());
    }

    #[tokio::test]
    async fn start_reports_missing_source() {
        let cfg = CaptureConfig {
            path: Some(std::env::temp_dir().join("dynaview-no-such-camera.rgba")),
            ..CaptureConfig::default()
        };
        let (tx, _rx) = watch::channel(None);
        let err = Capture::start(&cfg, SensorParams::default(), Duration::ZERO, Arc::new(tx))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ConsoleError::CaptureUnavailable { .. }));

        let (tx, _rx) = watch::channel(None);
        let err = Capture::start(
            &CaptureConfig::default(),
            SensorParams::default(),
            Duration::ZERO,
            Arc::new(tx),
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, ConsoleError::CaptureNotConfigured));
    }
}
