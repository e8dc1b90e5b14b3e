//! Connection to the simulation: newline-delimited JSON over one TCP stream.
//!
//! The read half and the write half each run in their own task. Decoded
//! messages and the end of the connection arrive on one event channel, so the
//! session loop sees them strictly in arrival order.

use dynaview::protocol::{Command, Inbound};
use dynaview::sensor::SensorReading;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, warn};

use crate::error::ConsoleError;

const EVENT_QUEUE: usize = 256;
const COMMAND_QUEUE: usize = 64;

#[derive(Debug)]
pub enum LinkEvent {
    Inbound(Inbound),
    /// The connection is gone. `None` means the peer closed it cleanly.
    Closed(Option<ConsoleError>),
}

pub async fn connect(addr: &str) -> Result<TcpStream, ConsoleError> {
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// A live connection. Dropping it stops both halves.
pub struct Link {
    commands: mpsc::Sender<Command>,
    events: mpsc::Receiver<LinkEvent>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Link {
    pub fn open(
        stream: TcpStream,
        max_line_bytes: usize,
        sensor: watch::Receiver<Option<SensorReading>>,
    ) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self::from_halves(read_half, write_half, max_line_bytes, sensor)
    }

    pub fn from_halves<R, W>(
        read_half: R,
        write_half: W,
        max_line_bytes: usize,
        sensor: watch::Receiver<Option<SensorReading>>,
    ) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (event_tx, events) = mpsc::channel(EVENT_QUEUE);
        let (commands, command_rx) = mpsc::channel(COMMAND_QUEUE);

        let reader = tokio::spawn(read_loop(read_half, max_line_bytes, event_tx.clone()));
        let writer = tokio::spawn(async move {
            if let Err(e) = write_loop(write_half, command_rx, sensor).await {
                let _ = event_tx.send(LinkEvent::Closed(Some(e))).await;
            }
        });

        Self {
            commands,
            events,
            reader,
            writer,
        }
    }

    /// Queue a command for the writer. Returns false once the writer is gone.
    pub async fn send(&self, cmd: Command) -> bool {
        self.commands.send(cmd).await.is_ok()
    }

    pub async fn next_event(&mut self) -> LinkEvent {
        self.events
            .recv()
            .await
            .unwrap_or(LinkEvent::Closed(None))
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

async fn read_loop<R>(read_half: R, max_line_bytes: usize, events: mpsc::Sender<LinkEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = FramedRead::new(read_half, LinesCodec::new_with_max_length(max_line_bytes));

    let reason = loop {
        match lines.next().await {
            Some(Ok(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match Inbound::decode(line) {
                    Ok(msg) => {
                        if events.send(LinkEvent::Inbound(msg)).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => warn!("Skipping undecodable line ({} bytes): {}", line.len(), e),
                }
            }
            // The framed stream ends after any codec error, over-long lines included.
            Some(Err(e)) => break Some(ConsoleError::from(e)),
            None => break None,
        }
    };

    let _ = events.send(LinkEvent::Closed(reason)).await;
}

async fn write_loop<W>(
    write_half: W,
    mut commands: mpsc::Receiver<Command>,
    mut sensor: watch::Receiver<Option<SensorReading>>,
) -> Result<(), ConsoleError>
where
    W: AsyncWrite + Unpin,
{
    let mut sink = FramedWrite::new(write_half, LinesCodec::new());
    let mut sensor_open = true;

    loop {
        let cmd = tokio::select! {
            cmd = commands.recv() => match cmd {
                Some(cmd) => cmd,
                None => break,
            },
            changed = sensor.changed(), if sensor_open => {
                if changed.is_err() {
                    sensor_open = false;
                    continue;
                }
                // Only the newest reading is ever pending.
                let reading = *sensor.borrow_and_update();
                match reading {
                    Some(payload) => Command::Sensor { payload },
                    None => continue,
                }
            }
        };
        debug!("-> {:?}", cmd);
        sink.send(cmd.encode()?).await?;
    }

    Ok(())
}
