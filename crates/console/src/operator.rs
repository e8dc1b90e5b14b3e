//! Operator commands typed on stdin.

use std::str::FromStr;

use dynaview::protocol::ControlKey;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperatorCommand {
    Set(ControlKey, f64),
    Freeze,
    Reset,
    Camera,
    Status,
    Quit,
}

impl FromStr for OperatorCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err("empty command".to_string());
        };

        let cmd = match verb.to_ascii_lowercase().as_str() {
            "set" => {
                let key: ControlKey = words
                    .next()
                    .ok_or("usage: set <key> <value>")?
                    .parse()?;
                let raw = words.next().ok_or("usage: set <key> <value>")?;
                let value: f64 = raw
                    .parse()
                    .map_err(|_| format!("{} must be a number, got '{raw}'", key.label()))?;
                if !value.is_finite() {
                    return Err(format!("{} must be finite", key.label()));
                }
                OperatorCommand::Set(key, value)
            }
            "freeze" => OperatorCommand::Freeze,
            "reset" => OperatorCommand::Reset,
            "camera" => OperatorCommand::Camera,
            "status" => OperatorCommand::Status,
            "quit" | "exit" => OperatorCommand::Quit,
            other => return Err(format!("unknown command '{other}'")),
        };

        match words.next() {
            Some(extra) => Err(format!("unexpected argument '{extra}'")),
            None => Ok(cmd),
        }
    }
}

/// Parsed stdin commands. Survives reconnects; once stdin closes it never
/// yields again.
pub struct OperatorInput {
    rx: mpsc::Receiver<OperatorCommand>,
}

impl OperatorInput {
    pub fn spawn_stdin() -> Self {
        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        match line.parse::<OperatorCommand>() {
                            Ok(cmd) => {
                                if tx.send(cmd).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!("{}", e),
                        }
                    }
                    Ok(None) => {
                        info!("stdin closed; operator commands disabled");
                        break;
                    }
                    Err(e) => {
                        warn!("stdin read failed: {}", e);
                        break;
                    }
                }
            }
        });
        Self { rx }
    }

    pub fn from_channel(rx: mpsc::Receiver<OperatorCommand>) -> Self {
        Self { rx }
    }

    pub async fn recv(&mut self) -> OperatorCommand {
        match self.rx.recv().await {
            Some(cmd) => cmd,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_set() {
        assert_eq!(
            "set pull_k 0.03".parse::<OperatorCommand>().unwrap(),
            OperatorCommand::Set(ControlKey::PullK, 0.03)
        );
        assert_eq!(
            "  SET   alpha   -1.5 ".parse::<OperatorCommand>().unwrap(),
            OperatorCommand::Set(ControlKey::Alpha, -1.5)
        );
    }

    #[test]
    fn rejects_bad_set() {
        assert!("set".parse::<OperatorCommand>().is_err());
        assert!("set pull_k".parse::<OperatorCommand>().is_err());
        assert!("set nope 1".parse::<OperatorCommand>().is_err());
        assert!("set gamma abc".parse::<OperatorCommand>().is_err());
        assert!("set gamma NaN".parse::<OperatorCommand>().is_err());
        assert!("set gamma 1 2".parse::<OperatorCommand>().is_err());
    }

    #[test]
    fn parses_plain_verbs() {
        let cases = [
            ("freeze", OperatorCommand::Freeze),
            ("reset", OperatorCommand::Reset),
            ("camera", OperatorCommand::Camera),
            ("status", OperatorCommand::Status),
            ("quit", OperatorCommand::Quit),
        ];
        for (line, want) in cases {
            assert_eq!(line.parse::<OperatorCommand>().unwrap(), want);
        }
        assert!("dance".parse::<OperatorCommand>().is_err());
        assert!("".parse::<OperatorCommand>().is_err());
        assert!("reset now".parse::<OperatorCommand>().is_err());
    }

    #[tokio::test]
    async fn closed_input_stays_pending() {
        let (tx, rx) = mpsc::channel(1);
        let mut input = OperatorInput::from_channel(rx);
        tx.send(OperatorCommand::Status).await.unwrap();
        drop(tx);
        assert_eq!(input.recv().await, OperatorCommand::Status);

        let waited =
            tokio::time::timeout(std::time::Duration::from_millis(20), input.recv()).await;
        assert!(waited.is_err());
    }
}
