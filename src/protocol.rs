//! JSON wire messages exchanged with the simulation server.
//!
//! One JSON object per message. Commands carry a `type` tag; snapshots are any
//! object without one that carries `emb`, `edges`, `drift` and `entropy`.

use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize};
#[cfg(feature = "serde")]
use std::borrow::Cow;

use crate::sensor::SensorReading;

/// Simulation parameters the operator can steer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControlParams {
    pub speed_dt: f64,
    pub pull_k: f64,
    pub edge_threshold: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl Default for ControlParams {
    fn default() -> Self {
        Self {
            speed_dt: 0.02,
            pull_k: 0.01,
            edge_threshold: 0.06,
            alpha: 0.20,
            beta: 0.05,
            gamma: 0.10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKey {
    SpeedDt,
    PullK,
    EdgeThreshold,
    Alpha,
    Beta,
    Gamma,
}

impl ControlKey {
    pub fn all() -> &'static [ControlKey] {
        &[
            ControlKey::SpeedDt,
            ControlKey::PullK,
            ControlKey::EdgeThreshold,
            ControlKey::Alpha,
            ControlKey::Beta,
            ControlKey::Gamma,
        ]
    }

    pub fn label(self) -> &'static str {
        match self {
            ControlKey::SpeedDt => "speed_dt",
            ControlKey::PullK => "pull_k",
            ControlKey::EdgeThreshold => "edge_threshold",
            ControlKey::Alpha => "alpha",
            ControlKey::Beta => "beta",
            ControlKey::Gamma => "gamma",
        }
    }
}

impl FromStr for ControlKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ControlKey::all()
            .iter()
            .copied()
            .find(|k| k.label() == s)
            .ok_or_else(|| format!("unknown control '{s}'"))
    }
}

impl ControlParams {
    pub fn get(&self, key: ControlKey) -> f64 {
        match key {
            ControlKey::SpeedDt => self.speed_dt,
            ControlKey::PullK => self.pull_k,
            ControlKey::EdgeThreshold => self.edge_threshold,
            ControlKey::Alpha => self.alpha,
            ControlKey::Beta => self.beta,
            ControlKey::Gamma => self.gamma,
        }
    }

    pub fn set(&mut self, key: ControlKey, value: f64) {
        let slot = match key {
            ControlKey::SpeedDt => &mut self.speed_dt,
            ControlKey::PullK => &mut self.pull_k,
            ControlKey::EdgeThreshold => &mut self.edge_threshold,
            ControlKey::Alpha => &mut self.alpha,
            ControlKey::Beta => &mut self.beta,
            ControlKey::Gamma => &mut self.gamma,
        };
        *slot = value;
    }
}

/// Operator-side control state: the configured parameters plus the flow freeze.
///
/// While frozen the outbound `speed_dt` is 0; the configured value is kept and
/// sent again on unfreeze.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Controls {
    pub params: ControlParams,
    pub frozen: bool,
}

impl Controls {
    pub fn new(params: ControlParams) -> Self {
        Self {
            params,
            frozen: false,
        }
    }

    pub fn toggle_freeze(&mut self) -> bool {
        self.frozen = !self.frozen;
        self.frozen
    }

    /// Parameters as they go on the wire.
    pub fn effective(&self) -> ControlParams {
        let mut p = self.params;
        if self.frozen {
            p.speed_dt = 0.0;
        }
        p
    }

    pub fn message(&self) -> Command {
        Command::Control {
            payload: self.effective(),
        }
    }
}

/// `[src, dst, weight]`. Indices arrive as JSON numbers and are validated against
/// the node count at draw time.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Edge(
    #[cfg_attr(feature = "serde", serde(deserialize_with = "nan_if_null"))] pub f64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "nan_if_null"))] pub f64,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "nan_if_null"))] pub f64,
);

impl Edge {
    pub fn weight(&self) -> f64 {
        self.2
    }

    /// Endpoint indices if both are whole, non-negative and below `nodes`.
    pub fn endpoints(&self, nodes: usize) -> Option<(usize, usize)> {
        let idx = |v: f64| {
            (v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v < nodes as f64)
                .then_some(v as usize)
        };
        Some((idx(self.0)?, idx(self.1)?))
    }
}

/// One state update from the simulation.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Snapshot {
    #[cfg_attr(feature = "serde", serde(deserialize_with = "points_nan_if_null"))]
    pub emb: Vec<[f64; 2]>,
    pub edges: Vec<Edge>,
    pub drift: Option<f64>,
    pub entropy: Option<f64>,
}

/// Tagged command messages. Sent by the console; `control` and `reset` may also
/// arrive from the server.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum Command {
    Control {
        #[cfg_attr(feature = "serde", serde(default))]
        payload: ControlParams,
    },
    Reset,
    Sensor {
        payload: SensorReading,
    },
}

#[cfg(feature = "serde")]
impl Command {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A decoded server → console message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Control(ControlParams),
    Reset,
    Snapshot(Snapshot),
    /// A tagged message the console has no use for.
    Ignored(String),
}

// Non-finite numbers arrive as `null` (JSON.stringify) or as bare `NaN` /
// `Infinity` tokens (Python json.dumps). Both decode to NaN so the render loop
// skips the value instead of the whole snapshot being lost.
#[cfg(feature = "serde")]
fn nan_if_null<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::NAN))
}

#[cfg(feature = "serde")]
fn points_nan_if_null<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<[f64; 2]>, D::Error> {
    let raw = Vec::<[Option<f64>; 2]>::deserialize(d)?;
    Ok(raw
        .into_iter()
        .map(|[x, y]| [x.unwrap_or(f64::NAN), y.unwrap_or(f64::NAN)])
        .collect())
}

/// Rewrite bare `NaN`, `Infinity` and `-Infinity` tokens outside strings as `null`.
#[cfg(feature = "serde")]
fn null_non_finite(line: &str) -> Cow<'_, str> {
    const TOKENS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];
    if !line.contains("NaN") && !line.contains("Infinity") {
        return Cow::Borrowed(line);
    }

    let mut out = String::with_capacity(line.len());
    let (mut in_string, mut escaped) = (false, false);
    let mut rest = line;
    while let Some(c) = rest.chars().next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if let Some(token) = TOKENS.iter().find(|t| rest.starts_with(**t)) {
            out.push_str("null");
            rest = &rest[token.len()..];
            continue;
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    Cow::Owned(out)
}

#[cfg(feature = "serde")]
impl Inbound {
    pub fn decode(line: &str) -> Result<Inbound, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(&null_non_finite(line))?;
        let tag = value
            .get("type")
            .and_then(|t| t.as_str())
            .map(str::to_owned);
        match tag.as_deref() {
            None => Ok(Inbound::Snapshot(serde_json::from_value(value)?)),
            Some("control") | Some("reset") => Ok(match serde_json::from_value(value)? {
                Command::Control { payload } => Inbound::Control(payload),
                Command::Reset => Inbound::Reset,
                Command::Sensor { .. } => Inbound::Ignored("sensor".to_string()),
            }),
            Some(other) => Ok(Inbound::Ignored(other.to_string())),
        }
    }
}
