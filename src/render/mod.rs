//! Streaming render loop.
//!
//! A [`Viewport`] owns all per-session animation state (fit, pulse, history) and
//! turns each incoming snapshot into a scene frame and a trend-chart frame.
//! Snapshots must be fed strictly in arrival order; each render sees the state
//! left by the previous one.

pub mod chart;
pub mod frame;
pub mod svg;

use crate::fit::{FitParams, FitState, Transform};
use crate::history::{MetricHistory, HISTORY_LEN};
use crate::protocol::Snapshot;
use crate::pulse::Pulse;

use frame::{rgb, Color, Frame};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const BG_TOP: Color = rgb(0x0f1734);
const BG_BOTTOM: Color = rgb(0x0b1228);
const EDGE_COLOR: Color = rgb(0x2dd4bf);
const NODE_CORE: Color = Color(255, 221, 87, 0.92);
const NODE_HALO: Color = Color(255, 221, 87, 0.32);

/// Edge width calibration. `weight_scale` encodes the expected magnitude of the
/// simulation's edge weights; it is a tunable, not derived from the data.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EdgeStyle {
    pub weight_scale: f64,
    pub gain: f64,
    pub min_width: f64,
    pub max_width: f64,
}

impl Default for EdgeStyle {
    fn default() -> Self {
        Self {
            weight_scale: 3.2e7,
            gain: 10.0,
            min_width: 1.0,
            max_width: 18.0,
        }
    }
}

impl EdgeStyle {
    /// `clamp(min, max, weight / weight_scale * gain)`; non-finite weights get the
    /// minimum width.
    pub fn width(&self, weight: f64) -> f64 {
        let w = weight / self.weight_scale * self.gain;
        if w.is_finite() {
            w.clamp(self.min_width, self.max_width)
        } else {
            self.min_width
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NodeStyle {
    pub core_radius: f64,
    pub halo_radius: f64,
}

impl Default for NodeStyle {
    fn default() -> Self {
        Self {
            core_radius: 6.0,
            halo_radius: 12.0,
        }
    }
}

/// Pixel sizes of the two output surfaces plus the drawing tunables.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RenderParams {
    pub scene_width: f64,
    pub scene_height: f64,
    pub chart_width: f64,
    pub chart_height: f64,
    pub history_len: usize,
    pub fit: FitParams,
    pub edges: EdgeStyle,
    pub nodes: NodeStyle,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            scene_width: 920.0,
            scene_height: 600.0,
            chart_width: 920.0,
            chart_height: 180.0,
            history_len: HISTORY_LEN,
            fit: FitParams::default(),
            edges: EdgeStyle::default(),
            nodes: NodeStyle::default(),
        }
    }
}

/// Output of one render tick.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub scene: Frame,
    pub chart: Frame,
    pub transform: Transform,
    pub pulse: f64,
}

#[derive(Debug, Clone)]
pub struct Viewport {
    params: RenderParams,
    fit: FitState,
    pulse: Pulse,
    history: MetricHistory,
    drift: f64,
    entropy: f64,
    frames: u64,
}

impl Viewport {
    pub fn new(params: RenderParams) -> Self {
        Self {
            fit: FitState::new(params.fit),
            pulse: Pulse::new(),
            history: MetricHistory::new(params.history_len),
            params,
            drift: 0.0,
            entropy: 0.0,
            frames: 0,
        }
    }

    pub fn params(&self) -> &RenderParams {
        &self.params
    }

    pub fn fit(&self) -> &FitState {
        &self.fit
    }

    pub fn pulse(&self) -> &Pulse {
        &self.pulse
    }

    pub fn history(&self) -> &MetricHistory {
        &self.history
    }

    /// Snapshots rendered since creation or the last reset.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Render one snapshot. `dt` is the pulse clock step in seconds.
    ///
    /// Never fails: missing or non-finite metrics fall back to the last valid
    /// value, invalid edges and non-finite nodes are skipped, and a point set with
    /// no usable coordinates keeps the previous transform.
    pub fn render(&mut self, snap: &Snapshot, dt: f64) -> Rendered {
        self.drift = snap.drift.filter(|v| v.is_finite()).unwrap_or(self.drift);
        self.entropy = snap
            .entropy
            .filter(|v| v.is_finite())
            .unwrap_or(self.entropy);

        let pulse = self.pulse.tick(self.drift, dt);
        let (w, h) = (self.params.scene_width, self.params.scene_height);
        let transform = self.fit.update(&snap.emb, w, h);

        let mut scene = Frame::new(w, h);
        scene.gradient(BG_TOP, BG_BOTTOM);

        let finite = |p: &[f64; 2]| p[0].is_finite() && p[1].is_finite();
        for edge in &snap.edges {
            let Some((i, j)) = edge.endpoints(snap.emb.len()) else {
                continue;
            };
            let (a, b) = (&snap.emb[i], &snap.emb[j]);
            if !finite(a) || !finite(b) {
                continue;
            }
            scene.line(
                transform.apply(*a),
                transform.apply(*b),
                self.params.edges.width(edge.weight()),
                EDGE_COLOR,
            );
        }

        let nodes = self.params.nodes;
        for p in snap.emb.iter().filter(|p| finite(p)) {
            let px = transform.apply(*p);
            scene.circle(px, nodes.core_radius * pulse, NODE_CORE);
            scene.circle(px, nodes.halo_radius * pulse, NODE_HALO);
        }

        self.history.push(self.drift, self.entropy);
        let chart = chart::draw_trend(
            &self.history,
            self.params.chart_width,
            self.params.chart_height,
        );

        self.frames += 1;
        Rendered {
            scene,
            chart,
            transform,
            pulse,
        }
    }

    /// Re-seed the fit on the next snapshot and clear the history. The pulse
    /// keeps running so the heartbeat does not visibly restart.
    pub fn reset(&mut self) {
        self.fit.reset();
        self.history.clear();
        self.frames = 0;
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(RenderParams::default())
    }
}
