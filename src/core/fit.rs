//! Viewport auto-fit: derives a smoothed, zoom-clamped scale + offset that keeps
//! a drifting point cloud framed inside a fixed-size pixel viewport.
//!
//! Box, scale and offset are smoothed independently (each with the same EMA
//! weight) instead of in one combined pass, so lag does not compound while
//! jitter from either the data or the derived scale is still damped.

use crate::bbox::{BoxTracker, Bounds, DEFAULT_EMA};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tunables for the fit engine.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FitParams {
    /// EMA weight for box, scale and offset.
    pub ema: f64,
    /// Fraction of the viewport left empty on each side.
    pub padding: f64,
    /// Lower zoom bound, in pixels per data unit at `ref_width`.
    pub scale_min: f64,
    /// Upper zoom bound, in pixels per data unit at `ref_width`.
    pub scale_max: f64,
    /// Viewport width the zoom bounds are expressed against.
    pub ref_width: f64,
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            ema: DEFAULT_EMA,
            padding: 0.10,
            scale_min: 0.4,
            scale_max: 6.0,
            ref_width: 920.0,
        }
    }
}

impl FitParams {
    /// Allowed `[min, max]` scale for a viewport `width` pixels wide.
    pub fn zoom_limits(&self, width: f64) -> (f64, f64) {
        let rel = width / self.ref_width;
        (self.scale_min * rel, self.scale_max * rel)
    }
}

/// Affine data-space → pixel-space map: `pixel = offset + scale * point`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Transform {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        scale: 1.0,
        offset_x: 0.0,
        offset_y: 0.0,
    };

    #[inline]
    pub fn apply(&self, p: [f64; 2]) -> [f64; 2] {
        [
            self.offset_x + self.scale * p[0],
            self.offset_y + self.scale * p[1],
        ]
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform::IDENTITY
    }
}

/// Session-lived fit state.
///
/// Invariant: once [`FitState::is_initialized`] is true every field is finite and
/// `scale` lies within [`FitParams::zoom_limits`] for the last viewport width.
#[derive(Debug, Clone)]
pub struct FitState {
    params: FitParams,
    tracker: BoxTracker,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
    initialized: bool,
}

impl FitState {
    pub fn new(params: FitParams) -> Self {
        Self {
            tracker: BoxTracker::new(params.ema),
            params,
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            initialized: false,
        }
    }

    pub fn params(&self) -> &FitParams {
        &self.params
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Smoothed data-space box.
    pub fn bounds(&self) -> Bounds {
        self.tracker.bounds()
    }

    /// The transform left by the last successful update.
    pub fn transform(&self) -> Transform {
        Transform {
            scale: self.scale,
            offset_x: self.offset_x,
            offset_y: self.offset_y,
        }
    }

    /// Advance the fit by one frame and return that frame's transform.
    ///
    /// A non-empty point set with no finite point, or a viewport with a
    /// non-positive/non-finite dimension, leaves the state untouched and returns
    /// the last transform.
    pub fn update(&mut self, points: &[[f64; 2]], width: f64, height: f64) -> Transform {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return self.transform();
        }
        let raw = match Bounds::of_finite(points) {
            None if !points.is_empty() => return self.transform(),
            _ => Bounds::raw(points),
        };

        let first = !self.initialized;
        let b = self.tracker.observe_bounds(raw);
        let a = self.params.ema;
        let p = self.params.padding;

        let dx = if b.width() > 0.0 { b.width() } else { 1.0 };
        let dy = if b.height() > 0.0 { b.height() } else { 1.0 };
        let candidate = ((1.0 - 2.0 * p) * width / dx).min((1.0 - 2.0 * p) * height / dy);

        let mut scale = if first {
            candidate
        } else {
            self.scale * (1.0 - a) + candidate * a
        };
        let (lo, hi) = self.params.zoom_limits(width);
        scale = scale.clamp(lo, hi);

        let ox = p * width - scale * b.min_x;
        let oy = p * height - scale * b.min_y;
        let (ox, oy) = if first {
            (ox, oy)
        } else {
            (
                self.offset_x * (1.0 - a) + ox * a,
                self.offset_y * (1.0 - a) + oy * a,
            )
        };

        // Refuse to commit anything non-finite; the previous frame stays valid.
        if !(scale.is_finite() && ox.is_finite() && oy.is_finite()) {
            return self.transform();
        }

        self.scale = scale;
        self.offset_x = ox;
        self.offset_y = oy;
        self.initialized = true;
        self.transform()
    }

    /// Drop all history so the next snapshot re-seeds the box, scale and offset.
    pub fn reset(&mut self) {
        *self = Self::new(self.params);
    }
}

impl Default for FitState {
    fn default() -> Self {
        Self::new(FitParams::default())
    }
}
