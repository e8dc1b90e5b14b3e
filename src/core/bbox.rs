//! Exponentially smoothed axis-aligned bounding box over an evolving point set.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Blend weight of the newest raw box against the smoothed history.
pub const DEFAULT_EMA: f64 = 0.15;

/// An axis-aligned box in data space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// `[0,1] x [0,1]`, substituted for empty or zero-extent point sets.
    pub const UNIT: Bounds = Bounds {
        min_x: 0.0,
        min_y: 0.0,
        max_x: 1.0,
        max_y: 1.0,
    };

    /// Raw min/max over the finite points in `points`.
    ///
    /// Returns `None` when no point is finite. Non-finite points are skipped so a
    /// single bad coordinate does not poison the box.
    pub fn of_finite(points: &[[f64; 2]]) -> Option<Bounds> {
        let mut b = Bounds {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        let mut any = false;
        for &[x, y] in points {
            if !x.is_finite() || !y.is_finite() {
                continue;
            }
            any = true;
            b.min_x = b.min_x.min(x);
            b.max_x = b.max_x.max(x);
            b.min_y = b.min_y.min(y);
            b.max_y = b.max_y.max(y);
        }
        any.then_some(b)
    }

    /// Raw box for one frame, with the degenerate-set policy applied.
    ///
    /// Empty sets and sets collapsed to a line or point on either axis become
    /// [`Bounds::UNIT`], so downstream extents are never zero.
    pub fn raw(points: &[[f64; 2]]) -> Bounds {
        match Self::of_finite(points) {
            Some(b) if b.max_x > b.min_x && b.max_y > b.min_y => b,
            _ => Bounds::UNIT,
        }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    fn blend(&self, raw: &Bounds, alpha: f64) -> Bounds {
        let mix = |old: f64, new: f64| old * (1.0 - alpha) + new * alpha;
        Bounds {
            min_x: mix(self.min_x, raw.min_x),
            min_y: mix(self.min_y, raw.min_y),
            max_x: mix(self.max_x, raw.max_x),
            max_y: mix(self.max_y, raw.max_y),
        }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Bounds::UNIT
    }
}

/// Tracks the smoothed box across frames.
///
/// The first observation seeds the box directly; later ones blend each bound
/// independently with weight `alpha`.
#[derive(Debug, Clone)]
pub struct BoxTracker {
    alpha: f64,
    smoothed: Bounds,
    initialized: bool,
}

impl BoxTracker {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            smoothed: Bounds::UNIT,
            initialized: false,
        }
    }

    /// Feed one frame's point set and return the updated smoothed box.
    pub fn observe(&mut self, points: &[[f64; 2]]) -> Bounds {
        self.observe_bounds(Bounds::raw(points))
    }

    /// Feed an already-computed raw box.
    pub fn observe_bounds(&mut self, raw: Bounds) -> Bounds {
        if self.initialized {
            self.smoothed = self.smoothed.blend(&raw, self.alpha);
        } else {
            self.smoothed = raw;
            self.initialized = true;
        }
        self.smoothed
    }

    pub fn bounds(&self) -> Bounds {
        self.smoothed
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Forget all history; the next observation seeds again.
    pub fn reset(&mut self) {
        self.smoothed = Bounds::UNIT;
        self.initialized = false;
    }
}

impl Default for BoxTracker {
    fn default() -> Self {
        Self::new(DEFAULT_EMA)
    }
}
