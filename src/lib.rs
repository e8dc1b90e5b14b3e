//! # dynaview
//!
//! Numeric core of a real-time observation console for a remote dynamical
//! simulation: auto-fitting viewport, heartbeat animation, bounded metric
//! history, the per-snapshot render loop and the video sensor extractor.
//!
//! ## Quick Start
//!
//! ```
//! use dynaview::prelude::*;
//!
//! let mut viewport = Viewport::new(RenderParams::default());
//! let snap = Snapshot {
//!     emb: vec![[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]],
//!     edges: vec![Edge(0.0, 1.0, 3.2e7)],
//!     drift: Some(0.4),
//!     entropy: Some(2.3),
//! };
//! let frame = viewport.render(&snap, 1.0 / 60.0);
//! assert_eq!(frame.scene.lines().count(), 1);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): serialization of parameters and wire messages, plus
//!   JSON encode/decode of the protocol
//!
//! ## Modules
//!
//! - [`bbox`]: smoothed bounding-box tracker
//! - [`fit`]: viewport fit engine
//! - [`pulse`]: heartbeat animator
//! - [`history`]: bounded metric history
//! - [`render`]: render loop, draw list, trend chart, SVG output
//! - [`sensor`]: video frame feature extractor
//! - [`protocol`]: wire messages

#[path = "core/bbox.rs"]
pub mod bbox;

#[path = "core/fit.rs"]
pub mod fit;

#[path = "core/history.rs"]
pub mod history;

#[path = "core/pulse.rs"]
pub mod pulse;

#[path = "core/sensor.rs"]
pub mod sensor;

#[path = "core/time.rs"]
pub mod time;

pub mod protocol;
pub mod render;

/// Prelude module for convenient imports.
///
/// ```
/// use dynaview::prelude::*;
/// ```
pub mod prelude {
    pub use crate::bbox::{BoxTracker, Bounds};
    pub use crate::fit::{FitParams, FitState, Transform};
    pub use crate::history::{MetricHistory, RollingHistory};
    pub use crate::protocol::{Command, ControlKey, ControlParams, Controls, Edge, Inbound, Snapshot};
    pub use crate::pulse::{Pulse, PulseClock};
    pub use crate::render::frame::{Frame, Shape};
    pub use crate::render::{EdgeStyle, NodeStyle, RenderParams, Rendered, Viewport};
    pub use crate::sensor::{SensorExtractor, SensorParams, SensorReading};
    pub use crate::time::{ArrivalClock, RateLimiter};
}
