//! Heartbeat animation: a phase accumulator whose frequency and amplitude follow
//! the simulation's drift metric.

use core::f64::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-tick retention of the previous amplitude.
pub const AMP_RETAIN: f64 = 0.9;

/// Nominal tick length used when no better clock is available.
pub const NOMINAL_DT: f64 = 1.0 / 60.0;

/// How the phase accumulator is advanced.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "mode", rename_all = "snake_case"))]
pub enum PulseClock {
    /// Measured time between consecutive snapshots, clamped to `max_dt` seconds.
    Arrival { max_dt: f64 },
    /// Fixed step of `1/hz` per snapshot regardless of arrival rate.
    Fixed { hz: f64 },
}

impl Default for PulseClock {
    fn default() -> Self {
        PulseClock::Arrival { max_dt: 0.25 }
    }
}

impl PulseClock {
    /// Step length for one tick. `measured` is the inter-arrival time in seconds,
    /// `None` on the first snapshot of a session.
    pub fn step(&self, measured: Option<f64>) -> f64 {
        match *self {
            PulseClock::Arrival { max_dt } => match measured {
                Some(dt) if dt.is_finite() => dt.clamp(0.0, max_dt.max(0.0)),
                _ => NOMINAL_DT,
            },
            PulseClock::Fixed { hz } if hz.is_finite() && hz > 0.0 => 1.0 / hz,
            PulseClock::Fixed { .. } => NOMINAL_DT,
        }
    }
}

/// Target frequency in Hz for a drift value: `1 + min(3, 0.2 * drift)`, never
/// below 1 so the phase keeps moving forward for negative drift.
#[inline]
pub fn target_freq(drift: f64) -> f64 {
    1.0 + (drift * 0.2).clamp(0.0, 3.0)
}

/// Target amplitude for a drift value: `min(1, 0.15 + 0.12 * drift)`, floored at 0.
#[inline]
pub fn target_amp(drift: f64) -> f64 {
    (0.15 + 0.12 * drift).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Default)]
pub struct Pulse {
    phase: f64,
    amp: f64,
}

impl Pulse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance one tick of `dt` seconds driven by `drift` and return the radius
    /// multiplier `1 + amp * sin(phase)`.
    pub fn tick(&mut self, drift: f64, dt: f64) -> f64 {
        let amp_target = target_amp(drift);
        self.amp = self.amp * AMP_RETAIN + amp_target * (1.0 - AMP_RETAIN);
        if dt.is_finite() && dt > 0.0 {
            self.phase += TAU * target_freq(drift) * dt;
        }
        self.multiplier()
    }

    pub fn multiplier(&self) -> f64 {
        1.0 + self.amp * self.phase.sin()
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn amplitude(&self) -> f64 {
        self.amp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_follow_drift() {
        assert!((target_freq(0.0) - 1.0).abs() < 1.0e-12);
        assert!((target_freq(5.0) - 2.0).abs() < 1.0e-12);
        assert!((target_freq(100.0) - 4.0).abs() < 1.0e-12);
        assert!((target_amp(0.0) - 0.15).abs() < 1.0e-12);
        assert!((target_amp(20.0) - 1.0).abs() < 1.0e-12);
        assert_eq!(target_amp(-50.0), 0.0);
        assert_eq!(target_freq(-5.0), 1.0);
        assert_eq!(target_freq(-1.0e6), 1.0);
    }

    #[test]
    fn negative_drift_still_advances_phase() {
        let mut p = Pulse::new();
        p.tick(-20.0, NOMINAL_DT);
        assert!((p.phase() - TAU * NOMINAL_DT).abs() < 1.0e-12);
        let before = p.phase();
        p.tick(-1.0e9, 0.25);
        assert!(p.phase() > before);
    }

    #[test]
    fn amplitude_moves_a_tenth_of_the_gap_per_tick() {
        let mut p = Pulse::new();
        for _ in 0..200 {
            p.tick(0.0, NOMINAL_DT);
        }
        assert!((p.amplitude() - 0.15).abs() < 1.0e-6);

        // Drift jumps 0 -> 20: target becomes 1.
        let mut gap = 1.0 - p.amplitude();
        for _ in 0..20 {
            let before = p.amplitude();
            p.tick(20.0, NOMINAL_DT);
            let step = p.amplitude() - before;
            assert!(step > 0.0);
            assert!(step <= 0.1 * gap + 1.0e-12);
            let new_gap = 1.0 - p.amplitude();
            assert!((new_gap - 0.9 * gap).abs() < 1.0e-12);
            gap = new_gap;
        }
    }

    #[test]
    fn phase_advances_monotonically() {
        let mut p = Pulse::new();
        let mut last = p.phase();
        for i in 0..100 {
            p.tick(i as f64 * 0.3, NOMINAL_DT);
            assert!(p.phase() > last);
            last = p.phase();
        }
        // Zero-length ticks keep the phase where it is.
        p.tick(1.0, 0.0);
        assert_eq!(p.phase(), last);
    }

    #[test]
    fn multiplier_stays_within_amplitude_band() {
        let mut p = Pulse::new();
        for i in 0..500 {
            let m = p.tick((i % 40) as f64, 1.0 / 30.0);
            assert!(m >= 1.0 - p.amplitude() - 1.0e-12);
            assert!(m <= 1.0 + p.amplitude() + 1.0e-12);
        }
    }

    #[test]
    fn arrival_clock_clamps_stalls() {
        let clock = PulseClock::default();
        assert_eq!(clock.step(None), NOMINAL_DT);
        assert!((clock.step(Some(0.033)) - 0.033).abs() < 1.0e-12);
        assert_eq!(clock.step(Some(5.0)), 0.25);
        assert_eq!(clock.step(Some(-1.0)), 0.0);

        let fixed = PulseClock::Fixed { hz: 60.0 };
        assert!((fixed.step(Some(1.0)) - NOMINAL_DT).abs() < 1.0e-12);
    }
}
