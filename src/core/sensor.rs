//! Per-frame video features sent upstream as sensor input.
//!
//! Each RGBA frame is reduced to four scalars: mean luma (as brightness), mean
//! RGB, a cheap hue proxy and motion energy against the previous frame's luma.

use core::f64::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default capture resolution.
pub const CAPTURE_WIDTH: u32 = 320;
pub const CAPTURE_HEIGHT: u32 = 240;

/// Calibration for the extractor. `motion_gain` encodes the expected range of
/// mean per-pixel luma change and is tunable, not structural.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SensorParams {
    pub motion_gain: f64,
}

impl Default for SensorParams {
    fn default() -> Self {
        Self { motion_gain: 3.0 }
    }
}

/// One frame's features.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorReading {
    /// Motion energy in [0,1].
    pub motion: f64,
    /// Mean luma in [0,1].
    pub brightness: f64,
    /// Hue proxy in (-π, π].
    pub hue: f64,
    /// Mean red, green, blue, each in [0,1].
    pub rgb: [f64; 3],
}

#[inline]
fn luma(r: u8, g: u8, b: u8) -> f32 {
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

/// Stateful extractor holding the single-slot previous-frame luma reference.
#[derive(Debug, Clone, Default)]
pub struct SensorExtractor {
    params: SensorParams,
    prev_luma: Option<Vec<f32>>,
}

impl SensorExtractor {
    pub fn new(params: SensorParams) -> Self {
        Self {
            params,
            prev_luma: None,
        }
    }

    pub fn has_reference(&self) -> bool {
        self.prev_luma.is_some()
    }

    /// Drop the reference frame; the next frame reports zero motion.
    pub fn reset(&mut self) {
        self.prev_luma = None;
    }

    /// Reduce one RGBA buffer to a reading and keep its luma as the next reference.
    ///
    /// Trailing bytes that do not form a whole pixel are ignored. A frame whose
    /// pixel count differs from the reference is treated as a first frame.
    pub fn extract(&mut self, rgba: &[u8]) -> SensorReading {
        let pixels = rgba.len() / 4;
        let prev = self.prev_luma.take().filter(|p| p.len() == pixels);
        let mut next = Vec::with_capacity(pixels);

        let (mut sum_y, mut sum_r, mut sum_g, mut sum_b, mut motion) =
            (0.0f64, 0.0f64, 0.0f64, 0.0f64, 0.0f64);
        for (i, px) in rgba.chunks_exact(4).enumerate() {
            let (r, g, b) = (px[0], px[1], px[2]);
            let y = luma(r, g, b);
            sum_y += y as f64;
            sum_r += r as f64;
            sum_g += g as f64;
            sum_b += b as f64;
            if let Some(prev) = prev.as_deref() {
                motion += ((y - prev[i]).abs() / 255.0) as f64;
            }
            next.push(y);
        }

        let n = pixels.max(1) as f64;
        let mean_r = sum_r / n / 255.0;
        let mean_g = sum_g / n / 255.0;
        let mean_b = sum_b / n / 255.0;

        let mut hue = (mean_g - mean_b).atan2(mean_r - mean_g);
        if hue <= -PI {
            hue = PI;
        }

        self.prev_luma = Some(next);

        SensorReading {
            motion: (motion / n * self.params.motion_gain).clamp(0.0, 1.0),
            brightness: sum_y / n / 255.0,
            hue,
            rgb: [mean_r, mean_g, mean_b],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: usize, h: usize, rgb: [u8; 3]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(w * h * 4);
        for _ in 0..w * h {
            buf.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
        buf
    }

    #[test]
    fn first_frame_has_no_motion() {
        let mut ex = SensorExtractor::default();
        let r = ex.extract(&solid(8, 8, [200, 10, 10]));
        assert_eq!(r.motion, 0.0);
        assert!(ex.has_reference());
    }

    #[test]
    fn brightness_and_rgb_means() {
        let mut ex = SensorExtractor::default();
        let r = ex.extract(&solid(4, 4, [255, 255, 255]));
        assert!((r.brightness - 1.0).abs() < 1.0e-4);
        assert_eq!(r.rgb, [1.0, 1.0, 1.0]);

        let r = ex.extract(&solid(4, 4, [0, 0, 0]));
        assert_eq!(r.brightness, 0.0);
    }

    #[test]
    fn full_frame_flip_saturates_motion() {
        let mut ex = SensorExtractor::default();
        ex.extract(&solid(16, 16, [0, 0, 0]));
        let r = ex.extract(&solid(16, 16, [255, 255, 255]));
        assert_eq!(r.motion, 1.0);
        // Still frame afterwards.
        let r = ex.extract(&solid(16, 16, [255, 255, 255]));
        assert_eq!(r.motion, 0.0);
    }

    #[test]
    fn small_change_scales_by_gain() {
        let mut ex = SensorExtractor::new(SensorParams { motion_gain: 3.0 });
        ex.extract(&solid(10, 10, [0, 0, 0]));
        // Change a tenth of the pixels from black to white.
        let mut frame = solid(10, 10, [0, 0, 0]);
        for px in frame.chunks_exact_mut(4).take(10) {
            px[..3].copy_from_slice(&[255, 255, 255]);
        }
        let r = ex.extract(&frame);
        assert!((r.motion - 0.3).abs() < 1.0e-3);
    }

    #[test]
    fn hue_proxy_quadrants() {
        let mut ex = SensorExtractor::default();
        // Pure red: atan2(0, 1) = 0.
        assert!(ex.extract(&solid(2, 2, [255, 0, 0])).hue.abs() < 1.0e-9);
        // Pure green: atan2(1, -1) = 3π/4.
        let h = ex.extract(&solid(2, 2, [0, 255, 0])).hue;
        assert!((h - 0.75 * PI).abs() < 1.0e-9);
        // Grey: atan2(0, 0) = 0, stays in range.
        let h = ex.extract(&solid(2, 2, [90, 90, 90])).hue;
        assert!(h > -PI && h <= PI);
    }

    #[test]
    fn resolution_change_reseeds_reference() {
        let mut ex = SensorExtractor::default();
        ex.extract(&solid(4, 4, [0, 0, 0]));
        let r = ex.extract(&solid(8, 8, [255, 255, 255]));
        assert_eq!(r.motion, 0.0);
    }

    #[test]
    fn empty_buffer_is_harmless() {
        let mut ex = SensorExtractor::default();
        let r = ex.extract(&[]);
        assert_eq!(r.motion, 0.0);
        assert_eq!(r.brightness, 0.0);
        assert!(r.hue.is_finite());
    }
}
