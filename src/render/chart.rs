//! Drift/entropy trend plot.

use super::frame::{rgb, Color, Frame};
use crate::history::{MetricHistory, RollingHistory};

pub const CHART_PAD: f64 = 20.0;

const FRAME_COLOR: Color = rgb(0x1f2a44);
const DRIFT_COLOR: Color = rgb(0x60a5fa);
const ENTROPY_COLOR: Color = rgb(0xf97316);

/// Map one series into the padded plot area, normalized against its own max.
pub fn series_points(series: &RollingHistory, width: f64, height: f64) -> Vec<[f64; 2]> {
    let w = width - 2.0 * CHART_PAD;
    let h = height - 2.0 * CHART_PAD;
    let max = series.plot_max();
    let step = w / (series.len().saturating_sub(1).max(1) as f64);

    series
        .data()
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let v = if v.is_finite() { v } else { 0.0 };
            [CHART_PAD + i as f64 * step, CHART_PAD + h - h * (v / max)]
        })
        .collect()
}

/// Draw the plot frame and both series. Each series is scaled independently so
/// both stay visible whatever their relative magnitude.
pub fn draw_trend(history: &MetricHistory, width: f64, height: f64) -> Frame {
    let mut frame = Frame::new(width, height);
    frame.stroke_rect(
        CHART_PAD,
        CHART_PAD,
        width - 2.0 * CHART_PAD,
        height - 2.0 * CHART_PAD,
        1.0,
        FRAME_COLOR,
    );

    if history.is_empty() {
        return frame;
    }
    frame.polyline(series_points(history.drift(), width, height), 1.0, DRIFT_COLOR);
    frame.polyline(
        series_points(history.entropy(), width, height),
        1.0,
        ENTROPY_COLOR,
    );
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::frame::Shape;

    #[test]
    fn series_span_the_padded_area() {
        let mut h = MetricHistory::default();
        for i in 0..5 {
            h.push(i as f64, 10.0 * i as f64);
        }
        let pts = series_points(h.entropy(), 200.0, 100.0);
        assert_eq!(pts.len(), 5);
        assert_eq!(pts[0], [20.0, 80.0]);
        // Last sample is the series max: top of the plot area, right edge.
        assert_eq!(pts[4], [180.0, 20.0]);

        // Drift max is 4: same shape as entropy despite the 10x magnitude gap.
        let drift = series_points(h.drift(), 200.0, 100.0);
        assert_eq!(drift, pts);
    }

    #[test]
    fn empty_history_draws_only_the_frame() {
        let f = draw_trend(&MetricHistory::default(), 920.0, 180.0);
        assert_eq!(f.shapes().len(), 1);
        assert!(matches!(f.shapes()[0], Shape::StrokeRect { .. }));
    }

    #[test]
    fn single_sample_plots_at_left_edge() {
        let mut h = MetricHistory::default();
        h.push(0.5, 0.5);
        let pts = series_points(h.drift(), 100.0, 100.0);
        assert_eq!(pts, vec![[20.0, 20.0 + 60.0 - 30.0]]);
    }
}
