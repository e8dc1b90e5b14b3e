//! Standalone SVG output for a [`Frame`], replayed through plotters' SVG backend.

use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::{Circle, IntoDrawingArea, PathElement, Rectangle, SVGBackend, ShapeStyle};

use super::frame::{Color, Frame, Shape};

pub type SvgError = DrawingAreaErrorKind<std::io::Error>;

/// Pixel rows per gradient band.
const BAND_PX: u32 = 4;

fn px(p: [f64; 2]) -> (i32, i32) {
    (p[0].round() as i32, p[1].round() as i32)
}

fn stroke(color: Color, width: f64) -> ShapeStyle {
    ShapeStyle {
        color,
        filled: false,
        stroke_width: width.round().max(1.0) as u32,
    }
}

fn fill(color: Color) -> ShapeStyle {
    ShapeStyle {
        color,
        filled: true,
        stroke_width: 0,
    }
}

fn lerp(a: Color, b: Color, t: f64) -> Color {
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    Color(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2), a.3 + (b.3 - a.3) * t)
}

/// Draw `frame` into a complete SVG document.
pub fn render(frame: &Frame) -> Result<String, SvgError> {
    let w = frame.width().round().max(1.0) as u32;
    let h = frame.height().round().max(1.0) as u32;

    let mut out = String::new();
    {
        let root = SVGBackend::with_string(&mut out, (w, h)).into_drawing_area();

        for shape in frame.shapes() {
            match shape {
                Shape::Gradient { top, bottom } => {
                    let bands = h.div_ceil(BAND_PX);
                    for i in 0..bands {
                        let t = if bands > 1 {
                            i as f64 / (bands - 1) as f64
                        } else {
                            0.0
                        };
                        let y0 = (i * BAND_PX) as i32;
                        let y1 = ((i + 1) * BAND_PX).min(h) as i32;
                        root.draw(&Rectangle::new(
                            [(0, y0), (w as i32, y1)],
                            fill(lerp(*top, *bottom, t)),
                        ))?;
                    }
                }
                Shape::StrokeRect {
                    x,
                    y,
                    w,
                    h,
                    width,
                    color,
                } => {
                    root.draw(&Rectangle::new(
                        [px([*x, *y]), px([x + w, y + h])],
                        stroke(*color, *width),
                    ))?;
                }
                Shape::Line {
                    from,
                    to,
                    width,
                    color,
                } => {
                    root.draw(&PathElement::new(
                        vec![px(*from), px(*to)],
                        stroke(*color, *width),
                    ))?;
                }
                Shape::Circle {
                    center,
                    radius,
                    color,
                } => {
                    let r = radius.max(0.0).round() as i32;
                    root.draw(&Circle::new(px(*center), r, fill(*color)))?;
                }
                Shape::Polyline {
                    points,
                    width,
                    color,
                } => {
                    if points.len() < 2 {
                        continue;
                    }
                    let path: Vec<(i32, i32)> = points.iter().map(|p| px(*p)).collect();
                    root.draw(&PathElement::new(path, stroke(*color, *width)))?;
                }
            }
        }

        root.present()?;
    }
    Ok(out)
}
