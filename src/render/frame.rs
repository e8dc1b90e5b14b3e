//! Retained draw list. Renderers push shapes in paint order; backends replay
//! them.

pub use plotters::style::RGBAColor as Color;

/// Opaque color from a packed `0xRRGGBB` value.
pub const fn rgb(hex: u32) -> Color {
    Color((hex >> 16) as u8, (hex >> 8) as u8, hex as u8, 1.0)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Full-frame vertical gradient.
    Gradient { top: Color, bottom: Color },
    StrokeRect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        width: f64,
        color: Color,
    },
    /// Round-capped segment.
    Line {
        from: [f64; 2],
        to: [f64; 2],
        width: f64,
        color: Color,
    },
    /// Filled disc.
    Circle {
        center: [f64; 2],
        radius: f64,
        color: Color,
    },
    Polyline {
        points: Vec<[f64; 2]>,
        width: f64,
        color: Color,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: f64,
    height: f64,
    shapes: Vec<Shape>,
}

impl Frame {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            shapes: Vec::new(),
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn push(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    pub fn gradient(&mut self, top: Color, bottom: Color) {
        self.push(Shape::Gradient { top, bottom });
    }

    pub fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64, width: f64, color: Color) {
        self.push(Shape::StrokeRect {
            x,
            y,
            w,
            h,
            width,
            color,
        });
    }

    pub fn line(&mut self, from: [f64; 2], to: [f64; 2], width: f64, color: Color) {
        self.push(Shape::Line {
            from,
            to,
            width,
            color,
        });
    }

    pub fn circle(&mut self, center: [f64; 2], radius: f64, color: Color) {
        self.push(Shape::Circle {
            center,
            radius,
            color,
        });
    }

    pub fn polyline(&mut self, points: Vec<[f64; 2]>, width: f64, color: Color) {
        self.push(Shape::Polyline {
            points,
            width,
            color,
        });
    }

    pub fn lines(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.iter().filter(|s| matches!(s, Shape::Line { .. }))
    }

    pub fn circles(&self) -> impl Iterator<Item = &Shape> {
        self.shapes
            .iter()
            .filter(|s| matches!(s, Shape::Circle { .. }))
    }
}
