use image::RgbaImage;
use tiny_skia::{
    Color, FillRule, GradientStop, Paint, Path, Pixmap, Point, RadialGradient, SpreadMode, Stroke,
    Transform,
};

use super::RenderError;

/// CPU drawing surface with a canvas-style transform stack.
pub struct Canvas {
    pixmap: Pixmap,
    background: Color,
    transform: Transform,
    stack: Vec<Transform>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: [u8; 4]) -> Result<Self, RenderError> {
        let mut pixmap = Pixmap::new(width, height).ok_or(RenderError::SurfaceAllocation { width, height })?;
        let background = Color::from_rgba8(background[0], background[1], background[2], background[3]);
        pixmap.fill(background);
        Ok(Self {
            pixmap,
            background,
            transform: Transform::identity(),
            stack: Vec::new(),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Fill with the background colour and reset the transform stack.
    pub fn clear(&mut self) {
        self.pixmap.fill(self.background);
        self.transform = Transform::identity();
        self.stack.clear();
    }

    pub fn save(&mut self) {
        self.stack.push(self.transform);
    }

    pub fn restore(&mut self) {
        if let Some(t) = self.stack.pop() {
            self.transform = t;
        }
    }

    pub fn translate(&mut self, x: f32, y: f32) {
        self.transform = self.transform.pre_translate(x, y);
    }

    /// Rotate the local frame by `radians`.
    pub fn rotate(&mut self, radians: f32) {
        self.transform = self.transform.pre_rotate(radians.to_degrees());
    }

    pub fn fill(&mut self, path: &Path, paint: &Paint) {
        self.pixmap
            .fill_path(path, paint, FillRule::Winding, self.transform, None);
    }

    pub fn stroke(&mut self, path: &Path, paint: &Paint, width: f32) {
        let stroke = Stroke {
            width: width.max(0.1),
            line_cap: tiny_skia::LineCap::Round,
            line_join: tiny_skia::LineJoin::Round,
            ..Default::default()
        };
        self.pixmap
            .stroke_path(path, paint, &stroke, self.transform, None);
    }

    /// Straight (non-premultiplied) RGBA copy of the current raster.
    pub fn snapshot(&self) -> RgbaImage {
        let mut data = Vec::with_capacity(self.pixmap.data().len());
        for pixel in self.pixmap.pixels() {
            let c = pixel.demultiply();
            data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        RgbaImage::from_raw(self.width(), self.height(), data)
            .unwrap_or_else(|| RgbaImage::new(self.width(), self.height()))
    }

    /// True when every pixel equals the background colour.
    #[cfg(test)]
    pub fn is_blank(&self) -> bool {
        let bg = self.background.premultiply().to_color_u8();
        self.pixmap.pixels().iter().all(|p| {
            p.red() == bg.red() && p.green() == bg.green() && p.blue() == bg.blue() && p.alpha() == bg.alpha()
        })
    }
}

pub fn rgba(rgb: [u8; 3], opacity: f32) -> Color {
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color::from_rgba8(rgb[0], rgb[1], rgb[2], alpha)
}

pub fn solid_paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = true;
    paint
}

/// Radial gradient from `inner` at the origin to `outer` at `radius`, in the
/// current local frame. Falls back to a solid `inner` fill when the gradient
/// is degenerate.
pub fn radial_paint(inner: Color, outer: Color, radius: f32) -> Paint<'static> {
    let shader = RadialGradient::new(
        Point::from_xy(0.0, 0.0),
        Point::from_xy(0.0, 0.0),
        radius.max(0.5),
        vec![GradientStop::new(0.0, inner), GradientStop::new(1.0, outer)],
        SpreadMode::Pad,
        Transform::identity(),
    );
    match shader {
        Some(shader) => Paint {
            shader,
            anti_alias: true,
            ..Default::default()
        },
        None => solid_paint(inner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_skia::PathBuilder;

    #[test]
    fn new_canvas_is_blank() {
        let canvas = Canvas::new(16, 16, [0, 0, 0, 255]).unwrap();
        assert!(canvas.is_blank());
        assert_eq!(canvas.snapshot().get_pixel(3, 3).0, [0, 0, 0, 255]);
    }

    #[test]
    fn zero_sized_surface_is_an_error() {
        assert!(matches!(
            Canvas::new(0, 10, [0, 0, 0, 255]),
            Err(RenderError::SurfaceAllocation { .. })
        ));
    }

    #[test]
    fn fill_then_clear() {
        let mut canvas = Canvas::new(32, 32, [0, 0, 0, 255]).unwrap();
        let circle = PathBuilder::from_circle(16.0, 16.0, 8.0).unwrap();
        canvas.fill(&circle, &solid_paint(Color::from_rgba8(255, 0, 0, 255)));
        assert!(!canvas.is_blank());
        assert_eq!(canvas.snapshot().get_pixel(16, 16).0, [255, 0, 0, 255]);

        canvas.clear();
        assert!(canvas.is_blank());
    }

    #[test]
    fn save_restore_scopes_transforms() {
        let mut canvas = Canvas::new(32, 32, [0, 0, 0, 255]).unwrap();
        canvas.save();
        canvas.translate(24.0, 24.0);
        canvas.rotate(std::f32::consts::FRAC_PI_2);
        let dot = PathBuilder::from_circle(0.0, 0.0, 3.0).unwrap();
        canvas.fill(&dot, &solid_paint(Color::WHITE));
        canvas.restore();
        canvas.fill(&dot, &solid_paint(Color::WHITE));

        let snap = canvas.snapshot();
        assert_eq!(snap.get_pixel(24, 24).0, [255, 255, 255, 255]);
        assert_eq!(snap.get_pixel(12, 12).0, [0, 0, 0, 255]);
    }

    #[test]
    fn gradient_runs_inner_to_outer() {
        let mut canvas = Canvas::new(64, 64, [0, 0, 0, 255]).unwrap();
        canvas.translate(32.0, 32.0);
        let paint = radial_paint(
            Color::from_rgba8(255, 0, 0, 255),
            Color::from_rgba8(0, 0, 255, 255),
            30.0,
        );
        let disc = PathBuilder::from_circle(0.0, 0.0, 30.0).unwrap();
        canvas.fill(&disc, &paint);

        let snap = canvas.snapshot();
        let centre = snap.get_pixel(32, 32).0;
        let edge = snap.get_pixel(32 + 27, 32).0;
        assert!(centre[0] > centre[2]);
        assert!(edge[2] > edge[0]);
    }
}
