//! Family-specific geometry, drawn in entity space (origin at the entity
//! centre, already rotated).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::{PI, TAU};
use tiny_skia::{Paint, Path, PathBuilder};

use super::canvas::{radial_paint, rgba, solid_paint, Canvas};
use super::entity::{Particle, Shape};
use super::RenderError;
use crate::mapping::style::{BrushStyle, GeometricShape, Hsl, OrganicForm, ParticleShape, ShapeStyle};
use crate::mapping::VisualMapping;

pub fn draw_shape(canvas: &mut Canvas, shape: &Shape, clock_ms: f64) -> Result<(), RenderError> {
    let radius = shape.radius() as f32;
    if radius <= 0.0 || shape.opacity <= 0.0 {
        return Ok(());
    }

    let opacity = shape.opacity as f32;
    let mapping = &shape.mapping;
    let paint = gradient(&mapping.primary, &mapping.secondary, opacity, radius);
    let t = (clock_ms / 1000.0) as f32;

    canvas.save();
    canvas.translate(shape.motion.x as f32, shape.motion.y as f32);
    canvas.rotate(shape.motion.rotation as f32);

    let result = match mapping.style {
        ShapeStyle::Geometric(variant) => draw_geometric(canvas, variant, radius, &paint),
        ShapeStyle::Brush(variant) => {
            let mut rng = StdRng::seed_from_u64(shape.texture_seed);
            draw_brush(canvas, variant, radius, mapping, opacity, &paint, &mut rng)
        }
        ShapeStyle::Organic(variant) => draw_organic(canvas, variant, radius, t, &paint),
        // Particle mappings spawn particles, never shapes.
        ShapeStyle::Particle(variant) => draw_particle_form(canvas, variant, radius, &paint),
    };

    canvas.restore();
    result
}

pub fn draw_particle(canvas: &mut Canvas, particle: &Particle) -> Result<(), RenderError> {
    let radius = particle.current_radius() as f32;
    if radius <= 0.0 || particle.opacity <= 0.0 {
        return Ok(());
    }

    let paint = gradient(&particle.color, &particle.glow, particle.opacity as f32, radius);

    canvas.save();
    canvas.translate(particle.motion.x as f32, particle.motion.y as f32);
    canvas.rotate(particle.motion.rotation as f32);
    let result = draw_particle_form(canvas, particle.variant, radius, &paint);
    canvas.restore();
    result
}

fn gradient(inner: &Hsl, outer: &Hsl, opacity: f32, radius: f32) -> Paint<'static> {
    radial_paint(rgba(inner.to_rgb(), opacity), rgba(outer.to_rgb(), opacity), radius)
}

/// Stored data can name a variant this build does not know. Loud in debug
/// builds, silently skipped in release.
fn unknown_variant(family: &'static str) -> Result<(), RenderError> {
    if cfg!(debug_assertions) {
        Err(RenderError::UnknownVariant(family))
    } else {
        Ok(())
    }
}

fn draw_geometric(canvas: &mut Canvas, variant: GeometricShape, r: f32, paint: &Paint) -> Result<(), RenderError> {
    let path = match variant {
        GeometricShape::Circle => PathBuilder::from_circle(0.0, 0.0, r),
        GeometricShape::Triangle => polygon(3, r),
        GeometricShape::Square => polygon(4, r),
        GeometricShape::Pentagon => polygon(5, r),
        GeometricShape::Hexagon => polygon(6, r),
        GeometricShape::Star => star(5, r, r * 0.45),
        GeometricShape::Unknown => return unknown_variant("geometric"),
    };
    if let Some(path) = path {
        canvas.fill(&path, paint);
    }
    Ok(())
}

fn draw_particle_form(canvas: &mut Canvas, variant: ParticleShape, r: f32, paint: &Paint) -> Result<(), RenderError> {
    match variant {
        ParticleShape::Dot => {
            if let Some(path) = PathBuilder::from_circle(0.0, 0.0, r) {
                canvas.fill(&path, paint);
            }
        }
        ParticleShape::Spark => {
            if let Some(path) = star(4, r, r * 0.3) {
                canvas.fill(&path, paint);
            }
        }
        ParticleShape::Ring => {
            if let Some(path) = PathBuilder::from_circle(0.0, 0.0, r * 0.8) {
                canvas.stroke(&path, paint, r * 0.35);
            }
        }
        ParticleShape::Unknown => return unknown_variant("particle"),
    }
    Ok(())
}

fn draw_brush(
    canvas: &mut Canvas,
    variant: BrushStyle,
    r: f32,
    mapping: &VisualMapping,
    opacity: f32,
    paint: &Paint,
    rng: &mut StdRng,
) -> Result<(), RenderError> {
    let primary = mapping.primary.to_rgb();
    let secondary = mapping.secondary.to_rgb();

    match variant {
        BrushStyle::Soft => {
            // stacked translucent discs, largest first
            for i in 0..4 {
                let scale = 1.0 - i as f32 * 0.2;
                let dx = rng.gen_range(-0.1f32..0.1) * r;
                let dy = rng.gen_range(-0.1f32..0.1) * r;
                let layer = radial_paint(
                    rgba(primary, opacity * 0.35),
                    rgba(secondary, 0.0),
                    r * scale,
                );
                if let Some(path) = PathBuilder::from_circle(dx, dy, r * scale) {
                    canvas.fill(&path, &layer);
                }
            }
        }
        BrushStyle::Textured => {
            if let Some(path) = PathBuilder::from_circle(0.0, 0.0, r) {
                let mut base = paint.clone();
                base.shader.apply_opacity(0.5);
                canvas.fill(&path, &base);
            }
            let mut pb = PathBuilder::new();
            for _ in 0..30 {
                let (x, y) = random_in_disc(rng, r);
                pb.push_circle(x, y, r * rng.gen_range(0.03f32..0.09));
            }
            if let Some(path) = pb.finish() {
                canvas.fill(&path, &solid_paint(rgba(secondary, opacity)));
            }
        }
        BrushStyle::Splatter => {
            let mut pb = PathBuilder::new();
            pb.push_circle(0.0, 0.0, r * 0.6);
            for _ in 0..12 {
                let angle = rng.gen_range(0.0..TAU);
                let distance = r * rng.gen_range(0.7f32..1.3);
                pb.push_circle(
                    angle.cos() * distance,
                    angle.sin() * distance,
                    r * rng.gen_range(0.05f32..0.15),
                );
            }
            if let Some(path) = pb.finish() {
                canvas.fill(&path, paint);
            }
        }
        BrushStyle::Calligraphy => {
            let thickness = rng.gen_range(0.25f32..0.45) * r;
            let mut pb = PathBuilder::new();
            pb.move_to(-r, 0.0);
            pb.quad_to(0.0, -thickness, r, 0.0);
            pb.quad_to(0.0, thickness * 0.3, -r, 0.0);
            pb.close();
            if let Some(path) = pb.finish() {
                canvas.fill(&path, paint);
            }
        }
        BrushStyle::Spray => {
            let mut pb = PathBuilder::new();
            for _ in 0..60 {
                let (x, y) = random_in_disc(rng, r);
                pb.push_circle(x, y, (r * 0.03).max(0.6));
            }
            if let Some(path) = pb.finish() {
                canvas.fill(&path, &solid_paint(rgba(primary, opacity)));
            }
        }
        BrushStyle::Unknown => return unknown_variant("brush"),
    }
    Ok(())
}

fn draw_organic(canvas: &mut Canvas, variant: OrganicForm, r: f32, t: f32, paint: &Paint) -> Result<(), RenderError> {
    match variant {
        OrganicForm::Blob => {
            let vertices = 32;
            let mut pb = PathBuilder::new();
            for i in 0..=vertices {
                let theta = i as f32 / vertices as f32 * TAU;
                let wobble = 1.0 + 0.15 * (3.0 * theta + t * 2.0).sin() + 0.08 * (5.0 * theta - t * 1.3).sin();
                let (x, y) = (theta.cos() * r * wobble, theta.sin() * r * wobble);
                if i == 0 {
                    pb.move_to(x, y);
                } else {
                    pb.line_to(x, y);
                }
            }
            pb.close();
            if let Some(path) = pb.finish() {
                canvas.fill(&path, paint);
            }
        }
        OrganicForm::Wave => {
            let steps = 24;
            let half = r * 0.12;
            let crest = |x: f32| (x / r * TAU + t * 3.0).sin() * r * 0.25;
            let mut pb = PathBuilder::new();
            for i in 0..=steps {
                let x = -r + 2.0 * r * i as f32 / steps as f32;
                if i == 0 {
                    pb.move_to(x, crest(x) - half);
                } else {
                    pb.line_to(x, crest(x) - half);
                }
            }
            for i in (0..=steps).rev() {
                let x = -r + 2.0 * r * i as f32 / steps as f32;
                pb.line_to(x, crest(x) + half);
            }
            pb.close();
            if let Some(path) = pb.finish() {
                canvas.fill(&path, paint);
            }
        }
        OrganicForm::Tentacle => {
            let segments = 10;
            let length = r / 5.0;
            let (mut x, mut y, mut angle) = (0.0f32, 0.0f32, 0.0f32);
            for i in 0..segments {
                angle += (t * 2.0 + i as f32 * 0.6).sin() * 0.35;
                let (nx, ny) = (x + angle.cos() * length, y + angle.sin() * length);
                let mut pb = PathBuilder::new();
                pb.move_to(x, y);
                pb.line_to(nx, ny);
                if let Some(path) = pb.finish() {
                    let width = r * (0.25 - 0.022 * i as f32);
                    canvas.stroke(&path, paint, width);
                }
                x = nx;
                y = ny;
            }
        }
        OrganicForm::Fractal => {
            let mut pb = PathBuilder::new();
            push_fractal(&mut pb, 0.0, 0.0, r * 0.45, 3, t * 0.5);
            if let Some(path) = pb.finish() {
                canvas.fill(&path, paint);
            }
        }
        OrganicForm::Flow => {
            let points = 60;
            let turns = 4.0 * PI;
            let mut pb = PathBuilder::new();
            for i in 0..=points {
                let theta = i as f32 / points as f32 * turns;
                let radius = r * (1.0 - theta / turns);
                let (x, y) = ((theta + t).cos() * radius, (theta + t).sin() * radius);
                if i == 0 {
                    pb.move_to(x, y);
                } else {
                    pb.line_to(x, y);
                }
            }
            if let Some(path) = pb.finish() {
                canvas.stroke(&path, paint, r * 0.08);
            }
        }
        OrganicForm::Unknown => return unknown_variant("organic"),
    }
    Ok(())
}

/// A disc with three half-size copies around it, recursively.
fn push_fractal(pb: &mut PathBuilder, x: f32, y: f32, r: f32, depth: u32, spin: f32) {
    pb.push_circle(x, y, r);
    if depth == 0 {
        return;
    }
    for k in 0..3 {
        let angle = k as f32 * TAU / 3.0 + spin;
        let distance = r * 1.4;
        push_fractal(
            pb,
            x + angle.cos() * distance,
            y + angle.sin() * distance,
            r * 0.5,
            depth - 1,
            spin,
        );
    }
}

pub fn polygon(sides: usize, r: f32) -> Option<Path> {
    let mut pb = PathBuilder::new();
    for i in 0..sides {
        let angle = -PI / 2.0 + i as f32 * TAU / sides as f32;
        let (x, y) = (angle.cos() * r, angle.sin() * r);
        if i == 0 {
            pb.move_to(x, y);
        } else {
            pb.line_to(x, y);
        }
    }
    pb.close();
    pb.finish()
}

/// Star with `spikes` outer points, alternating with `inner` radius points.
pub fn star(spikes: usize, outer: f32, inner: f32) -> Option<Path> {
    let mut pb = PathBuilder::new();
    for i in 0..spikes * 2 {
        let radius = if i % 2 == 0 { outer } else { inner };
        let angle = -PI / 2.0 + i as f32 * PI / spikes as f32;
        let (x, y) = (angle.cos() * radius, angle.sin() * radius);
        if i == 0 {
            pb.move_to(x, y);
        } else {
            pb.line_to(x, y);
        }
    }
    pb.close();
    pb.finish()
}

fn random_in_disc(rng: &mut StdRng, r: f32) -> (f32, f32) {
    let angle = rng.gen_range(0.0..TAU);
    let distance = r * rng.gen::<f32>().sqrt();
    (angle.cos() * distance, angle.sin() * distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::features::Buckets;
    use crate::mapping::generate::generate_mapping;
    use crate::mapping::style::VisualFamily;
    use crate::render::entity::{Motion, Phase};
    use std::sync::Arc;

    fn shape_with(style: ShapeStyle) -> Shape {
        let mut mapping = generate_mapping("0-0-0-0", Buckets::parse("0-0-0-0").unwrap(), chrono::Utc::now());
        mapping.style = style;
        Shape {
            mapping: Arc::new(mapping),
            motion: Motion {
                x: 50.0,
                y: 50.0,
                vx: 0.0,
                vy: 0.0,
                rotation: 0.3,
                rotation_speed: 0.0,
                scale: 1.0,
                scale_start: 1.0,
                scale_target: 1.0,
            },
            size: 60.0,
            base_opacity: 0.9,
            opacity: 0.9,
            spawned_at: 0.0,
            lifetime: 2000.0,
            opacity_phase: 0.0,
            texture_seed: 42,
            phase: Phase::Animating,
        }
    }

    fn every_style() -> Vec<ShapeStyle> {
        let mut styles = Vec::new();
        styles.extend(GeometricShape::ALL.map(ShapeStyle::Geometric));
        styles.extend(ParticleShape::ALL.map(ShapeStyle::Particle));
        styles.extend(BrushStyle::ALL.map(ShapeStyle::Brush));
        styles.extend(OrganicForm::ALL.map(ShapeStyle::Organic));
        styles
    }

    #[test]
    fn every_known_variant_leaves_ink() {
        for style in every_style() {
            let mut canvas = Canvas::new(100, 100, [0, 0, 0, 255]).unwrap();
            draw_shape(&mut canvas, &shape_with(style), 500.0).unwrap();
            assert!(!canvas.is_blank(), "{:?} drew nothing", style);
        }
        assert_eq!(every_style().len(), 19);
        assert!(every_style().iter().any(|s| s.family() == VisualFamily::Particle));
    }

    #[test]
    fn transparent_shapes_are_skipped() {
        let mut canvas = Canvas::new(100, 100, [0, 0, 0, 255]).unwrap();
        let mut shape = shape_with(ShapeStyle::Geometric(GeometricShape::Square));
        shape.opacity = 0.0;
        draw_shape(&mut canvas, &shape, 0.0).unwrap();
        assert!(canvas.is_blank());
    }

    #[test]
    fn brush_texture_is_stable_between_frames() {
        let shape = shape_with(ShapeStyle::Brush(BrushStyle::Spray));
        let mut a = Canvas::new(100, 100, [0, 0, 0, 255]).unwrap();
        let mut b = Canvas::new(100, 100, [0, 0, 0, 255]).unwrap();
        draw_shape(&mut a, &shape, 0.0).unwrap();
        draw_shape(&mut b, &shape, 900.0).unwrap();
        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[cfg(debug_assertions)]
    #[test]
    fn unknown_variant_is_reported_in_debug() {
        let mut canvas = Canvas::new(100, 100, [0, 0, 0, 255]).unwrap();
        let shape = shape_with(ShapeStyle::Organic(OrganicForm::Unknown));
        assert!(matches!(
            draw_shape(&mut canvas, &shape, 0.0),
            Err(RenderError::UnknownVariant("organic"))
        ));
        assert!(canvas.is_blank());
    }

    #[test]
    fn star_has_twice_the_spikes_in_vertices() {
        let path = star(5, 10.0, 4.5).unwrap();
        // 10 line segments plus move and close
        assert_eq!(path.points().len(), 10);
        let outer = path.points()[0];
        assert!((outer.y + 10.0).abs() < 1e-4);
    }

    #[test]
    fn polygon_vertices_sit_on_radius() {
        let path = polygon(6, 20.0).unwrap();
        for p in path.points() {
            assert!(((p.x * p.x + p.y * p.y).sqrt() - 20.0).abs() < 1e-3);
        }
    }
}
