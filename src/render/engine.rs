use image::RgbaImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::TAU;
use std::sync::Arc;
use std::time::Instant;

use super::canvas::Canvas;
use super::entity::{FadeWindow, FrameContext, Motion, Particle, Phase, Shape};
use super::shapes::{draw_particle, draw_shape};
use super::RenderError;
use crate::audio::features::AudioFeatures;
use crate::mapping::style::{ParticleShape, ShapeStyle, VisualFamily};
use crate::mapping::VisualMapping;

/// Scaled amplitude a tick needs before it spawns anything.
pub const SPAWN_THRESHOLD: f64 = 0.02;

/// Caller-controlled knobs, passed into every tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderOptions {
    /// Global opacity multiplier (0.0-1.0)
    pub opacity: f64,
    /// Amplitude multiplier applied before the spawn threshold
    pub sensitivity: f64,
    pub fade_enabled: bool,
    /// How long entities hold after the input goes quiet (ms)
    pub fade_duration_ms: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            sensitivity: 1.0,
            fade_enabled: false,
            fade_duration_ms: 3000.0,
        }
    }
}

/// Bounds applied to a freshly spawned entity's opacity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OpacityLimits {
    pub floor: f64,
    pub ceiling: f64,
}

impl Default for OpacityLimits {
    fn default() -> Self {
        Self { floor: 0.1, ceiling: 1.0 }
    }
}

impl OpacityLimits {
    fn apply(&self, opacity: f64) -> f64 {
        opacity.max(self.floor).min(self.ceiling)
    }
}

/// Owns the live shapes and particles and the surface they are drawn on.
pub struct Engine {
    canvas: Canvas,
    shapes: Vec<Shape>,
    particles: Vec<Particle>,
    clock_ms: f64,
    last_tick: Option<Instant>,
    /// Clock time of the most recent tick loud enough to spawn.
    last_audible_ms: f64,
    limits: OpacityLimits,
    rng: StdRng,
    reported_unknown: bool,
}

impl Engine {
    pub fn new(width: u32, height: u32, background: [u8; 4], limits: OpacityLimits) -> Result<Self, RenderError> {
        Self::with_rng(width, height, background, limits, StdRng::from_entropy())
    }

    /// Same as [`Engine::new`] with a fixed placement seed.
    #[cfg(test)]
    pub fn with_seed(
        width: u32,
        height: u32,
        background: [u8; 4],
        limits: OpacityLimits,
        seed: u64,
    ) -> Result<Self, RenderError> {
        Self::with_rng(width, height, background, limits, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        width: u32,
        height: u32,
        background: [u8; 4],
        limits: OpacityLimits,
        rng: StdRng,
    ) -> Result<Self, RenderError> {
        Ok(Self {
            canvas: Canvas::new(width, height, background)?,
            shapes: Vec::new(),
            particles: Vec::new(),
            clock_ms: 0.0,
            last_tick: None,
            last_audible_ms: 0.0,
            limits,
            rng,
            reported_unknown: false,
        })
    }

    /// Advance by the wall time elapsed since the previous call.
    pub fn tick(
        &mut self,
        mapping: Option<&Arc<VisualMapping>>,
        features: Option<&AudioFeatures>,
        options: &RenderOptions,
    ) {
        let now = Instant::now();
        let delta_ms = self
            .last_tick
            .map(|prev| now.duration_since(prev).as_secs_f64() * 1000.0)
            .unwrap_or(0.0);
        self.last_tick = Some(now);
        self.step(delta_ms, mapping, features, options);
    }

    /// One frame: spawn from loud features, advance every entity, drop the
    /// expired ones and redraw.
    pub fn step(
        &mut self,
        delta_ms: f64,
        mapping: Option<&Arc<VisualMapping>>,
        features: Option<&AudioFeatures>,
        options: &RenderOptions,
    ) {
        self.clock_ms += delta_ms.max(0.0);

        if let Some(features) = features {
            let scaled = (features.amplitude as f64 * options.sensitivity).min(1.0);
            if scaled >= SPAWN_THRESHOLD {
                self.last_audible_ms = self.clock_ms;
                if let Some(mapping) = mapping {
                    self.spawn(mapping, scaled, options);
                }
            }
        }

        let frame = FrameContext {
            clock_ms: self.clock_ms,
            fade: options.fade_enabled.then(|| FadeWindow {
                age_ms: self.clock_ms - self.last_audible_ms,
                hold_ms: options.fade_duration_ms,
            }),
        };
        self.shapes.retain_mut(|s| s.advance(&frame) != Phase::Expired);
        self.particles.retain_mut(|p| p.advance(&frame) != Phase::Expired);

        log::trace!(
            "t={:.0}ms shapes={} particles={}",
            self.clock_ms,
            self.shapes.len(),
            self.particles.len()
        );

        self.draw();
    }

    fn spawn(&mut self, mapping: &Arc<VisualMapping>, scaled: f64, options: &RenderOptions) {
        let x = self.rng.gen_range(0.0..self.canvas.width() as f64);
        let y = self.rng.gen_range(0.0..self.canvas.height() as f64);
        let size = mapping.size_base * (1.0 + scaled * 3.0);
        let opacity = self
            .limits
            .apply(mapping.opacity_base * options.opacity * (0.5 + scaled));

        match mapping.family() {
            VisualFamily::Particle => self.spawn_particles(mapping, x, y, size, opacity, scaled),
            VisualFamily::Geometric | VisualFamily::Brush | VisualFamily::Organic => {
                self.spawn_shape(mapping, x, y, size, opacity)
            }
        }
    }

    fn spawn_shape(&mut self, mapping: &Arc<VisualMapping>, x: f64, y: f64, size: f64, opacity: f64) {
        let heading = self.rng.gen_range(0.0..TAU);
        let speed: f64 = self.rng.gen_range(20.0..60.0);
        let shape = Shape {
            mapping: Arc::clone(mapping),
            motion: Motion {
                x,
                y,
                vx: heading.cos() * speed,
                vy: heading.sin() * speed,
                rotation: self.rng.gen_range(0.0..TAU),
                rotation_speed: self.rng.gen_range(-2.0..2.0),
                scale: 0.3,
                scale_start: 0.3,
                scale_target: 1.0,
            },
            size,
            base_opacity: opacity,
            opacity,
            spawned_at: self.clock_ms,
            lifetime: self.rng.gen_range(1000.0..3000.0),
            opacity_phase: self.rng.gen_range(0.0..TAU),
            texture_seed: self.rng.gen(),
            phase: Phase::Spawned,
        };
        self.shapes.push(shape);
    }

    fn spawn_particles(
        &mut self,
        mapping: &Arc<VisualMapping>,
        x: f64,
        y: f64,
        size: f64,
        opacity: f64,
        scaled: f64,
    ) {
        let variant = match mapping.style {
            ShapeStyle::Particle(variant) => variant,
            _ => ParticleShape::Dot,
        };
        let count = 5 + (scaled * 15.0).floor() as usize;
        let ring = size * 0.5;

        for i in 0..count {
            let angle = i as f64 / count as f64 * TAU;
            let speed: f64 = self.rng.gen_range(50.0..150.0);
            let (color, glow) = if i % 2 == 0 {
                (mapping.primary, mapping.secondary)
            } else {
                (mapping.secondary, mapping.primary)
            };
            self.particles.push(Particle {
                motion: Motion {
                    x: x + angle.cos() * ring,
                    y: y + angle.sin() * ring,
                    vx: angle.cos() * speed,
                    vy: angle.sin() * speed,
                    rotation: angle,
                    rotation_speed: self.rng.gen_range(-2.0..2.0),
                    scale: 1.0,
                    scale_start: 1.0,
                    scale_target: 0.4,
                },
                radius: size * (0.1 + self.rng.gen_range(0.0f64..0.2)),
                color,
                glow,
                variant,
                base_opacity: opacity,
                opacity,
                spawned_at: self.clock_ms,
                lifetime: self.rng.gen_range(1000.0..3000.0),
                phase: Phase::Spawned,
            });
        }
    }

    fn draw(&mut self) {
        self.canvas.clear();
        let mut failure = None;
        for shape in &self.shapes {
            if let Err(e) = draw_shape(&mut self.canvas, shape, self.clock_ms) {
                failure.get_or_insert(e);
            }
        }
        for particle in &self.particles {
            if let Err(e) = draw_particle(&mut self.canvas, particle) {
                failure.get_or_insert(e);
            }
        }
        if let Some(e) = failure {
            if !self.reported_unknown {
                log::warn!("Skipping entities that cannot be drawn: {}", e);
                self.reported_unknown = true;
            }
        }
    }

    /// Remove every live entity and wipe the surface. Mappings are untouched.
    pub fn clear(&mut self) {
        self.shapes.clear();
        self.particles.clear();
        self.canvas.clear();
    }

    pub fn snapshot(&self) -> RgbaImage {
        self.canvas.snapshot()
    }

    /// Current frame as straight RGBA bytes, the layout the video pipe expects.
    pub fn frame(&self) -> Vec<u8> {
        self.canvas.snapshot().into_raw()
    }

    #[cfg(test)]
    pub fn is_blank(&self) -> bool {
        self.canvas.is_blank()
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn live_count(&self) -> usize {
        self.shapes.len() + self.particles.len()
    }
}
