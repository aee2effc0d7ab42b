use std::sync::Arc;

use super::easing::{ease_in_out_cubic, ease_out_quad};
use crate::mapping::style::{Hsl, ParticleShape};
use crate::mapping::VisualMapping;

/// Simulation step applied to position and rotation on every tick (seconds).
pub const FIXED_TIMESTEP: f64 = 1.0 / 60.0;

/// Length of the entrance animation in fade mode.
pub const ENTRANCE_MS: f64 = 1000.0;

/// Fade-out tail after the hold period in fade mode.
pub const FADE_TAIL_MS: f64 = 1500.0;

/// Lifecycle of a shape or particle. Never moves backwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Spawned,
    Animating,
    Expired,
}

/// Shared fade window for one tick: how long the input has been quiet and
/// how long entities hold before dissolving.
#[derive(Clone, Copy, Debug)]
pub struct FadeWindow {
    pub age_ms: f64,
    pub hold_ms: f64,
}

impl FadeWindow {
    /// 1.0 during the hold, then a linear ramp to 0.0 over the tail.
    pub fn multiplier(&self) -> f64 {
        if self.age_ms <= self.hold_ms {
            1.0
        } else {
            (1.0 - (self.age_ms - self.hold_ms) / FADE_TAIL_MS).max(0.0)
        }
    }

    pub fn is_over(&self) -> bool {
        self.age_ms >= self.hold_ms + FADE_TAIL_MS
    }
}

/// Per-tick context handed to every entity.
#[derive(Clone, Copy, Debug)]
pub struct FrameContext {
    pub clock_ms: f64,
    pub fade: Option<FadeWindow>,
}

#[derive(Clone, Debug)]
pub struct Motion {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub rotation: f64,
    pub rotation_speed: f64,
    pub scale: f64,
    pub scale_start: f64,
    pub scale_target: f64,
}

impl Motion {
    fn step(&mut self) {
        self.x += self.vx * FIXED_TIMESTEP;
        self.y += self.vy * FIXED_TIMESTEP;
        self.rotation += self.rotation_speed * FIXED_TIMESTEP;
    }

    fn ease_scale(&mut self, eased: f64) {
        self.scale = self.scale_start + (self.scale_target - self.scale_start) * eased;
    }

    /// Advance kinematics for one tick. Returns the lifecycle opacity factor,
    /// or `None` once the entity has expired.
    fn advance(&mut self, spawned_at: f64, lifetime: f64, frame: &FrameContext, ease: fn(f64) -> f64) -> Option<f64> {
        let elapsed = (frame.clock_ms - spawned_at).max(0.0);
        match frame.fade {
            None => {
                let progress = (elapsed / lifetime).min(1.0);
                self.ease_scale(ease(progress));
                self.step();
                if progress >= 1.0 {
                    None
                } else {
                    Some(1.0 - 0.3 * progress)
                }
            }
            Some(window) => {
                let entrance = (elapsed / ENTRANCE_MS).min(1.0);
                self.ease_scale(ease(entrance));
                if entrance < 1.0 {
                    self.step();
                }
                if window.is_over() {
                    None
                } else {
                    Some(window.multiplier())
                }
            }
        }
    }
}

/// A single styled shape drawn from its mapping's family and variant.
#[derive(Clone, Debug)]
pub struct Shape {
    pub mapping: Arc<VisualMapping>,
    pub motion: Motion,
    pub size: f64,
    pub base_opacity: f64,
    pub opacity: f64,
    pub spawned_at: f64,
    pub lifetime: f64,
    pub opacity_phase: f64,
    /// Seeds the randomized sub-primitives of brush strokes so they hold
    /// still between frames.
    pub texture_seed: u64,
    pub phase: Phase,
}

impl Shape {
    pub fn advance(&mut self, frame: &FrameContext) -> Phase {
        match self
            .motion
            .advance(self.spawned_at, self.lifetime, frame, ease_in_out_cubic)
        {
            Some(factor) => {
                let shimmer = 0.85 + 0.15 * (frame.clock_ms / 1000.0 * 3.0 + self.opacity_phase).sin();
                self.opacity = self.base_opacity * factor * shimmer;
                self.phase = Phase::Animating;
            }
            None => {
                self.opacity = 0.0;
                self.phase = Phase::Expired;
            }
        }
        self.phase
    }

    /// Current drawing radius.
    pub fn radius(&self) -> f64 {
        self.size * 0.5 * self.motion.scale
    }
}

/// One fragment of a particle burst, carrying its own resolved colour.
#[derive(Clone, Debug)]
pub struct Particle {
    pub motion: Motion,
    pub radius: f64,
    pub color: Hsl,
    pub glow: Hsl,
    pub variant: ParticleShape,
    pub base_opacity: f64,
    pub opacity: f64,
    pub spawned_at: f64,
    pub lifetime: f64,
    pub phase: Phase,
}

impl Particle {
    pub fn advance(&mut self, frame: &FrameContext) -> Phase {
        match self
            .motion
            .advance(self.spawned_at, self.lifetime, frame, ease_out_quad)
        {
            Some(factor) => {
                self.opacity = self.base_opacity * factor;
                self.phase = Phase::Animating;
            }
            None => {
                self.opacity = 0.0;
                self.phase = Phase::Expired;
            }
        }
        self.phase
    }

    pub fn current_radius(&self) -> f64 {
        self.radius * self.motion.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn motion() -> Motion {
        Motion {
            x: 0.0,
            y: 0.0,
            vx: 60.0,
            vy: -30.0,
            rotation: 0.0,
            rotation_speed: 1.2,
            scale: 0.3,
            scale_start: 0.3,
            scale_target: 1.0,
        }
    }

    fn particle(lifetime: f64) -> Particle {
        Particle {
            motion: motion(),
            radius: 4.0,
            color: Hsl::new(10.0, 80.0, 50.0),
            glow: Hsl::new(190.0, 80.0, 50.0),
            variant: ParticleShape::Dot,
            base_opacity: 0.8,
            opacity: 0.8,
            spawned_at: 0.0,
            lifetime,
            phase: Phase::Spawned,
        }
    }

    fn frame(clock_ms: f64) -> FrameContext {
        FrameContext { clock_ms, fade: None }
    }

    fn fading(clock_ms: f64, age_ms: f64, hold_ms: f64) -> FrameContext {
        FrameContext {
            clock_ms,
            fade: Some(FadeWindow { age_ms, hold_ms }),
        }
    }

    #[test]
    fn fixed_step_moves_by_velocity_over_sixty() {
        let mut p = particle(2000.0);
        p.advance(&frame(100.0));
        assert!((p.motion.x - 1.0).abs() < 1e-12);
        assert!((p.motion.y + 0.5).abs() < 1e-12);
        assert!((p.motion.rotation - 0.02).abs() < 1e-12);
        assert_eq!(p.phase, Phase::Animating);
    }

    #[test]
    fn decays_and_expires_at_lifetime() {
        let mut p = particle(2000.0);
        p.advance(&frame(1000.0));
        assert!((p.opacity - 0.8 * 0.85).abs() < 1e-12);
        assert_eq!(p.advance(&frame(1999.0)), Phase::Animating);
        assert_eq!(p.advance(&frame(2000.0)), Phase::Expired);
        assert_eq!(p.opacity, 0.0);
    }

    #[test]
    fn scale_follows_easing() {
        let mut p = particle(1000.0);
        p.advance(&frame(500.0));
        let expected = 0.3 + 0.7 * ease_out_quad(0.5);
        assert!((p.motion.scale - expected).abs() < 1e-12);
    }

    #[test]
    fn fade_mode_ignores_own_lifetime() {
        let mut p = particle(1000.0);
        assert_eq!(p.advance(&fading(5000.0, 100.0, 3000.0)), Phase::Animating);
        assert_eq!(p.opacity, 0.8);
    }

    #[test]
    fn fade_mode_holds_pose_after_entrance() {
        let mut p = particle(1000.0);
        p.advance(&fading(1500.0, 0.0, 3000.0));
        let (x, y, r) = (p.motion.x, p.motion.y, p.motion.rotation);
        p.advance(&fading(1600.0, 0.0, 3000.0));
        assert_eq!((p.motion.x, p.motion.y, p.motion.rotation), (x, y, r));
        assert_eq!(p.motion.scale, 1.0);
    }

    #[test]
    fn fade_window_ramp() {
        let w = |age| FadeWindow { age_ms: age, hold_ms: 3000.0 };
        assert_eq!(w(0.0).multiplier(), 1.0);
        assert_eq!(w(3000.0).multiplier(), 1.0);
        assert!((w(3750.0).multiplier() - 0.5).abs() < 1e-12);
        assert_eq!(w(4500.0).multiplier(), 0.0);
        assert!(!w(4499.0).is_over());
        assert!(w(4500.0).is_over());
    }

    #[test]
    fn shape_shimmer_stays_within_band() {
        let mapping = crate::mapping::generate::generate_mapping(
            "0-0-0-0",
            crate::audio::features::Buckets::parse("0-0-0-0").unwrap(),
            chrono::Utc::now(),
        );
        let mut shape = Shape {
            mapping: Arc::new(mapping),
            motion: motion(),
            size: 40.0,
            base_opacity: 0.6,
            opacity: 0.6,
            spawned_at: 0.0,
            lifetime: 10_000.0,
            opacity_phase: 1.0,
            texture_seed: 7,
            phase: Phase::Spawned,
        };
        for t in (0..50).map(|i| i as f64 * 100.0) {
            shape.advance(&frame(t));
            let factor = 1.0 - 0.3 * t / 10_000.0;
            assert!(shape.opacity <= 0.6 * factor + 1e-12);
            assert!(shape.opacity >= 0.6 * factor * 0.7 - 1e-12);
        }
    }
}
