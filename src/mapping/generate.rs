use chrono::{DateTime, Utc};

use super::style::{
    AnimationStyle, BrushStyle, FrequencyRange, GeometricShape, Hsl, OrganicForm, ParticleShape,
    ShapeStyle, VisualFamily,
};
use super::VisualMapping;
use crate::audio::features::{Buckets, DominantBand};

const LCG_MULTIPLIER: u64 = 9301;
const LCG_INCREMENT: u64 = 49297;
const LCG_MODULUS: u64 = 233280;

/// 32-bit polynomial rolling hash (`h * 31 + c` over UTF-16 code units),
/// returned as its absolute value.
pub fn signature_seed(signature: &str) -> u64 {
    let mut hash: i32 = 0;
    for unit in signature.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(unit as i32);
    }
    (hash as i64).unsigned_abs()
}

/// Linear-congruential generator. Deliberately weak: every stylistic choice
/// must be reproducible from the signature alone.
#[derive(Clone, Debug)]
pub struct Lcg {
    state: u64,
}

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next value in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        self.state = (self.state * LCG_MULTIPLIER + LCG_INCREMENT) % LCG_MODULUS;
        self.state as f64 / LCG_MODULUS as f64
    }

    pub fn pick<T: Copy>(&mut self, items: &[T]) -> T {
        let index = (self.next_f64() * items.len() as f64).floor() as usize;
        items[index.min(items.len() - 1)]
    }
}

/// Build the visual style for a signature. Pure apart from `created_at`.
pub fn generate_mapping(signature: &str, buckets: Buckets, created_at: DateTime<Utc>) -> VisualMapping {
    let seed = signature_seed(signature);
    let mut rng = Lcg::new(seed);

    let family = rng.pick(&VisualFamily::ALL);
    let style = match family {
        VisualFamily::Geometric => ShapeStyle::Geometric(rng.pick(&GeometricShape::ALL)),
        VisualFamily::Particle => ShapeStyle::Particle(rng.pick(&ParticleShape::ALL)),
        VisualFamily::Brush => ShapeStyle::Brush(rng.pick(&BrushStyle::ALL)),
        VisualFamily::Organic => ShapeStyle::Organic(rng.pick(&OrganicForm::ALL)),
    };
    let animation = rng.pick(&AnimationStyle::ALL);

    let hue = rng.next_f64() * 360.0;
    let saturation = 60.0 + rng.next_f64() * 40.0;
    let t = rng.next_f64();
    let lightness = match buckets.dominant_band() {
        DominantBand::Low => 35.0 + t * 25.0,
        DominantBand::High => 60.0 + t * 25.0,
        DominantBand::Mid => 45.0 + t * 20.0,
    };
    let primary = Hsl::new(hue, saturation, lightness);

    let offset = 150.0 + rng.next_f64() * 60.0;
    let secondary = Hsl::new((hue + offset) % 360.0, saturation, lightness);

    let frequency = buckets.frequency as f64;
    let size_base = 10.0 + (frequency / 2000.0).min(1.0) * 40.0 + rng.next_f64() * 20.0;
    let opacity_base = 0.5 + rng.next_f64() * 0.3;

    VisualMapping {
        id: format!("mapping-{:08x}", seed),
        signature: signature.to_string(),
        frequency_range: FrequencyRange::from_hz(frequency),
        style,
        primary,
        secondary,
        size_base,
        opacity_base,
        animation,
        created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn generate(signature: &str) -> VisualMapping {
        let buckets = Buckets::parse(signature).unwrap();
        generate_mapping(signature, buckets, DateTime::<Utc>::UNIX_EPOCH)
    }

    #[test]
    fn hash_is_stable() {
        assert_eq!(signature_seed(""), 0);
        assert_eq!(signature_seed("a"), 97);
        assert_eq!(signature_seed("0-0-0-0"), 984_532_697);
        assert_eq!(signature_seed("100-40-60-80"), 1_771_001_674);
    }

    #[test]
    fn hash_takes_absolute_value_of_overflowed_sums() {
        // both wrap past i32::MAX into negative territory
        assert_eq!(signature_seed("zzzzzz"), 685_785_664);
        assert_eq!(signature_seed("1950-240-0-0"), 218_645_334);
    }

    #[test]
    fn lcg_sequence_is_pinned() {
        let mut rng = Lcg::new(signature_seed("0-0-0-0"));
        let expected = [
            0.298070987654321,
            0.5695773319615912,
            0.8500857338820301,
            0.8587319958847737,
            0.2776148834019204,
        ];
        for value in expected {
            assert!(close(rng.next_f64(), value));
        }
    }

    #[test]
    fn lcg_values_stay_in_unit_interval() {
        let mut rng = Lcg::new(u32::MAX as u64);
        for _ in 0..10_000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn zero_signature_output_is_pinned() {
        let m = generate("0-0-0-0");
        assert_eq!(m.id, "mapping-3aaec6d9");
        assert_eq!(m.style, ShapeStyle::Particle(ParticleShape::Spark));
        assert_eq!(m.animation, AnimationStyle::Shimmer);
        assert_eq!(m.frequency_range, FrequencyRange::Low);
        assert!(close(m.primary.h, 309.14351851851853));
        assert!(close(m.primary.s, 71.10459533607681));
        assert!(close(m.primary.l, 51.147033607681756));
        assert!(close(m.secondary.h, 152.50154320987656));
        assert_eq!(m.secondary.s, m.primary.s);
        assert_eq!(m.secondary.l, m.primary.l);
        assert!(close(m.size_base, 21.888974622770917));
        assert!(close(m.opacity_base, 0.5536908436213992));
    }

    #[test]
    fn high_dominant_signature_output_is_pinned() {
        let m = generate("100-40-60-80");
        assert_eq!(m.style, ShapeStyle::Brush(BrushStyle::Textured));
        assert_eq!(m.animation, AnimationStyle::Rotate);
        assert!(close(m.primary.h, 271.76234567901236));
        assert!(close(m.primary.s, 79.7391975308642));
        // high band dominates → light range
        assert!(close(m.primary.l, 61.705675582990395));
        assert!(close(m.secondary.h, 109.21424897119346));
        assert!(close(m.size_base, 12.943930041152264));
        assert!(close(m.opacity_base, 0.5557960390946503));
    }

    #[test]
    fn generation_is_deterministic() {
        let a = generate("1450-120-80-20");
        let b = generate("1450-120-80-20");
        assert_eq!(a, b);
    }

    #[test]
    fn secondary_hue_is_complementary() {
        for sig in ["0-0-0-0", "50-20-20-20", "300-0-140-60", "1950-240-0-0"] {
            let m = generate(sig);
            let diff = (m.secondary.h - m.primary.h).rem_euclid(360.0);
            assert!((150.0..210.0).contains(&diff), "{}: {}", sig, diff);
        }
    }

    #[test]
    fn ranges_hold_for_many_signatures() {
        for f in (0..4000).step_by(250) {
            for band in (0..=240).step_by(60) {
                let sig = format!("{}-{}-{}-{}", f, band, 240 - band, band / 2);
                let m = generate(&sig);
                assert!((0.0..360.0).contains(&m.primary.h));
                assert!((60.0..100.0).contains(&m.primary.s));
                assert!((35.0..85.0).contains(&m.primary.l));
                assert!((10.0..70.0).contains(&m.size_base));
                assert!((0.5..0.8).contains(&m.opacity_base));
            }
        }
    }
}
