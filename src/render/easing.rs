pub fn ease_in_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

pub fn ease_out_quad(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_fixed() {
        for ease in [ease_in_out_cubic, ease_out_quad] {
            assert_eq!(ease(0.0), 0.0);
            assert_eq!(ease(1.0), 1.0);
            assert_eq!(ease(-3.0), 0.0);
            assert_eq!(ease(7.0), 1.0);
        }
    }

    #[test]
    fn cubic_is_symmetric_around_midpoint() {
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-12);
        let a = ease_in_out_cubic(0.2);
        let b = ease_in_out_cubic(0.8);
        assert!((a + b - 1.0).abs() < 1e-12);
    }

    #[test]
    fn quad_front_loads_motion() {
        assert!((ease_out_quad(0.5) - 0.75).abs() < 1e-12);
        let mut prev = 0.0;
        for i in 1..=10 {
            let v = ease_out_quad(i as f64 / 10.0);
            assert!(v > prev);
            prev = v;
        }
    }
}
