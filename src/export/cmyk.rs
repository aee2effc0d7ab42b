use image::RgbaImage;
use rayon::prelude::*;

/// Naive device CMYK, each channel in 0.0-1.0. Not colour-managed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cmyk {
    pub c: f64,
    pub m: f64,
    pub y: f64,
    pub k: f64,
}

pub fn rgb_to_cmyk(rgb: [u8; 3]) -> Cmyk {
    let [r, g, b] = rgb.map(|v| v as f64 / 255.0);
    let k = 1.0 - r.max(g).max(b);
    if k >= 1.0 {
        return Cmyk { c: 0.0, m: 0.0, y: 0.0, k: 1.0 };
    }
    Cmyk {
        c: (1.0 - r - k) / (1.0 - k),
        m: (1.0 - g - k) / (1.0 - k),
        y: (1.0 - b - k) / (1.0 - k),
        k,
    }
}

pub fn cmyk_to_rgb(cmyk: Cmyk) -> [u8; 3] {
    let channel = |v: f64| (255.0 * (1.0 - v) * (1.0 - cmyk.k)).round().clamp(0.0, 255.0) as u8;
    [channel(cmyk.c), channel(cmyk.m), channel(cmyk.y)]
}

/// Push every pixel through RGB → CMYK → RGB in place. Alpha is kept.
pub fn round_trip(image: &mut RgbaImage) {
    image.par_chunks_mut(4).for_each(|px| {
        let rgb = cmyk_to_rgb(rgb_to_cmyk([px[0], px[1], px[2]]));
        px[..3].copy_from_slice(&rgb);
    });
}
