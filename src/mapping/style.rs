use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualFamily {
    Geometric,
    Particle,
    Brush,
    Organic,
}

impl VisualFamily {
    pub const ALL: [VisualFamily; 4] = [
        VisualFamily::Geometric,
        VisualFamily::Particle,
        VisualFamily::Brush,
        VisualFamily::Organic,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometricShape {
    Circle,
    Triangle,
    Square,
    Pentagon,
    Hexagon,
    Star,
    #[serde(other)]
    Unknown,
}

impl GeometricShape {
    pub const ALL: [GeometricShape; 6] = [
        GeometricShape::Circle,
        GeometricShape::Triangle,
        GeometricShape::Square,
        GeometricShape::Pentagon,
        GeometricShape::Hexagon,
        GeometricShape::Star,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticleShape {
    Dot,
    Spark,
    Ring,
    #[serde(other)]
    Unknown,
}

impl ParticleShape {
    pub const ALL: [ParticleShape; 3] = [ParticleShape::Dot, ParticleShape::Spark, ParticleShape::Ring];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrushStyle {
    Soft,
    Textured,
    Splatter,
    Calligraphy,
    Spray,
    #[serde(other)]
    Unknown,
}

impl BrushStyle {
    pub const ALL: [BrushStyle; 5] = [
        BrushStyle::Soft,
        BrushStyle::Textured,
        BrushStyle::Splatter,
        BrushStyle::Calligraphy,
        BrushStyle::Spray,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrganicForm {
    Blob,
    Wave,
    Tentacle,
    Fractal,
    Flow,
    #[serde(other)]
    Unknown,
}

impl OrganicForm {
    pub const ALL: [OrganicForm; 5] = [
        OrganicForm::Blob,
        OrganicForm::Wave,
        OrganicForm::Tentacle,
        OrganicForm::Fractal,
        OrganicForm::Flow,
    ];
}

/// A visual family together with its family-scoped variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", content = "variant", rename_all = "lowercase")]
pub enum ShapeStyle {
    Geometric(GeometricShape),
    Particle(ParticleShape),
    Brush(BrushStyle),
    Organic(OrganicForm),
}

impl ShapeStyle {
    pub fn family(&self) -> VisualFamily {
        match self {
            ShapeStyle::Geometric(_) => VisualFamily::Geometric,
            ShapeStyle::Particle(_) => VisualFamily::Particle,
            ShapeStyle::Brush(_) => VisualFamily::Brush,
            ShapeStyle::Organic(_) => VisualFamily::Organic,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationStyle {
    Pulse,
    Rotate,
    Drift,
    Bloom,
    Shimmer,
}

impl AnimationStyle {
    pub const ALL: [AnimationStyle; 5] = [
        AnimationStyle::Pulse,
        AnimationStyle::Rotate,
        AnimationStyle::Drift,
        AnimationStyle::Bloom,
        AnimationStyle::Shimmer,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyRange {
    Low,
    Mid,
    High,
}

impl FrequencyRange {
    pub fn from_hz(frequency: f64) -> Self {
        if frequency < 300.0 {
            FrequencyRange::Low
        } else if frequency < 2000.0 {
            FrequencyRange::Mid
        } else {
            FrequencyRange::High
        }
    }
}

/// Colour as hue (degrees), saturation and lightness (percent).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

impl Hsl {
    pub fn new(h: f64, s: f64, l: f64) -> Self {
        Self { h, s, l }
    }

    pub fn to_rgb(&self) -> [u8; 3] {
        let s = (self.s / 100.0).clamp(0.0, 1.0);
        let l = (self.l / 100.0).clamp(0.0, 1.0);
        let h = self.h.rem_euclid(360.0) / 60.0;

        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = l - c / 2.0;
        let to_byte = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        [to_byte(r), to_byte(g), to_byte(b)]
    }
}
