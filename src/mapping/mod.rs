pub mod cache;
pub mod generate;
pub mod style;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use style::{AnimationStyle, FrequencyRange, Hsl, ShapeStyle, VisualFamily};

/// The persistent visual style bound to one signature. Never mutated after
/// creation, so the same sound keeps the same look.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisualMapping {
    pub id: String,
    pub signature: String,
    pub frequency_range: FrequencyRange,
    pub style: ShapeStyle,
    pub primary: Hsl,
    pub secondary: Hsl,
    pub size_base: f64,
    pub opacity_base: f64,
    pub animation: AnimationStyle,
    pub created_at: DateTime<Utc>,
}

impl VisualMapping {
    pub fn family(&self) -> VisualFamily {
        self.style.family()
    }
}
