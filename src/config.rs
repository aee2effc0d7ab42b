use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::export::{ColorSpace, ExportFormat};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize)]
pub struct CanvasConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Hex colour, `#rgb`, `#rrggbb` or `#rrggbbaa`
    #[serde(default = "default_background")]
    pub background: String,
    #[serde(default = "default_fps")]
    pub fps: u32,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
}

#[derive(Debug, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_one")]
    pub opacity: f64,
    #[serde(default = "default_one")]
    pub sensitivity: f64,
    #[serde(default)]
    pub fade_enabled: bool,
    #[serde(default = "default_fade_duration")]
    pub fade_duration_ms: u64,
    #[serde(default = "default_opacity_floor")]
    pub opacity_floor: f64,
    #[serde(default = "default_one")]
    pub opacity_ceiling: f64,
}

#[derive(Debug, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub format: ExportFormat,
    #[serde(default)]
    pub color_space: ColorSpace,
    #[serde(default = "default_quality")]
    pub quality: u8,
}

#[derive(Debug, Default, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            background: default_background(),
            fps: default_fps(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            smoothing: default_smoothing(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            opacity: default_one(),
            sensitivity: default_one(),
            fade_enabled: false,
            fade_duration_ms: default_fade_duration(),
            opacity_floor: default_opacity_floor(),
            opacity_ceiling: default_one(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::default(),
            color_space: ColorSpace::default(),
            quality: default_quality(),
        }
    }
}

pub fn default_width() -> u32 { 1280 }
pub fn default_height() -> u32 { 720 }
pub fn default_background() -> String { "#000000".into() }
pub fn default_fps() -> u32 { 60 }
pub fn default_smoothing() -> f32 { 0.8 }
pub fn default_fade_duration() -> u64 { 3000 }
pub fn default_quality() -> u8 { 92 }
fn default_one() -> f64 { 1.0 }
fn default_opacity_floor() -> f64 { 0.1 }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            log::debug!("{}: {}", path.display(), e);
            None
        }
    }
}

/// Explicit path, or the first of `sonaura.toml`, `~/.config/sonaura/config.toml`
/// and the platform config dir that exists.
pub fn discover(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| {
        let local = PathBuf::from("sonaura.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("sonaura").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("sonaura").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    })
}

/// Where mappings and artworks live when nothing else is configured.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("sonaura"))
        .unwrap_or_else(|| PathBuf::from(".sonaura"))
}

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` into RGBA bytes.
pub fn parse_color(hex: &str) -> Option<[u8; 4]> {
    let hex = hex.trim().strip_prefix('#').unwrap_or(hex.trim());
    if !hex.is_ascii() {
        return None;
    }
    let byte = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut out = [255u8; 4];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                out[i] = v * 17;
            }
            Some(out)
        }
        6 => Some([byte(&hex[0..2])?, byte(&hex[2..4])?, byte(&hex[4..6])?, 255]),
        8 => Some([byte(&hex[0..2])?, byte(&hex[2..4])?, byte(&hex[4..6])?, byte(&hex[6..8])?]),
        _ => None,
    }
}
