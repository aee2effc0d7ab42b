use clap::Parser;
use std::path::PathBuf;

use crate::config::{self, Config};
use crate::export::{ColorSpace, ExportFormat};

#[derive(Parser, Debug)]
#[command(name = "sonaura", about = "Turns live sound into generative artwork")]
pub struct Cli {
    /// Where the finished artwork is exported (extension follows --format)
    #[arg(short, long, default_value = "artwork")]
    pub output: PathBuf,

    /// Title stored with the artwork
    #[arg(short, long)]
    pub title: Option<String>,

    /// Canvas width in pixels
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Canvas height in pixels
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Ticks per second
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Background colour (#rgb, #rrggbb or #rrggbbaa)
    #[arg(long, default_value = "#000000")]
    pub background: String,

    /// Input device name (default input device when omitted)
    #[arg(short, long)]
    pub device: Option<String>,

    /// Play an audio file in real time instead of capturing the microphone
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// Stop after this many seconds (runs until Ctrl+C otherwise)
    #[arg(long, value_parser = parse_duration)]
    pub duration: Option<f64>,

    /// Spectrum smoothing factor (0.0-1.0)
    #[arg(long, default_value_t = 0.8)]
    pub smoothing: f32,

    /// Global opacity multiplier (0.0-1.0)
    #[arg(long, default_value_t = 1.0)]
    pub opacity: f64,

    /// Amplitude multiplier before the spawn threshold
    #[arg(long, default_value_t = 1.0)]
    pub sensitivity: f64,

    /// Keep everything on the canvas and dissolve it once the sound stops
    #[arg(long)]
    pub fade: bool,

    /// How long the canvas holds after the sound stops (ms)
    #[arg(long, default_value_t = 3000)]
    pub fade_duration: u64,

    /// Export format
    #[arg(long, value_enum, default_value_t = ExportFormat::Png)]
    pub format: ExportFormat,

    /// Export colour space
    #[arg(long, value_enum, default_value_t = ColorSpace::Rgb)]
    pub color_space: ColorSpace,

    /// JPEG quality (0-100), also used for the PDF page image
    #[arg(long, default_value_t = 92, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub quality: u8,

    /// Directory holding mappings.json and the artwork collection
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Keep mappings and artworks in memory only
    #[arg(long)]
    pub ephemeral: bool,

    /// Also record the session to a video file through ffmpeg
    #[arg(long)]
    pub video: Option<PathBuf>,

    /// FFmpeg video codec for --video
    #[arg(long, default_value = "libx264")]
    pub codec: String,

    /// FFmpeg pixel format for --video
    #[arg(long, default_value = "yuv420p")]
    pub pix_fmt: String,

    /// CRF quality for --video (0-51, lower = better)
    #[arg(long, default_value_t = 18)]
    pub crf: u32,

    /// Config file (TOML). Auto-detected when omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// List audio devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// List stored artworks and exit
    #[arg(long)]
    pub list_artworks: bool,

    /// Delete a stored artwork by id and exit
    #[arg(long)]
    pub delete_artwork: Option<String>,

    /// Forget every stored sound→visual mapping and exit
    #[arg(long)]
    pub clear_mappings: bool,
}

/// Longest session `--duration` accepts: one week.
const MAX_DURATION_SECS: f64 = 7.0 * 24.0 * 3600.0;

fn parse_duration(s: &str) -> Result<f64, String> {
    let secs: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if !secs.is_finite() || !(0.0..=MAX_DURATION_SECS).contains(&secs) {
        return Err(format!("expected seconds between 0 and {}", MAX_DURATION_SECS));
    }
    Ok(secs)
}

impl Cli {
    /// Config values apply only where the CLI is still at its default.
    pub fn merge(&mut self, cfg: &Config) {
        if self.width == config::default_width() { self.width = cfg.canvas.width; }
        if self.height == config::default_height() { self.height = cfg.canvas.height; }
        if self.fps == config::default_fps() { self.fps = cfg.canvas.fps; }
        if self.background == config::default_background() {
            self.background = cfg.canvas.background.clone();
        }
        if self.device.is_none() {
            self.device = cfg.audio.device.clone();
        }
        if self.smoothing == config::default_smoothing() { self.smoothing = cfg.audio.smoothing; }
        if self.opacity == 1.0 { self.opacity = cfg.render.opacity; }
        if self.sensitivity == 1.0 { self.sensitivity = cfg.render.sensitivity; }
        if !self.fade { self.fade = cfg.render.fade_enabled; }
        if self.fade_duration == config::default_fade_duration() {
            self.fade_duration = cfg.render.fade_duration_ms;
        }
        if self.format == ExportFormat::default() { self.format = cfg.export.format; }
        if self.color_space == ColorSpace::default() { self.color_space = cfg.export.color_space; }
        if self.quality == config::default_quality() { self.quality = cfg.export.quality; }
        if self.data_dir.is_none() {
            self.data_dir = cfg.storage.data_dir.clone();
        }
    }
}
