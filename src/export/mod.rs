//! Raster export: PNG, JPEG or single-page PDF, optionally pushed through a
//! naive CMYK round trip first.

pub mod cmyk;
pub mod pdf;

use clap::ValueEnum;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
    #[error("nothing to export: surface is {0}x{1}")]
    EmptySurface(u32, u32),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    #[default]
    Rgb,
    Cmyk,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
    Pdf,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
            ExportFormat::Pdf => "pdf",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ExportOptions {
    pub color_space: ColorSpace,
    pub format: ExportFormat,
    /// JPEG quality (0-100). PNG is lossless and ignores it.
    pub quality: u8,
    pub filename: PathBuf,
}

/// Encode `image` into the bytes of the requested format.
pub fn encode(image: &RgbaImage, options: &ExportOptions) -> Result<Vec<u8>, ExportError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ExportError::EmptySurface(image.width(), image.height()));
    }

    let mut pixels = image.clone();
    if options.color_space == ColorSpace::Cmyk {
        cmyk::round_trip(&mut pixels);
    }

    match options.format {
        ExportFormat::Png => {
            let mut buf = Vec::new();
            PngEncoder::new(&mut buf).write_image(
                pixels.as_raw(),
                pixels.width(),
                pixels.height(),
                ExtendedColorType::Rgba8,
            )?;
            Ok(buf)
        }
        ExportFormat::Jpeg => encode_jpeg(pixels, options.quality),
        ExportFormat::Pdf => {
            let (width, height) = pixels.dimensions();
            let jpeg = encode_jpeg(pixels, options.quality)?;
            Ok(pdf::single_page(&jpeg, width, height)?)
        }
    }
}

fn encode_jpeg(pixels: RgbaImage, quality: u8) -> Result<Vec<u8>, ExportError> {
    let rgb = DynamicImage::ImageRgba8(pixels).to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).write_image(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(buf)
}

/// Encode and write to `options.filename`, adding the format's extension when
/// the name has none. Returns the path written.
pub fn export(image: &RgbaImage, options: &ExportOptions) -> Result<PathBuf, ExportError> {
    let bytes = encode(image, options)?;
    let path = with_extension(&options.filename, options.format);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, bytes)?;
    log::info!(
        "Exported {} ({:?}, {:?}, quality {})",
        path.display(),
        options.format,
        options.color_space,
        options.quality
    );
    Ok(path)
}

fn with_extension(filename: &Path, format: ExportFormat) -> PathBuf {
    if filename.extension().is_some() {
        filename.to_path_buf()
    } else {
        filename.with_extension(format.extension())
    }
}
