use chrono::{DateTime, Utc};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{read_collection, write_collection, StoreError};

/// A finished piece: metadata plus the file name of its raster snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Artwork {
    pub id: String,
    pub title: String,
    pub image_file: String,
    pub duration_ms: u64,
    pub width: u32,
    pub height: u32,
    pub created_at: DateTime<Utc>,
}

pub trait ArtworkStore {
    fn append(&mut self, title: &str, raster: &RgbaImage, duration_ms: u64) -> Result<Artwork, StoreError>;
    fn load_all(&self) -> Result<Vec<Artwork>, StoreError>;
    /// Returns `false` when no artwork has that id.
    fn delete(&mut self, id: &str) -> Result<bool, StoreError>;
}

/// Ids are millisecond timestamps; appends landing in the same millisecond
/// get a `-2`, `-3`... suffix.
fn new_artwork(title: &str, raster: &RgbaImage, duration_ms: u64, taken: impl Fn(&str) -> bool) -> Artwork {
    let created_at = Utc::now();
    let stamp = format!("art-{}", created_at.format("%Y%m%d-%H%M%S%3f"));
    let mut id = stamp.clone();
    let mut n = 1;
    while taken(&id) {
        n += 1;
        id = format!("{}-{}", stamp, n);
    }
    Artwork {
        image_file: format!("{}.png", id),
        id,
        title: title.to_string(),
        duration_ms,
        width: raster.width(),
        height: raster.height(),
        created_at,
    }
}

/// `artworks.json` index plus one PNG per artwork under `artworks/`.
pub struct JsonArtworkStore {
    index: PathBuf,
    raster_dir: PathBuf,
    records: Vec<Artwork>,
}

impl JsonArtworkStore {
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let index = data_dir.join("artworks.json");
        let records = read_collection(&index)?;
        Ok(Self {
            index,
            raster_dir: data_dir.join("artworks"),
            records,
        })
    }

    pub fn raster_path(&self, artwork: &Artwork) -> PathBuf {
        self.raster_dir.join(&artwork.image_file)
    }
}

impl ArtworkStore for JsonArtworkStore {
    fn append(&mut self, title: &str, raster: &RgbaImage, duration_ms: u64) -> Result<Artwork, StoreError> {
        let artwork = new_artwork(title, raster, duration_ms, |id| {
            self.records.iter().any(|a| a.id == id) || self.raster_dir.join(format!("{}.png", id)).exists()
        });
        std::fs::create_dir_all(&self.raster_dir)?;
        raster.save_with_format(self.raster_path(&artwork), image::ImageFormat::Png)?;

        self.records.push(artwork.clone());
        write_collection(&self.index, &self.records)?;
        log::info!("Stored artwork {} ({}x{})", artwork.id, artwork.width, artwork.height);
        Ok(artwork)
    }

    fn load_all(&self) -> Result<Vec<Artwork>, StoreError> {
        Ok(self.records.clone())
    }

    fn delete(&mut self, id: &str) -> Result<bool, StoreError> {
        let Some(pos) = self.records.iter().position(|a| a.id == id) else {
            return Ok(false);
        };
        let artwork = self.records.remove(pos);
        match std::fs::remove_file(self.raster_path(&artwork)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        write_collection(&self.index, &self.records)?;
        Ok(true)
    }
}

/// Artworks held in memory for the process lifetime (`--ephemeral`).
#[derive(Default)]
pub struct MemoryArtworkStore {
    records: Vec<(Artwork, RgbaImage)>,
}

impl ArtworkStore for MemoryArtworkStore {
    fn append(&mut self, title: &str, raster: &RgbaImage, duration_ms: u64) -> Result<Artwork, StoreError> {
        let artwork = new_artwork(title, raster, duration_ms, |id| self.records.iter().any(|(a, _)| a.id == id));
        self.records.push((artwork.clone(), raster.clone()));
        Ok(artwork)
    }

    fn load_all(&self) -> Result<Vec<Artwork>, StoreError> {
        Ok(self.records.iter().map(|(a, _)| a.clone()).collect())
    }

    fn delete(&mut self, id: &str) -> Result<bool, StoreError> {
        let before = self.records.len();
        self.records.retain(|(a, _)| a.id != id);
        Ok(self.records.len() != before)
    }
}
