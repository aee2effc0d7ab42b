mod audio;
mod cli;
mod config;
mod encode;
mod export;
mod mapping;
mod render;
mod store;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use audio::decode::ReplaySource;
use audio::devices::{self, DeviceWatcher, Direction};
use audio::FeatureExtractor;
use cli::Cli;
use encode::ffmpeg::{self, VideoRecorder, VideoSettings};
use export::ExportOptions;
use mapping::cache::MappingCache;
use render::engine::{Engine, OpacityLimits, RenderOptions};
use render::entity::FADE_TAIL_MS;
use store::artworks::{JsonArtworkStore, MemoryArtworkStore};
use store::mappings::{JsonMappingStore, MemoryMappingStore};
use store::{ArtworkStore, MappingStore};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    let mut limits = OpacityLimits::default();
    if let Some(path) = config::discover(cli.config.clone()) {
        if let Some(cfg) = config::load_config(&path) {
            log::info!("Loaded config from {}", path.display());
            cli.merge(&cfg);
            limits = OpacityLimits {
                floor: cfg.render.opacity_floor,
                ceiling: cfg.render.opacity_ceiling,
            };
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    if cli.list_devices {
        let devices = devices::list_devices().context("Could not enumerate audio devices")?;
        println!("Audio devices:");
        for d in &devices {
            let kind = match d.direction {
                Direction::Input => "in ",
                Direction::Output => "out",
            };
            let marker = if d.is_default { " (default)" } else { "" };
            println!("  [{}] {}{}", kind, d.name, marker);
        }
        return Ok(());
    }

    if cli.ephemeral {
        return run(&cli, MemoryMappingStore::default(), MemoryArtworkStore::default(), limits);
    }

    let data_dir = cli.data_dir.clone().unwrap_or_else(config::default_data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Cannot create data directory {}", data_dir.display()))?;
    log::info!("Data directory: {}", data_dir.display());
    let mappings = JsonMappingStore::open(&data_dir).context("Failed to open mapping store")?;
    let artworks = JsonArtworkStore::open(&data_dir).context("Failed to open artwork store")?;
    run(&cli, mappings, artworks, limits)
}

fn run<M: MappingStore, A: ArtworkStore>(cli: &Cli, mappings: M, mut artworks: A, limits: OpacityLimits) -> Result<()> {
    if cli.list_artworks {
        let stored = artworks.load_all()?;
        if stored.is_empty() {
            println!("No artworks stored.");
        }
        for a in &stored {
            println!(
                "  {:<28} {:<24} {}x{}  {:.1}s  {}",
                a.id,
                a.title,
                a.width,
                a.height,
                a.duration_ms as f64 / 1000.0,
                a.created_at.format("%Y-%m-%d %H:%M")
            );
        }
        return Ok(());
    }

    if let Some(ref id) = cli.delete_artwork {
        if artworks.delete(id)? {
            log::info!("Deleted artwork {}", id);
        } else {
            anyhow::bail!("No artwork with id {}", id);
        }
        return Ok(());
    }

    let mut cache = MappingCache::load(mappings);
    if cli.clear_mappings {
        let count = cache.len();
        cache.clear().context("Failed to clear stored mappings")?;
        log::info!("Cleared {} mappings", count);
        return Ok(());
    }
    log::info!("{} known sound signatures", cache.len());

    let started = Instant::now();
    let snapshot = session(cli, &mut cache, limits)?;
    let duration_ms = started.elapsed().as_millis() as u64;

    let title = cli
        .title
        .clone()
        .unwrap_or_else(|| format!("Session {}", chrono::Local::now().format("%Y-%m-%d %H:%M")));
    let artwork = artworks
        .append(&title, &snapshot, duration_ms)
        .context("Failed to store artwork")?;

    let options = ExportOptions {
        color_space: cli.color_space,
        format: cli.format,
        quality: cli.quality,
        filename: cli.output.clone(),
    };
    let path = export::export(&snapshot, &options).context("Export failed")?;
    log::info!("Done! Artwork {} exported to {}", artwork.id, path.display());
    Ok(())
}

/// Capture, tick and draw until the duration runs out, the replay ends or
/// Ctrl+C. Returns the canvas as it stood when capture stopped.
fn session<M: MappingStore>(
    cli: &Cli,
    cache: &mut MappingCache<M>,
    limits: OpacityLimits,
) -> Result<image::RgbaImage> {
    let background = config::parse_color(&cli.background)
        .with_context(|| format!("Invalid background colour: {}", cli.background))?;
    let mut engine = Engine::new(cli.width, cli.height, background, limits)?;
    let options = RenderOptions {
        opacity: cli.opacity.clamp(0.0, 1.0),
        sensitivity: cli.sensitivity.max(0.0),
        fade_enabled: cli.fade,
        fade_duration_ms: cli.fade_duration as f64,
    };

    let mut extractor = FeatureExtractor::new(cli.smoothing);
    let mut watcher = None;
    match cli.replay {
        Some(ref path) => {
            if !path.exists() {
                anyhow::bail!("Replay file not found: {}", path.display());
            }
            extractor.attach(Box::new(ReplaySource::open(path)?));
            log::info!("Replaying {}", path.display());
        }
        None => {
            extractor
                .initialize(cli.device.as_deref())
                .context("Could not start audio capture")?;
            watcher = Some(DeviceWatcher::spawn(Duration::from_secs(2)));
            log::info!("Capturing from {}", cli.device.as_deref().unwrap_or("default input"));
        }
    }

    let mut recorder = match cli.video {
        Some(ref path) => Some(start_recorder(path, cli)?),
        None => None,
    };

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || r.store(false, Ordering::SeqCst)).context("Failed to install Ctrl+C handler")?;

    let frame_interval = Duration::from_secs_f64(1.0 / cli.fps.max(1) as f64);
    let deadline = cli.duration.map(|s| Instant::now() + Duration::from_secs_f64(s));

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("[{elapsed_precise}] {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );

    while running.load(Ordering::SeqCst)
        && extractor.is_active()
        && deadline.map_or(true, |d| Instant::now() < d)
    {
        let frame_start = Instant::now();

        let features = extractor.get_features();
        let mapping = features.as_ref().map(|f| cache.get_or_create(f));
        engine.tick(mapping.as_ref(), features.as_ref(), &options);

        if recorder.is_some() {
            ffmpeg::record_frame(&mut recorder, &engine.frame());
        }
        if let Some((_, ref changes)) = watcher {
            while let Ok(list) = changes.try_recv() {
                let inputs = list.iter().filter(|d| d.direction == Direction::Input).count();
                log::info!("Audio devices changed: {} inputs available", inputs);
            }
        }

        spinner.set_message(format!(
            "{} shapes, {} particles, {} signatures",
            engine.shapes().len(),
            engine.particles().len(),
            cache.len()
        ));
        spinner.tick();

        if let Some(rest) = frame_interval.checked_sub(frame_start.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    extractor.stop();
    drop(watcher);
    spinner.finish_with_message("Capture stopped");
    let snapshot = engine.snapshot();

    if recorder.is_some() && options.fade_enabled {
        // let the recording show the canvas dissolving
        let tail = Duration::from_secs_f64((options.fade_duration_ms + FADE_TAIL_MS) / 1000.0);
        let fade_end = Instant::now().checked_add(tail);
        while recorder.is_some() && engine.live_count() > 0 && fade_end.map_or(true, |end| Instant::now() < end) {
            let frame_start = Instant::now();
            engine.tick(None, None, &options);
            ffmpeg::record_frame(&mut recorder, &engine.frame());
            if let Some(rest) = frame_interval.checked_sub(frame_start.elapsed()) {
                std::thread::sleep(rest);
            }
        }
    }
    ffmpeg::finish_recording(recorder);

    Ok(snapshot)
}

fn start_recorder(path: &Path, cli: &Cli) -> Result<VideoRecorder> {
    let settings = VideoSettings {
        width: cli.width,
        height: cli.height,
        fps: cli.fps,
        codec: cli.codec.clone(),
        pix_fmt: cli.pix_fmt.clone(),
        crf: cli.crf,
    };
    VideoRecorder::start(path, &settings)
}
