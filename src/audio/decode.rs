use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::input::AudioSource;

/// A whole file decoded to mono.
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioData {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate.max(1) as f64
    }
}

/// Probed container plus the decoder for its first audio track.
struct TrackReader {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
}

impl TrackReader {
    fn open(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open audio file: {}", path.display()))?;
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let format = symphonia::default::get_probe()
            .format(
                &hint,
                MediaSourceStream::new(Box::new(file), Default::default()),
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .context("Failed to probe audio format")?
            .format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .context("No audio tracks found")?;
        let sample_rate = track.codec_params.sample_rate.context("Unknown sample rate")?;
        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .context("Failed to create audio decoder")?;
        let track_id = track.id;

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
        })
    }

    /// Decode every remaining packet, appending mono samples to `out`.
    /// Corrupt packets are skipped.
    fn read_mono(&mut self, out: &mut Vec<f32>) -> Result<()> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    log::debug!("Skipping undecodable packet: {}", e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let spec = *decoded.spec();
            let mut buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
            buf.copy_interleaved_ref(decoded);
            downmix(buf.samples(), spec.channels.count(), out);
        }
    }
}

/// Average interleaved frames down to one channel.
pub fn downmix(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    match channels {
        0 | 1 => out.extend_from_slice(interleaved),
        n => out.extend(interleaved.chunks(n).map(|f| f.iter().sum::<f32>() / f.len() as f32)),
    }
}

pub fn decode_audio(path: &Path) -> Result<AudioData> {
    let mut reader = TrackReader::open(path)?;
    let mut samples = Vec::new();
    reader.read_mono(&mut samples)?;

    let data = AudioData {
        samples,
        sample_rate: reader.sample_rate,
    };
    log::info!(
        "Decoded {}: {} samples, {}Hz, {:.1}s",
        path.display(),
        data.samples.len(),
        data.sample_rate,
        data.duration_secs()
    );
    Ok(data)
}

/// Plays decoded audio back at wall-clock pace, standing in for a microphone.
pub struct ReplaySource {
    data: AudioData,
    started: Instant,
    running: bool,
}

impl ReplaySource {
    pub fn new(data: AudioData) -> Self {
        Self {
            data,
            started: Instant::now(),
            running: true,
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(decode_audio(path)?))
    }

    /// Sample index corresponding to `elapsed_secs` of playback.
    fn position(&self, elapsed_secs: f64) -> usize {
        ((elapsed_secs * self.data.sample_rate as f64) as usize).min(self.data.samples.len())
    }

    /// True once playback has run past the last sample.
    pub fn finished(&self) -> bool {
        self.position(self.started.elapsed().as_secs_f64()) >= self.data.samples.len()
    }

    fn copy_until(&self, end: usize, out: &mut [f32]) -> usize {
        if !self.running || end >= self.data.samples.len() {
            return 0;
        }
        let take = end.min(out.len());
        out[..take].copy_from_slice(&self.data.samples[end - take..end]);
        take
    }
}

impl AudioSource for ReplaySource {
    fn sample_rate(&self) -> u32 {
        self.data.sample_rate
    }

    fn latest(&self, out: &mut [f32]) -> usize {
        let end = self.position(self.started.elapsed().as_secs_f64());
        self.copy_until(end, out)
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running && !self.finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replay(samples: Vec<f32>) -> ReplaySource {
        ReplaySource::new(AudioData {
            samples,
            sample_rate: 10,
        })
    }

    #[test]
    fn copies_the_window_ending_at_the_play_head() {
        let source = replay((0..100).map(|i| i as f32).collect());
        assert_eq!(source.position(1.5), 15);

        let mut out = [0.0; 4];
        assert_eq!(source.copy_until(15, &mut out), 4);
        assert_eq!(out, [11.0, 12.0, 13.0, 14.0]);

        let mut out = [0.0; 4];
        assert_eq!(source.copy_until(2, &mut out), 2);
        assert_eq!(&out[..2], &[0.0, 1.0]);
    }

    #[test]
    fn past_the_end_is_silent() {
        let source = replay(vec![0.5; 10]);
        assert_eq!(source.position(5.0), 10);
        let mut out = [0.0; 4];
        assert_eq!(source.copy_until(10, &mut out), 0);
    }

    #[test]
    fn downmix_averages_frames() {
        let mut out = Vec::new();
        downmix(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2, &mut out);
        assert_eq!(out, vec![0.5, 0.5, 0.0]);
        downmix(&[0.25], 1, &mut out);
        assert_eq!(out.last(), Some(&0.25));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(decode_audio(Path::new("/nonexistent/clip.wav")).is_err());
    }

    #[test]
    fn stop_is_idempotent_and_silences() {
        let mut source = replay(vec![0.5; 1000]);
        source.stop();
        source.stop();
        assert!(!source.is_running());
        let mut out = [0.0; 4];
        assert_eq!(source.latest(&mut out), 0);
    }
}
