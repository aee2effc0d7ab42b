use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use super::analysis::FFT_SIZE;

/// Failure to start audio capture. Recoverable: the caller may retry.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),
    #[error("audio input device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("unsupported input sample format: {0}")]
    UnsupportedFormat(String),
    #[error("audio stream error: {0}")]
    Stream(String),
}

/// A live source of mono samples the extractor can poll each tick.
pub trait AudioSource {
    fn sample_rate(&self) -> u32;

    /// Copy the most recent samples into `out` (oldest first) and return how
    /// many were written. Zero means nothing is available.
    fn latest(&self, out: &mut [f32]) -> usize;

    /// Release the underlying stream. Must be idempotent.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}

/// Fixed-capacity buffer of the most recent mono samples, shared between the
/// capture callback and the render loop.
#[derive(Clone)]
pub struct SampleRing {
    inner: Arc<Mutex<VecDeque<f32>>>,
    capacity: usize,
}

impl SampleRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Append interleaved frames, downmixing to mono.
    pub fn push_interleaved(&self, samples: &[f32], channels: usize) {
        let channels = channels.max(1);
        let Ok(mut ring) = self.inner.lock() else {
            return;
        };
        for frame in samples.chunks(channels) {
            let mono = frame.iter().sum::<f32>() / frame.len() as f32;
            if ring.len() == self.capacity {
                ring.pop_front();
            }
            ring.push_back(mono);
        }
    }

    pub fn copy_latest(&self, out: &mut [f32]) -> usize {
        let Ok(ring) = self.inner.lock() else {
            return 0;
        };
        let take = ring.len().min(out.len());
        let start = ring.len() - take;
        for (slot, &sample) in out.iter_mut().zip(ring.range(start..)) {
            *slot = sample;
        }
        take
    }

    pub fn clear(&self) {
        if let Ok(mut ring) = self.inner.lock() {
            ring.clear();
        }
    }
}

/// Microphone capture through the default cpal host.
pub struct MicrophoneSource {
    stream: Option<cpal::Stream>,
    ring: SampleRing,
    sample_rate: u32,
}

impl MicrophoneSource {
    /// Open the named input device, or the system default when `device_name`
    /// is `None`, and start streaming into the sample ring.
    pub fn open(device_name: Option<&str>) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = match device_name {
            Some(name) => host
                .input_devices()
                .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| CaptureError::DeviceUnavailable(format!("no input device named '{}'", name)))?,
            None => host
                .default_input_device()
                .ok_or_else(|| CaptureError::DeviceUnavailable("no default input device".into()))?,
        };

        let supported = device.default_input_config().map_err(|e| match e {
            cpal::DefaultStreamConfigError::DeviceNotAvailable => {
                CaptureError::DeviceUnavailable(e.to_string())
            }
            cpal::DefaultStreamConfigError::BackendSpecific { err } => classify_backend(err.description),
            other => CaptureError::UnsupportedFormat(other.to_string()),
        })?;

        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        let sample_rate = config.sample_rate.0;
        let ring = SampleRing::new(FFT_SIZE);

        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, ring.clone()),
            SampleFormat::I16 => build_stream::<i16>(&device, &config, ring.clone()),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, ring.clone()),
            SampleFormat::I32 => build_stream::<i32>(&device, &config, ring.clone()),
            other => return Err(CaptureError::UnsupportedFormat(format!("{:?}", other))),
        }?;

        stream.play().map_err(|e| match e {
            cpal::PlayStreamError::BackendSpecific { err } => classify_backend(err.description),
            other => CaptureError::DeviceUnavailable(other.to_string()),
        })?;

        log::info!(
            "Capturing from {} @ {}Hz, {} channel(s)",
            device.name().unwrap_or_else(|_| "unknown device".to_string()),
            sample_rate,
            config.channels
        );

        Ok(Self {
            stream: Some(stream),
            ring,
            sample_rate,
        })
    }
}

impl AudioSource for MicrophoneSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn latest(&self, out: &mut [f32]) -> usize {
        if self.stream.is_none() {
            return 0;
        }
        self.ring.copy_latest(out)
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            // Dropping the stream releases the device.
            let _ = stream.pause();
            drop(stream);
            self.ring.clear();
            log::info!("Audio capture stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for MicrophoneSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    ring: SampleRing,
) -> Result<cpal::Stream, CaptureError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels as usize;
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let samples: Vec<f32> = data.iter().map(|&s| f32::from_sample(s)).collect();
                ring.push_interleaved(&samples, channels);
            },
            |err| log::error!("Audio input stream error: {}", err),
            None,
        )
        .map_err(|e| match e {
            cpal::BuildStreamError::DeviceNotAvailable => CaptureError::DeviceUnavailable(e.to_string()),
            cpal::BuildStreamError::StreamConfigNotSupported
            | cpal::BuildStreamError::InvalidArgument => CaptureError::UnsupportedFormat(e.to_string()),
            cpal::BuildStreamError::BackendSpecific { err } => classify_backend(err.description),
            other => CaptureError::Stream(other.to_string()),
        })
}

/// Backends report permission problems as free-form text.
fn classify_backend(description: String) -> CaptureError {
    let lower = description.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized") {
        CaptureError::PermissionDenied(description)
    } else {
        CaptureError::DeviceUnavailable(description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_downmixes_and_keeps_latest() {
        let ring = SampleRing::new(4);
        ring.push_interleaved(&[1.0, 0.0, 0.5, 0.5, -1.0, -1.0], 2);
        let mut out = [9.0; 4];
        assert_eq!(ring.copy_latest(&mut out), 3);
        assert_eq!(&out[..3], &[0.5, 0.5, -1.0]);

        ring.push_interleaved(&[0.1, 0.2, 0.3], 1);
        let mut out = [0.0; 4];
        assert_eq!(ring.copy_latest(&mut out), 4);
        assert_eq!(out, [-1.0, 0.1, 0.2, 0.3]);
    }

    #[test]
    fn ring_copies_only_what_fits() {
        let ring = SampleRing::new(8);
        ring.push_interleaved(&[1.0, 2.0, 3.0, 4.0], 1);
        let mut out = [0.0; 2];
        assert_eq!(ring.copy_latest(&mut out), 2);
        assert_eq!(out, [3.0, 4.0]);
    }

    #[test]
    fn cleared_ring_is_empty() {
        let ring = SampleRing::new(8);
        ring.push_interleaved(&[1.0, 2.0], 1);
        ring.clear();
        let mut out = [0.0; 8];
        assert_eq!(ring.copy_latest(&mut out), 0);
    }

    #[test]
    fn backend_permission_text_is_classified() {
        assert!(matches!(
            classify_backend("Permission denied by user".into()),
            CaptureError::PermissionDenied(_)
        ));
        assert!(matches!(
            classify_backend("device busy".into()),
            CaptureError::DeviceUnavailable(_)
        ));
    }
}
