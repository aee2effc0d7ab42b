pub mod analysis;
pub mod decode;
pub mod devices;
pub mod features;
pub mod input;

use analysis::{Analyser, FFT_SIZE};
use features::AudioFeatures;
use input::{AudioSource, CaptureError, MicrophoneSource};

/// Turns a live audio source into per-tick [`AudioFeatures`].
pub struct FeatureExtractor {
    source: Option<Box<dyn AudioSource>>,
    analyser: Analyser,
    samples: Vec<f32>,
}

impl FeatureExtractor {
    pub fn new(smoothing: f32) -> Self {
        Self {
            source: None,
            analyser: Analyser::new(smoothing),
            samples: vec![0.0; FFT_SIZE],
        }
    }

    /// Acquire the microphone. On failure the extractor stays uninitialised
    /// and `get_features` keeps returning `None`.
    pub fn initialize(&mut self, device_name: Option<&str>) -> Result<(), CaptureError> {
        let source = MicrophoneSource::open(device_name)?;
        self.attach(Box::new(source));
        Ok(())
    }

    /// Use an already opened source (file replay, synthetic input).
    pub fn attach(&mut self, source: Box<dyn AudioSource>) {
        self.stop();
        self.analyser.reset();
        self.source = Some(source);
    }

    pub fn is_active(&self) -> bool {
        self.source.as_ref().is_some_and(|s| s.is_running())
    }

    /// Features for the current window, or `None` when nothing is initialised
    /// or the input is below the silence threshold.
    pub fn get_features(&mut self) -> Option<AudioFeatures> {
        let source = self.source.as_ref()?;
        let copied = source.latest(&mut self.samples);
        if copied == 0 {
            return None;
        }
        let sample_rate = source.sample_rate();

        let window = &self.samples[..copied];
        let time_domain = analysis::time_domain_bytes(window);
        let frequency = self.analyser.frequency_bytes(window);
        AudioFeatures::from_buffers(&time_domain, &frequency, sample_rate)
    }

    /// Release the source. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.stop();
        }
    }
}

impl Drop for FeatureExtractor {
    fn drop(&mut self) {
        self.stop();
    }
}
