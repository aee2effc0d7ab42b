use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Analysis window length in samples.
pub const FFT_SIZE: usize = 2048;

/// Default smoothing time constant applied between successive spectra.
pub const DEFAULT_SMOOTHING: f32 = 0.8;

const MIN_DECIBELS: f32 = -100.0;
const MAX_DECIBELS: f32 = -30.0;

/// Windowed FFT analyser producing byte-scaled time and frequency buffers.
///
/// Frequency bytes map magnitudes between -100 dB and -30 dB onto 0-255 after
/// exponential smoothing across calls, so band energies stay stable from frame
/// to frame instead of flickering with every hop.
pub struct Analyser {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    smoothing: f32,
    smoothed: Vec<f32>,
    buffer: Vec<Complex<f32>>,
}

impl Analyser {
    pub fn new(smoothing: f32) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);

        Self {
            fft,
            window: blackman_window(FFT_SIZE),
            smoothing: smoothing.clamp(0.0, 1.0),
            smoothed: vec![0.0; FFT_SIZE / 2],
            buffer: vec![Complex::new(0.0, 0.0); FFT_SIZE],
        }
    }

    #[cfg(test)]
    pub fn frequency_bin_count(&self) -> usize {
        FFT_SIZE / 2
    }

    /// Forget smoothing history, e.g. after the input restarts.
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Compute the smoothed magnitude spectrum of the most recent window,
    /// scaled to bytes.
    pub fn frequency_bytes(&mut self, samples: &[f32]) -> Vec<u8> {
        let window = latest_window(samples);
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            *slot = Complex::new(window[i] * self.window[i], 0.0);
        }
        self.fft.process(&mut self.buffer);

        let scale = 1.0 / FFT_SIZE as f32;
        let tau = self.smoothing;
        let range = MAX_DECIBELS - MIN_DECIBELS;

        self.buffer[..FFT_SIZE / 2]
            .iter()
            .zip(self.smoothed.iter_mut())
            .map(|(c, prev)| {
                let magnitude = c.norm() * scale;
                *prev = tau * *prev + (1.0 - tau) * magnitude;
                if *prev <= 0.0 {
                    return 0;
                }
                let db = 20.0 * prev.log10();
                (255.0 / range * (db - MIN_DECIBELS)).clamp(0.0, 255.0) as u8
            })
            .collect()
    }
}

/// Convert the most recent window of float samples to bytes centred on 128.
pub fn time_domain_bytes(samples: &[f32]) -> Vec<u8> {
    latest_window(samples)
        .iter()
        .map(|&s| (128.0 * (1.0 + s)).clamp(0.0, 255.0) as u8)
        .collect()
}

/// The last `FFT_SIZE` samples, left-padded with silence when short.
fn latest_window(samples: &[f32]) -> Vec<f32> {
    let mut window = vec![0.0f32; FFT_SIZE];
    let take = samples.len().min(FFT_SIZE);
    window[FFT_SIZE - take..].copy_from_slice(&samples[samples.len() - take..]);
    window
}

fn blackman_window(size: usize) -> Vec<f32> {
    let alpha = 0.16f32;
    let a0 = 0.5 * (1.0 - alpha);
    let a1 = 0.5;
    let a2 = 0.5 * alpha;
    (0..size)
        .map(|i| {
            let x = i as f32 / size as f32;
            a0 - a1 * (2.0 * std::f32::consts::PI * x).cos()
                + a2 * (4.0 * std::f32::consts::PI * x).cos()
        })
        .collect()
}
