/// Amplitude below which a frame counts as "nothing audible".
pub const SILENCE_THRESHOLD: f32 = 0.01;

/// Signature bucket width for the dominant frequency (Hz).
pub const FREQUENCY_BUCKET_HZ: f32 = 50.0;

/// Signature bucket width for the band energies (byte scale).
pub const BAND_BUCKET: f32 = 20.0;

/// Perceptual features for one analysis tick.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioFeatures {
    /// RMS loudness of the time-domain buffer (0.0-1.0)
    pub amplitude: f32,
    /// Frequency of the loudest FFT bin (Hz)
    pub frequency: f32,
    /// Average magnitude of the first 10% of bins (0-255)
    pub low: f32,
    /// Average magnitude of bins 10%-40% (0-255)
    pub mid: f32,
    /// Average magnitude of the remaining 60% of bins (0-255)
    pub high: f32,
    /// Quantized cache key, see [`signature`]
    pub signature: String,
}

/// The quantized values a signature is built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Buckets {
    pub frequency: u32,
    pub low: u32,
    pub mid: u32,
    pub high: u32,
}

/// Which of the three bands carries the most energy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DominantBand {
    Low,
    Mid,
    High,
}

impl Buckets {
    pub fn quantize(frequency: f32, low: f32, mid: f32, high: f32) -> Self {
        Self {
            frequency: bucket(frequency, FREQUENCY_BUCKET_HZ),
            low: bucket(low, BAND_BUCKET),
            mid: bucket(mid, BAND_BUCKET),
            high: bucket(high, BAND_BUCKET),
        }
    }

    /// Recover bucket values from a signature string. Returns `None` for keys
    /// that were not produced by [`signature`].
    pub fn parse(signature: &str) -> Option<Self> {
        let mut parts = signature.split('-').map(|p| p.parse::<u32>().ok());
        let buckets = Self {
            frequency: parts.next()??,
            low: parts.next()??,
            mid: parts.next()??,
            high: parts.next()??,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(buckets)
    }

    pub fn signature(&self) -> String {
        format!("{}-{}-{}-{}", self.frequency, self.low, self.mid, self.high)
    }

    pub fn dominant_band(&self) -> DominantBand {
        if self.low > self.mid && self.low > self.high {
            DominantBand::Low
        } else if self.high > self.low && self.high > self.mid {
            DominantBand::High
        } else {
            DominantBand::Mid
        }
    }
}

impl AudioFeatures {
    /// Derive features from byte-scaled analyser buffers. Returns `None` when
    /// the frame is below the silence threshold.
    pub fn from_buffers(time_domain: &[u8], frequency_data: &[u8], sample_rate: u32) -> Option<Self> {
        let amplitude = amplitude(time_domain);
        if amplitude < SILENCE_THRESHOLD {
            return None;
        }

        let frequency = dominant_frequency(frequency_data, sample_rate);
        let (low, mid, high) = band_energies(frequency_data);

        Some(Self {
            amplitude,
            frequency,
            low,
            mid,
            high,
            signature: signature(frequency, low, mid, high),
        })
    }

    pub fn buckets(&self) -> Buckets {
        Buckets::quantize(self.frequency, self.low, self.mid, self.high)
    }
}

/// Root-mean-square of byte samples centred on 128, normalised to [-1, 1].
pub fn amplitude(time_domain: &[u8]) -> f32 {
    if time_domain.is_empty() {
        return 0.0;
    }
    let sum: f32 = time_domain
        .iter()
        .map(|&b| {
            let v = (b as f32 - 128.0) / 128.0;
            v * v
        })
        .sum();
    (sum / time_domain.len() as f32).sqrt().min(1.0)
}

/// Index of the loudest bin scaled by the bin width (Nyquist / N).
pub fn dominant_frequency(frequency_data: &[u8], sample_rate: u32) -> f32 {
    if frequency_data.is_empty() {
        return 0.0;
    }

    let mut max_value = 0u8;
    let mut max_index = 0usize;
    for (i, &value) in frequency_data.iter().enumerate() {
        if value > max_value {
            max_value = value;
            max_index = i;
        }
    }

    let nyquist = sample_rate as f32 / 2.0;
    max_index as f32 * (nyquist / frequency_data.len() as f32)
}

/// Average magnitude in the low (0-10%), mid (10-40%) and high (40-100%) bins.
pub fn band_energies(frequency_data: &[u8]) -> (f32, f32, f32) {
    let n = frequency_data.len();
    let low_end = n / 10;
    let mid_end = n * 4 / 10;

    let average = |bins: &[u8]| -> f32 {
        if bins.is_empty() {
            return 0.0;
        }
        bins.iter().map(|&b| b as f32).sum::<f32>() / bins.len() as f32
    };

    (
        average(&frequency_data[..low_end]),
        average(&frequency_data[low_end..mid_end]),
        average(&frequency_data[mid_end..]),
    )
}

/// Quantize (frequency, low, mid, high) into the cache key, e.g. `"100-40-60-80"`.
pub fn signature(frequency: f32, low: f32, mid: f32, high: f32) -> String {
    Buckets::quantize(frequency, low, mid, high).signature()
}

fn bucket(value: f32, width: f32) -> u32 {
    ((value.max(0.0) / width).floor() * width) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amplitude_stays_in_unit_range() {
        assert_eq!(amplitude(&[128; 64]), 0.0);
        assert!(amplitude(&[0; 64]) <= 1.0);
        assert!((amplitude(&[0; 64]) - 1.0).abs() < 1e-6);
        assert!(amplitude(&[255; 64]) <= 1.0);

        let mixed: Vec<u8> = (0..=255).collect();
        let a = amplitude(&mixed);
        assert!((0.0..=1.0).contains(&a));
    }

    #[test]
    fn amplitude_of_empty_buffer_is_zero() {
        assert_eq!(amplitude(&[]), 0.0);
    }

    #[test]
    fn dominant_frequency_uses_bin_width() {
        let mut bins = vec![0u8; 1024];
        bins[10] = 200;
        // 48 kHz → Nyquist 24 kHz over 1024 bins = 23.4375 Hz per bin
        let f = dominant_frequency(&bins, 48_000);
        assert!((f - 234.375).abs() < 1e-3);
    }

    #[test]
    fn dominant_frequency_keeps_first_peak_on_ties() {
        let mut bins = vec![0u8; 100];
        bins[5] = 90;
        bins[50] = 90;
        let f = dominant_frequency(&bins, 200);
        assert!((f - 5.0).abs() < 1e-6);
    }

    #[test]
    fn band_partition_is_10_30_60() {
        let mut bins = vec![0u8; 100];
        for b in &mut bins[..10] {
            *b = 200;
        }
        for b in &mut bins[10..40] {
            *b = 100;
        }
        for b in &mut bins[40..] {
            *b = 50;
        }
        let (low, mid, high) = band_energies(&bins);
        assert_eq!(low, 200.0);
        assert_eq!(mid, 100.0);
        assert_eq!(high, 50.0);
    }

    #[test]
    fn band_energies_stay_in_byte_range() {
        let bins = vec![255u8; 1024];
        let (low, mid, high) = band_energies(&bins);
        for v in [low, mid, high] {
            assert!((0.0..=255.0).contains(&v));
        }
    }

    #[test]
    fn signature_floors_to_bucket_width() {
        assert_eq!(signature(149.9, 59.0, 61.0, 99.9), "100-40-60-80");
        assert_eq!(signature(100.0, 40.0, 60.0, 80.0), "100-40-60-80");
        assert_eq!(signature(0.0, 0.0, 0.0, 0.0), "0-0-0-0");
    }

    #[test]
    fn nearby_inputs_share_a_signature() {
        let a = signature(1012.0, 41.0, 63.5, 18.2);
        let b = signature(1048.9, 59.9, 79.0, 0.1);
        assert_eq!(a, b);
    }

    #[test]
    fn silent_buffers_yield_no_features() {
        let time = vec![128u8; 2048];
        let freq = vec![0u8; 1024];
        assert!(AudioFeatures::from_buffers(&time, &freq, 44_100).is_none());
    }

    #[test]
    fn loud_buffers_yield_features() {
        let time: Vec<u8> = (0..2048).map(|i| if i % 2 == 0 { 64 } else { 192 }).collect();
        let mut freq = vec![0u8; 1024];
        freq[20] = 180;
        let features = AudioFeatures::from_buffers(&time, &freq, 44_100).unwrap();
        assert!((features.amplitude - 0.5).abs() < 1e-6);
        assert_eq!(features.signature, features.buckets().signature());
    }

    #[test]
    fn parse_recovers_buckets() {
        let buckets = Buckets::parse("100-40-60-80").unwrap();
        assert_eq!(
            buckets,
            Buckets { frequency: 100, low: 40, mid: 60, high: 80 }
        );
        assert_eq!(buckets.dominant_band(), DominantBand::High);
        assert!(Buckets::parse("garbage").is_none());
        assert!(Buckets::parse("1-2-3").is_none());
        assert!(Buckets::parse("1-2-3-4-5").is_none());
    }

    #[test]
    fn dominant_band_falls_back_to_mid_on_ties() {
        let b = Buckets { frequency: 0, low: 40, mid: 20, high: 40 };
        assert_eq!(b.dominant_band(), DominantBand::Mid);
        let b = Buckets { frequency: 0, low: 60, mid: 20, high: 40 };
        assert_eq!(b.dominant_band(), DominantBand::Low);
    }
}
