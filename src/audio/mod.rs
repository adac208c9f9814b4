//! Audio ingestion: fetching source audio and normalizing it to the
//! canonical mono 16kHz PCM form every pipeline stage consumes.

pub mod ingest;
pub mod wav;

use crate::defaults::SAMPLE_RATE;

/// Canonical decoded audio: mono f32 PCM at the target sample rate.
///
/// Derived once per request and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedWaveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl NormalizedWaveform {
    /// Wrap already-normalized samples. The sample rate is fixed at the
    /// canonical target; callers decode and resample before constructing.
    pub fn new(samples: Vec<f32>) -> Self {
        Self {
            samples,
            sample_rate: SAMPLE_RATE,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_is_sample_count_over_rate() {
        let waveform = NormalizedWaveform::new(vec![0.0; 32000]);
        assert_eq!(waveform.sample_rate(), SAMPLE_RATE);
        assert!((waveform.duration_secs() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn empty_waveform_has_zero_duration() {
        let waveform = NormalizedWaveform::new(Vec::new());
        assert!(waveform.is_empty());
        assert_eq!(waveform.duration_secs(), 0.0);
    }
}
