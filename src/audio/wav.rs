//! WAV decoding to the canonical waveform.
//!
//! Supports arbitrary sample rates, channel counts, and integer or float
//! sample formats, downmixing and resampling to 16kHz mono.

use crate::audio::NormalizedWaveform;
use crate::defaults::SAMPLE_RATE;
use crate::error::{DiarizerError, Result};
use std::io::Cursor;

/// Decode WAV bytes into a [`NormalizedWaveform`].
///
/// Fails with `Conversion` if the payload is not parseable WAV data.
pub fn decode_wav(bytes: &[u8]) -> Result<NormalizedWaveform> {
    let mut reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|e| DiarizerError::Conversion {
            message: format!("Failed to parse WAV data: {}", e),
        })?;

    let spec = reader.spec();
    let source_rate = spec.sample_rate;
    let channels = spec.channels;

    if channels == 0 {
        return Err(DiarizerError::Conversion {
            message: "WAV header declares zero channels".to_string(),
        });
    }
    if source_rate == 0 {
        return Err(DiarizerError::Conversion {
            message: "WAV header declares zero sample rate".to_string(),
        });
    }

    let raw_samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| DiarizerError::Conversion {
                message: format!("Failed to read WAV samples: {}", e),
            })?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| DiarizerError::Conversion {
                    message: format!("Failed to read WAV samples: {}", e),
                })?
        }
    };

    let mono = downmix(&raw_samples, channels as usize);

    let samples = if source_rate != SAMPLE_RATE {
        resample(&mono, source_rate, SAMPLE_RATE)
    } else {
        mono
    };

    Ok(NormalizedWaveform::new(samples))
}

/// Average interleaved channels into a single mono stream.
fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Simple linear interpolation resampling.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[source_idx]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as f32
            }
        })
        .collect()
}
