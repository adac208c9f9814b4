//! Speaker embedding extraction.
//!
//! Each speech segment is re-windowed into fixed-length overlapping analysis
//! windows; each window becomes a fixed-dimension voice fingerprint: the
//! mean log-mel spectral envelope, mean-centered and L2-normalized so that
//! cosine distance ignores loudness and the shared log floor.
//!
//! The mel filterbank and FFT plan are process-wide read-only state,
//! initialized once and borrowed by every request.

use crate::audio::NormalizedWaveform;
use crate::defaults::{
    EMBED_FFT_HOP, EMBED_HOP_MS, EMBED_N_FFT, EMBED_WINDOW_MS, EMBEDDING_DIM, SAMPLE_RATE,
};
use crate::error::{DiarizerError, Result};
use crate::pipeline::{SpeakerEmbedding, SpeechSegment};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::{Arc, OnceLock};

const N_FREQ: usize = EMBED_N_FFT / 2 + 1;
const MEL_FMIN: f64 = 0.0;
const MEL_FMAX: f64 = 8000.0;
const LOG_FLOOR: f64 = 1e-10;

/// Precomputed spectral analysis state shared by all requests.
struct FeaturePlan {
    hann: Vec<f64>,
    /// Triangular mel filters, one row per band over the positive spectrum.
    filters: Vec<Vec<f64>>,
    fft: Arc<dyn Fft<f64>>,
}

static FEATURE_PLAN: OnceLock<FeaturePlan> = OnceLock::new();

fn feature_plan() -> &'static FeaturePlan {
    FEATURE_PLAN.get_or_init(|| {
        let mut planner = FftPlanner::<f64>::new();
        FeaturePlan {
            hann: hann_window(EMBED_N_FFT),
            filters: mel_filter_bank(EMBEDDING_DIM, N_FREQ),
            fft: planner.plan_fft_forward(EMBED_N_FFT),
        }
    })
}

/// Extract one embedding per analysis window across all speech segments.
///
/// Windows are emitted in time order and carry their global index, so later
/// stages can rebuild the original order regardless of how extraction is
/// scheduled. A single failed window aborts the request; silently dropping
/// it would bias clustering.
pub fn extract_embeddings(
    waveform: &NormalizedWaveform,
    segments: &[SpeechSegment],
) -> Result<Vec<SpeakerEmbedding>> {
    let window_len = (EMBED_WINDOW_MS * SAMPLE_RATE as u64 / 1000) as usize;
    let hop_len = (EMBED_HOP_MS * SAMPLE_RATE as u64 / 1000) as usize;
    let samples = waveform.samples();

    let mut embeddings = Vec::new();
    let mut window_index = 0usize;

    for (segment_index, segment) in segments.iter().enumerate() {
        let start = (segment.start_ms * SAMPLE_RATE as u64 / 1000) as usize;
        let end = ((segment.end_ms * SAMPLE_RATE as u64 / 1000) as usize).min(samples.len());
        let slice = &samples[start.min(end)..end];

        for offset in window_offsets(slice.len(), window_len, hop_len) {
            let window_end = (offset + window_len).min(slice.len());
            let vector = embed_window(&slice[offset..window_end], window_len, window_index)?;
            embeddings.push(SpeakerEmbedding {
                vector,
                segment_index,
                window_index,
            });
            window_index += 1;
        }
    }

    Ok(embeddings)
}

/// Window start offsets within one segment.
///
/// Segments no longer than one window produce a single (zero-padded)
/// window. Longer segments are tiled at the hop, with one extra window
/// flush against the end so the tail is never left uncovered.
fn window_offsets(segment_len: usize, window_len: usize, hop_len: usize) -> Vec<usize> {
    if segment_len <= window_len {
        return vec![0];
    }
    let mut offsets: Vec<usize> = (0..)
        .map(|i| i * hop_len)
        .take_while(|o| o + window_len <= segment_len)
        .collect();
    let covered = offsets.last().map(|o| o + window_len).unwrap_or(0);
    if covered < segment_len {
        offsets.push(segment_len - window_len);
    }
    offsets
}

/// Compute the embedding vector for one analysis window.
///
/// `samples` may be shorter than `window_len`; the remainder is treated as
/// zeros. Fails if any feature value comes out non-finite.
fn embed_window(samples: &[f32], window_len: usize, window_index: usize) -> Result<Vec<f32>> {
    let plan = feature_plan();

    let mut band_sums = vec![0.0f64; EMBEDDING_DIM];
    let mut frames = 0usize;
    let mut fft_buf: Vec<Complex<f64>> = vec![Complex { re: 0.0, im: 0.0 }; EMBED_N_FFT];
    let mut power = vec![0.0f64; N_FREQ];

    let mut frame_start = 0usize;
    while frame_start + EMBED_N_FFT <= window_len {
        for (i, slot) in fft_buf.iter_mut().enumerate() {
            let sample = samples.get(frame_start + i).copied().unwrap_or(0.0) as f64;
            slot.re = sample * plan.hann[i];
            slot.im = 0.0;
        }
        plan.fft.process(&mut fft_buf);

        for (p, c) in power.iter_mut().zip(fft_buf.iter().take(N_FREQ)) {
            *p = c.re * c.re + c.im * c.im;
        }
        for (band, filter) in band_sums.iter_mut().zip(plan.filters.iter()) {
            let energy: f64 = filter.iter().zip(power.iter()).map(|(f, p)| f * p).sum();
            *band += energy;
        }

        frames += 1;
        frame_start += EMBED_FFT_HOP;
    }

    // NaN must be caught here: `max(LOG_FLOOR)` below discards it and would
    // turn a poisoned window into a silently zeroed embedding.
    if band_sums.iter().any(|sum| !sum.is_finite()) {
        return Err(DiarizerError::Embedding {
            window: window_index,
            message: "non-finite band energy".to_string(),
        });
    }

    let frame_count = frames.max(1) as f64;
    let mut vector: Vec<f64> = band_sums
        .iter()
        .map(|sum| (sum / frame_count).max(LOG_FLOOR).log10())
        .collect();

    // Mean-center so the shared log floor cancels out of cosine distances,
    // then L2-normalize to make the vector loudness-invariant.
    let mean = vector.iter().sum::<f64>() / vector.len() as f64;
    for v in vector.iter_mut() {
        *v -= mean;
    }
    let norm = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm > 1e-12 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }

    let out: Vec<f32> = vector.iter().map(|&v| v as f32).collect();
    if out.iter().any(|v| !v.is_finite()) {
        return Err(DiarizerError::Embedding {
            window: window_index,
            message: "non-finite feature value".to_string(),
        });
    }
    Ok(out)
}

fn hann_window(n: usize) -> Vec<f64> {
    let n_f = n as f64;
    (0..n)
        .map(|i| 0.5 - 0.5 * ((2.0 * std::f64::consts::PI * i as f64) / n_f).cos())
        .collect()
}

/// Slaney-style hertz→mel mapping: linear below 1kHz, log above.
fn hertz_to_mel(freq: f64) -> f64 {
    let min_log_hertz = 1000.0;
    let min_log_mel = 15.0;
    if freq >= min_log_hertz {
        min_log_mel + (freq / min_log_hertz).ln() * (27.0 / 6.4f64.ln())
    } else {
        3.0 * freq / 200.0
    }
}

fn mel_to_hertz(mel: f64) -> f64 {
    let min_log_mel = 15.0;
    if mel >= min_log_mel {
        1000.0 * ((6.4f64.ln() / 27.0) * (mel - min_log_mel)).exp()
    } else {
        200.0 * mel / 3.0
    }
}

/// Triangular mel filterbank, one row per band over the positive spectrum.
fn mel_filter_bank(num_bands: usize, num_freq_bins: usize) -> Vec<Vec<f64>> {
    let mel_min = hertz_to_mel(MEL_FMIN);
    let mel_max = hertz_to_mel(MEL_FMAX);

    // num_bands + 2 edge frequencies, evenly spaced on the mel scale
    let edges: Vec<f64> = (0..num_bands + 2)
        .map(|i| {
            let t = i as f64 / (num_bands + 1) as f64;
            mel_to_hertz(mel_min + t * (mel_max - mel_min))
        })
        .collect();

    let nyquist = SAMPLE_RATE as f64 / 2.0;
    let bin_freq =
        |bin: usize| -> f64 { bin as f64 / (num_freq_bins.saturating_sub(1)).max(1) as f64 * nyquist };

    (0..num_bands)
        .map(|band| {
            let (left, center, right) = (edges[band], edges[band + 1], edges[band + 2]);
            (0..num_freq_bins)
                .map(|bin| {
                    let f = bin_freq(bin);
                    let rising = (f - left) / (center - left);
                    let falling = (right - f) / (right - center);
                    rising.min(falling).max(0.0)
                })
                .collect()
        })
        .collect()
}
