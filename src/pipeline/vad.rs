//! Speech activity detection over fixed 30ms frames.
//!
//! Each frame is classified speech/non-speech by RMS energy against a
//! threshold picked by the configured aggressiveness. Consecutive speech
//! frames merge into segments, short non-speech gaps inside one utterance
//! are bridged, and segments below the minimum duration are dropped.

use crate::audio::NormalizedWaveform;
use crate::config::VadConfig;
use crate::defaults::{SAMPLE_RATE, VAD_FRAME_MS, VAD_THRESHOLDS};
use crate::pipeline::SpeechSegment;

/// Frame-run accumulator used while merging consecutive speech frames.
#[derive(Debug, Clone, Copy)]
struct FrameRun {
    start_frame: u64,
    end_frame: u64, // exclusive
    rms_sum: f32,
    speech_frames: u32,
}

impl FrameRun {
    fn to_segment(self) -> SpeechSegment {
        SpeechSegment {
            start_ms: self.start_frame * VAD_FRAME_MS,
            end_ms: self.end_frame * VAD_FRAME_MS,
            score: self.rms_sum / self.speech_frames.max(1) as f32,
        }
    }
}

/// RMS threshold for the given aggressiveness level (clamped to the table).
fn threshold_for(aggressiveness: u8) -> f32 {
    let idx = (aggressiveness as usize).min(VAD_THRESHOLDS.len() - 1);
    VAD_THRESHOLDS[idx]
}

/// Detect ordered, non-overlapping speech segments in a waveform.
///
/// Zero surviving segments is a valid outcome. Deterministic for identical
/// input and configuration. A trailing partial frame is ignored.
pub fn detect_speech(waveform: &NormalizedWaveform, config: &VadConfig) -> Vec<SpeechSegment> {
    let frame_len = (SAMPLE_RATE as u64 * VAD_FRAME_MS / 1000) as usize;
    let threshold = threshold_for(config.aggressiveness);

    // Classify frames and merge consecutive speech frames into raw runs.
    let mut runs: Vec<FrameRun> = Vec::new();
    for (i, frame) in waveform.samples().chunks_exact(frame_len).enumerate() {
        let rms = calculate_rms(frame);
        if rms <= threshold {
            continue;
        }
        let frame_idx = i as u64;
        match runs.last_mut() {
            Some(run) if run.end_frame == frame_idx => {
                run.end_frame += 1;
                run.rms_sum += rms;
                run.speech_frames += 1;
            }
            _ => runs.push(FrameRun {
                start_frame: frame_idx,
                end_frame: frame_idx + 1,
                rms_sum: rms,
                speech_frames: 1,
            }),
        }
    }

    // Bridge non-speech gaps shorter than the configured minimum so one
    // utterance with brief pauses stays a single segment.
    let mut bridged: Vec<FrameRun> = Vec::new();
    for run in runs {
        match bridged.last_mut() {
            Some(prev) if (run.start_frame - prev.end_frame) * VAD_FRAME_MS < config.min_silence_gap_ms => {
                prev.end_frame = run.end_frame;
                prev.rms_sum += run.rms_sum;
                prev.speech_frames += run.speech_frames;
            }
            _ => bridged.push(run),
        }
    }

    // Drop segments shorter than the minimum duration; exact length is kept.
    bridged
        .into_iter()
        .map(FrameRun::to_segment)
        .filter(|seg| seg.duration_ms() >= config.min_speech_duration_ms)
        .collect()
}

/// Calculates the Root Mean Square (RMS) of audio samples.
///
/// Returns a value in [0.0, 1.0] for full-scale input, where 0.0 is silence
/// and ~0.707 is a full-scale sine wave.
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples.iter().map(|&s| s as f64 * s as f64).sum();
    (sum_squares / samples.len() as f64).sqrt() as f32
}
