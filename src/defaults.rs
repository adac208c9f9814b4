//! Default configuration constants for diarizer.
//!
//! This module provides shared constants used across the pipeline stages
//! to ensure consistency and eliminate duplication.

/// Canonical audio sample rate in Hz.
///
/// 16kHz is the standard for speech processing and is the rate every input
/// is normalized to before any analysis runs.
pub const SAMPLE_RATE: u32 = 16000;

/// Voice activity detection frame length in milliseconds.
///
/// 30ms frames are short enough to localize speech boundaries while giving
/// the RMS estimate enough samples (480 at 16kHz) to be stable.
pub const VAD_FRAME_MS: u64 = 30;

/// RMS speech thresholds indexed by `vad.aggressiveness` (0..=3).
///
/// Higher aggressiveness demands more energy before a frame counts as
/// speech. Level 1 (0.02) is tuned for typical recorded speech levels.
pub const VAD_THRESHOLDS: [f32; 4] = [0.010, 0.020, 0.035, 0.060];

/// Default VAD aggressiveness level.
pub const VAD_AGGRESSIVENESS: u8 = 1;

/// Default minimum speech segment duration in milliseconds.
///
/// Segments shorter than this are discarded as noise bursts. A segment
/// exactly this long is retained.
pub const MIN_SPEECH_DURATION_MS: u64 = 250;

/// Default maximum non-speech gap bridged within one utterance, in
/// milliseconds.
///
/// Gaps shorter than this between two speech runs are treated as pauses
/// inside a single utterance rather than segment boundaries.
pub const MIN_SILENCE_GAP_MS: u64 = 300;

/// Default maximum gap between same-speaker segments merged during
/// assembly, in milliseconds.
pub const MIN_MERGE_GAP_MS: u64 = 250;

/// Embedding analysis window length in milliseconds.
///
/// 1.5s windows stabilize the spectral envelope estimate; shorter speech
/// segments are zero-padded to one full window.
pub const EMBED_WINDOW_MS: u64 = 1500;

/// Hop between overlapping embedding windows in milliseconds.
pub const EMBED_HOP_MS: u64 = 750;

/// Dimensionality of a speaker embedding vector (mel filterbank bands).
pub const EMBEDDING_DIM: usize = 32;

/// STFT size used for embedding features (25ms at 16kHz).
pub const EMBED_N_FFT: usize = 400;

/// STFT hop used for embedding features (10ms at 16kHz).
pub const EMBED_FFT_HOP: usize = 160;

/// Default clustering separation threshold (cosine distance).
///
/// If the distance at the two-cluster cut falls at or below this value the
/// evidence points to a single voice and the clusters collapse to one.
pub const MIN_SEPARATION_THRESHOLD: f32 = 0.15;

/// Hard cap on the number of speakers this pipeline can report.
pub const MAX_SPEAKERS: usize = 2;

/// Default end-to-end processing timeout in seconds.
pub const PROCESSING_TIMEOUT_SECS: u64 = 120;

/// Default maximum source audio size in bytes (50 MiB).
pub const MAX_FILE_SIZE_BYTES: u64 = 50 * 1024 * 1024;

/// Confidence sentinel reported when no speech was found.
pub const CONFIDENCE_NO_SPEECH: f64 = 0.0;

/// Confidence sentinel reported when exactly one speaker was found.
pub const CONFIDENCE_SINGLE_SPEAKER: f64 = 1.0;

/// Service identifier returned by the health endpoint.
pub const SERVICE_NAME: &str = "audio-diarization-worker";

/// Default bind address.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8000;
