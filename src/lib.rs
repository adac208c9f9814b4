//! diarizer - Speaker diarization worker
//!
//! Downloads a source recording, normalizes it to 16kHz mono, detects
//! speech, fingerprints and clusters the voices (at most two), and returns
//! labeled time segments with a separation confidence over HTTP.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod config;
pub mod defaults;
pub mod error;
pub mod pipeline;
pub mod server;

// Core waveform type
pub use audio::NormalizedWaveform;

// Pipeline entry point and result types
pub use pipeline::{DiarizationResult, DiarizedSegment, TranscriptEntry, run_pipeline};

// Error handling
pub use error::{DiarizerError, Result};

// Config
pub use config::Config;
