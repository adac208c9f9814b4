//! The diarization pipeline: speech detection, speaker embedding,
//! clustering, confidence scoring, and result assembly.
//!
//! Stages are pure functions composed left to right; each consumes the full
//! output of the previous stage and nothing mutates earlier results. The
//! whole pipeline is synchronous and owns no state beyond one request.

pub mod assemble;
pub mod cluster;
pub mod confidence;
pub mod embedding;
pub mod vad;

use crate::audio::NormalizedWaveform;
use crate::config::Config;
use crate::defaults::{CONFIDENCE_NO_SPEECH, CONFIDENCE_SINGLE_SPEAKER};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A detected speech interval, in integer milliseconds from the start of
/// the recording. Frame math stays integral so duration comparisons against
/// configured limits are exact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechSegment {
    pub start_ms: u64,
    pub end_ms: u64,
    /// Mean frame-level RMS over the segment's speech frames.
    pub score: f32,
}

impl SpeechSegment {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }

    pub fn start_secs(&self) -> f64 {
        self.start_ms as f64 / 1000.0
    }

    pub fn end_secs(&self) -> f64 {
        self.end_ms as f64 / 1000.0
    }
}

/// Voice fingerprint of one analysis window.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakerEmbedding {
    /// Fixed-dimension feature vector; dimensionality is constant across a
    /// request.
    pub vector: Vec<f32>,
    /// Index of the speech segment this window was cut from.
    pub segment_index: usize,
    /// Position of this window in global extraction order.
    pub window_index: usize,
}

/// One inferred speaker identity: the embeddings assigned to it and their
/// mean vector.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakerCluster {
    pub id: usize,
    /// Indices into the embedding list. Clusters partition all embeddings.
    pub members: Vec<usize>,
    pub centroid: Vec<f32>,
}

/// One transcript entry supplied by the upstream transcription provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranscriptEntry {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Final output unit: a labeled time range with any aligned transcript text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiarizedSegment {
    pub start: f64,
    pub end: f64,
    pub speaker: String,
    pub text: String,
}

/// Counters exposed for observability alongside the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DebugCounters {
    pub speech_segments_count: usize,
    pub embeddings_count: usize,
}

/// Full diarization response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiarizationResult {
    pub diarized_segments: Vec<DiarizedSegment>,
    pub speaker_count: usize,
    pub confidence: f64,
    pub debug: DebugCounters,
}

/// Linear pipeline progress, for logging and failure attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Ingested,
    SpeechDetected,
    EmbeddingsExtracted,
    Clustered,
    Scored,
    Assembled,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Ingested => "ingested",
            Stage::SpeechDetected => "speech_detected",
            Stage::EmbeddingsExtracted => "embeddings_extracted",
            Stage::Clustered => "clustered",
            Stage::Scored => "scored",
            Stage::Assembled => "assembled",
            Stage::Done => "done",
        };
        write!(f, "{}", name)
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    tracing::debug!(from = %stage, to = %next, "pipeline stage transition");
    *stage = next;
}

/// Run the full pipeline over an already-normalized waveform.
///
/// Zero detected speech is a valid outcome: the result reports
/// `speakerCount = 0` with an empty segment list and the no-speech
/// confidence sentinel. Deterministic for identical input and configuration.
pub fn run_pipeline(
    waveform: &NormalizedWaveform,
    transcript: Option<&[TranscriptEntry]>,
    config: &Config,
) -> Result<DiarizationResult> {
    let mut stage = Stage::Ingested;

    let segments = vad::detect_speech(waveform, &config.vad);
    advance(&mut stage, Stage::SpeechDetected);
    tracing::info!(segments = segments.len(), "speech detection complete");

    if segments.is_empty() {
        advance(&mut stage, Stage::Done);
        return Ok(DiarizationResult {
            diarized_segments: Vec::new(),
            speaker_count: 0,
            confidence: CONFIDENCE_NO_SPEECH,
            debug: DebugCounters::default(),
        });
    }

    let embeddings = embedding::extract_embeddings(waveform, &segments)?;
    advance(&mut stage, Stage::EmbeddingsExtracted);

    let clusters = cluster::cluster_speakers(&embeddings, &config.clustering)?;
    advance(&mut stage, Stage::Clustered);
    tracing::info!(
        embeddings = embeddings.len(),
        clusters = clusters.len(),
        "speaker clustering complete"
    );

    let separation = confidence::estimate(&embeddings, &clusters);
    advance(&mut stage, Stage::Scored);

    let (diarized_segments, speaker_count) = assemble::assemble(
        &segments,
        &embeddings,
        &clusters,
        transcript,
        &config.assembly,
    );
    advance(&mut stage, Stage::Assembled);

    // Majority voting can collapse two clusters into one visible speaker;
    // the confidence contract follows the reported speaker count.
    let confidence = match speaker_count {
        0 => CONFIDENCE_NO_SPEECH,
        1 => CONFIDENCE_SINGLE_SPEAKER,
        _ => separation,
    };

    let result = DiarizationResult {
        diarized_segments,
        speaker_count,
        confidence,
        debug: DebugCounters {
            speech_segments_count: segments.len(),
            embeddings_count: embeddings.len(),
        },
    };
    advance(&mut stage, Stage::Done);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_display_names_are_snake_case() {
        assert_eq!(Stage::Received.to_string(), "received");
        assert_eq!(Stage::SpeechDetected.to_string(), "speech_detected");
        assert_eq!(Stage::Done.to_string(), "done");
    }

    #[test]
    fn silent_waveform_yields_zero_speakers() {
        // 5 seconds of digital silence at 16kHz
        let waveform = NormalizedWaveform::new(vec![0.0; 5 * 16000]);
        let config = Config::default();

        let result = run_pipeline(&waveform, None, &config).unwrap();

        assert!(result.diarized_segments.is_empty());
        assert_eq!(result.speaker_count, 0);
        assert_eq!(result.confidence, CONFIDENCE_NO_SPEECH);
        assert_eq!(result.debug.speech_segments_count, 0);
        assert_eq!(result.debug.embeddings_count, 0);
    }

    #[test]
    fn result_serializes_with_camel_case_wire_names() {
        let result = DiarizationResult {
            diarized_segments: vec![DiarizedSegment {
                start: 0.0,
                end: 1.5,
                speaker: "Speaker 1".to_string(),
                text: String::new(),
            }],
            speaker_count: 1,
            confidence: 1.0,
            debug: DebugCounters {
                speech_segments_count: 1,
                embeddings_count: 2,
            },
        };

        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("diarizedSegments").is_some());
        assert!(json.get("speakerCount").is_some());
        assert!(json.get("confidence").is_some());
        assert_eq!(json["debug"]["speech_segments_count"], 1);
        assert_eq!(json["debug"]["embeddings_count"], 2);
    }

    #[test]
    fn transcript_entry_rejects_unknown_fields() {
        let raw = r#"{"start": 0.0, "end": 1.0, "text": "hi", "extra": true}"#;
        assert!(serde_json::from_str::<TranscriptEntry>(raw).is_err());
    }

    #[test]
    fn speech_segment_time_accessors() {
        let seg = SpeechSegment {
            start_ms: 1500,
            end_ms: 2250,
            score: 0.1,
        };
        assert_eq!(seg.duration_ms(), 750);
        assert_eq!(seg.start_secs(), 1.5);
        assert_eq!(seg.end_secs(), 2.25);
    }
}
