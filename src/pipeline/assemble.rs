//! Final result assembly: speaker attribution, segment merging, and
//! transcript alignment.
//!
//! Each speech segment takes the speaker of the majority of its analysis
//! windows (ties go to the lower cluster id). Consecutive segments from the
//! same speaker separated by less than the merge gap become one span, and
//! transcript entries attach to whichever span they overlap most.

use crate::config::AssemblyConfig;
use crate::pipeline::{
    DiarizedSegment, SpeakerCluster, SpeakerEmbedding, SpeechSegment, TranscriptEntry,
};

/// A labeled time span, still in integer milliseconds.
#[derive(Debug, Clone, Copy)]
struct LabeledSpan {
    start_ms: u64,
    end_ms: u64,
    speaker_id: usize,
}

/// Build the final diarized segment list and the distinct speaker count.
pub fn assemble(
    segments: &[SpeechSegment],
    embeddings: &[SpeakerEmbedding],
    clusters: &[SpeakerCluster],
    transcript: Option<&[TranscriptEntry]>,
    config: &AssemblyConfig,
) -> (Vec<DiarizedSegment>, usize) {
    if segments.is_empty() || clusters.is_empty() {
        return (Vec::new(), 0);
    }

    let spans = merge_spans(label_segments(segments, embeddings, clusters), config);

    let mut diarized: Vec<DiarizedSegment> = spans
        .iter()
        .map(|span| DiarizedSegment {
            start: span.start_ms as f64 / 1000.0,
            end: span.end_ms as f64 / 1000.0,
            speaker: format!("Speaker {}", span.speaker_id + 1),
            text: String::new(),
        })
        .collect();

    if let Some(entries) = transcript {
        align_transcript(&mut diarized, entries);
    }

    let mut ids: Vec<usize> = spans.iter().map(|s| s.speaker_id).collect();
    ids.sort_unstable();
    ids.dedup();

    (diarized, ids.len())
}

/// Assign each segment the cluster that won the majority of its windows.
fn label_segments(
    segments: &[SpeechSegment],
    embeddings: &[SpeakerEmbedding],
    clusters: &[SpeakerCluster],
) -> Vec<LabeledSpan> {
    let mut assignment = vec![0usize; embeddings.len()];
    for cluster in clusters {
        for &member in &cluster.members {
            if member < assignment.len() {
                assignment[member] = cluster.id;
            }
        }
    }

    let mut votes = vec![vec![0usize; clusters.len()]; segments.len()];
    for (i, e) in embeddings.iter().enumerate() {
        if e.segment_index < votes.len() {
            votes[e.segment_index][assignment[i]] += 1;
        }
    }

    segments
        .iter()
        .zip(votes.iter())
        .map(|(segment, tally)| {
            // Ascending scan with strict comparison: ties keep the lower id.
            let mut winner = 0usize;
            for (id, &count) in tally.iter().enumerate() {
                if count > tally[winner] {
                    winner = id;
                }
            }
            LabeledSpan {
                start_ms: segment.start_ms,
                end_ms: segment.end_ms,
                speaker_id: winner,
            }
        })
        .collect()
}

/// Merge consecutive same-speaker spans separated by less than the
/// configured gap.
fn merge_spans(spans: Vec<LabeledSpan>, config: &AssemblyConfig) -> Vec<LabeledSpan> {
    let mut merged: Vec<LabeledSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(prev)
                if prev.speaker_id == span.speaker_id
                    && span.start_ms - prev.end_ms < config.min_merge_gap_ms =>
            {
                prev.end_ms = span.end_ms;
            }
            _ => merged.push(span),
        }
    }
    merged
}

/// Attach each transcript entry to the diarized segment it overlaps most.
///
/// Ties go to the earliest segment; entries overlapping nothing are dropped.
/// Texts landing on one segment are joined with single spaces, in transcript
/// order.
fn align_transcript(diarized: &mut [DiarizedSegment], entries: &[TranscriptEntry]) {
    for entry in entries {
        let mut best: Option<(usize, f64)> = None;
        for (i, segment) in diarized.iter().enumerate() {
            let overlap =
                (entry.end.min(segment.end) - entry.start.max(segment.start)).max(0.0);
            if overlap <= 0.0 {
                continue;
            }
            match best {
                Some((_, best_overlap)) if overlap <= best_overlap => {}
                _ => best = Some((i, overlap)),
            }
        }
        if let Some((i, _)) = best {
            let text = entry.text.trim();
            if text.is_empty() {
                continue;
            }
            if diarized[i].text.is_empty() {
                diarized[i].text.push_str(text);
            } else {
                diarized[i].text.push(' ');
                diarized[i].text.push_str(text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start_ms: u64, end_ms: u64) -> SpeechSegment {
        SpeechSegment {
            start_ms,
            end_ms,
            score: 0.2,
        }
    }

    fn embedding(segment_index: usize, window_index: usize) -> SpeakerEmbedding {
        SpeakerEmbedding {
            vector: vec![1.0, 0.0],
            segment_index,
            window_index,
        }
    }

    fn cluster(id: usize, members: Vec<usize>) -> SpeakerCluster {
        SpeakerCluster {
            id,
            members,
            centroid: Vec::new(),
        }
    }

    fn entry(start: f64, end: f64, text: &str) -> TranscriptEntry {
        TranscriptEntry {
            start,
            end,
            text: text.to_string(),
        }
    }

    fn config() -> AssemblyConfig {
        AssemblyConfig {
            min_merge_gap_ms: 250,
        }
    }

    #[test]
    fn empty_segments_produce_empty_result() {
        let (diarized, count) = assemble(&[], &[], &[], None, &config());
        assert!(diarized.is_empty());
        assert_eq!(count, 0);
    }

    #[test]
    fn single_segment_single_cluster() {
        let segments = vec![segment(0, 1500)];
        let embeddings = vec![embedding(0, 0)];
        let clusters = vec![cluster(0, vec![0])];

        let (diarized, count) = assemble(&segments, &embeddings, &clusters, None, &config());

        assert_eq!(count, 1);
        assert_eq!(diarized.len(), 1);
        assert_eq!(diarized[0].speaker, "Speaker 1");
        assert_eq!(diarized[0].start, 0.0);
        assert_eq!(diarized[0].end, 1.5);
        assert_eq!(diarized[0].text, "");
    }

    #[test]
    fn majority_vote_picks_dominant_cluster() {
        // Segment 0 has two windows in cluster 1 and one in cluster 0
        let segments = vec![segment(0, 3000)];
        let embeddings = vec![embedding(0, 0), embedding(0, 1), embedding(0, 2)];
        let clusters = vec![cluster(0, vec![0]), cluster(1, vec![1, 2])];

        let (diarized, _) = assemble(&segments, &embeddings, &clusters, None, &config());
        assert_eq!(diarized[0].speaker, "Speaker 2");
    }

    #[test]
    fn vote_tie_goes_to_lower_cluster_id() {
        let segments = vec![segment(0, 3000)];
        let embeddings = vec![embedding(0, 0), embedding(0, 1)];
        let clusters = vec![cluster(0, vec![1]), cluster(1, vec![0])];

        let (diarized, _) = assemble(&segments, &embeddings, &clusters, None, &config());
        assert_eq!(diarized[0].speaker, "Speaker 1");
    }

    #[test]
    fn close_same_speaker_segments_merge() {
        // 100ms gap, below the 250ms merge limit
        let segments = vec![segment(0, 1000), segment(1100, 2000)];
        let embeddings = vec![embedding(0, 0), embedding(1, 1)];
        let clusters = vec![cluster(0, vec![0, 1])];

        let (diarized, count) = assemble(&segments, &embeddings, &clusters, None, &config());

        assert_eq!(diarized.len(), 1);
        assert_eq!(diarized[0].start, 0.0);
        assert_eq!(diarized[0].end, 2.0);
        assert_eq!(count, 1);
    }

    #[test]
    fn gap_at_merge_limit_stays_split() {
        // Exactly 250ms gap is not merged
        let segments = vec![segment(0, 1000), segment(1250, 2000)];
        let embeddings = vec![embedding(0, 0), embedding(1, 1)];
        let clusters = vec![cluster(0, vec![0, 1])];

        let (diarized, _) = assemble(&segments, &embeddings, &clusters, None, &config());
        assert_eq!(diarized.len(), 2);
    }

    #[test]
    fn different_speakers_never_merge() {
        let segments = vec![segment(0, 1000), segment(1050, 2000)];
        let embeddings = vec![embedding(0, 0), embedding(1, 1)];
        let clusters = vec![cluster(0, vec![0]), cluster(1, vec![1])];

        let (diarized, count) = assemble(&segments, &embeddings, &clusters, None, &config());

        assert_eq!(diarized.len(), 2);
        assert_eq!(diarized[0].speaker, "Speaker 1");
        assert_eq!(diarized[1].speaker, "Speaker 2");
        assert_eq!(count, 2);
    }

    #[test]
    fn speaker_count_reflects_distinct_labels_after_merge() {
        // Three segments voting 0, 1, 0: two distinct speakers
        let segments = vec![segment(0, 1000), segment(2000, 3000), segment(4000, 5000)];
        let embeddings = vec![embedding(0, 0), embedding(1, 1), embedding(2, 2)];
        let clusters = vec![cluster(0, vec![0, 2]), cluster(1, vec![1])];

        let (diarized, count) = assemble(&segments, &embeddings, &clusters, None, &config());
        assert_eq!(diarized.len(), 3);
        assert_eq!(count, 2);
    }

    #[test]
    fn transcript_attaches_to_overlapping_segment() {
        let segments = vec![segment(2000, 5000)];
        let embeddings = vec![embedding(0, 0)];
        let clusters = vec![cluster(0, vec![0])];
        let transcript = vec![entry(2.5, 4.5, "hello there")];

        let (diarized, _) =
            assemble(&segments, &embeddings, &clusters, Some(&transcript), &config());
        assert_eq!(diarized[0].text, "hello there");
    }

    #[test]
    fn transcript_without_overlap_is_dropped() {
        let segments = vec![segment(0, 1000)];
        let embeddings = vec![embedding(0, 0)];
        let clusters = vec![cluster(0, vec![0])];
        let transcript = vec![entry(5.0, 6.0, "orphan")];

        let (diarized, _) =
            assemble(&segments, &embeddings, &clusters, Some(&transcript), &config());
        assert_eq!(diarized[0].text, "");
    }

    #[test]
    fn transcript_overlap_tie_goes_to_earliest_segment() {
        // Entry 0.5..1.5 overlaps both 1s segments by 0.5s
        let segments = vec![segment(0, 1000), segment(1000, 2000)];
        let embeddings = vec![embedding(0, 0), embedding(1, 1)];
        let clusters = vec![cluster(0, vec![0]), cluster(1, vec![1])];
        let transcript = vec![entry(0.5, 1.5, "both")];

        let (diarized, _) =
            assemble(&segments, &embeddings, &clusters, Some(&transcript), &config());
        assert_eq!(diarized[0].text, "both");
        assert_eq!(diarized[1].text, "");
    }

    #[test]
    fn multiple_entries_join_in_order_with_spaces() {
        let segments = vec![segment(0, 4000)];
        let embeddings = vec![embedding(0, 0)];
        let clusters = vec![cluster(0, vec![0])];
        let transcript = vec![entry(0.0, 1.0, "first"), entry(1.0, 2.0, "second")];

        let (diarized, _) =
            assemble(&segments, &embeddings, &clusters, Some(&transcript), &config());
        assert_eq!(diarized[0].text, "first second");
    }

    #[test]
    fn whitespace_only_transcript_text_is_skipped() {
        let segments = vec![segment(0, 2000)];
        let embeddings = vec![embedding(0, 0)];
        let clusters = vec![cluster(0, vec![0])];
        let transcript = vec![entry(0.0, 1.0, "   "), entry(1.0, 2.0, "kept")];

        let (diarized, _) =
            assemble(&segments, &embeddings, &clusters, Some(&transcript), &config());
        assert_eq!(diarized[0].text, "kept");
    }

    #[test]
    fn merged_span_collects_transcript_across_original_segments() {
        let segments = vec![segment(0, 1000), segment(1100, 2500)];
        let embeddings = vec![embedding(0, 0), embedding(1, 1)];
        let clusters = vec![cluster(0, vec![0, 1])];
        let transcript = vec![entry(0.2, 0.8, "part one"), entry(1.2, 2.4, "part two")];

        let (diarized, _) =
            assemble(&segments, &embeddings, &clusters, Some(&transcript), &config());

        assert_eq!(diarized.len(), 1);
        assert_eq!(diarized[0].text, "part one part two");
    }
}
