//! Separation confidence for a clustering outcome.
//!
//! Scores how cleanly the embeddings split into the chosen clusters using
//! the mean silhouette coefficient under cosine distance, rescaled from
//! [-1, 1] to [0, 1]. Fewer than two clusters cannot express separation, so
//! those cases are scored by the pipeline's sentinels instead.

use crate::pipeline::cluster::cosine_distance;
use crate::pipeline::{SpeakerCluster, SpeakerEmbedding};

/// Mean silhouette over all embeddings, rescaled to [0, 1].
///
/// Returns 0.0 for degenerate input (fewer than two clusters, or fewer
/// embeddings than clusters); callers decide what a degenerate outcome
/// means. Higher is better: 1.0 is perfect separation, 0.5 is no better
/// than chance.
pub fn estimate(embeddings: &[SpeakerEmbedding], clusters: &[SpeakerCluster]) -> f64 {
    if clusters.len() < 2 || embeddings.len() < clusters.len() {
        return 0.0;
    }

    let mut total = 0.0f64;
    let mut counted = 0usize;

    for cluster in clusters {
        for &member in &cluster.members {
            let own = mean_distance_to(embeddings, member, &cluster.members);

            // Nearest other cluster by mean distance.
            let nearest = clusters
                .iter()
                .filter(|other| other.id != cluster.id)
                .map(|other| mean_distance_to_all(embeddings, member, &other.members))
                .fold(f64::INFINITY, f64::min);

            let denom = own.max(nearest);
            let silhouette = if denom > 1e-12 {
                (nearest - own) / denom
            } else {
                0.0
            };
            total += silhouette;
            counted += 1;
        }
    }

    if counted == 0 {
        return 0.0;
    }
    let mean = total / counted as f64;
    ((mean + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// Mean distance from `member` to the other members of its own cluster.
/// A singleton has no peers and contributes a perfect own-cluster fit.
fn mean_distance_to(embeddings: &[SpeakerEmbedding], member: usize, members: &[usize]) -> f64 {
    let peers: Vec<usize> = members.iter().copied().filter(|&m| m != member).collect();
    if peers.is_empty() {
        return 0.0;
    }
    peers
        .iter()
        .map(|&p| cosine_distance(&embeddings[member].vector, &embeddings[p].vector))
        .sum::<f64>()
        / peers.len() as f64
}

fn mean_distance_to_all(embeddings: &[SpeakerEmbedding], member: usize, members: &[usize]) -> f64 {
    if members.is_empty() {
        return f64::INFINITY;
    }
    members
        .iter()
        .map(|&m| cosine_distance(&embeddings[member].vector, &embeddings[m].vector))
        .sum::<f64>()
        / members.len() as f64
}
