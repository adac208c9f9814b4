//! Agglomerative speaker clustering over embedding vectors.
//!
//! Bottom-up average-linkage merging under cosine distance: every embedding
//! starts as its own cluster, and the closest pair merges until the maximum
//! speaker count is reached. If the two surviving clusters are not separated
//! by more than the configured threshold, they collapse into one speaker.
//!
//! Merge order is fully deterministic: distance ties resolve to the
//! lexicographically first cluster pair.

use crate::config::ClusteringConfig;
use crate::error::{DiarizerError, Result};
use crate::pipeline::{SpeakerCluster, SpeakerEmbedding};

/// Cosine distance in [0, 2]. Zero-norm vectors compare as maximally
/// dissimilar rather than poisoning the math with NaN.
pub(crate) fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x as f64 * y as f64;
        norm_a += x as f64 * x as f64;
        norm_b += y as f64 * y as f64;
    }
    if norm_a <= 1e-24 || norm_b <= 1e-24 {
        return 1.0;
    }
    (1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 2.0)
}

/// Mean pairwise distance between two clusters' members.
fn average_linkage(matrix: &[Vec<f64>], a: &[usize], b: &[usize]) -> f64 {
    let mut sum = 0.0;
    for &i in a {
        for &j in b {
            sum += matrix[i][j];
        }
    }
    sum / (a.len() * b.len()) as f64
}

/// Group embeddings into at most `config.max_speakers` clusters.
///
/// Clusters partition the embedding indices, are ordered by their earliest
/// member, and carry ids assigned in that order. Deterministic for identical
/// input and configuration.
pub fn cluster_speakers(
    embeddings: &[SpeakerEmbedding],
    config: &ClusteringConfig,
) -> Result<Vec<SpeakerCluster>> {
    if embeddings.is_empty() {
        return Ok(Vec::new());
    }

    let dim = embeddings[0].vector.len();
    for (i, e) in embeddings.iter().enumerate() {
        if e.vector.len() != dim {
            return Err(DiarizerError::Clustering {
                message: format!(
                    "embedding {} has dimension {}, expected {}",
                    i,
                    e.vector.len(),
                    dim
                ),
            });
        }
        if e.vector.iter().any(|v| !v.is_finite()) {
            return Err(DiarizerError::Clustering {
                message: format!("embedding {} contains a non-finite component", i),
            });
        }
    }

    // Pairwise distances are reused across every linkage evaluation.
    let n = embeddings.len();
    let mut matrix = vec![vec![0.0f64; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = cosine_distance(&embeddings[i].vector, &embeddings[j].vector);
            matrix[i][j] = d;
            matrix[j][i] = d;
        }
    }

    let target = config.max_speakers.max(1);
    let mut groups: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();

    while groups.len() > target {
        let (a, b, _) = closest_pair(&matrix, &groups);
        merge_groups(&mut groups, a, b);
    }

    // Two clusters only count as two speakers when they are genuinely apart.
    if groups.len() == 2 {
        let gap = average_linkage(&matrix, &groups[0], &groups[1]);
        if gap <= config.min_separation_threshold as f64 {
            merge_groups(&mut groups, 0, 1);
        }
    }

    // Order clusters by their earliest member so ids are stable.
    for g in groups.iter_mut() {
        g.sort_unstable();
    }
    groups.sort_by_key(|g| g[0]);

    Ok(groups
        .into_iter()
        .enumerate()
        .map(|(id, members)| {
            let centroid = centroid_of(embeddings, &members, dim);
            SpeakerCluster {
                id,
                members,
                centroid,
            }
        })
        .collect())
}

/// Find the pair of groups with minimal average linkage. Strict comparison
/// keeps the first pair in (i, j) order on ties.
fn closest_pair(matrix: &[Vec<f64>], groups: &[Vec<usize>]) -> (usize, usize, f64) {
    let mut best = (0usize, 1usize, f64::INFINITY);
    for i in 0..groups.len() {
        for j in (i + 1)..groups.len() {
            let d = average_linkage(matrix, &groups[i], &groups[j]);
            if d < best.2 {
                best = (i, j, d);
            }
        }
    }
    best
}

fn merge_groups(groups: &mut Vec<Vec<usize>>, a: usize, b: usize) {
    let absorbed = groups.remove(b);
    groups[a].extend(absorbed);
}

fn centroid_of(embeddings: &[SpeakerEmbedding], members: &[usize], dim: usize) -> Vec<f32> {
    let mut centroid = vec![0.0f64; dim];
    for &m in members {
        for (c, &v) in centroid.iter_mut().zip(embeddings[m].vector.iter()) {
            *c += v as f64;
        }
    }
    let count = members.len().max(1) as f64;
    centroid.iter().map(|&c| (c / count) as f32).collect()
}
