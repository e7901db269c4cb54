//! Top-k retrieval over the vector index.

use tracing::debug;

use crate::error::Result;
use crate::index::VectorIndex;
use crate::models::ScoredChunk;

/// Fetch the `k` chunks most similar to the question vector, dropping any
/// candidate below `score_floor` when one is set.
///
/// An empty result is a valid, meaningful outcome ("nothing relevant
/// found") that the answer gate handles explicitly; the floor eliminating
/// every candidate is not an error.
pub async fn retrieve(
    index: &dyn VectorIndex,
    question_vector: &[f32],
    k: i64,
    score_floor: Option<f32>,
) -> Result<Vec<ScoredChunk>> {
    let mut results = index.search(question_vector, k).await?;

    if let Some(floor) = score_floor {
        results.retain(|c| c.score >= floor);
    }

    debug!(
        k,
        returned = results.len(),
        top_score = results.first().map(|c| c.score),
        "retrieval complete"
    );
    Ok(results)
}
