//! Near-duplicate detection and merging for extracted opportunities.
//!
//! [`deduplicate`] embeds every opportunity, clusters them with a
//! [`SimilarityGrouper`] and collapses each cluster with [`merge_cluster`].

pub mod embeddings;
pub mod error;
pub mod grouping;
pub mod merge;

use oppdb_core::{ClusterStrategy, Opportunity};

pub use embeddings::{cosine_similarity, EmbeddingBackend, TeiClient};
pub use error::DedupError;
pub use grouping::{
    embedding_text, group_connected_components, group_greedy_seed, similarity_matrix,
    SimilarityGrouper,
};
pub use merge::{merge_cluster, DESCRIPTION_SEPARATOR};

/// Collapse near-duplicates in `opportunities`.
///
/// Output is ordered by each cluster's first member. Empty and single-element
/// inputs are returned without calling the backend.
///
/// # Errors
///
/// Returns [`DedupError::Config`] for a threshold outside `[0.0, 1.0]` and any
/// embedding failure. On error the input is dropped; callers that want to keep
/// the undeduplicated list should clone it first.
pub async fn deduplicate<B: EmbeddingBackend>(
    backend: &B,
    opportunities: Vec<Opportunity>,
    threshold: f32,
    strategy: ClusterStrategy,
) -> Result<Vec<Opportunity>, DedupError> {
    let grouper = SimilarityGrouper::new(threshold, strategy)?;
    deduplicate_with(backend, &grouper, opportunities).await
}

/// [`deduplicate`] with a prebuilt grouper.
///
/// # Errors
///
/// Any embedding failure, see [`SimilarityGrouper::group`].
pub async fn deduplicate_with<B: EmbeddingBackend>(
    backend: &B,
    grouper: &SimilarityGrouper,
    opportunities: Vec<Opportunity>,
) -> Result<Vec<Opportunity>, DedupError> {
    let input = opportunities.len();
    let clusters = grouper.group(backend, &opportunities).await?;

    let mut slots: Vec<Option<Opportunity>> = opportunities.into_iter().map(Some).collect();
    let merged: Vec<Opportunity> = clusters
        .into_iter()
        .filter_map(|cluster| {
            let members: Vec<Opportunity> = cluster
                .into_iter()
                .filter_map(|index| slots.get_mut(index).and_then(Option::take))
                .collect();
            merge_cluster(members)
        })
        .collect();

    tracing::info!(
        input,
        output = merged.len(),
        merged = input.saturating_sub(merged.len()),
        threshold = grouper.threshold(),
        "deduplication complete"
    );
    Ok(merged)
}
