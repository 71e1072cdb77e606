//! Clustering of near-duplicate opportunities.
//!
//! Clusters are lists of indices into the input slice. Both strategies emit
//! clusters ordered by their first member, members in input order, and every
//! index appears in exactly one cluster.

use oppdb_core::{ClusterStrategy, ConfigError, Opportunity, PipelineConfig};

use crate::embeddings::EmbeddingBackend;
use crate::error::DedupError;

/// Text the embedding is computed from.
#[must_use]
pub fn embedding_text(opportunity: &Opportunity) -> String {
    format!("{} {}", opportunity.title, opportunity.description)
}

/// Full pairwise similarity matrix. Symmetric with a diagonal of 1.0.
#[must_use]
pub fn similarity_matrix<B: EmbeddingBackend>(backend: &B, vectors: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let n = vectors.len();
    let mut matrix = vec![vec![0.0f32; n]; n];
    for i in 0..n {
        matrix[i][i] = 1.0;
        for j in (i + 1)..n {
            let score = backend.similarity(&vectors[i], &vectors[j]);
            matrix[i][j] = score;
            matrix[j][i] = score;
        }
    }
    matrix
}

/// Single pass in input order. Each unassigned index seeds a cluster and
/// pulls in every later unassigned index whose similarity to the seed is at
/// or above `threshold`. Members are never compared with each other.
#[must_use]
pub fn group_greedy_seed(matrix: &[Vec<f32>], threshold: f32) -> Vec<Vec<usize>> {
    let n = matrix.len();
    let mut assigned = vec![false; n];
    let mut clusters = Vec::new();

    for seed in 0..n {
        if assigned[seed] {
            continue;
        }
        assigned[seed] = true;
        let mut cluster = vec![seed];
        for candidate in (seed + 1)..n {
            if !assigned[candidate] && matrix[seed][candidate] >= threshold {
                assigned[candidate] = true;
                cluster.push(candidate);
            }
        }
        clusters.push(cluster);
    }
    clusters
}

/// Connected components of the graph whose edges are the pairs at or above
/// `threshold`.
#[must_use]
pub fn group_connected_components(matrix: &[Vec<f32>], threshold: f32) -> Vec<Vec<usize>> {
    let n = matrix.len();
    let mut sets = DisjointSets::new(n);
    for i in 0..n {
        for j in (i + 1)..n {
            if matrix[i][j] >= threshold {
                sets.union(i, j);
            }
        }
    }

    // Clusters are opened in order of their lowest index.
    let mut cluster_of_root: Vec<Option<usize>> = vec![None; n];
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for index in 0..n {
        let root = sets.find(index);
        match cluster_of_root[root] {
            Some(cluster) => clusters[cluster].push(index),
            None => {
                cluster_of_root[root] = Some(clusters.len());
                clusters.push(vec![index]);
            }
        }
    }
    clusters
}

struct DisjointSets {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSets {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] = self.rank[ra].saturating_add(1);
            }
        }
    }
}

/// Groups opportunities by embedding similarity.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityGrouper {
    threshold: f32,
    strategy: ClusterStrategy,
}

impl SimilarityGrouper {
    /// # Errors
    ///
    /// Returns [`DedupError::Config`] if `threshold` is outside `[0.0, 1.0]`.
    pub fn new(threshold: f32, strategy: ClusterStrategy) -> Result<Self, DedupError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Validation(format!(
                "similarity threshold must be within [0, 1], got {threshold}"
            ))
            .into());
        }
        Ok(Self {
            threshold,
            strategy,
        })
    }

    /// # Errors
    ///
    /// Same as [`SimilarityGrouper::new`].
    pub fn from_config(config: &PipelineConfig) -> Result<Self, DedupError> {
        Self::new(config.similarity_threshold, config.cluster_strategy)
    }

    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    #[must_use]
    pub fn strategy(&self) -> ClusterStrategy {
        self.strategy
    }

    /// Cluster a precomputed similarity matrix.
    #[must_use]
    pub fn group_matrix(&self, matrix: &[Vec<f32>]) -> Vec<Vec<usize>> {
        match self.strategy {
            ClusterStrategy::GreedySeed => group_greedy_seed(matrix, self.threshold),
            ClusterStrategy::ConnectedComponents => {
                group_connected_components(matrix, self.threshold)
            }
        }
    }

    /// Embed every opportunity and cluster the results.
    ///
    /// Fewer than two opportunities never reach the backend.
    ///
    /// # Errors
    ///
    /// Returns the backend's error, [`DedupError::CountMismatch`] when it
    /// returns the wrong number of vectors, or
    /// [`DedupError::DimensionMismatch`] when the vectors differ in length.
    pub async fn group<B: EmbeddingBackend>(
        &self,
        backend: &B,
        opportunities: &[Opportunity],
    ) -> Result<Vec<Vec<usize>>, DedupError> {
        if opportunities.len() < 2 {
            return Ok((0..opportunities.len()).map(|i| vec![i]).collect());
        }

        let texts: Vec<String> = opportunities.iter().map(embedding_text).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let vectors = backend.embed(&refs).await?;

        if vectors.len() != opportunities.len() {
            return Err(DedupError::CountMismatch {
                expected: opportunities.len(),
                got: vectors.len(),
            });
        }
        let dimension = vectors[0].len();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(DedupError::DimensionMismatch {
                expected: dimension,
                got: bad.len(),
            });
        }

        let matrix = similarity_matrix(backend, &vectors);
        let clusters = self.group_matrix(&matrix);
        tracing::debug!(
            opportunities = opportunities.len(),
            clusters = clusters.len(),
            threshold = self.threshold,
            strategy = %self.strategy,
            "grouped opportunities"
        );
        Ok(clusters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A~B and B~C above threshold, A~C below.
    fn chain(order: [usize; 3]) -> Vec<Vec<f32>> {
        const A: usize = 0;
        const B: usize = 1;
        const C: usize = 2;
        let score = |x: usize, y: usize| -> f32 {
            match (x.min(y), x.max(y)) {
                (a, b) if a == b => 1.0,
                (A, B) | (B, C) => 0.9,
                _ => 0.5,
            }
        };
        order
            .iter()
            .map(|&x| order.iter().map(|&y| score(x, y)).collect())
            .collect()
    }

    #[test]
    fn greedy_with_bridge_first_collects_everything() {
        // order [B, A, C]: B seeds and reaches both ends
        assert_eq!(group_greedy_seed(&chain([1, 0, 2]), 0.8), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn greedy_with_end_first_leaves_far_end_alone() {
        // order [A, B, C]: A seeds, takes B, never compares B with C
        assert_eq!(group_greedy_seed(&chain([0, 1, 2]), 0.8), vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn greedy_with_far_end_second_still_attaches_bridge_to_first_seed() {
        // order [A, C, B]: A seeds and takes B; C stays alone
        assert_eq!(group_greedy_seed(&chain([0, 2, 1]), 0.8), vec![vec![0, 2], vec![1]]);
    }

    #[test]
    fn components_are_order_independent_in_membership() {
        for order in [[0, 1, 2], [0, 2, 1], [1, 0, 2], [2, 1, 0]] {
            assert_eq!(
                group_connected_components(&chain(order), 0.8),
                vec![vec![0, 1, 2]],
                "order {order:?}"
            );
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        let matrix = vec![vec![1.0, 0.8], vec![0.8, 1.0]];
        assert_eq!(group_greedy_seed(&matrix, 0.8), vec![vec![0, 1]]);
        assert_eq!(group_connected_components(&matrix, 0.8), vec![vec![0, 1]]);
    }

    #[test]
    fn dissimilar_items_stay_apart() {
        let matrix = vec![
            vec![1.0, 0.1, 0.2],
            vec![0.1, 1.0, 0.3],
            vec![0.2, 0.3, 1.0],
        ];
        assert_eq!(
            group_greedy_seed(&matrix, 0.8),
            vec![vec![0], vec![1], vec![2]]
        );
    }

    #[test]
    fn components_keep_first_member_order() {
        // 0~2 and 1~3, two interleaved clusters
        let matrix = vec![
            vec![1.0, 0.0, 0.9, 0.0],
            vec![0.0, 1.0, 0.0, 0.9],
            vec![0.9, 0.0, 1.0, 0.0],
            vec![0.0, 0.9, 0.0, 1.0],
        ];
        assert_eq!(
            group_connected_components(&matrix, 0.8),
            vec![vec![0, 2], vec![1, 3]]
        );
    }

    #[test]
    fn empty_matrix_has_no_clusters() {
        assert!(group_greedy_seed(&[], 0.8).is_empty());
        assert!(group_connected_components(&[], 0.8).is_empty());
    }

    #[test]
    fn threshold_outside_unit_range_is_rejected() {
        assert!(SimilarityGrouper::new(1.5, ClusterStrategy::GreedySeed).is_err());
        assert!(SimilarityGrouper::new(-0.1, ClusterStrategy::GreedySeed).is_err());
        assert!(SimilarityGrouper::new(0.0, ClusterStrategy::GreedySeed).is_ok());
    }
}
