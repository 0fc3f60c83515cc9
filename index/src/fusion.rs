//! Reciprocal-rank fusion of the dense and sparse result lists.

use std::collections::HashMap;

use maestro_core::ChunkId;
use ordered_float::OrderedFloat;

use crate::dense::DenseHit;
use crate::sparse::SparseHit;

/// Fusion constant added to each rank before inverting, standard RRF practice
/// to keep early ranks from dominating too sharply.
const RRF_K: f32 = 60.0;

/// A chunk id with its fused score, in descending order.
#[derive(Debug, Clone, Copy)]
pub struct FusedHit {
    /// The chunk this score belongs to.
    pub chunk_id: ChunkId,
    /// Combined score: `alpha * rrf(dense_rank) + (1 - alpha) * rrf(sparse_rank)`.
    pub score: f32,
}

/// Fuses ranked dense and sparse hit lists via weighted reciprocal-rank
/// fusion. `alpha` weighs the dense channel; `1.0 - alpha` weighs sparse.
/// A chunk present in only one list is scored using that list's rank alone.
#[must_use]
pub fn reciprocal_rank_fusion(dense: &[DenseHit], sparse: &[SparseHit], alpha: f32) -> Vec<FusedHit> {
    let mut scores: HashMap<ChunkId, f32> = HashMap::new();

    for (rank, hit) in dense.iter().enumerate() {
        let contribution = alpha / (RRF_K + rank as f32 + 1.0);
        *scores.entry(hit.chunk_id).or_insert(0.0) += contribution;
    }
    for (rank, hit) in sparse.iter().enumerate() {
        let contribution = (1.0 - alpha) / (RRF_K + rank as f32 + 1.0);
        *scores.entry(hit.chunk_id).or_insert(0.0) += contribution;
    }

    let mut fused: Vec<FusedHit> = scores
        .into_iter()
        .map(|(chunk_id, score)| FusedHit { chunk_id, score })
        .collect();
    fused.sort_by_key(|h| std::cmp::Reverse(OrderedFloat(h.score)));
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_ranked_first_in_both_channels_wins() {
        let a = ChunkId::new();
        let b = ChunkId::new();
        let dense = vec![DenseHit { chunk_id: a, score: 0.9 }, DenseHit { chunk_id: b, score: 0.8 }];
        let sparse = vec![SparseHit { chunk_id: a, score: 5.0 }, SparseHit { chunk_id: b, score: 4.0 }];

        let fused = reciprocal_rank_fusion(&dense, &sparse, 0.5);
        assert_eq!(fused[0].chunk_id, a);
    }

    #[test]
    fn chunk_in_only_one_channel_still_scores() {
        let a = ChunkId::new();
        let dense = vec![DenseHit { chunk_id: a, score: 0.9 }];
        let fused = reciprocal_rank_fusion(&dense, &[], 0.5);
        assert_eq!(fused.len(), 1);
        assert!(fused[0].score > 0.0);
    }

    #[test]
    fn alpha_zero_ignores_dense_channel() {
        let a = ChunkId::new();
        let b = ChunkId::new();
        let dense = vec![DenseHit { chunk_id: a, score: 0.99 }];
        let sparse = vec![SparseHit { chunk_id: b, score: 0.1 }];

        let fused = reciprocal_rank_fusion(&dense, &sparse, 0.0);
        assert_eq!(fused[0].chunk_id, b);
    }

    #[test]
    fn empty_inputs_fuse_to_empty() {
        assert!(reciprocal_rank_fusion(&[], &[], 0.5).is_empty());
    }
}
