//! Shard-local k-nearest-neighbor computation
//!
//! Scores a sampled subset of shard users against a target rating vector with
//! mean-centered cosine similarity and returns the shard-local top-k.
//!
//! Sampling is a deterministic stride over the shard's ordered id list, not a
//! random permutation: every worker must produce identical output for
//! identical input with no shared RNG state.

use crate::store::ShardStore;
use cinegrid_core::protocol::SimilarityRecord;
use cinegrid_core::types::{MovieId, UserId};
use std::cmp::Ordering;
use std::time::Instant;

/// Candidates sharing fewer co-rated movies than this carry no signal.
const MIN_COMMON_MOVIES: usize = 3;

/// One similarity query against a shard.
#[derive(Debug, Clone)]
pub struct SimilarityQuery<'a> {
    pub target_user_id: UserId,
    /// Target ratings sorted ascending by movie id.
    pub target_ratings: &'a [(MovieId, f64)],
    pub target_mean: f64,
    pub k: usize,
    pub sample_size: usize,
}

/// Per-request execution statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryStats {
    pub duration_ms: f64,
    pub users_checked: usize,
}

/// Compute the shard-local top-k neighbors for a target.
///
/// Records are emitted only for candidates with at least three co-rated
/// movies and strictly positive similarity, sorted by descending similarity
/// with ties broken by ascending user id, truncated to `k`.
pub fn similar(store: &ShardStore, query: &SimilarityQuery<'_>) -> (Vec<SimilarityRecord>, QueryStats) {
    let started = Instant::now();

    let mut records: Vec<SimilarityRecord> = Vec::new();
    let mut users_checked = 0usize;

    for user_id in stride_sample(store.user_ids(), query.sample_size) {
        if user_id == query.target_user_id {
            continue;
        }

        let candidate = match store.lookup(user_id) {
            Some(profile) => profile,
            None => continue,
        };
        users_checked += 1;

        let (similarity, common) = centered_cosine(
            query.target_ratings,
            query.target_mean,
            candidate.ratings(),
            candidate.mean(),
        );

        if common >= MIN_COMMON_MOVIES && similarity > 0.0 {
            records.push(SimilarityRecord {
                user_id,
                similarity,
            });
        }
    }

    records.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    records.truncate(query.k);

    let stats = QueryStats {
        duration_ms: started.elapsed().as_secs_f64() * 1000.0,
        users_checked,
    };

    (records, stats)
}

/// Deterministic stride sample over the ordered id list.
///
/// Takes every user when the shard fits inside `sample_size`; otherwise walks
/// the list with step ⌊n / sample_size⌋ starting at index 0.
fn stride_sample(user_ids: &[UserId], sample_size: usize) -> impl Iterator<Item = UserId> + '_ {
    let n = user_ids.len();
    let (step, take) = if n <= sample_size {
        (1, n)
    } else {
        (n / sample_size, sample_size)
    };

    user_ids.iter().step_by(step.max(1)).take(take).copied()
}

/// Mean-centered cosine similarity restricted to co-rated movies.
///
/// Both norms run over the intersection only, recomputed per pair. Full-vector
/// norms are not an equivalent substitute: they change the result whenever the
/// users rate disjoint movies as well. Returns (similarity, common count);
/// similarity is 0 when either centered sub-vector has zero norm.
fn centered_cosine(
    target: &[(MovieId, f64)],
    target_mean: f64,
    candidate: &[(MovieId, f64)],
    candidate_mean: f64,
) -> (f64, usize) {
    let mut dot = 0.0f64;
    let mut norm_target = 0.0f64;
    let mut norm_candidate = 0.0f64;
    let mut common = 0usize;

    // Two-pointer merge over the sorted rating arrays.
    let mut i = 0;
    let mut j = 0;
    while i < target.len() && j < candidate.len() {
        match target[i].0.cmp(&candidate[j].0) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                let r_target = target[i].1 - target_mean;
                let r_candidate = candidate[j].1 - candidate_mean;

                dot += r_target * r_candidate;
                norm_target += r_target * r_target;
                norm_candidate += r_candidate * r_candidate;
                common += 1;

                i += 1;
                j += 1;
            }
        }
    }

    if common < MIN_COMMON_MOVIES || norm_target == 0.0 || norm_candidate == 0.0 {
        return (0.0, common);
    }

    (dot / (norm_target.sqrt() * norm_candidate.sqrt()), common)
}
