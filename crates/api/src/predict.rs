//! Rating prediction
//!
//! Folds the merged neighbor set into weighted mean-centered scores for every
//! movie some neighbor rated and the target has not:
//!
//! ```text
//! num[m] += sim_j * (r_jm - mean_j)        den[m] += |sim_j|
//! predicted(m) = mean_target + num[m] / den[m]     (den[m] > 0)
//! ```
//!
//! Results are sorted by descending predicted score, ties by ascending movie
//! id, truncated to top-n. Title lookups never fail the request: ids missing
//! from the catalog resolve to the "Unknown" sentinel.

use crate::catalog::{MovieCatalog, UNKNOWN_TITLE};
use crate::users::UserTable;
use cinegrid_core::protocol::SimilarityRecord;
use cinegrid_core::types::{MovieId, RecommendationItem};
use cinegrid_shard::UserProfile;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Score candidate movies for the target from the global neighbor set.
pub fn predict(
    target: &UserProfile,
    neighbors: &[SimilarityRecord],
    users: &UserTable,
    catalog: &MovieCatalog,
    top_n: usize,
) -> Vec<RecommendationItem> {
    let mut numerators: HashMap<MovieId, f64> = HashMap::new();
    let mut weights: HashMap<MovieId, f64> = HashMap::new();

    for record in neighbors {
        let neighbor = match users.profile(record.user_id) {
            Some(profile) => profile,
            None => continue,
        };

        for &(movie_id, score) in neighbor.ratings() {
            if target.has_rated(movie_id) {
                continue;
            }

            *numerators.entry(movie_id).or_insert(0.0) +=
                record.similarity * (score - neighbor.mean());
            *weights.entry(movie_id).or_insert(0.0) += record.similarity.abs();
        }
    }

    let mut items: Vec<RecommendationItem> = numerators
        .into_iter()
        .filter_map(|(movie_id, numerator)| {
            let weight = weights[&movie_id];
            if weight <= 0.0 {
                return None;
            }

            Some(RecommendationItem {
                movie_id,
                title: catalog
                    .title(movie_id)
                    .unwrap_or(UNKNOWN_TITLE)
                    .to_string(),
                predicted_score: target.mean() + numerator / weight,
            })
        })
        .collect();

    items.sort_by(|a, b| {
        b.predicted_score
            .partial_cmp(&a.predicted_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.movie_id.cmp(&b.movie_id))
    });
    items.truncate(top_n);

    items
}
