//! Core type definitions shared by the coordinator and workers.

use serde::{Deserialize, Serialize};

/// User identifier as it appears in the ratings corpus.
pub type UserId = u32;

/// Movie identifier as it appears in the ratings corpus and catalog.
pub type MovieId = u32;

/// A single (user, movie, score) triple from the ratings corpus.
///
/// Scores are bounded to [0.5, 5.0] by the dataset; ingestion discards
/// anything outside [0, 5].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub score: f64,
}

/// A scored movie returned to API clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub movie_id: MovieId,
    pub title: String,
    pub predicted_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendation_item_json_shape() {
        let item = RecommendationItem {
            movie_id: 318,
            title: "The Shawshank Redemption (1994)".to_string(),
            predicted_score: 4.73,
        };

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["movie_id"], 318);
        assert_eq!(json["title"], "The Shawshank Redemption (1994)");
        assert!((json["predicted_score"].as_f64().unwrap() - 4.73).abs() < 1e-12);
    }
}
