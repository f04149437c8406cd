//! In-memory shard store
//!
//! Loads one ratings partition CSV into an immutable read-mostly structure:
//! user id -> profile (flat sorted rating array + mean) plus the ordered id
//! list that deterministic sampling walks.
//!
//! Ratings are kept as a sorted `Vec<(MovieId, f64)>` per user rather than a
//! nested map, so the co-rated intersection in the kNN engine is a two-pointer
//! merge instead of repeated hash lookups.

use cinegrid_core::types::{MovieId, Rating, UserId};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Errors raised while building a shard from a partition file.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to open partition {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read partition {path}: {source}")]
    Read {
        path: PathBuf,
        source: csv::Error,
    },

    #[error("partition {path} contains no usable ratings")]
    Empty { path: PathBuf },
}

/// One user's ratings, sorted by movie id, plus the precomputed mean.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    ratings: Vec<(MovieId, f64)>,
    mean: f64,
}

impl UserProfile {
    /// Build a profile from unordered ratings.
    ///
    /// Duplicate (user, movie) pairs keep the last score seen, matching
    /// ingest order. Returns `None` for an empty rating set: a profile always
    /// has at least one rating.
    pub fn from_ratings(mut ratings: Vec<(MovieId, f64)>) -> Option<Self> {
        if ratings.is_empty() {
            return None;
        }

        // Stable sort so the last occurrence of a movie id wins the dedup.
        ratings.sort_by_key(|(movie_id, _)| *movie_id);
        let mut deduped: Vec<(MovieId, f64)> = Vec::with_capacity(ratings.len());
        for (movie_id, score) in ratings {
            match deduped.last_mut() {
                Some((last_id, last_score)) if *last_id == movie_id => *last_score = score,
                _ => deduped.push((movie_id, score)),
            }
        }

        let sum: f64 = deduped.iter().map(|(_, score)| score).sum();
        let mean = sum / deduped.len() as f64;

        Some(Self {
            ratings: deduped,
            mean,
        })
    }

    /// Ratings sorted ascending by movie id.
    pub fn ratings(&self) -> &[(MovieId, f64)] {
        &self.ratings
    }

    /// Arithmetic mean of this user's scores.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Number of movies this user has rated.
    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    /// Score for a single movie, if rated.
    pub fn score(&self, movie_id: MovieId) -> Option<f64> {
        self.ratings
            .binary_search_by_key(&movie_id, |(id, _)| *id)
            .ok()
            .map(|idx| self.ratings[idx].1)
    }

    /// Whether this user has rated the movie.
    pub fn has_rated(&self, movie_id: MovieId) -> bool {
        self.score(movie_id).is_some()
    }
}

/// Immutable row-shard of the ratings matrix.
pub struct ShardStore {
    profiles: HashMap<UserId, UserProfile>,
    user_ids: Vec<UserId>,
    ratings_total: usize,
    rows_discarded: usize,
}

impl ShardStore {
    /// Load a shard from a headered partition CSV of
    /// `userId,movieId,rating[,timestamp]` rows.
    ///
    /// Rows whose first three fields do not parse as (u32, u32, f64), or
    /// whose score falls outside [0, 5], are discarded and counted.
    ///
    /// # Errors
    ///
    /// `IngestError::Open` when the file cannot be opened, `IngestError::Read`
    /// on an unrecoverable reader fault, `IngestError::Empty` when no user
    /// survives ingestion.
    pub fn load(path: &Path) -> Result<Self, IngestError> {
        let file = File::open(path).map_err(|source| IngestError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let mut by_user: HashMap<UserId, Vec<(MovieId, f64)>> = HashMap::new();
        let mut ratings_total = 0usize;
        let mut rows_discarded = 0usize;

        for result in reader.records() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    if e.is_io_error() {
                        return Err(IngestError::Read {
                            path: path.to_path_buf(),
                            source: e,
                        });
                    }
                    rows_discarded += 1;
                    continue;
                }
            };

            match parse_rating_row(&record) {
                Some(rating) => {
                    by_user
                        .entry(rating.user_id)
                        .or_default()
                        .push((rating.movie_id, rating.score));
                    ratings_total += 1;
                }
                None => rows_discarded += 1,
            }
        }

        let store = Self::from_rating_groups(by_user, ratings_total, rows_discarded);
        if store.is_empty() {
            return Err(IngestError::Empty {
                path: path.to_path_buf(),
            });
        }

        if store.rows_discarded > 0 {
            warn!(
                partition = %path.display(),
                discarded = store.rows_discarded,
                "discarded malformed ratings rows"
            );
        }
        info!(
            partition = %path.display(),
            users = store.len(),
            ratings = store.ratings_total,
            "shard loaded"
        );

        Ok(store)
    }

    /// Build a store directly from grouped ratings. Used by `load` and by
    /// tests that construct small shards inline.
    pub fn from_rating_groups(
        by_user: HashMap<UserId, Vec<(MovieId, f64)>>,
        ratings_total: usize,
        rows_discarded: usize,
    ) -> Self {
        let mut profiles = HashMap::with_capacity(by_user.len());
        for (user_id, ratings) in by_user {
            if let Some(profile) = UserProfile::from_ratings(ratings) {
                profiles.insert(user_id, profile);
            }
        }

        let mut user_ids: Vec<UserId> = profiles.keys().copied().collect();
        user_ids.sort_unstable();

        Self {
            profiles,
            user_ids,
            ratings_total,
            rows_discarded,
        }
    }

    /// Look up one user's profile.
    pub fn lookup(&self, user_id: UserId) -> Option<&UserProfile> {
        self.profiles.get(&user_id)
    }

    /// Stable ascending user id list; the basis for deterministic sampling.
    pub fn user_ids(&self) -> &[UserId] {
        &self.user_ids
    }

    /// Number of users in this shard.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Total ratings retained at ingest.
    pub fn ratings_total(&self) -> usize {
        self.ratings_total
    }

    /// Malformed rows dropped at ingest.
    pub fn rows_discarded(&self) -> usize {
        self.rows_discarded
    }

    /// Consume the store, yielding its profiles. The coordinator uses this to
    /// fold every partition into its own full user table.
    pub fn into_profiles(self) -> HashMap<UserId, UserProfile> {
        self.profiles
    }
}

/// Parse one CSV row into a rating.
///
/// Scores outside [0, 5] are rejected here; the 0.5 dataset floor is not
/// enforced so that half-star exports with explicit zeros are still ingested
/// consistently with the bounds filter.
fn parse_rating_row(record: &csv::StringRecord) -> Option<Rating> {
    let user_id: UserId = record.get(0)?.trim().parse().ok()?;
    let movie_id: MovieId = record.get(1)?.trim().parse().ok()?;
    let score: f64 = record.get(2)?.trim().parse().ok()?;

    if !(0.0..=5.0).contains(&score) {
        return None;
    }

    Some(Rating {
        user_id,
        movie_id,
        score,
    })
}
