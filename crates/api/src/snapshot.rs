//! JSON snapshot persistence
//!
//! A single JSON document holding the movie catalog and the recommendation
//! cache. Persistence is optional: an unset path disables it, an absent file
//! starts the coordinator empty, and a file that exists but does not decode
//! aborts startup rather than being silently overwritten.

use chrono::{DateTime, Utc};
use cinegrid_core::types::{MovieId, RecommendationItem, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write snapshot {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("snapshot {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// One cached recommendation list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshotEntry {
    pub user_id: UserId,
    pub top_n: usize,
    pub items: Vec<RecommendationItem>,
}

/// Persisted coordinator state.
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub movies: HashMap<MovieId, String>,
    pub cache: Vec<CacheSnapshotEntry>,
    pub updated: DateTime<Utc>,
}

/// Load a snapshot. `Ok(None)` when the file does not exist yet.
///
/// # Errors
///
/// `SnapshotError::Corrupt` when the file exists but fails to decode; callers
/// treat this as fatal.
pub fn load(path: &Path) -> Result<Option<Snapshot>, SnapshotError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(SnapshotError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let snapshot: Snapshot =
        serde_json::from_slice(&bytes).map_err(|source| SnapshotError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;

    info!(
        snapshot = %path.display(),
        movies = snapshot.movies.len(),
        cache_entries = snapshot.cache.len(),
        "snapshot loaded"
    );
    Ok(Some(snapshot))
}

/// Persist a snapshot to disk.
pub fn save(path: &Path, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    let bytes = serde_json::to_vec_pretty(snapshot).map_err(|source| SnapshotError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;

    std::fs::write(path, bytes).map_err(|source| SnapshotError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    info!(
        snapshot = %path.display(),
        cache_entries = snapshot.cache.len(),
        "snapshot saved"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn sample_snapshot() -> Snapshot {
        Snapshot {
            movies: HashMap::from([(1, "Toy Story (1995)".to_string())]),
            cache: vec![CacheSnapshotEntry {
                user_id: 7,
                top_n: 10,
                items: vec![RecommendationItem {
                    movie_id: 2,
                    title: "Jumanji (1995)".to_string(),
                    predicted_score: 4.2,
                }],
            }],
            updated: Utc::now(),
        }
    }

    #[test]
    fn test_absent_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db_snapshot.json");

        assert!(load(&path).unwrap().is_none());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db_snapshot.json");

        save(&path, &sample_snapshot()).unwrap();
        let loaded = load(&path).unwrap().unwrap();

        assert_eq!(loaded.movies.get(&1).unwrap(), "Toy Story (1995)");
        assert_eq!(loaded.cache.len(), 1);
        assert_eq!(loaded.cache[0].user_id, 7);
        assert_eq!(loaded.cache[0].items[0].movie_id, 2);
    }

    #[test]
    fn test_corrupt_file_is_fatal_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        file.flush().unwrap();

        let result = load(file.path());
        assert!(matches!(result, Err(SnapshotError::Corrupt { .. })));
    }
}
