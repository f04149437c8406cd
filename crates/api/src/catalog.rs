//! Movie catalog
//!
//! Coordinator-side movie id -> title dictionary, loaded once at startup from
//! the catalog CSV (`movieId,title,genres`). Lookups never fail a request: an
//! unknown id resolves to the sentinel title "Unknown" at prediction time.

use cinegrid_core::types::MovieId;
use cinegrid_shard::IngestError;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::{info, warn};

/// Title returned for movie ids missing from the catalog.
pub const UNKNOWN_TITLE: &str = "Unknown";

#[derive(Debug, Default)]
pub struct MovieCatalog {
    titles: HashMap<MovieId, String>,
}

impl MovieCatalog {
    /// Load the catalog from a headered CSV. Malformed rows are skipped.
    pub fn load(path: &Path) -> Result<Self, IngestError> {
        let file = File::open(path).map_err(|source| IngestError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let mut titles = HashMap::new();
        let mut skipped = 0usize;

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
                    skipped += 1;
                    continue;
                }
            };

            let movie_id: MovieId = match record.get(0).and_then(|f| f.trim().parse().ok()) {
                Some(id) => id,
                None => {
                    skipped += 1;
                    continue;
                }
            };
            let title = match record.get(1) {
                Some(title) if !title.is_empty() => title.to_string(),
                _ => {
                    skipped += 1;
                    continue;
                }
            };

            titles.insert(movie_id, title);
        }

        if skipped > 0 {
            warn!(catalog = %path.display(), skipped, "skipped malformed catalog rows");
        }
        info!(catalog = %path.display(), movies = titles.len(), "movie catalog loaded");

        Ok(Self { titles })
    }

    pub fn from_titles(titles: HashMap<MovieId, String>) -> Self {
        Self { titles }
    }

    pub fn title(&self, movie_id: MovieId) -> Option<&str> {
        self.titles.get(&movie_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    /// Titles as a map, for snapshot persistence.
    pub fn titles(&self) -> &HashMap<MovieId, String> {
        &self.titles
    }

    /// Fold snapshot titles in without overriding the CSV catalog.
    pub fn merge(&mut self, extra: HashMap<MovieId, String>) {
        for (movie_id, title) in extra {
            self.titles.entry(movie_id).or_insert(title);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_catalog_with_quoted_titles() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "movieId,title,genres").unwrap();
        writeln!(file, "1,Toy Story (1995),Animation|Children's|Comedy").unwrap();
        writeln!(file, "2,\"American President, The (1995)\",Comedy|Drama").unwrap();
        writeln!(file, "bad-row").unwrap();
        file.flush().unwrap();

        let catalog = MovieCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.title(1), Some("Toy Story (1995)"));
        assert_eq!(catalog.title(2), Some("American President, The (1995)"));
        assert_eq!(catalog.title(3), None);
    }

    #[test]
    fn test_missing_catalog_is_error() {
        assert!(MovieCatalog::load(Path::new("/nonexistent/movies.csv")).is_err());
    }

    #[test]
    fn test_merge_does_not_override() {
        let mut catalog =
            MovieCatalog::from_titles(HashMap::from([(1, "From CSV".to_string())]));
        catalog.merge(HashMap::from([
            (1, "From snapshot".to_string()),
            (2, "Snapshot only".to_string()),
        ]));

        assert_eq!(catalog.title(1), Some("From CSV"));
        assert_eq!(catalog.title(2), Some("Snapshot only"));
    }
}
