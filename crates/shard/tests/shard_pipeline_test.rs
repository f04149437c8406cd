//! End-to-end shard pipeline: partition CSV -> store -> kNN query.

use cinegrid_shard::{similar, ShardStore, SimilarityQuery};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_partition(rows: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "userId,movieId,rating,timestamp").unwrap();
    write!(file, "{}", rows).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_partition_to_neighbors() {
    let file = write_partition(
        "1,10,5.0,0\n\
         1,20,4.0,0\n\
         1,30,3.0,0\n\
         2,10,5.0,0\n\
         2,20,4.0,0\n\
         2,30,3.0,0\n\
         3,10,1.0,0\n\
         3,20,1.0,0\n\
         3,30,1.0,0\n\
         4,10,1.0,0\n\
         4,20,2.0,0\n\
         4,30,5.0,0\n",
    );

    let store = ShardStore::load(file.path()).unwrap();
    assert_eq!(store.len(), 4);

    let target = store.lookup(1).unwrap().clone();
    let query = SimilarityQuery {
        target_user_id: 1,
        target_ratings: target.ratings(),
        target_mean: target.mean(),
        k: 2,
        sample_size: 10,
    };

    let (records, stats) = similar(&store, &query);

    // User 2 is an exact neighbor; user 3's constant vector centers to zero
    // norm; user 4 trends the opposite way.
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].user_id, 2);
    assert!((records[0].similarity - 1.0).abs() < 1e-9);
    assert_eq!(stats.users_checked, 3);
    assert!(stats.duration_ms >= 0.0);
}

#[test]
fn test_identical_queries_identical_results() {
    let file = write_partition(
        "1,10,4.5,0\n1,20,2.0,0\n1,30,3.5,0\n\
         2,10,4.0,0\n2,20,2.5,0\n2,30,3.0,0\n\
         3,10,1.0,0\n3,20,4.5,0\n3,30,2.0,0\n\
         4,10,4.5,0\n4,20,1.5,0\n4,30,4.0,0\n\
         5,10,3.0,0\n5,20,3.0,0\n5,30,4.0,0\n",
    );

    let store = ShardStore::load(file.path()).unwrap();
    let target = store.lookup(1).unwrap().clone();

    let query = SimilarityQuery {
        target_user_id: 1,
        target_ratings: target.ratings(),
        target_mean: target.mean(),
        k: 3,
        sample_size: 2,
    };

    let (first, _) = similar(&store, &query);
    let (second, _) = similar(&store, &query);
    assert_eq!(first, second);
}
