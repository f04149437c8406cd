//! Coordinator-wide user table
//!
//! The coordinator owns a full user table built by scanning every ratings
//! partition at startup, so any target user that any shard knows about can be
//! queried. The table is read-only on the query path: the target profile is
//! looked up here and travels with the fan-out request, and neighbor vectors
//! are resolved here during prediction.

use cinegrid_core::types::UserId;
use cinegrid_shard::{IngestError, ShardStore, UserProfile};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::info;

pub struct UserTable {
    profiles: HashMap<UserId, UserProfile>,
}

impl UserTable {
    /// Build the table from every partition file. Partitions hold disjoint
    /// user sets, so folding them is a plain union.
    pub fn load(partitions: &[PathBuf]) -> Result<Self, IngestError> {
        let mut profiles = HashMap::new();

        for path in partitions {
            let store = ShardStore::load(path)?;
            profiles.extend(store.into_profiles());
        }

        info!(users = profiles.len(), partitions = partitions.len(), "user table built");
        Ok(Self { profiles })
    }

    pub fn from_profiles(profiles: HashMap<UserId, UserProfile>) -> Self {
        Self { profiles }
    }

    pub fn profile(&self, user_id: UserId) -> Option<&UserProfile> {
        self.profiles.get(&user_id)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
