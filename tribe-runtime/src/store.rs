//! Profile store seam
//!
//! Profiles and tribes live outside the engine. The matcher resolves
//! identifiers through [`ProfileStore`]; [`MemoryStore`] is an in-process
//! implementation for tools and tests.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use tribe_core::{Profile, Tribe};

/// Errors from the profile store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Invalid dataset: {0}")]
    Dataset(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read-only access to profiles and tribes
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError>;

    async fn tribe(&self, tribe_id: &str) -> Result<Option<Tribe>, StoreError>;
}

/// Thread-safe reference to a profile store
pub type SharedStore = Arc<dyn ProfileStore>;

/// Serialised collection of profiles and tribes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub tribes: Vec<Tribe>,
}

/// In-memory profile store
#[derive(Debug, Default)]
pub struct MemoryStore {
    profiles: DashMap<String, Profile>,
    tribes: DashMap<String, Tribe>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dataset(dataset: Dataset) -> Self {
        let store = Self::new();
        for profile in dataset.profiles {
            store.insert_profile(profile);
        }
        for tribe in dataset.tribes {
            store.insert_tribe(tribe);
        }
        store
    }

    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let dataset: Dataset =
            serde_json::from_str(json).map_err(|e| StoreError::Dataset(e.to_string()))?;
        Ok(Self::from_dataset(dataset))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Insert or replace a profile
    pub fn insert_profile(&self, profile: Profile) {
        self.profiles.insert(profile.id.clone(), profile);
    }

    /// Insert or replace a tribe
    pub fn insert_tribe(&self, tribe: Tribe) {
        self.tribes.insert(tribe.id.clone(), tribe);
    }

    pub fn remove_profile(&self, user_id: &str) -> Option<Profile> {
        self.profiles.remove(user_id).map(|(_, v)| v)
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    pub fn tribe_count(&self) -> usize {
        self.tribes.len()
    }

    /// Ids of every user profile except `exclude`, sorted
    pub fn user_ids(&self, exclude: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .profiles
            .iter()
            .map(|r| r.key().clone())
            .filter(|id| id != exclude)
            .collect();
        ids.sort();
        ids
    }

    /// Ids of tribes with open capacity that `user_id` has not joined, sorted
    pub fn open_tribe_ids(&self, user_id: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .tribes
            .iter()
            .filter(|r| r.value().has_capacity() && !r.value().is_member(user_id))
            .map(|r| r.key().clone())
            .collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.profiles.get(user_id).map(|r| r.clone()))
    }

    async fn tribe(&self, tribe_id: &str) -> Result<Option<Tribe>, StoreError> {
        Ok(self.tribes.get(tribe_id).map(|r| r.clone()))
    }
}
