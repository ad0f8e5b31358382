//! Profile storage abstraction
//!
//! The completion service only needs three things from storage: read a
//! profile, create one, and replace a streak record conditionally on the
//! record it read. Backends:
//! - Memory: in-process map, used by tests and the `test` environment
//! - Local: JSON file, provided by the terminal client

use crate::scheduler::StreakRecord;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Stable identifier of a user
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// What a store keeps per user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    #[serde(flatten)]
    pub record: StreakRecord,
}

impl Profile {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            record: StreakRecord::default(),
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("no profile for user {0}")]
    NotFound(UserId),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Trait for profile backends
pub trait ProfileStore: Send + Sync {
    /// Read a user's profile
    fn load(&self, user: &UserId) -> StoreResult<Profile>;

    /// Create or overwrite a profile
    fn insert(&self, user: &UserId, profile: Profile) -> StoreResult<()>;

    /// Replace the user's streak record if, and only if, its
    /// `last_played_at` still equals `expected`. Returns whether the swap
    /// happened.
    fn compare_and_swap(
        &self,
        user: &UserId,
        expected: Option<DateTime<Utc>>,
        record: StreakRecord,
    ) -> StoreResult<bool>;

    /// Get backend name for display
    fn backend_name(&self) -> &'static str;
}

impl<T: ProfileStore + ?Sized> ProfileStore for Arc<T> {
    fn load(&self, user: &UserId) -> StoreResult<Profile> {
        (**self).load(user)
    }

    fn insert(&self, user: &UserId, profile: Profile) -> StoreResult<()> {
        (**self).insert(user, profile)
    }

    fn compare_and_swap(
        &self,
        user: &UserId,
        expected: Option<DateTime<Utc>>,
        record: StreakRecord,
    ) -> StoreResult<bool> {
        (**self).compare_and_swap(user, expected, record)
    }

    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }
}

// ==================== In-Memory Backend ====================

/// In-memory store for tests
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: Mutex<HashMap<UserId, Profile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.profiles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.lock().is_empty()
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load(&self, user: &UserId) -> StoreResult<Profile> {
        self.profiles
            .lock()
            .get(user)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(user.clone()))
    }

    fn insert(&self, user: &UserId, profile: Profile) -> StoreResult<()> {
        self.profiles.lock().insert(user.clone(), profile);
        Ok(())
    }

    fn compare_and_swap(
        &self,
        user: &UserId,
        expected: Option<DateTime<Utc>>,
        record: StreakRecord,
    ) -> StoreResult<bool> {
        let mut profiles = self.profiles.lock();
        let profile = profiles
            .get_mut(user)
            .ok_or_else(|| StoreError::NotFound(user.clone()))?;
        if profile.record.last_played_at != expected {
            return Ok(false);
        }
        profile.record = record;
        Ok(true)
    }

    fn backend_name(&self) -> &'static str {
        "Memory"
    }
}
