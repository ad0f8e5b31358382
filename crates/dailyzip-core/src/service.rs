//! Server side of the daily challenge: status queries and completion
//! reports, applied to a [`ProfileStore`].
//!
//! The completion transition is read, decide, then conditional write. A
//! conditional write that loses to a concurrent writer starts over from a
//! fresh read, so the loser sees the window the winner just opened and is
//! rejected as locked instead of counting twice.

use crate::scheduler::{ScheduleError, StreakScheduler};
use crate::status::{CompletionResponse, LockRejection, StatusResponse};
use crate::store::{Profile, ProfileStore, StoreError, UserId};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use thiserror::Error;

/// Conditional writes attempted before giving up
pub const MAX_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    /// The unlock window is still open
    #[error("{}", .0.message)]
    Locked(LockRejection),
    /// Every conditional write lost to a concurrent writer
    #[error("completion conflicted with concurrent updates")]
    Conflict,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Completion and status endpoints over a profile store
pub struct CompletionService<S> {
    scheduler: StreakScheduler,
    store: S,
}

impl<S: ProfileStore> CompletionService<S> {
    pub fn new(store: S, scheduler: StreakScheduler) -> Self {
        Self { scheduler, store }
    }

    pub fn scheduler(&self) -> &StreakScheduler {
        &self.scheduler
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create an empty profile; keeps an existing one untouched
    pub fn register(&self, user: &UserId, username: &str) -> Result<Profile, StoreError> {
        match self.store.load(user) {
            Ok(profile) => Ok(profile),
            Err(StoreError::NotFound(_)) => {
                let profile = Profile::new(username);
                self.store.insert(user, profile.clone())?;
                info!("registered {user} as {username} ({})", self.store.backend_name());
                Ok(profile)
            }
            Err(e) => Err(e),
        }
    }

    /// Current unlock status and streak for a user
    pub fn status(&self, user: &UserId, now: DateTime<Utc>) -> Result<StatusResponse, StoreError> {
        let profile = self.store.load(user)?;
        let status = self
            .scheduler
            .unlock_status(profile.record.last_played_at, now);
        Ok(StatusResponse::new(
            &status,
            &profile.record,
            self.scheduler.streak_goal(),
        ))
    }

    /// Apply a completed puzzle to the user's streak
    pub fn complete(
        &self,
        user: &UserId,
        now: DateTime<Utc>,
    ) -> Result<CompletionResponse, CompletionError> {
        for attempt in 1..=MAX_ATTEMPTS {
            let profile = self.store.load(user)?;
            let expected = profile.record.last_played_at;

            let completion = self
                .scheduler
                .record_completion(&profile.record, now)
                .map_err(|e| match e {
                    ScheduleError::Locked {
                        unlocks_in,
                        next_unlock_at,
                    } => {
                        debug!("completion from {user} rejected, {e}");
                        CompletionError::Locked(LockRejection::new(
                            self.scheduler.config().unlock_window,
                            unlocks_in,
                            next_unlock_at,
                        ))
                    }
                })?;

            if self.store.compare_and_swap(user, expected, completion.record)? {
                info!(
                    "{user} completed the daily puzzle: streak {}, xp {}",
                    completion.record.streak, completion.record.xp
                );
                return Ok(completion.receipt.into());
            }
            debug!("completion from {user} lost a race (attempt {attempt}), re-reading");
        }

        warn!("completion from {user} gave up after {MAX_ATTEMPTS} conflicting writes");
        Err(CompletionError::Conflict)
    }
}
