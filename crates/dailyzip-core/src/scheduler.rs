//! Unlock window and streak accounting.
//!
//! Everything here is a pure function of a user's stored [`StreakRecord`] and
//! the current time. There is no background job: the unlock status is
//! recomputed on every status query and on every completion attempt.

use chrono::{DateTime, FixedOffset, Offset, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Time after a completion before the next one is accepted
pub const UNLOCK_WINDOW: TimeDelta = TimeDelta::hours(20);
/// Streak value at which consecutive completions stop counting up
pub const STREAK_GOAL: u32 = 100;
/// XP awarded for every accepted completion
pub const XP_REWARD: u32 = 10;

/// Scheduler tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub unlock_window: TimeDelta,
    pub streak_goal: u32,
    pub xp_reward: u32,
    /// Offset used to decide where calendar days begin
    pub calendar_offset: FixedOffset,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            unlock_window: UNLOCK_WINDOW,
            streak_goal: STREAK_GOAL,
            xp_reward: XP_REWARD,
            calendar_offset: Utc.fix(),
        }
    }
}

/// Streak state kept on the user's profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakRecord {
    pub streak: u32,
    pub xp: u32,
    pub last_played_at: Option<DateTime<Utc>>,
}

/// Whether a user may play right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnlockStatus {
    pub can_play: bool,
    /// Zero once unlocked
    pub unlocks_in: TimeDelta,
    /// `None` for users who have never played
    pub next_unlock_at: Option<DateTime<Utc>>,
}

/// What a completion produced, as reported back to the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionReceipt {
    pub streak: u32,
    pub xp: u32,
    pub streak_goal: u32,
    pub next_unlock_in: TimeDelta,
    pub next_unlock_at: DateTime<Utc>,
}

/// An accepted completion: the record to store and the receipt to return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub record: StreakRecord,
    pub receipt: CompletionReceipt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("next challenge unlocks at {next_unlock_at}")]
    Locked {
        unlocks_in: TimeDelta,
        next_unlock_at: DateTime<Utc>,
    },
}

/// Gatekeeper for daily completions
#[derive(Debug, Clone, Default)]
pub struct StreakScheduler {
    config: SchedulerConfig,
}

impl StreakScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn streak_goal(&self) -> u32 {
        self.config.streak_goal
    }

    /// Decide whether a user who last played at `last_played_at` may play at `now`
    pub fn unlock_status(
        &self,
        last_played_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> UnlockStatus {
        let Some(last) = last_played_at else {
            return UnlockStatus {
                can_play: true,
                unlocks_in: TimeDelta::zero(),
                next_unlock_at: None,
            };
        };

        let next_unlock_at = last + self.config.unlock_window;
        if now >= next_unlock_at {
            UnlockStatus {
                can_play: true,
                unlocks_in: TimeDelta::zero(),
                next_unlock_at: Some(next_unlock_at),
            }
        } else {
            UnlockStatus {
                can_play: false,
                unlocks_in: next_unlock_at - now,
                next_unlock_at: Some(next_unlock_at),
            }
        }
    }

    /// Apply one completion to `record`.
    ///
    /// Rejected without any change while the unlock window is still open.
    /// Callers that persist the result must store it conditionally on the
    /// record they read, see [`crate::service::CompletionService`].
    pub fn record_completion(
        &self,
        record: &StreakRecord,
        now: DateTime<Utc>,
    ) -> Result<Completion, ScheduleError> {
        let status = self.unlock_status(record.last_played_at, now);
        if !status.can_play {
            return Err(ScheduleError::Locked {
                unlocks_in: status.unlocks_in,
                next_unlock_at: status.next_unlock_at.unwrap_or(now),
            });
        }

        let mut streak = match record.last_played_at {
            None => 1,
            Some(last) => match self.calendar_days_between(last, now) {
                1 => record.streak.saturating_add(1),
                days if days > 1 => 1,
                // Same calendar day (or a clock that went backwards): XP only
                _ => record.streak,
            },
        };
        if streak == 0 {
            streak = 1;
        }
        let streak = streak.min(self.config.streak_goal.max(1));

        let record = StreakRecord {
            streak,
            xp: record.xp.saturating_add(self.config.xp_reward),
            last_played_at: Some(now),
        };

        Ok(Completion {
            record,
            receipt: CompletionReceipt {
                streak: record.streak,
                xp: record.xp,
                streak_goal: self.config.streak_goal,
                next_unlock_in: self.config.unlock_window,
                next_unlock_at: now + self.config.unlock_window,
            },
        })
    }

    /// Midnight boundaries crossed going from `from` to `to`, in the
    /// configured calendar offset. Negative when `to` is on an earlier day.
    pub fn calendar_days_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
        let offset = self.config.calendar_offset;
        let start = from.with_timezone(&offset).date_naive();
        let end = to.with_timezone(&offset).date_naive();
        (end - start).num_days()
    }
}
