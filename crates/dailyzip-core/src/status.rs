//! Payloads exchanged between the engine's host and the completion service,
//! plus the lock/countdown messages derived from them.
//!
//! Durations travel as milliseconds and timestamps as epoch milliseconds.

use crate::scheduler::{CompletionReceipt, StreakRecord, UnlockStatus};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Shown on a locked board when nothing more specific is known
pub const DEFAULT_LOCK_MESSAGE: &str = "Locked · come back soon";
/// First line of every post-solve message
pub const SOLVED_HEADLINE: &str = "Puzzle solved!";

/// Answer to a status query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub can_play: bool,
    pub unlocks_in: u64,
    pub next_unlock_at: Option<i64>,
    pub streak: u32,
    pub xp: u32,
    pub streak_goal: u32,
}

impl StatusResponse {
    pub fn new(status: &UnlockStatus, record: &StreakRecord, streak_goal: u32) -> Self {
        Self {
            can_play: status.can_play,
            unlocks_in: millis(status.unlocks_in),
            next_unlock_at: status.next_unlock_at.map(|t| t.timestamp_millis()),
            streak: record.streak,
            xp: record.xp,
            streak_goal,
        }
    }
}

/// Answer to an accepted completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    pub streak: u32,
    pub xp: u32,
    pub streak_goal: u32,
    pub next_unlock_in: u64,
    pub next_unlock_at: i64,
}

impl From<CompletionReceipt> for CompletionResponse {
    fn from(receipt: CompletionReceipt) -> Self {
        Self {
            streak: receipt.streak,
            xp: receipt.xp,
            streak_goal: receipt.streak_goal,
            next_unlock_in: millis(receipt.next_unlock_in),
            next_unlock_at: receipt.next_unlock_at.timestamp_millis(),
        }
    }
}

/// Answer to a completion that arrived while the user was still locked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockRejection {
    pub message: String,
    pub unlocks_in: u64,
    pub next_unlock_at: i64,
}

impl LockRejection {
    /// `window` is the full unlock window, named in the message
    pub fn new(window: TimeDelta, unlocks_in: TimeDelta, next_unlock_at: DateTime<Utc>) -> Self {
        Self {
            message: locked_rejection_message(window),
            unlocks_in: millis(unlocks_in),
            next_unlock_at: next_unlock_at.timestamp_millis(),
        }
    }
}

/// Availability pushed into the engine whenever fresh status arrives.
///
/// Every field is optional on the wire; a missing `canPlay` means playable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityInput {
    #[serde(default = "playable")]
    pub can_play: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocks_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_unlock_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streak_goal: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streak: Option<u32>,
}

fn playable() -> bool {
    true
}

impl Default for AvailabilityInput {
    fn default() -> Self {
        Self::playable()
    }
}

impl AvailabilityInput {
    /// An unlocked status with nothing else known
    pub fn playable() -> Self {
        Self {
            can_play: true,
            unlocks_in: None,
            next_unlock_at: None,
            streak_goal: None,
            lock_message: None,
            streak: None,
        }
    }

    /// A locked status carrying an explicit message
    pub fn locked(message: impl Into<String>) -> Self {
        Self {
            can_play: false,
            lock_message: Some(message.into()),
            ..Self::playable()
        }
    }

    /// Remaining lock time; missing or negative values count as zero
    pub fn unlocks_in(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.unlocks_in.unwrap_or(0).max(0))
    }

    /// Streak goal, if the sender supplied a usable one
    pub fn streak_goal(&self) -> Option<u32> {
        self.streak_goal
            .filter(|&goal| goal > 0)
            .and_then(|goal| u32::try_from(goal).ok())
    }

    /// The message a locked board should show for this status
    pub fn lock_message(&self) -> String {
        if let Some(message) = self.lock_message.as_deref().filter(|m| !m.is_empty()) {
            return message.to_string();
        }
        match self.streak.filter(|&s| s > 0) {
            Some(streak) => solved_message(Some(streak), self.unlocks_in.map(|_| self.unlocks_in())),
            None => countdown_message(self.unlocks_in()),
        }
    }
}

impl From<&StatusResponse> for AvailabilityInput {
    fn from(status: &StatusResponse) -> Self {
        Self {
            can_play: status.can_play,
            unlocks_in: Some(clamp_i64(status.unlocks_in)),
            next_unlock_at: status.next_unlock_at,
            streak_goal: Some(i64::from(status.streak_goal)),
            lock_message: None,
            streak: None,
        }
    }
}

impl From<&CompletionResponse> for AvailabilityInput {
    fn from(response: &CompletionResponse) -> Self {
        Self {
            can_play: false,
            unlocks_in: Some(clamp_i64(response.next_unlock_in)),
            next_unlock_at: Some(response.next_unlock_at),
            streak_goal: Some(i64::from(response.streak_goal)),
            lock_message: None,
            streak: Some(response.streak),
        }
    }
}

/// Progress along the streak board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakProgress {
    /// Days completed, capped at the goal
    pub completed: u32,
    pub goal: u32,
}

impl StreakProgress {
    pub fn new(streak: u32, goal: u32) -> Self {
        Self {
            completed: streak.min(goal),
            goal,
        }
    }

    /// Completed share of the goal in `0.0..=1.0`
    pub fn fraction(&self) -> f32 {
        if self.goal == 0 {
            0.0
        } else {
            self.completed as f32 / self.goal as f32
        }
    }

    /// The day the next completion will mark, if the goal is not reached yet
    pub fn next_day(&self) -> Option<u32> {
        (self.completed < self.goal).then_some(self.completed + 1)
    }

    pub fn label(&self) -> String {
        format!("{} / {} days", self.completed, self.goal)
    }
}

/// Message for a freshly solved (and locked) board
pub fn solved_message(streak: Option<u32>, unlocks_in: Option<TimeDelta>) -> String {
    let mut lines = vec![SOLVED_HEADLINE.to_string()];
    if let Some(streak) = streak.filter(|&s| s > 0) {
        lines.push(format!("Day {streak} secured."));
    }
    match unlocks_in.filter(|d| *d >= TimeDelta::zero()) {
        Some(remaining) => lines.push(format!("Next puzzle in {}.", format_countdown(remaining))),
        None => lines.push("Next puzzle unlocks in 20h.".to_string()),
    }
    lines.join("\n")
}

/// Message attached to a rejected completion, e.g. "Next challenge unlocks in 20 hours"
pub fn locked_rejection_message(window: TimeDelta) -> String {
    let whole_hours = window.num_hours();
    if whole_hours > 0 && window == TimeDelta::hours(whole_hours) {
        let unit = if whole_hours == 1 { "hour" } else { "hours" };
        format!("Next challenge unlocks in {whole_hours} {unit}")
    } else {
        format!("Next challenge unlocks in {}", format_countdown(window))
    }
}

/// Message for a board locked by the unlock window
pub fn countdown_message(unlocks_in: TimeDelta) -> String {
    if unlocks_in > TimeDelta::zero() {
        format!("Locked · Next puzzle in {}", format_countdown(unlocks_in))
    } else {
        DEFAULT_LOCK_MESSAGE.to_string()
    }
}

/// Message for a solved board whose report is still in flight
pub fn syncing_message() -> String {
    format!("{SOLVED_HEADLINE}\nSyncing streak...")
}

/// Message for a solved board whose report could not be delivered
pub fn sync_later_message() -> String {
    format!("{SOLVED_HEADLINE}\nProgress will sync once you reconnect.")
}

/// Message for a solved board with nobody signed in
pub fn guest_message() -> String {
    format!("{SOLVED_HEADLINE}\nSign in to track streaks.")
}

/// Banner text above the board
pub fn banner_text(can_play: bool, remaining: TimeDelta) -> String {
    if can_play {
        "Puzzle ready. Complete today to grow your streak.".to_string()
    } else if remaining > TimeDelta::zero() {
        format!("Next puzzle unlocks in {}", format_hms(remaining))
    } else {
        "Unlocking momentarily...".to_string()
    }
}

/// Coarse countdown: "3h 12m", "45m", "12s", or "moments"
pub fn format_countdown(remaining: TimeDelta) -> String {
    if remaining <= TimeDelta::zero() {
        return "moments".to_string();
    }
    let total_secs = ceil_secs(remaining);
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if hours == 0 && minutes == 0 {
        parts.push(format!("{seconds}s"));
    }
    parts.join(" ")
}

/// Countdown clock: "HH:MM:SS", rounded up to the next second
pub fn format_hms(remaining: TimeDelta) -> String {
    let total_secs = ceil_secs(remaining.max(TimeDelta::zero()));
    format!(
        "{:02}:{:02}:{:02}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60
    )
}

/// Elapsed play time: "MM:SS"
pub fn format_elapsed(elapsed: std::time::Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn ceil_secs(delta: TimeDelta) -> i64 {
    let ms = delta.num_milliseconds();
    (ms + 999) / 1000
}

fn millis(delta: TimeDelta) -> u64 {
    u64::try_from(delta.num_milliseconds()).unwrap_or(0)
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[test]
    fn test_status_payload_shape() {
        let last = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let status = UnlockStatus {
            can_play: false,
            unlocks_in: TimeDelta::hours(2),
            next_unlock_at: Some(last + TimeDelta::hours(20)),
        };
        let record = StreakRecord {
            streak: 3,
            xp: 30,
            last_played_at: Some(last),
        };
        let json = serde_json::to_value(StatusResponse::new(&status, &record, 100)).unwrap();
        assert_eq!(json["canPlay"], false);
        assert_eq!(json["unlocksIn"], 7_200_000);
        assert_eq!(
            json["nextUnlockAt"],
            (last + TimeDelta::hours(20)).timestamp_millis()
        );
        assert_eq!(json["streak"], 3);
        assert_eq!(json["xp"], 30);
        assert_eq!(json["streakGoal"], 100);
    }

    #[test]
    fn test_never_played_status_has_null_unlock() {
        let status = UnlockStatus {
            can_play: true,
            unlocks_in: TimeDelta::zero(),
            next_unlock_at: None,
        };
        let json =
            serde_json::to_value(StatusResponse::new(&status, &StreakRecord::default(), 100))
                .unwrap();
        assert!(json["nextUnlockAt"].is_null());
        assert_eq!(json["unlocksIn"], 0);
    }

    #[test]
    fn test_rejection_payload_shape() {
        let at = Utc.with_ymd_and_hms(2024, 3, 11, 8, 0, 0).unwrap();
        let rejection = LockRejection::new(TimeDelta::hours(20), TimeDelta::minutes(5), at);
        let json = serde_json::to_value(rejection).unwrap();
        assert_eq!(json["message"], "Next challenge unlocks in 20 hours");
        assert_eq!(json["unlocksIn"], 300_000);
        assert_eq!(json["nextUnlockAt"], at.timestamp_millis());
    }

    #[test]
    fn test_rejection_message_names_window() {
        assert_eq!(
            locked_rejection_message(TimeDelta::hours(1)),
            "Next challenge unlocks in 1 hour"
        );
        assert_eq!(
            locked_rejection_message(TimeDelta::minutes(90)),
            "Next challenge unlocks in 1h 30m"
        );
        assert_eq!(
            locked_rejection_message(TimeDelta::seconds(45)),
            "Next challenge unlocks in 45s"
        );
    }

    #[test]
    fn test_availability_normalization() {
        let input: AvailabilityInput = serde_json::from_str("{}").unwrap();
        assert!(input.can_play);
        assert_eq!(input.unlocks_in(), TimeDelta::zero());

        let input: AvailabilityInput =
            serde_json::from_str(r#"{"canPlay":false,"unlocksIn":-40,"streakGoal":0}"#).unwrap();
        assert!(!input.can_play);
        assert_eq!(input.unlocks_in(), TimeDelta::zero());
        assert_eq!(input.streak_goal(), None);

        let input: AvailabilityInput =
            serde_json::from_str(r#"{"canPlay":false,"unlocksIn":90000,"streakGoal":30}"#)
                .unwrap();
        assert_eq!(input.unlocks_in(), TimeDelta::seconds(90));
        assert_eq!(input.streak_goal(), Some(30));
    }

    #[test]
    fn test_lock_message_precedence() {
        let explicit = AvailabilityInput {
            streak: Some(4),
            ..AvailabilityInput::locked("custom")
        };
        assert_eq!(explicit.lock_message(), "custom");

        let with_streak = AvailabilityInput {
            can_play: false,
            unlocks_in: Some(3_600_000),
            streak: Some(4),
            ..AvailabilityInput::playable()
        };
        assert_eq!(
            with_streak.lock_message(),
            "Puzzle solved!\nDay 4 secured.\nNext puzzle in 1h."
        );

        let countdown = AvailabilityInput {
            can_play: false,
            unlocks_in: Some(125_000),
            ..AvailabilityInput::playable()
        };
        assert_eq!(countdown.lock_message(), "Locked · Next puzzle in 2m");

        let bare = AvailabilityInput {
            can_play: false,
            ..AvailabilityInput::playable()
        };
        assert_eq!(bare.lock_message(), DEFAULT_LOCK_MESSAGE);
    }

    #[test]
    fn test_completion_response_becomes_locked_availability() {
        let response = CompletionResponse {
            streak: 2,
            xp: 20,
            streak_goal: 100,
            next_unlock_in: 72_000_000,
            next_unlock_at: 1_700_000_000_000,
        };
        let input = AvailabilityInput::from(&response);
        assert!(!input.can_play);
        assert_eq!(input.unlocks_in(), TimeDelta::hours(20));
        assert_eq!(input.streak, Some(2));
        assert_eq!(input.streak_goal(), Some(100));
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(TimeDelta::zero()), "moments");
        assert_eq!(format_countdown(TimeDelta::milliseconds(-5)), "moments");
        assert_eq!(format_countdown(TimeDelta::milliseconds(1)), "1s");
        assert_eq!(format_countdown(TimeDelta::seconds(45)), "45s");
        assert_eq!(format_countdown(TimeDelta::minutes(12)), "12m");
        assert_eq!(
            format_countdown(TimeDelta::hours(3) + TimeDelta::minutes(12)),
            "3h 12m"
        );
        assert_eq!(format_countdown(TimeDelta::hours(20)), "20h");
    }

    #[test]
    fn test_clock_formats() {
        assert_eq!(format_hms(TimeDelta::seconds(3725)), "01:02:05");
        assert_eq!(format_hms(TimeDelta::milliseconds(500)), "00:00:01");
        assert_eq!(format_hms(TimeDelta::seconds(-3)), "00:00:00");
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00:00");
        assert_eq!(format_elapsed(Duration::from_secs(754)), "12:34");
    }

    #[test]
    fn test_banner_text() {
        assert!(banner_text(true, TimeDelta::zero()).starts_with("Puzzle ready"));
        assert_eq!(
            banner_text(false, TimeDelta::seconds(61)),
            "Next puzzle unlocks in 00:01:01"
        );
        assert_eq!(banner_text(false, TimeDelta::zero()), "Unlocking momentarily...");
    }

    #[test]
    fn test_streak_progress() {
        let progress = StreakProgress::new(130, 100);
        assert_eq!(progress.completed, 100);
        assert_eq!(progress.next_day(), None);
        assert_eq!(progress.fraction(), 1.0);

        let progress = StreakProgress::new(25, 100);
        assert_eq!(progress.next_day(), Some(26));
        assert_eq!(progress.label(), "25 / 100 days");
    }
}
