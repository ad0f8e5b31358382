//! Client side adapter between a [`PuzzleEngine`] and whatever delivers
//! status and completion reports.
//!
//! The session owns the engine, keeps the last known streak for display,
//! and turns every report outcome back into availability and a lock
//! message. Time is always passed in so hosts and tests agree on "now".

use crate::engine::{MoveOutcome, PuzzleEngine};
use crate::grid::{Position, PuzzleDefinition};
use crate::scheduler::STREAK_GOAL;
use crate::status::{
    banner_text, guest_message, sync_later_message, syncing_message, AvailabilityInput,
    CompletionResponse, LockRejection, StatusResponse, StreakProgress, SOLVED_HEADLINE,
};
use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, info, warn};
use thiserror::Error;

/// Why a report did not produce a response
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    /// The service refused the completion because the window is still open
    #[error("{}", .0.message)]
    Rejected(LockRejection),
    #[error("not signed in")]
    Unauthenticated,
    #[error("transport error: {0}")]
    Transport(String),
}

/// Channel to the completion service
pub trait CompletionReporter {
    /// Current unlock status for the signed-in player
    fn fetch_status(&mut self) -> Result<StatusResponse, ReportError>;

    /// Report that today's puzzle was solved
    fn report_completion(&mut self) -> Result<CompletionResponse, ReportError>;
}

/// What became of the last completion report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    /// Nothing reported for the current attempt
    #[default]
    Idle,
    Synced,
    /// Refused as a lock violation
    Rejected,
    /// Nobody signed in, the solve is not recorded
    Guest,
    /// Delivery failed; the report is kept for [`GameSession::retry_pending_sync`]
    PendingSync,
}

/// One player's view of the daily challenge
pub struct GameSession<R> {
    engine: PuzzleEngine,
    reporter: R,
    availability: AvailabilityInput,
    streak: u32,
    xp: u32,
    streak_goal: u32,
    sync_state: SyncState,
    /// When the countdown reaches zero, if locked
    unlock_at: Option<DateTime<Utc>>,
}

impl<R: CompletionReporter> GameSession<R> {
    pub fn new(def: PuzzleDefinition, reporter: R) -> Self {
        Self {
            engine: PuzzleEngine::new(def),
            reporter,
            availability: AvailabilityInput::playable(),
            streak: 0,
            xp: 0,
            streak_goal: STREAK_GOAL,
            sync_state: SyncState::Idle,
            unlock_at: None,
        }
    }

    /// Apply a status that arrived before the session existed
    pub fn with_status(mut self, status: &StatusResponse, now: DateTime<Utc>) -> Self {
        self.apply_status(status, now);
        self
    }

    pub fn engine(&self) -> &PuzzleEngine {
        &self.engine
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn reporter_mut(&mut self) -> &mut R {
        &mut self.reporter
    }

    pub fn availability(&self) -> &AvailabilityInput {
        &self.availability
    }

    pub fn can_play(&self) -> bool {
        self.availability.can_play
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn xp(&self) -> u32 {
        self.xp
    }

    pub fn streak_goal(&self) -> u32 {
        self.streak_goal
    }

    pub fn progress(&self) -> StreakProgress {
        StreakProgress::new(self.streak, self.streak_goal)
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync_state
    }

    /// Take in a status answer: streak figures for display, availability
    /// for the engine
    pub fn apply_status(&mut self, status: &StatusResponse, now: DateTime<Utc>) {
        self.streak = status.streak;
        self.xp = status.xp;
        self.apply_availability(AvailabilityInput::from(status), now);
    }

    /// Push availability into the engine and restart the countdown
    pub fn apply_availability(&mut self, input: AvailabilityInput, now: DateTime<Utc>) {
        if let Some(goal) = input.streak_goal() {
            self.streak_goal = goal;
        }
        if let Some(streak) = input.streak {
            self.streak = streak;
        }

        self.unlock_at = if input.can_play {
            None
        } else if input.unlocks_in.is_some() || input.next_unlock_at.is_none() {
            // a zero countdown still waits a moment before asking again
            Some(now + input.unlocks_in().max(TimeDelta::seconds(1)))
        } else {
            input
                .next_unlock_at
                .and_then(DateTime::<Utc>::from_timestamp_millis)
        };

        if input.can_play && self.sync_state != SyncState::PendingSync {
            self.sync_state = SyncState::Idle;
        }
        debug!(
            "availability: can_play={} unlock_at={:?}",
            input.can_play, self.unlock_at
        );
        self.engine.set_availability(&input);
        self.availability = input;
    }

    /// Forward a tap to the engine and report the solve, if it was one
    pub fn handle_input(&mut self, pos: Position, now: DateTime<Utc>) -> MoveOutcome {
        let outcome = self.engine.handle_input(pos);
        if let MoveOutcome::Solved(event) = outcome {
            info!("solved in {}", self.engine.elapsed_text());
            debug!("completion event: {event:?}");
            self.engine.lock_after_completion(syncing_message());
            self.report(now);
        }
        outcome
    }

    pub fn undo(&mut self) -> Option<Position> {
        self.engine.undo()
    }

    /// Clear the path. A guest's solved board is never locked out by the
    /// service, so it starts a fresh attempt instead.
    pub fn reset(&mut self) -> bool {
        if self.guest_solved() {
            debug!("guest starting a new attempt");
            self.sync_state = SyncState::Idle;
            self.engine.set_availability(&self.availability);
            return true;
        }
        self.engine.reset()
    }

    fn guest_solved(&self) -> bool {
        self.sync_state == SyncState::Guest && self.availability.can_play && self.engine.is_locked()
    }

    /// Time left on the lock countdown, zero when playable
    pub fn countdown_remaining(&self, now: DateTime<Utc>) -> TimeDelta {
        match self.unlock_at {
            Some(at) if !self.availability.can_play => (at - now).max(TimeDelta::zero()),
            _ => TimeDelta::zero(),
        }
    }

    /// Whether the countdown ran out and the host should ask for fresh status
    pub fn status_refresh_due(&self, now: DateTime<Utc>) -> bool {
        !self.availability.can_play && self.unlock_at.is_some_and(|at| now >= at)
    }

    /// Banner line above the board
    pub fn banner(&self, now: DateTime<Utc>) -> String {
        if self.guest_solved() {
            return "Solved as a guest. Reset the board to play again.".to_string();
        }
        banner_text(self.availability.can_play, self.countdown_remaining(now))
    }

    /// Fetch status and apply it. A failed fetch falls back to playable,
    /// unless a solve is still waiting to be delivered.
    pub fn refresh_status(&mut self, now: DateTime<Utc>) {
        if self.sync_state == SyncState::PendingSync && !self.retry_pending_sync(now) {
            return;
        }
        match self.reporter.fetch_status() {
            Ok(status) => self.apply_status(&status, now),
            Err(ReportError::Unauthenticated) => {
                debug!("no player signed in, board is open");
                self.apply_availability(AvailabilityInput::playable(), now);
            }
            Err(e) => {
                warn!("status fetch failed, assuming playable: {e}");
                self.apply_availability(AvailabilityInput::playable(), now);
            }
        }
    }

    /// Re-send a completion whose delivery failed. Returns true once nothing
    /// is pending any more.
    pub fn retry_pending_sync(&mut self, now: DateTime<Utc>) -> bool {
        if self.sync_state != SyncState::PendingSync {
            return true;
        }
        debug!("retrying pending completion report");
        self.report(now);
        self.sync_state != SyncState::PendingSync
    }

    fn report(&mut self, now: DateTime<Utc>) {
        match self.reporter.report_completion() {
            Ok(response) => {
                info!(
                    "completion synced: streak {} / {}, xp {}",
                    response.streak, response.streak_goal, response.xp
                );
                self.xp = response.xp;
                self.sync_state = SyncState::Synced;
                self.apply_availability(AvailabilityInput::from(&response), now);
            }
            Err(ReportError::Rejected(rejection)) => {
                warn!("completion rejected: {}", rejection.message);
                self.sync_state = SyncState::Rejected;
                let message = format!("{SOLVED_HEADLINE}\n{}", rejection.message);
                let input = AvailabilityInput {
                    can_play: false,
                    unlocks_in: i64::try_from(rejection.unlocks_in).ok(),
                    next_unlock_at: Some(rejection.next_unlock_at),
                    ..AvailabilityInput::locked(message)
                };
                self.apply_availability(input, now);
            }
            Err(ReportError::Unauthenticated) => {
                self.sync_state = SyncState::Guest;
                self.engine.set_lock_message(guest_message());
            }
            Err(ReportError::Transport(e)) => {
                warn!("completion report failed, will retry: {e}");
                self.sync_state = SyncState::PendingSync;
                self.engine.set_lock_message(sync_later_message());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::countdown_message;
    use std::collections::VecDeque;

    /// Replays queued answers; an empty queue behaves like a dead link
    #[derive(Default)]
    struct ScriptedReporter {
        statuses: VecDeque<Result<StatusResponse, ReportError>>,
        completions: VecDeque<Result<CompletionResponse, ReportError>>,
        reports: usize,
    }

    impl CompletionReporter for ScriptedReporter {
        fn fetch_status(&mut self) -> Result<StatusResponse, ReportError> {
            self.statuses
                .pop_front()
                .unwrap_or_else(|| Err(ReportError::Transport("offline".into())))
        }

        fn report_completion(&mut self) -> Result<CompletionResponse, ReportError> {
            self.reports += 1;
            self.completions
                .pop_front()
                .unwrap_or_else(|| Err(ReportError::Transport("offline".into())))
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_717_000_000, 0).unwrap()
    }

    fn hours_ms(h: u64) -> u64 {
        h * 3600 * 1000
    }

    fn accepted(streak: u32) -> CompletionResponse {
        CompletionResponse {
            streak,
            xp: streak * 10,
            streak_goal: 100,
            next_unlock_in: hours_ms(20),
            next_unlock_at: (now() + TimeDelta::hours(20)).timestamp_millis(),
        }
    }

    fn open_status(streak: u32) -> StatusResponse {
        StatusResponse {
            can_play: true,
            unlocks_in: 0,
            next_unlock_at: None,
            streak,
            xp: streak * 10,
            streak_goal: 100,
        }
    }

    fn solve(session: &mut GameSession<ScriptedReporter>) -> MoveOutcome {
        let path = [
            (5, 4), (4, 4), (3, 4), (2, 4), (2, 3), (3, 3), (3, 2), (4, 2),
            (4, 1), (3, 1), (2, 1), (1, 1), (1, 2), (0, 2), (0, 1), (0, 0),
            (1, 0), (2, 0), (3, 0), (4, 0), (5, 0), (6, 0), (6, 1), (6, 2),
            (6, 3), (6, 4), (6, 5), (5, 5), (4, 5), (3, 5), (2, 5), (1, 5),
        ];
        let mut last = MoveOutcome::Ignored;
        for (row, col) in path {
            last = session.handle_input(Position::new(row, col), now());
        }
        last
    }

    fn session(reporter: ScriptedReporter) -> GameSession<ScriptedReporter> {
        GameSession::new(PuzzleDefinition::daily(), reporter)
    }

    #[test]
    fn test_synced_completion_locks_with_streak_message() {
        let mut reporter = ScriptedReporter::default();
        reporter.completions.push_back(Ok(accepted(4)));
        let mut session = session(reporter).with_status(&open_status(3), now());
        assert_eq!(session.streak(), 3);

        assert!(matches!(solve(&mut session), MoveOutcome::Solved(_)));
        assert_eq!(session.sync_state(), SyncState::Synced);
        assert_eq!(session.reporter().reports, 1);
        assert_eq!(session.streak(), 4);
        assert_eq!(session.xp(), 40);
        assert!(!session.can_play());
        assert!(session.engine().is_locked());
        assert_eq!(
            session.engine().lock_message(),
            Some("Puzzle solved!\nDay 4 secured.\nNext puzzle in 20h.")
        );
        assert_eq!(session.countdown_remaining(now()), TimeDelta::hours(20));
        assert_eq!(session.banner(now()), "Next puzzle unlocks in 20:00:00");
    }

    #[test]
    fn test_rejected_completion_shows_rejection() {
        let mut reporter = ScriptedReporter::default();
        reporter
            .completions
            .push_back(Err(ReportError::Rejected(LockRejection::new(
                TimeDelta::hours(20),
                TimeDelta::hours(5),
                now() + TimeDelta::hours(5),
            ))));
        let mut session = session(reporter);

        solve(&mut session);
        assert_eq!(session.sync_state(), SyncState::Rejected);
        assert_eq!(
            session.engine().lock_message(),
            Some("Puzzle solved!\nNext challenge unlocks in 20 hours")
        );
        assert_eq!(session.countdown_remaining(now()), TimeDelta::hours(5));
        assert_eq!(session.streak(), 0);
    }

    #[test]
    fn test_guest_completion() {
        let mut reporter = ScriptedReporter::default();
        reporter
            .completions
            .push_back(Err(ReportError::Unauthenticated));
        let mut session = session(reporter);

        solve(&mut session);
        assert_eq!(session.sync_state(), SyncState::Guest);
        assert!(session.engine().is_locked());
        assert_eq!(
            session.engine().lock_message(),
            Some("Puzzle solved!\nSign in to track streaks.")
        );
        assert_eq!(
            session.banner(now()),
            "Solved as a guest. Reset the board to play again."
        );

        assert!(session.reset());
        assert!(!session.engine().is_locked());
        assert!(!session.engine().is_solved());
        assert!(session.engine().state().path().is_empty());
        assert_eq!(session.sync_state(), SyncState::Idle);
        assert!(session.banner(now()).starts_with("Puzzle ready"));
    }

    #[test]
    fn test_transport_failure_stays_locked_until_retry() {
        let mut session = session(ScriptedReporter::default());

        solve(&mut session);
        assert_eq!(session.sync_state(), SyncState::PendingSync);
        assert!(session.engine().is_locked());
        assert_eq!(
            session.engine().lock_message(),
            Some("Puzzle solved!\nProgress will sync once you reconnect.")
        );

        // still offline: the refresh must not unlock the board
        session.refresh_status(now());
        assert!(session.engine().is_locked());
        assert_eq!(session.sync_state(), SyncState::PendingSync);

        session.reporter_mut().completions.push_back(Ok(accepted(1)));
        assert!(session.retry_pending_sync(now()));
        assert_eq!(session.sync_state(), SyncState::Synced);
        assert_eq!(session.streak(), 1);
        assert_eq!(session.reporter().reports, 3);
    }

    #[test]
    fn test_countdown_runs_out_and_refresh_unlocks() {
        let mut reporter = ScriptedReporter::default();
        reporter.completions.push_back(Ok(accepted(1)));
        reporter.statuses.push_back(Ok(open_status(1)));
        let mut session = session(reporter);
        solve(&mut session);

        let later = now() + TimeDelta::hours(19);
        assert!(!session.status_refresh_due(later));
        assert_eq!(session.countdown_remaining(later), TimeDelta::hours(1));

        let unlock = now() + TimeDelta::hours(20);
        assert!(session.status_refresh_due(unlock));
        assert_eq!(session.banner(unlock), "Unlocking momentarily...");

        session.refresh_status(unlock);
        assert!(session.can_play());
        assert!(!session.engine().is_locked());
        assert!(!session.engine().is_solved());
        assert!(session.engine().state().path().is_empty());
        assert_eq!(session.sync_state(), SyncState::Idle);
        assert_eq!(session.streak(), 1);
    }

    #[test]
    fn test_failed_status_fetch_falls_back_to_playable() {
        let locked = StatusResponse {
            can_play: false,
            unlocks_in: hours_ms(2),
            next_unlock_at: Some((now() + TimeDelta::hours(2)).timestamp_millis()),
            streak: 7,
            xp: 70,
            streak_goal: 100,
        };
        let mut session = session(ScriptedReporter::default()).with_status(&locked, now());
        assert!(session.engine().is_locked());
        assert_eq!(
            session.engine().lock_message(),
            Some(countdown_message(TimeDelta::hours(2)).as_str())
        );

        session.refresh_status(now());
        assert!(session.can_play());
        assert!(!session.engine().is_locked());
        assert_eq!(session.streak(), 7);
    }

    #[test]
    fn test_zero_countdown_waits_before_repolling() {
        let mut session = session(ScriptedReporter::default());
        session.apply_availability(
            AvailabilityInput {
                can_play: false,
                unlocks_in: Some(-50),
                ..AvailabilityInput::playable()
            },
            now(),
        );
        assert!(!session.status_refresh_due(now()));
        assert!(session.status_refresh_due(now() + TimeDelta::seconds(1)));
    }

    #[test]
    fn test_streak_goal_from_status() {
        let mut session = session(ScriptedReporter::default());
        session.apply_availability(
            AvailabilityInput {
                streak_goal: Some(30),
                streak: Some(12),
                ..AvailabilityInput::playable()
            },
            now(),
        );
        assert_eq!(session.progress(), StreakProgress::new(12, 30));

        // non-positive goals are ignored
        session.apply_availability(
            AvailabilityInput {
                streak_goal: Some(0),
                ..AvailabilityInput::playable()
            },
            now(),
        );
        assert_eq!(session.streak_goal(), 30);
    }
}
