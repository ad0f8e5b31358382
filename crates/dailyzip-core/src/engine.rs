//! Interactive path building.
//!
//! A [`PuzzleEngine`] owns one puzzle definition and the player's current
//! attempt. The host feeds it discrete coordinate taps through
//! [`PuzzleEngine::handle_input`]; translating mouse, touch or keyboard
//! events into taps is the host's job.

use crate::grid::{Position, PuzzleDefinition};
use crate::solver::validate_layout;
use crate::status::{format_elapsed, AvailabilityInput};
use log::{debug, warn};
use std::time::{Duration, Instant};

/// Elapsed-time display state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timer {
    /// Nothing drawn yet, display reads 00:00
    #[default]
    Idle,
    Running(Instant),
    /// Frozen at the solve time
    Stopped(Duration),
}

impl Timer {
    pub fn elapsed(&self) -> Duration {
        match self {
            Timer::Idle => Duration::ZERO,
            Timer::Running(start) => start.elapsed(),
            Timer::Stopped(elapsed) => *elapsed,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Timer::Running(_))
    }
}

/// One attempt at the puzzle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathState {
    path: Vec<Position>,
    visited: Vec<bool>,
    next_waypoint: usize,
    locked: bool,
    solved: bool,
    timer: Timer,
}

impl PathState {
    fn new(cell_count: usize, locked: bool) -> Self {
        Self {
            path: Vec::new(),
            visited: vec![false; cell_count],
            next_waypoint: 0,
            locked,
            solved: false,
            timer: Timer::Idle,
        }
    }

    /// Visited cells in visiting order
    pub fn path(&self) -> &[Position] {
        &self.path
    }

    /// Index into the order of the waypoint the path must reach next
    pub fn next_waypoint(&self) -> usize {
        self.next_waypoint
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }

    pub fn timer(&self) -> Timer {
        self.timer
    }
}

/// Why a tap was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The first step must be on the first waypoint
    WrongStart,
    /// Not edge-adjacent to the end of the path
    NotAdjacent,
    AlreadyVisited,
    /// A waypoint other than the one expected next
    WrongWaypoint,
}

/// Emitted exactly once per attempt, when the last waypoint is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionEvent {
    pub elapsed: Duration,
}

/// Result of a single tap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Solved, locked or off the grid: nothing happened
    Ignored,
    /// The tap was refused; the host should flash the cell
    Rejected { pos: Position, reason: RejectReason },
    /// The cell was appended to the path
    Committed { pos: Position, waypoint: bool },
    /// The last step was taken back
    Undone { pos: Position },
    Solved(CompletionEvent),
}

/// Puzzle engine for a single player's attempt
#[derive(Debug, Clone)]
pub struct PuzzleEngine {
    def: PuzzleDefinition,
    state: PathState,
    lock_message: Option<String>,
    solvable: bool,
}

impl PuzzleEngine {
    /// Load a definition, checking once that it can be solved at all.
    /// An unsolvable definition is logged and still loaded.
    pub fn new(def: PuzzleDefinition) -> Self {
        let solvable = validate_layout(&def);
        if !solvable {
            warn!("puzzle definition is currently unsolvable:\n{def}");
        }
        let state = PathState::new(def.cell_count(), false);
        Self {
            def,
            state,
            lock_message: None,
            solvable,
        }
    }

    pub fn definition(&self) -> &PuzzleDefinition {
        &self.def
    }

    pub fn state(&self) -> &PathState {
        &self.state
    }

    pub fn is_solvable(&self) -> bool {
        self.solvable
    }

    pub fn is_solved(&self) -> bool {
        self.state.solved
    }

    pub fn is_locked(&self) -> bool {
        self.state.locked
    }

    /// Message to draw over a locked board
    pub fn lock_message(&self) -> Option<&str> {
        if self.state.locked {
            self.lock_message.as_deref()
        } else {
            None
        }
    }

    pub fn is_visited(&self, pos: Position) -> bool {
        self.def
            .index(pos)
            .is_some_and(|idx| self.state.visited[idx])
    }

    /// The waypoint value the path must reach next, if any remain
    pub fn expected_waypoint(&self) -> Option<u8> {
        self.def.order().get(self.state.next_waypoint).copied()
    }

    pub fn elapsed(&self) -> Duration {
        self.state.timer.elapsed()
    }

    /// Elapsed time as "MM:SS"
    pub fn elapsed_text(&self) -> String {
        format_elapsed(self.elapsed())
    }

    /// Single entry point for host input
    pub fn handle_input(&mut self, pos: Position) -> MoveOutcome {
        self.attempt_move(pos)
    }

    /// Validate and apply one tap
    pub fn attempt_move(&mut self, pos: Position) -> MoveOutcome {
        if self.state.solved || self.state.locked {
            return MoveOutcome::Ignored;
        }
        let Some(idx) = self.def.index(pos) else {
            return MoveOutcome::Ignored;
        };
        let value = self.def.value(pos);

        let len = self.state.path.len();
        if len > 1 && self.state.path[len - 2] == pos {
            return match self.undo() {
                Some(undone) => MoveOutcome::Undone { pos: undone },
                None => MoveOutcome::Ignored,
            };
        }

        let Some(&last) = self.state.path.last() else {
            if Some(value) != self.expected_waypoint() {
                return MoveOutcome::Rejected {
                    pos,
                    reason: RejectReason::WrongStart,
                };
            }
            self.state.timer = Timer::Running(Instant::now());
            return self.commit_waypoint(pos, idx);
        };

        if !last.is_adjacent(pos) {
            return MoveOutcome::Rejected {
                pos,
                reason: RejectReason::NotAdjacent,
            };
        }
        if self.state.visited[idx] {
            return MoveOutcome::Rejected {
                pos,
                reason: RejectReason::AlreadyVisited,
            };
        }

        if value > 0 {
            if Some(value) != self.expected_waypoint() {
                return MoveOutcome::Rejected {
                    pos,
                    reason: RejectReason::WrongWaypoint,
                };
            }
            return self.commit_waypoint(pos, idx);
        }

        self.commit(pos, idx);
        MoveOutcome::Committed {
            pos,
            waypoint: false,
        }
    }

    /// Take back the last step; returns the cell that was removed
    pub fn undo(&mut self) -> Option<Position> {
        if self.state.solved || self.state.locked {
            return None;
        }
        let last = self.state.path.pop()?;
        if let Some(idx) = self.def.index(last) {
            self.state.visited[idx] = false;
        }
        if self.def.is_waypoint(last) && self.state.next_waypoint > 0 {
            self.state.next_waypoint -= 1;
        }
        if self.state.path.is_empty() {
            self.state.timer = Timer::Idle;
        }
        Some(last)
    }

    /// Start a fresh attempt. Refused while locked.
    pub fn reset(&mut self) -> bool {
        if self.state.locked {
            return false;
        }
        self.state = PathState::new(self.def.cell_count(), false);
        true
    }

    /// Apply an availability status.
    ///
    /// Unlocking a locked board always starts a fresh attempt; locking freezes
    /// the board whether or not the current attempt was solved.
    pub fn set_availability(&mut self, status: &AvailabilityInput) {
        let was_locked = self.state.locked;
        if !status.can_play {
            self.lock(status.lock_message());
            return;
        }

        self.lock_message = None;
        if was_locked {
            debug!("board unlocked, starting a new attempt");
            self.state = PathState::new(self.def.cell_count(), false);
        }
    }

    /// Lock straight after a solve, before the completion report returns
    pub fn lock_after_completion(&mut self, message: impl Into<String>) {
        self.state.locked = true;
        self.lock_message = Some(message.into());
    }

    /// Replace the lock message without changing the lock state
    pub fn set_lock_message(&mut self, message: impl Into<String>) {
        self.lock_message = Some(message.into());
    }

    fn lock(&mut self, message: String) {
        debug!("board locked: {}", message.replace('\n', " / "));
        self.state.locked = true;
        if !self.state.solved {
            self.state.timer = Timer::Idle;
        }
        self.lock_message = Some(message);
    }

    fn commit(&mut self, pos: Position, idx: usize) {
        self.state.path.push(pos);
        self.state.visited[idx] = true;
    }

    fn commit_waypoint(&mut self, pos: Position, idx: usize) -> MoveOutcome {
        self.commit(pos, idx);
        self.state.next_waypoint += 1;
        match self.check_completion() {
            Some(event) => MoveOutcome::Solved(event),
            None => MoveOutcome::Committed {
                pos,
                waypoint: true,
            },
        }
    }

    fn check_completion(&mut self) -> Option<CompletionEvent> {
        if self.state.next_waypoint != self.def.order().len() {
            return None;
        }
        let elapsed = self.state.timer.elapsed();
        self.state.solved = true;
        self.state.timer = Timer::Stopped(elapsed);
        debug!("puzzle solved in {}", format_elapsed(elapsed));
        Some(CompletionEvent { elapsed })
    }
}
