//! Daily challenge engine
//!
//! A once-a-day grid path puzzle: draw one continuous path through the grid
//! that touches every numbered waypoint in order. This crate holds the puzzle
//! itself (definition, solvability search, interactive state machine) and the
//! streak scheduler that decides when a player may play again.

mod engine;
mod grid;
mod scheduler;
mod service;
mod session;
mod solver;
mod status;
mod store;

pub use engine::{CompletionEvent, MoveOutcome, PathState, PuzzleEngine, RejectReason, Timer};
pub use grid::{DefinitionError, Position, PuzzleDefinition, DIRECTIONS};
pub use scheduler::{
    Completion, CompletionReceipt, ScheduleError, SchedulerConfig, StreakRecord, StreakScheduler,
    UnlockStatus, STREAK_GOAL, UNLOCK_WINDOW, XP_REWARD,
};
pub use service::{CompletionError, CompletionService, MAX_ATTEMPTS};
pub use session::{CompletionReporter, GameSession, ReportError, SyncState};
pub use solver::{validate_layout, LayoutSolver};
pub use status::{
    banner_text, countdown_message, format_countdown, format_elapsed, format_hms, guest_message,
    locked_rejection_message, solved_message, sync_later_message, syncing_message,
    AvailabilityInput, CompletionResponse, LockRejection, StatusResponse, StreakProgress,
    DEFAULT_LOCK_MESSAGE, SOLVED_HEADLINE,
};
pub use store::{MemoryProfileStore, Profile, ProfileStore, StoreError, StoreResult, UserId};
