use crate::reporter::LocalReporter;
use crate::theme::{Theme, ThemeName};
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use dailyzip_core::{
    CompletionReporter, GameSession, MoveOutcome, Position, PuzzleDefinition, RejectReason,
    SyncState,
};
use log::debug;
use std::time::{Duration, Instant};

/// How long a rejected cell stays highlighted
pub const FLASH_DURATION: Duration = Duration::from_millis(450);

/// Terminal columns per grid cell, border included
pub const CELL_WIDTH: u16 = 4;
/// Terminal rows per grid cell, border included
pub const CELL_HEIGHT: u16 = 2;

/// Result of handling a key press
pub enum AppAction {
    Continue,
    Quit,
}

/// Current screen state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenState {
    /// Normal gameplay
    Playing,
    /// 100-day streak board
    Streak,
}

/// A cell briefly highlighted after a rejected move
#[derive(Debug, Clone, Copy)]
pub struct Flash {
    pub pos: Position,
    until: Instant,
}

/// The main application state
pub struct App<R: CompletionReporter = LocalReporter> {
    /// Puzzle, engine and sync state
    pub session: GameSession<R>,
    /// Keyboard cursor
    pub cursor: Position,
    /// Color theme
    pub theme: Theme,
    /// Display name of the player
    pub player: String,
    /// Where the profile lives, for the info panel
    pub backend: &'static str,
    /// Message to display
    pub message: Option<String>,
    /// Message timer
    message_timer: u32,
    /// Rejected-move highlight
    pub flash: Option<Flash>,
    /// Current screen state
    pub screen_state: ScreenState,
    /// Top-left corner of the grid on screen, set by the renderer
    pub grid_origin: (u16, u16),
    /// Cell under the pointer while a drag is in progress
    drag_cell: Option<Position>,
}

impl<R: CompletionReporter> App<R> {
    pub fn new(
        def: PuzzleDefinition,
        reporter: R,
        theme: ThemeName,
        player: String,
        backend: &'static str,
    ) -> Self {
        let cursor = def.waypoint_position(0).unwrap_or_default();
        let mut session = GameSession::new(def, reporter);
        session.refresh_status(Utc::now());

        Self {
            session,
            cursor,
            theme: Theme::named(theme),
            player,
            backend,
            message: None,
            message_timer: 0,
            flash: None,
            screen_state: ScreenState::Playing,
            grid_origin: (0, 0),
            drag_cell: None,
        }
    }

    pub fn get_tick_rate(&self) -> Duration {
        Duration::from_millis(100)
    }

    /// Update timers and poll status when the countdown runs out (called every tick)
    pub fn tick(&mut self) {
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 {
                self.message = None;
            }
        }

        if self.flash.is_some_and(|f| Instant::now() >= f.until) {
            self.flash = None;
        }

        let now = Utc::now();
        if self.session.status_refresh_due(now) {
            debug!("countdown finished, refreshing status");
            self.session.refresh_status(now);
            if self.session.can_play() {
                self.show_message("A new puzzle is ready");
            }
        }
    }

    /// Show a temporary message
    pub fn show_message(&mut self, msg: &str) {
        self.message = Some(msg.to_string());
        self.message_timer = 30; // ~3 seconds at 100ms poll
    }

    /// Whether `pos` is the cell currently flashing
    pub fn is_flashing(&self, pos: Position) -> bool {
        self.flash.is_some_and(|f| f.pos == pos)
    }

    /// Handle a key press
    pub fn handle_key(&mut self, key: KeyEvent) -> AppAction {
        match self.screen_state {
            ScreenState::Streak => self.handle_streak_key(key),
            ScreenState::Playing => self.handle_game_key(key),
        }
    }

    fn handle_game_key(&mut self, key: KeyEvent) -> AppAction {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return AppAction::Quit,

            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1, 0),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1, 0),
            KeyCode::Left | KeyCode::Char('h') => self.move_cursor(0, -1),
            KeyCode::Right | KeyCode::Char('l') => self.move_cursor(0, 1),

            KeyCode::Enter | KeyCode::Char(' ') => self.tap(self.cursor),

            KeyCode::Char('u') | KeyCode::Backspace => {
                if let Some(pos) = self.session.undo() {
                    let path = self.session.engine().state().path();
                    self.cursor = path.last().copied().unwrap_or(pos);
                }
            }
            KeyCode::Char('r') => {
                if self.session.reset() {
                    self.flash = None;
                    self.show_message("Path cleared");
                } else {
                    self.show_message("Board is locked");
                }
            }
            KeyCode::Char('p') => {
                self.session.refresh_status(Utc::now());
                if self.session.sync_state() == SyncState::PendingSync {
                    self.show_message("Still offline, will retry");
                } else {
                    self.show_message("Status refreshed");
                }
            }
            KeyCode::Char('s') => self.screen_state = ScreenState::Streak,
            KeyCode::Char('t') => {
                self.theme = Theme::named(self.theme.name.next());
                let msg = format!("Theme: {}", self.theme.name.label());
                self.show_message(&msg);
            }
            _ => {}
        }
        AppAction::Continue
    }

    fn handle_streak_key(&mut self, key: KeyEvent) -> AppAction {
        match key.code {
            KeyCode::Char('q') => return AppAction::Quit,
            KeyCode::Esc | KeyCode::Char('s') | KeyCode::Enter => {
                self.screen_state = ScreenState::Playing;
            }
            _ => {}
        }
        AppAction::Continue
    }

    /// Pointer input: pressing starts a drag and taps, moving taps each new
    /// cell while the button is held, releasing ends the drag
    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.screen_state != ScreenState::Playing {
            return;
        }
        let cell = self.cell_at(mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.drag_cell = cell;
                if let Some(pos) = cell {
                    self.tap(pos);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                let Some(pos) = cell else {
                    return;
                };
                if self.drag_cell.is_some() && self.drag_cell != Some(pos) {
                    self.drag_cell = Some(pos);
                    self.tap(pos);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => self.drag_cell = None,
            _ => {}
        }
    }

    /// Map a terminal coordinate to the grid cell drawn there
    pub fn cell_at(&self, column: u16, row: u16) -> Option<Position> {
        let def = self.session.engine().definition();
        let (x, y) = self.grid_origin;
        let dx = column.checked_sub(x)?;
        let dy = row.checked_sub(y)?;
        let pos = Position::new((dy / CELL_HEIGHT) as usize, (dx / CELL_WIDTH) as usize);
        def.contains(pos).then_some(pos)
    }

    fn tap(&mut self, pos: Position) {
        self.cursor = pos;
        match self.session.handle_input(pos, Utc::now()) {
            MoveOutcome::Rejected { pos, reason } => {
                self.flash = Some(Flash {
                    pos,
                    until: Instant::now() + FLASH_DURATION,
                });
                match reason {
                    RejectReason::WrongStart => {
                        let first = self.session.engine().expected_waypoint().unwrap_or(1);
                        let msg = format!("Start on {first}");
                        self.show_message(&msg);
                    }
                    RejectReason::WrongWaypoint => {
                        if let Some(next) = self.session.engine().expected_waypoint() {
                            let msg = format!("Next up: {next}");
                            self.show_message(&msg);
                        }
                    }
                    RejectReason::NotAdjacent | RejectReason::AlreadyVisited => {}
                }
            }
            MoveOutcome::Solved(_) => {
                self.drag_cell = None;
                let msg = format!("Solved in {}", self.session.engine().elapsed_text());
                self.show_message(&msg);
            }
            MoveOutcome::Ignored | MoveOutcome::Committed { .. } | MoveOutcome::Undone { .. } => {}
        }
    }

    fn move_cursor(&mut self, row_delta: isize, col_delta: isize) {
        if let Some(pos) = self
            .session
            .engine()
            .definition()
            .step(self.cursor, (row_delta, col_delta))
        {
            self.cursor = pos;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use dailyzip_core::{CompletionResponse, ReportError, StatusResponse};

    /// Plays as a guest with no status source
    struct OfflineReporter;

    impl CompletionReporter for OfflineReporter {
        fn fetch_status(&mut self) -> Result<StatusResponse, ReportError> {
            Err(ReportError::Unauthenticated)
        }

        fn report_completion(&mut self) -> Result<CompletionResponse, ReportError> {
            Err(ReportError::Unauthenticated)
        }
    }

    fn app() -> App<OfflineReporter> {
        App::new(
            PuzzleDefinition::daily(),
            OfflineReporter,
            ThemeName::Dark,
            "Guest".to_string(),
            "Memory",
        )
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    /// Terminal coordinate of the middle of a cell
    fn screen(app: &App<OfflineReporter>, row: usize, col: usize) -> (u16, u16) {
        let (x, y) = app.grid_origin;
        (x + col as u16 * CELL_WIDTH + 2, y + row as u16 * CELL_HEIGHT + 1)
    }

    #[test]
    fn test_cursor_starts_on_first_waypoint() {
        let app = app();
        assert_eq!(app.cursor, Position::new(5, 4));
        assert!(app.session.can_play());
    }

    #[test]
    fn test_keyboard_path() {
        let mut app = app();
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Char('k')));
        app.handle_key(key(KeyCode::Char(' ')));
        assert_eq!(
            app.session.engine().state().path(),
            &[Position::new(5, 4), Position::new(4, 4)]
        );

        app.handle_key(key(KeyCode::Char('u')));
        assert_eq!(app.session.engine().state().path(), &[Position::new(5, 4)]);
        assert_eq!(app.cursor, Position::new(5, 4));
    }

    #[test]
    fn test_cursor_stays_on_grid() {
        let mut app = app();
        for _ in 0..10 {
            app.handle_key(key(KeyCode::Down));
            app.handle_key(key(KeyCode::Right));
        }
        assert_eq!(app.cursor, Position::new(6, 6));
    }

    #[test]
    fn test_rejected_tap_flashes() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('h')));
        app.handle_key(key(KeyCode::Enter));
        assert!(app.is_flashing(Position::new(5, 3)));
        assert_eq!(app.message.as_deref(), Some("Start on 1"));
        assert!(app.session.engine().state().path().is_empty());
    }

    #[test]
    fn test_cell_at_maps_terminal_coordinates() {
        let mut app = app();
        app.grid_origin = (10, 3);
        assert_eq!(app.cell_at(10, 3), Some(Position::new(0, 0)));
        assert_eq!(app.cell_at(13, 4), Some(Position::new(0, 0)));
        assert_eq!(app.cell_at(14, 5), Some(Position::new(1, 1)));
        assert_eq!(app.cell_at(9, 3), None);
        assert_eq!(app.cell_at(10 + 7 * CELL_WIDTH, 3), None);
        assert_eq!(app.cell_at(10, 3 + 7 * CELL_HEIGHT), None);
    }

    #[test]
    fn test_drag_draws_and_backtracks() {
        let mut app = app();
        app.grid_origin = (2, 2);
        let (x, y) = screen(&app, 5, 4);
        app.handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), x, y));
        for (row, col) in [(4, 4), (4, 4), (3, 4), (4, 4)] {
            let (x, y) = screen(&app, row, col);
            app.handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), x, y));
        }
        assert_eq!(
            app.session.engine().state().path(),
            &[Position::new(5, 4), Position::new(4, 4)]
        );

        app.handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), x, y));
        let (x, y) = screen(&app, 3, 4);
        app.handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), x, y));
        assert_eq!(app.session.engine().state().path().len(), 2);
    }

    #[test]
    fn test_streak_screen_toggle() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('s')));
        assert_eq!(app.screen_state, ScreenState::Streak);
        app.handle_key(key(KeyCode::Char('s')));
        assert_eq!(app.screen_state, ScreenState::Playing);
    }

    #[test]
    fn test_theme_cycles() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('t')));
        assert_eq!(app.theme.name, ThemeName::Light);
        app.handle_key(key(KeyCode::Char('t')));
        app.handle_key(key(KeyCode::Char('t')));
        assert_eq!(app.theme.name, ThemeName::Dark);
    }
}
