use crate::app::{App, ScreenState, CELL_HEIGHT, CELL_WIDTH};
use chrono::Utc;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute,
    style::{Color, Print, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use dailyzip_core::{CompletionReporter, Position, SyncState};
use std::collections::HashSet;
use std::io;

/// Width of the info panel next to the grid
const PANEL_WIDTH: u16 = 24;
/// Days per row on the streak board
const BOARD_COLUMNS: u32 = 10;

pub fn render<R: CompletionReporter>(stdout: &mut io::Stdout, app: &mut App<R>) -> io::Result<()> {
    let (term_width, term_height) = terminal::size()?;

    execute!(stdout, Hide)?;
    execute!(stdout, SetBackgroundColor(app.theme.bg), Clear(ClearType::All))?;

    match app.screen_state {
        ScreenState::Playing => render_game_screen(stdout, app, term_width, term_height)?,
        ScreenState::Streak => render_streak_screen(stdout, app, term_width, term_height)?,
    }

    if let Some(ref msg) = app.message {
        render_message(stdout, app, msg, term_width)?;
    }

    execute!(stdout, Show)?;
    Ok(())
}

fn render_game_screen<R: CompletionReporter>(
    stdout: &mut io::Stdout,
    app: &mut App<R>,
    term_width: u16,
    term_height: u16,
) -> io::Result<()> {
    let def = app.session.engine().definition();
    let grid_width = def.cols() as u16 * CELL_WIDTH + 1;
    let grid_height = def.rows() as u16 * CELL_HEIGHT + 1;

    // Center the grid horizontally, leave room for info panel
    let total_width = grid_width + 3 + PANEL_WIDTH;
    let start_x = if term_width > total_width {
        (term_width - total_width) / 2
    } else {
        1
    };
    let start_y = if term_height > grid_height + 10 { 3 } else { 2 };
    app.grid_origin = (start_x, start_y);

    render_banner(stdout, app, start_x, start_y - 2)?;
    render_grid(stdout, app, start_x, start_y)?;
    render_lock_overlay(stdout, app, start_x, start_y, grid_width, grid_height)?;
    render_info_panel(stdout, app, start_x + grid_width + 3, start_y)?;
    render_controls(stdout, app, start_x, start_y + grid_height + 1)?;

    Ok(())
}

fn render_banner<R: CompletionReporter>(
    stdout: &mut io::Stdout,
    app: &App<R>,
    x: u16,
    y: u16,
) -> io::Result<()> {
    let theme = &app.theme;
    let color = if app.session.can_play() {
        theme.success
    } else {
        theme.locked
    };
    execute!(
        stdout,
        MoveTo(x, y),
        SetBackgroundColor(theme.bg),
        SetForegroundColor(color),
        Print(app.session.banner(Utc::now()))
    )
}

/// Unordered pairs of consecutive path cells
fn path_edges(path: &[Position]) -> HashSet<(Position, Position)> {
    path.windows(2)
        .map(|w| (w[0].min(w[1]), w[0].max(w[1])))
        .collect()
}

fn render_grid<R: CompletionReporter>(
    stdout: &mut io::Stdout,
    app: &App<R>,
    x: u16,
    y: u16,
) -> io::Result<()> {
    let theme = &app.theme;
    let engine = app.session.engine();
    let def = engine.definition();
    let edges = path_edges(engine.state().path());
    let linked = |a: Position, b: Position| edges.contains(&(a.min(b), a.max(b)));

    // Grid design:
    // +---+---+---+
    // | 1 ━ • |   |
    // +-┃-+---+---+
    // Each cell is 3 chars, borders between cells carry the path links

    execute!(stdout, SetBackgroundColor(theme.bg))?;

    for row in 0..=def.rows() {
        let border_y = y + row as u16 * CELL_HEIGHT;
        execute!(stdout, MoveTo(x, border_y), SetForegroundColor(theme.border), Print("+"))?;
        for col in 0..def.cols() {
            let below = Position::new(row, col);
            let vertical = row > 0 && row < def.rows() && linked(Position::new(row - 1, col), below);
            if vertical {
                execute!(
                    stdout,
                    SetForegroundColor(theme.border),
                    Print("-"),
                    SetForegroundColor(theme.path),
                    Print("┃"),
                    SetForegroundColor(theme.border),
                    Print("-+")
                )?;
            } else {
                execute!(stdout, SetForegroundColor(theme.border), Print("---+"))?;
            }
        }

        if row == def.rows() {
            break;
        }

        let cell_y = border_y + 1;
        execute!(stdout, MoveTo(x, cell_y))?;
        for col in 0..def.cols() {
            let pos = Position::new(row, col);
            let horizontal = col > 0 && linked(Position::new(row, col - 1), pos);
            if horizontal {
                execute!(stdout, SetBackgroundColor(theme.path_bg), SetForegroundColor(theme.path), Print("━"))?;
            } else {
                execute!(stdout, SetBackgroundColor(theme.bg), SetForegroundColor(theme.border), Print("|"))?;
            }
            render_cell(stdout, app, pos)?;
        }
        execute!(stdout, SetBackgroundColor(theme.bg), SetForegroundColor(theme.border), Print("|"))?;
    }

    Ok(())
}

fn render_cell<R: CompletionReporter>(
    stdout: &mut io::Stdout,
    app: &App<R>,
    pos: Position,
) -> io::Result<()> {
    let theme = &app.theme;
    let engine = app.session.engine();
    let value = engine.definition().value(pos);
    let visited = engine.is_visited(pos);
    let is_end = engine.state().path().last() == Some(&pos);

    let bg = if app.is_flashing(pos) {
        theme.flash_bg
    } else if pos == app.cursor && !engine.is_locked() {
        theme.cursor_bg
    } else if visited {
        theme.path_bg
    } else {
        theme.bg
    };

    let (fg, text) = match value {
        0 if is_end => (theme.path, " ● ".to_string()),
        0 if visited => (theme.path, " • ".to_string()),
        0 => (Color::DarkGrey, " · ".to_string()),
        v if visited => (theme.path, format!("{v:^3}")),
        v if engine.expected_waypoint() == Some(v) => (theme.key, format!("{v:^3}")),
        v => (theme.waypoint, format!("{v:^3}")),
    };

    execute!(stdout, SetBackgroundColor(bg), SetForegroundColor(fg), Print(text))
}

fn render_lock_overlay<R: CompletionReporter>(
    stdout: &mut io::Stdout,
    app: &App<R>,
    x: u16,
    y: u16,
    grid_width: u16,
    grid_height: u16,
) -> io::Result<()> {
    let Some(message) = app.session.engine().lock_message() else {
        return Ok(());
    };
    let theme = &app.theme;

    let lines: Vec<&str> = message.lines().collect();
    let inner = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u16 + 2;
    let width = inner + 2;
    let height = lines.len() as u16 + 2;
    let ox = x + grid_width.saturating_sub(width) / 2;
    let oy = y + grid_height.saturating_sub(height) / 2;

    let horizontal = "─".repeat(inner as usize);
    execute!(
        stdout,
        SetBackgroundColor(theme.bg),
        SetForegroundColor(theme.locked),
        MoveTo(ox, oy),
        Print(format!("┌{horizontal}┐"))
    )?;
    for (i, line) in lines.iter().enumerate() {
        let pad = inner as usize - line.chars().count();
        let left = pad / 2;
        execute!(
            stdout,
            MoveTo(ox, oy + 1 + i as u16),
            Print(format!("│{}{line}{}│", " ".repeat(left), " ".repeat(pad - left)))
        )?;
    }
    execute!(
        stdout,
        MoveTo(ox, oy + height - 1),
        Print(format!("└{horizontal}┘"))
    )
}

fn sync_label(state: SyncState) -> &'static str {
    match state {
        SyncState::Idle => "-",
        SyncState::Synced => "Synced",
        SyncState::Rejected => "Rejected",
        SyncState::Guest => "Guest",
        SyncState::PendingSync => "Pending",
    }
}

fn render_info_panel<R: CompletionReporter>(
    stdout: &mut io::Stdout,
    app: &App<R>,
    x: u16,
    y: u16,
) -> io::Result<()> {
    let theme = &app.theme;
    let session = &app.session;
    let engine = session.engine();

    execute!(stdout, SetBackgroundColor(theme.bg))?;

    // Title
    execute!(
        stdout,
        MoveTo(x, y),
        SetForegroundColor(theme.key),
        Print("═══ DAILY ZIP ═══")
    )?;

    let next = match engine.expected_waypoint() {
        Some(v) => v.to_string(),
        None => "done".to_string(),
    };
    let rows = [
        ("Player", app.player.clone()),
        ("Time", engine.elapsed_text()),
        ("Next", next),
        ("Streak", format!("{} / {}", session.streak(), session.streak_goal())),
        ("XP", session.xp().to_string()),
        ("Sync", sync_label(session.sync_state()).to_string()),
        ("Store", app.backend.to_string()),
    ];
    for (i, (label, value)) in rows.iter().enumerate() {
        execute!(
            stdout,
            MoveTo(x, y + 2 + i as u16 * 2),
            SetForegroundColor(theme.info),
            Print(format!("{label}:")),
            SetForegroundColor(theme.fg),
            Print(format!(" {value:>width$}", width = 16 - label.len()))
        )?;
    }

    if !engine.is_solvable() {
        execute!(
            stdout,
            MoveTo(x, y + 2 + rows.len() as u16 * 2),
            SetForegroundColor(theme.flash_bg),
            Print("No solution exists!")
        )?;
    }

    Ok(())
}

fn render_controls<R: CompletionReporter>(
    stdout: &mut io::Stdout,
    app: &App<R>,
    x: u16,
    y: u16,
) -> io::Result<()> {
    let theme = &app.theme;

    execute!(stdout, SetBackgroundColor(theme.bg))?;

    let controls = [
        ("hjkl/Arrows", "Move"),
        ("Space/Enter", "Draw"),
        ("Mouse", "Drag path"),
        ("u", "Undo"),
        ("r", "Reset"),
        ("s", "Streak"),
        ("p", "Refresh"),
        ("t", "Theme"),
        ("q", "Quit"),
    ];

    // Display in 3 columns (3 items each)
    for (i, (key, desc)) in controls.iter().enumerate() {
        let col = i / 3;
        let row = i % 3;
        let cx = x + (col as u16) * 22;
        let cy = y + row as u16;

        execute!(
            stdout,
            MoveTo(cx, cy),
            SetForegroundColor(theme.key),
            Print(format!("{:>11}", key)),
            SetForegroundColor(theme.info),
            Print(format!(" {}", desc))
        )?;
    }

    Ok(())
}

fn render_streak_screen<R: CompletionReporter>(
    stdout: &mut io::Stdout,
    app: &App<R>,
    term_width: u16,
    term_height: u16,
) -> io::Result<()> {
    let theme = &app.theme;
    let progress = app.session.progress();
    let board_width = BOARD_COLUMNS as u16 * 3;
    let x = term_width.saturating_sub(board_width) / 2;
    let rows = progress.goal.div_ceil(BOARD_COLUMNS) as u16;
    let y = term_height.saturating_sub(rows + 8) / 2;

    execute!(
        stdout,
        SetBackgroundColor(theme.bg),
        MoveTo(x, y),
        SetForegroundColor(theme.key),
        Print(format!("{}-DAY STREAK", progress.goal))
    )?;

    for day in 1..=progress.goal {
        let idx = day - 1;
        let cx = x + (idx % BOARD_COLUMNS) as u16 * 3;
        let cy = y + 2 + (idx / BOARD_COLUMNS) as u16;
        let (color, mark) = if day <= progress.completed {
            (theme.success, "■")
        } else if progress.next_day() == Some(day) {
            (theme.key, "□")
        } else {
            (theme.border, "·")
        };
        execute!(stdout, MoveTo(cx, cy), SetForegroundColor(color), Print(mark))?;
    }

    let bar_y = y + 3 + rows;
    let filled = (progress.fraction() * board_width as f32).round() as usize;
    execute!(
        stdout,
        MoveTo(x, bar_y),
        SetForegroundColor(theme.success),
        Print("█".repeat(filled)),
        SetForegroundColor(theme.border),
        Print("░".repeat(board_width as usize - filled)),
        MoveTo(x, bar_y + 1),
        SetForegroundColor(theme.fg),
        Print(progress.label()),
        MoveTo(x, bar_y + 2),
        SetForegroundColor(theme.info),
        Print(format!("XP: {}", app.session.xp())),
        MoveTo(x, bar_y + 4),
        SetForegroundColor(theme.key),
        Print("s/Esc"),
        SetForegroundColor(theme.info),
        Print(" Back")
    )
}

fn render_message<R: CompletionReporter>(
    stdout: &mut io::Stdout,
    app: &App<R>,
    msg: &str,
    term_width: u16,
) -> io::Result<()> {
    let theme = &app.theme;
    let padded = format!("  {}  ", msg);
    let x = term_width.saturating_sub(padded.chars().count() as u16) / 2;

    execute!(
        stdout,
        MoveTo(x, 0),
        SetForegroundColor(theme.fg),
        SetBackgroundColor(theme.cursor_bg),
        Print(&padded)
    )?;

    Ok(())
}
