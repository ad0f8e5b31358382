mod app;
mod profile;
mod render;
mod reporter;
mod theme;

use app::App;
use chrono::{FixedOffset, Local, Offset, Utc};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use dailyzip_core::{
    CompletionService, DefinitionError, LayoutSolver, PuzzleDefinition, SchedulerConfig,
    StoreError, StreakScheduler, UserId,
};
use log::info;
use profile::{create_store, default_data_dir, gamer_tag, Environment};
use reporter::LocalReporter;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use theme::ThemeName;
use thiserror::Error;

/// Daily grid path puzzle: connect the numbers in order, once a day
#[derive(Parser, Debug)]
#[command(name = "dailyzip", version, about)]
struct Args {
    /// Directory for the profile store and the log file
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Profile to play as
    #[arg(long, default_value = "player")]
    player: String,

    /// Play without a profile; solves are not recorded
    #[arg(long)]
    guest: bool,

    /// Load a puzzle definition (text, or JSON with a .json extension)
    #[arg(long, value_name = "FILE")]
    puzzle: Option<PathBuf>,

    /// Check the puzzle for a solution, print it and exit
    #[arg(long)]
    check: bool,

    /// Color theme
    #[arg(long, value_enum, default_value_t = ThemeName::Dark)]
    theme: ThemeName,

    /// Count streak days in UTC instead of local time
    #[arg(long)]
    utc: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("cannot read puzzle {path:?}: {source}")]
    ReadPuzzle { path: PathBuf, source: io::Error },
    #[error("invalid puzzle {path:?}: {source}")]
    Definition {
        path: PathBuf,
        source: DefinitionError,
    },
    #[error("invalid puzzle {path:?}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("cannot open log file: {0}")]
    Log(io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let def = load_puzzle(args.puzzle.as_deref())?;

    if args.check {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
        check_puzzle(&def);
        return Ok(());
    }

    let data_dir = args.data_dir.clone().unwrap_or_else(default_data_dir);
    init_logging(&data_dir)?;

    let calendar_offset: FixedOffset = if args.utc {
        Utc.fix()
    } else {
        Local::now().offset().fix()
    };
    let scheduler = StreakScheduler::new(SchedulerConfig {
        calendar_offset,
        ..SchedulerConfig::default()
    });

    let env = Environment::detect();
    let store = create_store(env, &data_dir);
    info!("starting with {} store in {}", store.backend_name(), data_dir.display());
    let service = CompletionService::new(store, scheduler);

    let (user, player) = if args.guest {
        (None, "Guest".to_string())
    } else {
        let user = UserId::new(args.player);
        let profile = service.register(&user, &gamer_tag(&mut rand::thread_rng()))?;
        (Some(user), profile.username)
    };

    let reporter = LocalReporter::new(service, user);
    let backend = reporter.backend_name();
    let app = App::new(def, reporter, args.theme, player, backend);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    // Run the app
    let result = run_app(&mut stdout, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(stdout, LeaveAlternateScreen, DisableMouseCapture)?;

    result.map_err(CliError::from)
}

fn load_puzzle(path: Option<&Path>) -> Result<PuzzleDefinition, CliError> {
    let Some(path) = path else {
        return Ok(PuzzleDefinition::daily());
    };
    let text = fs::read_to_string(path).map_err(|source| CliError::ReadPuzzle {
        path: path.to_path_buf(),
        source,
    })?;

    if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&text).map_err(|source| CliError::Json {
            path: path.to_path_buf(),
            source,
        })
    } else {
        PuzzleDefinition::from_string(&text).map_err(|source| CliError::Definition {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Print the puzzle and one solution, if any
fn check_puzzle(def: &PuzzleDefinition) {
    println!("{def}");
    println!();
    match LayoutSolver::new(def).solve() {
        Some(path) => {
            let steps: Vec<String> = path.iter().map(ToString::to_string).collect();
            println!("solvable in {} steps:", path.len());
            println!("{}", steps.join(" "));
        }
        None => println!("no solution exists"),
    }
}

/// The terminal is in raw mode while playing, so logs go to a file
fn init_logging(data_dir: &Path) -> Result<(), CliError> {
    fs::create_dir_all(data_dir).map_err(CliError::Log)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(data_dir.join("dailyzip.log"))
        .map_err(CliError::Log)?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn run_app(stdout: &mut io::Stdout, mut app: App) -> io::Result<()> {
    let mut last_tick = Instant::now();

    loop {
        let tick_rate = app.get_tick_rate();

        // Render
        render::render(stdout, &mut app)?;
        stdout.flush()?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout.min(Duration::from_millis(33)))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    // Handle Ctrl+C
                    if key.modifiers.contains(KeyModifiers::CONTROL)
                        && key.code == KeyCode::Char('c')
                    {
                        break;
                    }

                    match app.handle_key(key) {
                        app::AppAction::Continue => {}
                        app::AppAction::Quit => break,
                    }
                }
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                _ => {}
            }
        }

        // Tick timers and the unlock countdown
        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }
    }

    Ok(())
}
