use anyhow::{Context, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{fs::OpenOptions, io, path::Path, sync::Mutex};
use todo_reminder::{
    config::{Config, CONFIG_FILE},
    reminder::ReminderClock,
    task_store::TaskStore,
    ui::{run_app, shutdown, App},
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let config = Config::load(Path::new(CONFIG_FILE))?;
    init_logging(&config)?;
    tracing::info!(tasks_file = %config.tasks_file.display(), "todo-reminder starting");

    let store = TaskStore::open(&config.tasks_file).context("load tasks")?;
    let clock = ReminderClock::new(
        config.startup_delay(),
        config.check_interval(),
        config.dedupe_reminders,
    );
    let mut app = App::new(store, clock);

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    // Save tasks, then restore terminal
    let saved = shutdown(&mut app, || {
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()
    });
    if let Err(err) = saved {
        eprintln!("{}", err.hint());
    }

    if let Err(err) = result {
        tracing::error!(error = %err, "terminal loop failed");
        eprintln!("{:?}", err);
    }
    tracing::info!("todo-reminder shut down");
    Ok(())
}

/// The terminal owns stdout, so logs go to a file.
fn init_logging(config: &Config) -> Result<()> {
    let Some(path) = &config.log_file else {
        return Ok(());
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();
    Ok(())
}
