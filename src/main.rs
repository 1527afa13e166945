use std::process;

use clap::Parser;
use console::style;
use log::{debug, info};

use notepro::{App, Cli, Config, FileStore, NoteError, NotesStore, ReminderBook, Result};

pub fn initialize_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .format_module_path(true)
        .init();

    debug!("Logger initialized");
}

fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => Some(path),
        None => Config::default_path(),
    };
    let mut config = match &config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    let surface = FileStore::open(config.data_dir.clone())?;
    info!("Using data directory {}", surface.dir().display());

    let notes = NotesStore::open_with_key(surface.clone(), &config.notes_key);
    let reminders = ReminderBook::open_with_key(surface, &config.reminders_key);

    let mut app = App::new(notes, reminders, config, config_path, cli.verbose);
    app.report_startup()?;
    app.run(cli.command)
}

fn main() {
    let cli = Cli::parse();
    initialize_logger(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {}", style("error:").red().bold(), e);
        let code = match e {
            NoteError::NoteNotFound { .. } | NoteError::FileNotFound { .. } => 2,
            _ => 1,
        };
        process::exit(code);
    }
}
