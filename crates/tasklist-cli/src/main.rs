mod cli;
mod config;
mod storage;
mod tasks;
mod tui;

use std::{io, path::Path};

use crate::cli::ConfigCommand;
use clap::Parser;
use color_eyre::Result;
use tasklist_core::tasks::TaskError;
use tasklist_storage::JsonFileStore;
use tasklist_task::TaskStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Entry point wiring the CLI to the task store and the TUI.
fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = config::load();
    match cli.command.unwrap_or(cli::Command::Tui) {
        cli::Command::Version => print_version(),
        cli::Command::Config(ConfigCommand::Init) => init_config(&config)?,
        cli::Command::Tui => {
            let (store, warning) = open_store(&config, cli.file.as_deref())?;
            let mut app = tui::App::new(store, config.sort_mode(), warning);
            let outcome = tui::launch(&mut app);
            let closed = app.into_store().close();
            outcome?;
            closed?;
        }
        cmd => {
            let (mut store, warning) = open_store(&config, cli.file.as_deref())?;
            if let Some(warning) = warning {
                eprintln!("warning: {warning}");
            }
            let stdin = io::stdin();
            tasks::handle(
                cmd,
                &mut store,
                config.sort_mode(),
                &mut io::stdout(),
                &mut stdin.lock(),
            )?;
        }
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters; stay quiet by default so the TUI screen is not overwritten.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("tasklist {}", env!("CARGO_PKG_VERSION"));
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}

fn open_store(
    config: &config::Config,
    flag: Option<&Path>,
) -> Result<(TaskStore<JsonFileStore>, Option<TaskError>)> {
    let file_store = storage::store_from_config(config, flag)?;
    Ok(TaskStore::open(file_store))
}
