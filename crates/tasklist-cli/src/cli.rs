use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tasklist_core::tasks::SortMode;

/// CLI surface definition. Running without a subcommand opens the TUI.
#[derive(Parser, Debug)]
#[command(
    name = "tasklist",
    about = "Personal task list with a terminal UI and local JSON storage",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Task file to use instead of the configured one.
    #[arg(long, global = true, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Optional subcommand; defaults to launching the TUI when absent.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Launch the interactive TUI (press q or Esc to exit).
    Tui,
    /// Print tasks, optionally filtered and sorted.
    List {
        /// Only show tasks whose title contains this text (case-insensitive).
        #[arg(long, short)]
        search: Option<String>,
        /// Sort order; defaults to the configured one.
        #[arg(long, value_enum)]
        sort: Option<SortArg>,
    },
    /// Add a task.
    Add {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },
    /// Replace a task's title.
    Edit {
        /// Task id or a unique prefix of it.
        id: String,
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },
    /// Mark a task done, or pending again.
    Toggle {
        /// Task id or a unique prefix of it.
        id: String,
    },
    /// Remove a task.
    Rm {
        /// Task id or a unique prefix of it.
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },
    /// Remove every completed task.
    Clear {
        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },
    /// Print task counters.
    Stats,
    /// Rewrite the task file from the current state.
    Save,
    /// Print version and exit.
    Version,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortArg {
    /// Newest first.
    Date,
    /// Title A-Z.
    Alpha,
}

impl From<SortArg> for SortMode {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Date => SortMode::ByDate,
            SortArg::Alpha => SortMode::Alphabetical,
        }
    }
}
