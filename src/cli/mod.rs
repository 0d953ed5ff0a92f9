//! Command-line interface for todo
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;

mod backup;
mod category;
mod client;
mod context;
mod dashboard;
mod init;
mod profile;
mod remind;
mod task;

use context::Globals;

/// todo - personal task tracking
///
/// Categories, clients and tasks with subtasks in a local store, with SLA
/// tracking against delivery dates and a status dashboard.
#[derive(Parser, Debug)]
#[command(name = "todo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the config file (defaults to the platform config dir)
    #[arg(long, global = true, env = "TODO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory holding the store (overrides store.dir)
    #[arg(long, global = true, env = "TODO_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create or upgrade the local store
    Init,

    /// Category management
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Client management
    #[command(subcommand)]
    Client(ClientCommands),

    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Status counts, delivery counts and SLA per task
    Dashboard {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Export or restore a full backup
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Delete every category, task and client
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Rewrite stored tasks into the current encoding
    Normalize,

    /// Show or update the user profile embedded in backups
    #[command(subcommand)]
    Profile(ProfileCommands),

    /// Report tasks due today, periodically until interrupted
    Remind {
        /// Run a single check and exit
        #[arg(long)]
        once: bool,
    },
}

/// Task filter criteria shared by listing commands
#[derive(clap::Args, Debug, Default, Clone)]
pub struct FilterArgs {
    /// Case-insensitive match against name or description
    #[arg(long)]
    pub search: Option<String>,

    /// Exact status (New, InProgress, Paused, Cancelled, Done)
    #[arg(long)]
    pub status: Option<String>,

    /// Category id
    #[arg(long)]
    pub category: Option<String>,

    /// Client id
    #[arg(long)]
    pub client: Option<String>,
}

/// Category subcommands
#[derive(Subcommand, Debug)]
pub enum CategoryCommands {
    /// Create a category
    Add {
        name: String,
        /// Display color (e.g. "#0d6efd")
        #[arg(long)]
        color: Option<String>,
        /// Icon class (e.g. "bi bi-folder")
        #[arg(long)]
        icon: Option<String>,
        /// Priority 1-10
        #[arg(short, long)]
        priority: Option<u8>,
    },

    /// List categories by priority
    List,

    /// Show one category
    Show { id: String },

    /// Update a category
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(short, long)]
        priority: Option<u8>,
    },

    /// Delete a category (tasks keep their reference)
    Rm { id: String },
}

/// Client subcommands
#[derive(Subcommand, Debug)]
pub enum ClientCommands {
    /// Create a client
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Priority 1-10
        #[arg(short, long)]
        priority: Option<u8>,
    },

    /// List clients by priority
    List,

    /// Show one client
    Show { id: String },

    /// Update a client
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(short, long)]
        priority: Option<u8>,
    },

    /// Delete a client (tasks keep their reference)
    Rm { id: String },
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task
    Add {
        name: String,
        /// Category id
        #[arg(short, long)]
        category: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Initial status (default New)
        #[arg(long)]
        status: Option<String>,
        /// Priority 1-10
        #[arg(short, long)]
        priority: Option<u8>,
        /// Start date/time (RFC 3339 or YYYY-MM-DDTHH:MM)
        #[arg(long)]
        start: Option<String>,
        /// End date/time (RFC 3339 or YYYY-MM-DDTHH:MM)
        #[arg(long)]
        end: Option<String>,
        /// Delivery date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
        /// Client id (repeatable)
        #[arg(long = "client")]
        clients: Vec<String>,
        /// Subtask name (repeatable, kept in order)
        #[arg(long = "subtask")]
        subtasks: Vec<String>,
    },

    /// List tasks by priority, newest first within a priority
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show one task with elapsed time, SLA and subtask progress
    Show { id: String },

    /// Update a task
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(short, long)]
        priority: Option<u8>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(long, conflicts_with = "clear_start")]
        start: Option<String>,
        #[arg(long)]
        clear_start: bool,
        #[arg(long, conflicts_with = "clear_end")]
        end: Option<String>,
        #[arg(long)]
        clear_end: bool,
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        #[arg(long)]
        clear_due: bool,
        /// Replace the client list (repeatable)
        #[arg(long = "client", conflicts_with = "clear_clients")]
        clients: Vec<String>,
        #[arg(long)]
        clear_clients: bool,
    },

    /// Delete a task
    Rm { id: String },

    /// Change a task's status
    Status { id: String, status: String },

    /// Subtask editing
    #[command(subcommand)]
    Subtask(SubtaskCommands),
}

/// Subtask subcommands
#[derive(Subcommand, Debug)]
pub enum SubtaskCommands {
    /// Append a subtask
    Add {
        task: String,
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Flip a subtask between Pending and Done
    Toggle { task: String, subtask: String },

    /// Remove a subtask
    Rm { task: String, subtask: String },

    /// Move a subtask to a zero-based position
    Move {
        task: String,
        subtask: String,
        position: usize,
    },
}

/// Backup subcommands
#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    /// Write every record and the profile to a JSON file
    Export {
        /// Output file ("-" for stdout); defaults to todolist-backup-<date>.json
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace all data with a backup file
    Import {
        file: PathBuf,
        /// Confirm replacing existing data
        #[arg(long)]
        yes: bool,
    },
}

/// Profile subcommands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Show the profile
    Show,

    /// Update profile fields
    Set {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        company: Option<String>,
    },
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let globals = Globals {
            config: self.config,
            data_dir: self.data_dir,
            json: self.json,
            quiet: self.quiet,
        };
        match self.command {
            Commands::Init => init::run(&globals),
            Commands::Category(cmd) => {
                let ctx = globals.open()?;
                match cmd {
                    CategoryCommands::Add { name, color, icon, priority } => {
                        category::run_add(&ctx, category::AddOptions { name, color, icon, priority })
                    }
                    CategoryCommands::List => category::run_list(&ctx),
                    CategoryCommands::Show { id } => category::run_show(&ctx, &id),
                    CategoryCommands::Edit { id, name, color, icon, priority } => category::run_edit(
                        &ctx,
                        category::EditOptions { id, name, color, icon, priority },
                    ),
                    CategoryCommands::Rm { id } => category::run_rm(&ctx, &id),
                }
            }
            Commands::Client(cmd) => {
                let ctx = globals.open()?;
                match cmd {
                    ClientCommands::Add { name, description, priority } => {
                        client::run_add(&ctx, client::AddOptions { name, description, priority })
                    }
                    ClientCommands::List => client::run_list(&ctx),
                    ClientCommands::Show { id } => client::run_show(&ctx, &id),
                    ClientCommands::Edit { id, name, description, priority } => client::run_edit(
                        &ctx,
                        client::EditOptions { id, name, description, priority },
                    ),
                    ClientCommands::Rm { id } => client::run_rm(&ctx, &id),
                }
            }
            Commands::Task(cmd) => {
                let ctx = globals.open()?;
                match cmd {
                    TaskCommands::Add {
                        name,
                        category,
                        description,
                        status,
                        priority,
                        start,
                        end,
                        due,
                        clients,
                        subtasks,
                    } => task::run_add(
                        &ctx,
                        task::AddOptions {
                            name,
                            category,
                            description,
                            status,
                            priority,
                            start,
                            end,
                            due,
                            clients,
                            subtasks,
                        },
                    ),
                    TaskCommands::List { filter } => task::run_list(&ctx, filter),
                    TaskCommands::Show { id } => task::run_show(&ctx, &id),
                    TaskCommands::Edit {
                        id,
                        name,
                        description,
                        status,
                        priority,
                        category,
                        start,
                        clear_start,
                        end,
                        clear_end,
                        due,
                        clear_due,
                        clients,
                        clear_clients,
                    } => task::run_edit(
                        &ctx,
                        task::EditOptions {
                            id,
                            name,
                            description,
                            status,
                            priority,
                            category,
                            start,
                            clear_start,
                            end,
                            clear_end,
                            due,
                            clear_due,
                            clients,
                            clear_clients,
                        },
                    ),
                    TaskCommands::Rm { id } => task::run_rm(&ctx, &id),
                    TaskCommands::Status { id, status } => task::run_status(&ctx, &id, &status),
                    TaskCommands::Subtask(sub) => match sub {
                        SubtaskCommands::Add { task: task_id, name, description } => {
                            task::run_subtask_add(&ctx, &task_id, name, description)
                        }
                        SubtaskCommands::Toggle { task: task_id, subtask } => {
                            task::run_subtask_toggle(&ctx, &task_id, &subtask)
                        }
                        SubtaskCommands::Rm { task: task_id, subtask } => {
                            task::run_subtask_rm(&ctx, &task_id, &subtask)
                        }
                        SubtaskCommands::Move { task: task_id, subtask, position } => {
                            task::run_subtask_move(&ctx, &task_id, &subtask, position)
                        }
                    },
                }
            }
            Commands::Dashboard { filter } => dashboard::run(&globals.open()?, filter),
            Commands::Backup(cmd) => {
                let ctx = globals.open()?;
                match cmd {
                    BackupCommands::Export { output } => backup::run_export(&ctx, output),
                    BackupCommands::Import { file, yes } => backup::run_import(&ctx, &file, yes),
                }
            }
            Commands::Clear { yes } => backup::run_clear(&globals.open()?, yes),
            Commands::Normalize => task::run_normalize(&globals.open()?),
            Commands::Profile(cmd) => match cmd {
                ProfileCommands::Show => profile::run_show(&globals),
                ProfileCommands::Set { name, email, company } => {
                    profile::run_set(&globals, profile::SetOptions { name, email, company })
                }
            },
            Commands::Remind { once } => remind::run(&globals.open()?, once),
        }
    }
}
