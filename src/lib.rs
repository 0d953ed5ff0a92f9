//! todolist - personal task tracking library
//!
//! Core of the `todo` CLI: a small transactional entity store and the
//! services built on it.
//!
//! # Core Concepts
//!
//! - **Categories**: Named, colored groups every task belongs to
//! - **Clients**: People or companies a task is done for
//! - **Tasks**: Work items with status, priority, dates and ordered subtasks
//! - **SLA**: Delivery tracking for tasks in progress
//! - **Backups**: Whole-store JSON export and import
//!
//! # Module Organization
//!
//! - `store`: Versioned, indexed JSON collections on disk
//! - `entity`: Generic validated CRUD over a collection
//! - `category`, `client`, `task`: Entity types and their services
//! - `resolve`: Id to display-name lookups with an "Unknown" fallback
//! - `metrics`: Elapsed time, SLA, subtask progress, dashboard
//! - `backup`: Export, import and clear
//! - `remind`: Periodic due-today checks on tokio
//! - `config`: Configuration loading from `todolist.toml`
//! - `dates`: Date parsing and formatting helpers
//! - `lock`: File locking and atomic writes
//! - `output`: Human and JSON command output
//! - `cli`: Command-line interface using clap

pub mod backup;
pub mod category;
pub mod cli;
pub mod client;
pub mod config;
pub mod dates;
pub mod entity;
pub mod error;
pub mod lock;
pub mod metrics;
pub mod output;
pub mod remind;
pub mod resolve;
pub mod store;
pub mod task;

pub use error::{Error, Result};
