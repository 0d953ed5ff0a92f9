//! Configuration loading and management
//!
//! Handles parsing of `todolist.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;
use crate::store::DEFAULT_STORE_NAME;
use crate::task::TaskStatus;

pub const CONFIG_FILE: &str = "todolist.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Where the entity store lives
    #[serde(default)]
    pub store: StoreConfig,

    /// User profile embedded in backups
    #[serde(default)]
    pub profile: UserProfile,

    /// Delivery reminders
    #[serde(default)]
    pub reminders: ReminderConfig,
}

/// Store location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Data directory; the platform data dir when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Store name, used as the directory under `dir`
    #[serde(default = "default_store_name")]
    pub name: String,

    /// How long a command waits for another process's collection lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_store_name() -> String {
    DEFAULT_STORE_NAME.to_string()
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: None,
            name: default_store_name(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

/// Who exported a backup
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub company: String,
}

/// Reminder settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReminderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minutes between checks in `todo remind`
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,

    /// Only remind about tasks in these statuses (empty = any)
    #[serde(default = "default_status_filter")]
    pub status_filter: Vec<TaskStatus>,

    /// Only remind about tasks in these categories (empty = any)
    #[serde(default)]
    pub category_filter: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_interval_minutes() -> u64 {
    30
}

fn default_status_filter() -> Vec<TaskStatus> {
    vec![TaskStatus::New, TaskStatus::InProgress, TaskStatus::Paused]
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            interval_minutes: default_interval_minutes(),
            status_filter: default_status_filter(),
            category_filter: Vec::new(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "todolist")
}

/// Default config file location in the platform config dir
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

impl Config {
    /// Load configuration from a `todolist.toml` file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, or return defaults when it does not exist
    pub fn load_or_default(path: Option<&Path>) -> crate::error::Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        crate::lock::write_atomic(path, content.as_bytes())?;
        Ok(())
    }

    /// Data directory holding the store directory
    pub fn data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.store.dir {
            return dir.clone();
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        self.store.validate()?;
        self.reminders.validate()?;
        Ok(())
    }
}

impl StoreConfig {
    fn validate(&self) -> crate::error::Result<()> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(crate::error::Error::InvalidConfig(
                "store.name cannot be empty".to_string(),
            ));
        }
        if name == "." || name == ".." {
            return Err(crate::error::Error::InvalidConfig(format!(
                "store.name '{name}' is not a usable directory name"
            )));
        }
        if !name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
        {
            return Err(crate::error::Error::InvalidConfig(format!(
                "store.name '{name}' must contain only letters, digits, '-', '_' or '.'"
            )));
        }
        if self.lock_timeout_ms == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "store.lock_timeout_ms must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl ReminderConfig {
    fn validate(&self) -> crate::error::Result<()> {
        if self.interval_minutes == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "reminders.interval_minutes must be >= 1".to_string(),
            ));
        }
        if self.category_filter.iter().any(|id| id.trim().is_empty()) {
            return Err(crate::error::Error::InvalidConfig(
                "reminders.category_filter cannot include empty entries".to_string(),
            ));
        }
        Ok(())
    }
}
