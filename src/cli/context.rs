//! Process-wide handles shared by every command.
//!
//! The config and the store handle are built once from the global flags and
//! passed by reference into each command.

use std::path::PathBuf;

use crate::config::{default_config_path, Config};
use crate::error::{Error, Result};
use crate::output::OutputOptions;
use crate::resolve::Directory;
use crate::store::Store;
use crate::task::{TaskFilter, TaskStatus};

use super::FilterArgs;

/// Global flags as parsed from the command line
pub struct Globals {
    pub config: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

impl Globals {
    pub fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json,
            quiet: self.quiet,
        }
    }

    /// Explicit `--config`, else the platform default
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(default_config_path)
    }

    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_or_default(self.config_path().as_deref())?;
        if let Some(dir) = &self.data_dir {
            config.store.dir = Some(dir.clone());
        }
        Ok(config)
    }

    /// Store handle without initializing it
    pub fn store(&self, config: &Config) -> Store {
        Store::new(config.data_dir(), config.store.name.clone())
            .with_lock_timeout(config.store.lock_timeout_ms)
    }

    /// Load config and open (creating or upgrading) the store
    pub fn open(&self) -> Result<Context> {
        let config = self.load_config()?;
        let store = self.store(&config);
        store.init()?;
        Ok(Context {
            config,
            config_path: self.config_path(),
            store,
            output: self.output(),
        })
    }
}

pub struct Context {
    pub config: Config,
    pub config_path: Option<PathBuf>,
    pub store: Store,
    pub output: OutputOptions,
}

impl Context {
    pub fn directory(&self) -> Result<Directory> {
        Directory::load(&self.store)
    }
}

impl FilterArgs {
    pub fn to_filter(&self) -> Result<TaskFilter> {
        let status = self
            .status
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(str::parse::<TaskStatus>)
            .transpose()?;
        Ok(TaskFilter {
            search: self.search.clone(),
            status,
            category: self.category.clone(),
            client: self.client.clone(),
        })
    }
}

pub fn require_confirmation(yes: bool, action: &str) -> Result<()> {
    if yes {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "{action} deletes existing data; pass --yes to confirm"
        )))
    }
}
