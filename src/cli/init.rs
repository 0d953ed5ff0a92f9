//! todo init command implementation
//!
//! Creates the store (or upgrades an older one) and writes a default
//! config file when none exists yet.

use std::path::PathBuf;

use crate::config::Config;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};

use super::context::Globals;

#[derive(serde::Serialize)]
struct InitOutput {
    store: PathBuf,
    name: String,
    version: u32,
    created_store: bool,
    upgraded_from: Option<u32>,
    added: Vec<String>,
    config: Option<PathBuf>,
    created_config: bool,
}

pub fn run(globals: &Globals) -> Result<()> {
    let config = globals.load_config()?;
    let created_config = ensure_config(globals.config_path())?;
    let store = globals.store(&config);
    let report = store.init()?;

    let output = InitOutput {
        store: store.root().to_path_buf(),
        name: store.name().to_string(),
        version: report.version,
        created_store: report.created,
        upgraded_from: report.upgraded_from,
        added: report.added.clone(),
        config: globals.config_path(),
        created_config,
    };

    let header = if report.created {
        "todo init: created store".to_string()
    } else if let Some(from) = report.upgraded_from {
        format!("todo init: upgraded store from version {from}")
    } else if report.added.is_empty() {
        "todo init: nothing to do".to_string()
    } else {
        "todo init: repaired store".to_string()
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("store", output.store.display().to_string());
    human.push_summary("version", output.version.to_string());
    if !output.added.is_empty() {
        human.push_summary("added", output.added.join(", "));
    }
    if let Some(path) = &output.config {
        let state = if created_config { " (created)" } else { "" };
        human.push_summary("config", format!("{}{state}", path.display()));
    }
    human.push_next_step("todo category add <name>");
    human.push_next_step("todo task add <name> --category <id>");

    emit_success(globals.output(), "init", &output, Some(&human))
}

fn ensure_config(path: Option<PathBuf>) -> Result<bool> {
    let Some(path) = path else {
        return Ok(false);
    };
    if path.exists() {
        return Ok(false);
    }
    Config::default().save(&path)?;
    Ok(true)
}
