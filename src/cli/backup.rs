//! todo backup / clear command implementations.

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::warn;

use crate::backup::{self, Counts};
use crate::config::Config;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};

use super::context::{require_confirmation, Context};

#[derive(serde::Serialize)]
struct ExportOutput {
    path: Option<PathBuf>,
    counts: Counts,
}

#[derive(serde::Serialize)]
struct ImportOutput {
    file: PathBuf,
    restored: Counts,
    cleared: Counts,
    profile_restored: bool,
}

fn counts_line(counts: &Counts) -> String {
    format!(
        "{} categories, {} tasks, {} clients",
        counts.categories, counts.tasks, counts.clients
    )
}

pub fn run_export(ctx: &Context, output: Option<PathBuf>) -> Result<()> {
    let backup = backup::export(&ctx.store, &ctx.config.profile)?;
    let counts = backup.data.counts();

    if output.as_deref() == Some(Path::new("-")) {
        println!("{}", serde_json::to_string_pretty(&backup)?);
        return Ok(());
    }

    let path = output.unwrap_or_else(|| {
        PathBuf::from(backup::default_file_name(Local::now().date_naive()))
    });
    backup::write_file(&path, &backup)?;

    let mut human = HumanOutput::new("Backup exported");
    human.push_summary("File", path.display().to_string());
    human.push_summary("Records", counts_line(&counts));
    let output = ExportOutput {
        path: Some(path),
        counts,
    };
    emit_success(ctx.output, "backup export", &output, Some(&human))
}

pub fn run_import(ctx: &Context, file: &Path, yes: bool) -> Result<()> {
    // Parse before asking for confirmation so a bad file fails the same way.
    let backup = backup::read_file(file)?;
    require_confirmation(yes, "backup import")?;
    let report = backup::restore(&ctx.store, &backup)?;

    let mut human = HumanOutput::new("Backup restored");
    human.push_summary("File", file.display().to_string());
    human.push_summary("Restored", counts_line(&report.restored));
    human.push_summary("Replaced", counts_line(&report.cleared));

    let mut profile_restored = false;
    if let Some(profile) = report.user_profile.clone() {
        match &ctx.config_path {
            Some(path) => {
                let mut config = Config::load_or_default(Some(path.as_path()))?;
                config.profile = profile;
                config.save(path)?;
                profile_restored = true;
                human.push_summary("Profile", "restored");
            }
            None => {
                warn!("no config path; backup profile not saved");
                human.push_warning("no config file location; profile was not restored");
            }
        }
    }

    let output = ImportOutput {
        file: file.to_path_buf(),
        restored: report.restored,
        cleared: report.cleared,
        profile_restored,
    };
    emit_success(ctx.output, "backup import", &output, Some(&human))
}

pub fn run_clear(ctx: &Context, yes: bool) -> Result<()> {
    require_confirmation(yes, "clear")?;
    let cleared = backup::clear_all(&ctx.store)?;
    let mut human = HumanOutput::new("All data cleared");
    human.push_summary("Removed", counts_line(&cleared));
    emit_success(ctx.output, "clear", &cleared, Some(&human))
}
