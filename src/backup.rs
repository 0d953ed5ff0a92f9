//! Whole-store backup and restore.
//!
//! A backup is one JSON document holding every category, task and client
//! plus the exporting user's profile. Restoring validates the document
//! shape and record encoding up front, then clears the three collections
//! and re-adds records one at a time. There is no rollback: a store failure
//! partway through leaves the records written so far.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::category::{Category, CategoryService};
use crate::client::{Client, ClientService};
use crate::config::UserProfile;
use crate::error::{Error, Result};
use crate::store::{Collection, Store};
use crate::task::{Task, TaskService};

pub const BACKUP_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    #[serde(default = "default_version")]
    pub version: String,
    /// Absent in hand-written or older backups
    #[serde(default, with = "crate::dates::lenient_instant")]
    pub export_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_profile: Option<UserProfile>,
    pub data: BackupData,
}

fn default_version() -> String {
    BACKUP_VERSION.to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackupData {
    pub categories: Vec<Category>,
    pub tasks: Vec<Task>,
    pub clients: Vec<Client>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub categories: usize,
    pub tasks: usize,
    pub clients: usize,
}

impl BackupData {
    pub fn counts(&self) -> Counts {
        Counts {
            categories: self.categories.len(),
            tasks: self.tasks.len(),
            clients: self.clients.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub restored: Counts,
    pub cleared: Counts,
    pub user_profile: Option<UserProfile>,
}

/// `todolist-backup-2024-06-10.json`
pub fn default_file_name(date: NaiveDate) -> String {
    format!("todolist-backup-{}.json", crate::dates::format_date(date))
}

pub fn export(store: &Store, profile: &UserProfile) -> Result<Backup> {
    export_at(store, profile, Utc::now())
}

pub fn export_at(store: &Store, profile: &UserProfile, now: DateTime<Utc>) -> Result<Backup> {
    let data = BackupData {
        categories: CategoryService::categories(store).get_all()?,
        tasks: TaskService::tasks(store).get_all()?,
        clients: ClientService::clients(store).get_all()?,
    };
    let counts = data.counts();
    info!(
        categories = counts.categories,
        tasks = counts.tasks,
        clients = counts.clients,
        "exported backup"
    );
    Ok(Backup {
        version: BACKUP_VERSION.to_string(),
        export_date: Some(now),
        user_profile: Some(profile.clone()),
        data,
    })
}

/// Parse and check a backup document without touching any store
pub fn parse(raw: &str) -> Result<Backup> {
    let document: Value = serde_json::from_str(raw)
        .map_err(|err| Error::Format(format!("backup is not valid JSON: {err}")))?;
    let data = document
        .get("data")
        .filter(|data| data.is_object())
        .ok_or_else(|| Error::Format("backup is missing the data section".to_string()))?;
    let missing: Vec<&str> = ["categories", "tasks", "clients"]
        .into_iter()
        .filter(|key| !data.get(*key).is_some_and(Value::is_array))
        .collect();
    if !missing.is_empty() {
        return Err(Error::Format(format!(
            "backup is missing data.{}",
            missing.join(", data.")
        )));
    }
    let backup: Backup = serde_json::from_value(document)
        .map_err(|err| Error::Format(format!("backup has a malformed record: {err}")))?;
    debug!(version = %backup.version, "parsed backup");
    Ok(backup)
}

pub fn read_file(path: &Path) -> Result<Backup> {
    let raw = std::fs::read_to_string(path)?;
    parse(&raw)
}

pub fn write_file(path: &Path, backup: &Backup) -> Result<()> {
    let json = serde_json::to_string_pretty(backup)?;
    crate::lock::write_atomic(path, json.as_bytes())
}

/// Replace every collection with the backup's records
pub fn restore(store: &Store, backup: &Backup) -> Result<ImportReport> {
    let cleared = clear_all(store)?;
    for category in &backup.data.categories {
        store.add(Collection::Categories, category)?;
    }
    for task in &backup.data.tasks {
        store.add(Collection::Tasks, task)?;
    }
    for client in &backup.data.clients {
        store.add(Collection::Clients, client)?;
    }
    let restored = backup.data.counts();
    info!(
        categories = restored.categories,
        tasks = restored.tasks,
        clients = restored.clients,
        "restored backup"
    );
    Ok(ImportReport {
        restored,
        cleared,
        user_profile: backup.user_profile.clone(),
    })
}

/// Parse `raw` and restore it; a format error leaves the store untouched
pub fn import(store: &Store, raw: &str) -> Result<ImportReport> {
    let backup = parse(raw)?;
    restore(store, &backup)
}

/// Remove every record from the three collections
pub fn clear_all(store: &Store) -> Result<Counts> {
    let counts = Counts {
        categories: store.clear(Collection::Categories)?,
        tasks: store.clear(Collection::Tasks)?,
        clients: store.clear(Collection::Clients)?,
    };
    info!(
        categories = counts.categories,
        tasks = counts.tasks,
        clients = counts.clients,
        "cleared all collections"
    );
    Ok(counts)
}
