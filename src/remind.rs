//! Delivery reminders.
//!
//! A reminder check is a read-only task query: tasks due today that pass
//! the configured status and category filters. [`spawn`] runs that check
//! periodically on the tokio runtime until its handle is stopped.

use std::time::Duration;

use chrono::{Local, NaiveDate};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::ReminderConfig;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::task::{Task, TaskFilter, TaskService, TaskStatus};

#[derive(Debug, Clone, PartialEq)]
pub struct ReminderSettings {
    pub enabled: bool,
    pub interval: Duration,
    pub status_filter: Vec<TaskStatus>,
    pub category_filter: Vec<String>,
}

impl From<&ReminderConfig> for ReminderSettings {
    fn from(config: &ReminderConfig) -> Self {
        Self {
            enabled: config.enabled,
            interval: Duration::from_secs(config.interval_minutes.max(1) * 60),
            status_filter: config.status_filter.clone(),
            category_filter: config.category_filter.clone(),
        }
    }
}

impl ReminderSettings {
    fn admits(&self, task: &Task) -> bool {
        if !self.status_filter.is_empty() && !self.status_filter.contains(&task.status) {
            return false;
        }
        if !self.category_filter.is_empty()
            && !task
                .category()
                .is_some_and(|id| self.category_filter.iter().any(|wanted| wanted == id))
        {
            return false;
        }
        true
    }
}

/// Tasks delivered on `today` that pass the filters, in input order
pub fn due_today(tasks: &[Task], settings: &ReminderSettings, today: NaiveDate) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| task.delivery_date == Some(today))
        .filter(|task| settings.admits(task))
        .cloned()
        .collect()
}

/// Run one check against the store
pub fn check(store: &Store, settings: &ReminderSettings, today: NaiveDate) -> Result<Vec<Task>> {
    let tasks = TaskService::tasks(store).filter(&TaskFilter::default())?;
    let due = due_today(&tasks, settings, today);
    debug!(%today, scanned = tasks.len(), due = due.len(), "reminder check");
    Ok(due)
}

/// A running reminder loop
pub struct ReminderHandle {
    stop: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl ReminderHandle {
    /// Signal the loop to stop and wait for it to exit
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        let _ = self.join.await;
    }
}

/// Start checking for due tasks every `settings.interval`, first check
/// immediately. `sink` is only called with non-empty batches.
pub fn spawn<F>(store: Store, settings: ReminderSettings, mut sink: F) -> Result<ReminderHandle>
where
    F: FnMut(Vec<Task>) + Send + 'static,
{
    if !settings.enabled {
        return Err(Error::InvalidArgument(
            "reminders are disabled (set reminders.enabled = true)".to_string(),
        ));
    }
    let (stop, mut stopped) = watch::channel(false);
    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(settings.interval);
        info!(interval_secs = settings.interval.as_secs(), "reminder loop started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = stopped.changed() => {
                    if changed.is_err() || *stopped.borrow() {
                        break;
                    }
                    continue;
                }
            }
            let store = store.clone();
            let settings_for_check = settings.clone();
            let today = Local::now().date_naive();
            let outcome = tokio::task::spawn_blocking(move || {
                check(&store, &settings_for_check, today)
            })
            .await;
            match outcome {
                Ok(Ok(due)) if !due.is_empty() => sink(due),
                Ok(Ok(_)) => {}
                Ok(Err(err)) => error!(error = %err, "reminder check failed"),
                Err(err) => error!(error = %err, "reminder check panicked"),
            }
        }
        info!("reminder loop stopped");
    });
    Ok(ReminderHandle { stop, join })
}
