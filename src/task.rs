//! Tasks and their embedded subtasks.
//!
//! A task owns its subtask list outright: subtasks have no collection of
//! their own and are only reachable through the parent record. Category and
//! client references are plain ids; nothing here checks that they resolve
//! (see [`crate::resolve`]).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::entity::{
    default_priority, generate_id, stored_precision, Entity, EntityService, Violations,
};
use crate::error::{Error, Result};
use crate::store::{Collection, Store};

const ID_PREFIX: &str = "task";
const SUBTASK_ID_PREFIX: &str = "subtask";

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum TaskStatus {
    #[default]
    #[serde(alias = "Nova")]
    New,
    #[serde(alias = "Em Andamento")]
    InProgress,
    #[serde(alias = "Pausada")]
    Paused,
    #[serde(alias = "Cancelada")]
    Cancelled,
    #[serde(alias = "Concluida", alias = "Concluída")]
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::New,
        TaskStatus::InProgress,
        TaskStatus::Paused,
        TaskStatus::Cancelled,
        TaskStatus::Done,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::New => "New",
            TaskStatus::InProgress => "InProgress",
            TaskStatus::Paused => "Paused",
            TaskStatus::Cancelled => "Cancelled",
            TaskStatus::Done => "Done",
        }
    }

    /// Done and Cancelled tasks are out of the delivery race
    pub fn is_closed(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Cancelled)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let key: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "new" | "nova" => Ok(TaskStatus::New),
            "inprogress" | "emandamento" => Ok(TaskStatus::InProgress),
            "paused" | "pausada" => Ok(TaskStatus::Paused),
            "cancelled" | "canceled" | "cancelada" => Ok(TaskStatus::Cancelled),
            "done" | "concluida" | "concluída" => Ok(TaskStatus::Done),
            _ => Err(Error::InvalidArgument(format!(
                "unknown task status '{raw}' (expected one of: New, InProgress, Paused, Cancelled, Done)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubtaskStatus {
    #[default]
    #[serde(alias = "Pendente")]
    Pending,
    #[serde(alias = "Concluida", alias = "Concluída")]
    Done,
}

impl SubtaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubtaskStatus::Pending => "Pending",
            SubtaskStatus::Done => "Done",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SubtaskStatus::Pending => SubtaskStatus::Done,
            SubtaskStatus::Done => SubtaskStatus::Pending,
        }
    }
}

impl fmt::Display for SubtaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: SubtaskStatus,
    #[serde(default)]
    pub order: u32,
    #[serde(with = "crate::dates::instant")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::dates::instant")]
    pub updated_at: DateTime<Utc>,
}

impl Subtask {
    pub fn is_done(&self) -> bool {
        self.status == SubtaskStatus::Done
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewSubtask {
    pub name: String,
    pub description: Option<String>,
    pub status: Option<SubtaskStatus>,
}

impl NewSubtask {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn build(self, order: u32, now: DateTime<Utc>) -> Subtask {
        Subtask {
            id: generate_id(SUBTASK_ID_PREFIX),
            name: self.name.trim().to_string(),
            description: self.description.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            order,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, with = "crate::dates::lenient_instant")]
    pub start_date_time: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::dates::lenient_instant")]
    pub end_date_time: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::dates::lenient_date")]
    pub delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub clients: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub subtasks: Vec<Subtask>,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(with = "crate::dates::instant")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::dates::instant")]
    pub updated_at: DateTime<Utc>,
}

/// Older records carry `null` or a non-list value where a list belongs
fn lenient_list<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => serde_json::from_value(Value::Array(items))
            .map_err(serde::de::Error::custom),
        _ => Ok(Vec::new()),
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub name: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub start_date_time: Option<DateTime<Utc>>,
    pub end_date_time: Option<DateTime<Utc>>,
    pub delivery_date: Option<NaiveDate>,
    pub category_id: String,
    pub clients: Vec<String>,
    pub subtasks: Vec<NewSubtask>,
    pub priority: Option<u8>,
}

impl NewTask {
    pub fn new(name: impl Into<String>, category_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category_id: category_id.into(),
            ..Self::default()
        }
    }
}

/// Partial task update. Clearable fields use a nested `Option`:
/// `Some(None)` clears, `None` leaves the stored value alone.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub start_date_time: Option<Option<DateTime<Utc>>>,
    pub end_date_time: Option<Option<DateTime<Utc>>>,
    pub delivery_date: Option<Option<NaiveDate>>,
    pub category_id: Option<String>,
    pub clients: Option<Vec<String>>,
    pub subtasks: Option<Vec<Subtask>>,
    pub priority: Option<u8>,
}

fn dedup_ids(ids: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        let id = id.trim().to_string();
        if !id.is_empty() && !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

impl Task {
    pub fn category(&self) -> Option<&str> {
        self.category_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn has_client(&self, client_id: &str) -> bool {
        self.clients.iter().any(|id| id == client_id)
    }

    pub fn all_subtasks_done(&self) -> bool {
        self.subtasks.iter().all(Subtask::is_done)
    }

    pub fn subtask(&self, subtask_id: &str) -> Option<&Subtask> {
        self.subtasks.iter().find(|subtask| subtask.id == subtask_id)
    }

    /// Sort by the stored order and renumber densely from zero
    pub fn reindex_subtasks(&mut self) {
        self.subtasks.sort_by_key(|subtask| subtask.order);
        self.renumber();
    }

    fn renumber(&mut self) {
        for (index, subtask) in self.subtasks.iter_mut().enumerate() {
            subtask.order = index as u32;
        }
    }

    fn subtask_position(&self, subtask_id: &str) -> Result<usize> {
        self.subtasks
            .iter()
            .position(|subtask| subtask.id == subtask_id)
            .ok_or_else(|| Error::not_found("subtasks", subtask_id))
    }

    /// Append a subtask at the next order slot
    pub fn add_subtask(&mut self, draft: NewSubtask, now: DateTime<Utc>) -> &Subtask {
        let order = self.subtasks.len() as u32;
        self.subtasks.push(draft.build(order, now));
        &self.subtasks[self.subtasks.len() - 1]
    }

    pub fn remove_subtask(&mut self, subtask_id: &str) -> Result<Subtask> {
        let position = self.subtask_position(subtask_id)?;
        let removed = self.subtasks.remove(position);
        self.renumber();
        Ok(removed)
    }

    /// Move a subtask to `target` (clamped to the end of the list)
    pub fn move_subtask(&mut self, subtask_id: &str, target: usize, now: DateTime<Utc>) -> Result<()> {
        let position = self.subtask_position(subtask_id)?;
        let mut subtask = self.subtasks.remove(position);
        subtask.updated_at = now;
        let target = target.min(self.subtasks.len());
        self.subtasks.insert(target, subtask);
        self.renumber();
        Ok(())
    }

    pub fn toggle_subtask(&mut self, subtask_id: &str, now: DateTime<Utc>) -> Result<SubtaskStatus> {
        let position = self.subtask_position(subtask_id)?;
        let subtask = &mut self.subtasks[position];
        subtask.status = subtask.status.toggled();
        subtask.updated_at = now;
        Ok(subtask.status)
    }
}

impl Entity for Task {
    type Draft = NewTask;
    type Patch = TaskPatch;

    const COLLECTION: Collection = Collection::Tasks;
    const KIND: &'static str = "task";

    fn build(draft: NewTask, now: DateTime<Utc>) -> Self {
        let subtasks = draft
            .subtasks
            .into_iter()
            .enumerate()
            .map(|(order, subtask)| subtask.build(order as u32, now))
            .collect();
        let category_id = draft.category_id.trim().to_string();
        Self {
            id: generate_id(ID_PREFIX),
            name: draft.name.trim().to_string(),
            description: draft.description.unwrap_or_default(),
            status: draft.status.unwrap_or_default(),
            start_date_time: draft.start_date_time.map(stored_precision),
            end_date_time: draft.end_date_time.map(stored_precision),
            delivery_date: draft.delivery_date,
            category_id: (!category_id.is_empty()).then_some(category_id),
            clients: dedup_ids(draft.clients),
            subtasks,
            priority: draft.priority.unwrap_or_else(default_priority),
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, patch: TaskPatch) {
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(start) = patch.start_date_time {
            self.start_date_time = start.map(stored_precision);
        }
        if let Some(end) = patch.end_date_time {
            self.end_date_time = end.map(stored_precision);
        }
        if let Some(delivery) = patch.delivery_date {
            self.delivery_date = delivery;
        }
        if let Some(category_id) = patch.category_id {
            let category_id = category_id.trim().to_string();
            self.category_id = (!category_id.is_empty()).then_some(category_id);
        }
        if let Some(clients) = patch.clients {
            self.clients = dedup_ids(clients);
        }
        if let Some(subtasks) = patch.subtasks {
            self.subtasks = subtasks;
            self.renumber();
        } else {
            self.reindex_subtasks();
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
    }

    fn validate(&self) -> Vec<String> {
        let mut violations = Violations::new();
        violations.require_text(&self.name, "task name is required");
        if self.category().is_none() {
            violations.push("task category is required");
        }
        violations.require_priority(self.priority);
        if let (Some(start), Some(end)) = (self.start_date_time, self.end_date_time) {
            if end < start {
                violations.push("task end date/time must not precede its start");
            }
        }
        for (index, subtask) in self.subtasks.iter().enumerate() {
            if subtask.name.trim().is_empty() {
                violations.push(format!("subtask {} name is required", index + 1));
            }
            if subtask.order != index as u32 {
                violations.push(format!(
                    "subtask {} order must be {index}, found {}",
                    index + 1,
                    subtask.order
                ));
            }
        }
        if self.status == TaskStatus::Done && !self.all_subtasks_done() {
            violations.push("task cannot be Done while any subtask is still pending");
        }
        violations.into_reasons()
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// Descending priority, newest first within a priority
    fn listing_order(a: &Self, b: &Self) -> Ordering {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.created_at.cmp(&a.created_at))
    }
}

/// Criteria for [`TaskService::filter`]; unset or empty fields match everything
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub search: Option<String>,
    pub status: Option<TaskStatus>,
    pub category: Option<String>,
    pub client: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

impl TaskFilter {
    pub fn is_empty(&self) -> bool {
        non_empty(&self.search).is_none()
            && self.status.is_none()
            && non_empty(&self.category).is_none()
            && non_empty(&self.client).is_none()
    }

    pub fn matches(&self, task: &Task) -> bool {
        if let Some(search) = non_empty(&self.search) {
            let needle = search.to_lowercase();
            if !task.name.to_lowercase().contains(&needle)
                && !task.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }
        if let Some(category) = non_empty(&self.category) {
            if task.category() != Some(category) {
                return false;
            }
        }
        if let Some(client) = non_empty(&self.client) {
            if !task.has_client(client) {
                return false;
            }
        }
        true
    }
}

/// Outcome of a [`TaskService::normalize`] pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    pub scanned: usize,
    pub rewritten: usize,
    pub skipped: Vec<String>,
}

pub type TaskService<'a> = EntityService<'a, Task>;

impl<'a> EntityService<'a, Task> {
    pub fn tasks(store: &'a Store) -> Self {
        Self::new(store)
    }

    pub fn by_category(&self, category_id: &str) -> Result<Vec<Task>> {
        self.get_by_index("categoryId", &category_id)
    }

    pub fn by_status(&self, status: TaskStatus) -> Result<Vec<Task>> {
        self.get_by_index("status", &status)
    }

    pub fn by_priority(&self, priority: u8) -> Result<Vec<Task>> {
        self.get_by_index("priority", &priority)
    }

    /// Listing-ordered tasks matching every criterion in `filter`
    pub fn filter(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let mut tasks = self.get_all()?;
        if !filter.is_empty() {
            tasks.retain(|task| filter.matches(task));
        }
        Ok(tasks)
    }

    pub fn set_status(&self, id: &str, status: TaskStatus) -> Result<Task> {
        self.update(
            id,
            TaskPatch {
                status: Some(status),
                ..TaskPatch::default()
            },
        )
    }

    pub fn add_subtask(&self, task_id: &str, draft: NewSubtask) -> Result<(Task, Subtask)> {
        self.modify(task_id, |task, now| Ok(task.add_subtask(draft, now).clone()))
    }

    pub fn remove_subtask(&self, task_id: &str, subtask_id: &str) -> Result<(Task, Subtask)> {
        self.modify(task_id, |task, _| task.remove_subtask(subtask_id))
    }

    pub fn move_subtask(&self, task_id: &str, subtask_id: &str, target: usize) -> Result<Task> {
        self.modify(task_id, |task, now| task.move_subtask(subtask_id, target, now))
            .map(|(task, ())| task)
    }

    pub fn toggle_subtask(&self, task_id: &str, subtask_id: &str) -> Result<(Task, SubtaskStatus)> {
        self.modify(task_id, |task, now| task.toggle_subtask(subtask_id, now))
    }

    /// Rewrite stored tasks into the current encoding.
    ///
    /// Records that already decode to their own encoding are left alone;
    /// records that cannot be decoded at all are reported and skipped.
    pub fn normalize(&self) -> Result<NormalizeReport> {
        let store = self.store();
        let mut report = NormalizeReport::default();
        for raw in store.all_values(Collection::Tasks)? {
            report.scanned += 1;
            let id = raw
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or("?")
                .to_string();
            let mut task: Task = match serde_json::from_value(raw.clone()) {
                Ok(task) => task,
                Err(err) => {
                    warn!(id = %id, error = %err, "skipping task that cannot be normalized");
                    report.skipped.push(id);
                    continue;
                }
            };
            task.reindex_subtasks();
            let canonical = serde_json::to_value(&task)?;
            if canonical != raw {
                store.put_value(Collection::Tasks, canonical)?;
                report.rewritten += 1;
            }
        }
        info!(
            scanned = report.scanned,
            rewritten = report.rewritten,
            skipped = report.skipped.len(),
            "normalized tasks"
        );
        Ok(report)
    }

    fn modify<R>(
        &self,
        task_id: &str,
        edit: impl FnOnce(&mut Task, DateTime<Utc>) -> Result<R>,
    ) -> Result<(Task, R)> {
        let now = stored_precision(Utc::now());
        self.modify_at(task_id, now, |task| edit(task, now))
    }
}
