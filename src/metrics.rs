//! Derived task metrics.
//!
//! Everything here is a pure function of task data and a reference instant.
//! Functions are generic over the time zone of `now`: calendar arithmetic
//! (end of the delivery day, "today") happens in that zone, so callers
//! pass `Local::now()` in the binary and a fixed offset in tests.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;
use tracing::debug;

use crate::dates::{end_of_day, start_of_day};
use crate::resolve::Directory;
use crate::task::{Task, TaskStatus};

/// Nominal delivery window the SLA percentage is measured against
pub const SLA_WINDOW_DAYS: i64 = 7;

pub const NOT_STARTED: &str = "Not started";
pub const TODAY: &str = "Today";
pub const OVERDUE: &str = "Overdue";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Elapsed {
    pub seconds: i64,
    pub text: String,
}

/// Time spent on a task: `end` (or `now` while running) minus `start`
pub fn elapsed<Tz: TimeZone>(task: &Task, now: &DateTime<Tz>) -> Elapsed {
    let Some(start) = task.start_date_time else {
        return Elapsed {
            seconds: 0,
            text: NOT_STARTED.to_string(),
        };
    };
    let end = task
        .end_date_time
        .unwrap_or_else(|| now.with_timezone(&Utc));
    let seconds = (end - start).num_seconds().max(0);
    Elapsed {
        seconds,
        text: format_duration(seconds),
    }
}

/// Coarsest nonzero unit pair: `2d 3h`, `4h 10m`, `5m 2s`, `9s`
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;
    if days > 0 {
        format!("{days}d {}h", hours % 24)
    } else if hours > 0 {
        format!("{hours}h {}m", minutes % 60)
    } else if minutes > 0 {
        format!("{minutes}m {}s", seconds % 60)
    } else {
        format!("{seconds}s")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlaStatus {
    None,
    Ok,
    Warning,
    Overdue,
}

impl SlaStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SlaStatus::None => "none",
            SlaStatus::Ok => "ok",
            SlaStatus::Warning => "warning",
            SlaStatus::Overdue => "overdue",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sla {
    pub status: SlaStatus,
    pub percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_overdue: Option<i64>,
    pub text: String,
    pub description: String,
}

impl Sla {
    fn untracked() -> Self {
        Self {
            status: SlaStatus::None,
            percentage: 0.0,
            days_remaining: None,
            days_overdue: None,
            text: "-".to_string(),
            description: String::new(),
        }
    }
}

/// SLA for an in-progress task with a delivery date; anything else is untracked
pub fn sla<Tz: TimeZone>(task: &Task, now: &DateTime<Tz>) -> Sla {
    match task.delivery_date {
        Some(delivery) if task.status == TaskStatus::InProgress => {
            sla_for_delivery(delivery, now)
        }
        _ => Sla::untracked(),
    }
}

/// SLA against the end (23:59:59.999) of `delivery` in the zone of `now`
pub fn sla_for_delivery<Tz: TimeZone>(delivery: chrono::NaiveDate, now: &DateTime<Tz>) -> Sla {
    let deadline = end_of_day(delivery, &now.timezone());
    let diff = deadline - now.clone();
    let day = Duration::days(1);

    if diff < Duration::zero() {
        let overdue_ms = -diff.num_milliseconds();
        let days_overdue = ceil_div(overdue_ms, day.num_milliseconds());
        let plural = if days_overdue == 1 { "" } else { "s" };
        return Sla {
            status: SlaStatus::Overdue,
            percentage: 100.0,
            days_remaining: None,
            days_overdue: Some(days_overdue),
            text: OVERDUE.to_string(),
            description: format!("{days_overdue} day{plural} overdue"),
        };
    }

    // Whole calendar days until delivery; a task due today has zero days left.
    let days_remaining = (delivery - now.date_naive()).num_days().max(0);
    let hours_remaining = diff.num_hours();
    let percentage = ((SLA_WINDOW_DAYS - days_remaining) as f64 / SLA_WINDOW_DAYS as f64 * 100.0)
        .clamp(0.0, 100.0);
    let status = if days_remaining <= 1 {
        SlaStatus::Warning
    } else {
        SlaStatus::Ok
    };
    let text = if days_remaining >= 2 {
        format!("{days_remaining}d")
    } else if hours_remaining >= 1 {
        format!("{hours_remaining}h")
    } else {
        TODAY.to_string()
    };
    Sla {
        status,
        percentage,
        days_remaining: Some(days_remaining),
        days_overdue: None,
        description: format!("{text} left until delivery"),
        text,
    }
}

fn ceil_div(numerator: i64, denominator: i64) -> i64 {
    (numerator + denominator - 1) / denominator
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct SubtaskProgress {
    pub completed: usize,
    pub total: usize,
    pub percentage: u32,
}

pub fn subtask_progress(task: &Task) -> SubtaskProgress {
    let total = task.subtasks.len();
    if total == 0 {
        return SubtaskProgress {
            completed: 0,
            total: 0,
            percentage: 0,
        };
    }
    let completed = task.subtasks.iter().filter(|subtask| subtask.is_done()).count();
    SubtaskProgress {
        completed,
        total,
        percentage: (completed as f64 / total as f64 * 100.0).round() as u32,
    }
}

/// Dashboard delivery check: `now` against the start of the delivery day.
///
/// Coarser than [`sla`], which allows the whole delivery day.
pub fn is_on_time<Tz: TimeZone>(task: &Task, now: &DateTime<Tz>) -> Option<bool> {
    if task.status.is_closed() {
        return None;
    }
    let delivery = task.delivery_date?;
    Some(*now <= start_of_day(delivery, &now.timezone()))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTask {
    #[serde(flatten)]
    pub task: Task,
    pub category_name: String,
    pub sla: Sla,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub total_tasks: usize,
    pub status_counts: BTreeMap<TaskStatus, usize>,
    pub on_time: usize,
    pub overdue: usize,
    pub tasks: Vec<DashboardTask>,
}

/// Aggregate a task set: status counts, delivery counts and SLA-annotated
/// copies sorted by category name, then status
pub fn dashboard<Tz: TimeZone>(tasks: &[Task], directory: &Directory, now: &DateTime<Tz>) -> Dashboard {
    let mut status_counts: BTreeMap<TaskStatus, usize> =
        TaskStatus::ALL.iter().map(|status| (*status, 0)).collect();
    let mut on_time = 0;
    let mut overdue = 0;

    for task in tasks {
        *status_counts.entry(task.status).or_insert(0) += 1;
        match is_on_time(task, now) {
            Some(true) => on_time += 1,
            Some(false) => overdue += 1,
            None => {}
        }
    }

    let mut annotated: Vec<DashboardTask> = tasks
        .iter()
        .map(|task| DashboardTask {
            category_name: directory
                .category_name_or_unknown(task.category())
                .to_string(),
            sla: sla(task, now),
            task: task.clone(),
        })
        .collect();
    annotated.sort_by(dashboard_order);

    debug!(
        total = tasks.len(),
        on_time, overdue, "dashboard aggregated"
    );
    Dashboard {
        total_tasks: tasks.len(),
        status_counts,
        on_time,
        overdue,
        tasks: annotated,
    }
}

fn dashboard_order(a: &DashboardTask, b: &DashboardTask) -> Ordering {
    a.category_name
        .to_lowercase()
        .cmp(&b.category_name.to_lowercase())
        .then_with(|| a.category_name.cmp(&b.category_name))
        .then_with(|| a.task.status.cmp(&b.task.status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{Category, NewCategory};
    use crate::entity::Entity;
    use crate::task::{NewSubtask, NewTask, SubtaskStatus};
    use chrono::{FixedOffset, NaiveDate};

    fn zone() -> FixedOffset {
        FixedOffset::west_opt(3 * 3600).unwrap()
    }

    fn at(date: NaiveDate, hour: u32, minute: u32) -> DateTime<FixedOffset> {
        zone()
            .from_local_datetime(&date.and_hms_opt(hour, minute, 0).unwrap())
            .unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn in_progress(delivery: Option<NaiveDate>) -> Task {
        let mut task = Task::build(NewTask::new("Deliver", "cat_1"), Utc::now());
        task.status = TaskStatus::InProgress;
        task.delivery_date = delivery;
        task
    }

    #[test]
    fn sla_due_today_is_warning_with_hours_left() {
        let today = day(2024, 6, 10);
        let sla = sla(&in_progress(Some(today)), &at(today, 10, 0));
        assert_eq!(sla.status, SlaStatus::Warning);
        assert_eq!(sla.days_remaining, Some(0));
        assert_eq!(sla.text, "13h");
        assert_eq!(sla.percentage, 100.0);
    }

    #[test]
    fn sla_in_last_hour_reads_today() {
        let today = day(2024, 6, 10);
        let sla = sla(&in_progress(Some(today)), &at(today, 23, 30));
        assert_eq!(sla.text, TODAY);
        assert_eq!(sla.description, "Today left until delivery");
    }

    #[test]
    fn sla_yesterday_is_one_day_overdue() {
        let today = day(2024, 6, 10);
        let sla = sla(&in_progress(Some(day(2024, 6, 9))), &at(today, 10, 0));
        assert_eq!(sla.status, SlaStatus::Overdue);
        assert_eq!(sla.percentage, 100.0);
        assert_eq!(sla.days_overdue, Some(1));
        assert_eq!(sla.description, "1 day overdue");
    }

    #[test]
    fn sla_far_delivery_is_ok_and_clamped() {
        let today = day(2024, 6, 10);
        let near = sla(&in_progress(Some(day(2024, 6, 13))), &at(today, 9, 0));
        assert_eq!(near.status, SlaStatus::Ok);
        assert_eq!(near.days_remaining, Some(3));
        assert_eq!(near.text, "3d");
        assert!((near.percentage - 400.0 / 7.0).abs() < 1e-9);

        let far = sla(&in_progress(Some(day(2024, 7, 30))), &at(today, 9, 0));
        assert_eq!(far.percentage, 0.0);
    }

    #[test]
    fn sla_ignores_tasks_not_in_progress() {
        let today = day(2024, 6, 10);
        let mut task = in_progress(Some(today));
        task.status = TaskStatus::Paused;
        assert_eq!(sla(&task, &at(today, 10, 0)).status, SlaStatus::None);
        let undated = in_progress(None);
        assert_eq!(sla(&undated, &at(today, 10, 0)).percentage, 0.0);
    }

    #[test]
    fn elapsed_formats_coarsest_units() {
        let mut task = in_progress(None);
        let now = Utc::now();
        assert_eq!(elapsed(&task, &now).text, NOT_STARTED);

        let start = now - Duration::hours(50);
        task.start_date_time = Some(start);
        task.end_date_time = Some(start + Duration::seconds(26 * 3600 + 120));
        assert_eq!(elapsed(&task, &now).text, "1d 2h");

        task.end_date_time = Some(start);
        assert_eq!(elapsed(&task, &now).text, "0s");

        assert_eq!(format_duration(3 * 3600 + 15 * 60), "3h 15m");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(42), "42s");
    }

    #[test]
    fn subtask_progress_rounds_percentage() {
        let mut draft = NewTask::new("Three steps", "cat_1");
        draft.subtasks = vec![
            NewSubtask { name: "a".into(), status: Some(SubtaskStatus::Done), ..NewSubtask::default() },
            NewSubtask { name: "b".into(), status: Some(SubtaskStatus::Done), ..NewSubtask::default() },
            NewSubtask::named("c"),
        ];
        let task = Task::build(draft, Utc::now());
        assert_eq!(
            subtask_progress(&task),
            SubtaskProgress { completed: 2, total: 3, percentage: 67 }
        );
        let empty = in_progress(None);
        assert_eq!(
            subtask_progress(&empty),
            SubtaskProgress { completed: 0, total: 0, percentage: 0 }
        );
    }

    #[test]
    fn dashboard_counts_and_orders() {
        let created = Utc::now();
        let work = Category::build(NewCategory::named("Work"), created);
        let home = Category::build(NewCategory::named("Home"), created);
        let directory = Directory::new(vec![work.clone(), home.clone()], Vec::new());
        let today = day(2024, 6, 10);
        let now = at(today, 10, 0);

        let mut due_tomorrow = Task::build(NewTask::new("report", &work.id), created);
        due_tomorrow.status = TaskStatus::InProgress;
        due_tomorrow.delivery_date = Some(day(2024, 6, 11));

        // Due today counts as overdue on the dashboard even though its SLA
        // still has hours left.
        let mut due_today = Task::build(NewTask::new("groceries", &home.id), created);
        due_today.status = TaskStatus::InProgress;
        due_today.delivery_date = Some(today);

        let mut finished = Task::build(NewTask::new("taxes", &home.id), created);
        finished.status = TaskStatus::Done;
        finished.delivery_date = Some(day(2024, 1, 1));

        let orphan = Task::build(NewTask::new("orphan", "cat_deleted"), created);

        let tasks = vec![due_tomorrow, due_today, finished, orphan];
        let report = dashboard(&tasks, &directory, &now);

        assert_eq!(report.total_tasks, 4);
        assert_eq!(report.status_counts[&TaskStatus::InProgress], 2);
        assert_eq!(report.status_counts[&TaskStatus::Done], 1);
        assert_eq!(report.status_counts[&TaskStatus::Paused], 0);
        assert_eq!(report.on_time, 1);
        assert_eq!(report.overdue, 1);

        let order: Vec<(&str, &str)> = report
            .tasks
            .iter()
            .map(|entry| (entry.category_name.as_str(), entry.task.name.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("Home", "groceries"),
                ("Home", "taxes"),
                ("Unknown", "orphan"),
                ("Work", "report"),
            ]
        );
        assert_eq!(report.tasks[0].sla.status, SlaStatus::Warning);
        assert_eq!(report.tasks[1].sla.status, SlaStatus::None);
    }

    #[test]
    fn dashboard_serializes_status_keys() {
        let report = dashboard(&[], &Directory::default(), &Utc::now());
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["totalTasks"], 0);
        assert_eq!(value["statusCounts"]["InProgress"], 0);
    }
}
