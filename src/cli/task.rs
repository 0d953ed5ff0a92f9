//! todo task command implementations.

use chrono::{Local, Utc};

use crate::dates::{format_date, format_instant, parse_date_arg, parse_instant_arg};
use crate::error::Result;
use crate::metrics::{self, Elapsed, Sla, SlaStatus, SubtaskProgress};
use crate::output::{emit_success, HumanOutput};
use crate::resolve::Directory;
use crate::task::{NewSubtask, NewTask, Subtask, SubtaskStatus, Task, TaskPatch, TaskService, TaskStatus};

use super::context::Context;
use super::FilterArgs;

pub struct AddOptions {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<u8>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub due: Option<String>,
    pub clients: Vec<String>,
    pub subtasks: Vec<String>,
}

pub struct EditOptions {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<u8>,
    pub category: Option<String>,
    pub start: Option<String>,
    pub clear_start: bool,
    pub end: Option<String>,
    pub clear_end: bool,
    pub due: Option<String>,
    pub clear_due: bool,
    pub clients: Vec<String>,
    pub clear_clients: bool,
}

#[derive(serde::Serialize)]
struct TaskListOutput {
    total: usize,
    tasks: Vec<Task>,
}

#[derive(serde::Serialize)]
struct TaskShowOutput {
    task: Task,
    category_name: String,
    client_names: Vec<String>,
    elapsed: Elapsed,
    sla: Sla,
    subtask_progress: SubtaskProgress,
}

#[derive(serde::Serialize)]
struct TaskRemoveOutput {
    id: String,
}

#[derive(serde::Serialize)]
struct SubtaskOutput {
    task_id: String,
    subtask: Subtask,
    subtask_progress: SubtaskProgress,
}

#[derive(serde::Serialize)]
struct SubtaskToggleOutput {
    task_id: String,
    subtask_id: String,
    status: SubtaskStatus,
    subtask_progress: SubtaskProgress,
}

fn parse_status(raw: Option<String>) -> Result<Option<TaskStatus>> {
    raw.map(|raw| raw.parse()).transpose()
}

/// `Some(None)` when clearing, `Some(Some(v))` when setting, `None` otherwise
fn clearable<T>(
    raw: Option<String>,
    clear: bool,
    parse: impl Fn(&str) -> Result<T>,
) -> Result<Option<Option<T>>> {
    if clear {
        return Ok(Some(None));
    }
    raw.map(|raw| parse(&raw).map(Some)).transpose()
}

pub(super) fn task_line(task: &Task, directory: &Directory) -> String {
    let mut line = format!(
        "{} [{}] p{} {} ({})",
        task.id,
        task.status,
        task.priority,
        task.name,
        directory.category_name_or_unknown(task.category())
    );
    if let Some(due) = task.delivery_date {
        line.push_str(&format!(" due {}", format_date(due)));
    }
    if !task.subtasks.is_empty() {
        let progress = metrics::subtask_progress(task);
        line.push_str(&format!(" {}/{}", progress.completed, progress.total));
    }
    line
}

fn warn_dangling(human: &mut HumanOutput, task: &Task, directory: &Directory) {
    if let Some(category) = task.category() {
        if directory.category(category).is_none() {
            human.push_warning(format!("category {category} does not exist"));
        }
    }
    for client in &task.clients {
        if directory.client(client).is_none() {
            human.push_warning(format!("client {client} does not exist"));
        }
    }
}

fn subtask_line(subtask: &Subtask) -> String {
    let mark = if subtask.is_done() { "x" } else { " " };
    format!("{}. [{mark}] {} ({})", subtask.order, subtask.name, subtask.id)
}

pub fn run_add(ctx: &Context, options: AddOptions) -> Result<()> {
    let draft = NewTask {
        name: options.name,
        description: options.description,
        status: parse_status(options.status)?,
        start_date_time: options.start.as_deref().map(parse_instant_arg).transpose()?,
        end_date_time: options.end.as_deref().map(parse_instant_arg).transpose()?,
        delivery_date: options.due.as_deref().map(parse_date_arg).transpose()?,
        category_id: options.category,
        clients: options.clients,
        subtasks: options.subtasks.into_iter().map(NewSubtask::named).collect(),
        priority: options.priority,
    };
    let task = TaskService::tasks(&ctx.store).create(draft)?;
    let directory = ctx.directory()?;

    let mut human = HumanOutput::new("Task created");
    human.push_summary("ID", task.id.clone());
    human.push_summary("Name", task.name.clone());
    human.push_summary("Status", task.status.to_string());
    human.push_summary(
        "Category",
        directory.category_name_or_unknown(task.category()).to_string(),
    );
    warn_dangling(&mut human, &task, &directory);
    human.push_next_step(format!("todo task status {} InProgress", task.id));
    emit_success(ctx.output, "task add", &task, Some(&human))
}

pub fn run_list(ctx: &Context, filter: FilterArgs) -> Result<()> {
    let filter = filter.to_filter()?;
    let tasks = TaskService::tasks(&ctx.store).filter(&filter)?;
    let directory = ctx.directory()?;

    let mut human = HumanOutput::new("Tasks");
    human.push_summary("Total", tasks.len().to_string());
    for task in &tasks {
        human.push_detail(task_line(task, &directory));
    }
    let output = TaskListOutput {
        total: tasks.len(),
        tasks,
    };
    emit_success(ctx.output, "task list", &output, Some(&human))
}

pub fn run_show(ctx: &Context, id: &str) -> Result<()> {
    let task = TaskService::tasks(&ctx.store).require(id)?;
    let directory = ctx.directory()?;
    let now = Local::now();

    let output = TaskShowOutput {
        category_name: directory
            .category_name_or_unknown(task.category())
            .to_string(),
        client_names: directory
            .client_names(&task.clients)
            .into_iter()
            .map(str::to_string)
            .collect(),
        elapsed: metrics::elapsed(&task, &now),
        sla: metrics::sla(&task, &now),
        subtask_progress: metrics::subtask_progress(&task),
        task,
    };

    let task = &output.task;
    let mut human = HumanOutput::new(format!("Task {}", task.id));
    human.push_summary("Name", task.name.clone());
    if !task.description.is_empty() {
        human.push_summary("Description", task.description.clone());
    }
    human.push_summary("Status", task.status.to_string());
    human.push_summary("Priority", task.priority.to_string());
    human.push_summary("Category", output.category_name.clone());
    if !output.client_names.is_empty() {
        human.push_summary("Clients", output.client_names.join(", "));
    }
    if let Some(start) = task.start_date_time {
        human.push_summary("Start", format_instant(&start));
    }
    if let Some(end) = task.end_date_time {
        human.push_summary("End", format_instant(&end));
    }
    if let Some(due) = task.delivery_date {
        human.push_summary("Due", format_date(due));
    }
    human.push_summary("Elapsed", output.elapsed.text.clone());
    if output.sla.status != SlaStatus::None {
        human.push_summary(
            "SLA",
            format!(
                "{} ({:.0}%, {})",
                output.sla.description,
                output.sla.percentage,
                output.sla.status.as_str()
            ),
        );
    }
    if !task.subtasks.is_empty() {
        let progress = output.subtask_progress;
        human.push_summary(
            "Subtasks",
            format!("{}/{} ({}%)", progress.completed, progress.total, progress.percentage),
        );
        for subtask in &task.subtasks {
            human.push_detail(subtask_line(subtask));
        }
    }
    if output.sla.status == SlaStatus::Overdue {
        human.push_warning(output.sla.description.clone());
    }
    human.push_summary("Created", format_instant(&task.created_at));
    human.push_summary("Updated", format_instant(&task.updated_at));
    emit_success(ctx.output, "task show", &output, Some(&human))
}

pub fn run_edit(ctx: &Context, options: EditOptions) -> Result<()> {
    let clients = if options.clear_clients {
        Some(Vec::new())
    } else if options.clients.is_empty() {
        None
    } else {
        Some(options.clients)
    };
    let patch = TaskPatch {
        name: options.name,
        description: options.description,
        status: parse_status(options.status)?,
        start_date_time: clearable(options.start, options.clear_start, parse_instant_arg)?,
        end_date_time: clearable(options.end, options.clear_end, parse_instant_arg)?,
        delivery_date: clearable(options.due, options.clear_due, parse_date_arg)?,
        category_id: options.category,
        clients,
        subtasks: None,
        priority: options.priority,
    };
    let task = TaskService::tasks(&ctx.store).update(&options.id, patch)?;
    let directory = ctx.directory()?;

    let mut human = HumanOutput::new("Task updated");
    human.push_summary("ID", task.id.clone());
    human.push_detail(task_line(&task, &directory));
    warn_dangling(&mut human, &task, &directory);
    emit_success(ctx.output, "task edit", &task, Some(&human))
}

pub fn run_rm(ctx: &Context, id: &str) -> Result<()> {
    TaskService::tasks(&ctx.store).delete(id)?;
    let mut human = HumanOutput::new("Task deleted");
    human.push_summary("ID", id.to_string());
    let output = TaskRemoveOutput { id: id.to_string() };
    emit_success(ctx.output, "task rm", &output, Some(&human))
}

pub fn run_status(ctx: &Context, id: &str, status: &str) -> Result<()> {
    let status: TaskStatus = status.parse()?;
    let task = TaskService::tasks(&ctx.store).set_status(id, status)?;
    let mut human = HumanOutput::new(format!("Task {} is now {}", task.id, task.status));
    if status == TaskStatus::InProgress && task.start_date_time.is_none() {
        human.push_next_step(format!(
            "todo task edit {} --start {}",
            task.id,
            Utc::now().format("%Y-%m-%dT%H:%M")
        ));
    }
    emit_success(ctx.output, "task status", &task, Some(&human))
}

pub fn run_subtask_add(
    ctx: &Context,
    task_id: &str,
    name: String,
    description: Option<String>,
) -> Result<()> {
    let (task, subtask) = TaskService::tasks(&ctx.store).add_subtask(
        task_id,
        NewSubtask {
            name,
            description,
            status: None,
        },
    )?;
    let mut human = HumanOutput::new("Subtask added");
    human.push_summary("Task", task.id.clone());
    human.push_detail(subtask_line(&subtask));
    let output = SubtaskOutput {
        task_id: task.id.clone(),
        subtask,
        subtask_progress: metrics::subtask_progress(&task),
    };
    emit_success(ctx.output, "task subtask add", &output, Some(&human))
}

pub fn run_subtask_toggle(ctx: &Context, task_id: &str, subtask_id: &str) -> Result<()> {
    let (task, status) = TaskService::tasks(&ctx.store).toggle_subtask(task_id, subtask_id)?;
    let progress = metrics::subtask_progress(&task);
    let mut human = HumanOutput::new(format!("Subtask {subtask_id} is now {status}"));
    human.push_summary(
        "Progress",
        format!("{}/{} ({}%)", progress.completed, progress.total, progress.percentage),
    );
    if task.all_subtasks_done() && !task.status.is_closed() {
        human.push_next_step(format!("todo task status {} Done", task.id));
    }
    let output = SubtaskToggleOutput {
        task_id: task.id.clone(),
        subtask_id: subtask_id.to_string(),
        status,
        subtask_progress: progress,
    };
    emit_success(ctx.output, "task subtask toggle", &output, Some(&human))
}

pub fn run_subtask_rm(ctx: &Context, task_id: &str, subtask_id: &str) -> Result<()> {
    let (task, subtask) = TaskService::tasks(&ctx.store).remove_subtask(task_id, subtask_id)?;
    let mut human = HumanOutput::new("Subtask removed");
    human.push_summary("Task", task.id.clone());
    human.push_summary("Subtask", subtask.name.clone());
    let output = SubtaskOutput {
        task_id: task.id.clone(),
        subtask,
        subtask_progress: metrics::subtask_progress(&task),
    };
    emit_success(ctx.output, "task subtask rm", &output, Some(&human))
}

pub fn run_subtask_move(ctx: &Context, task_id: &str, subtask_id: &str, position: usize) -> Result<()> {
    let task = TaskService::tasks(&ctx.store).move_subtask(task_id, subtask_id, position)?;
    let mut human = HumanOutput::new("Subtasks reordered");
    for subtask in &task.subtasks {
        human.push_detail(subtask_line(subtask));
    }
    emit_success(ctx.output, "task subtask move", &task, Some(&human))
}

pub fn run_normalize(ctx: &Context) -> Result<()> {
    let report = TaskService::tasks(&ctx.store).normalize()?;
    let header = if report.rewritten == 0 {
        "todo normalize: nothing to do".to_string()
    } else {
        format!("todo normalize: rewrote {} task(s)", report.rewritten)
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("Scanned", report.scanned.to_string());
    human.push_summary("Rewritten", report.rewritten.to_string());
    for id in &report.skipped {
        human.push_warning(format!("task {id} could not be read and was left as is"));
    }
    emit_success(ctx.output, "normalize", &report, Some(&human))
}
