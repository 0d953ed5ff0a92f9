//! todo dashboard command implementation.

use chrono::Local;

use crate::error::Result;
use crate::metrics::{self, SlaStatus};
use crate::output::{emit_success, HumanOutput};
use crate::task::TaskService;

use super::context::Context;
use super::FilterArgs;

pub fn run(ctx: &Context, filter: FilterArgs) -> Result<()> {
    let filter = filter.to_filter()?;
    let tasks = TaskService::tasks(&ctx.store).filter(&filter)?;
    let directory = ctx.directory()?;
    let report = metrics::dashboard(&tasks, &directory, &Local::now());

    let mut human = HumanOutput::new("Dashboard");
    human.push_summary("Total", report.total_tasks.to_string());
    for (status, count) in &report.status_counts {
        human.push_summary(status.as_str(), count.to_string());
    }
    human.push_summary("On time", report.on_time.to_string());
    human.push_summary("Overdue", report.overdue.to_string());

    for entry in &report.tasks {
        let mut line = format!(
            "{} | {} [{}] {}",
            entry.category_name, entry.task.id, entry.task.status, entry.task.name
        );
        if entry.sla.status != SlaStatus::None {
            line.push_str(&format!(
                " | SLA {:.0}% {}",
                entry.sla.percentage, entry.sla.description
            ));
        }
        human.push_detail(line);
        if entry.sla.status == SlaStatus::Overdue {
            human.push_warning(format!("{}: {}", entry.task.name, entry.sla.description));
        }
    }

    emit_success(ctx.output, "dashboard", &report, Some(&human))
}
