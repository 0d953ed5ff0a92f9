//! todo remind command implementation.

use chrono::Local;
use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::remind::{self, ReminderSettings};
use crate::resolve::Directory;
use crate::store::Store;
use crate::task::Task;

use super::context::Context;
use super::task::task_line;

#[derive(Serialize)]
struct ReminderOutput {
    date: String,
    tasks: Vec<Task>,
}

fn emit_due(output: OutputOptions, store: &Store, tasks: Vec<Task>) -> Result<()> {
    let directory = Directory::load(store)?;
    let date = crate::dates::format_date(Local::now().date_naive());

    let mut human = HumanOutput::new(format!("Due today ({date})"));
    human.push_summary("Tasks", tasks.len().to_string());
    for task in &tasks {
        human.push_detail(task_line(task, &directory));
    }
    if tasks.is_empty() {
        human.push_detail("nothing due today");
    }

    let payload = ReminderOutput { date, tasks };
    emit_success(output, "remind", &payload, Some(&human))
}

pub fn run(ctx: &Context, once: bool) -> Result<()> {
    let settings = ReminderSettings::from(&ctx.config.reminders);

    if once {
        let due = remind::check(&ctx.store, &settings, Local::now().date_naive())?;
        return emit_due(ctx.output, &ctx.store, due);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let output = ctx.output;
    let store = ctx.store.clone();
    runtime.block_on(async move {
        let sink_store = store.clone();
        let handle = remind::spawn(store, settings, move |due| {
            if let Err(err) = emit_due(output, &sink_store, due) {
                tracing::error!(error = %err, "failed to print reminder");
            }
        })?;
        tokio::signal::ctrl_c().await?;
        info!("interrupt received, stopping reminders");
        handle.stop().await;
        Ok::<(), Error>(())
    })
}
