//! todo client command implementations.

use crate::client::{Client, ClientPatch, ClientService, NewClient};
use crate::dates::format_instant;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::task::{TaskFilter, TaskService};

use super::context::Context;

pub struct AddOptions {
    pub name: String,
    pub description: Option<String>,
    pub priority: Option<u8>,
}

pub struct EditOptions {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<u8>,
}

#[derive(serde::Serialize)]
struct ClientListOutput {
    total: usize,
    clients: Vec<Client>,
}

#[derive(serde::Serialize)]
struct ClientShowOutput {
    #[serde(flatten)]
    client: Client,
    task_count: usize,
}

#[derive(serde::Serialize)]
struct ClientRemoveOutput {
    id: String,
    referencing_tasks: usize,
}

fn tasks_for(ctx: &Context, id: &str) -> Result<usize> {
    let filter = TaskFilter {
        client: Some(id.to_string()),
        ..TaskFilter::default()
    };
    Ok(TaskService::tasks(&ctx.store).filter(&filter)?.len())
}

pub fn run_add(ctx: &Context, options: AddOptions) -> Result<()> {
    let client = ClientService::clients(&ctx.store).create(NewClient {
        name: options.name,
        description: options.description,
        priority: options.priority,
    })?;
    let mut human = HumanOutput::new("Client created");
    human.push_summary("ID", client.id.clone());
    human.push_summary("Name", client.name.clone());
    human.push_summary("Priority", client.priority.to_string());
    emit_success(ctx.output, "client add", &client, Some(&human))
}

pub fn run_list(ctx: &Context) -> Result<()> {
    let clients = ClientService::clients(&ctx.store).get_all()?;
    let mut human = HumanOutput::new("Clients");
    human.push_summary("Total", clients.len().to_string());
    for client in &clients {
        human.push_detail(format!("{} p{} {}", client.id, client.priority, client.name));
    }
    let output = ClientListOutput {
        total: clients.len(),
        clients,
    };
    emit_success(ctx.output, "client list", &output, Some(&human))
}

pub fn run_show(ctx: &Context, id: &str) -> Result<()> {
    let client = ClientService::clients(&ctx.store).require(id)?;
    let task_count = tasks_for(ctx, id)?;
    let mut human = HumanOutput::new(format!("Client {}", client.id));
    human.push_summary("Name", client.name.clone());
    if !client.description.is_empty() {
        human.push_summary("Description", client.description.clone());
    }
    human.push_summary("Priority", client.priority.to_string());
    human.push_summary("Tasks", task_count.to_string());
    human.push_summary("Created", format_instant(&client.created_at));
    human.push_summary("Updated", format_instant(&client.updated_at));
    let output = ClientShowOutput { client, task_count };
    emit_success(ctx.output, "client show", &output, Some(&human))
}

pub fn run_edit(ctx: &Context, options: EditOptions) -> Result<()> {
    let client = ClientService::clients(&ctx.store).update(
        &options.id,
        ClientPatch {
            name: options.name,
            description: options.description,
            priority: options.priority,
        },
    )?;
    let mut human = HumanOutput::new("Client updated");
    human.push_summary("ID", client.id.clone());
    human.push_summary("Name", client.name.clone());
    human.push_summary("Priority", client.priority.to_string());
    emit_success(ctx.output, "client edit", &client, Some(&human))
}

pub fn run_rm(ctx: &Context, id: &str) -> Result<()> {
    let referencing_tasks = tasks_for(ctx, id)?;
    ClientService::clients(&ctx.store).delete(id)?;
    let mut human = HumanOutput::new("Client deleted");
    human.push_summary("ID", id.to_string());
    if referencing_tasks > 0 {
        human.push_warning(format!(
            "{referencing_tasks} task(s) still reference {id} and will show as Unknown"
        ));
    }
    let output = ClientRemoveOutput {
        id: id.to_string(),
        referencing_tasks,
    };
    emit_success(ctx.output, "client rm", &output, Some(&human))
}
