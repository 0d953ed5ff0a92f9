//! todo category command implementations.

use crate::category::{Category, CategoryPatch, CategoryService, NewCategory};
use crate::dates::format_instant;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::task::TaskService;

use super::context::Context;

pub struct AddOptions {
    pub name: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub priority: Option<u8>,
}

pub struct EditOptions {
    pub id: String,
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub priority: Option<u8>,
}

#[derive(serde::Serialize)]
struct CategoryListOutput {
    total: usize,
    categories: Vec<Category>,
}

#[derive(serde::Serialize)]
struct CategoryShowOutput {
    #[serde(flatten)]
    category: Category,
    task_count: usize,
}

#[derive(serde::Serialize)]
struct CategoryRemoveOutput {
    id: String,
    referencing_tasks: usize,
}

fn category_line(category: &Category) -> String {
    format!(
        "{} p{} {} ({}, {})",
        category.id, category.priority, category.name, category.color, category.icon
    )
}

pub fn run_add(ctx: &Context, options: AddOptions) -> Result<()> {
    let category = CategoryService::categories(&ctx.store).create(NewCategory {
        name: options.name,
        color: options.color,
        icon: options.icon,
        priority: options.priority,
    })?;
    let mut human = HumanOutput::new("Category created");
    human.push_summary("ID", category.id.clone());
    human.push_summary("Name", category.name.clone());
    human.push_summary("Priority", category.priority.to_string());
    human.push_next_step(format!("todo task add <name> --category {}", category.id));
    emit_success(ctx.output, "category add", &category, Some(&human))
}

pub fn run_list(ctx: &Context) -> Result<()> {
    let categories = CategoryService::categories(&ctx.store).get_all()?;
    let mut human = HumanOutput::new("Categories");
    human.push_summary("Total", categories.len().to_string());
    for category in &categories {
        human.push_detail(category_line(category));
    }
    let output = CategoryListOutput {
        total: categories.len(),
        categories,
    };
    emit_success(ctx.output, "category list", &output, Some(&human))
}

pub fn run_show(ctx: &Context, id: &str) -> Result<()> {
    let category = CategoryService::categories(&ctx.store).require(id)?;
    let task_count = TaskService::tasks(&ctx.store).by_category(id)?.len();
    let mut human = HumanOutput::new(format!("Category {}", category.id));
    human.push_summary("Name", category.name.clone());
    human.push_summary("Color", category.color.clone());
    human.push_summary("Icon", category.icon.clone());
    human.push_summary("Priority", category.priority.to_string());
    human.push_summary("Tasks", task_count.to_string());
    human.push_summary("Created", format_instant(&category.created_at));
    human.push_summary("Updated", format_instant(&category.updated_at));
    let output = CategoryShowOutput {
        category,
        task_count,
    };
    emit_success(ctx.output, "category show", &output, Some(&human))
}

pub fn run_edit(ctx: &Context, options: EditOptions) -> Result<()> {
    let category = CategoryService::categories(&ctx.store).update(
        &options.id,
        CategoryPatch {
            name: options.name,
            color: options.color,
            icon: options.icon,
            priority: options.priority,
        },
    )?;
    let mut human = HumanOutput::new("Category updated");
    human.push_summary("ID", category.id.clone());
    human.push_detail(category_line(&category));
    emit_success(ctx.output, "category edit", &category, Some(&human))
}

pub fn run_rm(ctx: &Context, id: &str) -> Result<()> {
    let referencing_tasks = TaskService::tasks(&ctx.store).by_category(id)?.len();
    CategoryService::categories(&ctx.store).delete(id)?;
    let mut human = HumanOutput::new("Category deleted");
    human.push_summary("ID", id.to_string());
    if referencing_tasks > 0 {
        human.push_warning(format!(
            "{referencing_tasks} task(s) still reference {id} and will show as Unknown"
        ));
    }
    let output = CategoryRemoveOutput {
        id: id.to_string(),
        referencing_tasks,
    };
    emit_success(ctx.output, "category rm", &output, Some(&human))
}
