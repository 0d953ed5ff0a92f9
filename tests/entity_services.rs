mod support;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use todolist::category::{CategoryPatch, CategoryService, NewCategory};
use todolist::client::{ClientService, NewClient};
use todolist::error::Error;
use todolist::metrics;
use todolist::resolve::{Directory, UNKNOWN_NAME};
use todolist::task::{NewSubtask, NewTask, TaskFilter, TaskPatch, TaskService, TaskStatus};

use support::TestStore;

#[test]
fn created_entities_read_back_equal() {
    let scratch = TestStore::new();
    let store = scratch.open();

    let category = CategoryService::categories(&store)
        .create(NewCategory::named("Work"))
        .expect("create category");
    let client = ClientService::clients(&store)
        .create(NewClient::named("Acme"))
        .expect("create client");
    let mut draft = NewTask::new("Quarterly report", &category.id);
    draft.clients = vec![client.id.clone()];
    draft.subtasks = vec![NewSubtask::named("Collect"), NewSubtask::named("Write")];
    draft.delivery_date = NaiveDate::from_ymd_opt(2030, 1, 15);
    let task = TaskService::tasks(&store).create(draft).expect("create task");
    assert!(task.id.starts_with("task_"));
    assert_eq!(task.created_at, task.updated_at);

    assert_eq!(
        CategoryService::categories(&store).get_by_id(&category.id).expect("get"),
        Some(category)
    );
    assert_eq!(
        ClientService::clients(&store).get_by_id(&client.id).expect("get"),
        Some(client)
    );
    assert_eq!(
        TaskService::tasks(&store).get_by_id(&task.id).expect("get"),
        Some(task)
    );
}

#[test]
fn update_keeps_id_and_created_at_and_advances_updated_at() {
    let scratch = TestStore::new();
    let store = scratch.open();
    let categories = CategoryService::categories(&store);

    let created_at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    let category = categories
        .create_at(NewCategory::named("Home"), created_at)
        .expect("create");

    let later = created_at + Duration::hours(2);
    let updated = categories
        .update_at(
            &category.id,
            CategoryPatch {
                name: Some("House".to_string()),
                priority: Some(7),
                ..CategoryPatch::default()
            },
            later,
        )
        .expect("update");

    assert_eq!(updated.id, category.id);
    assert_eq!(updated.created_at, category.created_at);
    assert!(updated.updated_at >= category.updated_at);
    assert_eq!(updated.name, "House");
    assert_eq!(updated.color, category.color);

    // A clock that moved backwards never moves updated_at backwards.
    let earlier = created_at - Duration::days(1);
    let again = categories
        .update_at(&category.id, CategoryPatch::default(), earlier)
        .expect("update");
    assert_eq!(again.updated_at, updated.updated_at);
}

#[test]
fn update_of_missing_record_is_not_found() {
    let scratch = TestStore::new();
    let store = scratch.open();

    let err = TaskService::tasks(&store)
        .update("task_missing", TaskPatch::default())
        .expect_err("missing task");
    assert!(matches!(err, Error::NotFound { .. }));
}

#[test]
fn invalid_entities_are_rejected_without_writing() {
    let scratch = TestStore::new();
    let store = scratch.open();
    let tasks = TaskService::tasks(&store);

    let mut draft = NewTask::new("  ", "");
    draft.priority = Some(11);
    let err = tasks.create(draft).expect_err("invalid task");
    match err {
        Error::Validation { reasons, .. } => assert_eq!(reasons.len(), 3, "{reasons:?}"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(tasks.get_all().expect("list").is_empty());
}

#[test]
fn filter_matches_only_tasks_passing_every_criterion() {
    let scratch = TestStore::new();
    let store = scratch.open();
    let tasks = TaskService::tasks(&store);

    let mut a = NewTask::new("Fix login bug", "cat_dev");
    a.clients = vec!["client_a".to_string()];
    a.status = Some(TaskStatus::InProgress);
    let a = tasks.create(a).expect("create");

    let mut b = NewTask::new("Write docs", "cat_dev");
    b.description = Some("login flow".to_string());
    let b = tasks.create(b).expect("create");

    tasks.create(NewTask::new("Groceries", "cat_home")).expect("create");

    let by_search = tasks
        .filter(&TaskFilter {
            search: Some("LOGIN".to_string()),
            ..TaskFilter::default()
        })
        .expect("filter");
    let mut ids: Vec<_> = by_search.iter().map(|t| t.id.clone()).collect();
    ids.sort();
    let mut expected = vec![a.id.clone(), b.id.clone()];
    expected.sort();
    assert_eq!(ids, expected);

    let combined = tasks
        .filter(&TaskFilter {
            search: Some("login".to_string()),
            status: Some(TaskStatus::InProgress),
            category: Some("cat_dev".to_string()),
            client: Some("client_a".to_string()),
        })
        .expect("filter");
    assert_eq!(combined.len(), 1);
    assert_eq!(combined[0].id, a.id);

    let empty = tasks
        .filter(&TaskFilter {
            search: Some(String::new()),
            category: Some(String::new()),
            ..TaskFilter::default()
        })
        .expect("filter");
    assert_eq!(empty.len(), 3);
}

#[test]
fn deleted_category_resolves_to_unknown() {
    let scratch = TestStore::new();
    let store = scratch.open();

    let category = CategoryService::categories(&store)
        .create(NewCategory::named("Side project"))
        .expect("create");
    let task = TaskService::tasks(&store)
        .create(NewTask::new("Ship it", &category.id))
        .expect("create");

    CategoryService::categories(&store)
        .delete(&category.id)
        .expect("delete");

    let reloaded = TaskService::tasks(&store).require(&task.id).expect("task survives");
    assert_eq!(reloaded.category(), Some(category.id.as_str()));

    let directory = Directory::load(&store).expect("directory");
    assert_eq!(directory.category_name_or_unknown(reloaded.category()), UNKNOWN_NAME);

    let report = metrics::dashboard(&[reloaded], &directory, &Utc::now());
    assert_eq!(report.tasks[0].category_name, UNKNOWN_NAME);
}

#[test]
fn index_queries_follow_updates() {
    let scratch = TestStore::new();
    let store = scratch.open();
    let tasks = TaskService::tasks(&store);

    let task = tasks.create(NewTask::new("Plan", "cat_1")).expect("create");
    assert_eq!(tasks.by_status(TaskStatus::New).expect("query").len(), 1);

    tasks.set_status(&task.id, TaskStatus::Paused).expect("status");
    assert!(tasks.by_status(TaskStatus::New).expect("query").is_empty());
    assert_eq!(tasks.by_status(TaskStatus::Paused).expect("query").len(), 1);

    tasks
        .update(
            &task.id,
            TaskPatch {
                category_id: Some("cat_2".to_string()),
                ..TaskPatch::default()
            },
        )
        .expect("update");
    assert!(tasks.by_category("cat_1").expect("query").is_empty());
    assert_eq!(tasks.by_category("cat_2").expect("query").len(), 1);
}

#[test]
fn subtask_operations_keep_order_dense_and_gate_done() {
    let scratch = TestStore::new();
    let store = scratch.open();
    let tasks = TaskService::tasks(&store);

    let task = tasks.create(NewTask::new("Release", "cat_1")).expect("create");
    let (_, first) = tasks
        .add_subtask(&task.id, NewSubtask::named("Tag"))
        .expect("add");
    let (_, second) = tasks
        .add_subtask(&task.id, NewSubtask::named("Publish"))
        .expect("add");

    let moved = tasks.move_subtask(&task.id, &second.id, 0).expect("move");
    let order: Vec<_> = moved.subtasks.iter().map(|s| (s.id.clone(), s.order)).collect();
    assert_eq!(order, vec![(second.id.clone(), 0), (first.id.clone(), 1)]);

    let err = tasks
        .set_status(&task.id, TaskStatus::Done)
        .expect_err("pending subtasks");
    assert!(matches!(err, Error::Validation { .. }));

    tasks.toggle_subtask(&task.id, &first.id).expect("toggle");
    tasks.toggle_subtask(&task.id, &second.id).expect("toggle");
    let done = tasks.set_status(&task.id, TaskStatus::Done).expect("done");
    assert_eq!(metrics::subtask_progress(&done).percentage, 100);

    let (after, removed) = tasks.remove_subtask(&task.id, &second.id).expect("remove");
    assert_eq!(removed.id, second.id);
    assert_eq!(after.subtasks.len(), 1);
    assert_eq!(after.subtasks[0].order, 0);
}
