mod support;

use chrono::{TimeZone, Utc};
use serde_json::json;
use todolist::backup::{self, Counts, BACKUP_VERSION};
use todolist::category::{CategoryService, NewCategory};
use todolist::client::{ClientService, NewClient};
use todolist::config::UserProfile;
use todolist::error::Error;
use todolist::store::Collection;
use todolist::task::{NewSubtask, NewTask, TaskService};

use support::TestStore;

fn profile() -> UserProfile {
    UserProfile {
        name: "Sam".to_string(),
        email: "sam@example.com".to_string(),
        company: "Example Co".to_string(),
    }
}

fn seed(store: &todolist::store::Store) {
    let category = CategoryService::categories(store)
        .create(NewCategory::named("Work"))
        .expect("category");
    let client = ClientService::clients(store)
        .create(NewClient::named("Acme"))
        .expect("client");
    let mut draft = NewTask::new("Report", &category.id);
    draft.clients = vec![client.id];
    draft.subtasks = vec![NewSubtask::named("Draft")];
    TaskService::tasks(store).create(draft).expect("task");
    TaskService::tasks(store)
        .create(NewTask::new("Review", &category.id))
        .expect("task");
}

#[test]
fn export_then_import_restores_same_records() {
    let source = TestStore::new();
    let store = source.open();
    seed(&store);

    let exported_at = Utc.with_ymd_and_hms(2024, 6, 10, 12, 30, 0).unwrap();
    let exported = backup::export_at(&store, &profile(), exported_at).expect("export");
    assert_eq!(exported.version, BACKUP_VERSION);
    assert_eq!(
        exported.data.counts(),
        Counts {
            categories: 1,
            tasks: 2,
            clients: 1
        }
    );
    let raw = serde_json::to_string(&exported).expect("serialize");

    let target = TestStore::new();
    let other = target.open();
    CategoryService::categories(&other)
        .create(NewCategory::named("Stale"))
        .expect("stale category");

    let report = backup::import(&other, &raw).expect("import");
    assert_eq!(report.restored, exported.data.counts());
    assert_eq!(report.cleared.categories, 1);
    assert_eq!(report.user_profile, Some(profile()));

    let restored = backup::export_at(&other, &profile(), exported_at).expect("export");
    assert_eq!(restored.data.categories, exported.data.categories);
    assert_eq!(restored.data.tasks, exported.data.tasks);
    assert_eq!(restored.data.clients, exported.data.clients);
}

#[test]
fn missing_collection_is_rejected_and_store_untouched() {
    let scratch = TestStore::new();
    let store = scratch.open();
    seed(&store);

    let raw = json!({
        "version": "1.0",
        "exportDate": "2024-06-10T12:30:00.000Z",
        "data": { "categories": [], "tasks": [] }
    })
    .to_string();

    let err = backup::import(&store, &raw).expect_err("missing clients");
    match err {
        Error::Format(message) => assert!(message.contains("data.clients"), "{message}"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.count(Collection::Categories).expect("count"), 1);
    assert_eq!(store.count(Collection::Tasks).expect("count"), 2);
    assert_eq!(store.count(Collection::Clients).expect("count"), 1);
}

#[test]
fn non_json_backup_is_a_format_error() {
    let scratch = TestStore::new();
    let store = scratch.open();

    let err = backup::import(&store, "not json at all").expect_err("bad json");
    assert!(matches!(err, Error::Format(_)));
    assert_eq!(err.exit_code(), todolist::error::exit_codes::REJECTED);
}

#[test]
fn legacy_backup_records_import() {
    let scratch = TestStore::new();
    let store = scratch.open();

    let raw = json!({
        "version": "1.0",
        "exportDate": "2024-06-10T12:30:00.000Z",
        "data": {
            "categories": [{
                "id": "cat_legacy",
                "name": "Old",
                "createdAt": "2023-01-01T00:00:00.000Z",
                "updatedAt": "2023-01-01T00:00:00.000Z"
            }],
            "tasks": [{
                "id": "task_legacy",
                "name": "Old task",
                "status": "Em Andamento",
                "startDateTime": "",
                "deliveryDate": "2023-02-01",
                "categoryId": "cat_legacy",
                "clients": null,
                "createdAt": "2023-01-01T00:00:00.000Z",
                "updatedAt": "2023-01-01T00:00:00.000Z"
            }],
            "clients": []
        }
    })
    .to_string();

    let report = backup::import(&store, &raw).expect("import");
    assert_eq!(report.restored.tasks, 1);
    assert!(report.user_profile.is_none());

    let task = TaskService::tasks(&store)
        .require("task_legacy")
        .expect("restored task");
    assert_eq!(task.status, todolist::task::TaskStatus::InProgress);
    assert!(task.start_date_time.is_none());
    assert!(task.clients.is_empty());
}

#[test]
fn clear_all_empties_every_collection() {
    let scratch = TestStore::new();
    let store = scratch.open();
    seed(&store);

    let cleared = backup::clear_all(&store).expect("clear");
    assert_eq!(
        cleared,
        Counts {
            categories: 1,
            tasks: 2,
            clients: 1
        }
    );
    for collection in Collection::ALL {
        assert_eq!(store.count(collection).expect("count"), 0);
    }
    // The store stays usable after a clear.
    CategoryService::categories(&store)
        .create(NewCategory::named("Fresh"))
        .expect("create after clear");
}

#[test]
fn data_only_backup_imports_with_defaults() {
    let scratch = TestStore::new();
    let store = scratch.open();
    seed(&store);

    let raw = json!({"data": {"categories": [], "tasks": [], "clients": []}}).to_string();
    let parsed = backup::parse(&raw).expect("parse");
    assert_eq!(parsed.version, BACKUP_VERSION);
    assert!(parsed.export_date.is_none());

    let report = backup::import(&store, &raw).expect("import");
    assert_eq!(report.restored, Counts::default());
    assert_eq!(
        report.cleared,
        Counts {
            categories: 1,
            tasks: 2,
            clients: 1
        }
    );
    for collection in Collection::ALL {
        assert_eq!(store.count(collection).expect("count"), 0);
    }
}

#[test]
fn duplicate_task_ids_stop_restore_after_earlier_records() {
    let scratch = TestStore::new();
    let store = scratch.open();
    seed(&store);

    let task = |name: &str| {
        json!({
            "id": "task_dup",
            "name": name,
            "status": "New",
            "categoryId": "cat_restored",
            "createdAt": "2024-06-10T12:00:00.000Z",
            "updatedAt": "2024-06-10T12:00:00.000Z"
        })
    };
    let raw = json!({
        "version": "1.0",
        "data": {
            "categories": [{
                "id": "cat_restored",
                "name": "Restored",
                "createdAt": "2024-06-10T12:00:00.000Z",
                "updatedAt": "2024-06-10T12:00:00.000Z"
            }],
            "tasks": [task("First"), task("Second")],
            "clients": [{
                "id": "client_restored",
                "name": "Never written",
                "createdAt": "2024-06-10T12:00:00.000Z",
                "updatedAt": "2024-06-10T12:00:00.000Z"
            }]
        }
    })
    .to_string();

    let err = backup::import(&store, &raw).expect_err("duplicate id");
    match err {
        Error::DuplicateKey { collection, id } => {
            assert_eq!(collection, "tasks");
            assert_eq!(id, "task_dup");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // Records before the failing one stay written; later collections stay empty.
    assert_eq!(store.count(Collection::Categories).expect("count"), 1);
    assert!(CategoryService::categories(&store)
        .get_by_id("cat_restored")
        .expect("get")
        .is_some());
    assert_eq!(store.count(Collection::Tasks).expect("count"), 1);
    let kept = TaskService::tasks(&store).require("task_dup").expect("first task");
    assert_eq!(kept.name, "First");
    assert_eq!(store.count(Collection::Clients).expect("count"), 0);
}
