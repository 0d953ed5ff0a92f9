mod support;

use predicates::str::contains;
use serde_json::Value;

use support::{todo_cmd, TestStore};

fn id_of(value: &Value) -> String {
    value["data"]["id"].as_str().expect("record id").to_string()
}

#[test]
fn todo_help_works() {
    todo_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("personal task tracking"));
}

#[test]
fn subcommand_help_works() {
    let subcommands = [
        "init",
        "category",
        "client",
        "task",
        "dashboard",
        "backup",
        "clear",
        "normalize",
        "profile",
        "remind",
    ];

    for cmd in subcommands {
        todo_cmd().arg(cmd).arg("--help").assert().success();
    }
}

#[test]
fn init_creates_store_and_reports_version() {
    let scratch = TestStore::new();
    let value = scratch.json(&["init"]);
    assert_eq!(value["schema_version"], "todo.v1");
    assert_eq!(value["command"], "init");
    assert_eq!(value["status"], "success");
    assert_eq!(value["data"]["created_store"], true);
    assert_eq!(value["data"]["version"], 1);

    let again = scratch.json(&["init"]);
    assert_eq!(again["data"]["created_store"], false);
}

#[test]
fn task_lifecycle_through_cli() {
    let scratch = TestStore::new();
    let category = id_of(&scratch.json(&["category", "add", "Work", "-p", "5"]));
    let client = id_of(&scratch.json(&["client", "add", "Acme"]));

    let task = scratch.json(&[
        "task",
        "add",
        "Write report",
        "--category",
        &category,
        "--client",
        &client,
        "--subtask",
        "Outline",
        "--subtask",
        "Draft",
        "--due",
        "2030-01-15",
    ]);
    let task_id = id_of(&task);
    assert_eq!(task["data"]["status"], "New");
    assert_eq!(task["data"]["deliveryDate"], "2030-01-15");
    let subtasks = task["data"]["subtasks"].as_array().expect("subtasks");
    assert_eq!(subtasks.len(), 2);
    assert_eq!(subtasks[1]["order"], 1);
    let first_subtask = subtasks[0]["id"].as_str().expect("subtask id").to_string();

    let shown = scratch.json(&["task", "show", &task_id]);
    assert_eq!(shown["data"]["category_name"], "Work");
    assert_eq!(shown["data"]["client_names"][0], "Acme");
    assert_eq!(shown["data"]["elapsed"]["text"], "Not started");
    assert_eq!(shown["data"]["sla"]["status"], "none");

    let toggled = scratch.json(&["task", "subtask", "toggle", &task_id, &first_subtask]);
    assert_eq!(toggled["data"]["status"], "Done");
    assert_eq!(toggled["data"]["subtask_progress"]["percentage"], 50);

    let status = scratch.json(&["task", "status", &task_id, "in-progress"]);
    assert_eq!(status["data"]["status"], "InProgress");

    let listed = scratch.json(&["task", "list", "--status", "InProgress"]);
    assert_eq!(listed["data"]["total"], 1);
    let none = scratch.json(&["task", "list", "--search", "groceries"]);
    assert_eq!(none["data"]["total"], 0);

    let dashboard = scratch.json(&["dashboard"]);
    assert_eq!(dashboard["data"]["totalTasks"], 1);
    assert_eq!(dashboard["data"]["statusCounts"]["InProgress"], 1);
    assert_eq!(dashboard["data"]["statusCounts"]["Done"], 0);
    assert_eq!(dashboard["data"]["tasks"][0]["categoryName"], "Work");
}

#[test]
fn done_with_pending_subtask_is_rejected() {
    let scratch = TestStore::new();
    let category = id_of(&scratch.json(&["category", "add", "Work"]));
    let task_id = id_of(&scratch.json(&[
        "task", "add", "Ship", "--category", &category, "--subtask", "Test",
    ]));

    let output = scratch
        .cmd()
        .args(["--json", "task", "status", &task_id, "Done"])
        .assert()
        .code(3)
        .get_output()
        .stdout
        .clone();
    let value: Value = serde_json::from_slice(&output).expect("error envelope");
    assert_eq!(value["status"], "error");
    assert_eq!(value["command"], "task status");
    assert_eq!(value["error"]["kind"], "validation");
    assert_eq!(value["error"]["details"]["entity"], "task");
}

#[test]
fn unknown_id_exits_with_user_error() {
    let scratch = TestStore::new();
    scratch
        .cmd()
        .args(["task", "show", "task_missing"])
        .assert()
        .code(2)
        .stderr(contains("task_missing"));
}

#[test]
fn invalid_priority_lists_reason() {
    let scratch = TestStore::new();
    scratch
        .cmd()
        .args(["category", "add", "Work", "--priority", "0"])
        .assert()
        .code(3)
        .stderr(contains("priority must be between 1 and 10"));
}

#[test]
fn deleted_category_shows_as_unknown() {
    let scratch = TestStore::new();
    let category = id_of(&scratch.json(&["category", "add", "Temp"]));
    let task_id = id_of(&scratch.json(&["task", "add", "Orphan", "--category", &category]));

    scratch.json(&["category", "rm", &category]);

    let shown = scratch.json(&["task", "show", &task_id]);
    assert_eq!(shown["data"]["category_name"], "Unknown");
    assert_eq!(shown["data"]["task"]["categoryId"], category.as_str());
}

#[test]
fn backup_export_import_round_trip() {
    let scratch = TestStore::new();
    let category = id_of(&scratch.json(&["category", "add", "Work"]));
    scratch.json(&["task", "add", "Keep me", "--category", &category]);
    scratch.json(&["profile", "set", "--name", "Sam"]);

    let file = scratch.path().join("backup.json");
    let file_arg = file.to_str().expect("utf-8 path");
    let exported = scratch.json(&["backup", "export", "--output", file_arg]);
    assert_eq!(exported["data"]["counts"]["tasks"], 1);

    scratch.json(&["clear", "--yes"]);
    let empty = scratch.json(&["task", "list"]);
    assert_eq!(empty["data"]["total"], 0);

    scratch
        .cmd()
        .args(["backup", "import", file_arg])
        .assert()
        .code(2)
        .stderr(contains("--yes"));

    let imported = scratch.json(&["backup", "import", file_arg, "--yes"]);
    assert_eq!(imported["data"]["restored"]["tasks"], 1);
    assert_eq!(imported["data"]["restored"]["categories"], 1);
    assert_eq!(imported["data"]["profile_restored"], true);

    let listed = scratch.json(&["task", "list"]);
    assert_eq!(listed["data"]["tasks"][0]["name"], "Keep me");
}

#[test]
fn malformed_backup_is_rejected_before_confirmation() {
    let scratch = TestStore::new();
    let path = scratch
        .write_file("broken.json", r#"{"version":"1.0","data":{"tasks":[]}}"#)
        .expect("write backup");

    scratch
        .cmd()
        .args(["backup", "import", path.to_str().expect("utf-8 path")])
        .assert()
        .code(3)
        .stderr(contains("data.categories"));
}

#[test]
fn remind_once_reports_due_tasks() {
    let scratch = TestStore::new();
    let category = id_of(&scratch.json(&["category", "add", "Work"]));
    let today = chrono::Local::now().date_naive().format("%Y-%m-%d").to_string();
    scratch.json(&[
        "task", "add", "Due now", "--category", &category, "--due", &today,
    ]);
    scratch.json(&["task", "add", "Someday", "--category", &category]);

    let value = scratch.json(&["remind", "--once"]);
    let tasks = value["data"]["tasks"].as_array().expect("tasks");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["name"], "Due now");
}

#[test]
fn invalid_config_exits_with_user_error() {
    let scratch = TestStore::new();
    scratch
        .write_config("[reminders]\ninterval_minutes = 0\n")
        .expect("write config");
    scratch
        .cmd()
        .args(["task", "list"])
        .assert()
        .code(2)
        .stderr(contains("interval_minutes"));
}
