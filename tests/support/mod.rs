#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;
use todolist::store::Store;

pub const STORE_NAME: &str = "test-store";

/// Scratch data dir and config file for one test
pub struct TestStore {
    dir: TempDir,
}

impl TestStore {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("todolist.toml")
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.config_path();
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Initialized store handle over the same directory the CLI uses
    pub fn open(&self) -> Store {
        Store::open(self.data_dir(), STORE_NAME).expect("open store")
    }

    /// `todo` with config and data dir pointed at this scratch dir
    pub fn cmd(&self) -> Command {
        if !self.config_path().exists() {
            self.write_config(&format!("[store]\nname = \"{STORE_NAME}\"\n"))
                .expect("write config");
        }
        let mut cmd = todo_cmd();
        cmd.env("TODO_CONFIG", self.config_path())
            .env("TODO_DATA_DIR", self.data_dir())
            .current_dir(self.path());
        cmd
    }

    /// Run `todo --json <args>`, expect success and return the envelope
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .arg("--json")
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("json envelope")
    }
}

pub fn todo_cmd() -> Command {
    let mut cmd = Command::cargo_bin("todo").expect("binary");
    cmd.env_remove("RUST_LOG");
    cmd
}
