//! Shared test infrastructure for integration tests.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Scratch directory in which `casegen` runs with its working directory set.
pub struct Workspace {
    dir: TempDir,
}

/// Captured result of one `casegen` invocation.
#[derive(Debug)]
pub struct RunResult {
    pub success: bool,
    /// Exit code, checked by the CLI tests only.
    #[allow(dead_code)]
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for RunResult {
    fn from(output: Output) -> Self {
        Self {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp workspace"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a configuration document and return its path.
    #[allow(dead_code)]
    pub fn config(&self, name: &str, document: serde_json::Value) -> PathBuf {
        let path = self.path().join(name);
        let bytes = serde_json::to_vec_pretty(&document).expect("serialize config");
        std::fs::write(&path, bytes).expect("write config");
        path
    }

    #[allow(dead_code)]
    pub fn write(&self, name: &str, contents: &[u8]) {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(path, contents).expect("write fixture file");
    }

    #[allow(dead_code)]
    pub fn read(&self, name: &str) -> String {
        let path = self.path().join(name);
        std::fs::read_to_string(&path)
            .unwrap_or_else(|err| panic!("read {}: {err}", path.display()))
    }

    #[allow(dead_code)]
    pub fn exists(&self, name: &str) -> bool {
        self.path().join(name).exists()
    }

    pub fn run(&self, args: &[&str]) -> RunResult {
        Command::new(env!("CARGO_BIN_EXE_casegen"))
            .args(args)
            .current_dir(self.path())
            .env("RUST_LOG", "info")
            .env("NO_COLOR", "1")
            .output()
            .expect("spawn casegen")
            .into()
    }
}
