//! Common test utilities for capstan integration tests.
//!
//! Provides `TestEnv` for isolated project directories so tests never touch
//! a real project or each other.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::Path;
pub use tempfile::TempDir;

/// A test environment with an isolated project directory.
///
/// The `cap()` method returns a `Command` pinned to the project directory,
/// making tests parallel-safe.
pub struct TestEnv {
    pub project_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with an isolated project directory.
    pub fn new() -> Self {
        Self {
            project_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment with a definition file in place.
    pub fn with_definition(definition: &str) -> Self {
        let env = Self::new();
        env.write("capstan.kdl", definition);
        env
    }

    /// Get a Command for the cap binary targeting this project.
    pub fn cap(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_cap"));
        cmd.current_dir(self.project_dir.path());
        cmd
    }

    /// Get the path to the project directory.
    pub fn path(&self) -> &Path {
        self.project_dir.path()
    }

    /// Write a file under the project directory.
    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    /// Read a file under the project directory.
    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path().join(relative)).unwrap()
    }

    /// Whether a file exists under the project directory.
    pub fn exists(&self, relative: &str) -> bool {
        self.path().join(relative).exists()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
