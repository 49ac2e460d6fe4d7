//! Test support utilities for kupydo integration tests.
//!
//! Provides scratch projects and opt-in log output.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;

use kupydo::Project;
use tempfile::TempDir;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static TRACING: Once = Once::new();

/// Route library logs to the test output when `KUPYDO_LOG` is set,
/// e.g. `KUPYDO_LOG=kupydo=trace`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        if let Ok(filter) = EnvFilter::try_from_env("KUPYDO_LOG") {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_test_writer().with_target(false).without_time())
                .try_init();
        }
    });
}

/// A scratch project with a `.git` marker and its own home directory.
///
/// Nothing touches the process working directory, so tests can run in
/// parallel.
pub struct TestProject {
    pub dir: TempDir,
    pub home: TempDir,
    pub project: Project,
}

impl TestProject {
    pub fn new() -> Self {
        init_tracing();
        let dir = TempDir::new().expect("failed to create temp dir");
        let home = TempDir::new().expect("failed to create temp home");
        fs::create_dir(dir.path().join(".git")).expect("failed to create .git");
        let project = Project::discover(dir.path()).expect("failed to discover project");
        Self { dir, home, project }
    }

    pub fn root(&self) -> &Path {
        self.project.root()
    }

    /// Write `contents` to a project-relative path, creating parents.
    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        fs::write(&path, contents).expect("failed to write file");
        path
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root().join(rel)).expect("failed to read file")
    }

    /// The private config location inside this test's home directory.
    pub fn private_config_path(&self) -> PathBuf {
        self.project.private_config_path_in(self.home.path())
    }
}

/// A deployment definition with a multi-line basic-auth call.
pub const HEART_SOURCE: &str = r#"use kupydo::{BasicAuth, Resource};

pub fn define(discovery: &kupydo::SecretDiscovery<'_>) -> kupydo::Result<()> {
    Resource::basic_auth(discovery, BasicAuth {
        name: "login".into(),
        username: "asdfg".into(),
        password: "qwerty".into(),
        ..Default::default()
    })?;
    Ok(())
}
"#;
