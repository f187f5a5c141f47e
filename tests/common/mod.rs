//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Test project context
///
/// Creates a temporary directory holding a `unibuild.toml`, a
/// `components/` directory and an `archives/` directory.
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
}

impl TestProject {
    /// Create a new test project in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Create a project configured for `architectures`
    pub fn with_architectures(architectures: &[&str]) -> Self {
        let project = Self::new();
        project.write_config(architectures, "");
        project
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Write `unibuild.toml` with local directories and extra `[build]` keys
    pub fn write_config(&self, architectures: &[&str], extra: &str) {
        let archs: Vec<String> = architectures.iter().map(|a| format!("\"{a}\"")).collect();
        self.create_file(
            "unibuild.toml",
            &format!(
                "[build]\narchitectures = [{}]\nplatform = \"linux\"\narchives_dir = \"archives\"\n{extra}",
                archs.join(", ")
            ),
        );
        self.create_dir("components");
        self.create_dir("archives");
    }

    /// Write a component descriptor under `components/`
    pub fn add_component(&self, file_stem: &str, descriptor: &str) {
        self.create_file(&format!("components/{file_stem}.toml"), descriptor);
    }

    /// Pack executable `scripts` into `archives/<name>` as a gzip tarball
    pub fn create_archive(&self, name: &str, scripts: &[(&str, &str)]) -> PathBuf {
        let staging = self.dir.path().join(format!(".staging-{name}"));
        std::fs::create_dir_all(&staging).expect("Failed to create staging directory");
        for (file, content) in scripts {
            let path = staging.join(file);
            std::fs::write(&path, content).expect("Failed to write script");
            make_executable(&path);
        }

        let archive = self.dir.path().join("archives").join(name);
        std::fs::create_dir_all(archive.parent().expect("archive has a parent"))
            .expect("Failed to create archives directory");
        let status = Command::new("tar")
            .arg("-czf")
            .arg(&archive)
            .arg("-C")
            .arg(&staging)
            .arg(".")
            .status()
            .expect("Failed to run tar");
        assert!(status.success(), "tar failed to create {name}");
        std::fs::remove_dir_all(&staging).expect("Failed to remove staging directory");
        archive
    }

    /// Create a file in the test project
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Create a directory in the test project
    pub fn create_dir(&self, name: &str) {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(path).expect("Failed to create directory");
    }

    /// Check if a file exists in the test project
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the test project
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Command running the unibuild binary inside the project
    pub fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_unibuild"));
        command
            .current_dir(self.dir.path())
            .env_remove("UNIBUILD_CONFIG")
            .env_remove("RUST_LOG")
            .args(args);
        command
    }

    /// Run the unibuild binary inside the project
    pub fn run(&self, args: &[&str]) -> Output {
        self.command(args)
            .output()
            .expect("Failed to execute unibuild")
    }

    /// Names of the entries of a project directory
    pub fn list_dir(&self, name: &str) -> Vec<String> {
        std::fs::read_dir(self.dir.path().join(name))
            .expect("Failed to read directory")
            .map(|entry| entry.expect("Failed to read entry").file_name().to_string_lossy().to_string())
            .collect()
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)
        .expect("Failed to stat script")
        .permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).expect("Failed to chmod script");
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}

/// Standard output as a string
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Standard error as a string
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Configure script recording its arguments and CFLAGS
pub const CONFIGURE_SCRIPT: &str = r#"#!/bin/sh
echo "$@" > configured.txt
echo "$CFLAGS" > cflags.txt
"#;

/// Build script marking the tree as built
pub const BUILD_SCRIPT: &str = r#"#!/bin/sh
echo built > built.txt
"#;

/// Install script writing one shared and one configuration-dependent header
pub const INSTALL_SCRIPT: &str = r#"#!/bin/sh
mkdir -p "$1/include" "$1/share"
echo "/* common */" > "$1/include/common.h"
echo "/* $(cat configured.txt) */" > "$1/include/config.h"
cp built.txt "$1/share/built.txt"
"#;

/// Component descriptor driving the scripts above
pub fn script_component(name: &str, archive: &str, extra: &str) -> String {
    format!(
        r#"[component]
name = "{name}"
url = "https://example.com/{archive}"
archive = "{archive}"
{extra}

[configure]
command = "./configure"
flags = ["--arch=${{ARCH}}"]

[build]
command = "./build.sh"

[install]
command = "./install.sh"
flags = ["${{DEST_DIR}}"]
"#
    )
}

/// Descriptor with only a name and dependency list
pub fn plain_component(name: &str, dependencies: &[&str]) -> String {
    let mut out = format!(
        "[component]\nname = \"{name}\"\nurl = \"https://example.com/{name}.tar.gz\"\n"
    );
    for dep in dependencies {
        out.push_str(&format!("\n[[dependencies]]\nname = \"{dep}\"\n"));
    }
    out
}
