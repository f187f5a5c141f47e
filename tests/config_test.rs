//! Integration tests for configuration loading
//!
//! - A missing configuration file is reported
//! - At least one architecture is required
//! - `--config` and `UNIBUILD_CONFIG` select another file
//! - Invalid and duplicate component descriptors fail the command

mod common;

use common::{plain_component, stderr, stdout, TestProject};
use std::process::Command;

#[test]
fn test_missing_config_is_reported() {
    let project = TestProject::new();

    let output = project.run(&["dep"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("unibuild.toml"), "stderr: {}", stderr(&output));
}

#[test]
fn test_empty_architecture_list_is_rejected() {
    let project = TestProject::new();
    project.write_config(&[], "");

    let output = project.run(&["dep"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("At least one architecture"));
}

#[test]
fn test_config_flag_selects_file() {
    let project = TestProject::new();
    project.create_file(
        "conf/other.toml",
        "[build]\narchitectures = [\"i386\"]\ncomponents_dir = \"parts\"\n",
    );
    project.create_file("conf/parts/zlib.toml", &plain_component("zlib", &[]));

    let output = project.run(&["dep", "--config", "conf/other.toml"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "zlib\n");
}

#[test]
fn test_config_environment_variable() {
    let project = TestProject::new();
    project.create_file(
        "conf/env.toml",
        "[build]\narchitectures = [\"x86_64\"]\ncomponents_dir = \"parts\"\n",
    );
    project.create_file("conf/parts/expat.toml", &plain_component("expat", &[]));

    let output = Command::new(env!("CARGO_BIN_EXE_unibuild"))
        .current_dir(project.path())
        .env("UNIBUILD_CONFIG", project.path().join("conf/env.toml"))
        .arg("dep")
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "expat\n");
}

#[test]
fn test_invalid_descriptor_fails() {
    let project = TestProject::with_architectures(&["i386"]);
    project.add_component("broken", "[component]\nname = 42\n");

    let output = project.run(&["dep"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Invalid component descriptor"));
}

#[test]
fn test_duplicate_component_fails() {
    let project = TestProject::with_architectures(&["i386"]);
    project.add_component("a", &plain_component("zlib", &[]));
    project.add_component("b", &plain_component("ZLIB", &[]));

    let output = project.run(&["dep"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("registered twice"));
}

#[test]
fn test_no_subcommand_prints_help() {
    let project = TestProject::new();

    let output = project.run(&[]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("Usage"));
}

#[test]
fn test_version_flag() {
    let project = TestProject::new();

    let output = project.run(&["--version"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}
