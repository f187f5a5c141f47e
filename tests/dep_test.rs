//! Integration tests for `unibuild dep`
//!
//! - Prints the build order, dependencies first, one lower-cased name per line
//! - Dependencies outside the request are not added
//! - "all" and an empty request select every component
//! - Lookup is case-insensitive and unknown names are ignored
//! - `--missing` adds unbuilt dependents
//! - Cycles and missing dependencies fail with a non-zero exit

mod common;

use common::{plain_component, stderr, stdout, TestProject};

fn project() -> TestProject {
    let project = TestProject::with_architectures(&["i386"]);
    project.add_component("a-png", &plain_component("libpng", &["zlib"]));
    project.add_component("b-zlib", &plain_component("zlib", &[]));
    project.add_component("c-freetype", &plain_component("FreeType", &["libpng", "zlib"]));
    project.add_component("d-expat", &plain_component("expat", &[]));
    project
}

#[test]
fn test_dep_prints_dependencies_first() {
    let project = project();

    let output = project.run(&["dep", "freetype", "libpng", "zlib"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "zlib\nlibpng\nfreetype\n");
}

#[test]
fn test_dep_does_not_pull_in_dependencies() {
    let project = project();

    let output = project.run(&["dep", "freetype"]);

    assert!(output.status.success());
    assert_eq!(stdout(&output), "freetype\n");
}

#[test]
fn test_dep_all_selects_every_component() {
    let project = project();

    let explicit = project.run(&["dep", "all"]);
    let implicit = project.run(&["dep"]);

    assert!(explicit.status.success());
    assert_eq!(stdout(&explicit), "zlib\nexpat\nlibpng\nfreetype\n");
    assert_eq!(stdout(&explicit), stdout(&implicit));
}

#[test]
fn test_dep_lookup_is_case_insensitive() {
    let project = project();

    let output = project.run(&["dep", "LIBPNG", "Zlib"]);

    assert!(output.status.success());
    assert_eq!(stdout(&output), "zlib\nlibpng\n");
}

#[test]
fn test_dep_ignores_unknown_names() {
    let project = project();

    let output = project.run(&["dep", "nonexistent", "expat"]);

    assert!(output.status.success());
    assert_eq!(stdout(&output), "expat\n");
}

#[test]
fn test_dep_json_output() {
    let project = project();

    let output = project.run(&["--json", "dep", "libpng", "zlib"]);

    assert!(output.status.success());
    let names: Vec<String> = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(names, vec!["zlib", "libpng"]);
}

#[test]
fn test_dep_missing_adds_unbuilt_dependents() {
    let project = project();

    let output = project.run(&["dep", "--missing", "zlib"]);

    assert!(output.status.success());
    assert_eq!(stdout(&output), "zlib\nlibpng\nfreetype\n");
}

#[test]
fn test_dep_missing_skips_built_dependents() {
    let project = project();
    project.create_dir("build/FreeType");

    let output = project.run(&["dep", "--missing", "zlib"]);

    assert!(output.status.success());
    assert_eq!(stdout(&output), "zlib\nlibpng\n");
}

#[test]
fn test_dep_cycle_fails() {
    let project = TestProject::with_architectures(&["i386"]);
    project.add_component("a", &plain_component("a", &["b"]));
    project.add_component("b", &plain_component("b", &["a"]));

    let output = project.run(&["dep"]);

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Circular"));
}

#[test]
fn test_dep_missing_dependency_fails() {
    let project = TestProject::with_architectures(&["i386"]);
    project.add_component("a", &plain_component("a", &["ghost"]));

    let output = project.run(&["dep", "a"]);

    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("ghost"), "stderr: {err}");
}
