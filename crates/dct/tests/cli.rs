#![cfg(unix)]

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn write_fixture(dir: &std::path::Path) {
    fs::create_dir_all(dir.join("lib")).expect("create lib dir");
    fs::write(
        dir.join("lib/api.ts"),
        "export function fetchUser(id: string) {\n  return fetch(`/users/${id}`);\n}\n\nconst toLabel = (id: string) => `user-${id}`;\n",
    )
    .expect("write fixture");
}

#[test]
fn instrument_mirrors_rewritten_sources() {
    let project = TempDir::new().expect("temp project");
    let out = TempDir::new().expect("temp out");
    write_fixture(project.path());

    Command::cargo_bin("dct")
        .expect("cargo bin dct")
        .arg("instrument")
        .arg(project.path())
        .arg("--out")
        .arg(out.path())
        .assert()
        .success();

    let rewritten = fs::read_to_string(out.path().join("lib/api.ts")).expect("read output");
    assert!(rewritten.contains("import { __trackFn }"));
    assert!(rewritten.contains("__trackFn(\"lib/api.ts\", \"fetchUser\", 1)"));
    assert!(rewritten.contains("__trackFn(\"lib/api.ts\", \"toLabel\", 5)"));

    // The source tree itself was left untouched.
    let original = fs::read_to_string(project.path().join("lib/api.ts")).expect("read input");
    assert!(!original.contains("__trackFn"));
}

#[test]
fn analyze_writes_an_inventory_file() {
    let project = TempDir::new().expect("temp project");
    write_fixture(project.path());
    let inventory_path = project.path().join("inventory.json");

    Command::cargo_bin("dct")
        .expect("cargo bin dct")
        .arg("analyze")
        .arg(project.path())
        .arg("--project-id")
        .arg("example-app")
        .arg("--no-blame")
        .arg("--output")
        .arg(&inventory_path)
        .assert()
        .success();

    let inventory: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&inventory_path).expect("read inventory"))
            .expect("parse inventory");
    assert_eq!(inventory["projectId"], "example-app");
    let functions = inventory["functions"].as_array().expect("functions array");
    assert_eq!(functions.len(), 2);
    assert!(functions.iter().any(|f| f["name"] == "fetchUser"));
}

#[test]
fn analyze_prints_inventory_to_stdout_by_default() {
    let project = TempDir::new().expect("temp project");
    write_fixture(project.path());

    Command::cargo_bin("dct")
        .expect("cargo bin dct")
        .arg("analyze")
        .arg(project.path())
        .arg("--project-id")
        .arg("example-app")
        .arg("--no-blame")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"projectId\": \"example-app\""));
}
