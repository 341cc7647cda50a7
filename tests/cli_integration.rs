//! Integration tests for the `adq` CLI.
//!
//! Each test creates a temp workspace, runs `adq` as a subprocess,
//! and verifies stdout and/or file contents.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Get the path to the built `adq` binary.
fn adq_bin() -> PathBuf {
    // cargo test builds to target/debug/
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("adq");
    path
}

fn command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new(adq_bin());
    cmd.args(args)
        .current_dir(dir)
        .env_remove("ADQ_WORKSPACE")
        .env_remove("ADQ_LOG")
        .env_remove("RUST_LOG");
    cmd
}

/// Run `adq` with the given args in the given directory, returning (stdout, stderr, success).
fn run_adq(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let output = command(dir, args).output().expect("failed to run adq");
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run `adq` expecting success, return stdout.
fn run_adq_ok(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_adq(dir, args);
    if !success {
        panic!(
            "adq {:?} failed:\nstdout: {}\nstderr: {}",
            args, stdout, stderr
        );
    }
    stdout
}

/// Feed `input` to `adq` on stdin, return stdout.
fn run_adq_stdin(dir: &Path, args: &[&str], input: &str) -> String {
    let mut child = command(dir, args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to run adq");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Workspace with one project (id 0) over two images and two tasks.
fn create_test_workspace(root: &Path) {
    run_adq_ok(root, &["init", "--name", "test-ws"]);
    let images = root.join("images");
    fs::create_dir_all(&images).unwrap();
    for name in ["b.jpg", "a.jpg", "notes.txt"] {
        fs::write(images.join(name), b"").unwrap();
    }
    run_adq_ok(
        root,
        &["project", "add", "street-signs", "--data-dir", "images", "--dataset", "signs-2023"],
    );
    run_adq_ok(root, &["task", "add", "0", "batch-0", "--reviewer", "4"]);
    run_adq_ok(
        root,
        &["task", "add", "0", "batch-1", "--reviewer", "5", "--anno-file", "0/batch-1.xml"],
    );
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

// ---------------------------------------------------------------------------
// Init and workspace discovery
// ---------------------------------------------------------------------------

#[test]
fn test_init_writes_config() {
    let tmp = tempfile::TempDir::new().unwrap();
    let out = run_adq_ok(tmp.path(), &["init", "--name", "signs"]);
    assert!(out.contains("Initialized adq workspace: signs"));
    let config = fs::read_to_string(tmp.path().join("adq.toml")).unwrap();
    assert!(config.contains("name = \"signs\""));

    let (_, stderr, success) = run_adq(tmp.path(), &["init"]);
    assert!(!success);
    assert!(stderr.contains("already exists"));
    run_adq_ok(tmp.path(), &["init", "--force"]);
}

#[test]
fn test_outside_workspace_fails() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (_, stderr, success) = run_adq(tmp.path(), &["project", "list"]);
    assert!(!success);
    assert!(stderr.starts_with("error: not an adq workspace"));
}

#[test]
fn test_discovery_from_subdirectory_and_flag() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let out = run_adq_ok(&tmp.path().join("images"), &["project", "list"]);
    assert!(out.contains("0-street-signs"));

    let elsewhere = tempfile::TempDir::new().unwrap();
    let ws = tmp.path().to_str().unwrap();
    let out = run_adq_ok(elsewhere.path(), &["-C", ws, "project", "list"]);
    assert!(out.contains("0-street-signs"));
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[test]
fn test_project_add_writes_documents() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let projects = read_json(&tmp.path().join("projects.json"));
    assert_eq!(projects["num_count"], 1);
    let project = &projects["projects"][0];
    assert_eq!(project["id"], 0);
    assert_eq!(project["data_files"]["."], serde_json::json!(["a.jpg", "b.jpg"]));
    assert_eq!(project["dataset_name"], "signs-2023");
    assert_eq!(project["task_total_count"], 2);

    let pointers = read_json(&tmp.path().join("project_pointers.json"));
    assert_eq!(
        pointers,
        serde_json::json!({"project_pointers": [{"id": 0, "name": "street-signs", "dir_name": "0"}]})
    );
    assert!(tmp.path().join("0/project-0.json").is_file());
}

#[test]
fn test_project_show() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let out = run_adq_ok(tmp.path(), &["project", "show", "0"]);
    assert!(out.contains("0-street-signs"));
    assert!(out.contains("data [.]: 2 files"));
    assert!(out.contains("labels [0]: batch-1.xml"));

    let out = run_adq_ok(tmp.path(), &["project", "show", "0-street-signs", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["name"], "street-signs");

    let (_, stderr, success) = run_adq(tmp.path(), &["project", "show", "9"]);
    assert!(!success);
    assert!(stderr.contains("project not found: 9"));
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[test]
fn test_task_ids_and_detail_files() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let out = run_adq_ok(tmp.path(), &["task", "add", "0", "batch-2", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["id"], 2);

    let tasks = read_json(&tmp.path().join("tasks.json"));
    assert_eq!(tasks["num_count"], 3);
    let pointers = read_json(&tmp.path().join("task_pointers.json"));
    assert_eq!(pointers["task_pointers"].as_array().unwrap().len(), 3);

    let detail = read_json(&tmp.path().join("0/task-2.json"));
    assert_eq!(detail["name"], "batch-2");
    assert_eq!(detail["state_id"], 1);
    assert_eq!(detail["state_name"], "New");
}

#[test]
fn test_task_add_unknown_project() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());
    let (_, stderr, success) = run_adq(tmp.path(), &["task", "add", "7", "lost"]);
    assert!(!success);
    assert!(stderr.contains("project not found: 7"));
}

#[test]
fn test_task_state_change() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let out = run_adq_ok(tmp.path(), &["task", "state", "1", "Done"]);
    assert_eq!(out.trim(), "1 → Done");

    let detail = read_json(&tmp.path().join("0/task-1.json"));
    assert_eq!(detail["state_id"], 3);
    assert_eq!(detail["state_name"], "Done");

    let out = run_adq_ok(tmp.path(), &["task", "list", "--state", "Done"]);
    assert!(out.contains("1-batch-1"));
    assert!(!out.contains("0-batch-0"));

    let (_, stderr, success) = run_adq(tmp.path(), &["task", "state", "1", "finished"]);
    assert!(!success);
    assert!(stderr.contains("expected one of New, Working, Done, Closed"));
}

#[test]
fn test_task_list_by_reviewer() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let out = run_adq_ok(tmp.path(), &["task", "list", "--reviewer", "4"]);
    assert!(out.contains("0-batch-0"));
    assert!(!out.contains("1-batch-1"));

    let out = run_adq_ok(tmp.path(), &["task", "list", "--reviewer", "4", "--admin"]);
    assert!(out.contains("1-batch-1"));

    let out = run_adq_ok(tmp.path(), &["task", "list", "--project", "0", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["project_id"], 0);
    assert_eq!(parsed["tasks"].as_array().unwrap().len(), 2);
}

#[test]
fn test_task_show_and_remove() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let out = run_adq_ok(tmp.path(), &["task", "show", "1"]);
    assert!(out.contains("annotation: 0/batch-1.xml"));

    run_adq_ok(tmp.path(), &["task", "remove", "1"]);
    assert!(!tmp.path().join("0/task-1.json").exists());
    let (_, stderr, success) = run_adq(tmp.path(), &["task", "show", "1"]);
    assert!(!success);
    assert!(stderr.contains("task not found: 1"));

    // next id is one past the highest live id
    let out = run_adq_ok(tmp.path(), &["task", "add", "0", "again"]);
    assert_eq!(out.trim(), "1");
}

// ---------------------------------------------------------------------------
// Search and check
// ---------------------------------------------------------------------------

#[test]
fn test_search() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let out = run_adq_ok(tmp.path(), &["search", "signs"]);
    assert_eq!(out.lines().count(), 1);
    assert!(out.contains("[project] 0-street-signs (in name)"));

    let out = run_adq_ok(tmp.path(), &["search", "batch-[01]", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 2);
    assert_eq!(parsed[0]["kind"], "task");

    let (_, stderr, success) = run_adq(tmp.path(), &["search", "("]);
    assert!(!success);
    assert!(stderr.starts_with("error:"));
}

#[test]
fn test_check_clean_then_broken() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let out = run_adq_ok(tmp.path(), &["check"]);
    assert!(out.contains("✓ workspace is valid"));

    let path = tmp.path().join("task_pointers.json");
    let mut pointers = read_json(&path);
    pointers["task_pointers"][0]["name"] = serde_json::json!("drifted");
    fs::write(&path, serde_json::to_string_pretty(&pointers).unwrap()).unwrap();

    let out = run_adq_ok(tmp.path(), &["check", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["valid"], false);
    assert_eq!(parsed["errors"][0]["type"], "pointer_mismatch");
}

#[test]
fn test_malformed_document_is_reported() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());
    fs::write(tmp.path().join("tasks.json"), "{\"tasks\": [").unwrap();

    let (_, stderr, success) = run_adq(tmp.path(), &["task", "list"]);
    assert!(!success);
    assert!(stderr.contains("malformed JSON"));
}

// ---------------------------------------------------------------------------
// Annotation session
// ---------------------------------------------------------------------------

#[test]
fn test_annotate_session() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let out = run_adq_stdin(
        tmp.path(),
        &["annotate", "images", "--labels", "labels"],
        "n\nn\ns\nq\n",
    );
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "a.jpg (1/2)  annotated 0  remaining 2");
    assert_eq!(lines[1], "b.jpg (2/2)  annotated 0  remaining 2");
    assert_eq!(lines[2], "warning: this is the last image");
    assert!(out.contains("saved b.xml"));
    assert!(tmp.path().join("labels/b.xml").is_file());
}

#[test]
fn test_annotate_json() {
    let tmp = tempfile::TempDir::new().unwrap();
    create_test_workspace(tmp.path());

    let out = run_adq_stdin(tmp.path(), &["--json", "annotate", "images"], "u\n");
    let last: serde_json::Value = serde_json::from_str(out.lines().last().unwrap()).unwrap();
    assert_eq!(last["status"]["current"], "b.jpg");
    assert_eq!(last["status"]["total"], 2);
}
