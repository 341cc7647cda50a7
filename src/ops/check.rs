use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::io::workspace_io::{Document, StoreError, Workspace, read_json};
use crate::model::pointers::{ProjectPointers, TaskPointers, detail_path};
use crate::model::project::{Project, ProjectPointer};
use crate::model::record::Record;
use crate::model::registry::{ProjectsInfo, TasksInfo};
use crate::model::task::{Task, TaskPointer};

/// Structured result from `adq check`, suitable for --json output.
#[derive(Debug, Default, Serialize)]
pub struct CheckResult {
    pub valid: bool,
    pub errors: Vec<CheckError>,
    pub warnings: Vec<CheckWarning>,
}

/// A consistency error (something that should be fixed).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckError {
    /// A document is not shaped like a collection at all
    InvalidDocument { document: String, message: String },
    /// One entry of a collection fails validation
    InvalidRecord {
        document: String,
        index: usize,
        message: String,
    },
    /// The same id appears more than once in one collection
    DuplicateId {
        document: String,
        id: i64,
        count: usize,
    },
    /// A full record has no pointer
    MissingPointer { kind: &'static str, id: i64 },
    /// A pointer has no full record
    OrphanPointer { kind: &'static str, id: i64 },
    /// A pointer disagrees with its full record
    PointerMismatch { kind: &'static str, id: i64 },
    /// A task references a project that does not exist
    UnknownProject { task_id: i64, project_id: i64 },
}

/// A non-critical issue.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckWarning {
    /// Stored `num_count` differs from the number of records
    StaleCount {
        document: String,
        stored: i64,
        actual: usize,
    },
    /// Pointer target file is missing, so lazy loads will fail
    MissingDetailFile { kind: &'static str, id: i64, path: String },
    /// Detail file exists but describes a different record
    StaleDetailFile { kind: &'static str, id: i64, path: String },
}

// ---------------------------------------------------------------------------
// Main check entry point
// ---------------------------------------------------------------------------

/// Validate a workspace's documents against each other.
///
/// Read-only. Unlike a normal load, a bad record is reported and skipped
/// so the rest of the workspace can still be checked.
///
/// Checks performed:
/// 1. Every collection entry parses (which covers state code/label agreement)
/// 2. No duplicate ids within a collection
/// 3. Every record has exactly one matching pointer and vice versa
/// 4. Every task's project exists
/// 5. Warnings for stale counts and missing or stale detail files
pub fn check_workspace(workspace: &Workspace) -> Result<CheckResult, StoreError> {
    let mut result = CheckResult::default();

    let projects: Vec<Project> = parse_entries::<ProjectsInfo, _>(workspace, "projects", &mut result)?;
    let project_pointers: Vec<ProjectPointer> =
        parse_entries::<ProjectPointers, _>(workspace, "project_pointers", &mut result)?;
    let tasks: Vec<Task> = parse_entries::<TasksInfo, _>(workspace, "tasks", &mut result)?;
    let task_pointers: Vec<TaskPointer> =
        parse_entries::<TaskPointers, _>(workspace, "task_pointers", &mut result)?;

    check_duplicates(ProjectsInfo::FILE_NAME, &projects, &mut result);
    check_duplicates(ProjectPointers::FILE_NAME, &project_pointers, &mut result);
    check_duplicates(TasksInfo::FILE_NAME, &tasks, &mut result);
    check_duplicates(TaskPointers::FILE_NAME, &task_pointers, &mut result);

    check_pointers(&projects, &project_pointers, ProjectPointer::matches, &mut result);
    check_pointers(&tasks, &task_pointers, TaskPointer::matches, &mut result);

    let project_ids: HashSet<i64> = projects.iter().map(|p| p.id).collect();
    for task in &tasks {
        if !project_ids.contains(&task.project_id) {
            result.errors.push(CheckError::UnknownProject {
                task_id: task.id,
                project_id: task.project_id,
            });
        }
    }

    for pointer in &project_pointers {
        check_detail(&workspace.root, &pointer.dir_name, pointer, ProjectPointer::matches, &mut result);
    }
    for pointer in &task_pointers {
        check_detail(&workspace.root, &pointer.dir_name, pointer, TaskPointer::matches, &mut result);
    }

    result.valid = result.errors.is_empty();
    Ok(result)
}

// ---------------------------------------------------------------------------
// Per-document parsing
// ---------------------------------------------------------------------------

/// Parse a collection document entry by entry. Missing documents are empty;
/// malformed JSON is still fatal.
fn parse_entries<D: Document, R: Record>(
    workspace: &Workspace,
    key: &str,
    result: &mut CheckResult,
) -> Result<Vec<R>, StoreError> {
    let document = D::FILE_NAME.to_string();
    let Some(mut value) = read_json(&workspace.path_of::<D>())? else {
        return Ok(Vec::new());
    };

    let Some(Value::Array(items)) = value.get_mut(key).map(Value::take) else {
        result.errors.push(CheckError::InvalidDocument {
            document,
            message: format!("expected a \"{}\" array", key),
        });
        return Ok(Vec::new());
    };

    if let Some(stored) = value.get("num_count").and_then(Value::as_i64)
        && stored != items.len() as i64
    {
        result.warnings.push(CheckWarning::StaleCount {
            document: document.clone(),
            stored,
            actual: items.len(),
        });
    }

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match R::from_json(item) {
            Ok(record) => records.push(record),
            Err(e) => result.errors.push(CheckError::InvalidRecord {
                document: document.clone(),
                index,
                message: e.to_string(),
            }),
        }
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Cross-document checks
// ---------------------------------------------------------------------------

fn check_duplicates<R: Record>(document: &str, records: &[R], result: &mut CheckResult) {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for record in records {
        *counts.entry(record.id()).or_default() += 1;
    }
    let mut duplicates: Vec<(i64, usize)> = counts.into_iter().filter(|(_, n)| *n > 1).collect();
    duplicates.sort();
    for (id, count) in duplicates {
        result.errors.push(CheckError::DuplicateId {
            document: document.to_string(),
            id,
            count,
        });
    }
}

fn check_pointers<R: Record, P: Record>(
    records: &[R],
    pointers: &[P],
    matches: impl Fn(&P, &R) -> bool,
    result: &mut CheckResult,
) {
    let by_id: HashMap<i64, &P> = pointers.iter().map(|p| (p.id(), p)).collect();
    let record_ids: HashSet<i64> = records.iter().map(|r| r.id()).collect();

    for record in records {
        match by_id.get(&record.id()) {
            None => result.errors.push(CheckError::MissingPointer {
                kind: R::KIND,
                id: record.id(),
            }),
            Some(pointer) if !matches(*pointer, record) => {
                result.errors.push(CheckError::PointerMismatch {
                    kind: R::KIND,
                    id: record.id(),
                })
            }
            Some(_) => {}
        }
    }
    for pointer in pointers {
        if !record_ids.contains(&pointer.id()) {
            result.errors.push(CheckError::OrphanPointer {
                kind: P::KIND,
                id: pointer.id(),
            });
        }
    }
}

fn check_detail<P: Record, R: Record>(
    root: &Path,
    dir_name: &str,
    pointer: &P,
    matches: impl Fn(&P, &R) -> bool,
    result: &mut CheckResult,
) {
    let path = detail_path::<R>(root, dir_name, pointer.id());
    let shown = path.display().to_string();
    if !path.is_file() {
        result.warnings.push(CheckWarning::MissingDetailFile {
            kind: R::KIND,
            id: pointer.id(),
            path: shown,
        });
        return;
    }
    let fresh = read_json(&path)
        .ok()
        .flatten()
        .and_then(|v| R::from_json(v).ok())
        .is_some_and(|record| matches(pointer, &record));
    if !fresh {
        result.warnings.push(CheckWarning::StaleDetailFile {
            kind: R::KIND,
            id: pointer.id(),
            path: shown,
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
