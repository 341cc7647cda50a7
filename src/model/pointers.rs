//! Pointer indexes: cheap id/name/location listings that defer loading a
//! full record until one is picked.
//!
//! A pointer index shadows its full registry. The [`Catalog`] keeps the two
//! in lockstep; using these types directly means keeping them in sync
//! yourself.
//!
//! [`Catalog`]: crate::ops::catalog::Catalog

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::project::{Project, ProjectPointer};
use super::record::{
    Record, RegistryError, ValidationError, find_by_id, next_id, records_under_key, remove_by_id,
    replace_by_id,
};
use super::task::{Task, TaskPointer};
use crate::io::workspace_io::{StoreError, read_record};

/// Read the detail file a pointer refers to and warn if it has drifted
fn load_detail<P, R>(root: &Path, pointer: &P, matches: impl Fn(&P, &R) -> bool) -> Result<R, StoreError>
where
    P: Record + HasDir,
    R: Record,
{
    let path = detail_path::<R>(root, pointer.dir_name(), pointer.id());
    let record: R = read_record(&path)?;
    if !matches(pointer, &record) {
        tracing::warn!(
            kind = R::KIND,
            id = pointer.id(),
            path = %path.display(),
            "pointer does not match the record it points to"
        );
    }
    Ok(record)
}

/// Location of a record's detail file: `<root>/<dir_name>/<kind>-<id>.json`
pub fn detail_path<R: Record>(root: &Path, dir_name: &str, id: i64) -> PathBuf {
    root.join(dir_name).join(R::detail_file_name(id))
}

/// Pointers that know which directory their record lives in
pub trait HasDir {
    fn dir_name(&self) -> &str;
}

impl HasDir for TaskPointer {
    fn dir_name(&self) -> &str {
        &self.dir_name
    }
}

impl HasDir for ProjectPointer {
    fn dir_name(&self) -> &str {
        &self.dir_name
    }
}

/// Pointer index over all tasks
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskPointers {
    pub task_pointers: Vec<TaskPointer>,
}

impl TaskPointers {
    pub fn new(task_pointers: Vec<TaskPointer>) -> Self {
        TaskPointers { task_pointers }
    }

    /// Derive a pointer from the task and append it
    pub fn add(&mut self, task: &Task) {
        self.task_pointers.push(TaskPointer::from(task));
    }

    /// Re-derive the pointer for an already-indexed task
    pub fn update(&mut self, task: &Task) -> Result<(), RegistryError> {
        replace_by_id(&mut self.task_pointers, TaskPointer::from(task))
    }

    pub fn remove(&mut self, id: i64) -> Result<TaskPointer, RegistryError> {
        remove_by_id(&mut self.task_pointers, id)
    }

    pub fn get(&self, id: i64) -> Option<&TaskPointer> {
        find_by_id(&self.task_pointers, id)
    }

    pub fn get_next_id(&self) -> i64 {
        next_id(&self.task_pointers)
    }

    /// Pointers for one project, or all of them when `project_id` is `None`
    pub fn for_project(&self, project_id: Option<i64>) -> Vec<&TaskPointer> {
        self.task_pointers
            .iter()
            .filter(|p| project_id.is_none_or(|id| p.project_id == id))
            .collect()
    }

    /// Lazily load the full task from `<root>/<dir_name>/task-<id>.json`.
    ///
    /// Returns `Ok(None)` when no pointer has this id.
    pub fn load(&self, root: &Path, id: i64) -> Result<Option<Task>, StoreError> {
        match self.get(id) {
            Some(pointer) => load_detail(root, pointer, TaskPointer::matches).map(Some),
            None => Ok(None),
        }
    }

    /// Like [`load`](Self::load), but an unknown id is an error
    pub fn get_task_by_id(&self, root: &Path, id: i64) -> Result<Task, StoreError> {
        self.load(root, id)?.ok_or_else(|| StoreError::Read {
            path: root.join(Task::detail_file_name(id)),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no pointer with this id"),
        })
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "task_pointers": self.task_pointers.iter().map(|p| p.to_json()).collect::<Vec<_>>(),
        })
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, ValidationError> {
        Ok(TaskPointers::new(records_under_key(value, "task_pointers")?))
    }
}

/// Pointer index over all projects
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectPointers {
    pub project_pointers: Vec<ProjectPointer>,
}

impl ProjectPointers {
    pub fn new(project_pointers: Vec<ProjectPointer>) -> Self {
        ProjectPointers { project_pointers }
    }

    pub fn add(&mut self, project: &Project) {
        self.project_pointers.push(ProjectPointer::from(project));
    }

    pub fn update(&mut self, project: &Project) -> Result<(), RegistryError> {
        replace_by_id(&mut self.project_pointers, ProjectPointer::from(project))
    }

    pub fn get(&self, id: i64) -> Option<&ProjectPointer> {
        find_by_id(&self.project_pointers, id)
    }

    pub fn get_next_id(&self) -> i64 {
        next_id(&self.project_pointers)
    }

    /// Lazily load the full project from `<root>/<dir_name>/project-<id>.json`
    pub fn load(&self, root: &Path, id: i64) -> Result<Option<Project>, StoreError> {
        match self.get(id) {
            Some(pointer) => load_detail(root, pointer, ProjectPointer::matches).map(Some),
            None => Ok(None),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "project_pointers": self.project_pointers.iter().map(|p| p.to_json()).collect::<Vec<_>>(),
        })
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, ValidationError> {
        Ok(ProjectPointers::new(records_under_key(value, "project_pointers")?))
    }
}
