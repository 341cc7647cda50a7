//! Where registry payloads come from.
//!
//! The registry only needs four read operations returning JSON-shaped
//! payloads; whether they are served from local files or a remote API is
//! the source's business. [`LocalSource`] reads the workspace documents.

use serde_json::Value;

use crate::io::workspace_io::{Document, StoreError, Workspace, read_json};
use crate::model::pointers::{ProjectPointers, TaskPointers};
use crate::model::registry::{ProjectsInfo, TasksInfo};

/// Read side of a project/task store
pub trait ProjectSource {
    /// `{ "num_count", "projects": [...] }`
    fn list_projects(&self) -> Result<Value, StoreError>;
    /// `{ "project_pointers": [...] }`
    fn list_project_pointers(&self) -> Result<Value, StoreError>;
    /// `{ "num_count", "tasks": [...] }`
    fn list_tasks(&self) -> Result<Value, StoreError>;
    /// `{ "task_pointers": [...] }`, restricted to one project when given
    fn list_task_pointers(&self, project_id: Option<i64>) -> Result<Value, StoreError>;
}

/// Serves payloads straight from a workspace directory
pub struct LocalSource<'a> {
    workspace: &'a Workspace,
}

impl<'a> LocalSource<'a> {
    pub fn new(workspace: &'a Workspace) -> Self {
        LocalSource { workspace }
    }

    fn document<D: Document>(&self) -> Result<Value, StoreError> {
        let path = self.workspace.path_of::<D>();
        match read_json(&path)? {
            Some(value) => Ok(value),
            None => Ok(D::default().to_json()),
        }
    }
}

impl ProjectSource for LocalSource<'_> {
    fn list_projects(&self) -> Result<Value, StoreError> {
        self.document::<ProjectsInfo>()
    }

    fn list_project_pointers(&self) -> Result<Value, StoreError> {
        self.document::<ProjectPointers>()
    }

    fn list_tasks(&self) -> Result<Value, StoreError> {
        self.document::<TasksInfo>()
    }

    fn list_task_pointers(&self, project_id: Option<i64>) -> Result<Value, StoreError> {
        let mut value = self.document::<TaskPointers>()?;
        if let (Some(id), Some(Value::Array(items))) = (project_id, value.get_mut("task_pointers")) {
            items.retain(|p| p.get("project_id").and_then(Value::as_i64) == Some(id));
        }
        Ok(value)
    }
}

fn validated<T>(
    source_name: &str,
    parsed: Result<T, crate::model::record::ValidationError>,
) -> Result<T, StoreError> {
    parsed.map_err(|e| StoreError::Validation {
        path: source_name.into(),
        source: e,
    })
}

/// Fetch and parse the full project collection
pub fn get_projects_info(source: &dyn ProjectSource) -> Result<ProjectsInfo, StoreError> {
    validated("list_projects", ProjectsInfo::from_json(source.list_projects()?))
}

pub fn get_project_pointers(source: &dyn ProjectSource) -> Result<ProjectPointers, StoreError> {
    validated(
        "list_project_pointers",
        ProjectPointers::from_json(source.list_project_pointers()?),
    )
}

pub fn get_tasks_info(source: &dyn ProjectSource) -> Result<TasksInfo, StoreError> {
    validated("list_tasks", TasksInfo::from_json(source.list_tasks()?))
}

pub fn get_task_pointers(
    source: &dyn ProjectSource,
    project_id: Option<i64>,
) -> Result<TaskPointers, StoreError> {
    validated(
        "list_task_pointers",
        TaskPointers::from_json(source.list_task_pointers(project_id)?),
    )
}
