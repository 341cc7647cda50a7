use serde::Serialize;

use super::project::Project;
use super::record::{
    Record, RegistryError, ValidationError, find_by_id, next_id, records_under_key, remove_by_id,
    replace_by_id,
};
use super::task::Task;

/// Every project in the workspace
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectsInfo {
    /// Cached record count, recomputed on every mutation
    pub num_count: usize,
    pub projects: Vec<Project>,
}

impl ProjectsInfo {
    pub fn new(projects: Vec<Project>) -> Self {
        ProjectsInfo {
            num_count: projects.len(),
            projects,
        }
    }

    pub fn add(&mut self, project: Project) {
        self.projects.push(project);
        self.num_count = self.projects.len();
    }

    pub fn get_by_id(&self, id: i64) -> Option<&Project> {
        find_by_id(&self.projects, id)
    }

    /// Replace the project with the same id. Unknown ids are an error.
    pub fn update(&mut self, project: Project) -> Result<(), RegistryError> {
        replace_by_id(&mut self.projects, project)
    }

    pub fn get_next_id(&self) -> i64 {
        next_id(&self.projects)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "num_count": self.num_count,
            "projects": self.projects.iter().map(|r| r.to_json()).collect::<Vec<_>>(),
        })
    }

    /// Rebuild the collection from a `{num_count, projects}` payload.
    /// The stored count is ignored in favour of the actual length.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ValidationError> {
        Ok(ProjectsInfo::new(records_under_key(value, "projects")?))
    }
}

/// Every task in the workspace, across all projects
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TasksInfo {
    pub num_count: usize,
    pub tasks: Vec<Task>,
}

impl TasksInfo {
    pub fn new(tasks: Vec<Task>) -> Self {
        TasksInfo {
            num_count: tasks.len(),
            tasks,
        }
    }

    pub fn add(&mut self, task: Task) {
        self.tasks.push(task);
        self.num_count = self.tasks.len();
    }

    pub fn get_by_id(&self, id: i64) -> Option<&Task> {
        find_by_id(&self.tasks, id)
    }

    pub fn update(&mut self, task: Task) -> Result<(), RegistryError> {
        replace_by_id(&mut self.tasks, task)
    }

    pub fn remove(&mut self, id: i64) -> Result<Task, RegistryError> {
        let removed = remove_by_id(&mut self.tasks, id)?;
        self.num_count = self.tasks.len();
        Ok(removed)
    }

    pub fn get_next_id(&self) -> i64 {
        next_id(&self.tasks)
    }

    /// Tasks belonging to one project, in registry order
    pub fn tasks_for_project(&self, project_id: i64) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.project_id == project_id)
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "num_count": self.num_count,
            "tasks": self.tasks.iter().map(|r| r.to_json()).collect::<Vec<_>>(),
        })
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, ValidationError> {
        Ok(TasksInfo::new(records_under_key(value, "tasks")?))
    }
}
