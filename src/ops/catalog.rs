//! Transactional view over a workspace's four collections.
//!
//! Every mutation writes the full record first and only then its pointer,
//! so a failed mutation leaves both untouched. Saving writes every
//! collection document, removes the detail files of removed or relocated
//! tasks, then writes the detail files of the records touched since the
//! last save.
//!
//! A catalog opened with [`Catalog::open_for_write`] holds the workspace
//! lock from load to drop, so id allocation in one process cannot race
//! another `adq` writer.

use std::collections::BTreeSet;
use std::path::Path;

use crate::io::lock::WorkspaceLock;
use crate::io::source::{
    LocalSource, ProjectSource, get_project_pointers, get_projects_info, get_task_pointers,
    get_tasks_info,
};
use crate::io::workspace_io::{StoreError, Workspace};
use crate::model::pointers::{ProjectPointers, TaskPointers, detail_path};
use crate::model::project::{FileGroups, Project};
use crate::model::record::{Record, RegistryError, ValidationError, now_timestamp};
use crate::model::registry::{ProjectsInfo, TasksInfo};
use crate::model::task::{Task, TaskState};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("project not found: {0}")]
    ProjectNotFound(i64),
    #[error("task not found: {0}")]
    TaskNotFound(i64),
}

/// Who is looking at a task list. Only the id and the role flag matter here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: i64,
    pub is_admin: bool,
}

impl Viewer {
    pub fn admin() -> Self {
        Viewer {
            user_id: Task::NO_USER,
            is_admin: true,
        }
    }

    /// Administrators see every task; everyone else only what they review
    pub fn can_see(&self, task: &Task) -> bool {
        self.is_admin || task.reviewer_id == self.user_id
    }
}

pub struct Catalog {
    workspace: Workspace,
    pub projects: ProjectsInfo,
    pub project_pointers: ProjectPointers,
    pub tasks: TasksInfo,
    pub task_pointers: TaskPointers,
    dirty_projects: BTreeSet<i64>,
    dirty_tasks: BTreeSet<i64>,
    /// `(dir_name, id)` of detail files to delete on the next save
    removed_tasks: Vec<(String, i64)>,
    lock: Option<WorkspaceLock>,
}

fn require_name(kind: &'static str, name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::Constraint {
            kind,
            reason: "name must not be empty".into(),
        });
    }
    Ok(())
}

impl Catalog {
    /// Load every collection from the workspace's own documents
    pub fn open(workspace: Workspace) -> Result<Self, CatalogError> {
        let source = LocalSource::new(&workspace);
        let projects = get_projects_info(&source)?;
        let project_pointers = get_project_pointers(&source)?;
        let tasks = get_tasks_info(&source)?;
        let task_pointers = get_task_pointers(&source, None)?;
        Ok(Catalog::from_parts(workspace, projects, project_pointers, tasks, task_pointers))
    }

    /// Take the workspace lock, then load. The lock is held until the
    /// catalog is dropped.
    pub fn open_for_write(workspace: Workspace) -> Result<Self, CatalogError> {
        std::fs::create_dir_all(&workspace.root).map_err(StoreError::from)?;
        let lock = WorkspaceLock::acquire_default(&workspace.root).map_err(StoreError::from)?;
        let mut catalog = Catalog::open(workspace)?;
        catalog.lock = Some(lock);
        Ok(catalog)
    }

    /// Load every collection from an arbitrary source; saves still go to
    /// `workspace`
    pub fn from_source(workspace: Workspace, source: &dyn ProjectSource) -> Result<Self, CatalogError> {
        Ok(Catalog::from_parts(
            workspace,
            get_projects_info(source)?,
            get_project_pointers(source)?,
            get_tasks_info(source)?,
            get_task_pointers(source, None)?,
        ))
    }

    fn from_parts(
        workspace: Workspace,
        projects: ProjectsInfo,
        project_pointers: ProjectPointers,
        tasks: TasksInfo,
        task_pointers: TaskPointers,
    ) -> Self {
        Catalog {
            workspace,
            projects,
            project_pointers,
            tasks,
            task_pointers,
            dirty_projects: BTreeSet::new(),
            dirty_tasks: BTreeSet::new(),
            removed_tasks: Vec::new(),
            lock: None,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn root(&self) -> &Path {
        &self.workspace.root
    }

    // -----------------------------------------------------------------------
    // Id allocation
    // -----------------------------------------------------------------------

    /// Next project id, free in both the registry and the pointer index
    pub fn next_project_id(&self) -> i64 {
        self.projects
            .get_next_id()
            .max(self.project_pointers.get_next_id())
    }

    pub fn next_task_id(&self) -> i64 {
        self.tasks.get_next_id().max(self.task_pointers.get_next_id())
    }

    // -----------------------------------------------------------------------
    // Projects
    // -----------------------------------------------------------------------

    /// Register a new project. The draft's id is replaced by a fresh one.
    pub fn create_project(&mut self, mut project: Project) -> Result<i64, CatalogError> {
        require_name(Project::KIND, &project.name)?;
        project.id = self.next_project_id();
        if project.created_at.is_empty() {
            project.created_at = now_timestamp();
        }
        let id = project.id;
        self.project_pointers.add(&project);
        self.projects.add(project);
        self.dirty_projects.insert(id);
        tracing::info!(id, "project created");
        Ok(id)
    }

    /// Replace an existing project wholesale
    pub fn update_project(&mut self, mut project: Project) -> Result<(), CatalogError> {
        require_name(Project::KIND, &project.name)?;
        project.touch();
        let id = project.id;
        self.projects.update(project.clone())?;
        if self.project_pointers.update(&project).is_err() {
            tracing::warn!(id, "project had no pointer; re-adding it");
            self.project_pointers.add(&project);
        }
        self.dirty_projects.insert(id);
        Ok(())
    }

    pub fn project(&self, id: i64) -> Result<&Project, CatalogError> {
        self.projects
            .get_by_id(id)
            .ok_or(CatalogError::ProjectNotFound(id))
    }

    /// Lazily load one project through its pointer
    pub fn load_project(&self, id: i64) -> Result<Project, CatalogError> {
        self.project_pointers
            .load(self.root(), id)?
            .ok_or(CatalogError::ProjectNotFound(id))
    }

    /// Label files of a project: the annotation file of each of its tasks,
    /// grouped under the project directory
    pub fn label_files(&self, project_id: i64) -> Result<FileGroups, CatalogError> {
        let project = self.project(project_id)?;
        let files = self
            .tasks
            .tasks_for_project(project_id)
            .into_iter()
            .filter_map(|t| t.anno_file_name.as_deref())
            .map(|name| {
                Path::new(name)
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or(name)
                    .to_string()
            })
            .collect();
        let mut groups = FileGroups::new();
        groups.insert(project.dir_name(), files);
        Ok(groups)
    }

    /// Refresh a project's task counters from the task registry
    fn recount_project(&mut self, project_id: i64) {
        let tasks = self.tasks.tasks_for_project(project_id);
        let total = tasks.len() as i64;
        let done = tasks
            .iter()
            .filter(|t| matches!(t.state, TaskState::Done | TaskState::Closed))
            .count() as i64;
        if let Some(project) = self.projects.projects.iter_mut().find(|p| p.id == project_id)
            && (project.task_total_count != total || project.task_done_count != done)
        {
            project.task_total_count = total;
            project.task_done_count = done;
            self.dirty_projects.insert(project_id);
        }
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    /// Register a new task under an existing project. The draft's id is
    /// replaced; an empty `dir_name` defaults to the project directory.
    pub fn create_task(&mut self, mut task: Task) -> Result<i64, CatalogError> {
        require_name(Task::KIND, &task.name)?;
        let project_dir = self.project(task.project_id)?.dir_name();
        task.id = self.next_task_id();
        if task.dir_name.is_empty() {
            task.dir_name = project_dir;
        }
        let (id, project_id) = (task.id, task.project_id);
        self.task_pointers.add(&task);
        self.tasks.add(task);
        self.dirty_tasks.insert(id);
        self.recount_project(project_id);
        tracing::info!(id, project_id, "task created");
        Ok(id)
    }

    /// Replace an existing task wholesale
    pub fn update_task(&mut self, mut task: Task) -> Result<(), CatalogError> {
        require_name(Task::KIND, &task.name)?;
        self.project(task.project_id)?;
        task.touch();
        let (id, project_id) = (task.id, task.project_id);
        let previous = self.task(id)?;
        let (previous_project, previous_dir) = (previous.project_id, previous.dir_name.clone());
        self.tasks.update(task.clone())?;
        if self.task_pointers.update(&task).is_err() {
            tracing::warn!(id, "task had no pointer; re-adding it");
            self.task_pointers.add(&task);
        }
        if previous_dir != task.dir_name {
            self.removed_tasks.push((previous_dir, id));
        }
        self.dirty_tasks.insert(id);
        self.recount_project(project_id);
        if previous_project != project_id {
            self.recount_project(previous_project);
        }
        Ok(())
    }

    pub fn set_task_state(&mut self, id: i64, state: TaskState) -> Result<(), CatalogError> {
        let mut task = self.task(id)?.clone();
        let from = task.state;
        task.set_state(state);
        self.update_task(task)?;
        tracing::info!(id, %from, to = %state, "task state changed");
        Ok(())
    }

    pub fn remove_task(&mut self, id: i64) -> Result<Task, CatalogError> {
        let task = self.tasks.remove(id).map_err(|_| CatalogError::TaskNotFound(id))?;
        if self.task_pointers.remove(id).is_err() {
            tracing::warn!(id, "removed task had no pointer");
        }
        self.dirty_tasks.remove(&id);
        self.removed_tasks.push((task.dir_name.clone(), id));
        self.recount_project(task.project_id);
        tracing::info!(id, "task removed");
        Ok(task)
    }

    pub fn task(&self, id: i64) -> Result<&Task, CatalogError> {
        self.tasks.get_by_id(id).ok_or(CatalogError::TaskNotFound(id))
    }

    /// Lazily load one task through its pointer
    pub fn load_task(&self, id: i64) -> Result<Task, CatalogError> {
        self.task_pointers
            .load(self.root(), id)?
            .ok_or(CatalogError::TaskNotFound(id))
    }

    /// Tasks the viewer may see, optionally limited to one project
    pub fn visible_tasks(&self, project_id: Option<i64>, viewer: Viewer) -> Vec<&Task> {
        self.tasks
            .tasks
            .iter()
            .filter(|t| project_id.is_none_or(|id| t.project_id == id))
            .filter(|t| viewer.can_see(t))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Write everything under the workspace lock, taking it for the
    /// duration of the save unless the catalog already holds it
    pub fn save(&mut self) -> Result<(), CatalogError> {
        std::fs::create_dir_all(self.root()).map_err(StoreError::from)?;
        let _lock = match self.lock {
            Some(_) => None,
            None => Some(WorkspaceLock::acquire_default(self.root()).map_err(StoreError::from)?),
        };

        self.workspace.save(&self.projects)?;
        self.workspace.save(&self.project_pointers)?;
        self.workspace.save(&self.tasks)?;
        self.workspace.save(&self.task_pointers)?;

        // deletions first: a removed id may have been reused by a new task
        for (dir_name, id) in &self.removed_tasks {
            let path = detail_path::<Task>(self.root(), dir_name, *id);
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::Write { path, source: e }.into()),
            }
        }
        for id in &self.dirty_projects {
            if let Some(project) = self.projects.get_by_id(*id) {
                self.workspace.save_detail(&project.dir_name(), project)?;
            }
        }
        for id in &self.dirty_tasks {
            if let Some(task) = self.tasks.get_by_id(*id) {
                self.workspace.save_detail(&task.dir_name, task)?;
            }
        }

        self.dirty_projects.clear();
        self.dirty_tasks.clear();
        self.removed_tasks.clear();
        Ok(())
    }
}
