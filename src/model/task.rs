use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use super::record::{Record, ValidationError, null_as_default, now_timestamp};

/// Lifecycle state of an annotation task.
///
/// Each state is a fixed `(code, label)` pair; the pair is what gets
/// persisted as `state_id` / `state_name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    New,
    Working,
    Done,
    Closed,
}

/// Label → state, built on first use and read-only afterwards
static STATES_BY_LABEL: LazyLock<HashMap<&'static str, TaskState>> =
    LazyLock::new(|| TaskState::ALL.iter().map(|s| (s.label(), *s)).collect());

impl TaskState {
    /// All states in code order
    pub const ALL: [TaskState; 4] = [
        TaskState::New,
        TaskState::Working,
        TaskState::Done,
        TaskState::Closed,
    ];

    /// Numeric code persisted as `state_id`
    pub fn code(self) -> i64 {
        match self {
            TaskState::New => 1,
            TaskState::Working => 2,
            TaskState::Done => 3,
            TaskState::Closed => 4,
        }
    }

    /// Display label persisted as `state_name`
    pub fn label(self) -> &'static str {
        match self {
            TaskState::New => "New",
            TaskState::Working => "Working",
            TaskState::Done => "Done",
            TaskState::Closed => "Closed",
        }
    }

    pub fn from_code(code: i64) -> Result<TaskState, ValidationError> {
        match code {
            1 => Ok(TaskState::New),
            2 => Ok(TaskState::Working),
            3 => Ok(TaskState::Done),
            4 => Ok(TaskState::Closed),
            _ => Err(ValidationError::UnknownStateCode(code)),
        }
    }

    /// Reverse lookup from a display label (exact match)
    pub fn from_label(label: &str) -> Result<TaskState, ValidationError> {
        STATES_BY_LABEL
            .get(label)
            .copied()
            .ok_or_else(|| ValidationError::UnknownStateLabel(label.to_string()))
    }

    /// Labels in code order, for selection lists
    pub fn all_labels() -> Vec<&'static str> {
        Self::ALL.iter().map(|s| s.label()).collect()
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A unit of annotation work inside a project.
///
/// Tasks live in one global collection; `project_id` ties a task to its
/// project and is not checked against the project registry here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TaskRepr", into = "TaskRepr")]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub project_id: i64,
    /// Working directory of the task, relative to the workspace root.
    /// The task's detail file lives here.
    pub dir_name: String,
    /// Reference to the task's annotation artifact
    pub anno_file_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub state: TaskState,
    pub annotator_id: i64,
    pub annotator_fullname: Option<String>,
    pub reviewer_id: i64,
    pub reviewer_fullname: Option<String>,
    pub data_count: i64,
    pub object_count: i64,
    pub error_count: i64,
    pub description: Option<String>,
}

impl Task {
    /// Id carried by a task that has not been registered yet
    pub const UNASSIGNED_ID: i64 = -1;
    /// Annotator/reviewer id meaning "nobody"
    pub const NO_USER: i64 = -1;

    /// Create a new task in the `New` state, timestamped now
    pub fn new(id: i64, name: impl Into<String>, project_id: i64, dir_name: impl Into<String>) -> Self {
        let now = now_timestamp();
        Task {
            id,
            name: name.into(),
            project_id,
            dir_name: dir_name.into(),
            anno_file_name: None,
            created_at: now.clone(),
            updated_at: now,
            state: TaskState::New,
            annotator_id: Self::NO_USER,
            annotator_fullname: None,
            reviewer_id: Self::NO_USER,
            reviewer_fullname: None,
            data_count: 0,
            object_count: 0,
            error_count: 0,
            description: None,
        }
    }

    /// Move to a new state and bump `updated_at`
    pub fn set_state(&mut self, state: TaskState) {
        self.state = state;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = now_timestamp();
    }
}

impl Record for Task {
    const KIND: &'static str = "task";

    fn id(&self) -> i64 {
        self.id
    }
}

/// On-disk shape of a task: the state is stored as a code/label pair
#[derive(Serialize, Deserialize)]
struct TaskRepr {
    #[serde(default = "unassigned_id")]
    id: i64,
    name: String,
    project_id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    dir_name: String,
    #[serde(default)]
    anno_file_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    created_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    updated_at: String,
    #[serde(default)]
    state_id: Option<i64>,
    #[serde(default)]
    state_name: Option<String>,
    #[serde(default = "no_user")]
    annotator_id: i64,
    #[serde(default)]
    annotator_fullname: Option<String>,
    #[serde(default = "no_user")]
    reviewer_id: i64,
    #[serde(default)]
    reviewer_fullname: Option<String>,
    #[serde(default)]
    data_count: i64,
    #[serde(default)]
    object_count: i64,
    #[serde(default)]
    error_count: i64,
    #[serde(default)]
    description: Option<String>,
}

fn unassigned_id() -> i64 {
    Task::UNASSIGNED_ID
}

fn no_user() -> i64 {
    Task::NO_USER
}

/// Resolve the persisted code/label pair. Either half alone is accepted;
/// both present must name the same state.
fn resolve_state(code: Option<i64>, label: Option<&str>) -> Result<TaskState, ValidationError> {
    match (code, label) {
        (None, None) => Ok(TaskState::New),
        (Some(code), None) => TaskState::from_code(code),
        (None, Some(label)) => TaskState::from_label(label),
        (Some(code), Some(label)) => {
            let state = TaskState::from_code(code)?;
            if state.label() != label {
                return Err(ValidationError::Constraint {
                    kind: Task::KIND,
                    reason: format!(
                        "state_id {} is \"{}\" but state_name is \"{}\"",
                        code,
                        state.label(),
                        label
                    ),
                });
            }
            Ok(state)
        }
    }
}

impl TryFrom<TaskRepr> for Task {
    type Error = ValidationError;

    fn try_from(r: TaskRepr) -> Result<Self, Self::Error> {
        let state = resolve_state(r.state_id, r.state_name.as_deref())?;
        Ok(Task {
            id: r.id,
            name: r.name,
            project_id: r.project_id,
            dir_name: r.dir_name,
            anno_file_name: r.anno_file_name,
            created_at: r.created_at,
            updated_at: r.updated_at,
            state,
            annotator_id: r.annotator_id,
            annotator_fullname: r.annotator_fullname,
            reviewer_id: r.reviewer_id,
            reviewer_fullname: r.reviewer_fullname,
            data_count: r.data_count,
            object_count: r.object_count,
            error_count: r.error_count,
            description: r.description,
        })
    }
}

impl From<Task> for TaskRepr {
    fn from(t: Task) -> Self {
        TaskRepr {
            id: t.id,
            name: t.name,
            project_id: t.project_id,
            dir_name: t.dir_name,
            anno_file_name: t.anno_file_name,
            created_at: t.created_at,
            updated_at: t.updated_at,
            state_id: Some(t.state.code()),
            state_name: Some(t.state.label().to_string()),
            annotator_id: t.annotator_id,
            annotator_fullname: t.annotator_fullname,
            reviewer_id: t.reviewer_id,
            reviewer_fullname: t.reviewer_fullname,
            data_count: t.data_count,
            object_count: t.object_count,
            error_count: t.error_count,
            description: t.description,
        }
    }
}

/// Identity-plus-location projection of a [`Task`], used for cheap listing
/// and lazy loading of the full record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPointer {
    pub id: i64,
    pub name: String,
    pub project_id: i64,
    pub dir_name: String,
    #[serde(default)]
    pub anno_file_name: Option<String>,
}

impl From<&Task> for TaskPointer {
    fn from(task: &Task) -> Self {
        TaskPointer {
            id: task.id,
            name: task.name.clone(),
            project_id: task.project_id,
            dir_name: task.dir_name.clone(),
            anno_file_name: task.anno_file_name.clone(),
        }
    }
}

impl TaskPointer {
    /// True when this pointer agrees with the full record on every
    /// projected field
    pub fn matches(&self, task: &Task) -> bool {
        *self == TaskPointer::from(task)
    }
}

impl Record for TaskPointer {
    const KIND: &'static str = "task pointer";

    fn id(&self) -> i64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_task() -> Task {
        let mut task = Task::new(3, "batch-03", 1, "1");
        task.anno_file_name = Some("1/batch-03.xml".into());
        task.state = TaskState::Working;
        task.annotator_id = 7;
        task.annotator_fullname = Some("Kim Jisoo".into());
        task.data_count = 120;
        task.object_count = 311;
        task.description = Some("night shots".into());
        task
    }

    #[test]
    fn test_state_codes_and_labels() {
        for state in TaskState::ALL {
            assert_eq!(TaskState::from_code(state.code()).unwrap(), state);
            assert_eq!(TaskState::from_label(state.label()).unwrap(), state);
        }
        assert_eq!(TaskState::Done.code(), 3);
        assert_eq!(TaskState::Closed.to_string(), "Closed");
    }

    #[test]
    fn test_state_rejects_unknown() {
        assert!(matches!(
            TaskState::from_code(0),
            Err(ValidationError::UnknownStateCode(0))
        ));
        assert!(matches!(
            TaskState::from_code(5),
            Err(ValidationError::UnknownStateCode(5))
        ));
        assert!(TaskState::from_label("done").is_err());
    }

    #[test]
    fn test_all_labels_in_code_order() {
        assert_eq!(TaskState::all_labels(), vec!["New", "Working", "Done", "Closed"]);
    }

    #[test]
    fn test_task_round_trip() {
        let task = sample_task();
        let back = Task::from_json(task.to_json()).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn test_task_json_carries_state_pair() {
        let value = sample_task().to_json();
        assert_eq!(value["state_id"], json!(2));
        assert_eq!(value["state_name"], json!("Working"));
        assert!(value.get("state").is_none());
    }

    #[test]
    fn test_legacy_task_defaults() {
        let task = Task::from_json(json!({
            "name": "old",
            "project_id": 0,
            "dir_name": "0",
            "anno_file_name": null,
            "created_at": "2023-03-01 10:00:00",
            "updated_at": "2023-03-01 10:00:00",
            "state_id": 1,
            "state_name": "New",
            "annotator_id": -1,
            "annotator_fullname": null,
            "reviewer_id": -1,
            "reviewer_fullname": null
        }))
        .unwrap();
        assert_eq!(task.id, Task::UNASSIGNED_ID);
        assert_eq!(task.data_count, 0);
        assert_eq!(task.error_count, 0);
        assert!(task.description.is_none());
        assert_eq!(task.state, TaskState::New);
    }

    #[test]
    fn test_state_mismatch_rejected() {
        let mut value = sample_task().to_json();
        value["state_name"] = json!("Done");
        let err = Task::from_json(value).unwrap_err();
        assert!(err.to_string().contains("state_name"));
    }

    #[test]
    fn test_state_code_out_of_range_rejected() {
        let mut value = sample_task().to_json();
        value["state_id"] = json!(9);
        value.as_object_mut().unwrap().remove("state_name");
        assert!(Task::from_json(value).is_err());
    }

    #[test]
    fn test_name_must_be_string() {
        let mut value = sample_task().to_json();
        value["name"] = json!(42);
        assert!(matches!(
            Task::from_json(value),
            Err(ValidationError::Field { kind: "task", .. })
        ));
    }

    #[test]
    fn test_pointer_projection() {
        let task = sample_task();
        let pointer = TaskPointer::from(&task);
        assert_eq!(pointer.id, 3);
        assert_eq!(pointer.name, "batch-03");
        assert_eq!(pointer.project_id, 1);
        assert_eq!(pointer.dir_name, "1");
        assert_eq!(pointer.anno_file_name.as_deref(), Some("1/batch-03.xml"));
        assert!(pointer.matches(&task));

        let mut renamed = task.clone();
        renamed.name = "batch-03b".into();
        assert!(!pointer.matches(&renamed));
    }

    #[test]
    fn test_set_state_touches() {
        let mut task = sample_task();
        task.updated_at = "2000-01-01T00:00:00Z".into();
        task.set_state(TaskState::Done);
        assert_eq!(task.state, TaskState::Done);
        assert_ne!(task.updated_at, "2000-01-01T00:00:00Z");
    }
}
