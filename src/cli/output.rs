use serde::Serialize;

use crate::model::project::ProjectPointer;
use crate::model::record::selection_label;
use crate::model::task::Task;
use crate::ops::navigate::{NavStatus, NavWarning};
use crate::ops::search::{HitKind, MatchField, SearchHit};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskRowJson {
    pub id: i64,
    pub name: String,
    pub project_id: i64,
    pub state: &'static str,
    pub annotator_id: i64,
    pub reviewer_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anno_file_name: Option<String>,
}

impl From<&Task> for TaskRowJson {
    fn from(task: &Task) -> Self {
        TaskRowJson {
            id: task.id,
            name: task.name.clone(),
            project_id: task.project_id,
            state: task.state.label(),
            annotator_id: task.annotator_id,
            reviewer_id: task.reviewer_id,
            anno_file_name: task.anno_file_name.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct TaskListJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    pub tasks: Vec<TaskRowJson>,
}

#[derive(Serialize)]
pub struct CreatedJson {
    pub kind: &'static str,
    pub id: i64,
}

#[derive(Serialize)]
pub struct SearchHitJson {
    pub kind: HitKind,
    pub id: i64,
    pub project_id: i64,
    pub field: MatchField,
    pub name: String,
}

#[derive(Serialize)]
pub struct SessionEventJson<'a> {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<NavWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved: Option<&'a str>,
    pub status: NavStatus,
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

/// `3-batch-03  [Working]  annotator 7  reviewer -1`
pub fn format_task_line(task: &Task) -> String {
    format!(
        "{}  [{}]  annotator {}  reviewer {}",
        selection_label(task.id, &task.name),
        task.state,
        task.annotator_id,
        task.reviewer_id
    )
}

pub fn format_project_line(pointer: &ProjectPointer) -> String {
    format!(
        "{}  ({}/)",
        selection_label(pointer.id, &pointer.name),
        pointer.dir_name
    )
}

pub fn field_name(field: MatchField) -> &'static str {
    match field {
        MatchField::Name => "name",
        MatchField::Description => "description",
        MatchField::Dataset => "dataset",
        MatchField::Annotator => "annotator",
        MatchField::Reviewer => "reviewer",
    }
}

pub fn format_search_hit(hit: &SearchHit, name: &str) -> String {
    let prefix = match hit.kind {
        HitKind::Project => "project".to_string(),
        HitKind::Task => format!("task p{}", hit.project_id),
    };
    format!(
        "[{}] {} (in {})",
        prefix,
        selection_label(hit.id, name),
        field_name(hit.field)
    )
}

pub fn format_status(status: &NavStatus) -> String {
    let current = status.current.as_deref().unwrap_or("-");
    let position = if status.total == 0 {
        0
    } else {
        status.image_index + 1
    };
    format!(
        "{} ({}/{})  annotated {}  remaining {}",
        current, position, status.total, status.annotated, status.remaining
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::TaskState;

    #[test]
    fn test_format_task_line() {
        let mut task = Task::new(3, "batch-03", 0, "0");
        task.state = TaskState::Working;
        task.annotator_id = 7;
        assert_eq!(
            format_task_line(&task),
            "3-batch-03  [Working]  annotator 7  reviewer -1"
        );
    }

    #[test]
    fn test_format_status_empty() {
        let status = NavStatus {
            image_index: 0,
            annotation_file_index: 0,
            current: None,
            total: 0,
            annotated: 0,
            remaining: 0,
        };
        assert_eq!(format_status(&status), "- (0/0)  annotated 0  remaining 0");
    }

    #[test]
    fn test_task_row_json() {
        let task = Task::new(1, "b", 2, "2");
        let value = serde_json::to_value(TaskRowJson::from(&task)).unwrap();
        assert_eq!(value["state"], "New");
        assert!(value.get("anno_file_name").is_none());
    }
}
