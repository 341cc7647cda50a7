use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::record::{Record, null_as_default, now_timestamp};

/// Ordered file references grouped under a key (a logical group for data
/// files, a storage location for label files)
pub type FileGroups = IndexMap<String, Vec<String>>;

/// Group key used for a project's own data directory
pub const DATA_GROUP: &str = ".";

/// Top-level unit of annotation work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub data_files: FileGroups,
    pub label_files: FileGroups,

    #[serde(default = "default_type_id")]
    pub annotation_type_id: i64,
    #[serde(default = "default_type_id")]
    pub file_format_id: i64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default = "default_progress")]
    pub progress: i64,
    #[serde(default)]
    pub task_total_count: i64,
    #[serde(default)]
    pub task_done_count: i64,
    #[serde(default)]
    pub total_count: i64,
    #[serde(default)]
    pub sample_count: i64,
    #[serde(default)]
    pub per_task_count: i64,

    #[serde(default)]
    pub annotation_classes: Option<serde_json::Value>,
    #[serde(default)]
    pub annotation_errors: Option<serde_json::Value>,
    #[serde(default)]
    pub dataset_name: Option<String>,
    #[serde(default)]
    pub domain_id: Option<i64>,

    #[serde(default)]
    pub customer_company: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub customer_url: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub customer_address: String,

    #[serde(default)]
    pub extended_properties: Option<serde_json::Map<String, serde_json::Value>>,
}

fn default_type_id() -> i64 {
    1
}

fn default_progress() -> i64 {
    1
}

impl Project {
    /// Create a project with no files, timestamped now
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Project {
            id,
            name: name.into(),
            data_files: FileGroups::new(),
            label_files: FileGroups::new(),
            annotation_type_id: default_type_id(),
            file_format_id: default_type_id(),
            created_at: now_timestamp(),
            updated_at: None,
            description: None,
            progress: default_progress(),
            task_total_count: 0,
            task_done_count: 0,
            total_count: 0,
            sample_count: 0,
            per_task_count: 0,
            annotation_classes: None,
            annotation_errors: None,
            dataset_name: None,
            domain_id: None,
            customer_company: None,
            customer_name: None,
            customer_url: String::new(),
            customer_phone: None,
            customer_email: None,
            customer_address: String::new(),
            extended_properties: None,
        }
    }

    /// Working directory of the project, relative to the workspace root
    pub fn dir_name(&self) -> String {
        project_dir_name(self.id)
    }

    pub fn touch(&mut self) {
        self.updated_at = Some(now_timestamp());
    }
}

/// Projects keep their working files under a directory named by their id
pub fn project_dir_name(id: i64) -> String {
    id.to_string()
}

impl Record for Project {
    const KIND: &'static str = "project";

    fn id(&self) -> i64 {
        self.id
    }
}

/// Identity-plus-location projection of a [`Project`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPointer {
    pub id: i64,
    pub name: String,
    pub dir_name: String,
}

impl From<&Project> for ProjectPointer {
    fn from(project: &Project) -> Self {
        ProjectPointer {
            id: project.id,
            name: project.name.clone(),
            dir_name: project.dir_name(),
        }
    }
}

impl ProjectPointer {
    pub fn matches(&self, project: &Project) -> bool {
        *self == ProjectPointer::from(project)
    }
}

impl Record for ProjectPointer {
    const KIND: &'static str = "project pointer";

    fn id(&self) -> i64 {
        self.id
    }
}
