use serde::{Deserialize, Serialize};

/// Configuration from adq.toml at the workspace root
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub workspace: WorkspaceInfo,
    #[serde(default)]
    pub images: ImageConfig,
    #[serde(default)]
    pub tasks: TaskDefaults,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceInfo {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Image file extensions picked up by directory scans (no leading dot)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Extension of annotation artifacts written next to the labels
    #[serde(default = "default_annotation_extension")]
    pub annotation_extension: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        ImageConfig {
            extensions: default_extensions(),
            annotation_extension: default_annotation_extension(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "bmp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_annotation_extension() -> String {
    "xml".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefaults {
    #[serde(default = "no_user")]
    pub default_annotator_id: i64,
    #[serde(default = "no_user")]
    pub default_reviewer_id: i64,
}

impl Default for TaskDefaults {
    fn default() -> Self {
        TaskDefaults {
            default_annotator_id: no_user(),
            default_reviewer_id: no_user(),
        }
    }
}

fn no_user() -> i64 {
    super::task::Task::NO_USER
}
