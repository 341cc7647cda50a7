use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::io::lock::LockError;
use crate::model::config::WorkspaceConfig;
use crate::model::pointers::{ProjectPointers, TaskPointers};
use crate::model::record::{Record, ValidationError};
use crate::model::registry::{ProjectsInfo, TasksInfo};

/// Name of the config file that marks a workspace root
pub const CONFIG_FILE: &str = "adq.toml";

/// Error type for workspace persistence
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not an adq workspace: no adq.toml found")]
    NotAWorkspace,
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{path}: {source}")]
    Validation {
        path: PathBuf,
        source: ValidationError,
    },
    #[error("could not parse adq.toml: {0}")]
    Config(#[from] toml::de::Error),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A whole-collection JSON document stored at a fixed path under the
/// workspace root
pub trait Document: Default + Sized {
    const FILE_NAME: &'static str;

    fn to_json(&self) -> serde_json::Value;
    fn from_json(value: serde_json::Value) -> Result<Self, ValidationError>;
    fn record_count(&self) -> usize;
}

impl Document for ProjectsInfo {
    const FILE_NAME: &'static str = "projects.json";

    fn to_json(&self) -> serde_json::Value {
        ProjectsInfo::to_json(self)
    }
    fn from_json(value: serde_json::Value) -> Result<Self, ValidationError> {
        ProjectsInfo::from_json(value)
    }
    fn record_count(&self) -> usize {
        self.projects.len()
    }
}

impl Document for TasksInfo {
    const FILE_NAME: &'static str = "tasks.json";

    fn to_json(&self) -> serde_json::Value {
        TasksInfo::to_json(self)
    }
    fn from_json(value: serde_json::Value) -> Result<Self, ValidationError> {
        TasksInfo::from_json(value)
    }
    fn record_count(&self) -> usize {
        self.tasks.len()
    }
}

impl Document for ProjectPointers {
    const FILE_NAME: &'static str = "project_pointers.json";

    fn to_json(&self) -> serde_json::Value {
        ProjectPointers::to_json(self)
    }
    fn from_json(value: serde_json::Value) -> Result<Self, ValidationError> {
        ProjectPointers::from_json(value)
    }
    fn record_count(&self) -> usize {
        self.project_pointers.len()
    }
}

impl Document for TaskPointers {
    const FILE_NAME: &'static str = "task_pointers.json";

    fn to_json(&self) -> serde_json::Value {
        TaskPointers::to_json(self)
    }
    fn from_json(value: serde_json::Value) -> Result<Self, ValidationError> {
        TaskPointers::from_json(value)
    }
    fn record_count(&self) -> usize {
        self.task_pointers.len()
    }
}

/// An opened workspace: its root directory and parsed config
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub config: WorkspaceConfig,
}

impl Workspace {
    /// Open the workspace rooted at `root`, reading adq.toml if present
    pub fn open(root: &Path) -> Result<Workspace, StoreError> {
        let config = crate::io::config_io::read_config(root)?;
        Ok(Workspace {
            root: root.to_path_buf(),
            config,
        })
    }

    pub fn path_of<D: Document>(&self) -> PathBuf {
        self.root.join(D::FILE_NAME)
    }

    /// Load a collection document. A missing file is an empty collection;
    /// a malformed one is an error.
    pub fn load<D: Document>(&self) -> Result<D, StoreError> {
        let path = self.path_of::<D>();
        let Some(value) = read_json(&path)? else {
            tracing::debug!(path = %path.display(), "no document yet, starting empty");
            return Ok(D::default());
        };
        let doc = D::from_json(value).map_err(|e| StoreError::Validation {
            path: path.clone(),
            source: e,
        })?;
        tracing::debug!(path = %path.display(), records = doc.record_count(), "loaded document");
        Ok(doc)
    }

    /// Overwrite a collection document, creating the workspace directory
    /// if needed
    pub fn save<D: Document>(&self, doc: &D) -> Result<(), StoreError> {
        let path = self.path_of::<D>();
        write_json(&path, &doc.to_json())?;
        tracing::debug!(path = %path.display(), records = doc.record_count(), "saved document");
        Ok(())
    }

    /// Write a record's detail file at `<root>/<dir_name>/<kind>-<id>.json`
    pub fn save_detail<R: Record>(&self, dir_name: &str, record: &R) -> Result<PathBuf, StoreError> {
        let path = crate::model::pointers::detail_path::<R>(&self.root, dir_name, record.id());
        write_json(&path, &record.to_json())?;
        Ok(path)
    }
}

/// Discover the workspace root by walking up from `start`, looking for
/// adq.toml.
pub fn discover_workspace(start: &Path) -> Result<PathBuf, StoreError> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).is_file() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(StoreError::NotAWorkspace);
        }
    }
}

/// Read and parse a JSON file. Returns `None` if the file does not exist.
pub fn read_json(path: &Path) -> Result<Option<serde_json::Value>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| StoreError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Read a single record file. Unlike collection documents, a missing
/// record file is an error.
pub fn read_record<R: Record>(path: &Path) -> Result<R, StoreError> {
    let value = read_json(path)?.ok_or_else(|| StoreError::Read {
        path: path.to_path_buf(),
        source: std::io::Error::from(std::io::ErrorKind::NotFound),
    })?;
    R::from_json(value).map_err(|e| StoreError::Validation {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Pretty-print `value` to `path`, creating parent directories
pub fn write_json(path: &Path, value: &serde_json::Value) -> Result<(), StoreError> {
    let write_err = |e| StoreError::Write {
        path: path.to_path_buf(),
        source: e,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let mut content = serde_json::to_string_pretty(value).map_err(|e| StoreError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    content.push('\n');
    atomic_write(path, content.as_bytes()).map_err(write_err)
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
