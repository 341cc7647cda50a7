use std::fs;
use std::path::Path;

use crate::io::workspace_io::{CONFIG_FILE, StoreError, atomic_write};
use crate::model::config::WorkspaceConfig;

const CONFIG_TEMPLATE: &str = r##"[workspace]
name = {name}

# --- Images ---
# File extensions picked up when scanning a data or image directory.
[images]
extensions = ["jpg", "jpeg", "png", "bmp"]
# Annotation artifacts are named <image stem>.<annotation_extension>
annotation_extension = "xml"

# --- Task defaults ---
# -1 means "unassigned".
[tasks]
default_annotator_id = -1
default_reviewer_id = -1
"##;

/// Read adq.toml from the workspace root. A missing file yields defaults.
pub fn read_config(root: &Path) -> Result<WorkspaceConfig, StoreError> {
    let config_path = root.join(CONFIG_FILE);
    let config_text = match fs::read_to_string(&config_path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(WorkspaceConfig::default());
        }
        Err(e) => {
            return Err(StoreError::Read {
                path: config_path,
                source: e,
            });
        }
    };
    Ok(toml::from_str(&config_text)?)
}

/// Write the commented config template for a new workspace.
/// Returns false without writing if adq.toml exists and `force` is off.
pub fn write_config_template(root: &Path, name: &str, force: bool) -> Result<bool, StoreError> {
    let config_path = root.join(CONFIG_FILE);
    if config_path.exists() && !force {
        return Ok(false);
    }
    fs::create_dir_all(root)?;
    let quoted = toml::Value::String(name.to_string()).to_string();
    let content = CONFIG_TEMPLATE.replace("{name}", &quoted);
    atomic_write(&config_path, content.as_bytes()).map_err(|e| StoreError::Write {
        path: config_path,
        source: e,
    })?;
    Ok(true)
}
