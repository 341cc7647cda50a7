use std::path::PathBuf;

use crate::cli::commands::InitArgs;
use crate::io::config_io;
use crate::io::workspace_io::{self, CONFIG_FILE};

/// Infer a workspace name from a directory name: replace hyphens and
/// underscores with spaces, title-case.
fn infer_name(dir_name: &str) -> String {
    dir_name
        .split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => {
                    let upper: String = c.to_uppercase().collect();
                    upper + chars.as_str()
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Create adq.toml in `target` (or the current directory)
pub fn cmd_init(args: InitArgs, target: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let root = match target {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };

    if root.join(CONFIG_FILE).is_file() && !args.force {
        return Err(format!(
            "workspace already exists at {} (use --force to overwrite adq.toml)",
            root.display()
        )
        .into());
    }

    if let Some(parent) = root.parent()
        && let Ok(parent_root) = workspace_io::discover_workspace(parent)
    {
        eprintln!("Note: enclosing workspace found at {}/", parent_root.display());
    }

    let name = args.name.unwrap_or_else(|| {
        root.canonicalize()
            .ok()
            .and_then(|p| p.file_name().and_then(|n| n.to_str()).map(infer_name))
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Untitled".to_string())
    });

    config_io::write_config_template(&root, &name, args.force)?;
    tracing::info!(root = %root.display(), "workspace initialized");
    println!("Initialized adq workspace: {}", name);
    Ok(())
}
