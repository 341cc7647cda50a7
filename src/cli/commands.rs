use clap::{Args, Parser, Subcommand};

use crate::model::record::parse_selection;

#[derive(Parser)]
#[command(name = "adq", about = concat!("adq v", env!("CARGO_PKG_VERSION"), " - image annotation projects and tasks"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different workspace directory
    #[arg(short = 'C', long = "workspace", global = true)]
    pub workspace: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new workspace in the current directory
    Init(InitArgs),
    /// Manage projects (add, list, show)
    Project(ProjectCmd),
    /// Manage tasks (add, list, show, state, remove)
    Task(TaskCmd),
    /// Search project and task names by regex
    Search(SearchArgs),
    /// Validate registry and pointer consistency
    Check,
    /// Step through a directory of images and save annotations
    Annotate(AnnotateArgs),
}

// ---------------------------------------------------------------------------
// Init args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Workspace name (default: inferred from directory name)
    #[arg(long)]
    pub name: Option<String>,
    /// Overwrite an existing adq.toml
    #[arg(long)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ProjectCmd {
    #[command(subcommand)]
    pub action: ProjectAction,
}

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Register a new project
    Add(ProjectAddArgs),
    /// List projects from the pointer index
    List,
    /// Show one project in full
    Show(IdArg),
}

#[derive(Args)]
pub struct ProjectAddArgs {
    /// Project name
    pub name: String,
    /// Directory whose images become the project's data files
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<String>,
    /// Free-form description
    #[arg(long)]
    pub description: Option<String>,
    /// Dataset name
    #[arg(long)]
    pub dataset: Option<String>,
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct TaskCmd {
    #[command(subcommand)]
    pub action: TaskAction,
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Register a new task under a project
    Add(TaskAddArgs),
    /// List tasks
    List(TaskListArgs),
    /// Show one task in full
    Show(IdArg),
    /// Change task state (New, Working, Done, Closed)
    State(TaskStateArgs),
    /// Remove a task
    Remove(IdArg),
}

#[derive(Args)]
pub struct TaskAddArgs {
    /// Owning project id
    pub project_id: i64,
    /// Task name
    pub name: String,
    /// Working directory, relative to the workspace (default: the project's)
    #[arg(long)]
    pub dir: Option<String>,
    /// Annotation file reference
    #[arg(long, value_name = "FILE")]
    pub anno_file: Option<String>,
    /// Annotator user id (default from adq.toml)
    #[arg(long, allow_negative_numbers = true)]
    pub annotator: Option<i64>,
    /// Reviewer user id (default from adq.toml)
    #[arg(long, allow_negative_numbers = true)]
    pub reviewer: Option<i64>,
    /// Free-form description
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args)]
pub struct TaskListArgs {
    /// Only tasks of this project
    #[arg(long)]
    pub project: Option<i64>,
    /// Filter by state label
    #[arg(long)]
    pub state: Option<String>,
    /// List as this reviewer; without --admin only their tasks are shown
    #[arg(long, allow_negative_numbers = true)]
    pub reviewer: Option<i64>,
    /// List as an administrator (every task)
    #[arg(long)]
    pub admin: bool,
}

#[derive(Args)]
pub struct TaskStateArgs {
    /// Task id
    pub id: i64,
    /// New state label
    pub state: String,
}

#[derive(Args)]
pub struct IdArg {
    /// Record id, or an `<id>-<name>` label as printed by list
    #[arg(value_parser = parse_id)]
    pub id: i64,
}

fn parse_id(s: &str) -> Result<i64, String> {
    s.parse()
        .ok()
        .or_else(|| parse_selection(s))
        .ok_or_else(|| format!("expected an id or <id>-<name>, got '{}'", s))
}

// ---------------------------------------------------------------------------
// Search, annotate
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct SearchArgs {
    /// Regex pattern
    pub pattern: String,
    /// Only search this project's tasks (projects are always searched)
    #[arg(long)]
    pub project: Option<i64>,
}

#[derive(Args)]
pub struct AnnotateArgs {
    /// Directory of images to walk through
    pub image_dir: String,
    /// Where annotation files are read and written (default: the image dir)
    #[arg(long, value_name = "DIR")]
    pub labels: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_parse_id_accepts_labels() {
        assert_eq!(parse_id("3"), Ok(3));
        assert_eq!(parse_id("3-batch-03"), Ok(3));
        assert!(parse_id("batch").is_err());
    }

    #[test]
    fn test_cli_parses_task_show_label() {
        let cli = Cli::try_parse_from(["adq", "task", "show", "7-night-batch", "--json"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Task(TaskCmd {
                action: TaskAction::Show(arg),
            }) => assert_eq!(arg.id, 7),
            _ => panic!("expected task show"),
        }
    }

    #[test]
    fn test_group_help_names_every_action() {
        let cli = Cli::command();
        for group in cli.get_subcommands().filter(|c| c.has_subcommands()) {
            let about = group.get_about().map(|a| a.to_string()).unwrap_or_default();
            let actions: Vec<&str> = group
                .get_subcommands()
                .map(|c| c.get_name())
                .filter(|name| *name != "help")
                .collect();
            for action in &actions {
                assert!(about.contains(action), "{}: '{}' missing from '{}'", group.get_name(), action, about);
            }
            let listed = about
                .split_once('(')
                .and_then(|(_, rest)| rest.strip_suffix(')'))
                .unwrap_or_default();
            for word in listed.split(", ") {
                assert!(actions.contains(&word), "{}: no '{}' action", group.get_name(), word);
            }
        }
    }
}
