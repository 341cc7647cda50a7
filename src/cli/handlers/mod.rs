mod init;
pub use init::cmd_init;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::cli::session;
use crate::io::image_dir::{self, FsImageDir};
use crate::io::workspace_io::{self, Workspace};
use crate::model::project::{Project, ProjectPointer};
use crate::model::task::{Task, TaskState};
use crate::ops::catalog::{Catalog, Viewer};
use crate::ops::check;
use crate::ops::search::{self, HitKind};

/// Environment variable naming the workspace when -C is not given
pub const WORKSPACE_ENV: &str = "ADQ_WORKSPACE";

type CmdResult = Result<(), Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let workspace = || open_workspace(cli.workspace.as_deref());

    match cli.command {
        // Init runs before there is a workspace to discover
        Commands::Init(args) => cmd_init(args, cli.workspace.as_deref()),

        Commands::Project(cmd) => match cmd.action {
            ProjectAction::Add(args) => cmd_project_add(&workspace()?, args, json),
            ProjectAction::List => cmd_project_list(&workspace()?, json),
            ProjectAction::Show(args) => cmd_project_show(&workspace()?, args.id, json),
        },
        Commands::Task(cmd) => match cmd.action {
            TaskAction::Add(args) => cmd_task_add(&workspace()?, args, json),
            TaskAction::List(args) => cmd_task_list(&workspace()?, args, json),
            TaskAction::Show(args) => cmd_task_show(&workspace()?, args.id, json),
            TaskAction::State(args) => cmd_task_state(&workspace()?, args),
            TaskAction::Remove(args) => cmd_task_remove(&workspace()?, args.id),
        },
        Commands::Search(args) => cmd_search(&workspace()?, args, json),
        Commands::Check => cmd_check(&workspace()?, json),
        Commands::Annotate(args) => cmd_annotate(&workspace()?, args, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Resolve the workspace root: -C flag, then $ADQ_WORKSPACE, then walk up
/// from the current directory
fn open_workspace(flag: Option<&str>) -> Result<Workspace, Box<dyn std::error::Error>> {
    let explicit = flag
        .map(str::to_string)
        .or_else(|| std::env::var(WORKSPACE_ENV).ok().filter(|s| !s.is_empty()));
    let root = match explicit {
        Some(dir) => {
            let abs = std::fs::canonicalize(&dir)
                .map_err(|e| format!("cannot resolve workspace path '{}': {}", dir, e))?;
            workspace_io::discover_workspace(&abs)?
        }
        None => workspace_io::discover_workspace(&std::env::current_dir()?)?,
    };
    tracing::debug!(root = %root.display(), "workspace resolved");
    Ok(Workspace::open(&root)?)
}

fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Paths on the command line are relative to the current directory
fn resolve_dir(dir: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let path = Path::new(dir);
    if !path.is_dir() {
        return Err(format!("not a directory: {}", dir).into());
    }
    Ok(path.to_path_buf())
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

fn cmd_project_add(workspace: &Workspace, args: ProjectAddArgs, json: bool) -> CmdResult {
    let mut catalog = Catalog::open_for_write(workspace.clone())?;

    let mut project = Project::new(-1, args.name);
    project.description = args.description;
    project.dataset_name = args.dataset;
    if let Some(dir) = args.data_dir {
        let files = image_dir::data_files(&resolve_dir(&dir)?, &workspace.config.images.extensions)?;
        project.total_count = files.values().map(|v| v.len() as i64).sum();
        project.data_files = files;
    }

    let id = catalog.create_project(project)?;
    catalog.save()?;

    if json {
        return print_json(&CreatedJson { kind: "project", id });
    }
    println!("{}", id);
    Ok(())
}

fn cmd_project_list(workspace: &Workspace, json: bool) -> CmdResult {
    let catalog = Catalog::open(workspace.clone())?;
    let pointers = &catalog.project_pointers.project_pointers;
    if json {
        return print_json(pointers);
    }
    for pointer in pointers {
        println!("{}", format_project_line(pointer));
    }
    Ok(())
}

fn cmd_project_show(workspace: &Workspace, id: i64, json: bool) -> CmdResult {
    let catalog = Catalog::open(workspace.clone())?;
    let project = catalog.load_project(id)?;
    if json {
        return print_json(&project);
    }
    println!("{}", format_project_line(&ProjectPointer::from(&project)));
    if let Some(desc) = &project.description {
        println!("  description: {}", desc);
    }
    if let Some(dataset) = &project.dataset_name {
        println!("  dataset: {}", dataset);
    }
    println!("  created: {}", project.created_at);
    println!(
        "  tasks: {} ({} done)",
        project.task_total_count, project.task_done_count
    );
    for (group, files) in &project.data_files {
        println!("  data [{}]: {} files", group, files.len());
    }
    for (group, files) in catalog.label_files(id)? {
        println!("  labels [{}]: {}", group, files.join(", "));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

fn cmd_task_add(workspace: &Workspace, args: TaskAddArgs, json: bool) -> CmdResult {
    let mut catalog = Catalog::open_for_write(workspace.clone())?;
    let defaults = &workspace.config.tasks;

    let mut task = Task::new(Task::UNASSIGNED_ID, args.name, args.project_id, args.dir.unwrap_or_default());
    task.anno_file_name = args.anno_file;
    task.annotator_id = args.annotator.unwrap_or(defaults.default_annotator_id);
    task.reviewer_id = args.reviewer.unwrap_or(defaults.default_reviewer_id);
    task.description = args.description;

    let id = catalog.create_task(task)?;
    catalog.save()?;

    if json {
        return print_json(&CreatedJson { kind: "task", id });
    }
    println!("{}", id);
    Ok(())
}

fn cmd_task_list(workspace: &Workspace, args: TaskListArgs, json: bool) -> CmdResult {
    let catalog = Catalog::open(workspace.clone())?;
    let state = args.state.as_deref().map(TaskState::from_label).transpose()?;
    let viewer = match args.reviewer {
        Some(user_id) if !args.admin => Viewer {
            user_id,
            is_admin: false,
        },
        _ => Viewer::admin(),
    };

    let tasks: Vec<&Task> = catalog
        .visible_tasks(args.project, viewer)
        .into_iter()
        .filter(|t| state.is_none_or(|s| t.state == s))
        .collect();

    if json {
        return print_json(&TaskListJson {
            project_id: args.project,
            tasks: tasks.iter().map(|t| TaskRowJson::from(*t)).collect(),
        });
    }
    for task in tasks {
        println!("{}", format_task_line(task));
    }
    Ok(())
}

fn cmd_task_show(workspace: &Workspace, id: i64, json: bool) -> CmdResult {
    let catalog = Catalog::open(workspace.clone())?;
    let task = catalog.load_task(id)?;
    if json {
        return print_json(&task);
    }
    println!("{}", format_task_line(&task));
    println!("  project: {}", task.project_id);
    println!("  dir: {}", task.dir_name);
    if let Some(anno) = &task.anno_file_name {
        println!("  annotation: {}", anno);
    }
    if let Some(desc) = &task.description {
        println!("  description: {}", desc);
    }
    println!("  updated: {}", task.updated_at);
    println!(
        "  counts: data {}  objects {}  errors {}",
        task.data_count, task.object_count, task.error_count
    );
    Ok(())
}

fn cmd_task_state(workspace: &Workspace, args: TaskStateArgs) -> CmdResult {
    let new_state = TaskState::from_label(&args.state).map_err(|_| {
        format!(
            "unknown state: {} (expected one of {})",
            args.state,
            TaskState::all_labels().join(", ")
        )
    })?;
    let mut catalog = Catalog::open_for_write(workspace.clone())?;
    catalog.set_task_state(args.id, new_state)?;
    catalog.save()?;
    println!("{} → {}", args.id, new_state);
    Ok(())
}

fn cmd_task_remove(workspace: &Workspace, id: i64) -> CmdResult {
    let mut catalog = Catalog::open_for_write(workspace.clone())?;
    let task = catalog.remove_task(id)?;
    catalog.save()?;
    println!("removed {}", format_task_line(&task));
    Ok(())
}

// ---------------------------------------------------------------------------
// Search, check
// ---------------------------------------------------------------------------

fn cmd_search(workspace: &Workspace, args: SearchArgs, json: bool) -> CmdResult {
    let catalog = Catalog::open(workspace.clone())?;
    let re = Regex::new(&args.pattern)?;

    let mut hits = search::search_projects(&catalog.projects.projects, &re);
    hits.extend(search::search_tasks(&catalog.tasks.tasks, &re, args.project));

    let name_of = |kind: HitKind, id: i64| -> String {
        match kind {
            HitKind::Project => catalog.projects.get_by_id(id).map(|p| p.name.clone()),
            HitKind::Task => catalog.tasks.get_by_id(id).map(|t| t.name.clone()),
        }
        .unwrap_or_default()
    };

    // one line per record, naming the first field that matched
    let mut seen = HashSet::new();
    let hits: Vec<_> = hits
        .into_iter()
        .filter(|h| seen.insert((h.kind, h.id)))
        .collect();

    if json {
        let rows: Vec<SearchHitJson> = hits
            .iter()
            .map(|h| SearchHitJson {
                kind: h.kind,
                id: h.id,
                project_id: h.project_id,
                field: h.field,
                name: name_of(h.kind, h.id),
            })
            .collect();
        return print_json(&rows);
    }
    for hit in &hits {
        println!("{}", format_search_hit(hit, &name_of(hit.kind, hit.id)));
    }
    Ok(())
}

fn cmd_check(workspace: &Workspace, json: bool) -> CmdResult {
    let result = check::check_workspace(workspace)?;

    if json {
        print_json(&result)?;
    } else {
        if !result.errors.is_empty() {
            println!("Errors:");
            for err in &result.errors {
                match err {
                    check::CheckError::InvalidDocument { document, message } => {
                        println!("  {}: {}", document, message);
                    }
                    check::CheckError::InvalidRecord {
                        document,
                        index,
                        message,
                    } => {
                        println!("  {} entry {}: {}", document, index, message);
                    }
                    check::CheckError::DuplicateId {
                        document,
                        id,
                        count,
                    } => {
                        println!("  {} has id {} {} times", document, id, count);
                    }
                    check::CheckError::MissingPointer { kind, id } => {
                        println!("  {} {} has no pointer", kind, id);
                    }
                    check::CheckError::OrphanPointer { kind, id } => {
                        println!("  {} {} points at nothing", kind, id);
                    }
                    check::CheckError::PointerMismatch { kind, id } => {
                        println!("  {} {} disagrees with its pointer", kind, id);
                    }
                    check::CheckError::UnknownProject {
                        task_id,
                        project_id,
                    } => {
                        println!("  task {} references unknown project {}", task_id, project_id);
                    }
                }
            }
        }
        if !result.warnings.is_empty() {
            if !result.errors.is_empty() {
                println!();
            }
            println!("Warnings:");
            for warn in &result.warnings {
                match warn {
                    check::CheckWarning::StaleCount {
                        document,
                        stored,
                        actual,
                    } => {
                        println!("  {} num_count is {} but holds {}", document, stored, actual);
                    }
                    check::CheckWarning::MissingDetailFile { kind, id, path } => {
                        println!("  {} {} detail file missing: {}", kind, id, path);
                    }
                    check::CheckWarning::StaleDetailFile { kind, id, path } => {
                        println!("  {} {} detail file is stale: {}", kind, id, path);
                    }
                }
            }
        }
        if result.valid {
            println!("✓ workspace is valid");
        } else {
            println!("✗ workspace has errors");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Annotate
// ---------------------------------------------------------------------------

fn cmd_annotate(workspace: &Workspace, args: AnnotateArgs, json: bool) -> CmdResult {
    let img_dir = resolve_dir(&args.image_dir)?;
    let label_dir = args
        .labels
        .map(PathBuf::from)
        .unwrap_or_else(|| img_dir.clone());
    let dir = FsImageDir::new(&img_dir, &label_dir, &workspace.config.images);

    if !json {
        eprintln!("{}", session::HELP);
    }
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    session::run(&dir, stdin.lock(), &mut stdout, json)
}
