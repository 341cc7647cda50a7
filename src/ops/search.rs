use std::ops::Range;

use regex::Regex;
use serde::Serialize;

use crate::model::project::Project;
use crate::model::task::Task;

/// Which field of a record matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    Name,
    Description,
    Dataset,
    Annotator,
    Reviewer,
}

/// What kind of record a hit belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HitKind {
    Project,
    Task,
}

/// A search hit on one field of one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub kind: HitKind,
    pub id: i64,
    pub project_id: i64,
    pub field: MatchField,
    pub spans: Vec<Range<usize>>,
}

/// Collect all non-overlapping match byte-ranges for a regex in the given text.
fn find_matches(re: &Regex, text: &str) -> Vec<Range<usize>> {
    re.find_iter(text).map(|m| m.start()..m.end()).collect()
}

fn push_hit(
    hits: &mut Vec<SearchHit>,
    re: &Regex,
    (kind, id, project_id): (HitKind, i64, i64),
    field: MatchField,
    text: Option<&str>,
) {
    let Some(text) = text else { return };
    let spans = find_matches(re, text);
    if !spans.is_empty() {
        hits.push(SearchHit {
            kind,
            id,
            project_id,
            field,
            spans,
        });
    }
}

/// Search project names, descriptions and dataset names
pub fn search_projects<'a>(projects: impl IntoIterator<Item = &'a Project>, re: &Regex) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    for project in projects {
        let key = (HitKind::Project, project.id, project.id);
        push_hit(&mut hits, re, key, MatchField::Name, Some(&project.name));
        push_hit(&mut hits, re, key, MatchField::Description, project.description.as_deref());
        push_hit(&mut hits, re, key, MatchField::Dataset, project.dataset_name.as_deref());
    }
    hits
}

/// Search task names, descriptions and annotator/reviewer names.
///
/// If `project_filter` is `Some`, only that project's tasks are searched.
pub fn search_tasks<'a>(
    tasks: impl IntoIterator<Item = &'a Task>,
    re: &Regex,
    project_filter: Option<i64>,
) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    for task in tasks {
        if project_filter.is_some_and(|id| id != task.project_id) {
            continue;
        }
        let key = (HitKind::Task, task.id, task.project_id);
        push_hit(&mut hits, re, key, MatchField::Name, Some(&task.name));
        push_hit(&mut hits, re, key, MatchField::Description, task.description.as_deref());
        push_hit(&mut hits, re, key, MatchField::Annotator, task.annotator_fullname.as_deref());
        push_hit(&mut hits, re, key, MatchField::Reviewer, task.reviewer_fullname.as_deref());
    }
    hits
}
