//! Line-driven annotation session.
//!
//! Reads one command per line and drives a [`Navigator`] over an image
//! directory. Every command answers with the resulting cursor status.

use std::io::{BufRead, Write};

use crate::cli::output::{SessionEventJson, format_status};
use crate::io::image_dir::{ImageDir, empty_voc_annotation};
use crate::ops::navigate::{NavError, NavWarning, Navigator};

pub const HELP: &str = "\
n          next image
p          previous image
u          next un-annotated image
g <file>   go to an image
r          rescan the directory
s          save an annotation for the current image
status     show position and counts
q          quit";

enum Step {
    Moved(Vec<NavWarning>),
    Saved(String, Vec<NavWarning>),
    Quit,
    Message(String),
}

fn step(nav: &mut Navigator, dir: &dyn ImageDir, line: &str) -> Result<Step, NavError> {
    let (cmd, arg) = match line.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (line, ""),
    };
    let step = match cmd {
        "n" => Step::Moved(nav.next_image()),
        "p" => Step::Moved(nav.previous_image()),
        "u" => Step::Moved(nav.jump_to_next_unannotated()),
        "g" if arg.is_empty() => Step::Message("usage: g <file>".into()),
        "g" => {
            nav.go_to(arg)?;
            Step::Moved(Vec::new())
        }
        "r" => {
            nav.refresh(dir)?;
            Step::Moved(Vec::new())
        }
        "s" => {
            let image = nav.current_image().ok_or(NavError::NoImage)?.to_string();
            let outcome = nav.save_annotation(dir, empty_voc_annotation(&image).as_bytes())?;
            Step::Saved(outcome.annotation, outcome.warnings)
        }
        "status" => Step::Moved(Vec::new()),
        "q" | "quit" => Step::Quit,
        "?" | "help" => Step::Message(HELP.into()),
        other => Step::Message(format!("unknown command: {} (try ?)", other)),
    };
    Ok(step)
}

fn report<W: Write>(
    out: &mut W,
    nav: &Navigator,
    warnings: Vec<NavWarning>,
    saved: Option<&str>,
    json: bool,
) -> std::io::Result<()> {
    if json {
        let event = SessionEventJson {
            warnings,
            saved,
            status: nav.status(),
        };
        let line = serde_json::to_string(&event).map_err(std::io::Error::other)?;
        return writeln!(out, "{}", line);
    }
    for warning in &warnings {
        writeln!(out, "warning: {}", warning)?;
    }
    if let Some(name) = saved {
        writeln!(out, "saved {}", name)?;
    }
    writeln!(out, "{}", format_status(&nav.status()))
}

/// Run a session until `q` or end of input
pub fn run<R: BufRead, W: Write>(
    dir: &dyn ImageDir,
    input: R,
    out: &mut W,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut nav = Navigator::open(dir)?;
    report(out, &nav, Vec::new(), None, json)?;

    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match step(&mut nav, dir, line) {
            Ok(Step::Quit) => break,
            Ok(Step::Moved(warnings)) => report(out, &nav, warnings, None, json)?,
            Ok(Step::Saved(name, warnings)) => report(out, &nav, warnings, Some(&name), json)?,
            Ok(Step::Message(msg)) => writeln!(out, "{}", msg)?,
            // a bad file name or failed save ends the command, not the session
            Err(e) => writeln!(out, "error: {}", e)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::image_dir::FsImageDir;
    use crate::model::config::ImageConfig;
    use tempfile::TempDir;

    fn image_dir(tmp: &TempDir, names: &[&str]) -> FsImageDir {
        for name in names {
            std::fs::write(tmp.path().join(name), b"").unwrap();
        }
        FsImageDir::new(tmp.path(), tmp.path(), &ImageConfig::default())
    }

    fn run_script(dir: &FsImageDir, script: &str, json: bool) -> String {
        let mut out = Vec::new();
        run(dir, script.as_bytes(), &mut out, json).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_walk_and_boundaries() {
        let tmp = TempDir::new().unwrap();
        let dir = image_dir(&tmp, &["a.jpg", "b.jpg"]);
        let out = run_script(&dir, "p\nn\nn\nq\nn\n", false);
        insta::assert_snapshot!(out, @r"
        a.jpg (1/2)  annotated 0  remaining 2
        warning: this is the first image
        a.jpg (1/2)  annotated 0  remaining 2
        b.jpg (2/2)  annotated 0  remaining 2
        warning: this is the last image
        b.jpg (2/2)  annotated 0  remaining 2
        ");
    }

    #[test]
    fn test_save_writes_annotation_and_advances() {
        let tmp = TempDir::new().unwrap();
        let dir = image_dir(&tmp, &["a.jpg", "b.jpg", "c.jpg"]);
        std::fs::write(tmp.path().join("b.xml"), b"").unwrap();

        let out = run_script(&dir, "s\n", false);
        assert!(out.contains("saved a.xml\nc.jpg (3/3)  annotated 2  remaining 1"));
        assert!(tmp.path().join("a.xml").is_file());
    }

    #[test]
    fn test_bad_commands_keep_session_alive() {
        let tmp = TempDir::new().unwrap();
        let dir = image_dir(&tmp, &["a.jpg"]);
        let out = run_script(&dir, "g nope.jpg\nxyz\ng\nstatus\n", false);
        assert!(out.contains("error: image not found in this directory: nope.jpg"));
        assert!(out.contains("unknown command: xyz"));
        assert!(out.contains("usage: g <file>"));
        assert!(out.trim_end().ends_with("a.jpg (1/1)  annotated 0  remaining 1"));
    }

    #[test]
    fn test_json_events() {
        let tmp = TempDir::new().unwrap();
        let dir = image_dir(&tmp, &["a.jpg"]);
        let out = run_script(&dir, "n\n", true);
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["warnings"][0], "last_image");
        assert_eq!(lines[1]["status"]["current"], "a.jpg");
    }

    #[test]
    fn test_empty_directory_save_is_error() {
        let tmp = TempDir::new().unwrap();
        let dir = image_dir(&tmp, &[]);
        let out = run_script(&dir, "s\n", false);
        assert!(out.contains("error: no image to annotate"));
    }
}
