//! Selected snapshot overview
//!
//! Shows which files changed between the two snapshots of a pair (or between
//! a single snapshot and the running system), and how one chosen file changed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use snapview_common::{format_date, FileIndex, Snapshot, SnapshotType, TreeItem, CURRENT_SYSTEM};

use crate::modification::{ChangeKind, FileModification};

const BLUE: &str = "\x1b[34m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Heading information of the overview
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverviewHeader {
    /// `"3 - 4"` for a pair, `"7"` for a single snapshot
    pub tree_label: String,
    /// Path of the subvolume the snapshots belong to
    pub subvolume_path: String,
    pub description: String,
    pub dates: Vec<(&'static str, Option<DateTime<Utc>>)>,
}

/// Build the header; `pre` is the first snapshot of a pair
pub fn overview_header(pre: Option<&Snapshot>, snapshot: &Snapshot, snapshot_path: &str) -> OverviewHeader {
    let subvolume_path = match snapshot_path.find(".snapshots/") {
        Some(pos) => snapshot_path[..pos].to_string(),
        None => snapshot_path.to_string(),
    };

    match pre {
        Some(pre) => OverviewHeader {
            tree_label: format!("{} - {}", pre.num, snapshot.num),
            subvolume_path,
            description: pre.description.clone(),
            dates: vec![
                ("Time of taking the first snapshot:", pre.date),
                ("Time of taking the second snapshot:", snapshot.date),
            ],
        },
        None => OverviewHeader {
            tree_label: snapshot.name(),
            subvolume_path,
            description: snapshot.description.clone(),
            dates: vec![("Time of taking the snapshot:", snapshot.date)],
        },
    }
}

pub fn render_header(header: &OverviewHeader, date_format: &str) -> String {
    let mut out = format!("Snapshot {}", header.tree_label);
    if !header.description.is_empty() {
        out.push_str(&format!(": {}", header.description));
    }
    out.push('\n');
    for (label, date) in &header.dates {
        out.push_str(&format!("{label} {}\n", format_date(*date, date_format)));
    }
    out.push_str(&header.subvolume_path);
    out.push('\n');
    out
}

/// Render the modified-file tree, one node per line
pub fn render_tree(items: &[TreeItem]) -> String {
    let mut out = String::new();
    push_items(&mut out, items, 0);
    out
}

fn push_items(out: &mut String, items: &[TreeItem], depth: usize) {
    for item in items {
        out.push_str(&format!(
            "{}{} {}\n",
            "  ".repeat(depth),
            item.kind.marker(),
            item.label
        ));
        push_items(out, &item.children, depth + 1);
    }
}

/// Which two trees a file is compared between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffChoice {
    /// The snapshot (or first of a pair) against the running system for
    /// singles, first against second for pairs
    Default,
    /// Single snapshot against another snapshot
    Other(u32),
    FirstToCurrent,
    SecondToCurrent,
}

impl DiffChoice {
    /// Snapshot numbers to compare for a snapshot of type `kind`
    ///
    /// `first` and `second` are the comparison range of the selected snapshot.
    pub fn resolve(&self, kind: SnapshotType, first: u32, second: u32) -> Result<(u32, u32), String> {
        let single = kind == SnapshotType::Single;
        match (self, single) {
            (Self::Default, true) => Ok((first, CURRENT_SYSTEM)),
            (Self::Default, false) => Ok((first, second)),
            (Self::Other(other), true) => Ok((first, *other)),
            (Self::FirstToCurrent, false) => Ok((first, CURRENT_SYSTEM)),
            (Self::SecondToCurrent, false) => Ok((second, CURRENT_SYSTEM)),
            (Self::Other(_), false) => {
                Err("Comparing with another snapshot is only possible for single snapshots".to_string())
            }
            (_, true) => Err("A single snapshot has no second snapshot to compare".to_string()),
        }
    }
}

/// Text lines describing a file modification
pub fn modification_text(modification: &FileModification) -> Vec<String> {
    let mut lines = Vec::new();

    if modification.has(ChangeKind::Created) {
        lines.push("New file was created.".to_string());
    }
    if modification.has(ChangeKind::Removed) {
        lines.push("File was removed.".to_string());
    }
    if modification.has(ChangeKind::NoChange) {
        lines.push("File content was not changed.".to_string());
    }
    if modification.has(ChangeKind::None) {
        lines.push("File does not exist in either snapshot.".to_string());
    }
    if modification.has(ChangeKind::Diff) {
        lines.push("File content was modified.".to_string());
    }
    if let Some(mode) = &modification.mode {
        lines.push(format!(
            "File mode was changed from '{}' to '{}'.",
            mode.old, mode.new
        ));
    }
    if let Some(user) = &modification.user {
        lines.push(format!(
            "File user ownership was changed from '{}' to '{}'.",
            user.old, user.new
        ));
    }
    if let Some(group) = &modification.group {
        lines.push(format!(
            "File group ownership was changed from '{}' to '{}'.",
            group.old, group.new
        ));
    }

    lines
}

/// Color added lines blue and removed lines red
pub fn colorize_diff(diff: &str, color: bool) -> String {
    if !color {
        return diff.to_string();
    }

    diff.lines()
        .map(|line| {
            if line.starts_with('+') {
                format!("{BLUE}{line}{RESET}\n")
            } else if line.starts_with('-') {
                format!("{RED}{line}{RESET}\n")
            } else {
                format!("{line}\n")
            }
        })
        .collect()
}

/// Diff text shown below the modification lines, error output included
pub fn diff_body(modification: &FileModification) -> Option<&str> {
    Some(modification.diff.as_str()).filter(|diff| !diff.is_empty())
}

fn status_of<'a>(index: &'a FileIndex, file: &str) -> Option<&'a snapview_common::FileStatus> {
    index.get(file).map(|entry| &entry.status)
}

pub fn file_was_created(index: &FileIndex, file: &str) -> bool {
    status_of(index, file).is_some_and(|s| s.is_created())
}

pub fn file_was_removed(index: &FileIndex, file: &str) -> bool {
    status_of(index, file).is_some_and(|s| s.is_deleted())
}

/// Button labels for restoring a file: first snapshot (pairs only), second
pub fn restore_labels(kind: SnapshotType, created: bool) -> (Option<&'static str>, &'static str) {
    match (kind, created) {
        (SnapshotType::Single, false) => (None, "Restore"),
        (SnapshotType::Single, true) => (None, "Remove"),
        (_, false) => (Some("Restore from First"), "Restore from Second"),
        (_, true) => (Some("Remove"), "Restore from Second"),
    }
}

/// Check that `file` can be restored from the second snapshot of a pair
pub fn check_restore_from_second(kind: SnapshotType, index: &FileIndex, file: &str) -> Result<(), String> {
    if kind != SnapshotType::Single && file_was_removed(index, file) {
        return Err(format!(
            "{file} was removed in the second snapshot and cannot be restored from it"
        ));
    }
    Ok(())
}
