//! Per-file comparison between two snapshot trees

use nix::unistd::{Gid, Group, Uid, User};
use serde::Serialize;
use std::fs::Metadata;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::path::Path;
use std::process::Command;

/// One finding of a file comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    NoChange,
    Diff,
    Mode,
    User,
    Group,
    Created,
    Removed,
    /// The file exists in neither tree
    None,
}

/// Value of an attribute before and after
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub old: String,
    pub new: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileModification {
    pub status: Vec<ChangeKind>,
    /// Unified diff, or the error output of the diff program
    pub diff: String,
    pub mode: Option<Change>,
    pub user: Option<Change>,
    pub group: Option<Change>,
}

impl FileModification {
    pub fn has(&self, kind: ChangeKind) -> bool {
        self.status.contains(&kind)
    }
}

/// Compare the file at `old` with the file at `new`
pub fn compare_files(old: &Path, new: &Path, diff_command: &Path) -> FileModification {
    log::info!("comparing '{}' and '{}'", old.display(), new.display());

    let old_meta = std::fs::symlink_metadata(old).ok();
    let new_meta = std::fs::symlink_metadata(new).ok();

    let mut modification = FileModification::default();

    let (old_meta, new_meta) = match (old_meta, new_meta) {
        (Some(o), Some(n)) => (o, n),
        (Some(_), None) => {
            modification.status.push(ChangeKind::Removed);
            return modification;
        }
        (None, Some(_)) => {
            modification.status.push(ChangeKind::Created);
            return modification;
        }
        (None, None) => {
            modification.status.push(ChangeKind::None);
            return modification;
        }
    };

    modification.status.push(ChangeKind::NoChange);

    if !old_meta.is_dir() && !new_meta.is_dir() {
        match run_diff(diff_command, old, new) {
            Ok((stdout, stderr)) => {
                // Error output wins; the file then counts as unchanged
                if !stderr.is_empty() {
                    modification.diff = stderr;
                } else if !stdout.is_empty() {
                    modification.status = vec![ChangeKind::Diff];
                    modification.diff = stdout;
                }
            }
            Err(e) => {
                log::warn!("Failed to run {}: {e}", diff_command.display());
                modification.diff = e.to_string();
            }
        }
    }

    let old_mode = mode_string(&old_meta);
    let new_mode = mode_string(&new_meta);
    if old_mode != new_mode {
        modification.status.push(ChangeKind::Mode);
        modification.mode = Some(Change {
            old: old_mode,
            new: new_mode,
        });
    }

    let old_user = user_name(old_meta.uid());
    let new_user = user_name(new_meta.uid());
    if old_user != new_user {
        modification.status.push(ChangeKind::User);
        modification.user = Some(Change {
            old: old_user,
            new: new_user,
        });
    }

    let old_group = group_name(old_meta.gid());
    let new_group = group_name(new_meta.gid());
    if old_group != new_group {
        modification.status.push(ChangeKind::Group);
        modification.group = Some(Change {
            old: old_group,
            new: new_group,
        });
    }

    modification
}

fn run_diff(diff_command: &Path, old: &Path, new: &Path) -> std::io::Result<(String, String)> {
    let output = Command::new(diff_command)
        .arg("-u")
        .arg("--")
        .arg(old)
        .arg(new)
        .output()?;

    Ok((
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    ))
}

/// Permissions in `ls -l` form, e.g. `-rw-r--r--` or `-rwsr-xr-x`
pub fn mode_string(meta: &Metadata) -> String {
    let file_type = meta.file_type();
    let kind = if file_type.is_dir() {
        'd'
    } else if file_type.is_symlink() {
        'l'
    } else if file_type.is_fifo() {
        'p'
    } else if file_type.is_char_device() {
        'c'
    } else if file_type.is_block_device() {
        'b'
    } else if file_type.is_socket() {
        's'
    } else {
        '-'
    };

    let mode = meta.permissions().mode();
    let mut text = String::with_capacity(10);
    text.push(kind);
    // (shift, special bit, char with x, char without x)
    for (shift, special, set, unset) in [
        (6, 0o4000, 's', 'S'),
        (3, 0o2000, 's', 'S'),
        (0, 0o1000, 't', 'T'),
    ] {
        let bits = (mode >> shift) & 0o7;
        text.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        text.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        let exec = bits & 0o1 != 0;
        text.push(match (mode & special != 0, exec) {
            (true, true) => set,
            (true, false) => unset,
            (false, true) => 'x',
            (false, false) => '-',
        });
    }
    text
}

fn user_name(uid: u32) -> String {
    match User::from_uid(Uid::from_raw(uid)) {
        Ok(Some(user)) => user.name,
        _ => uid.to_string(),
    }
}

fn group_name(gid: u32) -> String {
    match Group::from_gid(Gid::from_raw(gid)) {
        Ok(Some(group)) => group.name,
        _ => gid.to_string(),
    }
}
