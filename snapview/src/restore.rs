//! Restoring files from a snapshot onto the running system
//!
//! Each file is handled on its own. A failing step is logged and counted;
//! nothing is retried or rolled back.

use nix::unistd::{chown, Gid, Uid};
use serde::Serialize;
use std::fs;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;
use std::process::Command;

use crate::backend::SnapperBackend;
use crate::session::Session;
use snapview_common::join_subvolume;

/// Receives progress while files are restored
pub trait RestoreObserver {
    fn progress(&mut self, done: usize, total: usize);
    fn log_line(&mut self, line: &str);
}

/// Outcome of restoring a single file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreEvent {
    Restored,
    Deleted,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub restored: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RestoreReport {
    fn count(&mut self, event: RestoreEvent) {
        match event {
            RestoreEvent::Restored => self.restored += 1,
            RestoreEvent::Deleted => self.deleted += 1,
            RestoreEvent::Skipped => self.skipped += 1,
            RestoreEvent::Failed => self.failed += 1,
        }
    }
}

/// Restore `files` (paths relative to the subvolume) from snapshot `num`
pub fn restore_files<B: SnapperBackend>(
    session: &mut Session<B>,
    num: u32,
    files: &[String],
    copy_command: &Path,
    observer: &mut dyn RestoreObserver,
) -> RestoreReport {
    let mut report = RestoreReport::default();
    let total = files.len();

    let root = session.snapshot_path(num);
    if root.is_empty() {
        report.skipped = total;
        return report;
    }

    observer.progress(0, total);
    for (done, file) in files.iter().enumerate() {
        let orig = join_subvolume(&root, file);
        let full = session.file_full_path(file);

        let event = restore_file(Path::new(&orig), Path::new(&full), copy_command);
        match event {
            RestoreEvent::Deleted => observer.log_line(&format!("Deleted {full}")),
            RestoreEvent::Skipped => observer.log_line(&format!("{full} skipped")),
            RestoreEvent::Restored | RestoreEvent::Failed => observer.log_line(&full),
        }
        report.count(event);
        observer.progress(done + 1, total);
    }

    log::info!(
        "restore from snapshot {num}: {} restored, {} deleted, {} skipped, {} failed",
        report.restored,
        report.deleted,
        report.skipped,
        report.failed
    );
    report
}

/// Make `full` match `orig`
///
/// A missing `orig` means the file did not exist in the snapshot, so `full`
/// is removed.
pub fn restore_file(orig: &Path, full: &Path, copy_command: &Path) -> RestoreEvent {
    let Ok(orig_meta) = fs::symlink_metadata(orig) else {
        log::info!("removing '{}' from system", full.display());
        return match remove_path(full) {
            Ok(()) => RestoreEvent::Deleted,
            Err(e) => {
                log::warn!("Failed to remove {}: {e}", full.display());
                RestoreEvent::Failed
            }
        };
    };

    if let Some(dir) = full.parent() {
        if let Err(e) = fs::create_dir_all(dir) {
            log::warn!("Failed to create directory {}: {e}", dir.display());
            return RestoreEvent::Skipped;
        }
    }

    if orig_meta.is_dir() {
        log::info!("creating directory '{}'", full.display());
        if !full.exists() {
            if let Err(e) = fs::create_dir(full) {
                log::error!("Failed to create {}: {e}", full.display());
                return RestoreEvent::Failed;
            }
        }

        let mut event = RestoreEvent::Restored;
        if let Err(e) = chown(
            full,
            Some(Uid::from_raw(orig_meta.uid())),
            Some(Gid::from_raw(orig_meta.gid())),
        ) {
            log::warn!("Failed to change owner of {}: {e}", full.display());
            event = RestoreEvent::Failed;
        }

        let mode = orig_meta.permissions().mode() & 0o7777;
        if let Err(e) = fs::set_permissions(full, fs::Permissions::from_mode(mode)) {
            log::warn!("Failed to change mode of {}: {e}", full.display());
            event = RestoreEvent::Failed;
        }
        return event;
    }

    log::info!("copying '{}' to '{}'", orig.display(), full.display());
    match Command::new(copy_command)
        .arg("-a")
        .arg("--")
        .arg(orig)
        .arg(full)
        .output()
    {
        Ok(output) if output.status.success() => RestoreEvent::Restored,
        Ok(output) => {
            log::error!(
                "{} failed for {}: {}",
                copy_command.display(),
                full.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            RestoreEvent::Failed
        }
        Err(e) => {
            log::error!("Failed to run {}: {e}", copy_command.display());
            RestoreEvent::Failed
        }
    }
}

fn remove_path(path: &Path) -> std::io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
