//! The snapshot backend boundary
//!
//! Everything snapview knows about snapshots comes through this trait. The
//! production implementation talks to snapperd over D-Bus
//! ([`crate::dbus_client::SnapperClient`]); tests use an in-memory backend.

use snapview_common::{ConfigInfo, FileStatus, Snapshot, SnapshotType, SnapperError};
use std::collections::BTreeMap;

pub type BackendResult<T> = Result<T, SnapperError>;

/// Arguments for creating a snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    pub snapshot_type: SnapshotType,
    /// Pre snapshot a post snapshot is paired with
    pub pre_num: Option<u32>,
    pub description: String,
    pub cleanup: String,
    pub userdata: BTreeMap<String, String>,
}

/// Operations snapview needs from the snapshot daemon
pub trait SnapperBackend {
    fn list_configs(&self) -> BackendResult<Vec<ConfigInfo>>;

    fn get_config(&self, config: &str) -> BackendResult<ConfigInfo>;

    /// All snapshots of a config; `post_num` is never filled in by the backend
    fn list_snapshots(&self, config: &str) -> BackendResult<Vec<Snapshot>>;

    /// Create a snapshot and return its number
    fn create_snapshot(&self, config: &str, request: &CreateRequest) -> BackendResult<u32>;

    /// Replace the editable fields of a snapshot
    fn set_snapshot(
        &self,
        config: &str,
        num: u32,
        description: &str,
        cleanup: &str,
        userdata: &BTreeMap<String, String>,
    ) -> BackendResult<()>;

    fn delete_snapshots(&self, config: &str, nums: &[u32]) -> BackendResult<()>;

    /// Filesystem path of a snapshot; number 0 is the subvolume itself
    fn mount_point(&self, config: &str, num: u32) -> BackendResult<String>;

    /// Files changed between two snapshot numbers, paths relative to the subvolume
    fn modified_files(&self, config: &str, from: u32, to: u32)
    -> BackendResult<Vec<(String, FileStatus)>>;
}
