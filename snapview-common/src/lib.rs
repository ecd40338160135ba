// Shared types and utilities for snapview

pub mod config;
pub mod error;
pub mod format;
pub mod status;
pub mod tree;
pub mod userdata;
pub mod validation;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use config::SnapviewConfig;
pub use error::{Action, ErrorPopup, SnapperError};
pub use format::{date_from_epoch, format_date, format_range};
pub use status::FileStatus;
pub use tree::{build_tree, tree_items, FileTree, TreeItem, TreeItemKind};
pub use userdata::{parse_userdata, userdata_to_string, CLEANUP_ALGORITHMS};

/// Number the daemon uses for the running system
pub const CURRENT_SYSTEM: u32 = 0;

/// Kind of a snapshot as reported by snapperd
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotType {
    Single,
    Pre,
    Post,
}

impl SnapshotType {
    /// Decode the `q` value used on the bus (SINGLE=0, PRE=1, POST=2)
    pub fn from_wire(value: u16) -> Option<Self> {
        match value {
            0 => Some(Self::Single),
            1 => Some(Self::Pre),
            2 => Some(Self::Post),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Pre => "pre",
            Self::Post => "post",
        }
    }

    /// Parse the type names accepted by the create operation
    pub fn parse(value: &str) -> Result<Self, SnapperError> {
        match value {
            "single" => Ok(Self::Single),
            "pre" => Ok(Self::Pre),
            "post" => Ok(Self::Post),
            _ => Err(SnapperError::WrongSnapshotType),
        }
    }
}

/// Information about a snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    pub num: u32,
    pub snapshot_type: SnapshotType,
    /// Number of the paired pre snapshot (post snapshots only)
    pub pre_num: Option<u32>,
    /// Number of the paired post snapshot (pre snapshots only, filled locally)
    pub post_num: Option<u32>,
    pub date: Option<DateTime<Utc>>,
    pub uid: u32,
    pub description: String,
    pub cleanup: String,
    #[serde(default)]
    pub userdata: BTreeMap<String, String>,
}

impl Snapshot {
    /// Display name, the snapshot number as text
    pub fn name(&self) -> String {
        self.num.to_string()
    }

    /// Whether this is a pre snapshot still waiting for its post
    pub fn is_lonely_pre(&self) -> bool {
        self.snapshot_type == SnapshotType::Pre && self.post_num.is_none()
    }
}

/// A named snapper configuration tied to a subvolume
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigInfo {
    pub name: String,
    /// Mount point of the subvolume, e.g. "/" or "/home"
    pub subvolume: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// A file reported as modified by a comparison
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModifiedFile {
    pub status: FileStatus,
    /// Location of the file on the running system
    pub full_path: String,
}

/// Modified files keyed by their path relative to the subvolume
pub type FileIndex = BTreeMap<String, ModifiedFile>;

/// Join a subvolume mount point and a path relative to it
///
/// ```
/// use snapview_common::join_subvolume;
/// assert_eq!(join_subvolume("/", "/etc/fstab"), "/etc/fstab");
/// assert_eq!(join_subvolume("/home", "/user/.bashrc"), "/home/user/.bashrc");
/// ```
pub fn join_subvolume(subvolume: &str, name: &str) -> String {
    let base = subvolume.trim_end_matches('/');
    if name.starts_with('/') {
        format!("{base}{name}")
    } else {
        format!("{base}/{name}")
    }
}

/// D-Bus interface constants of snapperd
pub const DBUS_SERVICE_NAME: &str = "org.opensuse.Snapper";
pub const DBUS_OBJECT_PATH: &str = "/org/opensuse/Snapper";
pub const DBUS_INTERFACE_NAME: &str = "org.opensuse.Snapper";
