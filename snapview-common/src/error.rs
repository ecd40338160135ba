//! Backend errors and the messages shown for them
//!
//! Every failure coming from the snapshot backend carries a type tag. The tag
//! decides which detail line the user sees below the heading of the action
//! that failed.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Failure reported by the snapshot backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapperError {
    #[error("Configuration not found.")]
    ConfigNotFound,

    #[error("Configuration is not valid.")]
    ConfigInvalid,

    #[error("File /etc/sysconfig/snapper is not available.")]
    SysconfigNotFound,

    #[error("Snapper is not initialized.")]
    NotInitialized,

    #[error("Snapshot was not found.")]
    NotFound,

    #[error("Snapshot was not found.")]
    SnapshotNotFound,

    #[error("Wrong snapshot type given.")]
    WrongSnapshotType,

    #[error("'Pre' snapshot was not given.")]
    PreNotGiven,

    #[error("Given 'Pre' snapshot was not found.")]
    PreNotFound,

    #[error("Invalid userdata: {0}")]
    InvalidUserdata(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("This 'Pre' snapshot is not paired with any 'Post' one yet.\nShowing differences is not possible.")]
    UnpairedPre,

    /// Error name sent by snapperd that has no dedicated variant
    #[error("{}", daemon_description(.name, .message.as_deref()))]
    Daemon {
        name: String,
        message: Option<String>,
    },

    /// The bus itself failed (daemon not running, connection refused, ...)
    #[error("D-Bus communication failed: {0}")]
    Transport(String),
}

impl SnapperError {
    /// Map a D-Bus method error from snapperd
    pub fn from_dbus(name: &str, message: Option<String>) -> Self {
        match name {
            "error.unknown_config" => Self::ConfigNotFound,
            "error.invalid_configdata" => Self::ConfigInvalid,
            "error.illegal_snapshot" => Self::NotFound,
            "error.invalid_userdata" => {
                Self::InvalidUserdata(message.unwrap_or_else(|| "rejected by snapperd".to_string()))
            }
            _ => Self::Daemon {
                name: name.to_string(),
                message,
            },
        }
    }

    /// Type tag identifying the failure
    pub fn tag(&self) -> &str {
        match self {
            Self::ConfigNotFound => "config_not_found",
            Self::ConfigInvalid => "config_invalid",
            Self::SysconfigNotFound => "sysconfig_not_found",
            Self::NotInitialized => "not_initialized",
            Self::NotFound => "not_found",
            Self::SnapshotNotFound => "snapshot_not_found",
            Self::WrongSnapshotType => "wrong_snapshot_type",
            Self::PreNotGiven => "pre_not_given",
            Self::PreNotFound => "pre_not_found",
            Self::InvalidUserdata(_) => "invalid_userdata",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::UnpairedPre => "unpaired_pre",
            Self::Daemon { name, .. } => name.strip_prefix("error.").unwrap_or(name),
            Self::Transport(_) => "transport",
        }
    }

    /// Detail line for the error popup
    pub fn detail(&self) -> String {
        match self {
            Self::Transport(_) => "Reason not known.".to_string(),
            other => other.to_string(),
        }
    }
}

fn daemon_description(name: &str, message: Option<&str>) -> String {
    match name {
        "error.no_permissions" => "No permissions.".to_string(),
        "error.config_locked" => "Config is locked.".to_string(),
        "error.config_in_use" => "Config is in use.".to_string(),
        "error.snapshot_in_use" => "Snapshot is in use.".to_string(),
        "error.unknown_file" => "Unknown file.".to_string(),
        "error.io_error" => "IO Error.".to_string(),
        "error.create_snapshot_failed" => "Creating snapshot failed.".to_string(),
        "error.delete_snapshot_failed" => "Deleting snapshot failed.".to_string(),
        "error.invalid_user" => "Invalid user.".to_string(),
        "error.invalid_group" => "Invalid group.".to_string(),
        "error.acl_error" => "ACL error.".to_string(),
        _ => match message {
            Some(message) if !message.is_empty() => format!("Failure ({name}: {message})."),
            _ => format!("Failure ({name})."),
        },
    }
}

/// The user-visible action a failure interrupted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Action {
    Initialize,
    ReadConfigs,
    ReadSnapshots,
    Create,
    Modify,
    Delete,
    Compare,
    Restore,
}

impl Action {
    pub fn heading(&self) -> &'static str {
        match self {
            Self::Initialize => "Failed to initialize snapper library:",
            Self::ReadConfigs => "Failed to read the list of configurations:",
            Self::ReadSnapshots => "Failed to read the list of snapshots:",
            Self::Create => "Failed to create new snapshot:",
            Self::Modify => "Failed to modify snapshot:",
            Self::Delete => "Failed to delete snapshot:",
            Self::Compare => "Failed to calculate changed files:",
            Self::Restore => "Failed to restore files:",
        }
    }

    pub fn popup(&self, error: &SnapperError) -> ErrorPopup {
        ErrorPopup {
            heading: self.heading().to_string(),
            details: error.detail(),
        }
    }
}

/// Modal error message: heading plus a detail line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPopup {
    pub heading: String,
    pub details: String,
}

impl fmt::Display for ErrorPopup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.heading, self.details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags() {
        assert_eq!(SnapperError::ConfigNotFound.tag(), "config_not_found");
        assert_eq!(SnapperError::WrongSnapshotType.tag(), "wrong_snapshot_type");
        assert_eq!(
            SnapperError::from_dbus("error.snapshot_in_use", None).tag(),
            "snapshot_in_use"
        );
    }

    #[test]
    fn test_dbus_names_map_to_tags() {
        assert_eq!(
            SnapperError::from_dbus("error.unknown_config", None),
            SnapperError::ConfigNotFound
        );
        assert_eq!(
            SnapperError::from_dbus("error.illegal_snapshot", Some("x".into())),
            SnapperError::NotFound
        );
        assert_eq!(
            SnapperError::from_dbus("error.invalid_userdata", None).tag(),
            "invalid_userdata"
        );
    }

    #[test]
    fn test_popup_text() {
        let popup = Action::Create.popup(&SnapperError::PreNotFound);
        assert_eq!(
            popup.to_string(),
            "Failed to create new snapshot:\nGiven 'Pre' snapshot was not found."
        );

        let popup = Action::Delete.popup(&SnapperError::NotFound);
        assert_eq!(popup.details, "Snapshot was not found.");
    }

    #[test]
    fn test_unknown_reasons() {
        let popup = Action::Modify.popup(&SnapperError::Transport("broken pipe".into()));
        assert_eq!(popup.details, "Reason not known.");

        let err = SnapperError::from_dbus("error.something_new", Some("boom".into()));
        assert_eq!(err.detail(), "Failure (error.something_new: boom).");
        assert_eq!(
            SnapperError::from_dbus("error.no_permissions", None).detail(),
            "No permissions."
        );
    }
}
