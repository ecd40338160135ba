//! User-friendly error messages with recovery suggestions
//!
//! Every failure is shown as the heading of the interrupted action followed
//! by the detail line of the error. Where the error type suggests a way out,
//! a recovery hint is printed below.

use snapview_common::{Action, ErrorPopup, SnapperError};

/// Print an error popup to stderr
pub fn show_popup(popup: &ErrorPopup) {
    eprintln!("{popup}");
}

/// Print an error with its action heading and recovery suggestion
pub fn show_error_with_context(action: Action, error: &SnapperError) {
    let (title, message, recovery) = format_error_message(action, error);

    eprintln!("{title}\n{message}");
    if let Some(recovery) = recovery {
        eprintln!("{recovery}");
    }
}

/// Format error message with heading, detail and recovery suggestion
pub fn format_error_message(action: Action, error: &SnapperError) -> (String, String, Option<String>) {
    let popup = action.popup(error);

    let recovery = match error.tag() {
        "config_not_found" => Some("Check the available configurations with 'snapview configs'.".to_string()),
        "sysconfig_not_found" => Some("Make sure snapper is installed and configured.".to_string()),
        "no_permissions" => Some(
            "Run as root or add your user to ALLOW_USERS of the snapper configuration.".to_string(),
        ),
        "not_found" | "snapshot_not_found" | "pre_not_found" => {
            Some("Check the snapshot numbers with 'snapview list'.".to_string())
        }
        "unpaired_pre" => Some("Create the matching 'Post' snapshot first.".to_string()),
        "transport" => Some(format!(
            "The snapper service may not be running.\n\nTechnical details: {error}"
        )),
        _ => None,
    };

    (popup.heading, popup.details, recovery)
}
