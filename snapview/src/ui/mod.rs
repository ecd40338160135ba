//! Terminal presentation of snapshots, comparisons and errors

pub mod comparison_view;
pub mod dialogs;
pub mod error_helpers;
pub mod snapshot_list;
