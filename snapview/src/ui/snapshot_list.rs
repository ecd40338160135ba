//! Snapshot summary table
//!
//! Pre and post snapshots that belong together are shown as one row. A pre
//! snapshot without its post gets a row of its own and is offered when a new
//! post snapshot is created.

use chrono::{DateTime, Utc};
use serde::Serialize;
use snapview_common::{format_date, format_range, userdata_to_string, Snapshot, SnapshotType};
use std::collections::HashMap;

/// One line of the summary table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    /// `"7"` or `"3 - 4"` for a pair
    pub id: String,
    /// Number of the snapshot the row was built from
    pub num: u32,
    pub kind: &'static str,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub description: String,
    pub userdata: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub rows: Vec<SummaryRow>,
    /// Pre snapshots still waiting for a post
    pub lonely_pre: Vec<u32>,
}

/// Build the summary rows in snapshot order
pub fn summary_rows(snapshots: &[Snapshot]) -> Summary {
    let by_num: HashMap<u32, &Snapshot> = snapshots.iter().map(|s| (s.num, s)).collect();
    let mut summary = Summary::default();

    for snapshot in snapshots {
        let userdata = userdata_to_string(&snapshot.userdata);

        match snapshot.snapshot_type {
            SnapshotType::Single => summary.rows.push(SummaryRow {
                id: snapshot.name(),
                num: snapshot.num,
                kind: "Single",
                start_date: snapshot.date,
                end_date: None,
                description: snapshot.description.clone(),
                userdata,
            }),
            SnapshotType::Post => {
                let pre = snapshot.pre_num.and_then(|num| by_num.get(&num));
                let Some(pre) = pre else {
                    log::warn!(
                        "something wrong - pre:{:?} of post {} not listed",
                        snapshot.pre_num,
                        snapshot.num
                    );
                    continue;
                };

                summary.rows.push(SummaryRow {
                    id: format_range(Some(pre.num), snapshot.num),
                    num: snapshot.num,
                    kind: "Pre & Post",
                    start_date: pre.date,
                    end_date: snapshot.date,
                    description: pre.description.clone(),
                    userdata,
                });
            }
            SnapshotType::Pre if snapshot.post_num.is_none() => {
                log::debug!("pre snapshot {} does not have post", snapshot.num);
                summary.rows.push(SummaryRow {
                    id: snapshot.name(),
                    num: snapshot.num,
                    kind: "Pre",
                    start_date: snapshot.date,
                    end_date: None,
                    description: snapshot.description.clone(),
                    userdata,
                });
                summary.lonely_pre.push(snapshot.num);
            }
            SnapshotType::Pre => {
                log::debug!("skipping pre snapshot: {}", snapshot.num);
            }
        }
    }

    summary
}

const HEADERS: [&str; 6] = ["ID", "Type", "Start Date", "End Date", "Description", "User Data"];

/// Render rows as an aligned text table
pub fn render_table(rows: &[SummaryRow], date_format: &str) -> String {
    let cells: Vec<[String; 6]> = rows
        .iter()
        .map(|row| {
            [
                row.id.clone(),
                row.kind.to_string(),
                format_date(row.start_date, date_format),
                format_date(row.end_date, date_format),
                row.description.clone(),
                row.userdata.clone(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for line in &cells {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &HEADERS.map(String::from), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(rule.join("-+-").as_str());
    out.push('\n');
    for line in &cells {
        push_line(&mut out, line, &widths);
    }
    out
}

fn push_line(out: &mut String, cells: &[String; 6], widths: &[usize; 6]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    out.push_str(padded.join(" | ").trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapview_common::date_from_epoch;
    use std::collections::BTreeMap;

    fn snap(num: u32, kind: SnapshotType, pre: Option<u32>, post: Option<u32>) -> Snapshot {
        Snapshot {
            num,
            snapshot_type: kind,
            pre_num: pre,
            post_num: post,
            date: date_from_epoch(1_700_000_000 + i64::from(num)),
            uid: 0,
            description: format!("desc {num}"),
            cleanup: String::new(),
            userdata: BTreeMap::new(),
        }
    }

    #[test]
    fn test_pairs_collapse_into_one_row() {
        let mut post = snap(3, SnapshotType::Post, Some(2), None);
        post.userdata.insert("important".to_string(), "yes".to_string());
        let snapshots = vec![
            snap(1, SnapshotType::Single, None, None),
            snap(2, SnapshotType::Pre, None, Some(3)),
            post,
            snap(4, SnapshotType::Pre, None, None),
        ];

        let summary = summary_rows(&snapshots);

        assert_eq!(summary.rows.len(), 3);
        assert_eq!(summary.rows[0].kind, "Single");
        assert_eq!(summary.rows[0].end_date, None);

        let pair = &summary.rows[1];
        assert_eq!(pair.id, "2 - 3");
        assert_eq!(pair.kind, "Pre & Post");
        assert_eq!(pair.description, "desc 2");
        assert_eq!(pair.start_date, snapshots[1].date);
        assert_eq!(pair.end_date, snapshots[2].date);
        assert_eq!(pair.userdata, "important=yes");

        assert_eq!(summary.rows[2].kind, "Pre");
        assert_eq!(summary.lonely_pre, vec![4]);
    }

    #[test]
    fn test_post_without_pre_is_skipped() {
        let snapshots = vec![snap(8, SnapshotType::Post, Some(7), None)];
        let summary = summary_rows(&snapshots);
        assert!(summary.rows.is_empty());
        assert!(summary.lonely_pre.is_empty());
    }

    #[test]
    fn test_render_table_columns() {
        let summary = summary_rows(&[snap(1, SnapshotType::Single, None, None)]);
        let table = render_table(&summary.rows, "%Y");
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID | Type"));
        assert!(lines[0].ends_with("User Data"));
        assert!(lines[2].contains("Single"));
        assert!(lines[2].contains("desc 1"));
    }
}
