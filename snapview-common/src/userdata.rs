// Userdata and cleanup helpers

use std::collections::BTreeMap;

/// Cleanup algorithms offered when creating or modifying snapshots
pub const CLEANUP_ALGORITHMS: &[&str] = &["timeline", "number", ""];

/// Convert userdata to its `key=value,key=value` form
///
/// ```
/// use std::collections::BTreeMap;
/// use snapview_common::userdata_to_string;
/// let map = BTreeMap::from([("a".to_string(), "b".to_string()), ("1".to_string(), "2".to_string())]);
/// assert_eq!(userdata_to_string(&map), "1=2,a=b");
/// ```
pub fn userdata_to_string(userdata: &BTreeMap<String, String>) -> String {
    userdata
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse the `key=value,key=value` form
///
/// Entries without `=` are ignored. Anything after a second `=` is dropped.
pub fn parse_userdata(text: &str) -> BTreeMap<String, String> {
    let mut userdata = BTreeMap::new();

    for line in text.split(',') {
        let mut split = line.split('=');
        let (Some(key), Some(value)) = (split.next(), split.next()) else {
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        userdata.insert(key.to_string(), value.trim().to_string());
    }

    userdata
}
