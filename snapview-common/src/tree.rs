//! Modified-file tree built from the flat comparison index

use serde::Serialize;
use std::collections::BTreeMap;

use crate::FileIndex;

/// Nested filesystem structure, one node per path segment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FileTree {
    pub children: BTreeMap<String, FileTree>,
}

impl FileTree {
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Insert one slash separated path, creating intermediate nodes
    pub fn insert(&mut self, path: &str) {
        let mut node = self;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            node = node.children.entry(segment.to_string()).or_default();
        }
    }

    /// Number of nodes below this one
    pub fn len(&self) -> usize {
        self.children.values().map(|c| 1 + c.len()).sum()
    }
}

/// Build the tree for a set of paths
///
/// ```
/// use snapview_common::build_tree;
/// let tree = build_tree(["/etc/fstab", "/etc/hosts"]);
/// assert_eq!(tree.children["etc"].children.len(), 2);
/// ```
pub fn build_tree<I, S>(paths: I) -> FileTree
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tree = FileTree::default();
    for path in paths {
        tree.insert(path.as_ref());
    }
    tree
}

/// How a tree node relates to the comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeItemKind {
    Created,
    Removed,
    Changed,
    /// Only a parent of modified entries
    Unmodified,
}

impl TreeItemKind {
    pub fn marker(&self) -> char {
        match self {
            Self::Created => '+',
            Self::Removed => '-',
            Self::Changed => '*',
            Self::Unmodified => ' ',
        }
    }
}

/// Display item for one tree node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeItem {
    pub path: String,
    pub label: String,
    pub kind: TreeItemKind,
    pub children: Vec<TreeItem>,
}

/// Turn a tree into display items, classifying nodes with the index
pub fn tree_items(index: &FileIndex, tree: &FileTree) -> Vec<TreeItem> {
    generate_items(index, "", tree)
}

fn generate_items(index: &FileIndex, current_path: &str, branch: &FileTree) -> Vec<TreeItem> {
    branch
        .children
        .iter()
        .map(|(node, subtree)| {
            let path = format!("{current_path}/{node}");
            let kind = match index.get(&path) {
                Some(file) if file.status.is_created() => TreeItemKind::Created,
                Some(file) if file.status.is_deleted() => TreeItemKind::Removed,
                Some(_) => TreeItemKind::Changed,
                None => TreeItemKind::Unmodified,
            };
            let children = generate_items(index, &path, subtree);

            TreeItem {
                path,
                label: node.clone(),
                kind,
                children,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FileStatus, ModifiedFile};

    fn entry(status: u32) -> ModifiedFile {
        ModifiedFile {
            status: FileStatus::from_bits(status),
            full_path: String::new(),
        }
    }

    #[test]
    fn test_build_tree_merges_prefixes() {
        let tree = build_tree(["/etc/sysconfig/network", "/etc/hosts", "/var/log"]);

        assert_eq!(tree.children.len(), 2);
        let etc = &tree.children["etc"];
        assert_eq!(
            etc.children.keys().collect::<Vec<_>>(),
            vec!["hosts", "sysconfig"]
        );
        assert!(etc.children["sysconfig"].children.contains_key("network"));
        assert_eq!(tree.len(), 6);
    }

    #[test]
    fn test_build_tree_skips_empty_segments() {
        let tree = build_tree(["//etc//hosts/"]);
        assert_eq!(tree, build_tree(["/etc/hosts"]));
    }

    #[test]
    fn test_empty_tree() {
        let tree = build_tree(Vec::<String>::new());
        assert!(tree.is_empty());
        assert!(tree_items(&FileIndex::new(), &tree).is_empty());
    }

    #[test]
    fn test_tree_items_classification() {
        let mut index = FileIndex::new();
        index.insert("/etc".to_string(), entry(FileStatus::PERMISSIONS));
        index.insert("/etc/new.conf".to_string(), entry(FileStatus::CREATED));
        index.insert("/etc/old.conf".to_string(), entry(FileStatus::DELETED));
        index.insert("/usr/bin/tool".to_string(), entry(FileStatus::CONTENT));

        let tree = build_tree(index.keys());
        let items = tree_items(&index, &tree);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].path, "/etc");
        assert_eq!(items[0].kind, TreeItemKind::Changed);
        assert_eq!(items[0].children[0].label, "new.conf");
        assert_eq!(items[0].children[0].kind, TreeItemKind::Created);
        assert_eq!(items[0].children[1].kind, TreeItemKind::Removed);

        let usr = &items[1];
        assert_eq!(usr.kind, TreeItemKind::Unmodified);
        assert_eq!(usr.children[0].path, "/usr/bin");
        assert_eq!(usr.children[0].children[0].path, "/usr/bin/tool");
        assert_eq!(usr.children[0].children[0].kind, TreeItemKind::Changed);
    }
}
