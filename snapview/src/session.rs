//! Snapshot session state
//!
//! A [`Session`] wraps a [`SnapperBackend`] and keeps what the front-end
//! shows: the list of configs, the current config and its subvolume, the
//! snapshots of that config and the modified-file index of the selected
//! snapshot. Every backend failure is recorded so that [`Session::last_error`]
//! reports the type tag of the most recent one.

use snapview_common::validation::{validate_cleanup, validate_description, validate_userdata};
use snapview_common::*;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::backend::{BackendResult, CreateRequest, SnapperBackend};
use crate::modification::{compare_files, FileModification};

/// Config used when the list of configs cannot be read
pub const FALLBACK_CONFIG: &str = "root";

/// Arguments of the create operation, as entered by the user
#[derive(Debug, Clone, Default)]
pub struct NewSnapshot {
    /// `single`, `pre` or `post`
    pub snapshot_type: String,
    pub pre: Option<u32>,
    pub description: String,
    pub cleanup: String,
    pub userdata: BTreeMap<String, String>,
}

/// Fields of the modify operation; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct SnapshotChanges {
    pub description: Option<String>,
    pub cleanup: Option<String>,
    pub userdata: Option<BTreeMap<String, String>>,
}

pub struct Session<B: SnapperBackend> {
    backend: B,
    configs: Vec<String>,
    current_config: String,
    subvolume: String,
    initialized: bool,
    snapshots: Vec<Snapshot>,
    id2index: HashMap<u32, usize>,
    selected: Option<usize>,
    file_indexes: HashMap<(u32, u32), FileIndex>,
    last_error: Option<String>,
    notices: Vec<ErrorPopup>,
}

impl<B: SnapperBackend> Session<B> {
    pub fn new(backend: B, default_config: &str) -> Self {
        Self {
            backend,
            configs: Vec::new(),
            current_config: default_config.to_string(),
            subvolume: "/".to_string(),
            initialized: false,
            snapshots: Vec::new(),
            id2index: HashMap::new(),
            selected: None,
            file_indexes: HashMap::new(),
            last_error: None,
            notices: Vec::new(),
        }
    }

    fn record<T>(&mut self, result: BackendResult<T>) -> BackendResult<T> {
        if let Err(e) = &result {
            log::debug!("backend call failed: {}", e.tag());
            self.last_error = Some(e.tag().to_string());
        }
        result
    }

    fn ensure_initialized(&mut self) -> BackendResult<()> {
        if self.initialized {
            Ok(())
        } else {
            self.record(Err(SnapperError::NotInitialized))
        }
    }

    /// Read the names of all configs
    ///
    /// A failure is not fatal: a notice is queued and the list falls back to
    /// the `root` config. When the current config is not in the list, the
    /// first entry becomes current.
    pub fn read_configs(&mut self) -> &[String] {
        let result = self.backend.list_configs();
        match self.record(result) {
            Ok(configs) => {
                self.configs = configs.into_iter().map(|c| c.name).collect();
            }
            Err(e) => {
                log::warn!("Failed to read configs: {e}");
                self.notices.push(ErrorPopup {
                    heading: Action::ReadConfigs.heading().to_string(),
                    details: SnapperError::SysconfigNotFound.to_string(),
                });
                self.configs = vec![FALLBACK_CONFIG.to_string()];
            }
        }

        if !self.configs.contains(&self.current_config) {
            if let Some(first) = self.configs.first() {
                log::info!(
                    "config '{}' not available, using '{first}'",
                    self.current_config
                );
                self.current_config = first.clone();
            }
        }

        &self.configs
    }

    /// Make `config` the current config after checking it with the daemon
    pub fn initialize(&mut self, config: &str) -> BackendResult<()> {
        self.initialized = false;
        self.snapshots.clear();
        self.id2index.clear();
        self.selected = None;
        self.file_indexes.clear();

        let result = self.backend.get_config(config);
        let info = self.record(result)?;

        log::debug!("config '{}' on subvolume {}", info.name, info.subvolume);
        self.current_config = info.name;
        self.subvolume = info.subvolume;
        self.initialized = true;
        Ok(())
    }

    /// Read configs, initialize the current one and read its snapshots
    pub fn read(&mut self) -> BackendResult<()> {
        self.read_configs();
        let config = self.current_config.clone();
        self.initialize(&config)?;
        self.read_snapshots()
    }

    /// Reload the snapshot list of the current config
    pub fn read_snapshots(&mut self) -> BackendResult<()> {
        self.ensure_initialized()?;

        let result = self.backend.list_snapshots(&self.current_config);
        let mut snapshots: Vec<Snapshot> = self
            .record(result)?
            .into_iter()
            .filter(|s| s.num != CURRENT_SYSTEM)
            .collect();

        let pairs: HashMap<u32, u32> = snapshots
            .iter()
            .filter(|s| s.snapshot_type == SnapshotType::Post)
            .filter_map(|s| s.pre_num.map(|pre| (pre, s.num)))
            .collect();

        for snapshot in &mut snapshots {
            if snapshot.snapshot_type == SnapshotType::Pre {
                snapshot.post_num = pairs.get(&snapshot.num).copied();
            }
            log::debug!(
                "snapshot {} ({}) '{}'",
                snapshot.num,
                snapshot.snapshot_type.as_str(),
                snapshot.description
            );
        }

        self.id2index = snapshots
            .iter()
            .enumerate()
            .map(|(index, s)| (s.num, index))
            .collect();
        self.snapshots = snapshots;
        self.selected = None;
        self.file_indexes.clear();
        Ok(())
    }

    pub fn snapshot(&self, num: u32) -> Option<&Snapshot> {
        self.id2index.get(&num).map(|&index| &self.snapshots[index])
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn index_of(&self, num: u32) -> Option<usize> {
        self.id2index.get(&num).copied()
    }

    pub fn configs(&self) -> &[String] {
        &self.configs
    }

    pub fn current_config(&self) -> &str {
        &self.current_config
    }

    pub fn subvolume(&self) -> &str {
        &self.subvolume
    }

    /// Select the snapshot at `index` for showing changes
    pub fn select(&mut self, index: usize) -> BackendResult<&Snapshot> {
        let lonely = match self.snapshots.get(index) {
            Some(snapshot) => snapshot.is_lonely_pre(),
            None => return self.record(Err(SnapperError::NotFound)),
        };

        if lonely {
            return self.record(Err(SnapperError::UnpairedPre));
        }

        if self.selected != Some(index) {
            self.file_indexes.clear();
        }
        self.selected = Some(index);
        Ok(&self.snapshots[index])
    }

    pub fn selected(&self) -> Option<&Snapshot> {
        self.selected.map(|index| &self.snapshots[index])
    }

    /// Snapshot numbers compared when showing the changes of `snapshot`
    pub fn comparison_range(snapshot: &Snapshot) -> (u32, u32) {
        match snapshot.snapshot_type {
            SnapshotType::Post => (snapshot.pre_num.unwrap_or(CURRENT_SYSTEM), snapshot.num),
            SnapshotType::Pre => (snapshot.num, snapshot.post_num.unwrap_or(CURRENT_SYSTEM)),
            SnapshotType::Single => (snapshot.num, CURRENT_SYSTEM),
        }
    }

    /// Files changed between two snapshots, with their path on the running system
    pub fn read_modified_files_index(&mut self, from: u32, to: u32) -> BackendResult<FileIndex> {
        self.ensure_initialized()?;

        if let Some(index) = self.file_indexes.get(&(from, to)) {
            return Ok(index.clone());
        }

        log::info!("comparing snapshots {from} and {to}");
        let result = self
            .backend
            .modified_files(&self.current_config, from, to);
        let files = self.record(result)?;

        let index: FileIndex = files
            .into_iter()
            .map(|(name, status)| {
                let full_path = join_subvolume(&self.subvolume, &name);
                (name, ModifiedFile { status, full_path })
            })
            .collect();

        self.file_indexes.insert((from, to), index.clone());
        Ok(index)
    }

    /// Tree of the files changed between two snapshots
    pub fn read_modified_files_tree(&mut self, from: u32, to: u32) -> BackendResult<FileTree> {
        let index = self.read_modified_files_index(from, to)?;
        Ok(build_tree(index.keys()))
    }

    fn mount_point(&mut self, num: u32) -> BackendResult<String> {
        self.ensure_initialized()?;
        let result = self.backend.mount_point(&self.current_config, num);
        self.record(result)
    }

    /// Filesystem path of a snapshot, empty when it cannot be found
    pub fn snapshot_path(&mut self, num: u32) -> String {
        match self.mount_point(num) {
            Ok(path) => path,
            Err(e) => {
                log::warn!("No mount point for snapshot {num}: {e}");
                self.notices.push(ErrorPopup {
                    heading: format!("Snapshot '{num}' was not found."),
                    details: e.detail(),
                });
                String::new()
            }
        }
    }

    /// Location of `file` on the running system
    pub fn file_full_path(&self, file: &str) -> String {
        self.selected()
            .map(Self::comparison_range)
            .and_then(|range| self.file_indexes.get(&range))
            .and_then(|index| index.get(file))
            .map(|entry| entry.full_path.clone())
            .unwrap_or_else(|| join_subvolume(&self.subvolume, file))
    }

    fn path_in(&mut self, num: u32, file: &str) -> BackendResult<String> {
        if num == CURRENT_SYSTEM {
            return Ok(self.file_full_path(file));
        }
        let root = self.mount_point(num)?;
        Ok(join_subvolume(&root, file))
    }

    /// Compare one file between snapshot `from` and snapshot `to`
    pub fn file_modification(
        &mut self,
        file: &str,
        from: u32,
        to: u32,
        diff_command: &Path,
    ) -> BackendResult<FileModification> {
        let old = self.path_in(from, file)?;
        let new = self.path_in(to, file)?;
        Ok(compare_files(Path::new(&old), Path::new(&new), diff_command))
    }

    /// Create a snapshot and return its number
    pub fn create_snapshot(&mut self, args: &NewSnapshot) -> BackendResult<u32> {
        self.ensure_initialized()?;

        let request = self.validate_create(args);
        let request = self.record(request)?;

        let result = self.backend.create_snapshot(&self.current_config, &request);
        let num = self.record(result)?;
        log::info!(
            "created {} snapshot {num} in '{}'",
            request.snapshot_type.as_str(),
            self.current_config
        );

        self.read_snapshots()?;
        Ok(num)
    }

    fn validate_create(&self, args: &NewSnapshot) -> BackendResult<CreateRequest> {
        let snapshot_type = SnapshotType::parse(&args.snapshot_type)?;

        let pre_num = if snapshot_type == SnapshotType::Post {
            let pre = args.pre.ok_or(SnapperError::PreNotGiven)?;
            if !self.id2index.contains_key(&pre) {
                return Err(SnapperError::PreNotFound);
            }
            Some(pre)
        } else {
            None
        };

        validate_description(&args.description).map_err(SnapperError::InvalidArgument)?;
        validate_cleanup(&args.cleanup).map_err(SnapperError::InvalidArgument)?;
        validate_userdata(&args.userdata).map_err(|errors| {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            SnapperError::InvalidUserdata(messages.join("; "))
        })?;

        Ok(CreateRequest {
            snapshot_type,
            pre_num,
            description: args.description.clone(),
            cleanup: args.cleanup.clone(),
            userdata: args.userdata.clone(),
        })
    }

    /// Change the given fields of a snapshot
    ///
    /// Returns `false` without calling the daemon when nothing changes.
    pub fn modify_snapshot(&mut self, num: u32, changes: &SnapshotChanges) -> BackendResult<bool> {
        self.ensure_initialized()?;

        let Some(current) = self.snapshot(num).cloned() else {
            return self.record(Err(SnapperError::SnapshotNotFound));
        };

        if let Some(description) = &changes.description {
            let checked = validate_description(description).map_err(SnapperError::InvalidArgument);
            self.record(checked)?;
        }
        if let Some(cleanup) = &changes.cleanup {
            let checked = validate_cleanup(cleanup).map_err(SnapperError::InvalidArgument);
            self.record(checked)?;
        }
        if let Some(userdata) = &changes.userdata {
            let checked = validate_userdata(userdata).map_err(|errors| {
                SnapperError::InvalidUserdata(
                    errors
                        .into_iter()
                        .map(|e| e.message)
                        .collect::<Vec<_>>()
                        .join("; "),
                )
            });
            self.record(checked)?;
        }

        let description = changes.description.as_ref().unwrap_or(&current.description);
        let cleanup = changes.cleanup.as_ref().unwrap_or(&current.cleanup);
        let userdata = changes.userdata.as_ref().unwrap_or(&current.userdata);

        if *description == current.description
            && *cleanup == current.cleanup
            && *userdata == current.userdata
        {
            log::debug!("snapshot {num} unchanged");
            return Ok(false);
        }

        let result =
            self.backend
                .set_snapshot(&self.current_config, num, description, cleanup, userdata);
        self.record(result)?;
        log::info!("modified snapshot {num} in '{}'", self.current_config);

        self.read_snapshots()?;
        Ok(true)
    }

    /// Delete a snapshot; a pre or post snapshot is deleted with its partner
    pub fn delete_snapshot(&mut self, num: u32) -> BackendResult<Vec<u32>> {
        self.ensure_initialized()?;

        let Some(snapshot) = self.snapshot(num).cloned() else {
            return self.record(Err(SnapperError::NotFound));
        };

        let mut nums = vec![num];
        match snapshot.snapshot_type {
            SnapshotType::Post => {
                if let Some(pre) = snapshot.pre_num.filter(|pre| self.id2index.contains_key(pre)) {
                    nums.insert(0, pre);
                }
            }
            SnapshotType::Pre => {
                if let Some(post) = snapshot.post_num.filter(|post| self.id2index.contains_key(post)) {
                    nums.push(post);
                }
            }
            SnapshotType::Single => {}
        }

        let result = self.backend.delete_snapshots(&self.current_config, &nums);
        self.record(result)?;
        log::info!("deleted snapshots {nums:?} in '{}'", self.current_config);

        self.read_snapshots()?;
        Ok(nums)
    }

    /// Type tag of the most recent failure
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Messages queued by non-fatal failures
    pub fn take_notices(&mut self) -> Vec<ErrorPopup> {
        std::mem::take(&mut self.notices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::modification::ChangeKind;

    fn session_with_pair() -> Session<MemoryBackend> {
        let backend = MemoryBackend::with_config("root", "/");
        backend.add_snapshot("root", 1, SnapshotType::Single, None);
        backend.add_snapshot("root", 2, SnapshotType::Pre, None);
        backend.add_snapshot("root", 3, SnapshotType::Post, Some(2));
        backend.add_snapshot("root", 4, SnapshotType::Pre, None);
        let mut session = Session::new(backend, "root");
        session.read().unwrap();
        session
    }

    #[test]
    fn test_read_fills_pairs_and_drops_current() {
        let session = session_with_pair();

        assert_eq!(session.snapshots().len(), 4);
        assert!(session.snapshot(0).is_none());
        assert_eq!(session.snapshot(2).unwrap().post_num, Some(3));
        assert_eq!(session.snapshot(4).unwrap().post_num, None);
        assert_eq!(session.index_of(3), Some(2));
    }

    #[test]
    fn test_config_fallback() {
        let backend = MemoryBackend {
            fail_list_configs: true,
            ..Default::default()
        };
        let mut session = Session::new(backend, "home");

        assert_eq!(session.read_configs(), ["root".to_string()]);
        assert_eq!(session.current_config(), "root");
        assert_eq!(session.last_error(), Some("sysconfig_not_found"));

        let notices = session.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(
            notices[0].details,
            "File /etc/sysconfig/snapper is not available."
        );
        assert!(session.take_notices().is_empty());
    }

    #[test]
    fn test_first_config_when_root_missing() {
        let mut backend = MemoryBackend::with_config("home", "/home");
        backend.add_config("srv", "/srv");
        let mut session = Session::new(backend, "root");

        session.read_configs();
        assert_eq!(session.current_config(), "home");
    }

    #[test]
    fn test_initialize_unknown_config() {
        let mut session = Session::new(MemoryBackend::with_config("root", "/"), "root");
        let err = session.initialize("nope").unwrap_err();
        assert_eq!(err, SnapperError::ConfigNotFound);
        assert_eq!(session.last_error(), Some("config_not_found"));
    }

    #[test]
    fn test_not_initialized_guard() {
        let mut session = Session::new(MemoryBackend::with_config("root", "/"), "root");

        assert_eq!(
            session.read_snapshots().unwrap_err(),
            SnapperError::NotInitialized
        );
        assert_eq!(
            session.delete_snapshot(1).unwrap_err(),
            SnapperError::NotInitialized
        );
        assert_eq!(session.last_error(), Some("not_initialized"));
    }

    #[test]
    fn test_select_lonely_pre() {
        let mut session = session_with_pair();
        let index = session.index_of(4).unwrap();

        let err = session.select(index).unwrap_err();
        assert_eq!(err, SnapperError::UnpairedPre);
        assert!(err.to_string().contains("not paired with any 'Post' one yet"));
        assert!(session.select(session.index_of(2).unwrap()).is_ok());
    }

    #[test]
    fn test_comparison_range() {
        let session = session_with_pair();
        let range = |num| Session::<MemoryBackend>::comparison_range(session.snapshot(num).unwrap());

        assert_eq!(range(1), (1, 0));
        assert_eq!(range(2), (2, 3));
        assert_eq!(range(3), (2, 3));
    }

    #[test]
    fn test_create_validation() {
        let mut session = session_with_pair();

        let mut args = NewSnapshot {
            snapshot_type: "weekly".to_string(),
            ..Default::default()
        };
        assert_eq!(
            session.create_snapshot(&args).unwrap_err(),
            SnapperError::WrongSnapshotType
        );

        args.snapshot_type = "post".to_string();
        assert_eq!(
            session.create_snapshot(&args).unwrap_err(),
            SnapperError::PreNotGiven
        );
        assert_eq!(session.last_error(), Some("pre_not_given"));

        args.pre = Some(42);
        assert_eq!(
            session.create_snapshot(&args).unwrap_err(),
            SnapperError::PreNotFound
        );

        args.pre = Some(4);
        args.userdata = BTreeMap::from([("a,b".to_string(), "c".to_string())]);
        assert_eq!(
            session.create_snapshot(&args).unwrap_err().tag(),
            "invalid_userdata"
        );
    }

    #[test]
    fn test_create_post_pairs_with_pre() {
        let mut session = session_with_pair();
        let args = NewSnapshot {
            snapshot_type: "post".to_string(),
            pre: Some(4),
            description: "after update".to_string(),
            cleanup: "number".to_string(),
            userdata: BTreeMap::from([("important".to_string(), "yes".to_string())]),
        };

        let num = session.create_snapshot(&args).unwrap();
        assert_eq!(num, 5);
        assert_eq!(session.snapshot(4).unwrap().post_num, Some(5));
        assert_eq!(session.snapshot(5).unwrap().description, "after update");
    }

    #[test]
    fn test_modify_only_given_fields() {
        let mut session = session_with_pair();

        let changes = SnapshotChanges {
            cleanup: Some("timeline".to_string()),
            ..Default::default()
        };
        assert!(session.modify_snapshot(1, &changes).unwrap());

        let snapshot = session.snapshot(1).unwrap();
        assert_eq!(snapshot.cleanup, "timeline");
        assert_eq!(snapshot.description, "snapshot 1");

        assert!(!session.modify_snapshot(1, &changes).unwrap());
        assert_eq!(
            session.modify_snapshot(9, &changes).unwrap_err(),
            SnapperError::SnapshotNotFound
        );
    }

    #[test]
    fn test_delete_post_removes_pair() {
        let mut session = session_with_pair();

        assert_eq!(session.delete_snapshot(3).unwrap(), vec![2, 3]);
        assert!(session.snapshot(2).is_none());
        assert!(session.snapshot(3).is_none());

        assert_eq!(
            session.delete_snapshot(3).unwrap_err(),
            SnapperError::NotFound
        );
        assert_eq!(session.last_error(), Some("not_found"));
    }

    #[test]
    fn test_delete_pre_removes_pair() {
        let mut session = session_with_pair();

        assert_eq!(session.delete_snapshot(2).unwrap(), vec![2, 3]);
        assert!(session.snapshot(3).is_none());

        assert_eq!(session.delete_snapshot(4).unwrap(), vec![4]);
        assert_eq!(session.snapshots().len(), 1);
    }

    #[test]
    fn test_file_modification_paths() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path();
        for (tree, content) in [
            ("snap1", "one\n"),
            ("snap2", "two\n"),
            ("snap3", "three\n"),
            ("live", "live\n"),
        ] {
            let tree = root.join(tree);
            std::fs::create_dir_all(tree.join("user")).unwrap();
            std::fs::write(tree.join("user/notes"), content).unwrap();
        }

        let subvolume = root.join("live").display().to_string();
        let mut backend = MemoryBackend::with_config("home", &subvolume);
        backend.add_snapshot("home", 1, SnapshotType::Single, None);
        backend.add_snapshot("home", 2, SnapshotType::Pre, None);
        backend.add_snapshot("home", 3, SnapshotType::Post, Some(2));
        for num in [1, 2, 3] {
            backend
                .mount_points
                .insert(num, root.join(format!("snap{num}")).display().to_string());
        }
        let status = FileStatus::from_bits(FileStatus::CONTENT);
        backend.files.insert((1, 0), vec![("/user/notes".to_string(), status)]);
        let mut session = Session::new(backend, "home");
        session.read().unwrap();

        // Single against the running system, which lives under the subvolume
        session.select(session.index_of(1).unwrap()).unwrap();
        session.read_modified_files_index(1, 0).unwrap();
        let m = session
            .file_modification("/user/notes", 1, 0, Path::new("diff"))
            .unwrap();
        assert!(m.has(ChangeKind::Diff));
        assert!(m.diff.contains("-one"));
        assert!(m.diff.contains("+live"));

        // Pre against post, both through their mount points
        let m = session
            .file_modification("/user/notes", 2, 3, Path::new("diff"))
            .unwrap();
        assert!(m.diff.contains("-two"));
        assert!(m.diff.contains("+three"));

        // No mount point for snapshot 9
        let err = session
            .file_modification("/user/notes", 9, 0, Path::new("diff"))
            .unwrap_err();
        assert_eq!(err, SnapperError::NotFound);
        assert_eq!(session.last_error(), Some("not_found"));
    }

    #[test]
    fn test_index_full_paths() {
        let mut backend = MemoryBackend::with_config("home", "/home");
        backend.add_snapshot("home", 1, SnapshotType::Single, None);
        backend.files.insert(
            (1, 0),
            vec![
                ("/user/.bashrc".to_string(), FileStatus::from_bits(FileStatus::CONTENT)),
                ("/user/new".to_string(), FileStatus::from_bits(FileStatus::CREATED)),
            ],
        );
        let mut session = Session::new(backend, "home");
        session.read().unwrap();
        session.select(0).unwrap();

        let index = session.read_modified_files_index(1, 0).unwrap();
        assert_eq!(index["/user/.bashrc"].full_path, "/home/user/.bashrc");
        assert_eq!(session.file_full_path("/user/new"), "/home/user/new");
        assert_eq!(session.file_full_path("/other"), "/home/other");

        let tree = session.read_modified_files_tree(1, 0).unwrap();
        assert_eq!(tree.children["user"].children.len(), 2);
    }

    #[test]
    fn test_snapshot_path_failure() {
        let mut session = session_with_pair();
        assert_eq!(session.snapshot_path(7), "");
        let notices = session.take_notices();
        assert_eq!(notices[0].heading, "Snapshot '7' was not found.");
    }
}
