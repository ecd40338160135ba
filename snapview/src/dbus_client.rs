//! D-Bus client for communicating with the snapper daemon
//!
//! This module provides a blocking interface to snapperd, which runs with
//! elevated privileges and performs all snapshot operations.
//!
//! # Architecture
//! - snapview (unprivileged or root) ↔ D-Bus IPC ↔ snapperd (privileged)
//! - snapperd checks the caller against the ALLOW_USERS/ALLOW_GROUPS of each config
//! - Operations are blocking; snapview runs them on its only thread

use anyhow::{Context, Result};
use snapview_common::*;
use std::collections::{BTreeMap, HashMap};
use zbus::blocking::Connection as BlockingConnection;

use crate::backend::{BackendResult, CreateRequest, SnapperBackend};

/// Snapshot entry as sent by `ListSnapshots`: `(uquxussa{ss})`
type WireSnapshot = (u32, u16, u32, i64, u32, String, String, HashMap<String, String>);

/// Config entry as sent by `ListConfigs` and `GetConfig`: `(ssa{ss})`
type WireConfig = (String, String, HashMap<String, String>);

/// Blocking D-Bus client for snapperd
///
/// Connects to the system bus. snapperd is started on demand through D-Bus
/// service activation.
pub struct SnapperClient {
    connection: BlockingConnection,
}

impl SnapperClient {
    /// Connect to the system bus
    ///
    /// # Errors
    /// - D-Bus system bus connection failure (check if dbus-daemon is running)
    pub fn new() -> Result<Self> {
        let connection = BlockingConnection::system().context("Failed to connect to system bus")?;

        Ok(Self { connection })
    }

    fn proxy(&self) -> BackendResult<zbus::blocking::Proxy<'_>> {
        zbus::blocking::Proxy::new(
            &self.connection,
            DBUS_SERVICE_NAME,
            DBUS_OBJECT_PATH,
            DBUS_INTERFACE_NAME,
        )
        .map_err(map_dbus_error)
    }

    /// Create a comparison in the daemon and return the number of changed files
    pub fn create_comparison(&self, config: &str, from: u32, to: u32) -> BackendResult<u32> {
        self.proxy()?
            .call("CreateComparison", &(config, from, to))
            .map_err(map_dbus_error)
    }

    /// Fetch the files of an existing comparison
    pub fn get_files(&self, config: &str, from: u32, to: u32) -> BackendResult<Vec<(String, u32)>> {
        self.proxy()?
            .call("GetFiles", &(config, from, to))
            .map_err(map_dbus_error)
    }

    /// Release a comparison held by the daemon
    pub fn delete_comparison(&self, config: &str, from: u32, to: u32) -> BackendResult<()> {
        self.proxy()?
            .call("DeleteComparison", &(config, from, to))
            .map_err(map_dbus_error)
    }
}

/// Translate a zbus error into the backend error model
///
/// Method errors carry snapperd's error name (`error.unknown_config`, ...);
/// everything else is a transport problem.
fn map_dbus_error(error: zbus::Error) -> SnapperError {
    match error {
        zbus::Error::MethodError(name, message, _) => {
            SnapperError::from_dbus(name.as_str(), message)
        }
        other => SnapperError::Transport(other.to_string()),
    }
}

fn config_from_wire((name, subvolume, attributes): WireConfig) -> ConfigInfo {
    ConfigInfo {
        name,
        subvolume,
        attributes: attributes.into_iter().collect(),
    }
}

fn snapshot_from_wire(wire: WireSnapshot) -> Option<Snapshot> {
    let (num, kind, pre_num, date, uid, description, cleanup, userdata) = wire;

    let Some(snapshot_type) = SnapshotType::from_wire(kind) else {
        log::warn!("Ignoring snapshot {num} with unknown type {kind}");
        return None;
    };

    Some(Snapshot {
        num,
        snapshot_type,
        pre_num: (snapshot_type == SnapshotType::Post).then_some(pre_num),
        post_num: None,
        date: date_from_epoch(date),
        uid,
        description,
        cleanup,
        userdata: userdata.into_iter().collect(),
    })
}

fn userdata_to_wire(userdata: &BTreeMap<String, String>) -> HashMap<String, String> {
    userdata
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

impl SnapperBackend for SnapperClient {
    fn list_configs(&self) -> BackendResult<Vec<ConfigInfo>> {
        let configs: Vec<WireConfig> = self
            .proxy()?
            .call("ListConfigs", &())
            .map_err(map_dbus_error)?;

        Ok(configs.into_iter().map(config_from_wire).collect())
    }

    fn get_config(&self, config: &str) -> BackendResult<ConfigInfo> {
        let wire: WireConfig = self
            .proxy()?
            .call("GetConfig", &(config,))
            .map_err(map_dbus_error)?;

        Ok(config_from_wire(wire))
    }

    fn list_snapshots(&self, config: &str) -> BackendResult<Vec<Snapshot>> {
        let snapshots: Vec<WireSnapshot> = self
            .proxy()?
            .call("ListSnapshots", &(config,))
            .map_err(map_dbus_error)?;

        Ok(snapshots.into_iter().filter_map(snapshot_from_wire).collect())
    }

    fn create_snapshot(&self, config: &str, request: &CreateRequest) -> BackendResult<u32> {
        let proxy = self.proxy()?;
        let userdata = userdata_to_wire(&request.userdata);
        let description = request.description.as_str();
        let cleanup = request.cleanup.as_str();

        let result = match request.snapshot_type {
            SnapshotType::Single => proxy.call(
                "CreateSingleSnapshot",
                &(config, description, cleanup, userdata),
            ),
            SnapshotType::Pre => proxy.call(
                "CreatePreSnapshot",
                &(config, description, cleanup, userdata),
            ),
            SnapshotType::Post => {
                let pre = request.pre_num.ok_or(SnapperError::PreNotGiven)?;
                proxy.call(
                    "CreatePostSnapshot",
                    &(config, pre, description, cleanup, userdata),
                )
            }
        };

        result.map_err(map_dbus_error)
    }

    fn set_snapshot(
        &self,
        config: &str,
        num: u32,
        description: &str,
        cleanup: &str,
        userdata: &BTreeMap<String, String>,
    ) -> BackendResult<()> {
        self.proxy()?
            .call(
                "SetSnapshot",
                &(config, num, description, cleanup, userdata_to_wire(userdata)),
            )
            .map_err(map_dbus_error)
    }

    fn delete_snapshots(&self, config: &str, nums: &[u32]) -> BackendResult<()> {
        self.proxy()?
            .call("DeleteSnapshots", &(config, nums.to_vec()))
            .map_err(map_dbus_error)
    }

    fn mount_point(&self, config: &str, num: u32) -> BackendResult<String> {
        self.proxy()?
            .call("GetMountPoint", &(config, num))
            .map_err(map_dbus_error)
    }

    fn modified_files(
        &self,
        config: &str,
        from: u32,
        to: u32,
    ) -> BackendResult<Vec<(String, FileStatus)>> {
        let count = self.create_comparison(config, from, to)?;
        log::debug!("comparison {from}..{to} of '{config}' has {count} files");

        let files = self.get_files(config, from, to);

        if let Err(e) = self.delete_comparison(config, from, to) {
            log::warn!("Failed to release comparison {from}..{to}: {e}");
        }

        Ok(files?
            .into_iter()
            .map(|(name, status)| (name, FileStatus::from_bits(status)))
            .collect())
    }
}
