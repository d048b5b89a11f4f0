use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::client::ClientOpts;
use crate::error::{CoordinatorError, Result};
use crate::events::ClusterObserver;

/// Start options for [`crate::Coordinator::start`].
///
/// The typed struct is the ergonomic surface for callers constructing a
/// coordinator directly from Rust; [`StartOptions::from_entries`] exists
/// for callers building options from a dynamic source (e.g. deserialised
/// config) where an unrecognised key must be rejected rather than silently
/// ignored.
#[derive(Clone)]
pub struct StartOptions {
    pub info_pid: Vec<Arc<dyn ClusterObserver>>,
    pub update_slot_wait: Duration,
    pub client_opts: ClientOpts,
    pub min_replicas: usize,
    pub close_wait: Duration,
}

impl Default for StartOptions {
    fn default() -> Self {
        StartOptions {
            info_pid: Vec::new(),
            update_slot_wait: Duration::from_millis(500),
            client_opts: ClientOpts::default(),
            min_replicas: 1,
            close_wait: Duration::from_millis(10_000),
        }
    }
}

/// A single recognised-or-not option entry, as it would arrive from a
/// dynamic configuration source.
pub enum OptionEntry {
    InfoPid(Vec<Arc<dyn ClusterObserver>>),
    UpdateSlotWait(Duration),
    ClientOpts(ClientOpts),
    MinReplicas(usize),
    CloseWait(Duration),
}

impl StartOptions {
    /// Builds [`StartOptions`] from `(key, value)` entries, defaulting any
    /// key that is absent and failing on any key it does not recognise.
    pub fn from_entries(entries: Vec<(String, OptionEntry)>) -> Result<Self> {
        let mut opts = StartOptions::default();
        for (key, value) in entries {
            match (key.as_str(), value) {
                ("info_pid", OptionEntry::InfoPid(v)) => opts.info_pid = v,
                ("update_slot_wait", OptionEntry::UpdateSlotWait(v)) => opts.update_slot_wait = v,
                ("client_opts", OptionEntry::ClientOpts(v)) => opts.client_opts = v,
                ("min_replicas", OptionEntry::MinReplicas(v)) => opts.min_replicas = v,
                ("close_wait", OptionEntry::CloseWait(v)) => opts.close_wait = v,
                (other, _) => return Err(CoordinatorError::InvalidOption(other.to_string())),
            }
        }
        Ok(opts)
    }
}
