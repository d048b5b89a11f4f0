//! A topology-reconciling coordinator for a Redis Cluster client.
//!
//! [`Coordinator`] owns a fleet of per-node connections, continuously
//! reconciles a local slot map against the authoritative cluster topology,
//! classifies cluster health, and publishes state-change notifications to
//! subscribers. It does not route commands or retry them; callers use
//! [`Coordinator::get_slot_map_info`] to obtain a consistent snapshot of
//! the slot map and node handles and route requests themselves.
//!
//! # Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use redis_cluster_coordinator::{Addr, Coordinator, StartOptions};
//! # use redis_cluster_coordinator::{ClientOpts, ClusterSlotsOutcome, ConnectionEvent, NodeClientFactory, NodeHandle};
//! # struct DemoFactory;
//! # impl NodeClientFactory for DemoFactory {
//! #     fn open(&self, addr: Addr, _opts: ClientOpts, _use_cluster_id: bool,
//! #             _status_tx: tokio::sync::mpsc::UnboundedSender<ConnectionEvent>) -> NodeHandle {
//! #         unimplemented!()
//! #     }
//! # }
//!
//! async fn start_cluster() {
//!     let seeds = vec![Addr::new("127.0.0.1", 6379), Addr::new("127.0.0.1", 6380)];
//!     let coordinator = Coordinator::start(seeds, Arc::new(DemoFactory), StartOptions::default());
//!     let (version, slot_map, clients) = coordinator.get_slot_map_info().await.unwrap();
//!     let _ = (version, slot_map, clients);
//! }
//! ```

mod actor;
mod addr;
mod client;
mod error;
mod events;
mod health;
mod options;
#[cfg(test)]
mod proptests;
mod slot;

pub use actor::Coordinator;
pub use addr::Addr;
pub use client::{ClientOpts, ClusterSlotsOutcome, ConnectionEvent, NodeClient, NodeClientFactory, NodeHandle};
pub use error::{CoordinatorError, Result};
pub use events::{ClusterEvent, ClusterObserver, ConnectionStatus, DownReason};
pub use health::{ClusterState, Reason};
pub use options::{OptionEntry, StartOptions};
pub use slot::{SlotMap, SlotRange, SLOT_COUNT};
