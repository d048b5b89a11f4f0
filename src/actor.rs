//! The actor core: mailbox dispatch, topology reconciliation, the health
//! classifier's wiring into state, and the refresh scheduler.
//!
//! All mutable state lives in [`ActorState`] and is only ever touched from
//! inside [`run`], which is the sole task spawned per coordinator. Every
//! other piece of this module is either a message definition or a pure
//! helper called from within that task.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use crate::addr::Addr;
use crate::client::{ClientOpts, ClusterSlotsOutcome, ConnectionEvent, NodeClientFactory, NodeHandle};
use crate::error::{CoordinatorError, Result};
use crate::events::{publish, ClusterEvent, ClusterObserver, ConnectionStatus, DownReason};
use crate::health::{classify, transition, ClusterState, Reason, Transition};
use crate::options::StartOptions;
use crate::slot::{SlotMap, SlotRange};

enum ActorMessage {
    GetSlotMapInfo {
        reply: oneshot::Sender<(u64, SlotMap, HashMap<Addr, NodeHandle>)>,
    },
    ConnectNode {
        addr: Addr,
        reply: oneshot::Sender<NodeHandle>,
    },
    UpdateSlots {
        observed_version: u64,
        node: Addr,
    },
    ClusterSlotsReply {
        version: u64,
        outcome: ClusterSlotsOutcome,
    },
    TimerFired {
        token: u64,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
}

/// A cloneable handle to a running coordinator actor. All methods are
/// call/reply against the actor's mailbox: they return once the actor has
/// serviced the request, or [`CoordinatorError::ActorGone`] if the actor
/// has already stopped.
#[derive(Clone)]
pub struct Coordinator {
    tx: mpsc::UnboundedSender<ActorMessage>,
}

impl Coordinator {
    /// Spawns the actor, opening a client for each seed address eagerly.
    /// `cluster_state` starts `NOK`; no refresh is armed until the first
    /// real classification (triggered by a subsequent connection-status
    /// event) finds a reason to arm one.
    pub fn start(
        seeds: Vec<Addr>,
        factory: Arc<dyn NodeClientFactory>,
        opts: StartOptions,
    ) -> Coordinator {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = mpsc::unbounded_channel();

        let mut state = ActorState {
            cluster_state: ClusterState::Nok,
            initial_nodes: seeds.clone(),
            nodes: HashMap::new(),
            up: HashSet::new(),
            masters: HashSet::new(),
            queue_full: HashSet::new(),
            slot_map: SlotMap::default(),
            slot_map_version: 1,
            refresh_timer_token: None,
            next_timer_token: 0,
            info_subscribers: opts.info_pid,
            update_slot_wait: opts.update_slot_wait,
            min_replicas: opts.min_replicas,
            close_wait: opts.close_wait,
            client_opts: opts.client_opts,
            factory,
            status_tx,
            self_tx: tx.clone(),
        };
        for addr in seeds {
            state.open_client(addr);
        }

        tokio::spawn(run(state, rx, status_rx));
        Coordinator { tx }
    }

    /// Ordered teardown: stop every known client, then terminate the actor.
    /// Idempotent — calling `stop` on an already-stopped handle is a no-op.
    pub async fn stop(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(ActorMessage::Stop { reply }).is_err() {
            return Ok(());
        }
        let _ = rx.await;
        Ok(())
    }

    /// Synchronous snapshot: `(version, slot_map, clients)`, where `clients`
    /// is the subset of known nodes whose address appears in `slot_map`.
    pub async fn get_slot_map_info(&self) -> Result<(u64, SlotMap, HashMap<Addr, NodeHandle>)> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(ActorMessage::GetSlotMapInfo { reply })
            .map_err(|_| CoordinatorError::ActorGone)?;
        rx.await.map_err(|_| CoordinatorError::ActorGone)
    }

    /// Resolves `addr` to an existing handle, or opens a new client and
    /// registers it. Used when a `MOVED` redirection targets a previously
    /// unknown address.
    pub async fn connect_node(&self, addr: Addr) -> Result<NodeHandle> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(ActorMessage::ConnectNode { addr, reply })
            .map_err(|_| CoordinatorError::ActorGone)?;
        rx.await.map_err(|_| CoordinatorError::ActorGone)
    }

    /// Asynchronous hint: if `observed_version` still matches the actor's
    /// current `slot_map_version`, arms the refresh scheduler against
    /// `node`. Otherwise a no-op — the caller's view is already stale.
    pub async fn update_slots(&self, observed_version: u64, node: Addr) -> Result<()> {
        self.tx
            .send(ActorMessage::UpdateSlots {
                observed_version,
                node,
            })
            .map_err(|_| CoordinatorError::ActorGone)
    }
}

struct ActorState {
    cluster_state: ClusterState,
    initial_nodes: Vec<Addr>,
    nodes: HashMap<Addr, NodeHandle>,
    up: HashSet<Addr>,
    masters: HashSet<Addr>,
    queue_full: HashSet<Addr>,
    slot_map: SlotMap,
    slot_map_version: u64,
    refresh_timer_token: Option<u64>,
    next_timer_token: u64,
    info_subscribers: Vec<Arc<dyn ClusterObserver>>,
    update_slot_wait: Duration,
    min_replicas: usize,
    close_wait: Duration,
    client_opts: ClientOpts,
    factory: Arc<dyn NodeClientFactory>,
    status_tx: mpsc::UnboundedSender<ConnectionEvent>,
    self_tx: mpsc::UnboundedSender<ActorMessage>,
}

async fn run(
    mut state: ActorState,
    mut rx: mpsc::UnboundedReceiver<ActorMessage>,
    mut status_rx: mpsc::UnboundedReceiver<ConnectionEvent>,
) {
    loop {
        tokio::select! {
            msg = rx.recv() => {
                match msg {
                    Some(msg) => {
                        if state.handle_message(msg) {
                            break;
                        }
                    }
                    None => break,
                }
            }
            ev = status_rx.recv() => {
                match ev {
                    Some(ev) => state.handle_connection_status(ev),
                    None => {}
                }
            }
        }
    }
    trace!("coordinator actor terminated");
}

impl ActorState {
    /// Dispatches one mailbox message. Returns `true` if the actor should
    /// terminate after this message.
    fn handle_message(&mut self, msg: ActorMessage) -> bool {
        match msg {
            ActorMessage::GetSlotMapInfo { reply } => {
                let _ = reply.send(self.snapshot());
                false
            }
            ActorMessage::ConnectNode { addr, reply } => {
                let handle = self.connect_node(addr);
                let _ = reply.send(handle);
                false
            }
            ActorMessage::UpdateSlots {
                observed_version,
                node,
            } => {
                if observed_version == self.slot_map_version {
                    self.arm_refresh(Some(node));
                }
                false
            }
            ActorMessage::ClusterSlotsReply { version, outcome } => {
                self.handle_cluster_slots_reply(version, outcome);
                false
            }
            ActorMessage::TimerFired { token } => {
                self.handle_timer_fired(token);
                false
            }
            ActorMessage::Stop { reply } => {
                self.stop_all();
                let _ = reply.send(());
                true
            }
        }
    }

    fn snapshot(&self) -> (u64, SlotMap, HashMap<Addr, NodeHandle>) {
        let addrs_in_map = self.slot_map.all_addrs();
        let clients = self
            .nodes
            .iter()
            .filter(|(addr, _)| addrs_in_map.contains(*addr))
            .map(|(addr, handle)| (addr.clone(), handle.clone()))
            .collect();
        (self.slot_map_version, self.slot_map.clone(), clients)
    }

    fn connect_node(&mut self, addr: Addr) -> NodeHandle {
        if let Some(handle) = self.nodes.get(&addr) {
            return handle.clone();
        }
        self.open_client(addr)
    }

    fn open_client(&mut self, addr: Addr) -> NodeHandle {
        let handle = self.factory.open(
            addr.clone(),
            self.client_opts.clone(),
            true,
            self.status_tx.clone(),
        );
        self.nodes.insert(addr, handle.clone());
        handle
    }

    fn stop_all(&mut self) {
        for (_, handle) in self.nodes.drain() {
            handle.stop();
        }
        self.refresh_timer_token = None;
    }

    fn handle_connection_status(&mut self, ev: ConnectionEvent) {
        let ConnectionEvent { addr, status } = ev;
        match &status {
            ConnectionStatus::ConnectionUp => {
                self.up.insert(addr.clone());
            }
            ConnectionStatus::ConnectionDown(DownReason::SocketClosed) => {
                // Benign peer-side close: do not remove from `up`.
            }
            ConnectionStatus::ConnectionDown(_) => {
                self.up.remove(&addr);
            }
            ConnectionStatus::QueueFull => {
                self.queue_full.insert(addr.clone());
            }
            ConnectionStatus::QueueOk => {
                self.queue_full.remove(&addr);
            }
        }
        let is_master = self.masters.contains(&addr);
        publish(
            &self.info_subscribers,
            ClusterEvent::ConnectionStatus {
                addr,
                status,
                is_master,
            },
        );
        self.reclassify();
    }

    fn handle_cluster_slots_reply(&mut self, version: u64, outcome: ClusterSlotsOutcome) {
        if version < self.slot_map_version {
            trace!(
                reply_version = version,
                current_version = self.slot_map_version,
                "dropping stale cluster slots reply"
            );
            return;
        }
        match outcome {
            ClusterSlotsOutcome::Transport(err) => {
                debug!(%err, "transient error refreshing cluster slots, scheduler will retry");
            }
            ClusterSlotsOutcome::RedisError(err) => {
                warn!(%err, "redis-side error refreshing cluster slots");
                publish(
                    &self.info_subscribers,
                    ClusterEvent::ClusterSlotsError(err),
                );
            }
            ClusterSlotsOutcome::Ranges(ranges) => self.reconcile(ranges),
        }
    }

    fn reconcile(&mut self, ranges: Vec<SlotRange>) {
        let canonical = SlotMap::canonicalize(ranges);
        if canonical == self.slot_map {
            return;
        }

        let new_addrs = canonical.all_addrs();
        let new_masters = canonical.masters();

        let keep: HashSet<Addr> = self
            .initial_nodes
            .iter()
            .cloned()
            .chain(new_addrs.iter().cloned())
            .chain(self.up.iter().cloned())
            .collect();
        let candidates_for_removal: Vec<Addr> = self
            .nodes
            .keys()
            .filter(|addr| !keep.contains(*addr))
            .cloned()
            .collect();

        for addr in &new_addrs {
            if !self.nodes.contains_key(addr) {
                self.open_client(addr.clone());
            }
        }

        if !candidates_for_removal.is_empty() {
            let handles: Vec<NodeHandle> = candidates_for_removal
                .iter()
                .filter_map(|addr| self.nodes.remove(addr))
                .collect();
            let close_wait = self.close_wait;
            info!(
                removed = ?candidates_for_removal,
                delay_ms = close_wait.as_millis() as u64,
                "scheduling delayed closure of stale nodes"
            );
            tokio::spawn(async move {
                tokio::time::sleep(close_wait).await;
                for handle in handles {
                    handle.stop();
                }
            });
        }

        self.slot_map_version += 1;
        self.slot_map = canonical.clone();
        self.masters = new_masters;
        info!(version = self.slot_map_version, "accepted new slot map");
        publish(
            &self.info_subscribers,
            ClusterEvent::SlotMapUpdated {
                slot_map: canonical,
                version: self.slot_map_version,
            },
        );
        self.reclassify();
    }

    fn reclassify(&mut self) {
        let reason = classify(
            &self.slot_map,
            &self.masters,
            &self.up,
            &self.queue_full,
            self.min_replicas,
        );
        let (new_state, outcome) = transition(self.cluster_state, reason);
        self.cluster_state = new_state;
        match outcome {
            Transition::BecameNok(reason) => {
                info!(%reason, "cluster_nok");
                publish(&self.info_subscribers, ClusterEvent::ClusterNok(reason));
            }
            Transition::BecameOk => {
                info!("cluster_ok");
                publish(&self.info_subscribers, ClusterEvent::ClusterOk);
            }
            Transition::NoChange => {}
        }
        if self.cluster_state == ClusterState::Nok {
            self.arm_refresh(None);
        } else {
            self.disarm_refresh();
        }
    }

    /// Arms the refresh scheduler. A no-op if already armed.
    fn arm_refresh(&mut self, override_target: Option<Addr>) {
        if self.refresh_timer_token.is_some() {
            return;
        }
        let Some(target) = override_target.or_else(|| self.select_target()) else {
            trace!("no refresh target available, will retry once `up` grows");
            return;
        };
        let Some(handle) = self.nodes.get(&target).cloned() else {
            trace!(%target, "refresh target has no registered node handle");
            return;
        };

        let version = self.slot_map_version;
        let reply_tx = self.self_tx.clone();
        debug!(%target, version, "sending CLUSTER SLOTS");
        handle.cluster_slots(Box::new(move |outcome| {
            let _ = reply_tx.send(ActorMessage::ClusterSlotsReply { version, outcome });
        }));

        self.next_timer_token += 1;
        let token = self.next_timer_token;
        self.refresh_timer_token = Some(token);
        let wait = self.update_slot_wait;
        let timer_tx = self.self_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            let _ = timer_tx.send(ActorMessage::TimerFired { token });
        });
    }

    fn disarm_refresh(&mut self) {
        self.refresh_timer_token = None;
    }

    fn handle_timer_fired(&mut self, token: u64) {
        if self.refresh_timer_token != Some(token) {
            // Cancelled timer whose expiry message was already in flight.
            return;
        }
        self.refresh_timer_token = None;
        if self.cluster_state == ClusterState::Nok {
            self.arm_refresh(None);
        }
    }

    /// Walks `initial_nodes` in order for the first address that is up;
    /// otherwise falls back to the lexicographically smallest up address,
    /// so the choice is deterministic and reproducible when no preferred
    /// node is available.
    fn select_target(&self) -> Option<Addr> {
        for addr in &self.initial_nodes {
            if self.up.contains(addr) {
                return Some(addr.clone());
            }
        }
        self.up.iter().min().cloned()
    }
}
