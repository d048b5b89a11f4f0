//! A fake per-node client harness implementing the coordinator's per-node
//! client contract, used to drive the coordinator through scenario tests
//! without a live Redis cluster.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, Notify};

use redis_cluster_coordinator::{
    Addr, ClientOpts, ClusterSlotsOutcome, ConnectionEvent, ConnectionStatus, NodeClient,
    NodeClientFactory, NodeHandle,
};

struct PendingQuery {
    addr: Addr,
    callback: Box<dyn FnOnce(ClusterSlotsOutcome) + Send>,
}

/// A query awaiting a programmed answer. Dropping it without calling
/// [`PendingQueryHandle::respond`] leaves the coordinator's request
/// outstanding forever, which is sometimes exactly what a test wants.
pub struct PendingQueryHandle {
    addr: Addr,
    callback: Box<dyn FnOnce(ClusterSlotsOutcome) + Send>,
}

impl PendingQueryHandle {
    pub fn addr(&self) -> &Addr {
        &self.addr
    }

    pub fn respond(self, outcome: ClusterSlotsOutcome) {
        (self.callback)(outcome);
    }
}

#[derive(Default)]
struct Inner {
    status_txs: Mutex<HashMap<Addr, mpsc::UnboundedSender<ConnectionEvent>>>,
    pending: Mutex<VecDeque<PendingQuery>>,
    notify: Notify,
    stopped: Mutex<HashSet<Addr>>,
    opened: Mutex<Vec<Addr>>,
}

/// The test-facing handle to a fake cluster of per-node clients.
pub struct FakeHarness {
    inner: Arc<Inner>,
}

impl FakeHarness {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeHarness {
            inner: Arc::new(Inner::default()),
        })
    }

    pub fn factory(self: &Arc<Self>) -> Arc<dyn NodeClientFactory> {
        Arc::new(FakeFactory {
            inner: self.inner.clone(),
        })
    }

    /// Pushes a `connection_status` event as though the given address's
    /// client emitted it.
    pub fn signal(&self, addr: &Addr, status: ConnectionStatus) {
        let txs = self.inner.status_txs.lock().unwrap();
        if let Some(tx) = txs.get(addr) {
            let _ = tx.send(ConnectionEvent {
                addr: addr.clone(),
                status,
            });
        }
    }

    pub fn opened_addrs(&self) -> Vec<Addr> {
        self.inner.opened.lock().unwrap().clone()
    }

    pub fn was_stopped(&self, addr: &Addr) -> bool {
        self.inner.stopped.lock().unwrap().contains(addr)
    }

    /// Waits (up to `timeout`) for the next `CLUSTER SLOTS` query issued by
    /// the coordinator, without answering it.
    pub async fn next_query(&self, timeout: Duration) -> Option<PendingQueryHandle> {
        let inner = self.inner.clone();
        tokio::time::timeout(timeout, async move {
            loop {
                if let Some(pq) = inner.pending.lock().unwrap().pop_front() {
                    return PendingQueryHandle {
                        addr: pq.addr,
                        callback: pq.callback,
                    };
                }
                inner.notify.notified().await;
            }
        })
        .await
        .ok()
    }
}

struct FakeFactory {
    inner: Arc<Inner>,
}

impl NodeClientFactory for FakeFactory {
    fn open(
        &self,
        addr: Addr,
        _opts: ClientOpts,
        _use_cluster_id: bool,
        status_tx: mpsc::UnboundedSender<ConnectionEvent>,
    ) -> NodeHandle {
        self.inner
            .status_txs
            .lock()
            .unwrap()
            .insert(addr.clone(), status_tx);
        self.inner.opened.lock().unwrap().push(addr.clone());
        NodeHandle::new(
            addr.clone(),
            Arc::new(FakeClient {
                addr,
                inner: self.inner.clone(),
            }),
        )
    }
}

struct FakeClient {
    addr: Addr,
    inner: Arc<Inner>,
}

impl NodeClient for FakeClient {
    fn cluster_slots(&self, callback: Box<dyn FnOnce(ClusterSlotsOutcome) + Send>) {
        self.inner.pending.lock().unwrap().push_back(PendingQuery {
            addr: self.addr.clone(),
            callback,
        });
        self.inner.notify.notify_one();
    }

    fn stop(&self) {
        self.inner.stopped.lock().unwrap().insert(self.addr.clone());
    }
}

/// A test observer collecting every event it's notified of, for assertions
/// on ordering and de-duplication of edge-triggered events.
pub struct RecordingObserver {
    events: Mutex<Vec<redis_cluster_coordinator::ClusterEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(RecordingObserver {
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn events(&self) -> Vec<redis_cluster_coordinator::ClusterEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl redis_cluster_coordinator::ClusterObserver for RecordingObserver {
    fn notify(&self, event: redis_cluster_coordinator::ClusterEvent) {
        self.events.lock().unwrap().push(event);
    }
}
