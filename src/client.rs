use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::addr::Addr;
use crate::events::ConnectionStatus;
use crate::slot::SlotRange;

/// Opaque per-client options, forwarded verbatim to [`NodeClientFactory::open`].
/// The coordinator never interprets these; they are the `client_opts` value
/// from [`crate::options::StartOptions`].
pub type ClientOpts = HashMap<String, String>;

/// A `connection_status` message paired with the address that emitted it.
#[derive(Clone, Debug)]
pub struct ConnectionEvent {
    pub addr: Addr,
    pub status: ConnectionStatus,
}

/// The outcome of a `CLUSTER SLOTS` command: a transport/queue failure, a
/// Redis-side error, or a successful reply.
pub enum ClusterSlotsOutcome {
    Ranges(Vec<SlotRange>),
    RedisError(String),
    Transport(String),
}

/// The per-node client contract consumed by the coordinator. The concrete
/// implementation — the TCP client that speaks the Redis wire protocol —
/// is an external collaborator; the coordinator only ever calls
/// [`NodeClient::cluster_slots`] and [`NodeClient::stop`] on it.
pub trait NodeClient: Send + Sync {
    /// Issue `CLUSTER SLOTS` asynchronously. The callback fires exactly
    /// once; the coordinator never awaits this call inline, so a slow
    /// reply cannot stall the mailbox.
    fn cluster_slots(&self, callback: Box<dyn FnOnce(ClusterSlotsOutcome) + Send>);

    /// Stop the underlying client. Idempotent.
    fn stop(&self);
}

/// A cheap, cloneable reference to a per-node client.
///
/// The coordinator owns the handle's lifetime in its `nodes` map; a
/// command router may hold copies, but per the data model they must be
/// treated as weak — a handle may become defunct `close_wait` after
/// removal, at which point [`NodeHandle::cluster_slots`]/`stop` still
/// delegate to the (now-stopped) client rather than panicking.
#[derive(Clone)]
pub struct NodeHandle {
    pub addr: Addr,
    client: Arc<dyn NodeClient>,
}

impl NodeHandle {
    pub fn new(addr: Addr, client: Arc<dyn NodeClient>) -> Self {
        NodeHandle { addr, client }
    }

    pub fn cluster_slots(&self, callback: Box<dyn FnOnce(ClusterSlotsOutcome) + Send>) {
        self.client.cluster_slots(callback);
    }

    pub fn stop(&self) {
        self.client.stop();
    }
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeHandle").field("addr", &self.addr).finish()
    }
}

/// Opens per-node clients on behalf of the coordinator.
///
/// The factory must route `connection_status` events back to the
/// coordinator over `status_tx` for as long as the returned client is
/// alive.
pub trait NodeClientFactory: Send + Sync {
    fn open(
        &self,
        addr: Addr,
        opts: ClientOpts,
        use_cluster_id: bool,
        status_tx: mpsc::UnboundedSender<ConnectionEvent>,
    ) -> NodeHandle;
}
