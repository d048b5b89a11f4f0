use std::sync::Arc;

use crate::addr::Addr;
use crate::health::Reason;
use crate::slot::SlotMap;

/// Raw transport signal emitted by a per-node client. `SocketClosed` is the
/// one variant the coordinator treats as benign: it never removes the
/// address from `up`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    ConnectionUp,
    ConnectionDown(DownReason),
    QueueFull,
    QueueOk,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DownReason {
    /// A clean peer-side close; recovered by reconnect or a later event.
    SocketClosed,
    /// The client itself was stopped by the coordinator (e.g. after
    /// `close_wait`). Treated the same as any other non-`SocketClosed`
    /// close: it removes the address from `up` and can drive the cluster
    /// to `master_down` if the address is a master.
    ClientStopped,
    /// Any other reason (`tcp_closed`, timeouts, refused connections, ...).
    /// Removes the address from `up`, the same as `ClientStopped`.
    Other(String),
}

/// Notifications published to observers.
#[derive(Clone, Debug)]
pub enum ClusterEvent {
    ClusterOk,
    ClusterNok(Reason),
    SlotMapUpdated { slot_map: SlotMap, version: u64 },
    ClusterSlotsError(String),
    ConnectionStatus {
        addr: Addr,
        status: ConnectionStatus,
        is_master: bool,
    },
}

/// A fire-and-forget notification sink. Implementations must not block the
/// actor: a slow or full sink should drop or buffer internally rather than
/// stall `notify`.
pub trait ClusterObserver: Send + Sync {
    fn notify(&self, event: ClusterEvent);
}

/// Notifies every subscriber in turn. Back-pressure on one sink must not
/// prevent delivery to the others.
pub fn publish(subscribers: &[Arc<dyn ClusterObserver>], event: ClusterEvent) {
    for sub in subscribers {
        sub.notify(event.clone());
    }
}
