use std::collections::HashSet;

use crate::addr::Addr;
use crate::slot::SlotMap;

/// Externally observable cluster health.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClusterState {
    Ok,
    Nok,
}

/// The reason the cluster is unhealthy, in the priority order `classify`
/// checks them. `Ok` is not a failure reason; it is the sixth, catch-all
/// outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reason {
    TooFewNodes,
    NotAllSlotsCovered,
    TooFewReplicas,
    MasterDown,
    MasterQueueFull,
    Ok,
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Reason::TooFewNodes => "too_few_nodes",
            Reason::NotAllSlotsCovered => "not_all_slots_covered",
            Reason::TooFewReplicas => "too_few_replicas",
            Reason::MasterDown => "master_down",
            Reason::MasterQueueFull => "master_queue_full",
            Reason::Ok => "ok",
        };
        f.write_str(s)
    }
}

/// Computes the health reason from the current signals, in priority order.
///
/// This is a pure function of the four mutated pieces of state (`up`,
/// `queue_full`, `masters`, `slot_map`) so it can be property-tested in
/// isolation from the actor and its mailbox.
pub fn classify(
    slot_map: &SlotMap,
    masters: &HashSet<Addr>,
    up: &HashSet<Addr>,
    queue_full: &HashSet<Addr>,
    min_replicas: usize,
) -> Reason {
    if slot_map.len() < 2 {
        return Reason::TooFewNodes;
    }
    if !slot_map.is_fully_covered() {
        return Reason::NotAllSlotsCovered;
    }
    if !slot_map.has_min_replicas(min_replicas) {
        return Reason::TooFewReplicas;
    }
    if !masters.is_subset(up) {
        return Reason::MasterDown;
    }
    if masters.intersection(queue_full).next().is_some() {
        return Reason::MasterQueueFull;
    }
    Reason::Ok
}

/// The outcome of feeding a freshly computed [`Reason`] through the edge
/// detector below. Events are never duplicated across consecutive
/// classifications that land on the same side of the OK/NOK line.
#[derive(Debug, PartialEq, Eq)]
pub enum Transition {
    /// No observable change: either still OK, or still NOK with the same
    /// edge already reported.
    NoChange,
    /// OK -> NOK. Carries the reason for the `cluster_nok` event.
    BecameNok(Reason),
    /// NOK -> OK. The `cluster_ok` event carries no payload.
    BecameOk,
}

/// Applies the OK/NOK transition rules given the previous state and a
/// freshly computed reason: an edge only fires when the reason crosses
/// from `Ok` to a failure reason or back, never on a reason change while
/// the cluster stays on the same side of that line.
pub fn transition(previous: ClusterState, reason: Reason) -> (ClusterState, Transition) {
    match (previous, reason) {
        (ClusterState::Ok, Reason::Ok) => (ClusterState::Ok, Transition::NoChange),
        (ClusterState::Ok, bad) => (ClusterState::Nok, Transition::BecameNok(bad)),
        (ClusterState::Nok, Reason::Ok) => (ClusterState::Ok, Transition::BecameOk),
        (ClusterState::Nok, _bad) => (ClusterState::Nok, Transition::NoChange),
    }
}
