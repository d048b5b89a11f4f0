//! Property tests for the invariants enumerated in the coordinator's
//! design: edge-triggered health transitions (no duplicate events) and the
//! derived relationship between a slot map and its master set.

use std::collections::HashSet;

use quickcheck::quickcheck;

use crate::addr::Addr;
use crate::health::{transition, ClusterState, Reason, Transition};
use crate::slot::{SlotMap, SlotRange, SLOT_COUNT};

fn reason_from_u8(v: u8) -> Reason {
    match v % 6 {
        0 => Reason::TooFewNodes,
        1 => Reason::NotAllSlotsCovered,
        2 => Reason::TooFewReplicas,
        3 => Reason::MasterDown,
        4 => Reason::MasterQueueFull,
        _ => Reason::Ok,
    }
}

quickcheck! {
    /// Invariant 5: every OK/NOK edge fires at most once before its
    /// opposite edge — `transition` never emits `BecameNok` twice in a row
    /// without a `BecameOk` in between, or vice versa.
    fn prop_no_duplicate_edges(reasons: Vec<u8>) -> bool {
        let mut state = ClusterState::Ok;
        let mut last_edge: Option<bool> = None;
        for r in reasons {
            let reason = reason_from_u8(r);
            let (new_state, outcome) = transition(state, reason);
            match outcome {
                Transition::BecameNok(_) => {
                    if last_edge == Some(true) {
                        return false;
                    }
                    last_edge = Some(true);
                }
                Transition::BecameOk => {
                    if last_edge == Some(false) {
                        return false;
                    }
                    last_edge = Some(false);
                }
                Transition::NoChange => {}
            }
            state = new_state;
        }
        true
    }

    /// The state after any sequence of reasons is fully determined by the
    /// last reason fed in: `Ok` lands on `ClusterState::Ok`, anything else
    /// lands on `ClusterState::Nok`.
    fn prop_final_state_matches_last_reason(reasons: Vec<u8>) -> bool {
        if reasons.is_empty() {
            return true;
        }
        let mut state = ClusterState::Ok;
        for r in &reasons {
            let (new_state, _) = transition(state, reason_from_u8(*r));
            state = new_state;
        }
        match reason_from_u8(*reasons.last().unwrap()) {
            Reason::Ok => state == ClusterState::Ok,
            _ => state == ClusterState::Nok,
        }
    }

    /// Invariant 1/2: the master set derived from a canonical slot map is
    /// exactly the set of addresses used as a `master` in some range, and
    /// an evenly partitioned map is always fully covered.
    fn prop_masters_match_slot_map(seeds: Vec<u8>) -> bool {
        if seeds.is_empty() {
            return true;
        }
        let n = seeds.len().min(8);
        let seeds = &seeds[..n];
        let slot_per = SLOT_COUNT / n as u16;
        let mut ranges = Vec::new();
        let mut start = 0u16;
        for (i, seed) in seeds.iter().enumerate() {
            let stop = if i == n - 1 {
                SLOT_COUNT - 1
            } else {
                start + slot_per - 1
            };
            let master = Addr::new(format!("node-{seed}"), 6379);
            ranges.push(SlotRange::new(start, stop, master, vec![]));
            start = stop + 1;
        }
        let map = SlotMap::canonicalize(ranges.clone());
        let expected: HashSet<Addr> = ranges.iter().map(|r| r.master.clone()).collect();
        map.masters() == expected && map.is_fully_covered()
    }

    /// Invariant 6: canonicalising an already-canonical map is a no-op.
    fn prop_canonicalize_idempotent(seeds: Vec<u8>) -> bool {
        if seeds.is_empty() {
            return true;
        }
        let n = seeds.len().min(8);
        let seeds = &seeds[..n];
        let slot_per = SLOT_COUNT / n as u16;
        let mut ranges = Vec::new();
        let mut start = 0u16;
        for (i, seed) in seeds.iter().enumerate() {
            let stop = if i == n - 1 {
                SLOT_COUNT - 1
            } else {
                start + slot_per - 1
            };
            let master = Addr::new(format!("node-{seed}"), 6379);
            ranges.push(SlotRange::new(start, stop, master, vec![]));
            start = stop + 1;
        }
        let once = SlotMap::canonicalize(ranges);
        let twice = SlotMap::canonicalize(once.ranges().to_vec());
        once == twice
    }
}
