use std::collections::HashSet;

use crate::addr::Addr;

/// Highest slot index, exclusive upper bound is [`SLOT_COUNT`].
pub const SLOT_COUNT: u16 = 16384;

/// A contiguous range of hash slots owned by a single master, with zero or
/// more replicas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotRange {
    pub start: u16,
    pub stop: u16,
    pub master: Addr,
    pub replicas: Vec<Addr>,
}

impl SlotRange {
    pub fn new(start: u16, stop: u16, master: Addr, replicas: Vec<Addr>) -> Self {
        debug_assert!(start <= stop);
        debug_assert!(stop < SLOT_COUNT);
        SlotRange {
            start,
            stop,
            master,
            replicas,
        }
    }
}

/// An ordered, canonical assignment of slot ranges to masters.
///
/// Canonical form is the sequence sorted by `start`; two maps are equal iff
/// their canonical forms are element-wise equal. [`SlotMap::canonicalize`]
/// is how a raw `CLUSTER SLOTS` reply becomes a [`SlotMap`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlotMap {
    ranges: Vec<SlotRange>,
}

impl SlotMap {
    /// Sorts `ranges` by start slot and wraps them into a canonical map.
    /// Idempotent: canonicalizing an already-sorted map is a no-op beyond
    /// the sort, which is itself a no-op on sorted input.
    pub fn canonicalize(mut ranges: Vec<SlotRange>) -> Self {
        ranges.sort_by_key(|r| r.start);
        SlotMap { ranges }
    }

    pub fn ranges(&self) -> &[SlotRange] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Every address mentioned anywhere in the map: masters and replicas.
    pub fn all_addrs(&self) -> HashSet<Addr> {
        let mut out = HashSet::new();
        for range in &self.ranges {
            out.insert(range.master.clone());
            out.extend(range.replicas.iter().cloned());
        }
        out
    }

    /// The master-set derived from this map, per invariant 2 of the data model.
    pub fn masters(&self) -> HashSet<Addr> {
        self.ranges.iter().map(|r| r.master.clone()).collect()
    }

    /// `not_all_slots_covered`: ranges, in sorted order, must form a
    /// contiguous cover of `[0, 16384)`.
    pub fn is_fully_covered(&self) -> bool {
        if self.ranges.is_empty() {
            return false;
        }
        if self.ranges[0].start != 0 {
            return false;
        }
        for pair in self.ranges.windows(2) {
            if pair[1].start != pair[0].stop + 1 {
                return false;
            }
        }
        self.ranges.last().unwrap().stop + 1 == SLOT_COUNT
    }

    /// `too_few_replicas`: true if every range has at least `min_replicas`
    /// replica addresses.
    pub fn has_min_replicas(&self, min_replicas: usize) -> bool {
        self.ranges
            .iter()
            .all(|r| r.replicas.len() >= min_replicas)
    }
}
