use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

#[cfg(feature = "rkyv-support")]
use bytecheck::CheckBytes;
use parking_lot::Mutex;
#[cfg(feature = "rkyv-support")]
use rkyv::{Archive, Deserialize, Serialize};
use tracing::{debug, trace};

use crate::clock::{Clock, HybridClock};
use crate::element::{Element, Keyed};
#[cfg(feature = "rkyv-support")]
use crate::error::BadState;
use crate::error::ElementNotFound;
use crate::timestamp::Timestamp;

pub type StateChanges = Vec<(String, Timestamp)>;

/// The most recent add event observed for a key.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "rkyv-support", derive(Serialize, Deserialize, Archive))]
#[cfg_attr(feature = "rkyv-support", archive_attr(derive(CheckBytes, Debug)))]
pub struct AddRecord {
    pub element: Element,
    pub timestamp: Timestamp,
}

#[derive(Debug, Default, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "rkyv-support", derive(Serialize, Deserialize, Archive))]
#[cfg_attr(feature = "rkyv-support", archive_attr(derive(CheckBytes, Debug)))]
/// A Last-Writer-Wins element set.
///
/// The set keeps two registers per key, the last time the key was added
/// and the last time it was removed. A key is part of the set if it has
/// been added, and it has either never been removed or the add happened
/// strictly after the removal.
///
/// Registers are only ever inserted or replaced by a strictly later
/// timestamp and are never dropped, which makes [ElementSet::merge] a join:
/// merging replicas in any order, any number of times, always produces the
/// same registers.
///
/// ## Last write wins conditions
/// If an add and a remove of the same key carry the same timestamp, the
/// remove wins. When merging, registers holding the same timestamp keep the
/// local value. Neither case can occur for events produced by a single
/// [Clock], outcomes for identical timestamps produced by different clocks
/// should not be relied upon.
///
/// ## Example
/// ```
/// use lwwgraph_crdt::{ElementSet, Timestamp};
///
/// let mut node_a_set = ElementSet::default();
/// let mut node_b_set = ElementSet::default();
///
/// node_a_set.add_at("a", Timestamp::new(1, 0));
/// node_b_set.add_at("b", Timestamp::new(2, 0));
///
/// // Set A has key `a` removed.
/// node_a_set.remove_at("a", Timestamp::new(3, 0));
///
/// node_b_set.merge(&node_a_set);
/// node_a_set.merge(&node_b_set);
///
/// assert!(!node_a_set.contains("a"), "Key should be correctly removed.");
/// assert!(!node_b_set.contains("a"), "Key should be correctly removed.");
/// assert!(node_a_set.contains("b"));
/// assert_eq!(node_a_set, node_b_set);
/// ```
pub struct ElementSet {
    additions: BTreeMap<String, AddRecord>,
    removals: HashMap<String, Timestamp>,
}

impl ElementSet {
    #[cfg(feature = "rkyv-support")]
    /// Deserializes a [ElementSet] from a array of bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, BadState> {
        rkyv::from_bytes::<Self>(data).map_err(|_| BadState)
    }

    #[cfg(feature = "rkyv-support")]
    /// Serializes the set into a buffer of bytes.
    pub fn as_bytes(&self) -> Result<Vec<u8>, BadState> {
        Ok(rkyv::to_bytes::<_, 2048>(self)
            .map_err(|_| BadState)?
            .into_vec())
    }

    /// Records an add event for the element at the given timestamp.
    ///
    /// Returns if the add register for the key has actually been updated.
    /// If `false`, a later add of the same key has already been observed.
    pub fn add_at(&mut self, element: impl Into<Element>, ts: Timestamp) -> bool {
        let element = element.into();
        let key = element.key().to_string();

        match self.additions.get_mut(&key) {
            Some(existing) if existing.timestamp >= ts => return false,
            Some(existing) => {
                existing.element = element;
                existing.timestamp = ts;
            },
            None => {
                self.additions.insert(
                    key.clone(),
                    AddRecord {
                        element,
                        timestamp: ts,
                    },
                );
            },
        }

        trace!(key = %key, timestamp = %ts, "add");
        true
    }

    /// Records a remove event for the key at the given timestamp.
    ///
    /// The key does not need to have been added beforehand, the tombstone
    /// will still hide any add of the key which happened before it.
    ///
    /// Returns if the remove register for the key has actually been updated.
    pub fn remove_at(&mut self, key: &str, ts: Timestamp) -> bool {
        match self.removals.get_mut(key) {
            Some(existing) if *existing >= ts => return false,
            Some(existing) => *existing = ts,
            None => {
                self.removals.insert(key.to_string(), ts);
            },
        }

        trace!(key = %key, timestamp = %ts, "remove");
        true
    }

    /// Get the element stored for the key if the key is part of the set.
    pub fn lookup(&self, key: &str) -> Result<&Element, ElementNotFound> {
        self.additions
            .get(key)
            .filter(|record| self.is_live(key, record))
            .map(|record| &record.element)
            .ok_or_else(|| ElementNotFound(key.to_string()))
    }

    /// Checks if the key is currently part of the set.
    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_ok()
    }

    /// All elements currently part of the set.
    ///
    /// No ordering guarantees are given, callers which need a
    /// deterministic order must sort the elements themselves.
    pub fn list(&self) -> Vec<&Element> {
        self.iter().collect()
    }

    /// Iterates over all elements currently part of the set.
    pub fn iter(&self) -> impl Iterator<Item = &Element> + '_ {
        self.additions
            .iter()
            .filter(|(key, record)| self.is_live(key, record))
            .map(|(_, record)| record)
            .map(|record| &record.element)
    }

    /// Iterates over the keys of all elements currently part of the set.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.iter().map(|element| element.key())
    }

    /// The number of elements currently part of the set.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// The add register for the given key, regardless of any removal.
    pub fn added_at(&self, key: &str) -> Option<Timestamp> {
        self.additions.get(key).map(|record| record.timestamp)
    }

    /// The remove register for the given key.
    pub fn removed_at(&self, key: &str) -> Option<Timestamp> {
        self.removals.get(key).copied()
    }

    /// The latest timestamp held by any add or remove register.
    pub fn latest(&self) -> Option<Timestamp> {
        let added = self.additions.values().map(|record| record.timestamp);
        added.chain(self.removals.values().copied()).max()
    }

    /// Merges another set into the current set.
    ///
    /// Every register of `other` replaces the local register for the same
    /// key only if it carries a strictly later timestamp.
    ///
    /// Returns the number of registers which have been adopted from `other`.
    pub fn merge(&mut self, other: &ElementSet) -> usize {
        let mut adopted = 0;

        for (key, remote) in other.additions.iter() {
            match self.additions.get_mut(key) {
                Some(local) if local.timestamp >= remote.timestamp => continue,
                Some(local) => *local = remote.clone(),
                None => {
                    self.additions.insert(key.clone(), remote.clone());
                },
            }

            adopted += 1;
        }

        for (key, remote_ts) in other.removals.iter() {
            match self.removals.entry(key.clone()) {
                Entry::Occupied(mut entry) => {
                    if entry.get() >= remote_ts {
                        continue;
                    }

                    entry.insert(*remote_ts);
                },
                Entry::Vacant(v) => {
                    v.insert(*remote_ts);
                },
            }

            adopted += 1;
        }

        if adopted > 0 {
            debug!(adopted = adopted, "Merged remote element set.");
        }

        adopted
    }

    /// Calculates the registers of `other` which a merge would adopt,
    /// returning the changed add registers and the changed remove registers.
    ///
    /// This follows the same logic as `set.merge(&other)` but does not modify
    /// the state of the set. Both lists are sorted by key.
    ///
    /// NOTE:
    ///     The difference is *not* the symmetric difference between the two sets.
    pub fn diff(&self, other: &ElementSet) -> (StateChanges, StateChanges) {
        let changes: StateChanges = other
            .additions
            .iter()
            .filter(|(key, remote)| {
                self.added_at(key)
                    .map_or(true, |local| local < remote.timestamp)
            })
            .map(|(key, remote)| (key.clone(), remote.timestamp))
            .collect();

        let mut removals: StateChanges = other
            .removals
            .iter()
            .filter(|(key, remote_ts)| {
                self.removed_at(key).map_or(true, |local| local < **remote_ts)
            })
            .map(|(key, ts)| (key.clone(), *ts))
            .collect();
        removals.sort();

        (changes, removals)
    }

    fn is_live(&self, key: &str, record: &AddRecord) -> bool {
        self.removals
            .get(key)
            .map_or(true, |removed| record.timestamp > *removed)
    }
}

#[derive(Debug)]
/// A replica of a [ElementSet] which timestamps its own events.
///
/// Each operation holds the replica's lock for its entire duration, the
/// set can therefore be shared freely between threads.
pub struct Set<C: Clock = HybridClock> {
    state: Mutex<ElementSet>,
    clock: C,
}

impl Set<HybridClock> {
    /// Creates a new empty set using the system backed [HybridClock].
    pub fn new() -> Self {
        Self::with_clock(HybridClock::new())
    }
}

impl Default for Set<HybridClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Set<C> {
    /// Creates a new empty set which reads its timestamps from the given clock.
    pub fn with_clock(clock: C) -> Self {
        Self::from_state(ElementSet::default(), clock)
    }

    /// Creates a set from some existing replicated state.
    pub fn from_state(state: ElementSet, clock: C) -> Self {
        Self {
            state: Mutex::new(state),
            clock,
        }
    }

    /// Adds the element to the set, replacing any element with the same key.
    pub fn add(&self, element: impl Into<Element>) {
        let mut state = self.state.lock();
        let ts = self.clock.now();
        state.add_at(element, ts);
    }

    /// Removes the element with the given key from the set.
    ///
    /// This succeeds even if the key has never been added.
    pub fn remove(&self, key: &str) {
        let mut state = self.state.lock();
        let ts = self.clock.now();
        state.remove_at(key, ts);
    }

    pub fn lookup(&self, key: &str) -> Result<Element, ElementNotFound> {
        self.state.lock().lookup(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().contains(key)
    }

    /// All elements currently part of the set in no particular order.
    pub fn list(&self) -> Vec<Element> {
        self.state.lock().iter().cloned().collect()
    }

    /// Takes a copy of the replicated state of the set.
    ///
    /// This is the state which should be shipped to other replicas.
    pub fn snapshot(&self) -> ElementSet {
        self.state.lock().clone()
    }

    /// Merges the state of another replica into this one.
    ///
    /// The remote replica is snapshotted first and its lock released before
    /// this replica is locked, so two replicas can merge from one another
    /// concurrently without deadlocking.
    pub fn merge<O: Clock>(&self, remote: &Set<O>) {
        let remote = remote.snapshot();
        self.merge_state(&remote);
    }

    /// Merges some replicated state, i.e. received from another node.
    ///
    /// The clock observes the latest remote timestamp, so local events
    /// recorded after the merge are always ordered after the merged ones.
    pub fn merge_state(&self, remote: &ElementSet) {
        let mut state = self.state.lock();
        state.merge(remote);

        if let Some(latest) = remote.latest() {
            self.clock.observe(latest);
        }
    }
}
