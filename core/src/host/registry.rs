//! Continuation registry
//!
//! The registry owns every live continuation. Suspension queues only hold
//! ids, so a continuation exists exactly as long as its registry entry: from
//! the start of its call until it finishes or fails.

use std::collections::BTreeMap;

use super::continuation::{Continuation, ContinuationId, ContinuationState};

#[derive(Debug, Default)]
pub struct ContinuationRegistry {
    entries: BTreeMap<ContinuationId, Continuation>,
    next_id: u64,
}

impl ContinuationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out a fresh, never reused handle
    pub fn allocate_id(&mut self) -> ContinuationId {
        self.next_id += 1;
        ContinuationId(self.next_id)
    }

    pub fn insert(&mut self, continuation: Continuation) {
        self.entries.insert(continuation.id, continuation);
    }

    pub fn get(&self, id: ContinuationId) -> Option<&Continuation> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: ContinuationId) -> Option<&mut Continuation> {
        self.entries.get_mut(&id)
    }

    /// Drop a continuation; returns it if it was registered
    pub fn release(&mut self, id: ContinuationId) -> Option<Continuation> {
        self.entries.remove(&id)
    }

    pub fn contains(&self, id: ContinuationId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn state(&self, id: ContinuationId) -> Option<&ContinuationState> {
        self.entries.get(&id).map(|c| &c.state)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ContinuationId> + '_ {
        self.entries.keys().copied()
    }
}
