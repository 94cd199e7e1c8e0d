//! Retired sample logs handed to consumers.
//!
//! A [`SampleLog`] is materialized from a [`SampleStore`] at rotation time
//! and never touched by the producer again, so consumers can walk it while
//! sampling continues into a fresh store.

use fnv::FnvHashMap;

use crate::frames::{logical_stack, FrameId};
use crate::store::{SampleStore, Weight};

/// Immutable snapshot of a retired [`SampleStore`].
///
/// Keys are stack snapshots trimmed to their logical depth, innermost frame
/// first. The CPU sampler's garbage-collection entry is the single-frame
/// stack `[FrameId::GC]` and is present in every CPU log, even at weight 0.
#[derive(Debug)]
pub struct SampleLog {
    entries: FnvHashMap<Box<[FrameId]>, Weight>,
}

impl SampleLog {
    pub(crate) fn from_store(store: SampleStore) -> Self {
        let mut entries = FnvHashMap::with_capacity_and_hasher(store.len(), Default::default());
        for (stack, weight) in store.iter() {
            entries.insert(stack.into(), weight);
        }
        SampleLog { entries }
    }

    pub(crate) fn insert(&mut self, stack: Box<[FrameId]>, weight: Weight) {
        self.entries.insert(stack, weight);
    }

    /// Accumulated weight for `stack` (innermost frame first). Trailing
    /// padding in the query is ignored.
    pub fn get(&self, stack: &[FrameId]) -> Option<Weight> {
        self.entries.get(logical_stack(stack)).copied()
    }

    /// Weight attributed to garbage collection, if the entry exists.
    pub fn gc_weight(&self) -> Option<Weight> {
        self.get(&[FrameId::GC])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate stacks (innermost frame first) with their weights.
    pub fn iter(&self) -> impl Iterator<Item = (&[FrameId], Weight)> + '_ {
        self.entries.iter().map(|(stack, &weight)| (&**stack, weight))
    }

    /// Sum of all weights, including the collection entry.
    pub fn total_weight(&self) -> Weight {
        self.entries
            .values()
            .fold(0, |acc, &weight| acc.saturating_add(weight))
    }
}
