//! Bounded snapshot-frequency store with an allocation-free recording path.
//!
//! This is the heart of the sampler: a fixed-capacity mapping from call-stack
//! snapshots to accumulated weights. Everything the recording path touches is
//! allocated up front, because samples are recorded from timer signals and
//! allocation probes where re-entering the allocator is not an option.
//!
//! # Design
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ keys      [ [a,b,∅,∅] [c,∅,∅,∅] [∅,∅,∅,∅] ... ]  (arena)      │
//! │ weights   [ 120       35        0         ... ]               │
//! │ index     { hash(a,b) → 0, hash(c) → 1, ... }    (pre-sized)  │
//! │ free      [ 2, 5, 9, ... ]                       (slot pool)  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Recording captures the stack directly into the buffer of the next free
//! slot, then probes the index with a precomputed hash. On a hit the weight
//! accumulates and the slot stays free, serving as scratch for the next
//! capture; on a miss the slot is occupied as-is. No copy, no allocation.
//!
//! When the store is full, a batch eviction removes every entry whose weight
//! is at or below an approximate median (see [`crate::evict`]), returning
//! slots and their buffers to the pool. Weights of evicted entries are
//! discarded rather than re-attributed, a deliberate trade of precision for
//! bounded memory: surviving counts are exact lower bounds.

use fnv::FnvHasher;
use hashbrown::HashTable;
use std::hash::Hasher;

use crate::evict::approximate_median;
use crate::frames::{logical_stack, FrameId, FrameSource};

/// Accumulated sample weight: milliseconds for the CPU sampler, bytes for
/// the memory sampler. Additions saturate rather than wrap.
pub type Weight = u64;

/// Capacity-fixed mapping from stack snapshots to accumulated weights.
pub struct SampleStore {
    capacity: usize,
    max_depth: usize,
    /// Slot-indexed key buffers, allocated once at creation.
    keys: Vec<Box<[FrameId]>>,
    /// Slot-indexed accumulated weights.
    weights: Vec<Weight>,
    /// Hash index over occupied slots, reserved to capacity up front.
    index: HashTable<u32>,
    /// Slots not in the index. The top one doubles as capture scratch.
    free: Vec<u32>,
}

impl SampleStore {
    /// Create a store for `capacity` distinct stacks of up to `max_depth`
    /// frames each. All key buffers are allocated here.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` or `max_depth` is 0, or if `capacity` does not
    /// fit the 32-bit slot ids.
    pub fn new(capacity: usize, max_depth: usize) -> Self {
        assert!(capacity > 0, "sample store capacity must be > 0");
        assert!(max_depth > 0, "max stack depth must be > 0");
        assert!(
            capacity <= u32::MAX as usize,
            "sample store capacity must fit in 32 bits"
        );

        let keys = (0..capacity)
            .map(|_| vec![FrameId::NONE; max_depth].into_boxed_slice())
            .collect();

        SampleStore {
            capacity,
            max_depth,
            keys,
            weights: vec![0; capacity],
            index: HashTable::with_capacity(capacity),
            // Reversed so slots are handed out in ascending order.
            free: (0..capacity as u32).rev().collect(),
        }
    }

    /// Record one sample of `weight` for the stack supplied by `source`.
    ///
    /// Captures into a pre-allocated buffer, evicting beforehand if the
    /// store is full. Safe to call from a non-reentrant signal context:
    /// no path in here allocates, blocks or unwinds.
    pub fn record<S: FrameSource + ?Sized>(&mut self, source: &S, weight: Weight) {
        if self.free.is_empty() {
            self.evict_lower_half();
        }
        let Some(&slot) = self.free.last() else {
            // Eviction always frees at least one slot; fail soft rather
            // than unwind into a signal trampoline.
            return;
        };
        let slot_idx = slot as usize;

        {
            let buf = &mut self.keys[slot_idx];
            let depth = source.capture(buf).min(buf.len());
            for frame in &mut buf[depth..] {
                *frame = FrameId::NONE;
            }
        }

        let hash = frame_hash(&self.keys[slot_idx]);
        let keys = &self.keys;
        let candidate = logical_stack(&keys[slot_idx]);
        let found = self
            .index
            .find(hash, |&s| logical_stack(&keys[s as usize]) == candidate)
            .copied();

        match found {
            Some(existing) => {
                let total = &mut self.weights[existing as usize];
                *total = total.saturating_add(weight);
            }
            None => {
                self.free.pop();
                self.weights[slot_idx] = weight;
                let keys = &self.keys;
                self.index
                    .insert_unique(hash, slot, |&s| frame_hash(&keys[s as usize]));
            }
        }
    }

    /// Accumulated weight for `stack` (innermost frame first). Trailing
    /// padding in the query is ignored. Never allocates.
    pub fn weight_of(&self, stack: &[FrameId]) -> Option<Weight> {
        let wanted = logical_stack(stack);
        let hash = frame_hash(wanted);
        let keys = &self.keys;
        self.index
            .find(hash, |&s| logical_stack(&keys[s as usize]) == wanted)
            .map(|&s| self.weights[s as usize])
    }

    /// Iterate occupied entries as (stack, weight) with padding trimmed.
    pub fn iter(&self) -> impl Iterator<Item = (&[FrameId], Weight)> + '_ {
        self.index.iter().map(|&slot| {
            (
                logical_stack(&self.keys[slot as usize]),
                self.weights[slot as usize],
            )
        })
    }

    /// Sum of all accumulated weights.
    pub fn total_weight(&self) -> Weight {
        self.index
            .iter()
            .fold(0, |acc, &slot| acc.saturating_add(self.weights[slot as usize]))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Remove every entry whose weight is at or below the approximate
    /// median, resetting the freed key buffers. Runs only on a full store
    /// and frees at least one slot: with distinct weights the maximum
    /// always survives and the minimum never does; when every weight is
    /// equal the whole store is cleared.
    fn evict_lower_half(&mut self) -> usize {
        debug_assert!(self.free.is_empty(), "eviction runs only on a full store");
        let median = approximate_median(&self.weights);
        let mut evicted = 0;

        for slot in 0..self.capacity as u32 {
            let slot_idx = slot as usize;
            if self.weights[slot_idx] > median {
                continue;
            }
            let hash = frame_hash(&self.keys[slot_idx]);
            if let Ok(entry) = self.index.find_entry(hash, |&s| s == slot) {
                let _ = entry.remove();
                for frame in self.keys[slot_idx].iter_mut() {
                    *frame = FrameId::NONE;
                }
                self.weights[slot_idx] = 0;
                self.free.push(slot);
                evicted += 1;
            }
        }

        debug_assert!(evicted > 0, "an eviction pass must free at least one slot");
        evicted
    }
}

impl std::fmt::Debug for SampleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleStore")
            .field("capacity", &self.capacity)
            .field("max_depth", &self.max_depth)
            .field("len", &self.len())
            .finish()
    }
}

/// FNV over the logical frames of a snapshot; padding never contributes.
fn frame_hash(frames: &[FrameId]) -> u64 {
    let mut hasher = FnvHasher::default();
    for frame in logical_stack(frames) {
        hasher.write_u64(frame.as_u64());
    }
    hasher.finish()
}
