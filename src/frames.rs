//! Frame identities and call-stack capture.
//!
//! The samplers never interpret host frames; they only need a cheap identity
//! per callable plus two reserved values: one marking unused snapshot slots
//! and one marking time spent in garbage collection. Hosts hand stacks to the
//! profiler through the [`FrameSource`] trait, which is deliberately small so
//! interpreters, VMs and instrumented native code can all implement it.
//!
//! [`ShadowStack`] is the reference source: instrumented code pushes a frame
//! on entry and pops on exit through the RAII [`FrameGuard`], and a profiling
//! signal arriving on the same thread reads a consistent prefix.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Identifies one callable in the host program.
///
/// Two values are reserved: [`FrameId::NONE`] marks empty snapshot slots and
/// [`FrameId::GC`] marks time spent inside the host's garbage collector.
/// Hosts may map callables to any other value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(u64);

impl FrameId {
    /// Marks an empty snapshot slot.
    pub const NONE: FrameId = FrameId(0);

    /// Sentinel for time spent inside garbage collection.
    pub const GC: FrameId = FrameId(u64::MAX);

    /// Wraps a host-assigned identifier. The reserved values [`FrameId::NONE`]
    /// and [`FrameId::GC`] must not be used for real frames.
    pub const fn new(raw: u64) -> Self {
        FrameId(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

/// Strips the trailing empty-slot padding from a captured snapshot.
pub fn logical_stack(frames: &[FrameId]) -> &[FrameId] {
    let len = frames
        .iter()
        .position(|&frame| frame == FrameId::NONE)
        .unwrap_or(frames.len());
    &frames[..len]
}

/// Supplies call-stack snapshots to the samplers.
///
/// Implementations are invoked from timer ticks and allocation probes,
/// possibly inside a signal handler, and must not allocate or block.
pub trait FrameSource {
    /// The currently innermost active frame, if any.
    fn innermost(&self) -> Option<FrameId>;

    /// Copies the active stack into `out`, innermost frame first, and returns
    /// the number of frames written. Stacks deeper than `out` keep their
    /// innermost frames and drop the outermost ones.
    fn capture(&self, out: &mut [FrameId]) -> usize;
}

/// A ready-made stack, innermost frame first. Handy for hosts that already
/// hold their frames in a buffer, and for tests.
impl FrameSource for [FrameId] {
    fn innermost(&self) -> Option<FrameId> {
        self.first().copied()
    }

    fn capture(&self, out: &mut [FrameId]) -> usize {
        let n = self.len().min(out.len());
        out[..n].copy_from_slice(&self[..n]);
        n
    }
}

impl<T: FrameSource> FrameSource for std::sync::Arc<T> {
    fn innermost(&self) -> Option<FrameId> {
        (**self).innermost()
    }

    fn capture(&self, out: &mut [FrameId]) -> usize {
        (**self).capture(out)
    }
}

/// Reference [`FrameSource`] backed by a thread-maintained frame stack.
///
/// The slots are atomics so a profiling signal interrupting a push still
/// reads a consistent prefix; a tick landing mid-push may attribute itself to
/// the caller rather than the callee, which sampling tolerates. Frames nested
/// deeper than the configured depth are counted but not stored.
pub struct ShadowStack {
    frames: Box<[AtomicU64]>,
    depth: AtomicUsize,
}

impl ShadowStack {
    /// Create a stack able to track `max_depth` nested frames.
    ///
    /// Frames entered beyond `max_depth` are counted but not stored, and
    /// [`FrameSource::innermost`] then reports the deepest stored frame.
    /// A collection sentinel entered past that depth is therefore charged
    /// to its caller rather than the accumulator, so size the stack for
    /// the deepest nesting that matters.
    ///
    /// # Panics
    ///
    /// Panics if `max_depth` is 0.
    pub fn new(max_depth: usize) -> Self {
        assert!(max_depth > 0, "shadow stack depth must be > 0");
        let frames = (0..max_depth)
            .map(|_| AtomicU64::new(FrameId::NONE.as_u64()))
            .collect();
        ShadowStack {
            frames,
            depth: AtomicUsize::new(0),
        }
    }

    /// Push `frame` and return a guard that pops it on drop.
    pub fn enter(&self, frame: FrameId) -> FrameGuard<'_> {
        self.push(frame);
        FrameGuard { stack: self }
    }

    /// Current nesting depth, including frames too deep to store.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    fn push(&self, frame: FrameId) {
        let depth = self.depth.load(Ordering::Relaxed);
        if depth < self.frames.len() {
            self.frames[depth].store(frame.as_u64(), Ordering::Relaxed);
        }
        // Publish the frame before the new depth becomes visible.
        self.depth.store(depth + 1, Ordering::Release);
    }

    fn pop(&self) {
        let depth = self.depth.load(Ordering::Relaxed);
        debug_assert!(depth > 0, "pop on an empty shadow stack");
        if depth > 0 {
            self.depth.store(depth - 1, Ordering::Release);
        }
    }
}

impl FrameSource for ShadowStack {
    fn innermost(&self) -> Option<FrameId> {
        let depth = self.depth.load(Ordering::Acquire).min(self.frames.len());
        if depth == 0 {
            return None;
        }
        Some(FrameId::new(self.frames[depth - 1].load(Ordering::Relaxed)))
    }

    fn capture(&self, out: &mut [FrameId]) -> usize {
        let depth = self.depth.load(Ordering::Acquire).min(self.frames.len());
        let n = depth.min(out.len());
        for (i, slot) in out[..n].iter_mut().enumerate() {
            *slot = FrameId::new(self.frames[depth - 1 - i].load(Ordering::Relaxed));
        }
        n
    }
}

/// Pops its frame from the owning [`ShadowStack`] when dropped.
#[must_use = "dropping the guard immediately pops the frame"]
pub struct FrameGuard<'a> {
    stack: &'a ShadowStack,
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        self.stack.pop();
    }
}
