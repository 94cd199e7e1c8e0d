//! Allocation sampler.
//!
//! The host reports allocations through a probe; each one is recorded
//! against the current stack with the allocation size in bytes as its
//! weight, so hot allocation sites dominate the log by volume rather than
//! by call count. Which allocations get reported is the host's choice.

use crate::config::ProfilerConfig;
use crate::error::{ProfilerError, Result, SamplerKind};
use crate::frames::FrameSource;
use crate::log::SampleLog;
use crate::store::SampleStore;

/// Probe-driven sampler accumulating allocated bytes per stack.
pub struct MemorySampler {
    config: ProfilerConfig,
    running: bool,
    store: Option<SampleStore>,
}

impl MemorySampler {
    pub fn new(config: ProfilerConfig) -> Self {
        MemorySampler {
            config,
            running: false,
            store: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Transition to running, creating the store lazily like the CPU
    /// sampler does.
    pub fn start(&mut self) -> Result<()> {
        if self.running {
            return Err(ProfilerError::AlreadyRunning(SamplerKind::Memory));
        }
        if self.store.is_none() {
            self.store = Some(SampleStore::new(
                self.config.log_capacity,
                self.config.max_stack_depth,
            ));
        }
        self.running = true;
        tracing::debug!("memory sampler running");
        Ok(())
    }

    /// Transition to stopped, keeping the store for a later read or
    /// restart. Returns whether the sampler had been running.
    pub fn stop(&mut self) -> bool {
        let was_running = self.running;
        self.running = false;
        if was_running {
            tracing::debug!("memory sampler stopped");
        }
        was_running
    }

    /// Account one allocation of `size` bytes against the stack supplied
    /// by `source`. No-op unless running.
    pub fn on_alloc<S: FrameSource + ?Sized>(&mut self, source: &S, size: usize) {
        if !self.running {
            return;
        }
        if let Some(store) = self.store.as_mut() {
            store.record(source, size as u64);
        }
    }

    /// Hand the accumulated log over, or `None` if no store exists. A
    /// fresh store is installed only when the sampler is still running.
    pub fn read_log(&mut self) -> Option<SampleLog> {
        let store = self.store.take()?;
        let log = SampleLog::from_store(store);
        if self.running {
            self.store = Some(SampleStore::new(
                self.config.log_capacity,
                self.config.max_stack_depth,
            ));
        }
        tracing::debug!(entries = log.len(), "memory log handed over");
        Some(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::FrameId;

    fn frame(raw: u64) -> FrameId {
        FrameId::new(raw)
    }

    fn sampler() -> MemorySampler {
        MemorySampler::new(ProfilerConfig::new(64, 4))
    }

    #[test]
    fn test_start_twice_is_an_error() {
        let mut memory = sampler();
        memory.start().unwrap();
        let err = memory.start().unwrap_err();
        assert!(matches!(
            err,
            ProfilerError::AlreadyRunning(SamplerKind::Memory)
        ));
    }

    #[test]
    fn test_allocation_sizes_accumulate() {
        let mut memory = sampler();
        memory.start().unwrap();

        let stack = [frame(1), frame(2)];
        memory.on_alloc(&stack[..], 5);
        memory.on_alloc(&stack[..], 3);
        memory.on_alloc(&stack[..], 2);

        let log = memory.read_log().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log.get(&stack), Some(10));
    }

    #[test]
    fn test_probes_are_ignored_while_stopped() {
        let mut memory = sampler();
        memory.on_alloc(&[frame(1)][..], 100);
        assert!(memory.read_log().is_none());

        memory.start().unwrap();
        memory.on_alloc(&[frame(1)][..], 100);
        memory.stop();
        memory.on_alloc(&[frame(1)][..], 50);

        let log = memory.read_log().unwrap();
        assert_eq!(log.get(&[frame(1)]), Some(100));
    }

    #[test]
    fn test_no_collection_entry_in_memory_logs() {
        let mut memory = sampler();
        memory.start().unwrap();
        memory.on_alloc(&[frame(1)][..], 8);

        let log = memory.read_log().unwrap();
        assert_eq!(log.gc_weight(), None);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_read_while_running_installs_a_fresh_store() {
        let mut memory = sampler();
        memory.start().unwrap();
        memory.on_alloc(&[frame(1)][..], 8);

        assert!(memory.read_log().is_some());
        memory.on_alloc(&[frame(2)][..], 4);

        let log = memory.read_log().unwrap();
        assert_eq!(log.get(&[frame(1)]), None);
        assert_eq!(log.get(&[frame(2)]), Some(4));
    }

    #[test]
    fn test_read_after_stop_retires_the_store() {
        let mut memory = sampler();
        memory.start().unwrap();
        memory.on_alloc(&[frame(1)][..], 8);
        assert!(memory.stop());

        assert!(memory.read_log().is_some());
        assert!(memory.read_log().is_none());
    }
}
