//! CPU-time sampler.
//!
//! Ticks arrive from a timer measured against process CPU time, each one
//! worth the sampling interval in whole milliseconds. A tick whose innermost
//! frame is the garbage-collection sentinel lands in a separate accumulator
//! instead of the store, because the store must not be touched while the
//! host is mid-collection; at log rotation the accumulator is folded back in
//! as a single-frame entry.

use std::time::Duration;

use crate::config::ProfilerConfig;
use crate::error::{ProfilerError, Result, SamplerKind};
use crate::frames::{FrameId, FrameSource};
use crate::log::SampleLog;
use crate::store::{SampleStore, Weight};

/// Timer-driven sampler accumulating CPU milliseconds per stack.
pub struct CpuSampler {
    config: ProfilerConfig,
    running: bool,
    tick_weight: Weight,
    store: Option<SampleStore>,
    gc_weight: Weight,
}

impl CpuSampler {
    pub fn new(config: ProfilerConfig) -> Self {
        CpuSampler {
            config,
            running: false,
            tick_weight: 1,
            store: None,
            gc_weight: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Transition to running with the given sampling interval.
    ///
    /// The store is created lazily: a restart after a stop without a log
    /// read resumes accumulating into the existing store, and the
    /// collection accumulator is reset only when a store is created.
    pub fn start(&mut self, interval: Duration) -> Result<()> {
        if self.running {
            return Err(ProfilerError::AlreadyRunning(SamplerKind::Cpu));
        }
        if self.store.is_none() {
            self.store = Some(SampleStore::new(
                self.config.log_capacity,
                self.config.max_stack_depth,
            ));
            self.gc_weight = 0;
        }
        self.tick_weight = u64::try_from(interval.as_millis())
            .unwrap_or(u64::MAX)
            .max(1);
        self.running = true;
        tracing::debug!(tick_weight = self.tick_weight, "cpu sampler running");
        Ok(())
    }

    /// Transition to stopped, keeping the store for a later read or
    /// restart. Returns whether the sampler had been running.
    pub fn stop(&mut self) -> bool {
        let was_running = self.running;
        self.running = false;
        if was_running {
            tracing::debug!("cpu sampler stopped");
        }
        was_running
    }

    /// Account one timer tick against the stack supplied by `source`.
    /// No-op unless running.
    pub fn on_tick<S: FrameSource + ?Sized>(&mut self, source: &S) {
        if !self.running {
            return;
        }
        if source.innermost() == Some(FrameId::GC) {
            self.gc_weight = self.gc_weight.saturating_add(self.tick_weight);
            return;
        }
        if let Some(store) = self.store.as_mut() {
            store.record(source, self.tick_weight);
        }
    }

    /// Hand the accumulated log over, or `None` if no store exists.
    ///
    /// The collection entry is always folded in, even at zero, so consumers
    /// can rely on the key being present. A fresh store is installed only
    /// when the sampler is still running.
    pub fn read_log(&mut self) -> Option<SampleLog> {
        let store = self.store.take()?;
        let mut log = SampleLog::from_store(store);
        log.insert(vec![FrameId::GC].into_boxed_slice(), self.gc_weight);
        self.gc_weight = 0;
        if self.running {
            self.store = Some(SampleStore::new(
                self.config.log_capacity,
                self.config.max_stack_depth,
            ));
        }
        tracing::debug!(entries = log.len(), "cpu log handed over");
        Some(log)
    }
}
