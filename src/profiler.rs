//! Profiler facade tying a frame source, the samplers and a timer together.

use std::time::Duration;

use crate::config::ProfilerConfig;
use crate::cpu::CpuSampler;
use crate::error::{ProfilerError, Result};
use crate::frames::FrameSource;
use crate::log::SampleLog;
use crate::memory::MemorySampler;
use crate::timer::{ManualTimer, SampleTimer};

/// Embeddable sampling profiler over a host-supplied [`FrameSource`].
///
/// Owns one CPU sampler and one memory sampler, each with an independent
/// start/stop/read lifecycle over the shared source. Hosts deliver timer
/// ticks through [`Profiler::handle_tick`] and allocations through
/// [`Profiler::malloc_probe`]; the platform layer wraps this type to drive
/// `handle_tick` from a real profiling signal.
pub struct Profiler<S> {
    source: S,
    timer: Box<dyn SampleTimer>,
    cpu: CpuSampler,
    memory: MemorySampler,
}

impl<S: FrameSource> Profiler<S> {
    /// Create a profiler driven by a [`ManualTimer`]; the host delivers
    /// ticks itself.
    pub fn new(source: S, config: ProfilerConfig) -> Self {
        Self::with_timer(source, config, Box::new(ManualTimer::new()))
    }

    pub fn with_timer(source: S, config: ProfilerConfig, timer: Box<dyn SampleTimer>) -> Self {
        Profiler {
            source,
            timer,
            cpu: CpuSampler::new(config),
            memory: MemorySampler::new(config),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Start CPU sampling at `interval` and arm the timer.
    ///
    /// If the timer fails to arm, the sampler is rolled back to stopped;
    /// the lazily-created store stays for a later start or read.
    pub fn start_cpu(&mut self, interval: Duration) -> Result<()> {
        self.cpu.start(interval)?;
        if let Err(err) = self.timer.arm(interval) {
            self.cpu.stop();
            return Err(ProfilerError::Timer {
                action: "arm",
                source: err,
            });
        }
        tracing::info!(interval_ms = interval.as_millis() as u64, "cpu profiling started");
        Ok(())
    }

    /// Stop CPU sampling and disarm the timer. Returns whether the sampler
    /// had been running. The accumulated log is untouched.
    pub fn stop_cpu(&mut self) -> bool {
        let was_running = self.cpu.stop();
        if was_running {
            if let Err(err) = self.timer.disarm() {
                tracing::warn!(error = %err, "failed to disarm the sample timer");
            }
        }
        was_running
    }

    pub fn cpu_running(&self) -> bool {
        self.cpu.is_running()
    }

    /// Take the accumulated CPU log, or `None` if there is nothing to take.
    pub fn read_cpu_log(&mut self) -> Option<SampleLog> {
        self.cpu.read_log()
    }

    /// Start memory sampling; the host then reports allocations through
    /// [`Profiler::malloc_probe`].
    pub fn start_memory(&mut self) -> Result<()> {
        self.memory.start()?;
        tracing::info!("memory profiling started");
        Ok(())
    }

    /// Stop memory sampling. Returns whether the sampler had been running.
    pub fn stop_memory(&mut self) -> bool {
        self.memory.stop()
    }

    pub fn memory_running(&self) -> bool {
        self.memory.is_running()
    }

    /// Take the accumulated memory log, or `None` if there is nothing to
    /// take.
    pub fn read_memory_log(&mut self) -> Option<SampleLog> {
        self.memory.read_log()
    }

    /// Feed one timer tick to the CPU sampler.
    pub fn handle_tick(&mut self) {
        self.cpu.on_tick(&self.source);
    }

    /// Report one host allocation of `size` bytes to the memory sampler.
    pub fn malloc_probe(&mut self, size: usize) {
        self.memory.on_alloc(&self.source, size);
    }
}
