//! Error types for sampler lifecycles and platform plumbing.

use std::io;
use thiserror::Error;

/// Which sampler an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerKind {
    Cpu,
    Memory,
}

impl std::fmt::Display for SamplerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SamplerKind::Cpu => write!(f, "cpu"),
            SamplerKind::Memory => write!(f, "memory"),
        }
    }
}

/// Errors surfaced by profiler control operations.
///
/// Recording itself is infallible: the capture and store paths never
/// allocate and never report errors, so everything that can go wrong
/// happens at start/stop time.
#[derive(Error, Debug)]
pub enum ProfilerError {
    #[error("{0} sampler is already running")]
    AlreadyRunning(SamplerKind),

    #[error("another profiler already owns the SIGPROF handler")]
    HandlerClaimed,

    #[error("failed to install the SIGPROF handler: {0}")]
    Signal(#[source] io::Error),

    #[error("failed to {action} the sample timer: {source}")]
    Timer {
        action: &'static str,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ProfilerError>;
