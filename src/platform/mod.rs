//! Platform glue for timer-driven sampling.

#[cfg(unix)]
mod unix;

#[cfg(unix)]
pub use unix::{ItimerTimer, SignalProfiler};

/// Whether SIGPROF-driven CPU sampling is available on this target.
///
/// The core samplers work everywhere; only the signal-and-interval-timer
/// plumbing is platform-bound. Hosts on unsupported targets drive ticks
/// themselves through `Profiler::handle_tick`.
pub fn is_supported() -> bool {
    cfg!(unix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn test_supported_on_unix() {
        assert!(is_supported());
    }
}
