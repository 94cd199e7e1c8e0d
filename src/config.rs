//! Profiler configuration.

/// Default number of distinct stacks a log can hold.
pub const DEFAULT_LOG_CAPACITY: usize = 10_000;

/// Default number of frames kept per stack snapshot.
pub const DEFAULT_MAX_STACK_DEPTH: usize = 16;

/// Sizing knobs shared by both samplers.
///
/// The capacity bounds how many distinct stacks a log holds before the
/// eviction pass runs; the depth bounds how many frames each snapshot keeps.
/// Together they fix the memory footprint of a sampler at start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfilerConfig {
    /// Maximum number of distinct stacks per log.
    pub log_capacity: usize,
    /// Frames kept per snapshot; deeper stacks keep their innermost frames.
    pub max_stack_depth: usize,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        ProfilerConfig {
            log_capacity: DEFAULT_LOG_CAPACITY,
            max_stack_depth: DEFAULT_MAX_STACK_DEPTH,
        }
    }
}

impl ProfilerConfig {
    /// Create a configuration with explicit capacity and depth.
    pub fn new(log_capacity: usize, max_stack_depth: usize) -> Self {
        ProfilerConfig {
            log_capacity,
            max_stack_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProfilerConfig::default();
        assert_eq!(config.log_capacity, 10_000);
        assert_eq!(config.max_stack_depth, 16);
    }

    #[test]
    fn test_explicit_values() {
        let config = ProfilerConfig::new(128, 4);
        assert_eq!(config.log_capacity, 128);
        assert_eq!(config.max_stack_depth, 4);
    }
}
