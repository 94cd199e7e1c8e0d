//! CLI argument parsing for the muestra demo binary.

use clap::{Parser, ValueEnum};

/// Output format for collected profiles
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary table (default)
    Text,
    /// JSON for machine parsing
    Json,
    /// Collapsed stacks, one per line, for flamegraph tooling
    Folded,
}

#[derive(Parser, Debug)]
#[command(name = "muestra")]
#[command(version)]
#[command(about = "Statistical sampling profiler demo", long_about = None)]
pub struct Cli {
    /// Sampling interval in milliseconds
    #[arg(long = "interval-ms", value_name = "MS", default_value = "10")]
    pub interval_ms: u64,

    /// How long to run the synthetic workload, in milliseconds
    #[arg(long = "duration-ms", value_name = "MS", default_value = "400")]
    pub duration_ms: u64,

    /// Maximum number of distinct stacks kept per log
    #[arg(long = "capacity", value_name = "N", default_value = "10000")]
    pub capacity: usize,

    /// Stack depth recorded per sample; deeper stacks keep their innermost frames
    #[arg(long = "max-depth", value_name = "N", default_value = "16")]
    pub max_depth: usize,

    /// Also run the allocation sampler over the workload
    #[arg(long)]
    pub memory: bool,

    /// Output format (text, json or folded)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug logging to stderr
    #[arg(long)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["muestra"]);
        assert_eq!(cli.interval_ms, 10);
        assert_eq!(cli.duration_ms, 400);
        assert_eq!(cli.capacity, 10_000);
        assert_eq!(cli.max_depth, 16);
        assert!(!cli.memory);
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_memory_flag() {
        let cli = Cli::parse_from(["muestra", "--memory"]);
        assert!(cli.memory);
    }

    #[test]
    fn test_cli_format_values() {
        let cli = Cli::parse_from(["muestra", "--format", "folded"]);
        assert!(matches!(cli.format, OutputFormat::Folded));

        let cli = Cli::parse_from(["muestra", "--format", "json"]);
        assert!(matches!(cli.format, OutputFormat::Json));
    }

    #[test]
    fn test_cli_sizing_flags() {
        let cli = Cli::parse_from(["muestra", "--capacity", "64", "--max-depth", "4"]);
        assert_eq!(cli.capacity, 64);
        assert_eq!(cli.max_depth, 4);
    }
}
