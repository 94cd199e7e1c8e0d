use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use muestra::cli::{Cli, OutputFormat};
use muestra::config::ProfilerConfig;
use muestra::demo;
use muestra::frames::ShadowStack;
use muestra::log::SampleLog;
use muestra::platform::SignalProfiler;
use muestra::report;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    if cli.interval_ms == 0 {
        bail!("--interval-ms must be greater than zero");
    }
    if cli.capacity == 0 {
        bail!("--capacity must be greater than zero");
    }
    if cli.max_depth == 0 {
        bail!("--max-depth must be greater than zero");
    }

    let config = ProfilerConfig::new(cli.capacity, cli.max_depth);
    let stack = Arc::new(ShadowStack::new(demo::SHADOW_DEPTH));
    let mut profiler = SignalProfiler::new(Arc::clone(&stack), config)
        .context("claiming the profiling signal")?;

    profiler
        .start_cpu(Duration::from_millis(cli.interval_ms))
        .context("starting the cpu sampler")?;
    if cli.memory {
        profiler
            .start_memory()
            .context("starting the memory sampler")?;
    }

    let sink = demo::run(&stack, Duration::from_millis(cli.duration_ms), |size| {
        profiler.malloc_probe(size);
    });
    tracing::debug!(sink, "workload finished");

    profiler.stop_cpu();
    if cli.memory {
        profiler.stop_memory();
    }

    let cpu_log = profiler.read_cpu_log();
    let memory_log = profiler.read_memory_log();
    print_logs(cli.format, cpu_log.as_ref(), memory_log.as_ref())
}

fn print_logs(
    format: OutputFormat,
    cpu: Option<&SampleLog>,
    memory: Option<&SampleLog>,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            if let Some(log) = cpu {
                println!("=== CPU profile ===");
                print!("{}", report::render_text(log, demo::resolve));
            }
            if let Some(log) = memory {
                println!();
                println!("=== Memory profile (bytes) ===");
                print!("{}", report::render_text(log, demo::resolve));
            }
        }
        OutputFormat::Json => {
            let doc = report::ProfileReport {
                cpu: cpu.map(|log| report::build_report(log, demo::resolve)),
                memory: memory.map(|log| report::build_report(log, demo::resolve)),
            };
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        OutputFormat::Folded => {
            if let Some(log) = cpu {
                print!("{}", report::to_folded(log, demo::resolve));
            }
            if let Some(log) = memory {
                print!("{}", report::to_folded(log, demo::resolve));
            }
        }
    }
    Ok(())
}
