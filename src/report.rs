//! Profile log export: text summaries, collapsed stacks and JSON.

use std::fmt::Write as _;

use serde::Serialize;

use crate::frames::FrameId;
use crate::log::SampleLog;

/// One stack and its accumulated weight, frames outermost first.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub frames: Vec<String>,
    pub weight: u64,
}

/// A rendered profile log, heaviest stacks first.
#[derive(Debug, Clone, Serialize)]
pub struct LogReport {
    pub total_weight: u64,
    pub entries: Vec<LogEntry>,
}

/// Top-level document for machine-readable output.
#[derive(Debug, Serialize)]
pub struct ProfileReport {
    pub cpu: Option<LogReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<LogReport>,
}

/// Render `log` with frame names supplied by `resolve`.
///
/// Entries are sorted heaviest first, ties broken on the frame names, so
/// output is stable across runs. The resolver is also handed the
/// collection sentinel [`FrameId::GC`].
pub fn build_report<F>(log: &SampleLog, resolve: F) -> LogReport
where
    F: Fn(FrameId) -> String,
{
    let mut entries: Vec<LogEntry> = log
        .iter()
        .map(|(stack, weight)| LogEntry {
            frames: stack.iter().rev().map(|&frame| resolve(frame)).collect(),
            weight,
        })
        .collect();
    entries.sort_by(|a, b| {
        b.weight
            .cmp(&a.weight)
            .then_with(|| a.frames.cmp(&b.frames))
    });
    LogReport {
        total_weight: log.total_weight(),
        entries,
    }
}

/// Collapsed-stack lines (`outer;inner weight`), the common flamegraph
/// input format.
pub fn to_folded<F>(log: &SampleLog, resolve: F) -> String
where
    F: Fn(FrameId) -> String,
{
    let report = build_report(log, resolve);
    let mut out = String::new();
    for entry in &report.entries {
        let _ = writeln!(out, "{} {}", joined_frames(entry), entry.weight);
    }
    out
}

/// Plain-text summary table.
pub fn render_text<F>(log: &SampleLog, resolve: F) -> String
where
    F: Fn(FrameId) -> String,
{
    let report = build_report(log, resolve);
    let mut out = String::new();
    let _ = writeln!(out, "{:>12}  stack", "weight");
    for entry in &report.entries {
        let _ = writeln!(out, "{:>12}  {}", entry.weight, joined_frames(entry));
    }
    let _ = writeln!(out, "{:>12}  total", report.total_weight);
    out
}

/// Pretty-printed JSON for a single log.
pub fn to_json<F>(log: &SampleLog, resolve: F) -> serde_json::Result<String>
where
    F: Fn(FrameId) -> String,
{
    serde_json::to_string_pretty(&build_report(log, resolve))
}

fn joined_frames(entry: &LogEntry) -> String {
    if entry.frames.is_empty() {
        "unattributed".to_string()
    } else {
        entry.frames.join(";")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProfilerConfig;
    use crate::cpu::CpuSampler;
    use std::time::Duration;

    fn frame(raw: u64) -> FrameId {
        FrameId::new(raw)
    }

    fn resolve(frame: FrameId) -> String {
        if frame == FrameId::GC {
            "gc".to_string()
        } else {
            format!("f{}", frame.as_u64())
        }
    }

    fn sample_log() -> SampleLog {
        let mut cpu = CpuSampler::new(ProfilerConfig::new(16, 4));
        cpu.start(Duration::from_millis(10)).unwrap();
        // Innermost first: f2 called by f1.
        cpu.on_tick(&[frame(2), frame(1)][..]);
        cpu.on_tick(&[frame(2), frame(1)][..]);
        cpu.on_tick(&[frame(3)][..]);
        cpu.on_tick(&[FrameId::GC][..]);
        cpu.read_log().unwrap()
    }

    #[test]
    fn test_report_orders_heaviest_first_outermost_leading() {
        let report = build_report(&sample_log(), resolve);
        assert_eq!(report.total_weight, 40);
        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.entries[0].frames, vec!["f1", "f2"]);
        assert_eq!(report.entries[0].weight, 20);
    }

    #[test]
    fn test_folded_lines() {
        let folded = to_folded(&sample_log(), resolve);
        let lines: Vec<&str> = folded.lines().collect();
        assert_eq!(lines[0], "f1;f2 20");
        assert!(lines.contains(&"f3 10"));
        assert!(lines.contains(&"gc 10"));
    }

    #[test]
    fn test_text_summary_has_totals() {
        let text = render_text(&sample_log(), resolve);
        assert!(text.contains("f1;f2"));
        assert!(text.contains("total"));
        assert!(text.contains("40"));
    }

    #[test]
    fn test_json_round_trips_through_serde() {
        let json = to_json(&sample_log(), resolve).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["total_weight"], 40);
        assert_eq!(value["entries"][0]["frames"][0], "f1");
        assert_eq!(value["entries"][0]["weight"], 20);
    }

    #[test]
    fn test_empty_stack_renders_as_unattributed() {
        let mut cpu = CpuSampler::new(ProfilerConfig::new(16, 4));
        cpu.start(Duration::from_millis(10)).unwrap();
        let empty: [FrameId; 0] = [];
        cpu.on_tick(&empty[..]);
        let log = cpu.read_log().unwrap();

        let folded = to_folded(&log, resolve);
        assert!(folded.contains("unattributed 10"));
    }
}
