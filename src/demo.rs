//! Synthetic workload for the demo binary.
//!
//! Burns CPU inside a small, fixed call tree so that sampled profiles have
//! recognizable shape: a `main` frame over a pipeline that alternates
//! between parsing and two compression passes. Every iteration allocates a
//! randomly sized scratch buffer so the allocation sampler has something to
//! attribute, and every 32nd iteration simulates a collector pause.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::frames::{FrameId, ShadowStack};

/// Shadow stack depth used by the demo; deep enough that the workload
/// never overflows it.
pub const SHADOW_DEPTH: usize = 64;

const FRAME_NAMES: &[&str] = &[
    "main",
    "run_pipeline",
    "parse_input",
    "tokenize",
    "compress_block",
    "huffman_pass",
    "rle_pass",
    "checksum",
];

const MAIN: FrameId = FrameId::new(1);
const RUN_PIPELINE: FrameId = FrameId::new(2);
const PARSE_INPUT: FrameId = FrameId::new(3);
const TOKENIZE: FrameId = FrameId::new(4);
const COMPRESS_BLOCK: FrameId = FrameId::new(5);
const HUFFMAN_PASS: FrameId = FrameId::new(6);
const RLE_PASS: FrameId = FrameId::new(7);
const CHECKSUM: FrameId = FrameId::new(8);

/// Maps a demo frame back to its function name for report rendering.
pub fn resolve(frame: FrameId) -> String {
    if frame == FrameId::GC {
        return "gc".to_string();
    }
    let idx = frame.as_u64();
    if idx >= 1 && (idx as usize) <= FRAME_NAMES.len() {
        FRAME_NAMES[idx as usize - 1].to_string()
    } else {
        format!("frame_{idx}")
    }
}

/// Runs the workload for roughly `duration`, announcing every frame
/// transition on `stack` and reporting each allocation's size to `probe`.
///
/// Returns a checksum of the work done so the optimizer cannot delete it.
pub fn run(
    stack: &Arc<ShadowStack>,
    duration: Duration,
    mut probe: impl FnMut(usize),
) -> u64 {
    let mut rng = rand::thread_rng();
    let mut sink = 0u64;
    let mut iterations = 0u64;

    let _main = stack.enter(MAIN);
    let start = Instant::now();
    while start.elapsed() < duration {
        let _pipeline = stack.enter(RUN_PIPELINE);

        {
            let _parse = stack.enter(PARSE_INPUT);
            sink = sink.wrapping_add(spin(40_000));
            let _tok = stack.enter(TOKENIZE);
            sink = sink.wrapping_add(spin(80_000));
        }

        {
            let _block = stack.enter(COMPRESS_BLOCK);
            if iterations % 2 == 0 {
                let _pass = stack.enter(HUFFMAN_PASS);
                sink = sink.wrapping_add(spin(20_000));
            } else {
                let _pass = stack.enter(RLE_PASS);
                sink = sink.wrapping_add(spin(20_000));
            }
        }

        {
            let _sum = stack.enter(CHECKSUM);
            sink = sink.wrapping_add(spin(10_000));
        }

        let size = rng.gen_range(256..8192);
        let scratch = vec![0u8; size];
        sink = sink.wrapping_add(scratch[size / 2] as u64 + size as u64);
        probe(size);

        // Simulated collector pause: the reserved marker becomes the
        // innermost frame, so samples landing here count as collector time.
        if iterations % 32 == 31 {
            let _gc = stack.enter(FrameId::GC);
            sink = sink.wrapping_add(spin(30_000));
        }

        iterations = iterations.wrapping_add(1);
    }
    sink
}

/// Busy loop with a data dependency per round so it cannot be folded away.
fn spin(rounds: u64) -> u64 {
    let mut x = 0x9e37_79b9_7f4a_7c15u64;
    for _ in 0..rounds {
        x = x.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    }
    std::hint::black_box(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_frames() {
        assert_eq!(resolve(MAIN), "main");
        assert_eq!(resolve(CHECKSUM), "checksum");
    }

    #[test]
    fn test_resolve_gc_and_unknown() {
        assert_eq!(resolve(FrameId::GC), "gc");
        assert_eq!(resolve(FrameId::new(99)), "frame_99");
    }

    #[test]
    fn test_run_reports_allocations() {
        let stack = Arc::new(ShadowStack::new(SHADOW_DEPTH));
        let mut sizes = Vec::new();
        run(&stack, Duration::from_millis(20), |size| sizes.push(size));
        assert!(!sizes.is_empty());
        assert!(sizes.iter().all(|&size| (256..8192).contains(&size)));
    }

    #[test]
    fn test_run_leaves_stack_balanced() {
        let stack = Arc::new(ShadowStack::new(SHADOW_DEPTH));
        run(&stack, Duration::from_millis(5), |_| {});
        assert_eq!(stack.depth(), 0);
    }
}
