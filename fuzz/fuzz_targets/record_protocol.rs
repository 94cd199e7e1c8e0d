#![no_main]

use libfuzzer_sys::fuzz_target;
use muestra::frames::FrameId;
use muestra::store::SampleStore;

fuzz_target!(|data: &[u8]| {
    // First two bytes size the store, the rest drives records in 3-byte
    // chunks: stack depth, frame seed, weight. The store must never panic
    // or exceed its capacity regardless of input.
    let [first, second, rest @ ..] = data else { return };
    let capacity = (*first as usize % 16) + 1;
    let max_depth = (*second as usize % 8) + 1;

    let mut store = SampleStore::new(capacity, max_depth);
    let mut frames = [FrameId::NONE; 16];

    for chunk in rest.chunks_exact(3) {
        let depth = chunk[0] as usize % (frames.len() + 1);
        for (i, slot) in frames[..depth].iter_mut().enumerate() {
            // Seeded from input but never one of the reserved values.
            *slot = FrameId::new((u64::from(chunk[1]) + i as u64) % 997 + 1);
        }
        store.record(&frames[..depth], u64::from(chunk[2]));
        assert!(store.len() <= capacity);
    }
});
