//! Randomized stress test: a long mixed sequence of allocate/release
//! operations against a bounded pool of live blocks, checking per-block
//! write-pattern integrity and overall heap validity as it goes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sbrk_heap::{ArenaBreak, Heap, HeapConfig};

struct LiveBlock {
    ptr: *mut u8,
    size: usize,
    pattern: u8,
}

#[test]
fn mixed_allocate_release_sequence_preserves_integrity() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut heap = Heap::with_config(
        ArenaBreak::new(16 << 20),
        HeapConfig {
            default_growth: 8192,
            ..HeapConfig::default()
        },
    );

    let mut rng = StdRng::seed_from_u64(0xC0FF_EE42);
    let mut live: Vec<LiveBlock> = Vec::new();

    for step in 0..1000 {
        let release_chosen = !live.is_empty() && (live.len() >= 100 || rng.gen_bool(0.4));

        if release_chosen {
            let index = rng.gen_range(0..live.len());
            let block = live.swap_remove(index);
            // Safety: `block.ptr` was returned by `heap.allocate` and never released.
            let observed = unsafe { std::slice::from_raw_parts(block.ptr, block.size) };
            assert!(
                observed.iter().all(|&b| b == block.pattern),
                "pattern corrupted before release at step {step}"
            );
            heap.release(block.ptr);
        } else {
            let size = rng.gen_range(1..=1000usize);
            let ptr = heap.allocate(size);
            assert!(!ptr.is_null(), "allocation of {size} bytes failed at step {step}");
            let pattern = rng.gen::<u8>();
            // Safety: `ptr` is a freshly allocated, exclusively-owned span of `size` bytes.
            unsafe {
                std::ptr::write_bytes(ptr, pattern, size);
            }
            live.push(LiveBlock { ptr, size, pattern });
        }

        if step % 100 == 0 {
            assert!(heap.validate(), "heap invalid at step {step}");
        }
    }

    for block in &live {
        // Safety: `block.ptr` was returned by `heap.allocate` and never released.
        let observed = unsafe { std::slice::from_raw_parts(block.ptr, block.size) };
        assert!(observed.iter().all(|&b| b == block.pattern));
    }

    assert!(heap.validate());

    for block in live {
        heap.release(block.ptr);
    }
    assert!(heap.validate());
}
