//! Integration tests for the arena allocator.

use proptest::prelude::*;
use region_alloc::{
    ArenaAllocator, ArenaConfig, GrowthConfig, MemoryUsage, RawAllocator, Region,
};
use std::alloc::Layout;

#[test]
fn basic_usage_over_a_stack_buffer() {
    let mut backing = [0u8; 4096];
    let arena = ArenaAllocator::new(Region::new(&mut backing));

    let p1 = arena.alloc(10 * size_of::<i32>()).expect("first allocation");
    let p2 = arena.alloc(64).expect("second allocation");

    unsafe {
        std::ptr::write_bytes(p1.as_ptr(), 0xAA, 10 * size_of::<i32>());
        std::ptr::write_bytes(p2.as_ptr(), 0xBB, 64);
    }

    assert!(arena.used() >= 10 * size_of::<i32>() + 64);

    // No overlap: both patterns intact.
    unsafe {
        let a = std::slice::from_raw_parts(p1.as_ptr(), 10 * size_of::<i32>());
        let b = std::slice::from_raw_parts(p2.as_ptr(), 64);
        assert!(a.iter().all(|&x| x == 0xAA));
        assert!(b.iter().all(|&x| x == 0xBB));
    }

    unsafe { region_alloc::Resettable::reset(&arena) };
    assert_eq!(arena.used(), 0);
}

#[test]
fn save_restore_preserves_earlier_contents() {
    let arena = ArenaAllocator::with_capacity(4096);

    let kept = arena.alloc(256).expect("kept allocation");
    unsafe { std::ptr::write_bytes(kept.as_ptr(), b'A', 256) };

    let marker = arena.save();
    let used_at_save = arena.used();

    let _scratch = arena.alloc(1024).expect("scratch allocation");
    unsafe { arena.reset_to(marker) };

    assert_eq!(arena.used(), used_at_save);
    let bytes = unsafe { std::slice::from_raw_parts(kept.as_ptr(), 256) };
    assert!(bytes.iter().all(|&b| b == b'A'));
}

#[test]
fn identical_request_pattern_succeeds_after_reset() {
    let arena = ArenaAllocator::with_capacity(2048);
    let pattern = [100usize, 7, 512, 64, 1];

    for &size in &pattern {
        assert!(arena.alloc(size).is_some());
    }
    unsafe { region_alloc::Resettable::reset(&arena) };
    assert_eq!(arena.used(), 0);
    for &size in &pattern {
        assert!(arena.alloc(size).is_some());
    }
}

#[test]
fn growth_keeps_old_blocks_readable() {
    let mut config = ArenaConfig::production();
    config.growth = Some(GrowthConfig { min_block_size: 512 });
    let arena = ArenaAllocator::with_capacity_chained(512, config);

    let mut allocations = Vec::new();
    for fill in 0u8..32 {
        let ptr = arena.alloc(400).expect("growing arena never fails here");
        unsafe { std::ptr::write_bytes(ptr.as_ptr(), fill, 400) };
        allocations.push((ptr, fill));
    }
    assert!(arena.block_count() > 1);

    for (ptr, fill) in allocations {
        let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), 400) };
        assert!(bytes.iter().all(|&b| b == fill));
    }
}

#[test]
fn used_plus_remaining_equals_capacity_single_block() {
    let arena = ArenaAllocator::with_capacity(1024);
    let _ = arena.alloc(100).unwrap();
    let _ = arena.alloc_aligned(5, 64).unwrap();
    assert_eq!(arena.used() + arena.remaining(), arena.capacity());
}

#[test]
fn raw_allocator_trait_round_trip() {
    let arena = ArenaAllocator::with_capacity(4096);
    unsafe {
        let layout = Layout::from_size_align(48, 16).unwrap();
        let block = arena.allocate(layout).expect("allocate");
        assert_eq!(block.len(), 48);
        assert_eq!(block.cast::<u8>().as_ptr() as usize % 16, 0);

        // Arena deallocate is a no-op; the watermark stays put.
        let used = arena.used_memory();
        arena.deallocate(block.cast(), layout);
        assert_eq!(arena.used_memory(), used);

        let zeroed = arena.allocate_zeroed(layout).expect("allocate_zeroed");
        let bytes = std::slice::from_raw_parts(zeroed.cast::<u8>().as_ptr(), 48);
        assert!(bytes.iter().all(|&b| b == 0));
    }
}

proptest! {
    #[test]
    fn allocations_are_disjoint_and_aligned(
        requests in prop::collection::vec((1usize..512, 0u32..7), 1..128),
    ) {
        let arena = ArenaAllocator::with_capacity(64 * 1024);
        let mut ranges: Vec<(usize, usize)> = Vec::new();

        for (size, align_pow) in requests {
            let align = 1usize << align_pow;
            if let Some(ptr) = arena.alloc_aligned(size, align) {
                let addr = ptr.as_ptr() as usize;
                prop_assert_eq!(addr % align, 0);
                for &(start, len) in &ranges {
                    prop_assert!(addr + size <= start || addr >= start + len);
                }
                ranges.push((addr, size));
            }
        }
    }

    #[test]
    fn marker_rewind_restores_used(
        before in prop::collection::vec(1usize..128, 0..16),
        after in prop::collection::vec(1usize..128, 1..16),
    ) {
        let arena = ArenaAllocator::with_capacity(32 * 1024);
        for size in before {
            let _ = arena.alloc(size);
        }
        let marker = arena.save();
        let used = arena.used();
        for size in after {
            let _ = arena.alloc(size);
        }
        unsafe { arena.reset_to(marker) };
        prop_assert_eq!(arena.used(), used);
    }
}
