//! Integration tests for the pool allocator.

use proptest::prelude::*;
use region_alloc::{PoolAllocator, PoolConfig, PoolError, Region};

#[test]
fn exact_exhaustion_and_reuse() {
    let config = PoolConfig::production();
    let need = PoolAllocator::required_size(64, align_of::<usize>(), 10, &config).unwrap();
    let pool = PoolAllocator::with_config(Region::with_capacity(need), 64, config).unwrap();
    let n = pool.slot_count();
    assert!(n >= 10);

    let mut slots = Vec::new();
    for _ in 0..n {
        slots.push(pool.alloc().expect("pool has free slots"));
    }
    assert!(pool.alloc().is_none(), "exhausted pool must return null");

    let freed = slots.pop().unwrap();
    pool.free(freed).unwrap();
    let reused = pool.alloc().expect("one slot was freed");
    assert_eq!(reused, freed, "most recently freed slot is reused first");

    for slot in slots {
        pool.free(slot).unwrap();
    }
    assert_eq!(pool.used_slots(), 1);
    pool.free(reused).unwrap();
}

#[test]
fn double_free_via_bitmap_and_canary() {
    let pool =
        PoolAllocator::with_config(Region::with_capacity(2048), 32, PoolConfig::debug()).unwrap();

    let a = pool.alloc().unwrap();
    pool.free(a).unwrap();
    assert_eq!(pool.free(a), Err(PoolError::DoubleFree));

    // The error does not corrupt the list: the pool still cycles.
    let b = pool.alloc().unwrap();
    pool.free(b).unwrap();
}

#[test]
fn slot_writes_do_not_disturb_neighbors() {
    let pool =
        PoolAllocator::with_config(Region::with_capacity(4096), 48, PoolConfig::production())
            .unwrap();

    let mut slots = Vec::new();
    for i in 0..pool.slot_count() {
        let ptr = pool.alloc().unwrap();
        unsafe { std::ptr::write_bytes(ptr.as_ptr(), i as u8, 48) };
        slots.push((ptr, i as u8));
    }
    for (ptr, fill) in &slots {
        let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), 48) };
        assert!(bytes.iter().all(|&b| b == *fill));
    }
    for (ptr, _) in slots {
        pool.free(ptr).unwrap();
    }
}

#[test]
fn stack_buffer_backed_pool() {
    let mut backing = [0u8; 1024];
    let pool = PoolAllocator::with_config(Region::new(&mut backing), 16, PoolConfig::production())
        .unwrap();

    let a = pool.alloc().unwrap();
    assert!(pool.owns(a.as_ptr()));
    assert!(!pool.owns(std::ptr::dangling::<u8>()));
    pool.free(a).unwrap();
}

proptest! {
    #[test]
    fn bookkeeping_matches_a_model(ops in prop::collection::vec(any::<bool>(), 1..256)) {
        let pool = PoolAllocator::with_config(
            Region::with_capacity(8 * 1024),
            24,
            PoolConfig::debug(),
        ).unwrap();
        let n = pool.slot_count();
        let mut live: Vec<_> = Vec::new();

        for want_alloc in ops {
            if want_alloc {
                match pool.alloc() {
                    Some(ptr) => live.push(ptr),
                    None => prop_assert_eq!(live.len(), n),
                }
            } else if let Some(ptr) = live.pop() {
                pool.free(ptr).unwrap();
            }

            prop_assert_eq!(pool.used_slots(), live.len());
            prop_assert_eq!(pool.free_slots(), n - live.len());
        }

        let stats = pool.stats();
        prop_assert_eq!(stats.total_allocs - stats.total_frees, live.len() as u64);

        for ptr in live {
            pool.free(ptr).unwrap();
        }
    }
}
