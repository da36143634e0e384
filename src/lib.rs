//! # region-alloc
//!
//! A family of four cooperating allocators over caller-supplied byte
//! regions, each tuned for a different allocation lifetime pattern:
//!
//! - [`ArenaAllocator`] — variable-size bump allocation; free everything
//!   at once or rewind to a marker; optional chained growth.
//! - [`StackAllocator`] — variable-size LIFO allocation with a hidden
//!   header word per allocation and checkpoint save/restore.
//! - [`PoolAllocator`] — fixed-size slots with an intrusive free list;
//!   O(1) alloc/free.
//! - [`SlabAllocator`] — several pool-like size classes sharing one
//!   region, dispatched by best fit.
//!
//! Each allocator is handed a [`Region`] at construction — a borrowed
//! `&mut [u8]` (static, stack or mapped memory) or an owned heap buffer
//! — and hands out pointers into it. The region is never freed by the
//! allocator unless it owns it, and no allocator performs I/O or touches
//! global state.
//!
//! ```
//! use region_alloc::{ArenaAllocator, Region};
//!
//! let mut backing = [0u8; 4096];
//! let arena = ArenaAllocator::new(Region::new(&mut backing));
//!
//! let nums = arena.alloc_slice_uninit::<u32>(100).unwrap();
//! assert_eq!(nums.len(), 100);
//!
//! let marker = arena.save();
//! let _scratch = arena.alloc(256).unwrap();
//! unsafe { arena.reset_to(marker) };    // scratch is gone, nums survive
//! ```
//!
//! # Thread safety
//!
//! The allocators are single-threaded resources: descriptors use
//! interior mutability (`Cell`/`RefCell`), so the types are `Send` but
//! not `Sync`. Sharing one instance across threads requires external
//! synchronization that provides exclusive access; concurrent calls on
//! the same instance are rejected at compile time rather than left
//! undefined.
//!
//! # Debug instrumentation
//!
//! Every allocator takes a config struct with `production()` and
//! `debug()` presets. Debug configurations add poison bytes, occupancy
//! bitmaps, free-slot canaries, per-allocation records and leak checks
//! without changing release-mode layout. With the `logging` feature the
//! diagnostics are emitted through `tracing`; without it the allocators
//! never log.

pub mod arena;
pub mod error;
pub mod pool;
pub mod region;
pub mod slab;
pub mod stack;
pub mod traits;
pub mod utils;

pub use arena::{
    AllocRecord, ArenaAllocator, ArenaConfig, ArenaMarker, ArenaScope, ArenaStats, GrowthConfig,
    MIN_BLOCK_SIZE,
};
pub use error::{AllocError, AllocResult, PoolError, SlabError};
pub use pool::{PoolAllocator, PoolConfig, PoolStats};
pub use region::Region;
pub use slab::{
    SLAB_ALIGN, SLAB_MAX_CLASSES, SlabAllocator, SlabClassStats, SlabConfig, SlabStats,
};
pub use stack::{
    STACK_MIN_ALIGN, StackAllocator, StackConfig, StackFrame, StackMarker, StackStats,
};
pub use traits::{MemoryUsage, RawAllocator, Resettable};
