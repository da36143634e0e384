//! Arena (linear/bump) allocator.
//!
//! The arena hands out variable-size blocks by advancing a watermark
//! through its region. Individual allocations are never freed; storage
//! is reclaimed wholesale with [`ArenaAllocator::reset`] or rewound to a
//! saved [`ArenaMarker`]. With a growth configuration the arena chains
//! additional heap blocks when the current one fills up, and pointers
//! handed out before a growth step stay valid because earlier blocks
//! never move.
//!
//! # Memory Layout
//! ```text
//! block 0: [alloc][pad][alloc][alloc.......][-- free --]
//!                                           ^ watermark
//! block 1 (growth): [alloc][....]           (chained mode only)
//! ```
//!
//! # Use Cases
//! - Per-frame or per-request scratch memory, released in one shot
//! - Parser/compiler ASTs with a single lifetime
//! - Anything "allocate many, free all at once"
//!
//! # Zero-size allocations
//! `alloc(0)` returns the current watermark pointer without advancing
//! it and without applying alignment. The pointer is addressable but
//! never dereferenceable; repeated zero-size allocations alias until a
//! non-zero allocation intervenes. Callers may rely on that identity.

use core::alloc::Layout;
use core::cell::{Cell, Ref, RefCell};
use core::panic::Location;
use core::ptr::NonNull;

use crate::error::AllocResult;
use crate::region::Region;
use crate::traits::{MemoryUsage, RawAllocator, Resettable, out_of_memory};
use crate::utils::{
    DEFAULT_ALIGN, POISON_FREED, POISON_UNINIT, calc_aligned_offset, is_power_of_two,
};

/// Smallest block the arena will request when growing.
pub const MIN_BLOCK_SIZE: usize = 4096;

/// Growth policy for chained arenas.
#[derive(Debug, Clone)]
pub struct GrowthConfig {
    /// Lower bound on the size of internally allocated blocks.
    pub min_block_size: usize,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self { min_block_size: MIN_BLOCK_SIZE }
    }
}

/// Configuration for [`ArenaAllocator`].
#[derive(Debug, Clone)]
pub struct ArenaConfig {
    /// Track allocation counters, peak usage and alignment waste.
    pub track_stats: bool,

    /// Byte written over freshly allocated bytes.
    pub alloc_pattern: Option<u8>,

    /// Byte written over rewound bytes (reset, reset_to, drop).
    pub dealloc_pattern: Option<u8>,

    /// Capacity of the per-allocation record ring. Records carry size
    /// and call site; once the buffer is full new allocations still
    /// succeed but are no longer recorded.
    pub max_tracked_allocs: usize,

    /// Name used in debug output.
    pub debug_label: Option<&'static str>,

    /// Enables block chaining. `None` means a full block fails the
    /// allocation instead of growing.
    pub growth: Option<GrowthConfig>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            track_stats: cfg!(debug_assertions),
            alloc_pattern: if cfg!(debug_assertions) { Some(POISON_UNINIT) } else { None },
            dealloc_pattern: if cfg!(debug_assertions) { Some(POISON_FREED) } else { None },
            max_tracked_allocs: 0,
            debug_label: None,
            growth: None,
        }
    }
}

impl ArenaConfig {
    /// No tracking, no patterns, no growth.
    pub fn production() -> Self {
        Self {
            track_stats: false,
            alloc_pattern: None,
            dealloc_pattern: None,
            max_tracked_allocs: 0,
            debug_label: None,
            growth: None,
        }
    }

    /// Full instrumentation with a 1024-entry record buffer.
    pub fn debug() -> Self {
        Self {
            track_stats: true,
            alloc_pattern: Some(POISON_UNINIT),
            dealloc_pattern: Some(POISON_FREED),
            max_tracked_allocs: 1024,
            debug_label: None,
            growth: None,
        }
    }
}

/// One recorded allocation (size, call site, ordinal).
#[derive(Debug, Clone, Copy)]
pub struct AllocRecord {
    /// Address handed to the caller.
    pub addr: usize,
    /// Requested size in bytes.
    pub size: usize,
    /// Size plus the alignment padding it forced.
    pub actual_size: usize,
    /// Call site of the allocation.
    pub location: &'static Location<'static>,
    /// Ordinal of the allocation since arena creation.
    pub sequence: usize,
}

/// Snapshot of the arena watermark, restorable with
/// [`ArenaAllocator::reset_to`].
///
/// A marker is only valid for the arena that produced it, and only until
/// that arena is fully reset; `reset_to` ignores markers from an earlier
/// generation.
#[derive(Debug, Clone, Copy)]
pub struct ArenaMarker {
    block: usize,
    offset: usize,
    generation: u32,
    alloc_count: usize,
    total_requested: usize,
}

/// Usage counters, filled from [`ArenaAllocator::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Total capacity across all blocks.
    pub capacity: usize,
    /// Bytes below the watermark across all blocks.
    pub used: usize,
    /// Bytes left in the active block.
    pub remaining: usize,
    /// Blocks in the chain (1 without growth).
    pub block_count: usize,
    /// Lifetime allocations; zero unless `track_stats` is on.
    pub alloc_count: usize,
    /// Sum of requested sizes; zero unless `track_stats` is on.
    pub total_requested: usize,
    /// Highest total usage seen; zero unless `track_stats` is on.
    pub peak_usage: usize,
    /// Bytes lost to alignment padding; zero unless `track_stats` is on.
    pub wasted_alignment: usize,
}

struct Block<'buf> {
    region: Region<'buf>,
    offset: Cell<usize>,
}

impl<'buf> Block<'buf> {
    fn new(region: Region<'buf>) -> Self {
        Self { region, offset: Cell::new(0) }
    }
}

/// Bump allocator over a caller-supplied region, with optional chained
/// growth.
pub struct ArenaAllocator<'buf> {
    head: Block<'buf>,
    /// Growth blocks; earlier entries never move or shrink while the
    /// arena lives, so pointers into them stay valid.
    tail: RefCell<Vec<Block<'static>>>,
    /// Index of the active block (0 = head).
    current: Cell<usize>,
    /// Bumped by full resets to invalidate older markers.
    generation: Cell<u32>,

    config: ArenaConfig,

    alloc_count: Cell<usize>,
    total_requested: Cell<usize>,
    peak_usage: Cell<usize>,
    wasted_alignment: Cell<usize>,
    records: RefCell<Vec<AllocRecord>>,
}

impl<'buf> ArenaAllocator<'buf> {
    /// Creates an arena over `region` with the default configuration.
    ///
    /// An empty region is valid; every non-zero allocation then fails.
    pub fn new(region: Region<'buf>) -> Self {
        Self::with_config(region, ArenaConfig::default())
    }

    /// Creates an arena with an explicit configuration.
    pub fn with_config(region: Region<'buf>, config: ArenaConfig) -> Self {
        Self {
            head: Block::new(region),
            tail: RefCell::new(Vec::new()),
            current: Cell::new(0),
            generation: Cell::new(0),
            config,
            alloc_count: Cell::new(0),
            total_requested: Cell::new(0),
            peak_usage: Cell::new(0),
            wasted_alignment: Cell::new(0),
            records: RefCell::new(Vec::new()),
        }
    }

    /// Creates an arena over an owned heap buffer.
    pub fn with_capacity(capacity: usize) -> ArenaAllocator<'static> {
        ArenaAllocator::new(Region::with_capacity(capacity))
    }

    /// Creates a growing arena whose first block is allocated
    /// internally. The growth policy from `config` is used, or the
    /// default one when `config.growth` is `None`.
    pub fn with_capacity_chained(
        initial_size: usize,
        mut config: ArenaConfig,
    ) -> ArenaAllocator<'static> {
        let growth = config.growth.take().unwrap_or_default();
        let first = initial_size.max(growth.min_block_size);
        config.growth = Some(growth);
        ArenaAllocator::with_config(Region::with_capacity(first), config)
    }

    fn chain_len(&self) -> usize {
        1 + self.tail.borrow().len()
    }

    fn with_block<R>(&self, index: usize, f: impl FnOnce(&Block<'buf>) -> R) -> R {
        if index == 0 {
            f(&self.head)
        } else {
            // Growth blocks are Block<'static>, which coerces to the
            // arena's shorter region lifetime.
            let tail = self.tail.borrow();
            f(&tail[index - 1])
        }
    }

    /// Allocates `size` bytes at [`DEFAULT_ALIGN`].
    #[track_caller]
    pub fn alloc(&self, size: usize) -> Option<NonNull<u8>> {
        self.alloc_aligned(size, DEFAULT_ALIGN)
    }

    /// Allocates `size` bytes at `align` (power of two).
    ///
    /// Fails without changing state when the request does not fit (and
    /// growth is off or the growth allocation itself fails).
    #[track_caller]
    pub fn alloc_aligned(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        if !is_power_of_two(align) {
            debug_assert!(false, "alignment must be a power of two");
            return None;
        }

        if size == 0 {
            return Some(
                self.with_block(self.current.get(), |b| b.region.offset_ptr(b.offset.get())),
            );
        }

        let caller = Location::caller();
        let current = self.current.get();
        if let Some(ptr) = self.try_alloc_in(current, size, align, caller) {
            return Some(ptr);
        }

        let growth = self.config.growth.as_ref()?;

        // Blocks kept alive by a reset are reused before growing again.
        for index in current + 1..self.chain_len() {
            self.current.set(index);
            if let Some(ptr) = self.try_alloc_in(index, size, align, caller) {
                return Some(ptr);
            }
        }

        let needed = size.checked_add(align - 1)?;
        let block = Block::new(Region::with_capacity(needed.max(growth.min_block_size)));
        self.tail.borrow_mut().push(block);
        let index = self.chain_len() - 1;
        self.current.set(index);
        self.try_alloc_in(index, size, align, caller)
    }

    /// Allocates zeroed memory; see [`Self::alloc`].
    #[track_caller]
    pub fn alloc_zeroed(&self, size: usize) -> Option<NonNull<u8>> {
        self.alloc_zeroed_aligned(size, DEFAULT_ALIGN)
    }

    /// Allocates zeroed memory at `align`; see [`Self::alloc_aligned`].
    #[track_caller]
    pub fn alloc_zeroed_aligned(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        let ptr = self.alloc_aligned(size, align)?;
        if size > 0 {
            // SAFETY: alloc_aligned returned `size` writable bytes.
            unsafe { core::ptr::write_bytes(ptr.as_ptr(), 0, size) };
        }
        Some(ptr)
    }

    /// Moves `value` into the arena.
    #[track_caller]
    pub fn alloc_value<T>(&self, value: T) -> Option<NonNull<T>> {
        if size_of::<T>() == 0 {
            // ZSTs need no storage but their pointer must be aligned.
            let ptr = NonNull::<T>::dangling();
            // SAFETY: zero-sized writes are valid for any aligned
            // pointer.
            unsafe { ptr.as_ptr().write(value) };
            return Some(ptr);
        }
        let ptr = self.alloc_aligned(size_of::<T>(), align_of::<T>())?.cast::<T>();
        // SAFETY: freshly allocated, aligned for T, sized for T.
        unsafe { ptr.as_ptr().write(value) };
        Some(ptr)
    }

    /// Allocates an uninitialized slice of `len` elements of `T`.
    #[track_caller]
    pub fn alloc_slice_uninit<T>(&self, len: usize) -> Option<NonNull<[T]>> {
        let bytes = len.checked_mul(size_of::<T>())?;
        if bytes == 0 {
            return Some(NonNull::slice_from_raw_parts(NonNull::dangling(), len));
        }
        let ptr = self.alloc_aligned(bytes, align_of::<T>())?.cast::<T>();
        Some(NonNull::slice_from_raw_parts(ptr, len))
    }

    fn try_alloc_in(
        &self,
        index: usize,
        size: usize,
        align: usize,
        caller: &'static Location<'static>,
    ) -> Option<NonNull<u8>> {
        let (ptr, padding) = self.with_block(index, |b| {
            // Alignment is decided on absolute addresses so borrowed
            // regions with arbitrary bases still satisfy the request.
            let base = b.region.base_addr();
            let fit =
                calc_aligned_offset(base + b.offset.get(), align, size, base + b.region.len())?;
            let offset = fit.offset - base;

            let ptr = b.region.offset_ptr(offset);
            b.offset.set(offset + size);
            if let Some(byte) = self.config.alloc_pattern {
                // SAFETY: the range was just claimed from free space.
                unsafe { b.region.fill(offset..offset + size, byte) };
            }
            Some((ptr, fit.padding))
        })?;

        self.note_alloc(ptr, size, padding, caller);
        Some(ptr)
    }

    fn note_alloc(
        &self,
        ptr: NonNull<u8>,
        size: usize,
        padding: usize,
        caller: &'static Location<'static>,
    ) {
        let sequence = self.alloc_count.get();
        self.alloc_count.set(sequence + 1);

        if self.config.track_stats {
            self.total_requested.set(self.total_requested.get() + size);
            self.wasted_alignment.set(self.wasted_alignment.get() + padding);
            let used = self.used();
            if used > self.peak_usage.get() {
                self.peak_usage.set(used);
            }
        }

        if self.config.max_tracked_allocs > 0 {
            let mut records = self.records.borrow_mut();
            if records.len() < self.config.max_tracked_allocs {
                records.push(AllocRecord {
                    addr: ptr.as_ptr() as usize,
                    size,
                    actual_size: size + padding,
                    location: caller,
                    sequence,
                });
            }
        }
    }

    /// Captures the current watermark (and active block).
    pub fn save(&self) -> ArenaMarker {
        ArenaMarker {
            block: self.current.get(),
            offset: self.with_block(self.current.get(), |b| b.offset.get()),
            generation: self.generation.get(),
            alloc_count: self.alloc_count.get(),
            total_requested: self.total_requested.get(),
        }
    }

    /// Rewinds to `marker`, releasing every allocation made after it.
    /// Growth blocks newer than the marker's block are freed. Markers
    /// from an earlier generation (before a full reset) are ignored.
    ///
    /// # Safety
    /// Pointers to allocations made after the marker become invalid and
    /// must not be dereferenced.
    pub unsafe fn reset_to(&self, marker: ArenaMarker) {
        if marker.generation != self.generation.get() {
            return;
        }
        if marker.block >= self.chain_len() {
            return;
        }

        self.tail.borrow_mut().truncate(marker.block);
        self.current.set(marker.block);

        self.with_block(marker.block, |b| {
            let old = b.offset.get();
            debug_assert!(marker.offset <= old, "marker is above the block watermark");
            if marker.offset < old {
                if let Some(byte) = self.config.dealloc_pattern {
                    // SAFETY: the range above the marker is being
                    // released.
                    unsafe { b.region.fill(marker.offset..old, byte) };
                }
            }
            b.offset.set(marker.offset);
        });

        self.alloc_count.set(marker.alloc_count);
        self.total_requested.set(marker.total_requested);

        let mut records = self.records.borrow_mut();
        while records.last().is_some_and(|r| r.sequence >= marker.alloc_count) {
            records.pop();
        }
    }

    /// Rewinds every block to empty, keeping growth blocks allocated
    /// for reuse, and invalidates all outstanding markers.
    ///
    /// # Safety
    /// Every pointer previously returned by this arena becomes invalid.
    pub unsafe fn reset(&self) {
        for index in 0..self.chain_len() {
            self.with_block(index, |b| {
                let old = b.offset.get();
                if old > 0 {
                    if let Some(byte) = self.config.dealloc_pattern {
                        // SAFETY: every allocation is being released.
                        unsafe { b.region.fill(0..old, byte) };
                    }
                }
                b.offset.set(0);
            });
        }
        self.current.set(0);
        self.generation.set(self.generation.get().wrapping_add(1));
        self.records.borrow_mut().clear();
    }

    /// Opens a RAII scope that rewinds to the current watermark on drop,
    /// on every exit path.
    pub fn scope(&self) -> ArenaScope<'_, 'buf> {
        ArenaScope { arena: self, marker: self.save() }
    }

    /// Total capacity across all blocks.
    pub fn capacity(&self) -> usize {
        let mut total = self.head.region.len();
        for block in self.tail.borrow().iter() {
            total = total.saturating_add(block.region.len());
        }
        total
    }

    /// Bytes below the watermark across all blocks.
    pub fn used(&self) -> usize {
        let mut total = self.head.offset.get();
        for block in self.tail.borrow().iter() {
            total = total.saturating_add(block.offset.get());
        }
        total
    }

    /// Bytes left in the active block. Growth can serve more than this.
    pub fn remaining(&self) -> usize {
        self.with_block(self.current.get(), |b| b.region.len() - b.offset.get())
    }

    /// Number of blocks in the chain.
    pub fn block_count(&self) -> usize {
        self.chain_len()
    }

    /// Whether `ptr` points into a currently live allocation.
    pub fn owns(&self, ptr: *const u8) -> bool {
        let in_block = |b: &Block<'_>| match b.region.offset_of(ptr) {
            Some(offset) => offset < b.offset.get(),
            None => false,
        };
        if in_block(&self.head) {
            return true;
        }
        self.tail.borrow().iter().any(|b| in_block(b))
    }

    /// Cheap structural validation: block offsets within capacity and a
    /// coherent active-block index.
    pub fn check_integrity(&self) -> bool {
        if self.current.get() >= self.chain_len() {
            return false;
        }
        let block_ok = |b: &Block<'_>| b.offset.get() <= b.region.len();
        block_ok(&self.head) && self.tail.borrow().iter().all(|b| block_ok(b))
    }

    /// Whether the arena is in a usable state.
    pub fn is_valid(&self) -> bool {
        self.check_integrity()
    }

    /// Usage counters.
    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            capacity: self.capacity(),
            used: self.used(),
            remaining: self.remaining(),
            block_count: self.block_count(),
            alloc_count: if self.config.track_stats { self.alloc_count.get() } else { 0 },
            total_requested: self.total_requested.get(),
            peak_usage: self.peak_usage.get(),
            wasted_alignment: self.wasted_alignment.get(),
        }
    }

    /// Recorded allocations, oldest first. Empty unless
    /// `max_tracked_allocs` is non-zero.
    pub fn records(&self) -> Ref<'_, [AllocRecord]> {
        Ref::map(self.records.borrow(), Vec::as_slice)
    }

    /// Emits the current stats (and the most recent records) through
    /// `tracing`.
    #[cfg(feature = "logging")]
    pub fn log_stats(&self) {
        let stats = self.stats();
        tracing::debug!(
            label = self.config.debug_label.unwrap_or("arena"),
            capacity = stats.capacity,
            used = stats.used,
            remaining = stats.remaining,
            blocks = stats.block_count,
            allocs = stats.alloc_count,
            requested = stats.total_requested,
            peak = stats.peak_usage,
            wasted = stats.wasted_alignment,
            "arena stats"
        );
        let records = self.records();
        for record in records.iter().rev().take(10) {
            tracing::debug!(
                seq = record.sequence,
                size = record.size,
                at = %record.location,
                "arena allocation"
            );
        }
    }
}

unsafe impl RawAllocator for ArenaAllocator<'_> {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        if layout.size() == 0 {
            return Ok(NonNull::slice_from_raw_parts(NonNull::dangling(), 0));
        }
        self.alloc_aligned(layout.size(), layout.align())
            .map(|ptr| NonNull::slice_from_raw_parts(ptr, layout.size()))
            .ok_or_else(|| out_of_memory(layout))
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {
        // Individual frees are not part of the arena discipline; memory
        // comes back via reset/reset_to.
    }
}

impl MemoryUsage for ArenaAllocator<'_> {
    fn used_memory(&self) -> usize {
        self.used()
    }

    fn available_memory(&self) -> Option<usize> {
        Some(self.capacity() - self.used())
    }

    fn total_memory(&self) -> Option<usize> {
        Some(self.capacity())
    }
}

impl Resettable for ArenaAllocator<'_> {
    unsafe fn reset(&self) {
        // SAFETY: forwarded contract.
        unsafe { ArenaAllocator::reset(self) };
    }
}

unsafe impl Send for ArenaAllocator<'_> {}

impl core::fmt::Debug for ArenaAllocator<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ArenaAllocator")
            .field("capacity", &self.capacity())
            .field("used", &self.used())
            .field("blocks", &self.block_count())
            .finish_non_exhaustive()
    }
}

impl Drop for ArenaAllocator<'_> {
    fn drop(&mut self) {
        if let Some(byte) = self.config.dealloc_pattern {
            let poison = |b: &Block<'_>| {
                let used = b.offset.get();
                if used > 0 {
                    // SAFETY: the arena is being destroyed; no live
                    // allocation may be used afterwards.
                    unsafe { b.region.fill(0..used, byte) };
                }
            };
            poison(&self.head);
            for block in self.tail.borrow().iter() {
                poison(block);
            }
        }
    }
}

/// RAII rollback scope created by [`ArenaAllocator::scope`].
pub struct ArenaScope<'a, 'buf> {
    arena: &'a ArenaAllocator<'buf>,
    marker: ArenaMarker,
}

impl<'a, 'buf> ArenaScope<'a, 'buf> {
    /// The arena this scope rewinds.
    pub fn allocator(&self) -> &'a ArenaAllocator<'buf> {
        self.arena
    }

    /// Rewinds eagerly by consuming the scope.
    pub fn end(self) {
        drop(self);
    }
}

impl Drop for ArenaScope<'_, '_> {
    fn drop(&mut self) {
        // SAFETY: allocations made inside the scope are scoped to it by
        // convention; the caller must not keep pointers past the scope.
        unsafe { self.arena.reset_to(self.marker) };
    }
}
