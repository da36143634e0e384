//! Allocator traits shared by the four allocators.
//!
//! [`RawAllocator`] is the uniform, `Layout`-driven seam; the inherent
//! methods on each allocator are the primary API and expose the
//! allocator-specific operations (markers, slots, classes).

use core::alloc::Layout;
use core::ptr::{self, NonNull};

use crate::error::{AllocError, AllocResult};

/// Raw allocation interface over a managed byte region.
///
/// # Safety
/// Implementors must return pointers that are valid for reads and writes
/// of `layout.size()` bytes, aligned to `layout.align()`, and disjoint
/// from every other live allocation of the same allocator. `deallocate`
/// must only be called with a pointer previously returned by `allocate`
/// on the same instance, with the same layout, and must respect the
/// allocator's reclamation discipline (LIFO order for the stack; the
/// arena treats it as a no-op).
pub unsafe trait RawAllocator {
    /// Allocates memory for `layout`.
    ///
    /// Zero-sized layouts succeed with a dangling, non-dereferenceable
    /// pointer.
    ///
    /// # Safety
    /// The returned memory is uninitialized (or poisoned, in debug
    /// configurations) and must be initialized before reading.
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>>;

    /// Releases an allocation according to the allocator's discipline.
    ///
    /// # Safety
    /// `ptr` must come from `allocate` on this instance with this
    /// `layout`, must not have been released already, and must satisfy
    /// the allocator's ordering contract.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Allocates zeroed memory for `layout`.
    ///
    /// # Safety
    /// Same contract as [`Self::allocate`].
    unsafe fn allocate_zeroed(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        let block = unsafe { self.allocate(layout)? };
        if layout.size() > 0 {
            // SAFETY: allocate returned layout.size() writable bytes.
            unsafe { ptr::write_bytes(block.cast::<u8>().as_ptr(), 0, layout.size()) };
        }
        Ok(block)
    }
}

/// Memory usage queries.
pub trait MemoryUsage {
    /// Bytes (or slots, scaled to bytes) currently allocated.
    fn used_memory(&self) -> usize;

    /// Bytes still available, when the allocator can tell.
    fn available_memory(&self) -> Option<usize>;

    /// Total managed capacity, when bounded.
    fn total_memory(&self) -> Option<usize>;
}

/// Bulk release of every outstanding allocation.
pub trait Resettable {
    /// Resets the allocator to its freshly initialized state.
    ///
    /// # Safety
    /// Every pointer previously returned by this allocator becomes
    /// invalid and must not be dereferenced afterwards.
    unsafe fn reset(&self);

    /// Whether reset is supported.
    fn can_reset(&self) -> bool {
        true
    }
}

/// Converts an inherent `Option` allocation result into the trait-level
/// error.
#[inline]
pub(crate) fn out_of_memory(layout: Layout) -> AllocError {
    AllocError::OutOfMemory { size: layout.size(), align: layout.align() }
}
