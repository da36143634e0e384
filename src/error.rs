//! Error types for allocation and initialization failures.
//!
//! Capacity failures surface as [`AllocError::OutOfMemory`] (or as `None`
//! from the inherent `alloc` methods, which are the thin path). Pool and
//! slab initialization and free paths return their own discrete enums so
//! callers can react to individual contract violations.

use thiserror::Error;

/// Result alias for [`RawAllocator`](crate::traits::RawAllocator)
/// operations.
pub type AllocResult<T> = Result<T, AllocError>;

/// Failure of an allocation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum AllocError {
    /// The request does not fit in the remaining capacity. State is
    /// unchanged.
    #[error("out of memory: {size} bytes with alignment {align} do not fit")]
    OutOfMemory {
        /// Requested size in bytes.
        size: usize,
        /// Requested alignment.
        align: usize,
    },

    /// A size computation overflowed `usize`.
    #[error("size calculation overflowed")]
    SizeOverflow,

    /// The requested alignment is not a power of two.
    #[error("alignment {0} is not a power of two")]
    InvalidAlignment(usize),

    /// The layout cannot be served by this allocator (e.g. a pool asked
    /// for more than its slot size).
    #[error("layout not representable by this allocator")]
    InvalidLayout,
}

/// Errors reported by [`PoolAllocator`](crate::pool::PoolAllocator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum PoolError {
    /// The region cannot hold a single slot (plus the debug bitmap when
    /// debug checks are enabled).
    #[error("buffer too small for even one slot")]
    BufferTooSmall,

    /// The requested slot size is zero.
    #[error("slot size is invalid (zero)")]
    InvalidSlotSize,

    /// The slot alignment is not a power of two.
    #[error("slot alignment is not a power of two")]
    InvalidAlignment,

    /// The freed pointer is outside the pool or not on a slot boundary.
    #[error("pointer not owned by pool")]
    InvalidPointer,

    /// The slot is already on the free list.
    #[error("double free detected")]
    DoubleFree,
}

/// Errors reported by [`SlabAllocator`](crate::slab::SlabAllocator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum SlabError {
    /// No size classes were supplied.
    #[error("no size classes supplied")]
    NoClasses,

    /// A size class of zero bytes was supplied.
    #[error("size class is zero")]
    ZeroClassSize,

    /// More classes than [`SLAB_MAX_CLASSES`](crate::slab::SLAB_MAX_CLASSES).
    #[error("too many size classes")]
    TooManyClasses,

    /// Two classes round to the same effective slot size.
    #[error("duplicate size class after alignment")]
    DuplicateClassSize,

    /// The region cannot give every class at least one slot.
    #[error("buffer too small for requested classes")]
    BufferTooSmall,

    /// The freed pointer is not inside any class region.
    #[error("pointer not owned by slab")]
    ForeignPointer,

    /// The freed pointer is inside a class region but not on a slot
    /// boundary.
    #[error("pointer does not sit on a slot boundary")]
    MisalignedPointer,

    /// The slot is already on its class free list.
    #[error("double free detected")]
    DoubleFree,
}
