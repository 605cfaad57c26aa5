use kernel_memory_addresses::{DirectMap, PhysicalAddress, PhysicalRange};

/// Errors reported by a [`FrameAlloc`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameAllocError {
    #[error("out of physical memory")]
    OutOfMemory,
    #[error("frames at {0} are not managed by this allocator")]
    OutOfRange(PhysicalAddress),
    #[error("frame at {0} is not allocated")]
    NotAllocated(PhysicalAddress),
    #[error("invalid frame count or unaligned address")]
    InvalidArgument,
    #[error("region too small to hold its own metadata")]
    RegionTooSmall,
}

/// Source of physical 4 KiB frames.
///
/// Methods take `&self`: implementations serialize internally so that several
/// page tables can share one pool.
pub trait FrameAlloc {
    /// Allocate `frames` physically contiguous frames.
    ///
    /// When `frames` is a power of two the block is aligned to its own size.
    ///
    /// # Errors
    /// [`FrameAllocError::OutOfMemory`] if no large enough block is free,
    /// [`FrameAllocError::InvalidArgument`] for `frames == 0`.
    fn alloc(&self, frames: usize) -> Result<PhysicalAddress, FrameAllocError>;

    /// Return `frames` frames starting at `paddr`.
    ///
    /// Any sub-range of an earlier allocation may be returned on its own.
    ///
    /// # Errors
    /// [`FrameAllocError::OutOfRange`] if the range is not managed here,
    /// [`FrameAllocError::NotAllocated`] if any frame in it is already free.
    fn free(&self, paddr: PhysicalAddress, frames: usize) -> Result<(), FrameAllocError>;

    /// Register the physical region `[start, start + len)`.
    ///
    /// # Errors
    /// [`FrameAllocError::RegionTooSmall`] if nothing is left after the
    /// bookkeeping, [`FrameAllocError::InvalidArgument`] if the region overlaps
    /// memory that is already registered.
    fn add_memory(&self, start: PhysicalAddress, len: u64) -> Result<(), FrameAllocError>;

    /// Bytes currently available for allocation.
    fn free_bytes(&self) -> u64;

    /// Bytes under management, excluding bookkeeping.
    fn total_bytes(&self) -> u64;

    /// Lowest to highest physical address touched by this allocator,
    /// bookkeeping included. `None` before any memory is registered.
    fn memory_span(&self) -> Option<PhysicalRange>;

    /// Switch the window used to reach the bookkeeping, e.g. from the boot
    /// identity map to the kernel's direct map.
    fn set_direct_map(&self, map: DirectMap);
}
