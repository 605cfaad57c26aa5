//! # TLB maintenance after table changes

use kernel_memory_addresses::{FRAME_SIZE, VirtualAddress};

/// Above this many pages a full local flush is cheaper than one
/// invalidation per page.
const FLUSH_ALL_THRESHOLD: usize = 64;

/// Pages whose translations changed and may still be cached.
///
/// Returned by operations that remove or weaken mappings. The caller decides
/// when (and on which CPUs) to flush; dropping the token without doing either
/// is a bug the compiler points out.
#[must_use = "stale translations stay cached until the range is flushed"]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TlbFlush {
    start: VirtualAddress,
    pages: usize,
}

impl TlbFlush {
    pub(crate) const fn new(start: VirtualAddress, pages: usize) -> Self {
        Self { start, pages }
    }

    #[inline]
    #[must_use]
    pub const fn start(&self) -> VirtualAddress {
        self.start
    }

    #[inline]
    #[must_use]
    pub const fn pages(&self) -> usize {
        self.pages
    }

    /// Invalidate the range on the executing CPU.
    ///
    /// # Safety
    /// Privileged; must run in kernel mode on a CPU using the table the
    /// range was changed in.
    pub unsafe fn flush_local(self) {
        if self.pages > FLUSH_ALL_THRESHOLD {
            unsafe { kernel_registers::tlb::invalidate_all() }
            return;
        }
        for page in 0..self.pages as u64 {
            unsafe { kernel_registers::tlb::invalidate_page(self.start + page * FRAME_SIZE) }
        }
    }

    /// Drop the token without flushing, e.g. because the table is not active
    /// anywhere.
    pub const fn ignore(self) {}
}
