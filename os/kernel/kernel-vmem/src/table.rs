use crate::Pte;
use crate::pte::ENTRIES_PER_TABLE;
use kernel_memory_addresses::{DirectMap, PhysicalAddress};

/// One table frame, read and written through the direct map.
///
/// Accesses are volatile: the hardware walker reads the same memory and may
/// set accessed/dirty bits concurrently.
#[derive(Copy, Clone)]
pub(crate) struct TableFrame {
    paddr: PhysicalAddress,
    entries: *mut Pte,
}

impl TableFrame {
    /// # Safety
    /// `paddr` must be a table frame owned by the calling page table and
    /// reachable read-write through `map` for as long as the view is used.
    ///
    /// # Panics
    /// If `map` does not cover `paddr`.
    pub(crate) unsafe fn new(map: &DirectMap, paddr: PhysicalAddress) -> Self {
        Self {
            paddr,
            entries: map.as_mut_ptr(paddr),
        }
    }

    pub(crate) const fn paddr(self) -> PhysicalAddress {
        self.paddr
    }

    pub(crate) fn get(self, index: usize) -> Pte {
        assert!(index < ENTRIES_PER_TABLE);
        // SAFETY: in bounds of the 4 KiB frame promised by `new`.
        unsafe { self.entries.add(index).read_volatile() }
    }

    pub(crate) fn set(self, index: usize, pte: Pte) {
        assert!(index < ENTRIES_PER_TABLE);
        // SAFETY: in bounds of the 4 KiB frame promised by `new`.
        unsafe { self.entries.add(index).write_volatile(pte) }
    }

    pub(crate) fn zero(self) {
        for i in 0..ENTRIES_PER_TABLE {
            self.set(i, Pte::INVALID);
        }
    }

    pub(crate) fn is_empty(self) -> bool {
        (0..ENTRIES_PER_TABLE).all(|i| self.get(i).is_invalid())
    }
}
