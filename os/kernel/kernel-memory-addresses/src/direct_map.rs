use crate::{PhysicalAddress, PhysicalRange, VirtualAddress};

/// Linear window of physical memory in the virtual address space.
///
/// Translates `vaddr = paddr + offset` for every physical address in
/// [`covered`](Self::covered), without consulting any page table. The walker
/// uses it to read and write the *contents* of page-table frames and the frame
/// allocator uses it to reach its metadata.
///
/// At earliest boot the boot loader's identity map plays this role
/// ([`DirectMap::identity`]); once the kernel's own table is active the window
/// moves to its fixed base ([`DirectMap::new`]).
///
/// Arithmetic is wrapping so that an offset can also express a window that
/// sits *below* the physical addresses it covers.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DirectMap {
    offset: u64,
    covered: PhysicalRange,
}

impl DirectMap {
    /// Identity window (`vaddr == paddr`) over `covered`.
    #[inline]
    #[must_use]
    pub const fn identity(covered: PhysicalRange) -> Self {
        Self::with_offset(0, covered)
    }

    /// Window that places physical address `0` at `base`.
    #[inline]
    #[must_use]
    pub const fn new(base: VirtualAddress, covered: PhysicalRange) -> Self {
        Self::with_offset(base.as_u64(), covered)
    }

    /// Window with an explicit additive `offset`.
    #[inline]
    #[must_use]
    pub const fn with_offset(offset: u64, covered: PhysicalRange) -> Self {
        Self { offset, covered }
    }

    #[inline]
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    #[inline]
    #[must_use]
    pub const fn covered(&self) -> PhysicalRange {
        self.covered
    }

    #[inline]
    #[must_use]
    pub const fn covers(&self, pa: PhysicalAddress) -> bool {
        self.covered.contains(pa)
    }

    #[inline]
    #[must_use]
    pub const fn covers_range(&self, pa: PhysicalAddress, len: u64) -> bool {
        self.covered.contains_range(pa, len)
    }

    /// Translate a physical address into the window.
    ///
    /// # Panics
    /// If `pa` is outside the covered range.
    #[inline]
    #[must_use]
    pub const fn to_virt(&self, pa: PhysicalAddress) -> VirtualAddress {
        assert!(self.covers(pa), "physical address outside the direct map");
        VirtualAddress::new(pa.as_u64().wrapping_add(self.offset))
    }

    #[inline]
    #[must_use]
    pub const fn try_to_virt(&self, pa: PhysicalAddress) -> Option<VirtualAddress> {
        if self.covers(pa) {
            Some(VirtualAddress::new(pa.as_u64().wrapping_add(self.offset)))
        } else {
            None
        }
    }

    /// Translate a window address back to the physical address it aliases.
    ///
    /// # Panics
    /// If `va` does not lie inside the window.
    #[inline]
    #[must_use]
    pub const fn to_phys(&self, va: VirtualAddress) -> PhysicalAddress {
        let pa = PhysicalAddress::new(va.as_u64().wrapping_sub(self.offset));
        assert!(self.covers(pa), "virtual address outside the direct map");
        pa
    }

    /// Pointer to the first byte of `pa` through the window.
    ///
    /// # Panics
    /// If `pa` is outside the covered range.
    #[inline]
    #[must_use]
    pub const fn as_mut_ptr<T>(&self, pa: PhysicalAddress) -> *mut T {
        self.to_virt(pa).as_mut_ptr()
    }
}
