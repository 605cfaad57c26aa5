//! # Boot Memory Map

/// Classification of a physical memory region reported by the boot loader.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MemoryRegionKind {
    /// Usable RAM that may be handed to the frame allocator.
    Free = 0,
    /// Firmware, MMIO or otherwise unusable memory.
    Reserved = 1,
    /// The loaded kernel image (text, rodata, data, bss).
    Kernel = 2,
    /// Memory the boot loader already used for page tables and boot data.
    /// It becomes free once the kernel runs on its own page table.
    BootLoader = 3,
}

/// One contiguous physical memory region.
///
/// Keep this `#[repr(C)]`: the boot loader writes an array of these.
#[repr(C)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MemoryRegion {
    /// Physical base address in bytes.
    pub base: u64,
    /// Length in bytes.
    pub len: u64,
    pub kind: MemoryRegionKind,
}

impl MemoryRegion {
    #[must_use]
    pub const fn new(base: u64, len: u64, kind: MemoryRegionKind) -> Self {
        Self { base, len, kind }
    }

    #[must_use]
    pub const fn is_free(&self) -> bool {
        matches!(self.kind, MemoryRegionKind::Free)
    }

    /// Exclusive end address, saturating at `u64::MAX`.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.base.saturating_add(self.len)
    }
}
