use bitfield_struct::bitfield;
use kernel_memory_addresses::PhysicalAddress;

/// CR3 with PCID disabled (CR4.PCIDE = 0).
///
/// Holds the physical base of the PML4 plus the cache attributes used for
/// the root-table fetch itself.
#[bitfield(u64)]
pub struct Cr3 {
    /// Bits 0–2: ignored.
    #[bits(3)]
    __: u8,

    /// Bit 3: PWT for the PML4 fetch.
    pub write_through: bool,

    /// Bit 4: PCD for the PML4 fetch.
    pub cache_disabled: bool,

    /// Bits 5–11: ignored.
    #[bits(7)]
    __: u8,

    /// Bits 12–51: PML4 frame number.
    #[bits(40)]
    root_frame: u64,

    /// Bits 52–63: reserved, must be zero.
    #[bits(12)]
    __: u16,
}

impl Cr3 {
    /// CR3 value selecting the page table rooted at `root`, write-back cached.
    #[must_use]
    pub const fn from_root(root: PhysicalAddress) -> Self {
        debug_assert!(root.as_u64() & 0xFFF == 0, "root table must be 4K-aligned");
        Self::new().with_root_frame(root.as_u64() >> 12)
    }

    /// Physical base of the root table.
    #[must_use]
    pub const fn root(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.root_frame() << 12)
    }
}

#[cfg(all(feature = "asm", target_arch = "x86_64"))]
impl crate::LoadRegisterUnsafe for Cr3 {
    unsafe fn load_unsafe() -> Self {
        let cr3: u64;
        unsafe {
            core::arch::asm!("mov {}, cr3", out(reg) cr3, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(cr3)
    }
}

#[cfg(all(feature = "asm", target_arch = "x86_64"))]
impl crate::StoreRegisterUnsafe for Cr3 {
    unsafe fn store_unsafe(self) {
        unsafe {
            core::arch::asm!(
                "mov cr3, {}",
                in(reg) self.into_bits(),
                options(nostack, preserves_flags),
            );
        }
    }
}
