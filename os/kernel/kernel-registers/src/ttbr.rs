use bitfield_struct::bitfield;
use kernel_memory_addresses::PhysicalAddress;

/// `TTBRn_EL1` for a 48-bit output address and a 4 KiB granule.
#[bitfield(u64)]
pub struct Ttbr {
    /// Bit 0: CnP, common-not-private translations.
    pub common_not_private: bool,

    /// Bits 1–47: translation table base; bit 0 of the address is implied.
    #[bits(47)]
    base_bits: u64,

    /// Bits 48–63: ASID.
    #[bits(16)]
    pub asid: u16,
}

impl Ttbr {
    #[must_use]
    pub const fn from_root(root: PhysicalAddress, asid: u16) -> Self {
        debug_assert!(root.as_u64() & 0xFFF == 0, "root table must be 4K-aligned");
        Self::new().with_base_bits(root.as_u64() >> 1).with_asid(asid)
    }

    #[must_use]
    pub const fn root(&self) -> PhysicalAddress {
        PhysicalAddress::new((self.base_bits() << 1) & !0xFFF)
    }
}

#[cfg(all(feature = "asm", target_arch = "aarch64"))]
impl crate::LoadRegisterUnsafe for Ttbr {
    unsafe fn load_unsafe() -> Self {
        let v: u64;
        unsafe {
            core::arch::asm!(
                "mrs {}, ttbr0_el1",
                out(reg) v,
                options(nomem, nostack, preserves_flags),
            );
        }
        Self::from_bits(v)
    }
}

#[cfg(all(feature = "asm", target_arch = "aarch64"))]
impl crate::StoreRegisterUnsafe for Ttbr {
    unsafe fn store_unsafe(self) {
        unsafe {
            core::arch::asm!(
                "msr ttbr0_el1, {}",
                "isb",
                in(reg) self.into_bits(),
                options(nostack, preserves_flags)
            );
        }
    }
}
