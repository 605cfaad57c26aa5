use bitfield_struct::bitfield;
use kernel_memory_addresses::PhysicalAddress;

/// Translation mode field of `satp`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum SatpMode {
    Bare = 0,
    Sv39 = 8,
    Sv48 = 9,
    Sv57 = 10,
}

impl SatpMode {
    const fn into_bits(self) -> u8 {
        self as u8
    }

    const fn from_bits(value: u8) -> Self {
        match value {
            8 => Self::Sv39,
            9 => Self::Sv48,
            10 => Self::Sv57,
            _ => Self::Bare,
        }
    }
}

/// `satp`, RV64 layout.
#[bitfield(u64)]
pub struct Satp {
    /// Bits 0–43: root table PPN.
    #[bits(44)]
    ppn: u64,

    /// Bits 44–59: ASID.
    #[bits(16)]
    pub asid: u16,

    /// Bits 60–63: translation mode.
    #[bits(4)]
    pub mode: SatpMode,
}

impl Satp {
    #[must_use]
    pub const fn sv48(root: PhysicalAddress, asid: u16) -> Self {
        debug_assert!(root.as_u64() & 0xFFF == 0, "root table must be 4K-aligned");
        Self::new()
            .with_ppn(root.as_u64() >> 12)
            .with_asid(asid)
            .with_mode(SatpMode::Sv48)
    }

    #[must_use]
    pub const fn root(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.ppn() << 12)
    }
}

#[cfg(all(feature = "asm", target_arch = "riscv64"))]
impl crate::LoadRegisterUnsafe for Satp {
    unsafe fn load_unsafe() -> Self {
        let v: u64;
        unsafe {
            core::arch::asm!("csrr {}, satp", out(reg) v, options(nomem, nostack));
        }
        Self::from_bits(v)
    }
}

#[cfg(all(feature = "asm", target_arch = "riscv64"))]
impl crate::StoreRegisterUnsafe for Satp {
    unsafe fn store_unsafe(self) {
        unsafe {
            core::arch::asm!(
                "csrw satp, {}",
                "sfence.vma",
                in(reg) self.into_bits(),
                options(nostack)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sv48_mode_in_top_bits() {
        let s = Satp::sv48(PhysicalAddress::new(0x8020_0000), 1);
        assert_eq!(s.into_bits() >> 60, 9);
        assert_eq!(s.mode(), SatpMode::Sv48);
        assert_eq!(s.root().as_u64(), 0x8020_0000);
        assert_eq!(s.asid(), 1);
    }
}
