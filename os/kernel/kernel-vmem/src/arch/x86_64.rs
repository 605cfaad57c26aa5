//! # x86-64 4-level paging (PML4 → PDPT → PD → PT)
//!
//! ```text
//! | 47‒39 | 38‒30 | 29‒21 | 20‒12 | 11‒0   |
//! |  PML4 |  PDPT |   PD  |   PT  | Offset |
//! ```
//!
//! A PDPTE (level 2) or PDE (level 1) with `PS=1` is a 1 GiB or 2 MiB leaf; a
//! PTE (level 0) is always a leaf. The PML4E never is.
//!
//! ### Memory types
//!
//! The PAT MSR is left at its reset value, so the first four entries are
//! reachable through `PWT` and `PCD` alone and the PAT bit stays clear:
//!
//! | PAT index | PCD | PWT | Type | [`MemoryType`] |
//! |-----------|-----|-----|------|----------------|
//! | 0 | 0 | 0 | WB  | `NormalWb` |
//! | 1 | 0 | 1 | WT  | `NormalWt` |
//! | 2 | 1 | 0 | UC- | `NormalNc` |
//! | 3 | 1 | 1 | UC  | `DeviceNGnRnE` |
//!
//! Caches are coherent, so only [`Shareability::Inner`] is accepted.

use crate::{Features, MemoryType, PageAttrs, PageLevel, Protection, Pte, PteCodec, Shareability};
use bitfield_struct::bitfield;
use kernel_memory_addresses::PhysicalAddress;

/// x86-64 paging format.
#[derive(Copy, Clone, Debug, Default)]
pub struct X86_64;

/// One 64-bit entry at any level.
///
/// | Bits  | Name | Meaning |
/// |-------|------|---------|
/// | 0     | P    | Present |
/// | 1     | RW   | Writable |
/// | 2     | US   | User accessible |
/// | 3     | PWT  | Write-through |
/// | 4     | PCD  | Cache disable |
/// | 5     | A    | Accessed |
/// | 6     | D    | Dirty (leaf only) |
/// | 7     | PS   | Leaf at level 1/2; PAT at level 0 |
/// | 8     | G    | Global (leaf only) |
/// | 9–11  |      | OS available |
/// | 12–51 |      | Frame address bits 51:12 |
/// | 52–58 |      | OS available |
/// | 59–62 | PK   | Protection key |
/// | 63    | XD   | Execute disable |
#[bitfield(u64)]
struct Entry {
    present: bool,
    writable: bool,
    user: bool,
    write_through: bool,
    cache_disabled: bool,
    accessed: bool,
    dirty: bool,
    large_page: bool,
    global: bool,
    #[bits(3)]
    os_low: u8,
    #[bits(40)]
    frame: u64,
    #[bits(7)]
    os_high: u8,
    #[bits(4)]
    protection_key: u8,
    no_execute: bool,
}

const ADDRESS_MASK: u64 = 0x000F_FFFF_FFFF_F000;

/// `(PWT, PCD)` for a memory type, if it has a slot in the default PAT.
const fn pat_bits(memory_type: MemoryType) -> Option<(bool, bool)> {
    match memory_type {
        MemoryType::NormalWb => Some((false, false)),
        MemoryType::NormalWt => Some((true, false)),
        MemoryType::NormalNc => Some((false, true)),
        MemoryType::DeviceNGnRnE => Some((true, true)),
        MemoryType::DeviceNGnRE | MemoryType::DeviceGre | MemoryType::NormalWbTagged => None,
    }
}

const fn memory_type(write_through: bool, cache_disabled: bool) -> MemoryType {
    match (write_through, cache_disabled) {
        (false, false) => MemoryType::NormalWb,
        (true, false) => MemoryType::NormalWt,
        (false, true) => MemoryType::NormalNc,
        (true, true) => MemoryType::DeviceNGnRnE,
    }
}

impl PteCodec for X86_64 {
    const NAME: &'static str = "x86_64";
    const FEATURES: Features = Features::LARGE_PAGES
        .union(Features::HUGE_PAGES)
        .union(Features::NO_EXECUTE)
        .union(Features::MEMORY_TYPES);

    fn supports(attrs: &PageAttrs, level: PageLevel) -> bool {
        Self::leaf_allowed(level)
            && attrs.prot.contains(Protection::READ)
            && attrs.shareability == Shareability::Inner
            && pat_bits(attrs.memory_type).is_some()
    }

    fn encode_leaf(
        paddr: PhysicalAddress,
        attrs: PageAttrs,
        level: PageLevel,
        template: Option<Pte>,
    ) -> Pte {
        let Some((pwt, pcd)) = pat_bits(attrs.memory_type).filter(|_| Self::supports(&attrs, level))
        else {
            panic!("x86_64 cannot encode {attrs:?} at {level:?}");
        };
        debug_assert!(paddr.is_aligned_to(level.size()));

        let mut e = Entry::new()
            .with_present(true)
            .with_writable(attrs.prot.contains(Protection::WRITE))
            .with_write_through(pwt)
            .with_cache_disabled(pcd)
            .with_large_page(!level.is_page())
            .with_no_execute(!attrs.prot.contains(Protection::EXEC))
            .with_frame((paddr.as_u64() & ADDRESS_MASK) >> 12);

        if let Some(t) = template {
            let t = Entry::from_bits(t.raw());
            e = e
                .with_user(t.user())
                .with_accessed(t.accessed())
                .with_dirty(t.dirty())
                .with_global(t.global())
                .with_os_low(t.os_low())
                .with_os_high(t.os_high())
                .with_protection_key(t.protection_key());
        }
        Pte::from_raw(e.into_bits())
    }

    fn encode_table(paddr: PhysicalAddress) -> Pte {
        let e = Entry::new()
            .with_present(true)
            .with_writable(true)
            .with_frame((paddr.as_u64() & ADDRESS_MASK) >> 12);
        Pte::from_raw(e.into_bits())
    }

    fn decode_attrs(pte: Pte, _level: PageLevel) -> PageAttrs {
        let e = Entry::from_bits(pte.raw());
        let mut prot = Protection::READ;
        prot.set(Protection::WRITE, e.writable());
        prot.set(Protection::EXEC, !e.no_execute());
        PageAttrs::new(prot).with_memory_type(memory_type(e.write_through(), e.cache_disabled()))
    }

    fn is_present(pte: Pte) -> bool {
        Entry::from_bits(pte.raw()).present()
    }

    fn is_leaf(pte: Pte, level: PageLevel) -> bool {
        let e = Entry::from_bits(pte.raw());
        e.present() && (level.is_page() || (Self::leaf_allowed(level) && e.large_page()))
    }

    fn paddr(pte: Pte, level: PageLevel) -> PhysicalAddress {
        let addr = pte.raw() & ADDRESS_MASK;
        if Self::is_leaf(pte, level) {
            // Bit 12 is PAT in large leaves; masking to the page size drops it.
            PhysicalAddress::new(addr & !(level.size() - 1))
        } else {
            PhysicalAddress::new(addr)
        }
    }
}

#[cfg(target_arch = "x86_64")]
impl crate::RootRegister for X86_64 {
    unsafe fn read_root() -> PhysicalAddress {
        use kernel_registers::LoadRegisterUnsafe;
        unsafe { kernel_registers::cr3::Cr3::load_unsafe() }.root()
    }

    unsafe fn write_root(root: PhysicalAddress) {
        use kernel_registers::StoreRegisterUnsafe;
        unsafe { kernel_registers::cr3::Cr3::from_root(root).store_unsafe() }
    }
}
