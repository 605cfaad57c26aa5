//! # `AArch64` VMSAv8-64, 4 KiB granule, 48-bit input addresses
//!
//! Levels 0 to 3 in Arm numbering are levels 3 to 0 here. Level 1 and 2
//! entries (our numbering) may be *block* descriptors (1 GiB / 2 MiB); level
//! 0 entries are *page* descriptors, which share the table encoding `0b11`.
//!
//! Memory types are selected through `AttrIndx` into a fixed `MAIR_EL1`
//! layout ([`MAIR_EL1`]), which the boot code is expected to program.

use crate::{Features, MemoryType, PageAttrs, PageLevel, Protection, Pte, PteCodec, Shareability};
use bitfield_struct::bitfield;
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};

/// `AArch64` stage-1 translation, lower (TTBR0) half.
#[derive(Copy, Clone, Debug, Default)]
pub struct Aarch64;

/// `MAIR_EL1` value matching the attribute indices used by this codec.
///
/// | Index | Attr | [`MemoryType`] |
/// |-------|------|----------------|
/// | 0 | `0x00` | `DeviceNGnRnE` |
/// | 1 | `0x04` | `DeviceNGnRE` |
/// | 2 | `0x0C` | `DeviceGre` |
/// | 3 | `0x44` | `NormalNc` |
/// | 4 | `0xFF` | `NormalWb` |
/// | 5 | `0xBB` | `NormalWt` |
/// | 6 | `0xF0` | `NormalWbTagged` |
pub const MAIR_EL1: u64 = 0x00F0_BBFF_440C_0400;

/// Stage-1 descriptor (table, block or page).
#[bitfield(u64)]
struct Descriptor {
    valid: bool,
    /// `1` for table and page descriptors, `0` for blocks.
    table_or_page: bool,
    #[bits(3)]
    attr_index: u8,
    ns: bool,
    /// `AP[1]`: EL0 access.
    el0: bool,
    /// `AP[2]`: read-only.
    read_only: bool,
    #[bits(2)]
    sh: u8,
    af: bool,
    ng: bool,
    #[bits(36)]
    output: u64,
    #[bits(2)]
    __: u8,
    gp: bool,
    dbm: bool,
    contiguous: bool,
    pxn: bool,
    uxn: bool,
    #[bits(4)]
    software: u8,
    #[bits(4)]
    pbha: u8,
    __: bool,
}

const ADDRESS_MASK: u64 = 0x0000_FFFF_FFFF_F000;

const SH_NON: u8 = 0b00;
const SH_OUTER: u8 = 0b10;
const SH_INNER: u8 = 0b11;

const fn attr_index(memory_type: MemoryType) -> u8 {
    match memory_type {
        MemoryType::DeviceNGnRnE => 0,
        MemoryType::DeviceNGnRE => 1,
        MemoryType::DeviceGre => 2,
        MemoryType::NormalNc => 3,
        MemoryType::NormalWb => 4,
        MemoryType::NormalWt => 5,
        MemoryType::NormalWbTagged => 6,
    }
}

const fn memory_type(index: u8) -> Option<MemoryType> {
    Some(match index {
        0 => MemoryType::DeviceNGnRnE,
        1 => MemoryType::DeviceNGnRE,
        2 => MemoryType::DeviceGre,
        3 => MemoryType::NormalNc,
        4 => MemoryType::NormalWb,
        5 => MemoryType::NormalWt,
        6 => MemoryType::NormalWbTagged,
        _ => return None,
    })
}

const fn sh_bits(shareability: Shareability) -> u8 {
    match shareability {
        Shareability::Non => SH_NON,
        Shareability::Outer => SH_OUTER,
        Shareability::Inner => SH_INNER,
    }
}

impl PteCodec for Aarch64 {
    const NAME: &'static str = "aarch64";
    const FEATURES: Features = Features::LARGE_PAGES
        .union(Features::HUGE_PAGES)
        .union(Features::NO_EXECUTE)
        .union(Features::MEMORY_TYPES)
        .union(Features::SHAREABILITY);

    /// Only the TTBR0 half is managed: the top 16 bits must be clear.
    fn is_canonical(va: VirtualAddress) -> bool {
        va.as_u64() >> Self::VA_BITS == 0
    }

    fn supports(attrs: &PageAttrs, level: PageLevel) -> bool {
        Self::leaf_allowed(level) && attrs.prot.contains(Protection::READ)
    }

    fn encode_leaf(
        paddr: PhysicalAddress,
        attrs: PageAttrs,
        level: PageLevel,
        template: Option<Pte>,
    ) -> Pte {
        assert!(
            Self::supports(&attrs, level),
            "aarch64 cannot encode {attrs:?} at {level:?}"
        );
        debug_assert!(paddr.is_aligned_to(level.size()));

        let no_exec = !attrs.prot.contains(Protection::EXEC);
        let mut d = Descriptor::new()
            .with_valid(true)
            .with_table_or_page(level.is_page())
            .with_attr_index(attr_index(attrs.memory_type))
            .with_read_only(!attrs.prot.contains(Protection::WRITE))
            .with_sh(sh_bits(attrs.shareability))
            .with_af(true)
            .with_output((paddr.as_u64() & ADDRESS_MASK) >> 12)
            .with_pxn(no_exec)
            .with_uxn(no_exec);

        if let Some(t) = template {
            let t = Descriptor::from_bits(t.raw());
            d = d
                .with_af(t.af())
                .with_ng(t.ng())
                .with_dbm(t.dbm())
                .with_contiguous(t.contiguous());
        }
        Pte::from_raw(d.into_bits())
    }

    fn encode_table(paddr: PhysicalAddress) -> Pte {
        let d = Descriptor::new()
            .with_valid(true)
            .with_table_or_page(true)
            .with_output((paddr.as_u64() & ADDRESS_MASK) >> 12);
        Pte::from_raw(d.into_bits())
    }

    fn decode_attrs(pte: Pte, _level: PageLevel) -> PageAttrs {
        let d = Descriptor::from_bits(pte.raw());
        let mut prot = Protection::READ;
        prot.set(Protection::WRITE, !d.read_only());
        prot.set(Protection::EXEC, !d.pxn());
        let shareability = match d.sh() {
            SH_INNER => Shareability::Inner,
            SH_OUTER => Shareability::Outer,
            _ => Shareability::Non,
        };
        PageAttrs::new(prot)
            .with_memory_type(memory_type(d.attr_index()).unwrap_or(MemoryType::DeviceNGnRnE))
            .with_shareability(shareability)
    }

    fn is_present(pte: Pte) -> bool {
        Descriptor::from_bits(pte.raw()).valid()
    }

    fn is_leaf(pte: Pte, level: PageLevel) -> bool {
        let d = Descriptor::from_bits(pte.raw());
        if !d.valid() {
            return false;
        }
        if level.is_page() {
            d.table_or_page()
        } else {
            Self::leaf_allowed(level) && !d.table_or_page()
        }
    }

    fn paddr(pte: Pte, level: PageLevel) -> PhysicalAddress {
        let addr = pte.raw() & ADDRESS_MASK;
        if Self::is_leaf(pte, level) {
            PhysicalAddress::new(addr & !(level.size() - 1))
        } else {
            PhysicalAddress::new(addr)
        }
    }
}

#[cfg(target_arch = "aarch64")]
impl crate::RootRegister for Aarch64 {
    unsafe fn read_root() -> PhysicalAddress {
        use kernel_registers::LoadRegisterUnsafe;
        unsafe { kernel_registers::ttbr::Ttbr::load_unsafe() }.root()
    }

    unsafe fn write_root(root: PhysicalAddress) {
        use kernel_registers::StoreRegisterUnsafe;
        unsafe { kernel_registers::ttbr::Ttbr::from_root(root, 0).store_unsafe() }
    }
}
