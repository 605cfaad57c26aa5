//! # RISC-V Sv48
//!
//! Four levels of 512 entries. Any entry with one of `R`, `W`, `X` set is a
//! leaf; an entry with only `V` points to the next table. Memory types come
//! from the Svpbmt extension (`PBMT` bits); `A` and `D` are set up front so
//! hardware without A/D updating never faults on first access.

use crate::{Features, MemoryType, PageAttrs, PageLevel, Protection, Pte, PteCodec, Shareability};
use bitfield_struct::bitfield;
use kernel_memory_addresses::PhysicalAddress;

/// RISC-V Sv48 paging format.
#[derive(Copy, Clone, Debug, Default)]
pub struct Riscv64;

#[bitfield(u64)]
struct Entry {
    v: bool,
    r: bool,
    w: bool,
    x: bool,
    u: bool,
    g: bool,
    a: bool,
    d: bool,
    #[bits(2)]
    rsw: u8,
    #[bits(44)]
    ppn: u64,
    #[bits(7)]
    __: u8,
    /// Svpbmt: 0 = PMA, 1 = NC, 2 = IO.
    #[bits(2)]
    pbmt: u8,
    /// `N` (Svnapot), never set.
    __: bool,
}

const PBMT_PMA: u8 = 0;
const PBMT_NC: u8 = 1;
const PBMT_IO: u8 = 2;

const fn pbmt(memory_type: MemoryType) -> Option<u8> {
    match memory_type {
        MemoryType::NormalWb => Some(PBMT_PMA),
        MemoryType::NormalNc => Some(PBMT_NC),
        MemoryType::DeviceNGnRnE => Some(PBMT_IO),
        MemoryType::NormalWt
        | MemoryType::DeviceNGnRE
        | MemoryType::DeviceGre
        | MemoryType::NormalWbTagged => None,
    }
}

impl PteCodec for Riscv64 {
    const NAME: &'static str = "riscv64";
    const FEATURES: Features = Features::LARGE_PAGES
        .union(Features::HUGE_PAGES)
        .union(Features::NO_EXECUTE)
        .union(Features::MEMORY_TYPES);

    /// Sv48 permits leaves at every level, including 512 GiB terapages.
    fn leaf_allowed(level: PageLevel) -> bool {
        level.get() < Self::LEVELS
    }

    fn supports(attrs: &PageAttrs, level: PageLevel) -> bool {
        Self::leaf_allowed(level)
            && attrs.prot.contains(Protection::READ)
            && attrs.shareability == Shareability::Inner
            && pbmt(attrs.memory_type).is_some()
    }

    fn encode_leaf(
        paddr: PhysicalAddress,
        attrs: PageAttrs,
        level: PageLevel,
        template: Option<Pte>,
    ) -> Pte {
        let Some(bits) = pbmt(attrs.memory_type).filter(|_| Self::supports(&attrs, level)) else {
            panic!("riscv64 cannot encode {attrs:?} at {level:?}");
        };
        debug_assert!(paddr.is_aligned_to(level.size()));

        let mut e = Entry::new()
            .with_v(true)
            .with_r(true)
            .with_w(attrs.prot.contains(Protection::WRITE))
            .with_x(attrs.prot.contains(Protection::EXEC))
            .with_a(true)
            .with_d(true)
            .with_ppn(paddr.as_u64() >> 12)
            .with_pbmt(bits);

        if let Some(t) = template {
            let t = Entry::from_bits(t.raw());
            e = e
                .with_u(t.u())
                .with_g(t.g())
                .with_a(t.a())
                .with_d(t.d())
                .with_rsw(t.rsw());
        }
        Pte::from_raw(e.into_bits())
    }

    fn encode_table(paddr: PhysicalAddress) -> Pte {
        Pte::from_raw(Entry::new().with_v(true).with_ppn(paddr.as_u64() >> 12).into_bits())
    }

    fn decode_attrs(pte: Pte, _level: PageLevel) -> PageAttrs {
        let e = Entry::from_bits(pte.raw());
        let mut prot = Protection::empty();
        prot.set(Protection::READ, e.r());
        prot.set(Protection::WRITE, e.w());
        prot.set(Protection::EXEC, e.x());
        let memory_type = match e.pbmt() {
            PBMT_NC => MemoryType::NormalNc,
            PBMT_IO => MemoryType::DeviceNGnRnE,
            _ => MemoryType::NormalWb,
        };
        PageAttrs::new(prot).with_memory_type(memory_type)
    }

    fn is_present(pte: Pte) -> bool {
        Entry::from_bits(pte.raw()).v()
    }

    fn is_leaf(pte: Pte, level: PageLevel) -> bool {
        let e = Entry::from_bits(pte.raw());
        e.v() && (e.r() || e.w() || e.x()) && Self::leaf_allowed(level)
    }

    fn paddr(pte: Pte, level: PageLevel) -> PhysicalAddress {
        let addr = Entry::from_bits(pte.raw()).ppn() << 12;
        if Self::is_leaf(pte, level) {
            PhysicalAddress::new(addr & !(level.size() - 1))
        } else {
            PhysicalAddress::new(addr)
        }
    }
}

#[cfg(target_arch = "riscv64")]
impl crate::RootRegister for Riscv64 {
    unsafe fn read_root() -> PhysicalAddress {
        use kernel_registers::LoadRegisterUnsafe;
        unsafe { kernel_registers::satp::Satp::load_unsafe() }.root()
    }

    unsafe fn write_root(root: PhysicalAddress) {
        use kernel_registers::StoreRegisterUnsafe;
        unsafe { kernel_registers::satp::Satp::sv48(root, 0).store_unsafe() }
    }
}
