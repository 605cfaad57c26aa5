//! The seam between the walker and a hardware paging format.

use crate::{Features, PageAttrs, PageLevel, Pte};
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};

/// Pure encoder/decoder for one paging format.
///
/// Implementors are zero-sized markers; all functions are associated so the
/// walker is monomorphized per format and no bit knowledge leaks into it.
///
/// ### Contract
/// - [`encode_leaf`](Self::encode_leaf) panics on attributes for which
///   [`supports`](Self::supports) is `false`. The walker checks first and
///   reports [`InvalidArgument`](crate::PagingError::InvalidArgument).
/// - For every supported `attrs` and leaf level `l`,
///   `decode_attrs(encode_leaf(pa, attrs, l, None), l) == attrs`.
/// - [`Pte::INVALID`] is absent.
pub trait PteCodec {
    /// Name for log output.
    const NAME: &'static str;

    /// Number of translation levels; the root is `LEVELS - 1`.
    const LEVELS: u8 = 4;

    /// Significant virtual-address bits.
    const VA_BITS: u32 = 48;

    const FEATURES: Features;

    #[inline]
    #[must_use]
    fn root_level() -> PageLevel {
        PageLevel::new(Self::LEVELS - 1)
    }

    /// Slot of `va` in a table at `level`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    fn index(va: VirtualAddress, level: PageLevel) -> usize {
        ((va.as_u64() >> level.shift()) & 0x1FF) as usize
    }

    /// Whether `va` is translatable by this format.
    ///
    /// The default requires the upper bits to be a sign extension of bit
    /// `VA_BITS - 1`.
    #[inline]
    #[must_use]
    fn is_canonical(va: VirtualAddress) -> bool {
        let shift = 64 - Self::VA_BITS;
        ((va.as_u64() << shift).cast_signed() >> shift).cast_unsigned() == va.as_u64()
    }

    /// Whether all of `[va, va + len)` is canonical and within one half.
    #[must_use]
    fn is_canonical_range(va: VirtualAddress, len: u64) -> bool {
        let Some(last) = len.checked_sub(1).and_then(|l| va.as_u64().checked_add(l)) else {
            return false;
        };
        Self::is_canonical(va)
            && Self::is_canonical(VirtualAddress::new(last))
            && (va.as_u64() ^ last) >> 63 == 0
    }

    /// Whether a leaf may be placed at `level`.
    #[must_use]
    fn leaf_allowed(level: PageLevel) -> bool {
        level.get() <= PageLevel::HUGE.get()
    }

    /// Whether `attrs` can be encoded in a leaf at `level`.
    #[must_use]
    fn supports(attrs: &PageAttrs, level: PageLevel) -> bool;

    /// Present leaf mapping `paddr` at `level`.
    ///
    /// When `template` is given, implementation-defined bits (accessed,
    /// global, software bits, ...) are carried over from it instead of taking
    /// their defaults.
    ///
    /// # Panics
    /// If `supports(&attrs, level)` is `false`.
    #[must_use]
    fn encode_leaf(
        paddr: PhysicalAddress,
        attrs: PageAttrs,
        level: PageLevel,
        template: Option<Pte>,
    ) -> Pte;

    /// Present entry pointing at the next-level table in `paddr`.
    #[must_use]
    fn encode_table(paddr: PhysicalAddress) -> Pte;

    /// Attributes of a leaf built by [`encode_leaf`](Self::encode_leaf).
    #[must_use]
    fn decode_attrs(pte: Pte, level: PageLevel) -> PageAttrs;

    /// `pte` with new attributes, same frame, implementation bits preserved.
    ///
    /// # Panics
    /// If `supports(&attrs, level)` is `false`.
    #[must_use]
    fn change_attrs(pte: Pte, attrs: PageAttrs, level: PageLevel) -> Pte {
        Self::encode_leaf(Self::paddr(pte, level), attrs, level, Some(pte))
    }

    #[must_use]
    fn is_present(pte: Pte) -> bool;

    /// Whether a present `pte` found at `level` terminates the walk.
    #[must_use]
    fn is_leaf(pte: Pte, level: PageLevel) -> bool;

    /// Frame address held by `pte`: the next table for table entries, the
    /// `level`-aligned page base for leaves.
    #[must_use]
    fn paddr(pte: Pte, level: PageLevel) -> PhysicalAddress;
}

/// Access to the CPU register that selects the active table root.
///
/// Only implemented for the codec of the architecture being compiled for.
pub trait RootRegister {
    /// Root table of the current CPU.
    ///
    /// # Safety
    /// Privileged; must run in kernel mode with paging enabled.
    unsafe fn read_root() -> PhysicalAddress;

    /// Switch the current CPU to the table rooted at `root`.
    ///
    /// # Safety
    /// Privileged. The new table must map the executing code, the stack and
    /// the direct map.
    unsafe fn write_root(root: PhysicalAddress);
}
