use core::fmt;
use core::hash::Hash;

mod sealed {
    pub trait Sealed {}
}

/// Marker trait for the page sizes a leaf entry can map.
///
/// Sealed: the set of sizes is fixed by the hardware formats the walker
/// supports (4 KiB granule, 2 MiB and 1 GiB blocks).
pub trait PageSize:
    sealed::Sealed + Clone + Copy + Eq + Ord + Hash + fmt::Display + fmt::Debug
{
    /// Page size in bytes (power of two).
    const SIZE: u64;
    /// log2(SIZE).
    const SHIFT: u32;
    /// Mask selecting the in-page offset bits.
    const MASK: u64 = Self::SIZE - 1;

    fn as_str() -> &'static str;
}

macro_rules! page_size {
    ($(#[$doc:meta])* $name:ident, $shift:literal, $label:literal) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name;

        impl sealed::Sealed for $name {}

        impl PageSize for $name {
            const SIZE: u64 = 1 << $shift;
            const SHIFT: u32 = $shift;

            #[inline(always)]
            fn as_str() -> &'static str {
                $label
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(Self::as_str())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "PageSize({})", Self::as_str())
            }
        }
    };
}

page_size!(
    /// 4 KiB base page; also the frame granularity of the frame allocator.
    Size4K, 12, "4K"
);
page_size!(
    /// 2 MiB large page (x86 PDE with PS, arm64 L2 block, riscv megapage).
    Size2M, 21, "2M"
);
page_size!(
    /// 1 GiB huge page (x86 PDPTE with PS, arm64 L1 block, riscv gigapage).
    Size1G, 30, "1G"
);
