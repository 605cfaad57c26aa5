use core::fmt;

/// Entries per table on every supported format (4 KiB tables of 8-byte entries).
pub const ENTRIES_PER_TABLE: usize = 512;

/// Raw page-table entry.
///
/// Opaque outside of the codecs: only a [`PteCodec`](crate::PteCodec) knows
/// what the bits mean.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Pte(u64);

impl Pte {
    /// The all-zero entry, absent on every supported format.
    pub const INVALID: Self = Self(0);

    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_invalid(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Pte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pte(0x{:016X})", self.0)
    }
}

/// Depth of a table or leaf, counted from the bottom.
///
/// Level 0 leaves map 4 KiB, level 1 leaves 2 MiB, level 2 leaves 1 GiB. The
/// root of a four-level table is level 3.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PageLevel(u8);

impl PageLevel {
    pub const PAGE: Self = Self(0);
    pub const LARGE: Self = Self(1);
    pub const HUGE: Self = Self(2);

    #[inline]
    #[must_use]
    pub const fn new(level: u8) -> Self {
        Self(level)
    }

    #[inline]
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Bit position of the lowest virtual-address bit this level indexes.
    #[inline]
    #[must_use]
    pub const fn shift(self) -> u32 {
        12 + 9 * self.0 as u32
    }

    /// Bytes covered by one entry at this level.
    #[inline]
    #[must_use]
    pub const fn size(self) -> u64 {
        1 << self.shift()
    }

    /// 4 KiB frames covered by one entry at this level.
    #[inline]
    #[must_use]
    pub const fn frames(self) -> usize {
        1 << (9 * self.0 as u32)
    }

    /// The next level towards the leaves, or `None` at level 0.
    #[inline]
    #[must_use]
    pub const fn lower(self) -> Option<Self> {
        match self.0 {
            0 => None,
            l => Some(Self(l - 1)),
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_page(self) -> bool {
        self.0 == 0
    }
}
