use crate::PageLevel;
use bitflags::bitflags;
use kernel_memory_addresses::PhysicalAddress;

bitflags! {
    /// Options for [`PageTable::map`](crate::PageTable::map).
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MapFlags: u32 {
        /// Allow 2 MiB / 1 GiB leaves where alignment and length permit.
        const LARGE = 1 << 0;
        /// The caller does not care which frames back the mapping.
        ///
        /// Equivalent to passing [`MapTarget::Any`].
        const ANY_PADDR = 1 << 1;
        /// Map with 2 MiB leaves only. Addresses and length must be 2 MiB
        /// aligned; there is no fallback to smaller leaves.
        const FORCE_LARGE = 1 << 2;
        /// Map with 1 GiB leaves only, like [`FORCE_LARGE`](Self::FORCE_LARGE).
        const FORCE_HUGE = 1 << 3;
    }
}

impl MapFlags {
    /// Leaf level requested by `FORCE_LARGE` / `FORCE_HUGE`, if any.
    #[must_use]
    pub const fn forced_level(self) -> Option<PageLevel> {
        if self.contains(Self::FORCE_HUGE) {
            Some(PageLevel::HUGE)
        } else if self.contains(Self::FORCE_LARGE) {
            Some(PageLevel::LARGE)
        } else {
            None
        }
    }
}

bitflags! {
    /// Options for [`PageTable::unmap`](crate::PageTable::unmap).
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct UnmapFlags: u32 {
        /// Leave the frames allocated; another mapping still owns them.
        const KEEP_FRAMES = 1 << 0;
    }
}

bitflags! {
    /// Options for [`PageTable::clone_from`](crate::PageTable::clone_from).
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct CloneFlags: u32 {
        /// Only allocate a zeroed root; copy nothing.
        const ROOT_ONLY = 1 << 0;
    }
}

/// What a new mapping points at.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MapTarget {
    /// Allocate fresh frames from the table's frame allocator.
    Any,
    /// Map the physically contiguous run starting here.
    Frame(PhysicalAddress),
}

impl From<PhysicalAddress> for MapTarget {
    #[inline]
    fn from(pa: PhysicalAddress) -> Self {
        Self::Frame(pa)
    }
}
