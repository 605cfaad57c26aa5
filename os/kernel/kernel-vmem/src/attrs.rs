//! Architecture-neutral mapping attributes.
//!
//! A [`PageAttrs`] is what callers ask for; each [`PteCodec`](crate::PteCodec)
//! decides how (and whether) it can be expressed in hardware bits.

use bitflags::bitflags;

bitflags! {
    /// Access permissions of a mapping.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct Protection: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const EXEC = 1 << 2;

        const RW = Self::READ.bits() | Self::WRITE.bits();
        const RX = Self::READ.bits() | Self::EXEC.bits();
    }
}

/// Cacheability and ordering of a mapping.
///
/// Names follow the Arm terminology because it is the finest-grained of the
/// supported formats; other architectures map a subset.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum MemoryType {
    /// Normal memory, write-back cacheable.
    #[default]
    NormalWb,
    /// Normal memory, write-through cacheable.
    NormalWt,
    /// Normal memory, non-cacheable.
    NormalNc,
    /// Device memory, non-gathering, non-reordering, early write acknowledge.
    DeviceNGnRE,
    /// Device memory, strongly ordered.
    DeviceNGnRnE,
    /// Device memory, gathering, reordering, early write acknowledge.
    DeviceGre,
    /// Normal write-back memory with allocation tags (Arm MTE).
    NormalWbTagged,
}

/// Coherency domain of a mapping.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Shareability {
    Non,
    #[default]
    Inner,
    Outer,
}

/// Full attribute set of a leaf mapping.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PageAttrs {
    pub prot: Protection,
    pub memory_type: MemoryType,
    pub shareability: Shareability,
}

impl PageAttrs {
    /// `prot` on normal write-back, inner-shareable memory.
    #[inline]
    #[must_use]
    pub const fn new(prot: Protection) -> Self {
        Self {
            prot,
            memory_type: MemoryType::NormalWb,
            shareability: Shareability::Inner,
        }
    }

    pub const READ_ONLY: Self = Self::new(Protection::READ);
    pub const READ_WRITE: Self = Self::new(Protection::RW);
    pub const READ_EXEC: Self = Self::new(Protection::RX);

    /// Strongly ordered read-write device memory, never executable.
    pub const MMIO: Self = Self::new(Protection::RW).with_memory_type(MemoryType::DeviceNGnRnE);

    #[inline]
    #[must_use]
    pub const fn with_memory_type(mut self, memory_type: MemoryType) -> Self {
        self.memory_type = memory_type;
        self
    }

    #[inline]
    #[must_use]
    pub const fn with_shareability(mut self, shareability: Shareability) -> Self {
        self.shareability = shareability;
        self
    }

    #[inline]
    #[must_use]
    pub const fn with_prot(mut self, prot: Protection) -> Self {
        self.prot = prot;
        self
    }
}
