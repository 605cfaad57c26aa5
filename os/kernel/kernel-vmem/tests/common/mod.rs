#![allow(dead_code)]

use kernel_alloc::{BuddyFrameAlloc, FrameAlloc};
use kernel_memory_addresses::{DirectMap, FRAME_SIZE, PhysicalAddress, PhysicalRange};
use kernel_vmem::{PageTable, PteCodec};

/// Pretend physical base of the test RAM; 1 GiB-aligned.
pub const PHYS_BASE: u64 = 0x4000_0000;

/// Frames of simulated RAM used by most tests (8 MiB).
pub const RAM_FRAMES: usize = 2048;

#[repr(C, align(4096))]
struct Frame([u8; 4096]);

/// Host memory standing in for physical RAM at `PHYS_BASE`.
pub struct Ram {
    frames: Vec<Frame>,
    offset: u64,
}

impl Ram {
    pub fn new(frames: usize) -> Self {
        let mut frames: Vec<Frame> = (0..frames).map(|_| Frame([0; 4096])).collect();
        let host = frames.as_mut_ptr() as u64;
        Self {
            frames,
            offset: host.wrapping_sub(PHYS_BASE),
        }
    }

    pub fn range(&self) -> PhysicalRange {
        PhysicalRange::from_len(PhysicalAddress::new(PHYS_BASE), self.len()).unwrap()
    }

    pub fn len(&self) -> u64 {
        self.frames.len() as u64 * FRAME_SIZE
    }

    /// Direct map covering all of the RAM.
    pub fn map(&self) -> DirectMap {
        DirectMap::with_offset(self.offset, self.range())
    }

    /// Direct map covering only the first `frames` frames.
    pub fn partial_map(&self, frames: u64) -> DirectMap {
        let range =
            PhysicalRange::from_len(PhysicalAddress::new(PHYS_BASE), frames * FRAME_SIZE).unwrap();
        DirectMap::with_offset(self.offset, range)
    }

    /// Allocator managing all of the RAM.
    pub fn allocator(&self) -> BuddyFrameAlloc {
        let frames = BuddyFrameAlloc::new(self.map());
        frames.add_memory(self.range().start(), self.len()).unwrap();
        frames
    }
}

/// Fresh table in format `A` over `ram`.
pub fn page_table<'f, A: PteCodec>(
    ram: &Ram,
    frames: &'f BuddyFrameAlloc,
) -> PageTable<'f, A, BuddyFrameAlloc> {
    PageTable::new(frames, ram.map()).unwrap()
}

/// A physical address outside the simulated RAM, for fixed-frame mappings.
pub fn device(offset: u64) -> PhysicalAddress {
    PhysicalAddress::new(0x1_0000_0000 + offset)
}

/// Instantiate generic test functions once per paging format.
#[allow(unused_macros)]
macro_rules! for_each_codec {
    ($($name:ident),* $(,)?) => {
        mod x86_64 {
            $( #[test] fn $name() { super::$name::<kernel_vmem::X86_64>(); } )*
        }
        mod aarch64 {
            $( #[test] fn $name() { super::$name::<kernel_vmem::Aarch64>(); } )*
        }
        mod riscv64 {
            $( #[test] fn $name() { super::$name::<kernel_vmem::Riscv64>(); } )*
        }
    };
}
