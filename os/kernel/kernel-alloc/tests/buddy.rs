use kernel_alloc::{BuddyFrameAlloc, FrameAlloc, FrameAllocError, metadata_size};
use kernel_memory_addresses::{DirectMap, FRAME_SIZE, PhysicalAddress, PhysicalRange};
use std::collections::HashSet;
use std::sync::Arc;

/// Pretend physical base of the test RAM; 1 GiB-aligned so large blocks can
/// be naturally aligned in "physical" terms.
const PHYS_BASE: u64 = 0x4000_0000;

#[repr(C, align(4096))]
struct Frame([u8; 4096]);

/// Host memory standing in for physical RAM at `PHYS_BASE`.
struct Ram {
    frames: Vec<Frame>,
    offset: u64,
}

impl Ram {
    fn new(frames: usize) -> Self {
        let mut frames: Vec<Frame> = (0..frames).map(|_| Frame([0; 4096])).collect();
        let host = frames.as_mut_ptr() as u64;
        Self {
            frames,
            offset: host.wrapping_sub(PHYS_BASE),
        }
    }

    fn range(&self) -> PhysicalRange {
        PhysicalRange::from_len(PhysicalAddress::new(PHYS_BASE), self.len()).unwrap()
    }

    fn len(&self) -> u64 {
        self.frames.len() as u64 * FRAME_SIZE
    }

    fn map(&self) -> DirectMap {
        DirectMap::with_offset(self.offset, self.range())
    }

    fn allocator(&self) -> BuddyFrameAlloc {
        let frames = BuddyFrameAlloc::new(self.map());
        frames.add_memory(self.range().start(), self.len()).unwrap();
        frames
    }
}

fn meta_frames(frames: u64) -> u64 {
    metadata_size(frames).div_ceil(FRAME_SIZE)
}

#[test]
fn bookkeeping_is_carved_from_the_region() {
    let ram = Ram::new(1024);
    let frames = ram.allocator();

    let expected = (1024 - meta_frames(1024)) * FRAME_SIZE;
    assert_eq!(frames.total_bytes(), expected);
    assert_eq!(frames.free_bytes(), expected);
    assert_eq!(frames.memory_span(), Some(ram.range()));
}

#[test]
fn empty_allocator_reports_no_span() {
    let ram = Ram::new(4);
    let frames = BuddyFrameAlloc::new(ram.map());
    assert_eq!(frames.memory_span(), None);
    assert_eq!(frames.alloc(1), Err(FrameAllocError::OutOfMemory));
}

#[test]
fn metadata_frames_are_never_handed_out() {
    let ram = Ram::new(64);
    let frames = ram.allocator();
    let reserved = meta_frames(64);

    while let Ok(pa) = frames.alloc(1) {
        assert!(pa.as_u64() >= PHYS_BASE + reserved * FRAME_SIZE);
        assert!(pa.as_u64() < PHYS_BASE + ram.len());
    }
    assert_eq!(frames.free_bytes(), 0);
}

#[test]
fn single_frames_are_distinct_and_freeing_restores_capacity() {
    let ram = Ram::new(256);
    let frames = ram.allocator();
    let before = frames.free_bytes();

    let got: Vec<_> = (0..32).map(|_| frames.alloc(1).unwrap()).collect();
    let unique: HashSet<_> = got.iter().map(|pa| pa.as_u64()).collect();
    assert_eq!(unique.len(), got.len());
    assert_eq!(frames.free_bytes(), before - 32 * FRAME_SIZE);

    for pa in got {
        frames.free(pa, 1).unwrap();
    }
    assert_eq!(frames.free_bytes(), before);
}

#[test]
fn power_of_two_blocks_are_naturally_aligned() {
    let ram = Ram::new(2048);
    let frames = ram.allocator();

    let large = frames.alloc(512).unwrap();
    assert_eq!(large.as_u64() % (512 * FRAME_SIZE), 0);

    let sixteen = frames.alloc(16).unwrap();
    assert_eq!(sixteen.as_u64() % (16 * FRAME_SIZE), 0);
}

#[test]
fn odd_sized_requests_consume_exactly_what_was_asked() {
    let ram = Ram::new(256);
    let frames = ram.allocator();
    let before = frames.free_bytes();

    let pa = frames.alloc(3).unwrap();
    assert_eq!(frames.free_bytes(), before - 3 * FRAME_SIZE);

    // The frame after the request went back to the pool.
    frames.free(pa, 3).unwrap();
    assert_eq!(frames.free_bytes(), before);
}

#[test]
fn sub_ranges_of_a_block_may_be_freed_separately() {
    let ram = Ram::new(256);
    let frames = ram.allocator();
    let before = frames.free_bytes();

    let pa = frames.alloc(8).unwrap();
    frames.free(pa + 2 * FRAME_SIZE, 3).unwrap();
    assert_eq!(
        frames.free(pa + 3 * FRAME_SIZE, 1),
        Err(FrameAllocError::NotAllocated(pa + 3 * FRAME_SIZE))
    );
    frames.free(pa, 2).unwrap();
    frames.free(pa + 5 * FRAME_SIZE, 3).unwrap();
    assert_eq!(frames.free_bytes(), before);

    // Everything merged back: the largest block is available again.
    let again = frames.alloc(8).unwrap();
    frames.free(again, 8).unwrap();
}

#[test]
fn freed_frames_merge_back_into_large_blocks() {
    let ram = Ram::new(1024);
    let frames = ram.allocator();

    let mut singles = Vec::new();
    while let Ok(pa) = frames.alloc(1) {
        singles.push(pa);
    }
    assert_eq!(frames.alloc(512), Err(FrameAllocError::OutOfMemory));

    // Free in an interleaved order to exercise merging from both sides.
    let (even, odd): (Vec<_>, Vec<_>) = singles.iter().enumerate().partition(|(i, _)| i % 2 == 0);
    for (_, pa) in odd.into_iter().chain(even) {
        frames.free(*pa, 1).unwrap();
    }
    assert!(frames.alloc(256).is_ok());
}

#[test]
fn double_free_is_reported() {
    let ram = Ram::new(64);
    let frames = ram.allocator();

    let pa = frames.alloc(1).unwrap();
    frames.free(pa, 1).unwrap();
    assert_eq!(frames.free(pa, 1), Err(FrameAllocError::NotAllocated(pa)));
}

#[test]
fn foreign_frames_are_out_of_range() {
    let ram = Ram::new(64);
    let frames = ram.allocator();

    let outside = PhysicalAddress::new(PHYS_BASE + ram.len());
    assert_eq!(frames.free(outside, 1), Err(FrameAllocError::OutOfRange(outside)));

    // Bookkeeping frames are not managed either.
    let meta = PhysicalAddress::new(PHYS_BASE);
    assert_eq!(frames.free(meta, 1), Err(FrameAllocError::OutOfRange(meta)));
}

#[test]
fn invalid_arguments_are_rejected() {
    let ram = Ram::new(64);
    let frames = ram.allocator();

    assert_eq!(frames.alloc(0), Err(FrameAllocError::InvalidArgument));
    let pa = frames.alloc(1).unwrap();
    assert_eq!(frames.free(pa, 0), Err(FrameAllocError::InvalidArgument));
    assert_eq!(frames.free(pa + 1, 1), Err(FrameAllocError::InvalidArgument));
}

#[test]
fn exhaustion_is_reported_and_recoverable() {
    let ram = Ram::new(32);
    let frames = ram.allocator();

    let mut held = Vec::new();
    while let Ok(pa) = frames.alloc(1) {
        held.push(pa);
    }
    assert_eq!(frames.alloc(1), Err(FrameAllocError::OutOfMemory));

    frames.free(held.pop().unwrap(), 1).unwrap();
    assert!(frames.alloc(1).is_ok());
}

#[test]
fn tiny_regions_are_too_small() {
    let ram = Ram::new(4);
    let frames = BuddyFrameAlloc::new(ram.map());

    assert_eq!(
        frames.add_memory(PhysicalAddress::new(PHYS_BASE), FRAME_SIZE),
        Err(FrameAllocError::RegionTooSmall)
    );
    assert_eq!(
        frames.add_memory(PhysicalAddress::new(PHYS_BASE + 1), FRAME_SIZE),
        Err(FrameAllocError::RegionTooSmall)
    );
    assert_eq!(frames.total_bytes(), 0);
}

#[test]
fn regions_outside_the_direct_map_are_rejected() {
    let ram = Ram::new(16);
    let frames = BuddyFrameAlloc::new(ram.map());

    let beyond = PhysicalAddress::new(PHYS_BASE + ram.len());
    assert_eq!(
        frames.add_memory(beyond, 16 * FRAME_SIZE),
        Err(FrameAllocError::OutOfRange(beyond))
    );
}

#[test]
fn several_regions_form_one_pool() {
    let ram = Ram::new(512);
    let frames = BuddyFrameAlloc::new(ram.map());

    let low = PhysicalAddress::new(PHYS_BASE);
    let high = PhysicalAddress::new(PHYS_BASE + 256 * FRAME_SIZE);
    frames.add_memory(low, 128 * FRAME_SIZE).unwrap();
    frames.add_memory(high, 256 * FRAME_SIZE).unwrap();

    let expected = (128 - meta_frames(128) + 256 - meta_frames(256)) * FRAME_SIZE;
    assert_eq!(frames.total_bytes(), expected);
    assert_eq!(
        frames.memory_span(),
        Some(PhysicalRange::new(low, PhysicalAddress::new(PHYS_BASE + ram.len())))
    );

    // Both zones are drawn from before the pool runs dry.
    let mut seen_low = false;
    let mut seen_high = false;
    while let Ok(pa) = frames.alloc(1) {
        seen_low |= pa < high;
        seen_high |= pa >= high;
    }
    assert!(seen_low && seen_high);
}

#[test]
fn overlapping_regions_are_rejected() {
    let ram = Ram::new(256);
    let frames = ram.allocator();

    assert_eq!(
        frames.add_memory(PhysicalAddress::new(PHYS_BASE + 64 * FRAME_SIZE), 64 * FRAME_SIZE),
        Err(FrameAllocError::InvalidArgument)
    );
}

#[test]
fn concurrent_callers_never_share_a_frame() {
    let ram = Ram::new(1024);
    let frames = Arc::new(ram.allocator());
    let before = frames.free_bytes();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let frames = Arc::clone(&frames);
            std::thread::spawn(move || {
                let mut mine = Vec::new();
                for _ in 0..64 {
                    mine.push(frames.alloc(1).unwrap().as_u64());
                }
                mine
            })
        })
        .collect();

    let mut all = HashSet::new();
    for h in handles {
        for pa in h.join().unwrap() {
            assert!(all.insert(pa), "frame {pa:#x} handed out twice");
        }
    }

    for pa in all {
        frames.free(PhysicalAddress::new(pa), 1).unwrap();
    }
    assert_eq!(frames.free_bytes(), before);
}
