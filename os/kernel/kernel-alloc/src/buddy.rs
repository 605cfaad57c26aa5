mod zone;

use crate::{FrameAlloc, FrameAllocError};
use kernel_memory_addresses::{DirectMap, FRAME_SIZE, PhysicalAddress, PhysicalRange, Size4K};
use kernel_sync::SpinLock;
use log::debug;
use zone::{NO_ZONE, Zone};

pub use zone::{MAX_ORDER, metadata_size};

/// Buddy allocator over any number of physical regions.
///
/// Each region registered through [`FrameAlloc::add_memory`] keeps its own
/// bookkeeping at its start, reached through the [`DirectMap`] given at
/// construction (or later via [`FrameAlloc::set_direct_map`]).
///
/// ### Example
/// ```no_run
/// # use kernel_alloc::{BuddyFrameAlloc, FrameAlloc};
/// # use kernel_memory_addresses::{DirectMap, PhysicalAddress, PhysicalRange};
/// let ram = PhysicalRange::from_len(PhysicalAddress::new(0x4000_0000), 64 << 20).unwrap();
/// let frames = BuddyFrameAlloc::new(DirectMap::identity(ram));
/// frames.add_memory(ram.start(), ram.len()).unwrap();
/// let table = frames.alloc(1).unwrap();
/// frames.free(table, 1).unwrap();
/// ```
pub struct BuddyFrameAlloc {
    inner: SpinLock<Buddy>,
}

struct Buddy {
    map: DirectMap,
    /// Metadata address of the most recently added zone.
    zones: u64,
    total_frames: u64,
    span: PhysicalRange,
}

impl BuddyFrameAlloc {
    #[must_use]
    pub const fn new(map: DirectMap) -> Self {
        Self {
            inner: SpinLock::new(Buddy {
                map,
                zones: NO_ZONE,
                total_frames: 0,
                span: PhysicalRange::EMPTY,
            }),
        }
    }
}

impl Buddy {
    /// Run `f` on every zone until it returns `Some`.
    fn find_zone<R>(&mut self, mut f: impl FnMut(&mut Zone<'_>) -> Option<R>) -> Option<R> {
        let mut meta = self.zones;
        while meta != NO_ZONE {
            // SAFETY: `meta` was linked by `add_memory` after `Zone::init`, and
            // the lock guarantees no other view exists.
            let mut zone = unsafe { Zone::open(&self.map, PhysicalAddress::new(meta)) };
            if let Some(r) = f(&mut zone) {
                return Some(r);
            }
            meta = zone.next();
        }
        None
    }

    fn add_memory(&mut self, start: PhysicalAddress, len: u64) -> Result<(), FrameAllocError> {
        let region = PhysicalRange::from_len(start, len)
            .ok_or(FrameAllocError::InvalidArgument)?
            .shrink_to::<Size4K>();
        if region.is_empty() {
            return Err(FrameAllocError::RegionTooSmall);
        }

        let meta = region.start();
        let meta_len = metadata_size(region.len() / FRAME_SIZE);
        let first = meta
            .checked_add(meta_len)
            .and_then(PhysicalAddress::align_up::<Size4K>)
            .ok_or(FrameAllocError::RegionTooSmall)?;
        if first >= region.end() {
            return Err(FrameAllocError::RegionTooSmall);
        }
        let frames = (region.end().as_u64() - first.as_u64()) / FRAME_SIZE;
        if frames >= u64::from(u32::MAX) {
            return Err(FrameAllocError::InvalidArgument);
        }

        if self.overlaps_zone(&region) {
            return Err(FrameAllocError::InvalidArgument);
        }
        if !self.map.covers_range(meta, meta_len) {
            return Err(FrameAllocError::OutOfRange(meta));
        }

        let first_frame = first.frame_number::<Size4K>();
        // SAFETY: the metadata range was checked against the map and does not
        // overlap any registered zone.
        let mut zone = unsafe { Zone::init(&self.map, meta, first_frame, frames) };
        zone.set_next(self.zones);
        zone.release(first_frame, frames);

        self.zones = meta.as_u64();
        self.total_frames += frames;
        self.span = self.span.union(&region);

        debug!("frame zone {region:?}: {frames} frames, {meta_len} bytes of metadata");
        Ok(())
    }

    /// Whether `region` touches any registered zone, bookkeeping included.
    fn overlaps_zone(&self, region: &PhysicalRange) -> bool {
        let mut meta = self.zones;
        while meta != NO_ZONE {
            // SAFETY: see `find_zone`.
            let zone = unsafe { Zone::open(&self.map, PhysicalAddress::new(meta)) };
            let existing = PhysicalRange::new(
                PhysicalAddress::new(meta),
                PhysicalAddress::from_frame_number::<Size4K>(zone.end_frame()),
            );
            if existing.overlaps(region) {
                return true;
            }
            meta = zone.next();
        }
        false
    }

    fn alloc(&mut self, frames: usize) -> Result<PhysicalAddress, FrameAllocError> {
        if frames == 0 {
            return Err(FrameAllocError::InvalidArgument);
        }
        let count = frames as u64;
        let order = count.next_power_of_two().trailing_zeros() as usize;
        if order > MAX_ORDER {
            return Err(FrameAllocError::OutOfMemory);
        }

        self.find_zone(|zone| {
            let frame = zone.alloc(order)?;
            let block = 1u64 << order;
            if block > count {
                zone.release(frame + count, block - count);
            }
            Some(PhysicalAddress::from_frame_number::<Size4K>(frame))
        })
        .ok_or(FrameAllocError::OutOfMemory)
    }

    fn free(&mut self, paddr: PhysicalAddress, frames: usize) -> Result<(), FrameAllocError> {
        if frames == 0 || !paddr.is_aligned::<Size4K>() {
            return Err(FrameAllocError::InvalidArgument);
        }
        let first = paddr.frame_number::<Size4K>();
        let count = frames as u64;

        self.find_zone(|zone| {
            if !zone.contains(first, count) {
                return None;
            }
            if let Some(frame) = (first..first + count).find(|&f| zone.is_free(f)) {
                return Some(Err(FrameAllocError::NotAllocated(
                    PhysicalAddress::from_frame_number::<Size4K>(frame),
                )));
            }
            zone.release(first, count);
            Some(Ok(()))
        })
        .unwrap_or(Err(FrameAllocError::OutOfRange(paddr)))
    }

    fn free_frames(&mut self) -> u64 {
        let mut free = 0;
        self.find_zone::<()>(|zone| {
            free += zone.free_frames();
            None
        });
        free
    }
}

impl FrameAlloc for BuddyFrameAlloc {
    fn alloc(&self, frames: usize) -> Result<PhysicalAddress, FrameAllocError> {
        self.inner.with_lock(|b| b.alloc(frames))
    }

    fn free(&self, paddr: PhysicalAddress, frames: usize) -> Result<(), FrameAllocError> {
        self.inner.with_lock(|b| b.free(paddr, frames))
    }

    fn add_memory(&self, start: PhysicalAddress, len: u64) -> Result<(), FrameAllocError> {
        self.inner.with_lock(|b| b.add_memory(start, len))
    }

    fn free_bytes(&self) -> u64 {
        self.inner.with_lock(|b| b.free_frames() * FRAME_SIZE)
    }

    fn total_bytes(&self) -> u64 {
        self.inner.with_lock(|b| b.total_frames * FRAME_SIZE)
    }

    fn memory_span(&self) -> Option<PhysicalRange> {
        self.inner.with_lock(|b| (!b.span.is_empty()).then_some(b.span))
    }

    fn set_direct_map(&self, map: DirectMap) {
        self.inner.with_lock(|b| b.map = map);
    }
}
