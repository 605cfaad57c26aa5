//! In-region bookkeeping of one buddy zone.

use core::mem::{align_of, size_of};
use core::ptr;
use kernel_memory_addresses::{DirectMap, PhysicalAddress};

/// Largest block order; `2^MAX_ORDER` frames is 1 GiB.
pub const MAX_ORDER: usize = 18;
pub(super) const ORDERS: usize = MAX_ORDER + 1;

/// End of the zone chain / empty free list.
pub(super) const NO_ZONE: u64 = u64::MAX;
const NIL: u32 = u32::MAX;

/// `state` byte of a free block head; the low bits carry the order.
const FREE_HEAD: u8 = 0x80;

#[repr(C)]
struct ZoneHeader {
    /// Metadata address of the next zone, or [`NO_ZONE`].
    next: u64,
    /// Absolute frame number of the first managed frame.
    first_frame: u64,
    frames: u64,
    free_frames: u64,
    /// Head of the free list per order, as frame index into the zone.
    heads: [u32; ORDERS],
}

#[repr(C)]
#[derive(Copy, Clone)]
struct Link {
    next: u32,
    prev: u32,
}

const STATE_OFFSET: usize = size_of::<ZoneHeader>();

#[allow(clippy::cast_possible_truncation)]
const fn links_offset(frames: u64) -> usize {
    let end = STATE_OFFSET + frames as usize;
    let align = align_of::<Link>();
    (end + align - 1) & !(align - 1)
}

/// Bytes of bookkeeping needed for a zone of `frames` frames.
///
/// Depends only on the frame count, so a caller can size the carve-out
/// before writing anything into the region.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn metadata_size(frames: u64) -> u64 {
    (links_offset(frames) + frames as usize * size_of::<Link>()) as u64
}

/// Mutable view of a zone's metadata.
pub(super) struct Zone<'a> {
    header: &'a mut ZoneHeader,
    state: &'a mut [u8],
    links: &'a mut [Link],
}

impl Zone<'_> {
    /// Write fresh metadata for `frames` frames at `meta`. All frames start
    /// out allocated; the caller releases them.
    ///
    /// # Safety
    /// `[meta, meta + metadata_size(frames))` must be reachable through `map`,
    /// writable, and not aliased by any other live [`Zone`].
    pub(super) unsafe fn init(
        map: &DirectMap,
        meta: PhysicalAddress,
        first_frame: u64,
        frames: u64,
    ) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let state_len = frames as usize;
        let base: *mut u8 = map.as_mut_ptr(meta);
        let header = ZoneHeader {
            next: NO_ZONE,
            first_frame,
            frames,
            free_frames: 0,
            heads: [NIL; ORDERS],
        };
        unsafe {
            ptr::write(base.cast::<ZoneHeader>(), header);
            ptr::write_bytes(base.add(STATE_OFFSET), 0, state_len);
            Self::open(map, meta)
        }
    }

    /// View existing metadata at `meta`.
    ///
    /// # Safety
    /// `meta` must hold metadata written by [`Zone::init`], reachable through
    /// `map`, with no other live [`Zone`] for it.
    #[allow(clippy::cast_possible_truncation)]
    pub(super) unsafe fn open(map: &DirectMap, meta: PhysicalAddress) -> Self {
        let base: *mut u8 = map.as_mut_ptr(meta);
        unsafe {
            let header = &mut *base.cast::<ZoneHeader>();
            let frames = header.frames;
            let state = core::slice::from_raw_parts_mut(base.add(STATE_OFFSET), frames as usize);
            let links = core::slice::from_raw_parts_mut(
                base.add(links_offset(frames)).cast::<Link>(),
                frames as usize,
            );
            Self {
                header,
                state,
                links,
            }
        }
    }

    pub(super) const fn next(&self) -> u64 {
        self.header.next
    }

    pub(super) const fn set_next(&mut self, next: u64) {
        self.header.next = next;
    }

    pub(super) const fn first_frame(&self) -> u64 {
        self.header.first_frame
    }

    pub(super) const fn end_frame(&self) -> u64 {
        self.header.first_frame + self.header.frames
    }

    pub(super) const fn free_frames(&self) -> u64 {
        self.header.free_frames
    }

    /// Whether `[frame, frame + count)` lies inside the zone.
    pub(super) const fn contains(&self, frame: u64, count: u64) -> bool {
        frame >= self.first_frame()
            && match frame.checked_add(count) {
                Some(end) => end <= self.end_frame(),
                None => false,
            }
    }

    #[allow(clippy::cast_possible_truncation)]
    const fn index(&self, frame: u64) -> u32 {
        (frame - self.header.first_frame) as u32
    }

    fn is_head(&self, frame: u64, order: usize) -> bool {
        self.contains(frame, 1 << order)
            && self.state[self.index(frame) as usize] == head_tag(order)
    }

    fn push(&mut self, frame: u64, order: usize) {
        let idx = self.index(frame);
        let old = self.header.heads[order];
        self.links[idx as usize] = Link { next: old, prev: NIL };
        if old != NIL {
            self.links[old as usize].prev = idx;
        }
        self.header.heads[order] = idx;
        self.state[idx as usize] = head_tag(order);
    }

    fn unlink(&mut self, frame: u64, order: usize) {
        let idx = self.index(frame) as usize;
        let Link { next, prev } = self.links[idx];
        if prev == NIL {
            self.header.heads[order] = next;
        } else {
            self.links[prev as usize].next = next;
        }
        if next != NIL {
            self.links[next as usize].prev = prev;
        }
        self.state[idx] = 0;
    }

    fn pop(&mut self, order: usize) -> Option<u64> {
        let idx = self.header.heads[order];
        if idx == NIL {
            return None;
        }
        let frame = self.header.first_frame + u64::from(idx);
        self.unlink(frame, order);
        Some(frame)
    }

    /// Take a naturally aligned block of `2^order` frames.
    pub(super) fn alloc(&mut self, order: usize) -> Option<u64> {
        let (frame, mut k) = (order..ORDERS).find_map(|k| self.pop(k).map(|f| (f, k)))?;
        while k > order {
            k -= 1;
            self.push(frame + (1 << k), k);
        }
        self.header.free_frames -= 1 << order;
        Some(frame)
    }

    /// Whether `frame` lies in some free block.
    pub(super) fn is_free(&self, frame: u64) -> bool {
        (0..ORDERS).any(|order| {
            let head = frame & !((1u64 << order) - 1);
            self.is_head(head, order)
        })
    }

    /// Return `[frame, frame + count)` to the free lists, merging with buddies.
    ///
    /// The caller has checked that the range lies in the zone and is allocated.
    pub(super) fn release(&mut self, mut frame: u64, mut count: u64) {
        self.header.free_frames += count;
        while count > 0 {
            let order = (frame.trailing_zeros() as usize)
                .min(count.ilog2() as usize)
                .min(MAX_ORDER);
            self.release_block(frame, order);
            frame += 1 << order;
            count -= 1 << order;
        }
    }

    fn release_block(&mut self, mut frame: u64, mut order: usize) {
        while order < MAX_ORDER {
            let buddy = frame ^ (1 << order);
            if !self.is_head(buddy, order) {
                break;
            }
            self.unlink(buddy, order);
            frame = frame.min(buddy);
            order += 1;
        }
        self.push(frame, order);
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn head_tag(order: usize) -> u8 {
    FREE_HEAD | order as u8
}
