//! # Architecture-neutral table walk
//!
//! Every operation descends from the root one level at a time:
//!
//! ```text
//! Start → Descend(level) → { allocate table | follow table } → … → Leaf(level)
//!       → install / remove / rewrite → prune empty tables → Done
//! ```
//!
//! Bits are only ever produced and interpreted by the codec `A`.
//!
//! ## Guarantees
//! - `map` is all-or-nothing: on failure every leaf, table and frame created
//!   by the call is removed again before the error is returned.
//! - `unmap` and `set_attributes` reject ranges that are only partly mapped
//!   before touching anything.
//! - A large leaf only partly covered by `unmap`/`set_attributes` is split
//!   into a table of next-level leaves first, so the rest stays mapped.
//! - Tables left empty are freed on the way back up.

use crate::pte::ENTRIES_PER_TABLE;
use crate::table::TableFrame;
use crate::{
    CloneFlags, Features, MapFlags, MapTarget, PageAttrs, PageLevel, PageTable, PagingError, Pte,
    PteCodec, TlbFlush, UnmapFlags,
};
use kernel_alloc::{FrameAlloc, FrameAllocError};
use kernel_memory_addresses::{FRAME_SIZE, PhysicalAddress, Size4K, VirtualAddress};
use log::{debug, trace, warn};

/// Deepest supported walk.
const MAX_LEVELS: usize = 5;

/// Outcome of a read-only descent.
#[derive(Copy, Clone)]
enum Walk {
    /// A leaf maps the address.
    Leaf {
        table: TableFrame,
        index: usize,
        level: PageLevel,
        pte: Pte,
    },
    /// Nothing is mapped in the `level`-sized region around the address.
    Absent { level: PageLevel },
}

/// Start of the next `level`-sized region after the one holding `va`.
fn next_boundary(va: VirtualAddress, level: PageLevel) -> Option<VirtualAddress> {
    va.align_down_to(level.size()).checked_add(level.size())
}

impl<A: PteCodec, F: FrameAlloc> PageTable<'_, A, F> {
    // ---------------------------------------------------------------------
    // Public operations
    // ---------------------------------------------------------------------

    /// Map `pages` 4 KiB pages at `va`.
    ///
    /// With [`MapTarget::Frame`] the pages map the contiguous physical run
    /// starting there; with [`MapTarget::Any`] (or [`MapFlags::ANY_PADDR`])
    /// fresh frames are allocated and become owned by the mapping.
    ///
    /// With [`MapFlags::LARGE`], each step uses the largest leaf whose size
    /// both addresses are aligned to and that fits in the rest of the run.
    /// [`MapFlags::FORCE_LARGE`] and [`MapFlags::FORCE_HUGE`] pin every leaf
    /// to one size instead.
    ///
    /// # Errors
    /// - [`PagingError::InvalidArgument`]: zero pages, misaligned or
    ///   non-canonical addresses, attributes the format cannot encode,
    ///   `ANY_PADDR` combined with a fixed frame, or a forced leaf size the
    ///   addresses and length are not aligned to.
    /// - [`PagingError::Unsupported`]: `LARGE` without large-page support, or
    ///   a forced leaf size the table does not use.
    /// - [`PagingError::AlreadyMapped`]: some page in the range is mapped.
    /// - [`PagingError::OutOfMemory`]: frames ran out.
    ///
    /// Nothing is changed on error.
    pub fn map(
        &mut self,
        va: VirtualAddress,
        target: MapTarget,
        pages: usize,
        attrs: PageAttrs,
        flags: MapFlags,
    ) -> Result<(), PagingError> {
        let len = Self::check_range(va, pages)?;
        if let MapTarget::Frame(pa) = target {
            if flags.contains(MapFlags::ANY_PADDR)
                || !pa.is_aligned::<Size4K>()
                || pa.checked_add(len).is_none()
            {
                return Err(PagingError::InvalidArgument);
            }
        }
        if !A::supports(&attrs, PageLevel::PAGE) {
            return Err(PagingError::InvalidArgument);
        }
        if flags.contains(MapFlags::LARGE)
            && !self.features.intersects(Features::LARGE_PAGES | Features::HUGE_PAGES)
        {
            return Err(PagingError::Unsupported);
        }
        if let Some(level) = flags.forced_level() {
            self.check_forced(level, va, target, len, &attrs, flags)?;
        }

        let mut done = 0;
        while done < pages {
            let offset = done as u64 * FRAME_SIZE;
            let cur = va + offset;
            let frame = match target {
                MapTarget::Frame(pa) => Some(pa + offset),
                MapTarget::Any => None,
            };
            match self.map_step(cur, frame, pages - done, attrs, flags) {
                Ok(mapped) => done += mapped,
                Err(e) => {
                    if done > 0 || e != PagingError::AlreadyMapped {
                        warn!("map {va} (+{pages} pages) failed at {cur}: {e}; rolling back");
                    }
                    self.rollback(va, done, target == MapTarget::Any);
                    self.prune(cur);
                    return Err(e);
                }
            }
        }
        trace!("mapped {va} (+{pages} pages) to {target:?}");
        Ok(())
    }

    /// Map a single page.
    ///
    /// # Errors
    /// See [`map`](Self::map).
    pub fn map_page(
        &mut self,
        va: VirtualAddress,
        target: MapTarget,
        attrs: PageAttrs,
        flags: MapFlags,
    ) -> Result<(), PagingError> {
        self.map(va, target, 1, attrs, flags)
    }

    /// Map the physically contiguous run `[pa, pa + pages * 4 KiB)` at `va`.
    ///
    /// # Errors
    /// See [`map`](Self::map).
    pub fn map_many(
        &mut self,
        va: VirtualAddress,
        pa: PhysicalAddress,
        pages: usize,
        attrs: PageAttrs,
        flags: MapFlags,
    ) -> Result<(), PagingError> {
        self.map(va, MapTarget::Frame(pa), pages, attrs, flags)
    }

    /// Remove the mapping of `pages` pages at `va`.
    ///
    /// Frames go back to the allocator unless [`UnmapFlags::KEEP_FRAMES`] is
    /// set. Frames the allocator does not own are left alone.
    ///
    /// # Errors
    /// - [`PagingError::NotMapped`]: no page in the range is mapped.
    /// - [`PagingError::InvalidArgument`]: misaligned, or only partly mapped.
    /// - [`PagingError::OutOfMemory`]: a large leaf straddling an end of the
    ///   range could not be split. Nothing is removed in that case.
    pub fn unmap(
        &mut self,
        va: VirtualAddress,
        pages: usize,
        flags: UnmapFlags,
    ) -> Result<TlbFlush, PagingError> {
        let len = Self::check_range(va, pages)?;
        self.check_fully_mapped(va, len)?;
        self.split_at(va)?;
        if let Some(end) = va.checked_add(len) {
            self.split_at(end)?;
        }
        self.remove_range(va, len, !flags.contains(UnmapFlags::KEEP_FRAMES));
        trace!("unmapped {va} (+{pages} pages), {flags:?}");
        Ok(TlbFlush::new(va, pages))
    }

    /// Unmap a single page.
    ///
    /// # Errors
    /// See [`unmap`](Self::unmap).
    pub fn unmap_page(
        &mut self,
        va: VirtualAddress,
        flags: UnmapFlags,
    ) -> Result<TlbFlush, PagingError> {
        self.unmap(va, 1, flags)
    }

    /// Drop the alias at `va` while the frames stay owned elsewhere;
    /// [`unmap`](Self::unmap) with [`UnmapFlags::KEEP_FRAMES`].
    ///
    /// # Errors
    /// See [`unmap`](Self::unmap).
    pub fn unshare(&mut self, va: VirtualAddress, pages: usize) -> Result<TlbFlush, PagingError> {
        self.unmap(va, pages, UnmapFlags::KEEP_FRAMES)
    }

    /// Raw leaf entry mapping `va` and the level it was found at.
    ///
    /// # Errors
    /// [`PagingError::NotMapped`] if nothing maps `va`,
    /// [`PagingError::InvalidArgument`] if `va` is not canonical.
    pub fn lookup(&self, va: VirtualAddress) -> Result<(Pte, PageLevel), PagingError> {
        if !A::is_canonical(va) {
            return Err(PagingError::InvalidArgument);
        }
        match self.find(va) {
            Walk::Leaf { pte, level, .. } => Ok((pte, level)),
            Walk::Absent { .. } => Err(PagingError::NotMapped),
        }
    }

    /// Leaf entry mapping `va`, or [`Pte::INVALID`].
    #[must_use]
    pub fn virt_to_pte(&self, va: VirtualAddress) -> Pte {
        self.lookup(va).map_or(Pte::INVALID, |(pte, _)| pte)
    }

    /// Physical address `va` translates to, with the leaf's attributes.
    ///
    /// # Errors
    /// See [`lookup`](Self::lookup).
    pub fn translate(
        &self,
        va: VirtualAddress,
    ) -> Result<(PhysicalAddress, PageAttrs), PagingError> {
        let (pte, level) = self.lookup(va)?;
        let offset = va.as_u64() & (level.size() - 1);
        Ok((A::paddr(pte, level) + offset, A::decode_attrs(pte, level)))
    }

    /// Rewrite the attributes of `pages` mapped pages at `va`, keeping frames.
    ///
    /// # Errors
    /// - [`PagingError::InvalidArgument`]: misaligned, partly mapped, or
    ///   attributes the format cannot encode.
    /// - [`PagingError::NotMapped`]: nothing in the range is mapped.
    /// - [`PagingError::OutOfMemory`]: a straddling large leaf could not be
    ///   split. Nothing is changed in that case.
    pub fn set_attributes(
        &mut self,
        va: VirtualAddress,
        pages: usize,
        attrs: PageAttrs,
    ) -> Result<TlbFlush, PagingError> {
        let len = Self::check_range(va, pages)?;
        if !A::supports(&attrs, PageLevel::PAGE) {
            return Err(PagingError::InvalidArgument);
        }
        self.check_fully_mapped(va, len)?;
        self.split_at(va)?;
        if let Some(end) = va.checked_add(len) {
            self.split_at(end)?;
        }

        let mut cur = va;
        while cur.as_u64() - va.as_u64() < len {
            let Walk::Leaf { table, index, level, pte } = self.find(cur) else {
                break;
            };
            table.set(index, A::change_attrs(pte, attrs, level));
            let Some(next) = next_boundary(cur, level) else {
                break;
            };
            cur = next;
        }
        trace!("attributes of {va} (+{pages} pages) set to {attrs:?}");
        Ok(TlbFlush::new(va, pages))
    }

    /// Free every table frame, and unless [`UnmapFlags::KEEP_FRAMES`] every
    /// leaf frame, then the root.
    ///
    /// The table must not be active on any CPU.
    pub fn destroy(mut self, flags: UnmapFlags) {
        let free_leaves = !flags.contains(UnmapFlags::KEEP_FRAMES);
        self.destroy_table(self.root, A::root_level(), free_leaves);
        self.release_table(self.root);
        self.cache.release(self.frames);
        debug!("{}: destroyed table at {}", A::NAME, self.root);
    }

    /// Deep copy of `src`'s table hierarchy, drawing tables from the same
    /// frame allocator.
    ///
    /// Leaf entries are copied as they are, so both tables map the same
    /// frames afterwards: all but one of them must be torn down with
    /// [`UnmapFlags::KEEP_FRAMES`]. With [`CloneFlags::ROOT_ONLY`] the new
    /// table is empty and maps nothing, not even the kernel.
    ///
    /// # Errors
    /// [`PagingError::OutOfMemory`] if table frames run out. The partial copy
    /// is freed again.
    pub fn clone_from(src: &Self, flags: CloneFlags) -> Result<Self, PagingError> {
        let mut pt = Self::with_root(src.frames, src.map, PhysicalAddress::zero());
        pt.bootstrapping = src.bootstrapping;
        pt.kernel = src.kernel;
        pt.features = src.features;
        pt.root = pt.alloc_table()?;
        if flags.contains(CloneFlags::ROOT_ONLY) {
            return Ok(pt);
        }

        match pt.copy_table(src, src.root, pt.root, A::root_level()) {
            Ok(()) => {
                debug!("{}: cloned table {} into {}", A::NAME, src.root, pt.root);
                Ok(pt)
            }
            Err(e) => {
                warn!("{}: cloning table {} failed: {e}", A::NAME, src.root);
                pt.destroy(UnmapFlags::KEEP_FRAMES);
                Err(e)
            }
        }
    }

    // ---------------------------------------------------------------------
    // Walk primitives
    // ---------------------------------------------------------------------

    /// `pages` pages at `va` as a byte length, if the range is acceptable.
    fn check_range(va: VirtualAddress, pages: usize) -> Result<u64, PagingError> {
        if pages == 0 || !va.is_aligned::<Size4K>() {
            return Err(PagingError::InvalidArgument);
        }
        let len = (pages as u64)
            .checked_mul(FRAME_SIZE)
            .ok_or(PagingError::InvalidArgument)?;
        if !A::is_canonical_range(va, len) {
            return Err(PagingError::InvalidArgument);
        }
        Ok(len)
    }

    /// Validate a `map` request pinned to leaves of `level`.
    fn check_forced(
        &self,
        level: PageLevel,
        va: VirtualAddress,
        target: MapTarget,
        len: u64,
        attrs: &PageAttrs,
        flags: MapFlags,
    ) -> Result<(), PagingError> {
        if flags.contains(MapFlags::FORCE_LARGE | MapFlags::FORCE_HUGE) {
            return Err(PagingError::InvalidArgument);
        }
        let feature = if level == PageLevel::HUGE {
            Features::HUGE_PAGES
        } else {
            Features::LARGE_PAGES
        };
        if !self.features.contains(feature) || !A::leaf_allowed(level) {
            return Err(PagingError::Unsupported);
        }
        let size = level.size();
        let frame_aligned = match target {
            MapTarget::Frame(pa) => pa.is_aligned_to(size),
            MapTarget::Any => true,
        };
        if !va.is_aligned_to(size)
            || !len.is_multiple_of(size)
            || !frame_aligned
            || !A::supports(attrs, level)
        {
            return Err(PagingError::InvalidArgument);
        }
        Ok(())
    }

    /// Descend without changing anything.
    fn find(&self, va: VirtualAddress) -> Walk {
        let mut table = self.table(self.root);
        let mut level = A::root_level();
        loop {
            let index = A::index(va, level);
            let pte = table.get(index);
            if !A::is_present(pte) {
                return Walk::Absent { level };
            }
            if A::is_leaf(pte, level) {
                return Walk::Leaf {
                    table,
                    index,
                    level,
                    pte,
                };
            }
            let Some(lower) = level.lower() else {
                return Walk::Absent { level };
            };
            table = self.table(A::paddr(pte, level));
            level = lower;
        }
    }

    /// `NotMapped` if nothing in `[va, va + len)` is mapped,
    /// `InvalidArgument` if only part of it is.
    fn check_fully_mapped(&self, va: VirtualAddress, len: u64) -> Result<(), PagingError> {
        let (mut mapped, mut holes) = (false, false);
        let mut cur = va;
        while cur.as_u64() - va.as_u64() < len {
            let level = match self.find(cur) {
                Walk::Leaf { level, .. } => {
                    mapped = true;
                    level
                }
                Walk::Absent { level } => {
                    holes = true;
                    level
                }
            };
            let Some(next) = next_boundary(cur, level) else {
                break;
            };
            cur = next;
        }
        match (mapped, holes) {
            (false, _) => Err(PagingError::NotMapped),
            (true, true) => Err(PagingError::InvalidArgument),
            (true, false) => Ok(()),
        }
    }

    /// Table at `target` on the path to `va`, creating missing tables.
    fn ensure_path(
        &mut self,
        va: VirtualAddress,
        target: PageLevel,
    ) -> Result<TableFrame, PagingError> {
        let mut table = self.table(self.root);
        let mut level = A::root_level();
        while level > target {
            let index = A::index(va, level);
            let pte = table.get(index);
            let next = if !A::is_present(pte) {
                let fresh = self.alloc_table()?;
                table.set(index, A::encode_table(fresh));
                trace!("new table {fresh} at {level:?} for {va}");
                fresh
            } else if A::is_leaf(pte, level) {
                return Err(PagingError::AlreadyMapped);
            } else {
                A::paddr(pte, level)
            };
            table = self.table(next);
            level = PageLevel::new(level.get() - 1);
        }
        Ok(table)
    }

    /// Largest leaf level usable for the next step of a mapping.
    fn leaf_level(
        &self,
        va: VirtualAddress,
        frame: Option<PhysicalAddress>,
        remaining: usize,
        attrs: &PageAttrs,
        flags: MapFlags,
    ) -> PageLevel {
        if !flags.contains(MapFlags::LARGE) {
            return PageLevel::PAGE;
        }
        [
            (PageLevel::HUGE, Features::HUGE_PAGES),
            (PageLevel::LARGE, Features::LARGE_PAGES),
        ]
        .into_iter()
        .find(|&(level, feature)| {
            self.features.contains(feature)
                && A::leaf_allowed(level)
                && A::supports(attrs, level)
                && remaining >= level.frames()
                && va.is_aligned_to(level.size())
                && frame.is_none_or(|pa| pa.is_aligned_to(level.size()))
        })
        .map_or(PageLevel::PAGE, |(level, _)| level)
    }

    /// Install one leaf at `va`; returns the number of 4 KiB pages it covers.
    fn map_step(
        &mut self,
        va: VirtualAddress,
        frame: Option<PhysicalAddress>,
        remaining: usize,
        attrs: PageAttrs,
        flags: MapFlags,
    ) -> Result<usize, PagingError> {
        let forced = flags.forced_level();
        let mut level =
            forced.unwrap_or_else(|| self.leaf_level(va, frame, remaining, &attrs, flags));
        loop {
            let table = self.ensure_path(va, level)?;
            let index = A::index(va, level);
            let pte = table.get(index);
            if A::is_present(pte) {
                // A table where a large leaf would go: use smaller leaves.
                if level.is_page() || A::is_leaf(pte, level) || forced.is_some() {
                    return Err(PagingError::AlreadyMapped);
                }
                level = self.smaller_leaf(level);
                continue;
            }

            let paddr = match frame {
                Some(pa) => pa,
                None => match self.frames.alloc(level.frames()) {
                    Ok(pa) => pa,
                    Err(FrameAllocError::OutOfMemory) if !level.is_page() && forced.is_none() => {
                        level = self.smaller_leaf(level);
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                },
            };
            table.set(index, A::encode_leaf(paddr, attrs, level, None));
            trace!("leaf {va} -> {paddr} at {level:?}");
            return Ok(level.frames());
        }
    }

    /// Next leaf level to try after `level` did not work out.
    fn smaller_leaf(&self, level: PageLevel) -> PageLevel {
        match level.lower() {
            Some(PageLevel::LARGE) if !self.features.contains(Features::LARGE_PAGES) => {
                PageLevel::PAGE
            }
            Some(lower) => lower,
            None => PageLevel::PAGE,
        }
    }

    /// Undo the first `pages` pages of a failed `map`.
    fn rollback(&self, va: VirtualAddress, pages: usize, owned: bool) {
        if pages > 0 {
            self.remove_range(va, pages as u64 * FRAME_SIZE, owned);
        }
    }

    /// Clear every leaf in `[va, va + len)`; leaves must not straddle the ends.
    fn remove_range(&self, va: VirtualAddress, len: u64, free_frames: bool) {
        let mut cur = va;
        while cur.as_u64() - va.as_u64() < len {
            let level = match self.find(cur) {
                Walk::Leaf {
                    table,
                    index,
                    level,
                    pte,
                } => {
                    table.set(index, Pte::INVALID);
                    if free_frames {
                        self.release_frames(A::paddr(pte, level), level.frames());
                    }
                    self.prune(cur);
                    level
                }
                Walk::Absent { level } => level,
            };
            let Some(next) = next_boundary(cur, level) else {
                break;
            };
            cur = next;
        }
    }

    /// Split large leaves until none straddles `boundary`.
    fn split_at(&mut self, boundary: VirtualAddress) -> Result<(), PagingError> {
        loop {
            match self.find(boundary) {
                Walk::Leaf {
                    table,
                    index,
                    level,
                    pte,
                } if !level.is_page() && !boundary.is_aligned_to(level.size()) => {
                    self.split(table, index, level, pte)?;
                }
                _ => return Ok(()),
            }
        }
    }

    /// Replace the large leaf `pte` by a table of next-level leaves with the
    /// same frames and attributes.
    fn split(
        &mut self,
        table: TableFrame,
        index: usize,
        level: PageLevel,
        pte: Pte,
    ) -> Result<(), PagingError> {
        let Some(lower) = level.lower() else {
            return Ok(());
        };
        let attrs = A::decode_attrs(pte, level);
        if !A::supports(&attrs, lower) {
            return Err(PagingError::Unsupported);
        }
        let base = A::paddr(pte, level);
        let fresh = self.alloc_table()?;
        let sub = self.table(fresh);
        for i in 0..ENTRIES_PER_TABLE {
            let pa = base + i as u64 * lower.size();
            sub.set(i, A::encode_leaf(pa, attrs, lower, Some(pte)));
        }
        table.set(index, A::encode_table(fresh));
        trace!("split {level:?} leaf at {base} into table {fresh}");
        Ok(())
    }

    /// Free empty tables on the path to `va`, bottom-up. The root stays.
    fn prune(&self, va: VirtualAddress) {
        let root = self.table(self.root);
        let mut path = [(root, 0usize); MAX_LEVELS];
        let mut depth = 0;

        let mut table = root;
        let mut level = A::root_level();
        loop {
            let index = A::index(va, level);
            path[depth] = (table, index);
            depth += 1;
            let pte = table.get(index);
            if !A::is_present(pte) || A::is_leaf(pte, level) || depth == MAX_LEVELS {
                break;
            }
            let Some(lower) = level.lower() else {
                break;
            };
            table = self.table(A::paddr(pte, level));
            level = lower;
        }

        for i in (1..depth).rev() {
            let (child, _) = path[i];
            if !child.is_empty() {
                break;
            }
            let (parent, slot) = path[i - 1];
            parent.set(slot, Pte::INVALID);
            trace!("pruned empty table {}", child.paddr());
            self.release_table(child.paddr());
        }
    }

    /// Copy the entries of `src`'s table `from` into this table's `to`,
    /// duplicating every lower-level table on the way.
    fn copy_table(
        &mut self,
        src: &Self,
        from: PhysicalAddress,
        to: PhysicalAddress,
        level: PageLevel,
    ) -> Result<(), PagingError> {
        let source = src.table(from);
        let dest = self.table(to);
        for i in 0..ENTRIES_PER_TABLE {
            let pte = source.get(i);
            if !A::is_present(pte) {
                continue;
            }
            match level.lower() {
                Some(lower) if !A::is_leaf(pte, level) => {
                    let fresh = self.alloc_table()?;
                    // Linked before descending so that a failure below is
                    // cleaned up by `destroy`.
                    dest.set(i, A::encode_table(fresh));
                    self.copy_table(src, A::paddr(pte, level), fresh, lower)?;
                }
                _ => dest.set(i, pte),
            }
        }
        Ok(())
    }

    fn destroy_table(&self, paddr: PhysicalAddress, level: PageLevel, free_leaves: bool) {
        let table = self.table(paddr);
        for i in 0..ENTRIES_PER_TABLE {
            let pte = table.get(i);
            if !A::is_present(pte) {
                continue;
            }
            if A::is_leaf(pte, level) {
                if free_leaves {
                    self.release_frames(A::paddr(pte, level), level.frames());
                }
            } else if let Some(lower) = level.lower() {
                let child = A::paddr(pte, level);
                self.destroy_table(child, lower, free_leaves);
                self.release_table(child);
            }
            table.set(i, Pte::INVALID);
        }
    }

    fn release_table(&self, paddr: PhysicalAddress) {
        self.release_frames(paddr, 1);
    }

    /// Return frames to the allocator; frames it does not own are skipped.
    fn release_frames(&self, paddr: PhysicalAddress, frames: usize) {
        match self.frames.free(paddr, frames) {
            Ok(()) => {}
            Err(FrameAllocError::OutOfRange(_)) => {
                warn!("{paddr} (+{frames} frames) is not owned by the frame allocator; left alone");
            }
            Err(e) => warn!("failed to free {paddr} (+{frames} frames): {e}"),
        }
    }
}
