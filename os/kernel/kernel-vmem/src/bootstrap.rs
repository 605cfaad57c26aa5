//! # Building the kernel's own table
//!
//! A new table has to be written through *some* mapping before it can map
//! itself. During [`PageTable::build`] that is the boot loader's identity
//! map, which only covers part of physical memory, so table frames are taken
//! from a [`BootstrapCache`] holding frames known to be reachable through it.
//! Once the new table is active, [`PageTable::finish_bootstrap`] switches to
//! the full direct map and returns the leftover frames.
//!
//! ```text
//!  boot identity map (partial)          kernel direct map (all RAM)
//!  ───────────────────────────          ───────────────────────────
//!  BootstrapCache ─► root, tables  ──►  DIRECTMAP_AREA_START + paddr
//!                                       kernel text (RX) / rodata (R) / data (RW)
//! ```
//!
//! The direct map window spans `[0, DIRECTMAP_PHYS_LIMIT)`, but leaves only
//! exist for the memory known so far. [`PageTable::add_memory`] extends them
//! before new memory reaches the frame allocator.

use crate::{
    Features, MapFlags, MapTarget, PageAttrs, PageTable, PagingError, PteCodec, UnmapFlags,
};
use kernel_alloc::FrameAlloc;
use kernel_info::memory::{DIRECTMAP_AREA_START, DIRECTMAP_PHYS_LIMIT};
use kernel_memory_addresses::{
    DirectMap, FRAME_SIZE, PhysicalAddress, PhysicalRange, Size4K, VirtualAddress,
};
use log::{debug, warn};

/// Small arena of frames reachable through the boot-time mapping.
///
/// Frames are handed out last-in first-out. The arena refills itself from the
/// frame allocator when it runs dry, keeping only frames the current mapping
/// covers.
pub struct BootstrapCache<const N: usize> {
    frames: [PhysicalAddress; N],
    len: usize,
}

impl<const N: usize> BootstrapCache<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frames: [PhysicalAddress::zero(); N],
            len: 0,
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Top the arena up with frames from `frames` that `map` covers.
    ///
    /// Frames outside `map` are returned once the arena is full. Gives up
    /// after `N` such frames or when the allocator runs dry.
    pub fn refill<F: FrameAlloc>(&mut self, frames: &F, map: &DirectMap) {
        let mut rejected = [PhysicalAddress::zero(); N];
        let mut rejects = 0;

        while self.len < N {
            let Ok(paddr) = frames.alloc(1) else {
                break;
            };
            if map.covers_range(paddr, FRAME_SIZE) {
                self.frames[self.len] = paddr;
                self.len += 1;
            } else if rejects < N {
                rejected[rejects] = paddr;
                rejects += 1;
            } else {
                free_or_warn(frames, paddr);
                break;
            }
        }

        for &paddr in &rejected[..rejects] {
            free_or_warn(frames, paddr);
        }
    }

    /// One frame from the arena, refilling it first if empty.
    ///
    /// # Errors
    /// [`PagingError::OutOfMemory`] if no covered frame can be found.
    pub fn take<F: FrameAlloc>(
        &mut self,
        frames: &F,
        map: &DirectMap,
    ) -> Result<PhysicalAddress, PagingError> {
        if self.is_empty() {
            self.refill(frames, map);
        }
        if self.is_empty() {
            return Err(PagingError::OutOfMemory);
        }
        self.len -= 1;
        Ok(self.frames[self.len])
    }

    /// Give every cached frame back to `frames`.
    pub fn release<F: FrameAlloc>(&mut self, frames: &F) {
        for &paddr in &self.frames[..self.len] {
            free_or_warn(frames, paddr);
        }
        self.len = 0;
    }
}

impl<const N: usize> Default for BootstrapCache<N> {
    fn default() -> Self {
        Self::new()
    }
}

fn free_or_warn<F: FrameAlloc>(frames: &F, paddr: PhysicalAddress) {
    if let Err(e) = frames.free(paddr, 1) {
        warn!("bootstrap cache: cannot return {paddr}: {e}");
    }
}

/// Direct map of a table made by [`PageTable::build`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct KernelWindow {
    /// The whole window, `[0, DIRECTMAP_PHYS_LIMIT)`.
    pub(crate) map: DirectMap,
    /// Physical memory that has leaves in the window; 4 KiB aligned.
    pub(crate) mapped: PhysicalRange,
}

impl KernelWindow {
    const fn new() -> Self {
        Self {
            map: DirectMap::new(
                VirtualAddress::new(DIRECTMAP_AREA_START),
                PhysicalRange::new(
                    PhysicalAddress::zero(),
                    PhysicalAddress::new(DIRECTMAP_PHYS_LIMIT),
                ),
            ),
            mapped: PhysicalRange::EMPTY,
        }
    }
}

/// `range` rounded out to 4 KiB, if it fits in the direct map.
fn window_range(range: PhysicalRange) -> Result<PhysicalRange, PagingError> {
    let end = range.end().align_up::<Size4K>().ok_or(PagingError::Unsupported)?;
    if end.as_u64() > DIRECTMAP_PHYS_LIMIT {
        return Err(PagingError::Unsupported);
    }
    Ok(PhysicalRange::new(range.start().align_down::<Size4K>(), end))
}

/// Where the kernel image lives and how it is laid out.
///
/// Sections are consecutive, starting at `paddr` / `vaddr`, in the order
/// text, rodata, data (including bss). Lengths must be 4 KiB multiples.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KernelImage {
    pub paddr: PhysicalAddress,
    pub vaddr: VirtualAddress,
    pub text: u64,
    pub rodata: u64,
    pub data: u64,
}

impl KernelImage {
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.text + self.rodata + self.data
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(offset, len, attrs)` of each section.
    const fn sections(&self) -> [(u64, u64, PageAttrs); 3] {
        [
            (0, self.text, PageAttrs::READ_EXEC),
            (self.text, self.rodata, PageAttrs::READ_ONLY),
            (self.text + self.rodata, self.data, PageAttrs::READ_WRITE),
        ]
    }
}

impl<'f, A: PteCodec, F: FrameAlloc> PageTable<'f, A, F> {
    /// Build the kernel's table from nothing.
    ///
    /// Maps all memory managed by `frames` (which includes every table frame
    /// and the scratch memory later used for the heap) together with the
    /// kernel image's frames read-write and non-executable at
    /// `DIRECTMAP_AREA_START`, using the largest pages available. Then maps
    /// the kernel image at its virtual base with per-section protections.
    /// Memory registered later through [`add_memory`](Self::add_memory) is
    /// added to the direct map as it arrives.
    ///
    /// Until [`finish_bootstrap`](Self::finish_bootstrap), table frames are
    /// written through `boot_map` and taken from a [`BootstrapCache`].
    ///
    /// # Errors
    /// - [`PagingError::OutOfMemory`]: no frame reachable through `boot_map`,
    ///   or the allocator manages no memory.
    /// - [`PagingError::Unsupported`]: physical memory extends past what the
    ///   direct-map area can hold.
    /// - Any error of [`map`](Self::map) for the kernel sections.
    ///
    /// Every frame taken is returned on error.
    pub fn build(
        frames: &'f F,
        boot_map: DirectMap,
        image: &KernelImage,
    ) -> Result<Self, PagingError> {
        let mut pt = Self::with_root(frames, boot_map, PhysicalAddress::zero());
        pt.bootstrapping = true;

        pt.cache.refill(frames, &boot_map);
        if pt.cache.is_empty() {
            return Err(PagingError::OutOfMemory);
        }
        pt.root = pt.alloc_table()?;
        debug!("{}: building kernel table at {}", A::NAME, pt.root);

        match pt.populate(image) {
            Ok(()) => Ok(pt),
            Err(e) => {
                warn!("{}: kernel table build failed: {e}", A::NAME);
                pt.destroy(UnmapFlags::KEEP_FRAMES);
                Err(e)
            }
        }
    }

    fn populate(&mut self, image: &KernelImage) -> Result<(), PagingError> {
        let managed = self.frames.memory_span().ok_or(PagingError::OutOfMemory)?;
        let kernel = PhysicalRange::from_len(image.paddr, image.len())
            .ok_or(PagingError::InvalidArgument)?;
        self.kernel = Some(KernelWindow::new());
        self.extend_direct_map(managed.union(&kernel))?;

        for (offset, len, attrs) in image.sections() {
            if len == 0 {
                continue;
            }
            if !len.is_multiple_of(FRAME_SIZE) {
                return Err(PagingError::InvalidArgument);
            }
            let pages =
                usize::try_from(len / FRAME_SIZE).map_err(|_| PagingError::InvalidArgument)?;
            self.map_many(
                image.vaddr + offset,
                image.paddr + offset,
                pages,
                attrs,
                MapFlags::empty(),
            )?;
        }
        debug!(
            "{}: kernel image {} -> {} ({} KiB)",
            A::NAME,
            image.vaddr,
            image.paddr,
            image.len() / 1024
        );
        Ok(())
    }

    /// Give the kernel direct map leaves for `range`, and for any gap between
    /// it and what is mapped already. No-op for tables not made by `build`.
    ///
    /// Leaves are read-write, non-executable and as large as possible.
    pub(crate) fn extend_direct_map(&mut self, range: PhysicalRange) -> Result<(), PagingError> {
        let Some(mut window) = self.kernel else {
            return Ok(());
        };
        let wanted = window_range(range)?;
        let grown = window.mapped.union(&wanted);
        if grown == window.mapped {
            return Ok(());
        }

        let (below, above) = if window.mapped.is_empty() {
            (grown, PhysicalRange::EMPTY)
        } else {
            (
                PhysicalRange::new(grown.start(), window.mapped.start()),
                PhysicalRange::new(window.mapped.end(), grown.end()),
            )
        };
        // Record each part as soon as it is mapped so a failure in the other
        // leaves the bookkeeping in line with the table.
        if !below.is_empty() {
            self.map_direct(&window.map, below)?;
            window.mapped = window.mapped.union(&below);
            self.kernel = Some(window);
        }
        if !above.is_empty() {
            self.map_direct(&window.map, above)?;
            window.mapped = window.mapped.union(&above);
            self.kernel = Some(window);
        }
        debug!("{}: direct map now covers {:?}", A::NAME, window.mapped);
        Ok(())
    }

    fn map_direct(&mut self, map: &DirectMap, range: PhysicalRange) -> Result<(), PagingError> {
        let large = if self.features.intersects(Features::LARGE_PAGES | Features::HUGE_PAGES) {
            MapFlags::LARGE
        } else {
            MapFlags::empty()
        };
        let pages =
            usize::try_from(range.len() / FRAME_SIZE).map_err(|_| PagingError::Unsupported)?;
        self.map(
            map.to_virt(range.start()),
            MapTarget::Frame(range.start()),
            pages,
            PageAttrs::READ_WRITE,
            large,
        )
    }

    /// Direct map laid out by [`build`](Self::build); `None` for tables that
    /// were not built.
    #[must_use]
    pub const fn kernel_direct_map(&self) -> Option<DirectMap> {
        match self.kernel {
            Some(window) => Some(window.map),
            None => None,
        }
    }

    /// Physical memory that currently has leaves in the kernel direct map;
    /// `None` for tables that were not built.
    #[must_use]
    pub const fn direct_mapped(&self) -> Option<PhysicalRange> {
        match self.kernel {
            Some(window) => Some(window.mapped),
            None => None,
        }
    }

    /// Leave the bootstrap phase once this table is active.
    ///
    /// Switches table access and the frame allocator's bookkeeping to `map`
    /// (normally [`kernel_direct_map`](Self::kernel_direct_map)) and returns
    /// unused bootstrap frames.
    pub fn finish_bootstrap(&mut self, map: DirectMap) {
        self.map = map;
        self.frames.set_direct_map(map);
        self.bootstrapping = false;
        let unused = self.cache.len();
        self.cache.release(self.frames);
        debug!("{}: bootstrap finished, {unused} cached frames returned", A::NAME);
    }
}
