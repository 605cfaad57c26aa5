//! # Page Table
//!
//! [`PageTable`] is the handle to one virtual address space: the physical
//! root frame, the [`DirectMap`] used to reach table frames, and the
//! [`FrameAlloc`] all frames are drawn from.
//!
//! ## Life cycle
//!
//! ```text
//!   attach(root, region)        build(frames, boot_map, image)
//!          │                              │  bootstrapping: tables come
//!          │                              │  from the BootstrapCache
//!          │                     activate + finish_bootstrap(direct_map)
//!          ▼                              ▼
//!   map / unmap / set_attributes / lookup / translate ...
//!          │
//!          ▼
//!   destroy(flags)
//! ```
//!
//! A table is not internally synchronized. Callers sharing one between CPUs
//! wrap it in a [`SpinLock`](kernel_sync::SpinLock); see
//! [`ACTIVE_PAGE_TABLES`](crate::ACTIVE_PAGE_TABLES).

use crate::bootstrap::{BootstrapCache, KernelWindow};
use crate::table::TableFrame;
use crate::{Features, PagingError, PteCodec, RootRegister};
use core::fmt;
use core::marker::PhantomData;
use kernel_alloc::{FrameAlloc, FrameAllocError};
use kernel_info::boot::MemoryRegion;
use kernel_info::memory::BOOTSTRAP_CACHE_PAGES;
use kernel_memory_addresses::{DirectMap, FRAME_SIZE, PhysicalAddress, PhysicalRange};
use log::{debug, warn};

/// One address space in format `A`, drawing frames from `F`.
pub struct PageTable<'f, A: PteCodec, F: FrameAlloc> {
    pub(crate) root: PhysicalAddress,
    pub(crate) map: DirectMap,
    pub(crate) frames: &'f F,
    pub(crate) cache: BootstrapCache<BOOTSTRAP_CACHE_PAGES>,
    /// Table frames come from `cache` until `finish_bootstrap`.
    pub(crate) bootstrapping: bool,
    /// Direct map installed by `build`, to be used once the table is live.
    pub(crate) kernel: Option<KernelWindow>,
    pub(crate) features: Features,
    pub(crate) _codec: PhantomData<A>,
}

impl<'f, A: PteCodec, F: FrameAlloc> PageTable<'f, A, F> {
    /// Fresh, empty address space with a zeroed root from `frames`.
    ///
    /// `map` must cover every frame `frames` hands out.
    ///
    /// # Errors
    /// [`PagingError::OutOfMemory`] if no root frame can be allocated.
    pub fn new(frames: &'f F, map: DirectMap) -> Result<Self, PagingError> {
        let mut pt = Self::with_root(frames, map, PhysicalAddress::zero());
        pt.root = pt.alloc_table()?;
        Ok(pt)
    }

    pub(crate) const fn with_root(frames: &'f F, map: DirectMap, root: PhysicalAddress) -> Self {
        Self {
            root,
            map,
            frames,
            cache: BootstrapCache::new(),
            bootstrapping: false,
            kernel: None,
            features: A::FEATURES,
            _codec: PhantomData,
        }
    }

    /// Adopt a table the boot loader already built and hand the free region
    /// `[paddr_start, paddr_start + len)` to `frames`.
    ///
    /// The allocator keeps its bookkeeping at the start of the region; the
    /// existing tables are left untouched.
    ///
    /// # Safety
    /// `root` must be a valid root table in format `A` whose frames, like
    /// `frames`' bookkeeping, are reachable through `map`. The region must
    /// not overlap memory in use by that table.
    ///
    /// # Errors
    /// Whatever [`FrameAlloc::add_memory`] reports, mapped to [`PagingError`].
    pub unsafe fn attach(
        frames: &'f F,
        map: DirectMap,
        root: PhysicalAddress,
        paddr_start: PhysicalAddress,
        len: u64,
    ) -> Result<Self, PagingError> {
        frames.add_memory(paddr_start, len)?;
        debug!(
            "{}: attached to root {root}, {} KiB of free memory",
            A::NAME,
            frames.free_bytes() / 1024
        );
        Ok(Self::with_root(frames, map, root))
    }

    /// Register more physical memory with the frame allocator.
    ///
    /// On a table made by [`build`](Self::build) the kernel direct map is
    /// first extended over the new memory, so its frames can hold tables
    /// and allocator bookkeeping. An empty region is ignored.
    ///
    /// # Errors
    /// - [`PagingError::Unsupported`]: the region lies beyond the direct
    ///   map, or the allocator cannot reach it.
    /// - Whatever else [`FrameAlloc::add_memory`] reports, mapped to
    ///   [`PagingError`].
    pub fn add_memory(
        &mut self,
        paddr_start: PhysicalAddress,
        len: u64,
    ) -> Result<(), PagingError> {
        self.add_region(paddr_start, len, false)
    }

    /// Register every free region of a boot memory map.
    ///
    /// Regions too small for their own bookkeeping are skipped.
    ///
    /// # Errors
    /// The first other failure of [`add_memory`](Self::add_memory).
    pub fn add_free_regions(&mut self, regions: &[MemoryRegion]) -> Result<(), PagingError> {
        for region in regions.iter().filter(|r| r.is_free()) {
            self.add_region(PhysicalAddress::new(region.base), region.len, true)?;
        }
        Ok(())
    }

    fn add_region(
        &mut self,
        paddr_start: PhysicalAddress,
        len: u64,
        skip_small: bool,
    ) -> Result<(), PagingError> {
        if len == 0 {
            return Ok(());
        }
        let region =
            PhysicalRange::from_len(paddr_start, len).ok_or(PagingError::InvalidArgument)?;
        self.extend_direct_map(region)?;
        match self.frames.add_memory(paddr_start, len) {
            Ok(()) => Ok(()),
            Err(FrameAllocError::RegionTooSmall) if skip_small => Ok(()),
            Err(e) => {
                warn!("{}: cannot add {region:?}: {e}", A::NAME);
                Err(e.into())
            }
        }
    }

    #[inline]
    #[must_use]
    pub const fn root(&self) -> PhysicalAddress {
        self.root
    }

    #[inline]
    #[must_use]
    pub const fn direct_map(&self) -> DirectMap {
        self.map
    }

    #[inline]
    #[must_use]
    pub const fn frame_allocator(&self) -> &'f F {
        self.frames
    }

    /// Features used by this table; a subset of `A::FEATURES`.
    #[inline]
    #[must_use]
    pub const fn features(&self) -> Features {
        self.features
    }

    /// Stop using features outside `allowed`, e.g. large pages on a
    /// hypervisor that does not back them.
    pub fn restrict_features(&mut self, allowed: Features) {
        self.features &= allowed;
    }

    pub(crate) fn table(&self, paddr: PhysicalAddress) -> TableFrame {
        // SAFETY: only called for the root and for frames reached through
        // table entries of this page table, which all lie in the direct map.
        unsafe { TableFrame::new(&self.map, paddr) }
    }

    /// Zeroed frame for a new table.
    ///
    /// A frame the direct map does not reach is handed back and reported as
    /// [`PagingError::OutOfMemory`].
    pub(crate) fn alloc_table(&mut self) -> Result<PhysicalAddress, PagingError> {
        let paddr = if self.bootstrapping {
            self.cache.take(self.frames, &self.map)?
        } else {
            self.frames.alloc(1)?
        };
        if !self.map.covers_range(paddr, FRAME_SIZE) {
            warn!("{}: table frame {paddr} is outside the direct map", A::NAME);
            if let Err(e) = self.frames.free(paddr, 1) {
                warn!("{}: cannot return {paddr}: {e}", A::NAME);
            }
            return Err(PagingError::OutOfMemory);
        }
        self.table(paddr).zero();
        Ok(paddr)
    }
}

impl<'f, A: PteCodec + RootRegister, F: FrameAlloc> PageTable<'f, A, F> {
    /// [`attach`](Self::attach) to the table the current CPU runs on.
    ///
    /// # Safety
    /// See [`attach`](Self::attach); additionally must run in kernel mode
    /// with paging enabled.
    ///
    /// # Errors
    /// Whatever [`FrameAlloc::add_memory`] reports, mapped to [`PagingError`].
    pub unsafe fn attach_active(
        frames: &'f F,
        map: DirectMap,
        paddr_start: PhysicalAddress,
        len: u64,
    ) -> Result<Self, PagingError> {
        unsafe {
            let root = A::read_root();
            Self::attach(frames, map, root, paddr_start, len)
        }
    }

    /// Make this table the translation of the current CPU.
    ///
    /// Registering it as the CPU's active table is up to the caller
    /// ([`activate`](crate::activate) does both for the kernel table).
    ///
    /// # Safety
    /// The table must map the executing code, the current stack and the
    /// direct map this table (and its allocator) will use afterwards.
    pub unsafe fn activate(&self) {
        debug!("{}: activating root {}", A::NAME, self.root);
        unsafe { A::write_root(self.root) }
    }
}

impl<A: PteCodec, F: FrameAlloc> fmt::Debug for PageTable<'_, A, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageTable")
            .field("format", &A::NAME)
            .field("root", &self.root)
            .field("map", &self.map)
            .field("features", &self.features)
            .field("bootstrapping", &self.bootstrapping)
            .finish_non_exhaustive()
    }
}
