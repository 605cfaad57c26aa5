//! # Virtual Memory Support
//!
//! Page tables for x86-64, `AArch64` and RISC-V Sv48 behind one walker.
//!
//! ## What you get
//! - A [`PageTable`] per address space: map, unmap, protect, look up and
//!   translate virtual ranges; [`build`](PageTable::build) the kernel's own
//!   table from nothing.
//! - A [`PteCodec`] per paging format ([`X86_64`], [`Aarch64`], [`Riscv64`]);
//!   [`NativeCodec`] is the one for the compilation target.
//! - Architecture-neutral [`PageAttrs`] (protection, memory type,
//!   shareability) that each codec translates to its own bits.
//! - A [`TlbFlush`] token for every change that may leave stale
//!   translations behind.
//!
//! ## Virtual Address → Physical Address Walk
//!
//! All three formats use four levels of 512 eight-byte entries over a 48-bit
//! virtual address:
//!
//! ```text
//! | 47‒39 | 38‒30 | 29‒21 | 20‒12 | 11‒0   |
//! |   L3  |   L2  |   L1  |   L0  | Offset |
//! ```
//!
//! Levels are counted from the leaf: level 0 maps 4 KiB, and the root is
//! level 3.
//!
//! ```text
//!   L3 (root) →  L2   →   L1   →   L0   →  Physical Page
//!      │          │        │        │
//!      │          │        │        └───► leaf → 4 KiB page
//!      │          │        └────────────► leaf → 2 MiB page  (LARGE_PAGES)
//!      │          └─────────────────────► leaf → 1 GiB page  (HUGE_PAGES)
//!      └────────────────────────────────► table entry only
//! ```
//!
//! | Level | x86-64 | `AArch64` | RISC-V |
//! |:------|:-------|:----------|:-------|
//! | 3 | PML4E | L0 table | level-3 PTE |
//! | 2 | PDPTE (`PS=1` → 1 GiB) | L1 block | gigapage |
//! | 1 | PDE (`PS=1` → 2 MiB) | L2 block | megapage |
//! | 0 | PTE | L3 page | PTE |
//!
//! Table frames are reached through a [`DirectMap`](kernel_memory_addresses::DirectMap),
//! never through the table being edited.
//!
//! ## Frame ownership
//!
//! Frames come from a [`FrameAlloc`](kernel_alloc::FrameAlloc). Unmapping
//! frees the backing frames unless [`UnmapFlags::KEEP_FRAMES`] is given;
//! there is no reference count, so every alias but the last is removed with
//! [`unshare`](PageTable::unshare).

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod active;
mod arch;
mod attrs;
mod bootstrap;
mod codec;
mod error;
mod features;
mod flags;
mod page_table;
mod pte;
mod table;
mod tlb;
mod walker;

#[cfg(any(target_arch = "x86_64", target_arch = "aarch64", target_arch = "riscv64"))]
pub use crate::active::activate;
pub use crate::active::{
    ACTIVE_PAGE_TABLES, ActivePageTables, KernelPageTable, get_active_page_table,
};
pub use crate::arch::{Aarch64, MAIR_EL1, NativeCodec, Riscv64, X86_64};
pub use crate::attrs::{MemoryType, PageAttrs, Protection, Shareability};
pub use crate::bootstrap::{BootstrapCache, KernelImage};
pub use crate::codec::{PteCodec, RootRegister};
pub use crate::error::PagingError;
pub use crate::features::Features;
pub use crate::flags::{CloneFlags, MapFlags, MapTarget, UnmapFlags};
pub use crate::page_table::PageTable;
pub use crate::pte::{ENTRIES_PER_TABLE, PageLevel, Pte};
pub use crate::tlb::TlbFlush;

/// Paging features of the CPU architecture this kernel is built for.
#[must_use]
pub const fn mm_supported_features() -> Features {
    NativeCodec::FEATURES
}
