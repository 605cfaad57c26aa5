//! # Virtual and Physical Memory Address Types
//!
//! Strongly typed wrappers for the raw addresses handled by the frame
//! allocator and the page-table walker.
//!
//! ## Overview
//!
//! Physical and virtual addresses are distinct newtypes around `u64`, so the
//! compiler rejects code that dereferences a physical address or adds a
//! virtual offset to a physical one:
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`MemoryAddress`] | A raw 64-bit address of either kind; the shared arithmetic core. |
//! | [`PhysicalAddress`] | Host RAM or MMIO as seen by the page-table walker of the CPU. |
//! | [`VirtualAddress`] | A translated address the kernel can actually load from. |
//! | [`PhysicalRange`] | A half-open `[start, end)` span of physical memory. |
//!
//! The only sanctioned way to turn one kind into the other is the
//! [`DirectMap`], a fixed linear window `vaddr = paddr + offset` covering all
//! usable physical memory. Before the kernel owns a direct map the offset is
//! `0` and the boot loader's identity mapping stands in for it.
//!
//! ## Page Sizes
//!
//! The marker types [`Size4K`], [`Size2M`] and [`Size1G`] implement the sealed
//! [`PageSize`] trait and carry the size at the type level:
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let pa = PhysicalAddress::new(0x0020_1234);
//! assert_eq!(pa.align_down::<Size2M>().as_u64(), 0x0020_0000);
//! assert!(!pa.is_aligned::<Size4K>());
//! assert_eq!(pa.offset_in::<Size4K>(), 0x234);
//! ```
//!
//! ## Design Notes
//!
//! - All types are `#[repr(transparent)]` and `Copy`.
//! - Alignment helpers are `const fn` and take the alignment either as a
//!   [`PageSize`] marker or as a runtime power of two (`*_to` variants), the
//!   latter being what the level-generic walker needs.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code, clippy::inline_always)]

mod direct_map;
mod memory_address;
mod page_size;
mod physical_address;
mod physical_range;
mod virtual_address;

pub use direct_map::DirectMap;
pub use memory_address::MemoryAddress;
pub use page_size::{PageSize, Size1G, Size2M, Size4K};
pub use physical_address::PhysicalAddress;
pub use physical_range::PhysicalRange;
pub use virtual_address::VirtualAddress;

/// Size of the base page (and of one physical frame) in bytes.
pub const FRAME_SIZE: u64 = Size4K::SIZE;
