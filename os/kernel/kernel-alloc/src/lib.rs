//! # Physical Frame Allocation
//!
//! This crate owns physical memory. Every frame the page-table code uses,
//! for intermediate tables or as the target of an "any frame" mapping, is
//! obtained from and returned to a [`FrameAlloc`] implementation.
//!
//! ## Contract
//!
//! ```text
//! alloc(n)              -> paddr | OutOfMemory      n contiguous 4 KiB frames
//! free(paddr, n)        -> () | NotAllocated | OutOfRange
//! add_memory(start, len)                            register a physical region
//! free_bytes()          -> u64                      remaining capacity
//! ```
//!
//! Running out of memory is reported, never fatal; the caller decides whether
//! it can continue.
//!
//! ## Buddy Strategy ([`BuddyFrameAlloc`])
//!
//! Memory is managed as power-of-two blocks of frames that are naturally
//! aligned in the *physical* address space, so a block of 512 frames is
//! always 2 MiB-aligned and can back a large page directly.
//!
//! Each registered region becomes a *zone* whose bookkeeping is carved out of
//! the region itself:
//!
//! ```text
//! region start                                                region end
//! ┌──────────────┬──────────────┬───────────────┬───────────────────────┐
//! │ ZoneHeader   │ state[frames]│ links[frames] │ managed frames ...    │
//! └──────────────┴──────────────┴───────────────┴───────────────────────┘
//!  <────────── metadata_size(frames), page-rounded ─────────>
//! ```
//!
//! The metadata size is a pure function of the region size
//! ([`metadata_size`]), computed before any byte of the region is touched.
//! Only the metadata bytes are written, through the [`DirectMap`]; the managed
//! frames themselves are never dereferenced by the allocator.
//!
//! - `state` holds one byte per frame: the order of the free block that starts
//!   at this frame, or zero.
//! - `links` holds a doubly linked free list node per frame; only nodes of
//!   free block heads are meaningful.
//! - Freeing merges eagerly with the buddy block (`frame ^ (1 << order)`).
//!
//! ## Concurrency
//!
//! [`BuddyFrameAlloc`] serializes all operations with a
//! [`SpinLock`](kernel_sync::SpinLock), so one allocator can be shared by
//! every page table and every CPU drawing from the same pool.
//!
//! [`DirectMap`]: kernel_memory_addresses::DirectMap

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod buddy;
mod frame_alloc;

pub use buddy::{BuddyFrameAlloc, MAX_ORDER, metadata_size};
pub use frame_alloc::{FrameAlloc, FrameAllocError};
