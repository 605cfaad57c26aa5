//! # Memory-Management Configuration
//!
//! Compile-time constants shared by the frame allocator and the page-table
//! code, plus the boot-time description of physical memory handed over by
//! the boot loader.
//!
//! ## Modules
//!
//! ### Memory Layout ([`memory`])
//! Per-architecture placement of the direct map, the number of CPUs that can
//! hold an active page table, and the size of the bootstrap page cache.
//!
//! ### Boot Memory Map ([`boot`])
//! `#[repr(C)]` descriptors of the physical memory regions the boot loader
//! discovered, consumed when registering memory with the frame allocator.
//!
//! ```text
//! Direct map (x86_64 / riscv64):
//!
//! 0xffff_ff80_0000_0000 ┌────────────────────────────┐ DIRECTMAP_AREA_START
//!                       │  paddr 0 .. 512 GiB        │
//!                       │  (vaddr = paddr + START)   │
//! 0xffff_ffff_ffff_ffff └────────────────────────────┘
//! ```
//!
//! All layout values are validated by `const` assertions so an inconsistent
//! configuration fails the build rather than the boot.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod boot;
pub mod memory;
