//! # Typed Translation-Root Registers
//!
//! Bitfield views of the register that holds the root of the active page
//! table on each supported architecture, plus local TLB maintenance:
//!
//! | Architecture | Register | Module |
//! |--------------|----------|--------|
//! | x86_64 | `CR3` | [`cr3`] |
//! | aarch64 | `TTBR0_EL1` / `TTBR1_EL1` | [`ttbr`] |
//! | riscv64 | `satp` | [`satp`] |
//!
//! The bitfield types compile on every target so their encodings can be
//! tested on the host. Loads and stores need the `asm` feature and only exist
//! for the matching `target_arch`.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

#[cfg(feature = "cr3")]
pub mod cr3;

#[cfg(feature = "satp")]
pub mod satp;

#[cfg(feature = "tlb")]
pub mod tlb;

#[cfg(feature = "ttbr")]
pub mod ttbr;

pub trait LoadRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// Translation-root registers are privileged and need kernel mode.
    unsafe fn load_unsafe() -> Self;
}

pub trait StoreRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// Storing a translation root switches the address space of the current
    /// CPU; the new table must map the code and stack in use.
    unsafe fn store_unsafe(self);
}
