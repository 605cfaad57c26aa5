//! # Kernel synchronization primitives
//!
//! The memory manager serializes shared state with a single primitive, the
//! [`SpinLock`]. Page tables themselves are not internally synchronized;
//! callers wrap them in a lock for the duration of each call.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod spin_lock;

pub use spin_lock::{SpinLock, SpinLockGuard};
