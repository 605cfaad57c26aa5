//! Paging formats.
//!
//! All three codecs are plain bit manipulation and build on every host. The
//! one matching the compilation target is [`NativeCodec`]; only that one
//! implements [`RootRegister`](crate::RootRegister).

mod aarch64;
mod riscv64;
mod x86_64;

pub use aarch64::{Aarch64, MAIR_EL1};
pub use riscv64::Riscv64;
pub use x86_64::X86_64;

/// Codec of the architecture being compiled for.
#[cfg(target_arch = "aarch64")]
pub type NativeCodec = Aarch64;

/// Codec of the architecture being compiled for.
#[cfg(target_arch = "riscv64")]
pub type NativeCodec = Riscv64;

/// Codec of the architecture being compiled for.
///
/// Hosts other than aarch64 and riscv64 get x86-64 so the crate builds and
/// tests anywhere.
#[cfg(not(any(target_arch = "aarch64", target_arch = "riscv64")))]
pub type NativeCodec = X86_64;
