//! # Memory Layout

/// Size of the base page and of one physical frame.
pub const PAGE_SIZE: u64 = 4096;

/// Base of the direct map: physical address `0` appears here.
///
/// The window occupies the last slot of the root table on x86_64 and riscv64
/// (Sv48). On aarch64 it sits at the top of the TTBR0 half.
#[cfg(not(target_arch = "aarch64"))]
pub const DIRECTMAP_AREA_START: u64 = 0xffff_ff80_0000_0000;

/// Base of the direct map: physical address `0` appears here.
#[cfg(target_arch = "aarch64")]
pub const DIRECTMAP_AREA_START: u64 = 0x0000_ff80_0000_0000;

/// Size of the direct map window; one root-table slot with 4-level paging.
pub const DIRECTMAP_AREA_SIZE: u64 = 512 * 1024 * 1024 * 1024;

/// Highest physical address (exclusive) that can be reached through the
/// direct map.
pub const DIRECTMAP_PHYS_LIMIT: u64 = DIRECTMAP_AREA_SIZE;

/// Number of CPUs that can each have their own active page table.
pub const MAX_CPUS: usize = 64;

/// Capacity of the bootstrap page cache used while the kernel's own direct
/// map does not exist yet.
pub const BOOTSTRAP_CACHE_PAGES: usize = 32;

const _: () = {
    assert!(PAGE_SIZE.is_power_of_two());
    assert!(DIRECTMAP_AREA_START.is_multiple_of(DIRECTMAP_AREA_SIZE));
    assert!(DIRECTMAP_AREA_START.checked_add(DIRECTMAP_AREA_SIZE - 1).is_some());
    assert!(BOOTSTRAP_CACHE_PAGES >= 16 && BOOTSTRAP_CACHE_PAGES <= 64);
    assert!(MAX_CPUS > 0);
};
