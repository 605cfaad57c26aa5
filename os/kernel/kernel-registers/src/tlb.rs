//! Local TLB maintenance.
//!
//! These only affect the executing CPU. Other CPUs that may cache the same
//! translation must be reached through an inter-processor interrupt.

use kernel_memory_addresses::VirtualAddress;

/// Drop any cached translation for the page containing `va` on this CPU.
///
/// # Safety
/// Privileged instruction; must run in kernel mode.
#[inline]
#[allow(unused_variables)]
pub unsafe fn invalidate_page(va: VirtualAddress) {
    #[cfg(all(feature = "asm", target_arch = "x86_64"))]
    unsafe {
        core::arch::asm!("invlpg [{}]", in(reg) va.as_u64(), options(nostack, preserves_flags));
    }

    #[cfg(all(feature = "asm", target_arch = "aarch64"))]
    unsafe {
        core::arch::asm!(
            "dsb ishst",
            "tlbi vaae1, {}",
            "dsb ish",
            "isb",
            in(reg) va.as_u64() >> 12,
            options(nostack, preserves_flags)
        );
    }

    #[cfg(all(feature = "asm", target_arch = "riscv64"))]
    unsafe {
        core::arch::asm!("sfence.vma {}, zero", in(reg) va.as_u64(), options(nostack));
    }
}

/// Drop every non-global cached translation on this CPU.
///
/// # Safety
/// Privileged instruction; must run in kernel mode.
#[inline]
pub unsafe fn invalidate_all() {
    #[cfg(all(feature = "asm", target_arch = "x86_64"))]
    unsafe {
        core::arch::asm!(
            "mov {tmp}, cr3",
            "mov cr3, {tmp}",
            tmp = out(reg) _,
            options(nostack, preserves_flags)
        );
    }

    #[cfg(all(feature = "asm", target_arch = "aarch64"))]
    unsafe {
        core::arch::asm!(
            "dsb ishst",
            "tlbi vmalle1",
            "dsb ish",
            "isb",
            options(nostack, preserves_flags)
        );
    }

    #[cfg(all(feature = "asm", target_arch = "riscv64"))]
    unsafe {
        core::arch::asm!("sfence.vma zero, zero", options(nostack));
    }
}
