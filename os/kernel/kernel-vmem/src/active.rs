//! # Per-CPU active tables
//!
//! Each CPU runs on its own table root. The registry only records which
//! table a CPU switched to; switching one CPU never touches another's slot.

use crate::{NativeCodec, PageTable};
use core::sync::atomic::{AtomicPtr, Ordering};
use kernel_alloc::BuddyFrameAlloc;
use kernel_info::memory::MAX_CPUS;
use kernel_sync::SpinLock;

/// The kernel's own table type.
pub type KernelPageTable = PageTable<'static, NativeCodec, BuddyFrameAlloc>;

/// One `'static` slot per CPU.
pub struct ActivePageTables<T, const N: usize> {
    slots: [AtomicPtr<T>; N],
}

impl<T: Sync, const N: usize> ActivePageTables<T, N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [const { AtomicPtr::new(core::ptr::null_mut()) }; N],
        }
    }

    /// Record `table` for `cpu`, returning the previous entry.
    ///
    /// # Panics
    /// If `cpu >= N`.
    pub fn set(&self, cpu: usize, table: &'static T) -> Option<&'static T> {
        let new = core::ptr::from_ref(table).cast_mut();
        let old = self.slots[cpu].swap(new, Ordering::AcqRel);
        // SAFETY: slots only ever hold null or pointers from `&'static T`.
        unsafe { old.as_ref() }
    }

    /// Table recorded for `cpu`, or `None` if none was set or `cpu` is out
    /// of range.
    #[must_use]
    pub fn get(&self, cpu: usize) -> Option<&'static T> {
        let ptr = self.slots.get(cpu)?.load(Ordering::Acquire);
        // SAFETY: see `set`.
        unsafe { ptr.as_ref() }
    }

    /// Forget the table recorded for `cpu`.
    ///
    /// # Panics
    /// If `cpu >= N`.
    pub fn clear(&self, cpu: usize) -> Option<&'static T> {
        let old = self.slots[cpu].swap(core::ptr::null_mut(), Ordering::AcqRel);
        // SAFETY: see `set`.
        unsafe { old.as_ref() }
    }
}

impl<T: Sync, const N: usize> Default for ActivePageTables<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Active kernel table of every CPU.
pub static ACTIVE_PAGE_TABLES: ActivePageTables<SpinLock<KernelPageTable>, MAX_CPUS> =
    ActivePageTables::new();

/// The table `cpu` runs on, if it was switched through [`activate`].
#[must_use]
pub fn get_active_page_table(cpu: usize) -> Option<&'static SpinLock<KernelPageTable>> {
    ACTIVE_PAGE_TABLES.get(cpu)
}

/// Switch the executing CPU (`cpu`) to `table` and record it as active.
///
/// # Safety
/// `cpu` must be the index of the executing CPU. See
/// [`PageTable::activate`] for the requirements on the table itself.
#[cfg(any(target_arch = "x86_64", target_arch = "aarch64", target_arch = "riscv64"))]
pub unsafe fn activate(cpu: usize, table: &'static SpinLock<KernelPageTable>) {
    table.with_lock(|pt| unsafe { pt.activate() });
    ACTIVE_PAGE_TABLES.set(cpu, table);
}
