//! Critical sections: the window in which interrupt delivery is masked.
//!
//! Nesting is handled by the caller keeping the token returned on entry and
//! handing exactly that token back on exit; there is no nesting counter.

use core::marker::PhantomData;

use crate::arch::{self, IrqState};

/// Masks interrupts and returns the mask state that was in effect before.
#[inline]
pub fn enter_critical_section() -> IrqState {
    arch::irq_save()
}

/// Restores the mask state returned by the matching [`enter_critical_section`].
#[inline]
pub fn leave_critical_section(flags: IrqState) {
    arch::irq_restore(flags);
}

/// RAII form of [`enter_critical_section`]/[`leave_critical_section`].
///
/// The mask state belongs to the current CPU, so the guard is neither `Send`
/// nor `Sync`.
#[must_use = "the critical section ends as soon as the guard is dropped"]
pub struct CriticalSection {
    flags: IrqState,
    _not_send: PhantomData<*mut ()>,
}

impl CriticalSection {
    #[inline]
    pub fn enter() -> Self {
        Self {
            flags: enter_critical_section(),
            _not_send: PhantomData,
        }
    }

    /// The mask state this section will restore.
    pub fn saved_flags(&self) -> IrqState {
        self.flags
    }
}

impl Drop for CriticalSection {
    #[inline]
    fn drop(&mut self) {
        leave_critical_section(self.flags);
    }
}

impl core::fmt::Debug for CriticalSection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CriticalSection")
            .field("flags", &self.flags)
            .finish()
    }
}
