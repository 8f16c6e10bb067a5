//! Spin lock that also masks interrupts while held.

use core::ops::{Deref, DerefMut};

use ::spin::{Mutex, MutexGuard};

use super::CriticalSection;

/// A spin lock usable from both task and interrupt context.
///
/// Acquiring it enters a critical section first, so an interrupt handler on
/// the same CPU can never spin on a lock its own interrupted task holds.
pub struct SpinNoIrqLock<T> {
    inner: Mutex<T>,
}

impl<T> SpinNoIrqLock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Masks interrupts, then acquires the lock.
    pub fn lock(&self) -> SpinNoIrqGuard<'_, T> {
        let cs = CriticalSection::enter();
        SpinNoIrqGuard {
            guard: self.inner.lock(),
            _cs: cs,
        }
    }

    /// Acquires the lock inside a critical section the caller already holds.
    ///
    /// Dropping the returned guard releases the lock but leaves interrupts
    /// masked until `cs` itself is dropped.
    pub fn lock_in<'a>(&'a self, _cs: &'a CriticalSection) -> MutexGuard<'a, T> {
        self.inner.lock()
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

/// Guard returned by [`SpinNoIrqLock::lock`].
pub struct SpinNoIrqGuard<'a, T> {
    // Field order matters: the lock is released before interrupts are unmasked.
    guard: MutexGuard<'a, T>,
    _cs: CriticalSection,
}

impl<T> Deref for SpinNoIrqGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for SpinNoIrqGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}
