//! Counting semaphores and mutexes.
//!
//! A semaphore is split in two. [`SemCell`] carries the signed count and the
//! configuration bits and is only ever touched with single atomic operations,
//! which is all the mutex fast path needs. [`SemSlot`] carries the wait-queue,
//! the holder set and the ceiling, and lives inside the kernel lock.
//!
//! The count follows the usual convention: a positive value is the number of
//! free units, a negative value is minus the number of blocked waiters.

mod cancel;
mod holder;
mod inherit;
mod post;
mod wait;
mod waitqueue;

use alloc::vec::Vec;
use core::sync::atomic::{AtomicI32, AtomicU8, Ordering};

use bitflags::bitflags;

pub use holder::{Holder, HolderSet};
pub use waitqueue::{WaitEntry, WaitQueue};

use crate::config::MAX_PRIORITY;
use crate::error::{Error, Result};
use crate::sync::CriticalSection;
use crate::task::{Kernel, KernelInner, Platform, Priority, TaskId};

bitflags! {
    pub struct SemFlags: u8 {
        /// Binary semaphore used for mutual exclusion.
        const MUTEX        = 1 << 0;
        const PRIO_INHERIT = 1 << 1;
        const PRIO_PROTECT = 1 << 2;
    }
}

impl SemFlags {
    const PROTOCOL_MASK: Self = Self::from_bits_truncate(
        Self::PRIO_INHERIT.bits() | Self::PRIO_PROTECT.bits(),
    );
}

/// Priority protocol applied to the holders of a semaphore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    None,
    Inherit,
    /// Holders run at the semaphore's ceiling priority.
    Protect,
}

impl Protocol {
    pub fn from_flags(flags: SemFlags) -> Self {
        if flags.contains(SemFlags::PRIO_INHERIT) {
            Self::Inherit
        } else if flags.contains(SemFlags::PRIO_PROTECT) {
            Self::Protect
        } else {
            Self::None
        }
    }

    pub fn flags(self) -> SemFlags {
        match self {
            Self::None => SemFlags::empty(),
            Self::Inherit => SemFlags::PRIO_INHERIT,
            Self::Protect => SemFlags::PRIO_PROTECT,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SemId(usize);

impl SemId {
    pub const fn as_usize(&self) -> usize {
        self.0
    }
}

impl From<usize> for SemId {
    fn from(id: usize) -> Self {
        Self(id)
    }
}

/// Lock-free half of a semaphore.
pub struct SemCell {
    count: AtomicI32,
    flags: AtomicU8,
}

impl SemCell {
    pub(crate) const fn new() -> Self {
        Self {
            count: AtomicI32::new(0),
            flags: AtomicU8::new(0),
        }
    }

    pub fn count(&self) -> i32 {
        self.count.load(Ordering::Acquire)
    }

    pub fn flags(&self) -> SemFlags {
        SemFlags::from_bits_truncate(self.flags.load(Ordering::Acquire))
    }

    pub(crate) fn reset(&self, count: i32, flags: SemFlags) {
        self.count.store(count, Ordering::Release);
        self.flags.store(flags.bits(), Ordering::Release);
    }

    pub(crate) fn set_flags(&self, flags: SemFlags) {
        self.flags.store(flags.bits(), Ordering::Release);
    }

    /// A plain mutex with no protocol has nothing to track besides the count.
    #[inline]
    pub fn fast_path_eligible(&self) -> bool {
        self.flags() & (SemFlags::MUTEX | SemFlags::PROTOCOL_MASK) == SemFlags::MUTEX
    }

    #[inline]
    pub(crate) fn try_acquire_fast(&self) -> bool {
        self.count
            .compare_exchange(1, 0, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    #[inline]
    pub(crate) fn try_release_fast(&self) -> bool {
        self.count
            .compare_exchange(0, 1, Ordering::Release, Ordering::Relaxed)
            .is_ok()
    }

    /// Takes a unit unconditionally and returns the previous count.
    pub(crate) fn decrement(&self) -> i32 {
        self.count.fetch_sub(1, Ordering::AcqRel)
    }

    /// Gives a unit back and returns the previous count.
    pub(crate) fn increment(&self) -> i32 {
        self.count.fetch_add(1, Ordering::AcqRel)
    }

    /// Takes a unit only if one is free.
    pub(crate) fn try_decrement(&self) -> bool {
        self.count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
                (c > 0).then(|| c - 1)
            })
            .is_ok()
    }
}

/// Guarded half of a semaphore.
pub(crate) struct SemSlot {
    pub in_use: bool,
    /// Mirror of the cell's flags, readable without touching the atomics.
    pub flags: SemFlags,
    pub ceiling: Priority,
    pub waitq: WaitQueue,
    pub holders: HolderSet,
}

impl SemSlot {
    pub fn new(max_holders: usize) -> Self {
        Self {
            in_use: false,
            flags: SemFlags::empty(),
            ceiling: MAX_PRIORITY,
            waitq: WaitQueue::new(),
            holders: HolderSet::new(max_holders),
        }
    }

    pub fn protocol(&self) -> Protocol {
        Protocol::from_flags(self.flags)
    }
}

impl<P: Platform> Kernel<P> {
    pub(crate) fn cell(&self, sem: SemId) -> Option<&SemCell> {
        self.sem_cells.get(sem.0)
    }

    /// The cell of `sem`, provided the handle names an initialized semaphore.
    pub(crate) fn live_cell(&self, inner: &KernelInner, sem: SemId) -> Option<&SemCell> {
        match inner.sems.get(sem.0) {
            Some(slot) if slot.in_use => self.cell(sem),
            _ => None,
        }
    }

    /// Creates a semaphore with `initial` free units.
    pub fn sem_init(&self, initial: u32, flags: SemFlags) -> Result<SemId> {
        let count = i32::try_from(initial).map_err(|_| Error::Invalid)?;
        if flags.contains(SemFlags::PROTOCOL_MASK)
            || (flags.contains(SemFlags::MUTEX) && count > 1)
        {
            return Err(Error::Invalid);
        }
        let mut inner = self.inner.lock();
        let id = inner
            .sems
            .iter()
            .position(|slot| !slot.in_use)
            .ok_or(Error::NoSpace)?;
        let slot = &mut inner.sems[id];
        slot.in_use = true;
        slot.flags = flags;
        slot.ceiling = MAX_PRIORITY;
        self.sem_cells[id].reset(count, flags);
        trace!("sem_init {:?}: count {} {:?}", SemId(id), count, flags);
        Ok(SemId(id))
    }

    /// Frees a semaphore nobody waits on or holds.
    pub fn sem_destroy(&self, sem: SemId) -> Result<()> {
        let mut inner = self.inner.lock();
        let cell = self.live_cell(&inner, sem).ok_or(Error::Invalid)?;
        let slot = &mut inner.sems[sem.0];
        if !slot.waitq.is_empty() || !slot.holders.is_empty() {
            error!(
                "{:?} destroyed with {} waiters and {} holders",
                sem,
                slot.waitq.len(),
                slot.holders.len()
            );
            panic!("semaphore destroyed while in use");
        }
        slot.in_use = false;
        slot.flags = SemFlags::empty();
        cell.reset(0, SemFlags::empty());
        Ok(())
    }

    /// Current signed count; negative values count blocked waiters.
    pub fn sem_get_value(&self, sem: SemId) -> Result<i32> {
        let inner = self.inner.lock();
        self.live_cell(&inner, sem)
            .map(SemCell::count)
            .ok_or(Error::Invalid)
    }

    pub fn sem_get_protocol(&self, sem: SemId) -> Result<Protocol> {
        let inner = self.inner.lock();
        match inner.sems.get(sem.0) {
            Some(slot) if slot.in_use => Ok(slot.protocol()),
            _ => Err(Error::Invalid),
        }
    }

    /// Switches the priority protocol. Only legal while the semaphore is idle.
    pub fn sem_set_protocol(&self, sem: SemId, protocol: Protocol) -> Result<()> {
        let mut inner = self.inner.lock();
        let cell = self.live_cell(&inner, sem).ok_or(Error::Invalid)?;
        let slot = &mut inner.sems[sem.0];
        // An untracked mutex holder only shows up in the count.
        let held = slot.flags.contains(SemFlags::MUTEX) && cell.count() != 1;
        if held || !slot.waitq.is_empty() || !slot.holders.is_empty() {
            return Err(Error::Busy);
        }
        slot.flags = (slot.flags - SemFlags::PROTOCOL_MASK) | protocol.flags();
        cell.set_flags(slot.flags);
        Ok(())
    }

    pub fn sem_get_ceiling(&self, sem: SemId) -> Result<Priority> {
        let inner = self.inner.lock();
        match inner.sems.get(sem.0) {
            Some(slot) if slot.in_use => Ok(slot.ceiling),
            _ => Err(Error::Invalid),
        }
    }

    /// Sets the PROTECT ceiling; current holders are re-evaluated at once.
    pub fn sem_set_ceiling(&self, sem: SemId, ceiling: Priority) -> Result<()> {
        let cs = CriticalSection::enter();
        let mut inner = self.inner.lock_in(&cs);
        match inner.sems.get_mut(sem.0) {
            Some(slot) if slot.in_use => slot.ceiling = ceiling,
            _ => return Err(Error::Invalid),
        }
        let holders = inner.sems[sem.0].holders.tasks();
        inner.propagate(&holders);
        self.leave_locked(inner);
        Ok(())
    }

    /// Blocked tasks in the order they will be granted.
    pub fn sem_waiters(&self, sem: SemId) -> Vec<TaskId> {
        let inner = self.inner.lock();
        inner
            .sems
            .get(sem.0)
            .map(|slot| slot.waitq.iter().map(|e| e.task).collect())
            .unwrap_or_default()
    }

    /// Tracked holders with their counts. Empty unless a protocol is active.
    pub fn sem_holders(&self, sem: SemId) -> Vec<Holder> {
        let inner = self.inner.lock();
        inner
            .sems
            .get(sem.0)
            .map(|slot| slot.holders.iter().copied().collect())
            .unwrap_or_default()
    }
}
