use alloc::vec::Vec;

use super::{SemFlags, SemId};
use crate::error::{Error, Result};
use crate::sync::CriticalSection;
use crate::task::{Kernel, Platform};

impl<P: Platform> Kernel<P> {
    /// Releases one unit of `sem`.
    ///
    /// The most urgent waiter, if any, is granted the unit directly and made
    /// ready. From task context a more urgent task preempts before this
    /// returns; from an interrupt handler the switch waits for the next
    /// [`Kernel::reschedule`].
    ///
    /// Posting a dead handle, an unlocked mutex or a count already at
    /// `i32::MAX` is a fatal usage error.
    pub fn sem_post(&self, sem: SemId) {
        if let Err(err) = self.try_post(sem) {
            error!("sem_post on {:?}: {}", sem, err);
            panic!("sem_post rejected: {}", err);
        }
    }

    /// [`Kernel::sem_post`] that reports misuse as [`Error::Invalid`]
    /// instead of panicking. Nothing changes when it fails.
    pub(crate) fn try_post(&self, sem: SemId) -> Result<()> {
        if let Some(cell) = self.cell(sem) {
            if cell.fast_path_eligible() && cell.try_release_fast() {
                return Ok(());
            }
        }

        let cs = CriticalSection::enter();
        let mut inner = self.inner.lock_in(&cs);
        let cell = match self.live_cell(&inner, sem) {
            Some(cell) => cell,
            None => {
                warn!("post to uninitialized {:?}", sem);
                return Err(Error::Invalid);
            }
        };
        let count = cell.count();
        if cell.flags().contains(SemFlags::MUTEX) && count >= 1 {
            warn!("post to unlocked mutex {:?}", sem);
            return Err(Error::Invalid);
        }
        if count == i32::MAX {
            warn!("{:?} count would overflow", sem);
            return Err(Error::Invalid);
        }
        let releaser = if self.platform.in_interrupt_context() {
            None
        } else {
            Some(inner.running)
        };
        let mut seeds: Vec<_> = inner.release_holder(sem, releaser).into_iter().collect();

        if cell.increment() < 0 {
            let entry = match inner.sems[sem.as_usize()].waitq.pop_front() {
                Some(entry) => entry,
                None => {
                    error!("{:?} count {} with an empty wait-queue", sem, cell.count());
                    panic!("semaphore count out of sync with its wait-queue");
                }
            };
            let task = entry.task;
            let tcb = &mut inner.tasks[task];
            tcb.waitobj = None;
            tcb.errcode = None;
            let prio = inner.get_task_priority(task);
            inner.add_holder(sem, task);
            inner.add_to_ready(task, prio);
            trace!("{:?} granted {:?}", task, sem);
        }

        // The top waiter may have changed, and with it every holder's boost.
        seeds.extend(inner.sems[sem.as_usize()].holders.iter().map(|h| h.task));
        inner.propagate(&seeds);
        self.leave_locked(inner);
        Ok(())
    }
}
