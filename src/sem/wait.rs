use super::{Protocol, SemCell, SemId};
use crate::error::{Error, Result};
use crate::sync::CriticalSection;
use crate::task::{Kernel, KernelInner, Platform, TaskId, TaskState};

impl<P: Platform> Kernel<P> {
    /// Takes one unit of `sem`, blocking until one is available.
    ///
    /// Returns [`Error::Interrupted`] or [`Error::TimedOut`] if the wait was
    /// cancelled; by then the queue entry, the count and any boost it caused
    /// have already been undone. Callers that must not give up loop on
    /// `Interrupted` themselves, or use [`Kernel::sem_wait_uninterruptible`].
    pub fn sem_wait(&self, sem: SemId) -> Result<()> {
        self.assert_task_context("sem_wait");
        if let Some(cell) = self.cell(sem) {
            if cell.fast_path_eligible() && cell.try_acquire_fast() {
                return Ok(());
            }
        }
        self.sem_wait_slow(sem)
    }

    fn sem_wait_slow(&self, sem: SemId) -> Result<()> {
        let cs = CriticalSection::enter();
        let mut inner = self.inner.lock_in(&cs);
        let cell = self.live_cell(&inner, sem).ok_or(Error::Invalid)?;
        let me = inner.running;
        if let Some(other) = inner.tasks[me].waitobj {
            error!("{:?} waits on {:?} while blocked on {:?}", me, sem, other);
            panic!("sem_wait by a task that is already waiting");
        }

        if cell.decrement() > 0 {
            return self.take_unit(&mut inner, cell, sem, me);
        }

        if me.is_idle() {
            error!("idle task would block on {:?}", sem);
            panic!("the idle task must never block");
        }
        let tcb = &mut inner.tasks[me];
        tcb.waitobj = Some(sem);
        tcb.errcode = None;
        let prio = inner.get_task_priority(me);
        inner.remove_from_ready(me);
        inner.tasks[me].state = TaskState::WaitSem;
        inner.sems[sem.as_usize()].waitq.insert(me, prio);
        trace!("{:?} blocks on {:?}, count {}", me, sem, cell.count());
        if inner.sems[sem.as_usize()].protocol() == Protocol::Inherit {
            let holders = inner.sems[sem.as_usize()].holders.tasks();
            inner.propagate(&holders);
        }

        let next = inner.dispatch();
        drop(inner);
        if let Some((from, to)) = next {
            self.platform.switch_context(from, to);
        }

        // Resumed by a grant or a cancellation; either way all bookkeeping is
        // already done and the wake reason is all that is left to read.
        let mut inner = self.inner.lock_in(&cs);
        match inner.tasks[me].errcode.take() {
            None => Ok(()),
            Some(err) => {
                trace!("{:?} wait on {:?} failed: {}", me, sem, err);
                Err(err)
            }
        }
    }

    /// Takes one unit of `sem` if one is free, never blocking.
    pub fn sem_try_wait(&self, sem: SemId) -> Result<()> {
        self.assert_task_context("sem_try_wait");
        if let Some(cell) = self.cell(sem) {
            if cell.fast_path_eligible() {
                return if cell.try_acquire_fast() {
                    Ok(())
                } else {
                    Err(Error::WouldBlock)
                };
            }
        }
        let cs = CriticalSection::enter();
        let mut inner = self.inner.lock_in(&cs);
        let cell = self.live_cell(&inner, sem).ok_or(Error::Invalid)?;
        if !cell.try_decrement() {
            return Err(Error::WouldBlock);
        }
        let me = inner.running;
        self.take_unit(&mut inner, cell, sem, me)
    }

    /// [`Kernel::sem_wait`], retried for as long as it is interrupted.
    pub fn sem_wait_uninterruptible(&self, sem: SemId) -> Result<()> {
        loop {
            match self.sem_wait(sem) {
                Err(Error::Interrupted) => continue,
                other => return other,
            }
        }
    }

    /// Finishes an acquisition whose unit has already come off the count.
    fn take_unit(
        &self,
        inner: &mut KernelInner,
        cell: &SemCell,
        sem: SemId,
        me: TaskId,
    ) -> Result<()> {
        if let Err(err) = inner.protect_wait(sem, me) {
            cell.increment();
            return Err(err);
        }
        inner.add_holder(sem, me);
        inner.propagate(&[me]);
        Ok(())
    }

    pub(crate) fn assert_task_context(&self, op: &str) {
        if self.platform.in_interrupt_context() {
            error!("{} called from interrupt context", op);
            panic!("{} called from interrupt context", op);
        }
    }
}
