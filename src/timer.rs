//! Tick-driven deadlines for timed semaphore waits.

use alloc::collections::BinaryHeap;
use core::cmp::Ordering;
use core::sync::atomic::Ordering as AtomicOrdering;

use crate::error::{Error, Result};
use crate::sem::SemId;
use crate::sync::CriticalSection;
use crate::task::{Kernel, Platform, TaskId};

/// A pending deadline: cancel `task`'s wait on `sem` once `expire` is reached.
#[derive(Debug, Clone, Copy)]
pub struct TimerCondVar {
    pub expire: u64,
    pub task: TaskId,
    pub sem: SemId,
}

impl PartialEq for TimerCondVar {
    fn eq(&self, other: &Self) -> bool {
        self.expire == other.expire
    }
}

impl Eq for TimerCondVar {}

impl PartialOrd for TimerCondVar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerCondVar {
    // Reversed, so the max-heap pops the earliest deadline first.
    fn cmp(&self, other: &Self) -> Ordering {
        other.expire.cmp(&self.expire)
    }
}

#[derive(Default)]
pub struct TimerQueue {
    timers: BinaryHeap<TimerCondVar>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self {
            timers: BinaryHeap::new(),
        }
    }

    pub fn add(&mut self, expire: u64, task: TaskId, sem: SemId) {
        self.timers.push(TimerCondVar { expire, task, sem });
    }

    /// Disarms every deadline owned by `task`.
    pub fn remove(&mut self, task: TaskId) {
        let timers = core::mem::take(&mut self.timers);
        self.timers = timers.into_iter().filter(|t| t.task != task).collect();
    }

    pub fn pop_expired(&mut self, now: u64) -> Option<TimerCondVar> {
        match self.timers.peek() {
            Some(timer) if timer.expire <= now => self.timers.pop(),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

impl<P: Platform> Kernel<P> {
    pub fn ticks(&self) -> u64 {
        self.ticks.load(AtomicOrdering::Acquire)
    }

    /// Advances the clock by one tick and times out every expired wait.
    ///
    /// Meant to be called from the timer interrupt.
    pub fn tick(&self) {
        let now = self.ticks.fetch_add(1, AtomicOrdering::AcqRel) + 1;
        let cs = CriticalSection::enter();
        let mut inner = self.inner.lock_in(&cs);
        while let Some(timer) = inner.timers.pop_expired(now) {
            if self.cancel_locked(&mut inner, timer.sem, timer.task, Error::TimedOut) {
                debug!("{:?} timed out on {:?} at tick {}", timer.task, timer.sem, now);
            }
        }
        self.leave_locked(inner);
    }

    /// [`Kernel::sem_wait`] with a deadline `ticks` ticks from now.
    ///
    /// With `ticks == 0` this only tries, and reports [`Error::TimedOut`]
    /// instead of [`Error::WouldBlock`] when no unit is free. Deadlines past
    /// the end of the tick counter never expire.
    pub fn sem_timed_wait(&self, sem: SemId, ticks: u64) -> Result<()> {
        self.assert_task_context("sem_timed_wait");
        // Held throughout so the deadline cannot fire between arming and
        // blocking.
        let cs = CriticalSection::enter();
        match self.sem_try_wait(sem) {
            Err(Error::WouldBlock) => {}
            done => return done,
        }
        if ticks == 0 {
            return Err(Error::TimedOut);
        }
        let me = {
            let mut inner = self.inner.lock_in(&cs);
            let me = inner.running;
            inner.timers.add(self.ticks().saturating_add(ticks), me, sem);
            me
        };
        let ret = self.sem_wait(sem);
        self.inner.lock_in(&cs).timers.remove(me);
        ret
    }
}
