use bitflags::bitflags;

use super::manager::{Kernel, Platform};
use super::structs::{TaskId, TaskState};
use crate::error::{Error, Result};
use crate::sync::CriticalSection;

bitflags! {
    /// Pending signal set, one bit per signal number.
    pub struct SignalFlags: u32 {
        const SIGINT  = 1 << 2;
        const SIGKILL = 1 << 9;
        const SIGUSR1 = 1 << 10;
        const SIGALRM = 1 << 14;
        const SIGTERM = 1 << 15;
    }
}

impl<P: Platform> Kernel<P> {
    /// Delivers `signals` to `tid`.
    ///
    /// The signals stay pending on the task. If it is blocked in a semaphore
    /// wait, the wait is cancelled with [`Error::Interrupted`] before this call
    /// returns, so the task finds its bookkeeping already undone when it runs.
    pub fn kill(&self, tid: TaskId, signals: SignalFlags) -> Result<()> {
        let cs = CriticalSection::enter();
        let mut inner = self.inner.lock_in(&cs);
        let waitobj = match inner.tasks.get(tid) {
            Some(tcb) if tcb.state != TaskState::Zombie => tcb.waitobj,
            _ => return Err(Error::Invalid),
        };
        inner.tasks[tid].signals.insert(signals);
        trace!("kill {:?} with {:?}", tid, signals);
        if let Some(sem) = waitobj {
            self.cancel_locked(&mut inner, sem, tid, Error::Interrupted);
        }
        self.leave_locked(inner);
        Ok(())
    }

    pub fn pending_signals(&self, tid: TaskId) -> SignalFlags {
        self.inner
            .lock()
            .tasks
            .get(tid)
            .map_or(SignalFlags::empty(), |tcb| tcb.signals)
    }

    /// Clears and returns the calling task's pending signals.
    pub fn take_signals(&self) -> SignalFlags {
        let mut inner = self.inner.lock();
        let me = inner.running;
        core::mem::replace(&mut inner.tasks[me].signals, SignalFlags::empty())
    }
}
