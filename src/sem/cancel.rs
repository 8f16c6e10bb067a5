use super::SemId;
use crate::error::Error;
use crate::sync::CriticalSection;
use crate::task::{Kernel, KernelInner, Platform, TaskId, TaskState};

impl<P: Platform> Kernel<P> {
    /// Aborts the wait of `tid` on `sem`, waking it with `reason`.
    ///
    /// All cleanup happens here, before `tid` can run: the queue entry is
    /// removed, the unit it was waiting for is given back to the count, the
    /// holders it was boosting are re-evaluated and the wake reason is stored.
    /// Returns `false` and changes nothing if `tid` is not queued on `sem`,
    /// e.g. because a post already granted it.
    pub fn sem_cancel_wait(&self, sem: SemId, tid: TaskId, reason: Error) -> bool {
        let cs = CriticalSection::enter();
        let mut inner = self.inner.lock_in(&cs);
        let cancelled = self.cancel_locked(&mut inner, sem, tid, reason);
        self.leave_locked(inner);
        cancelled
    }

    pub(crate) fn cancel_locked(
        &self,
        inner: &mut KernelInner,
        sem: SemId,
        tid: TaskId,
        reason: Error,
    ) -> bool {
        match inner.tasks.get(tid) {
            Some(tcb) if tcb.state == TaskState::WaitSem && tcb.waitobj == Some(sem) => {}
            _ => return false,
        }
        let cell = match self.live_cell(inner, sem) {
            Some(cell) => cell,
            None => return false,
        };
        if !inner.sems[sem.as_usize()].waitq.remove(tid) {
            error!("{:?} blocked on {:?} but not in its wait-queue", tid, sem);
            panic!("wait-queue out of sync with task state");
        }
        cell.increment();
        let tcb = &mut inner.tasks[tid];
        tcb.waitobj = None;
        tcb.errcode = Some(reason);
        let prio = inner.get_task_priority(tid);
        inner.add_to_ready(tid, prio);
        trace!("{:?} wait on {:?} cancelled: {}", tid, sem, reason);

        let holders = inner.sems[sem.as_usize()].holders.tasks();
        inner.propagate(&holders);
        true
    }
}
