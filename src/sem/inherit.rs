//! Priority inheritance and priority protection.
//!
//! Boosts are never stored as deltas. A task's effective priority is always
//! recomputed from what it currently holds:
//!
//! ```text
//! effective = max(base,
//!                 ceiling of every PROTECT semaphore held,
//!                 top waiter of every INHERIT semaphore held)
//! ```
//!
//! so restoring after a release, a cancellation or a base-priority change is
//! the same operation as boosting.

use alloc::vec::Vec;

use super::{Protocol, SemId};
use crate::error::{Error, Result};
use crate::task::{KernelInner, Priority, TaskId};

impl KernelInner {
    pub fn effective_priority(&self, tid: TaskId) -> Priority {
        self.sems
            .iter()
            .filter(|slot| slot.in_use && slot.holders.contains(tid))
            .filter_map(|slot| match slot.protocol() {
                Protocol::Protect => Some(slot.ceiling),
                Protocol::Inherit => slot.waitq.highest_priority(),
                Protocol::None => None,
            })
            .fold(self.tasks[tid].base_priority, Priority::max)
    }

    /// Recomputes the effective priority of every task in `seeds` and follows
    /// blocking chains from there: when a task blocked on an INHERIT
    /// semaphore changes priority, that semaphore's holders are next.
    ///
    /// Panics if a chain runs deeper than the configured inheritance depth.
    pub fn propagate(&mut self, seeds: &[TaskId]) {
        let mut worklist: Vec<(TaskId, usize)> = seeds.iter().map(|&t| (t, 0)).collect();
        while let Some((tid, depth)) = worklist.pop() {
            let prio = self.effective_priority(tid);
            if prio == self.tasks[tid].priority {
                continue;
            }
            if depth >= self.max_inherit_depth {
                error!(
                    "priority inheritance chain through {:?} exceeds depth {}",
                    tid, self.max_inherit_depth
                );
                panic!("priority inheritance chain too deep");
            }
            self.set_task_priority(tid, prio);
            if let Some(sem) = self.tasks[tid].waitobj {
                let slot = &self.sems[sem.as_usize()];
                if slot.protocol() == Protocol::Inherit {
                    worklist.extend(slot.holders.iter().map(|h| (h.task, depth + 1)));
                }
            }
        }
    }

    /// Ceiling check made when `tid` is about to take a PROTECT semaphore.
    pub fn protect_wait(&self, sem: SemId, tid: TaskId) -> Result<()> {
        let slot = &self.sems[sem.as_usize()];
        if slot.protocol() == Protocol::Protect && self.tasks[tid].priority > slot.ceiling {
            warn!(
                "{:?} at priority {} exceeds ceiling {} of {:?}",
                tid, self.tasks[tid].priority, slot.ceiling, sem
            );
            return Err(Error::Invalid);
        }
        Ok(())
    }

    /// Records `tid` as holding one more count of `sem`.
    pub fn add_holder(&mut self, sem: SemId, tid: TaskId) {
        let slot = &mut self.sems[sem.as_usize()];
        if slot.protocol() == Protocol::None {
            return;
        }
        if !slot.holders.add(tid) {
            warn!(
                "holder table of {:?} is full, {:?} is not tracked",
                sem, tid
            );
        }
    }

    /// Drops one tracked count of `sem`. See [`HolderSet::release`].
    ///
    /// [`HolderSet::release`]: super::HolderSet::release
    pub fn release_holder(&mut self, sem: SemId, releaser: Option<TaskId>) -> Option<TaskId> {
        let slot = &mut self.sems[sem.as_usize()];
        if slot.protocol() == Protocol::None {
            return None;
        }
        slot.holders.release(releaser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::sem::SemFlags;
    use crate::task::{Tcb, TaskState};

    fn inner(max_inherit_depth: usize) -> KernelInner {
        KernelInner::new(&KernelConfig {
            max_inherit_depth,
            ..KernelConfig::default()
        })
    }

    fn ready(k: &mut KernelInner, prio: Priority) -> TaskId {
        let tid = k.tasks.alloc(Tcb::new("t", prio)).unwrap();
        k.add_to_ready(tid, prio);
        tid
    }

    fn sem(k: &mut KernelInner, id: usize, flags: SemFlags) -> SemId {
        let slot = &mut k.sems[id];
        slot.in_use = true;
        slot.flags = flags;
        SemId::from(id)
    }

    fn block(k: &mut KernelInner, tid: TaskId, sem: SemId) {
        k.remove_from_ready(tid);
        let prio = k.tasks[tid].priority;
        let tcb = &mut k.tasks[tid];
        tcb.state = TaskState::WaitSem;
        tcb.waitobj = Some(sem);
        k.sems[sem.as_usize()].waitq.insert(tid, prio);
    }

    #[test]
    fn inherit_boost_and_restore() {
        let mut k = inner(8);
        let holder = ready(&mut k, 3);
        let waiter = ready(&mut k, 8);
        let m = sem(&mut k, 0, SemFlags::MUTEX | SemFlags::PRIO_INHERIT);
        k.add_holder(m, holder);
        block(&mut k, waiter, m);
        k.propagate(&[holder]);
        assert_eq!(k.tasks[holder].priority, 8);
        assert_eq!(k.tasks[holder].base_priority, 3);

        k.sems[0].waitq.remove(waiter);
        k.propagate(&[holder]);
        assert_eq!(k.tasks[holder].priority, 3);
    }

    #[test]
    fn boost_keeps_highest_remaining_obligation() {
        let mut k = inner(8);
        let holder = ready(&mut k, 2);
        let w1 = ready(&mut k, 6);
        let w2 = ready(&mut k, 9);
        let m1 = sem(&mut k, 0, SemFlags::MUTEX | SemFlags::PRIO_INHERIT);
        let m2 = sem(&mut k, 1, SemFlags::MUTEX | SemFlags::PRIO_INHERIT);
        k.add_holder(m1, holder);
        k.add_holder(m2, holder);
        block(&mut k, w1, m1);
        block(&mut k, w2, m2);
        k.propagate(&[holder]);
        assert_eq!(k.tasks[holder].priority, 9);

        k.release_holder(m2, Some(holder));
        k.propagate(&[holder]);
        assert_eq!(k.tasks[holder].priority, 6);
    }

    #[test]
    fn boost_follows_blocking_chain() {
        let mut k = inner(8);
        let a = ready(&mut k, 1);
        let b = ready(&mut k, 2);
        let c = ready(&mut k, 9);
        let m1 = sem(&mut k, 0, SemFlags::MUTEX | SemFlags::PRIO_INHERIT);
        let m2 = sem(&mut k, 1, SemFlags::MUTEX | SemFlags::PRIO_INHERIT);
        k.add_holder(m1, a);
        k.add_holder(m2, b);
        block(&mut k, b, m1);
        block(&mut k, c, m2);
        k.propagate(&[b]);
        assert_eq!(k.tasks[b].priority, 9);
        assert_eq!(k.tasks[a].priority, 9);
        // The boosted waiter moved to the front of its queue's class.
        assert_eq!(k.sems[0].waitq.highest_priority(), Some(9));
    }

    #[test]
    fn protect_ceiling() {
        let mut k = inner(8);
        let low = ready(&mut k, 2);
        let high = ready(&mut k, 12);
        let m = sem(&mut k, 0, SemFlags::MUTEX | SemFlags::PRIO_PROTECT);
        k.sems[0].ceiling = 10;
        assert_eq!(k.protect_wait(m, high), Err(Error::Invalid));
        assert_eq!(k.protect_wait(m, low), Ok(()));
        k.add_holder(m, low);
        k.propagate(&[low]);
        assert_eq!(k.tasks[low].priority, 10);
        k.release_holder(m, Some(low));
        k.propagate(&[low]);
        assert_eq!(k.tasks[low].priority, 2);
    }

    #[test]
    fn untracked_holder_is_not_boosted() {
        let mut k = inner(8);
        let m = sem(&mut k, 0, SemFlags::PRIO_INHERIT);
        let holders: Vec<_> = (0..k.sems[0].holders.capacity() + 1)
            .map(|_| ready(&mut k, 1))
            .collect();
        for &h in &holders {
            k.add_holder(m, h);
        }
        let waiter = ready(&mut k, 7);
        block(&mut k, waiter, m);
        k.propagate(&holders);
        let (tracked, extra) = holders.split_at(holders.len() - 1);
        assert!(tracked.iter().all(|&h| k.tasks[h].priority == 7));
        assert_eq!(k.tasks[extra[0]].priority, 1);
    }

    #[test]
    #[should_panic(expected = "priority inheritance chain too deep")]
    fn chain_deeper_than_cap_is_fatal() {
        let mut k = inner(2);
        let tasks: Vec<_> = (0..5).map(|_| ready(&mut k, 1)).collect();
        let sems: Vec<_> = (0..4)
            .map(|i| sem(&mut k, i, SemFlags::MUTEX | SemFlags::PRIO_INHERIT))
            .collect();
        // tasks[i + 1] holds sems[i]; tasks[i] waits on it.
        for i in 0..4 {
            k.add_holder(sems[i], tasks[i + 1]);
        }
        for i in 1..4 {
            block(&mut k, tasks[i], sems[i]);
        }
        k.set_task_priority(tasks[0], 50);
        block(&mut k, tasks[0], sems[0]);
        k.propagate(&[tasks[1]]);
    }
}
