use alloc::boxed::Box;
use alloc::vec::Vec;
use core::sync::atomic::AtomicU64;

use ::spin::MutexGuard;

use super::schedule::{PriorityScheduler, Scheduler};
use super::structs::{Priority, TaskId, TaskState, TaskTable, Tcb};
use crate::config::{KernelConfig, IDLE_PRIORITY, MIN_PRIORITY};
use crate::error::{Error, Result};
use crate::sem::{SemCell, SemSlot};
use crate::sync::{CriticalSection, SpinNoIrqLock};
use crate::timer::TimerQueue;

/// Hooks into the CPU the kernel runs on.
pub trait Platform: Send + Sync {
    /// Suspends `from` and resumes `to`. Returns once `from` is scheduled
    /// again. Called with interrupts masked and no kernel lock held.
    fn switch_context(&self, from: TaskId, to: TaskId);

    /// Like `switch_context`, but `from` has exited and never resumes.
    fn exit_context(&self, from: TaskId, to: TaskId);

    fn in_interrupt_context(&self) -> bool;
}

/// The process-wide scheduler context.
///
/// Owns every task and semaphore. Created once at boot and shared by
/// reference with task code and interrupt handlers.
pub struct Kernel<P: Platform> {
    pub(crate) platform: P,
    pub(crate) config: KernelConfig,
    /// Lock-free halves of the semaphore table, indexed like `KernelInner::sems`.
    pub(crate) sem_cells: Box<[SemCell]>,
    pub(crate) inner: SpinNoIrqLock<KernelInner>,
    pub(crate) ticks: AtomicU64,
}

/// Scheduler state reachable only under the critical section.
pub(crate) struct KernelInner {
    pub(crate) tasks: TaskTable,
    pub(crate) ready: PriorityScheduler,
    /// The task that owns the CPU. Differs from the ready-set head only
    /// between a state change and the next dispatch.
    pub(crate) running: TaskId,
    pub(crate) sems: Vec<SemSlot>,
    pub(crate) timers: TimerQueue,
    pub(crate) max_inherit_depth: usize,
}

impl KernelInner {
    pub(crate) fn new(config: &KernelConfig) -> Self {
        let mut ready = PriorityScheduler::new();
        ready.add_ready_task(TaskId::IDLE, IDLE_PRIORITY);
        Self {
            tasks: TaskTable::new(config.max_tasks),
            ready,
            running: TaskId::IDLE,
            sems: (0..config.max_semaphores)
                .map(|_| SemSlot::new(config.max_holders))
                .collect(),
            timers: TimerQueue::new(),
            max_inherit_depth: config.max_inherit_depth,
        }
    }

    pub fn current_task(&self) -> TaskId {
        self.running
    }

    pub fn remove_from_ready(&mut self, tid: TaskId) {
        if !self.ready.remove_task(tid) {
            warn!("{:?} was not in the ready set", tid);
        }
    }

    pub fn add_to_ready(&mut self, tid: TaskId, prio: Priority) {
        self.tasks[tid].state = TaskState::Ready;
        self.ready.add_ready_task(tid, prio);
    }

    pub fn get_task_priority(&self, tid: TaskId) -> Priority {
        self.tasks[tid].priority
    }

    /// Changes the effective priority of `tid` and re-sorts whichever
    /// ordered list currently holds it.
    pub fn set_task_priority(&mut self, tid: TaskId, prio: Priority) {
        let tcb = &mut self.tasks[tid];
        debug!(
            "{:?} ({}) priority {} -> {}",
            tid, tcb.name, tcb.priority, prio
        );
        tcb.priority = prio;
        match tcb.state {
            TaskState::Running => self.ready.reprioritize(tid, prio, true),
            TaskState::Ready => self.ready.reprioritize(tid, prio, false),
            TaskState::WaitSem => {
                if let Some(sem) = tcb.waitobj {
                    self.sems[sem.as_usize()].waitq.reprioritize(tid, prio);
                }
            }
            TaskState::Zombie => {}
        }
    }

    /// Makes the ready-set head the running task.
    ///
    /// Returns the switch the caller must perform once the kernel lock is
    /// released, or `None` if the running task keeps the CPU.
    pub fn dispatch(&mut self) -> Option<(TaskId, TaskId)> {
        let next = self.ready.pick_next_task()?;
        let prev = self.running;
        if next == prev {
            return None;
        }
        if self.tasks[prev].state == TaskState::Running {
            self.tasks[prev].state = TaskState::Ready;
        }
        self.tasks[next].state = TaskState::Running;
        self.running = next;
        trace!("switch {:?} -> {:?}", prev, next);
        Some((prev, next))
    }

    /// Whether `tid` is a tracked holder of any semaphore.
    pub fn holds_any(&self, tid: TaskId) -> bool {
        self.sems
            .iter()
            .any(|slot| slot.in_use && slot.holders.contains(tid))
    }
}

impl<P: Platform> Kernel<P> {
    /// Boots a kernel whose only task is the idle task, running on the
    /// calling context.
    pub fn new(platform: P, config: KernelConfig) -> Self {
        info!(
            "kernel: {} tasks, {} semaphores, {} holders each",
            config.max_tasks, config.max_semaphores, config.max_holders
        );
        let sem_cells: Vec<SemCell> = (0..config.max_semaphores).map(|_| SemCell::new()).collect();
        Self {
            inner: SpinNoIrqLock::new(KernelInner::new(&config)),
            sem_cells: sem_cells.into_boxed_slice(),
            platform,
            config,
            ticks: AtomicU64::new(0),
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Creates a ready task. It first runs at the next reschedule point.
    pub fn spawn(&self, name: &str, prio: Priority) -> Result<TaskId> {
        if prio < MIN_PRIORITY {
            return Err(Error::Invalid);
        }
        let mut inner = self.inner.lock();
        let tid = inner.tasks.alloc(Tcb::new(name, prio))?;
        inner.add_to_ready(tid, prio);
        trace!("spawn {:?} ({}) at priority {}", tid, name, prio);
        Ok(tid)
    }

    /// Terminates the calling task and switches away for good.
    pub fn exit_current(&self) {
        let cs = CriticalSection::enter();
        let mut inner = self.inner.lock_in(&cs);
        let me = inner.running;
        if me.is_idle() {
            error!("the idle task cannot exit");
            panic!("exit_current called by the idle task");
        }
        if inner.holds_any(me) {
            warn!("{:?} ({}) exits while holding semaphores", me, inner.tasks[me].name);
        }
        inner.timers.remove(me);
        inner.remove_from_ready(me);
        inner.tasks[me].state = TaskState::Zombie;
        trace!("exit {:?}", me);
        let next = inner.dispatch();
        drop(inner);
        match next {
            Some((from, to)) => self.platform.exit_context(from, to),
            None => unreachable!("ready set lost the idle task"),
        }
    }

    /// Explicit reschedule point, e.g. on return from an interrupt.
    pub fn reschedule(&self) {
        let cs = CriticalSection::enter();
        let inner = self.inner.lock_in(&cs);
        self.leave_locked(inner);
    }

    /// Releases the kernel lock, switching first if a more urgent task became
    /// ready. Interrupt handlers never switch here; they rely on
    /// [`Kernel::reschedule`].
    pub(crate) fn leave_locked(&self, mut inner: MutexGuard<'_, KernelInner>) {
        let next = if self.platform.in_interrupt_context() {
            None
        } else {
            inner.dispatch()
        };
        drop(inner);
        if let Some((from, to)) = next {
            self.platform.switch_context(from, to);
        }
    }

    pub fn current_task(&self) -> TaskId {
        self.inner.lock().current_task()
    }

    pub fn task_state(&self, tid: TaskId) -> Option<TaskState> {
        self.inner.lock().tasks.get(tid).map(|tcb| tcb.state)
    }

    /// Effective priority of `tid`.
    pub fn priority(&self, tid: TaskId) -> Option<Priority> {
        self.inner.lock().tasks.get(tid).map(|tcb| tcb.priority)
    }

    pub fn base_priority(&self, tid: TaskId) -> Option<Priority> {
        self.inner.lock().tasks.get(tid).map(|tcb| tcb.base_priority)
    }

    /// The semaphore `tid` is blocked on, if any.
    pub fn waitobj(&self, tid: TaskId) -> Option<crate::sem::SemId> {
        self.inner.lock().tasks.get(tid).and_then(|tcb| tcb.waitobj)
    }

    /// Reassigns the base priority of `tid`.
    ///
    /// Boosts still in force keep the effective priority up; a blocked task
    /// is re-sorted in its wait-queue and the holders it boosts are updated.
    pub fn set_base_priority(&self, tid: TaskId, prio: Priority) -> Result<()> {
        if prio < MIN_PRIORITY {
            return Err(Error::Invalid);
        }
        let cs = CriticalSection::enter();
        let mut inner = self.inner.lock_in(&cs);
        match inner.tasks.get(tid) {
            Some(tcb) if !tid.is_idle() && tcb.state != TaskState::Zombie => {}
            _ => return Err(Error::Invalid),
        }
        inner.tasks[tid].base_priority = prio;
        inner.propagate(&[tid]);
        self.leave_locked(inner);
        Ok(())
    }
}
