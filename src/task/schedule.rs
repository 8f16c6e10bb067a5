use alloc::collections::VecDeque;

use super::structs::{Priority, TaskId};

/// Ready-set discipline used by the kernel.
///
/// The running task stays in the set; `pick_next_task` only peeks, and the
/// kernel switches whenever the head differs from the task on the CPU.
pub trait Scheduler {
    fn add_ready_task(&mut self, tid: TaskId, prio: Priority);
    fn pick_next_task(&self) -> Option<TaskId>;
    fn remove_task(&mut self, tid: TaskId) -> bool;
    /// Moves `tid` to its new priority class. With `keep_ahead` it goes in
    /// front of its new equals instead of behind them.
    fn reprioritize(&mut self, tid: TaskId, prio: Priority, keep_ahead: bool);
}

#[derive(Debug, Clone, Copy)]
struct SchedulerState {
    task: TaskId,
    prio: Priority,
}

impl SchedulerState {
    fn new(task: TaskId, prio: Priority) -> Self {
        Self { task, prio }
    }
}

/// Priority-descending ready queue, FIFO among equal priorities.
pub struct PriorityScheduler {
    ready_queue: VecDeque<SchedulerState>,
}

impl PriorityScheduler {
    pub fn new() -> Self {
        Self {
            ready_queue: VecDeque::new(),
        }
    }

    fn insert(&mut self, state: SchedulerState, ahead_of_equals: bool) {
        let pos = self
            .ready_queue
            .iter()
            .position(|s| {
                if ahead_of_equals {
                    s.prio <= state.prio
                } else {
                    s.prio < state.prio
                }
            })
            .unwrap_or(self.ready_queue.len());
        self.ready_queue.insert(pos, state);
    }

    pub fn contains(&self, tid: TaskId) -> bool {
        self.ready_queue.iter().any(|s| s.task == tid)
    }

    pub fn len(&self) -> usize {
        self.ready_queue.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.ready_queue.iter().map(|s| s.task)
    }
}

impl Default for PriorityScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for PriorityScheduler {
    fn add_ready_task(&mut self, tid: TaskId, prio: Priority) {
        debug_assert!(!self.contains(tid));
        self.insert(SchedulerState::new(tid, prio), false);
    }

    fn pick_next_task(&self) -> Option<TaskId> {
        self.ready_queue.front().map(|s| s.task)
    }

    fn remove_task(&mut self, tid: TaskId) -> bool {
        if let Some(pos) = self.ready_queue.iter().position(|s| s.task == tid) {
            self.ready_queue.remove(pos);
            true
        } else {
            false
        }
    }

    fn reprioritize(&mut self, tid: TaskId, prio: Priority, keep_ahead: bool) {
        if self.remove_task(tid) {
            self.insert(SchedulerState::new(tid, prio), keep_ahead);
        }
    }
}
