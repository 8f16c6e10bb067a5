use alloc::collections::VecDeque;

use crate::task::{Priority, TaskId};

/// A blocked task and the priority it is currently sorted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitEntry {
    pub task: TaskId,
    pub prio: Priority,
}

/// Tasks blocked on one semaphore, priority-descending, FIFO among equals.
#[derive(Default)]
pub struct WaitQueue {
    entries: VecDeque<WaitEntry>,
}

impl WaitQueue {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Inserts behind every entry of the same or higher priority.
    pub fn insert(&mut self, task: TaskId, prio: Priority) {
        let pos = self
            .entries
            .iter()
            .position(|e| e.prio < prio)
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, WaitEntry { task, prio });
    }

    pub fn pop_front(&mut self) -> Option<WaitEntry> {
        self.entries.pop_front()
    }

    pub fn peek(&self) -> Option<&WaitEntry> {
        self.entries.front()
    }

    pub fn remove(&mut self, task: TaskId) -> bool {
        match self.entries.iter().position(|e| e.task == task) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, task: TaskId) -> bool {
        self.entries.iter().any(|e| e.task == task)
    }

    /// Re-sorts `task` under `prio`; it queues behind its new equals.
    pub fn reprioritize(&mut self, task: TaskId, prio: Priority) {
        if self.remove(task) {
            self.insert(task, prio);
        }
    }

    pub fn highest_priority(&self) -> Option<Priority> {
        self.peek().map(|e| e.prio)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WaitEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
