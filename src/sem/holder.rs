use alloc::vec::Vec;

use crate::task::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Holder {
    pub task: TaskId,
    pub count: u32,
}

/// Tasks holding counts of a protocol-enabled semaphore.
pub struct HolderSet {
    holders: Vec<Holder>,
    capacity: usize,
}

impl HolderSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            holders: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Records one more count held by `task`.
    ///
    /// Returns `false` if `task` is new and the set is full; the count is
    /// then not tracked.
    pub fn add(&mut self, task: TaskId) -> bool {
        if let Some(h) = self.holders.iter_mut().find(|h| h.task == task) {
            h.count += 1;
            return true;
        }
        if self.holders.len() >= self.capacity {
            return false;
        }
        self.holders.push(Holder { task, count: 1 });
        true
    }

    /// Drops one count on behalf of `releaser`.
    ///
    /// If `releaser` is not a holder (a signal-style post, or one from an
    /// interrupt handler), the count comes off the sole holder if there is
    /// exactly one. Returns the task whose count went down.
    pub fn release(&mut self, releaser: Option<TaskId>) -> Option<TaskId> {
        let pos = releaser
            .and_then(|task| self.holders.iter().position(|h| h.task == task))
            .or_else(|| (self.holders.len() == 1).then(|| 0))?;
        let holder = &mut self.holders[pos];
        let task = holder.task;
        holder.count -= 1;
        if holder.count == 0 {
            self.holders.swap_remove(pos);
        }
        Some(task)
    }

    pub fn count_of(&self, task: TaskId) -> u32 {
        self.holders
            .iter()
            .find(|h| h.task == task)
            .map_or(0, |h| h.count)
    }

    pub fn contains(&self, task: TaskId) -> bool {
        self.holders.iter().any(|h| h.task == task)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Holder> {
        self.holders.iter()
    }

    pub fn tasks(&self) -> Vec<TaskId> {
        self.holders.iter().map(|h| h.task).collect()
    }

    pub fn len(&self) -> usize {
        self.holders.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }
}
