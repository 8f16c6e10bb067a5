use alloc::string::String;
use alloc::vec::Vec;
use core::ops::{Index, IndexMut};

use super::signal::SignalFlags;
use crate::config::IDLE_PRIORITY;
use crate::error::{Error, Result};
use crate::sem::SemId;

/// Scheduling priority. Larger is more urgent; 0 belongs to the idle task.
pub type Priority = u8;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TaskId(usize);

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TaskState {
    Ready = 1,
    Running = 2,
    /// Blocked in a semaphore wait-queue; `Tcb::waitobj` names which one.
    WaitSem = 3,
    Zombie = 4,
}

/// Per-task state record.
pub struct Tcb {
    pub name: String,
    pub state: TaskState,
    /// Priority assigned at spawn or by `set_base_priority`.
    pub base_priority: Priority,
    /// Effective priority, possibly boosted by inheritance or a ceiling.
    pub priority: Priority,
    pub waitobj: Option<SemId>,
    /// Wake reason of the last blocking wait. `None` means granted.
    pub errcode: Option<Error>,
    pub signals: SignalFlags,
}

/// Fixed-capacity task table. Slots are never reused, so a stale `TaskId`
/// keeps naming the zombie it was issued for.
pub struct TaskTable {
    tasks: Vec<Tcb>,
    capacity: usize,
}

impl TaskId {
    pub const IDLE: Self = Self(0);

    pub const fn as_usize(&self) -> usize {
        self.0
    }

    pub const fn is_idle(&self) -> bool {
        self.0 == Self::IDLE.0
    }
}

impl From<usize> for TaskId {
    fn from(tid: usize) -> Self {
        Self(tid)
    }
}

impl Tcb {
    pub fn new(name: &str, priority: Priority) -> Self {
        Self {
            name: String::from(name),
            state: TaskState::Ready,
            base_priority: priority,
            priority,
            waitobj: None,
            errcode: None,
            signals: SignalFlags::empty(),
        }
    }

    fn new_idle() -> Self {
        let mut idle = Self::new("idle", IDLE_PRIORITY);
        idle.state = TaskState::Running;
        idle
    }
}

impl TaskTable {
    /// Creates the table with the idle task already in slot 0.
    pub fn new(capacity: usize) -> Self {
        let mut tasks = Vec::with_capacity(capacity);
        tasks.push(Tcb::new_idle());
        Self { tasks, capacity }
    }

    pub fn alloc(&mut self, tcb: Tcb) -> Result<TaskId> {
        if self.tasks.len() >= self.capacity {
            return Err(Error::NoSpace);
        }
        self.tasks.push(tcb);
        Ok(TaskId(self.tasks.len() - 1))
    }

    pub fn get(&self, tid: TaskId) -> Option<&Tcb> {
        self.tasks.get(tid.0)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }
}

impl Index<TaskId> for TaskTable {
    type Output = Tcb;

    fn index(&self, tid: TaskId) -> &Tcb {
        &self.tasks[tid.0]
    }
}

impl IndexMut<TaskId> for TaskTable {
    fn index_mut(&mut self, tid: TaskId) -> &mut Tcb {
        &mut self.tasks[tid.0]
    }
}
