use crate::task::Priority;

/// Task table slots, including the idle task.
pub const MAX_TASKS: usize = 32;
/// Semaphore table slots.
pub const MAX_SEMAPHORES: usize = 64;
/// Holders tracked per protocol-enabled semaphore.
pub const MAX_HOLDERS: usize = 4;
/// Longest blocking chain priority inheritance will follow.
pub const MAX_INHERIT_DEPTH: usize = 8;

pub const IDLE_PRIORITY: Priority = 0;
pub const MIN_PRIORITY: Priority = 1;
pub const MAX_PRIORITY: Priority = 255;

/// Capacities fixed when the kernel boots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    pub max_tasks: usize,
    pub max_semaphores: usize,
    pub max_holders: usize,
    /// Exceeding this while propagating a boost is fatal.
    pub max_inherit_depth: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_tasks: MAX_TASKS,
            max_semaphores: MAX_SEMAPHORES,
            max_holders: MAX_HOLDERS,
            max_inherit_depth: MAX_INHERIT_DEPTH,
        }
    }
}
