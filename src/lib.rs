//! Blocking semaphores and mutexes for a small preemptive kernel.
//!
//! Tasks and semaphores are kernel objects addressed by [`TaskId`] and
//! [`SemId`]; all scheduler state lives in one [`Kernel`] instance that is
//! created at boot and handed to every call. Plain mutexes take a lock-free
//! fast path; everything else goes through the critical-section guarded slow
//! path, which also drives priority inheritance and priority protection.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[macro_use]
extern crate log;

pub mod arch;
pub mod config;
pub mod console;
mod error;
pub mod sem;
pub mod sync;
pub mod syscall;
pub mod task;
pub mod timer;

pub use config::KernelConfig;
pub use error::{Error, Result};
pub use sem::{Protocol, SemFlags, SemId};
pub use task::{Kernel, Platform, Priority, SignalFlags, TaskId, TaskState};
