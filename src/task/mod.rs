mod manager;
mod schedule;
mod signal;
mod structs;

pub use manager::{Kernel, Platform};
pub use schedule::{PriorityScheduler, Scheduler};
pub use signal::SignalFlags;
pub use structs::{Priority, TaskId, TaskState, Tcb};

pub(crate) use manager::KernelInner;
