use crate::error::Error;
use crate::task::{Kernel, Platform, Priority, SignalFlags, TaskId};

use super::{errno, ret};

pub fn sys_kill<P: Platform>(kernel: &Kernel<P>, tid: usize, signum: usize) -> isize {
    let flag = match u32::try_from(signum)
        .ok()
        .and_then(|n| 1u32.checked_shl(n))
        .and_then(SignalFlags::from_bits)
    {
        Some(flag) => flag,
        None => return errno(Error::Invalid),
    };
    ret(kernel.kill(TaskId::from(tid), flag))
}

pub fn sys_setpriority<P: Platform>(kernel: &Kernel<P>, tid: usize, prio: usize) -> isize {
    match Priority::try_from(prio) {
        Ok(prio) => ret(kernel.set_base_priority(TaskId::from(tid), prio)),
        Err(_) => errno(Error::Invalid),
    }
}
