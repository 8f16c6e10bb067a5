//! Numbered entry points over the semaphore calls, returning `0` or a value
//! on success and a negated errno on failure.

const SYSCALL_KILL: usize = 129;
const SYSCALL_SETPRIORITY: usize = 140;
const SYSCALL_MUTEX_CREATE: usize = 1010;
const SYSCALL_MUTEX_LOCK: usize = 1011;
const SYSCALL_MUTEX_UNLOCK: usize = 1012;
const SYSCALL_MUTEX_TRYLOCK: usize = 1013;
const SYSCALL_SEMAPHORE_CREATE: usize = 1020;
const SYSCALL_SEMAPHORE_UP: usize = 1021;
const SYSCALL_SEMAPHORE_DOWN: usize = 1022;
const SYSCALL_SEMAPHORE_TRYDOWN: usize = 1023;
const SYSCALL_SEMAPHORE_TIMEDDOWN: usize = 1024;
const SYSCALL_SEMAPHORE_GETVALUE: usize = 1025;
const SYSCALL_SEMAPHORE_DESTROY: usize = 1026;

mod signal;
mod sync;

use self::signal::*;
use self::sync::*;
use crate::error::{Error, Result};
use crate::task::{Kernel, Platform};

pub fn syscall<P: Platform>(kernel: &Kernel<P>, syscall_id: usize, args: [usize; 3]) -> isize {
    match syscall_id {
        SYSCALL_KILL => sys_kill(kernel, args[0], args[1]),
        SYSCALL_SETPRIORITY => sys_setpriority(kernel, args[0], args[1]),
        SYSCALL_MUTEX_CREATE => sys_mutex_create(kernel, args[0], args[1]),
        SYSCALL_MUTEX_LOCK => sys_semaphore_down(kernel, args[0]),
        SYSCALL_MUTEX_UNLOCK => sys_semaphore_up(kernel, args[0]),
        SYSCALL_MUTEX_TRYLOCK => sys_semaphore_trydown(kernel, args[0]),
        SYSCALL_SEMAPHORE_CREATE => sys_semaphore_create(kernel, args[0]),
        SYSCALL_SEMAPHORE_UP => sys_semaphore_up(kernel, args[0]),
        SYSCALL_SEMAPHORE_DOWN => sys_semaphore_down(kernel, args[0]),
        SYSCALL_SEMAPHORE_TRYDOWN => sys_semaphore_trydown(kernel, args[0]),
        SYSCALL_SEMAPHORE_TIMEDDOWN => sys_semaphore_timeddown(kernel, args[0], args[1]),
        SYSCALL_SEMAPHORE_GETVALUE => sys_semaphore_getvalue(kernel, args[0]),
        SYSCALL_SEMAPHORE_DESTROY => sys_semaphore_destroy(kernel, args[0]),
        _ => {
            warn!("Unsupported syscall_id: {}", syscall_id);
            errno(Error::Invalid)
        }
    }
}

fn errno(err: Error) -> isize {
    -(err.errno() as isize)
}

fn ret(result: Result<()>) -> isize {
    match result {
        Ok(()) => 0,
        Err(err) => errno(err),
    }
}
