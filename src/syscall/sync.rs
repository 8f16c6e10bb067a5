use crate::error::Error;
use crate::sem::{Protocol, SemFlags, SemId};
use crate::task::{Kernel, Platform};

use super::{errno, ret};

pub fn sys_mutex_create<P: Platform>(kernel: &Kernel<P>, protocol: usize, ceiling: usize) -> isize {
    let protocol = match protocol {
        0 => Protocol::None,
        1 => Protocol::Inherit,
        2 => Protocol::Protect,
        _ => return errno(Error::Invalid),
    };
    let sem = match kernel.sem_init(1, SemFlags::MUTEX | protocol.flags()) {
        Ok(sem) => sem,
        Err(err) => return errno(err),
    };
    if protocol == Protocol::Protect {
        let result = u8::try_from(ceiling)
            .map_err(|_| Error::Invalid)
            .and_then(|ceiling| kernel.sem_set_ceiling(sem, ceiling));
        if let Err(err) = result {
            // Freshly created, so it has no waiters or holders to refuse on.
            if let Err(destroy) = kernel.sem_destroy(sem) {
                warn!("cannot reclaim {:?}: {}", sem, destroy);
            }
            return errno(err);
        }
    }
    sem.as_usize() as isize
}

pub fn sys_semaphore_create<P: Platform>(kernel: &Kernel<P>, res_count: usize) -> isize {
    let res_count = match u32::try_from(res_count) {
        Ok(count) => count,
        Err(_) => return errno(Error::Invalid),
    };
    match kernel.sem_init(res_count, SemFlags::empty()) {
        Ok(sem) => sem.as_usize() as isize,
        Err(err) => errno(err),
    }
}

pub fn sys_semaphore_up<P: Platform>(kernel: &Kernel<P>, sem_id: usize) -> isize {
    ret(kernel.try_post(SemId::from(sem_id)))
}

pub fn sys_semaphore_down<P: Platform>(kernel: &Kernel<P>, sem_id: usize) -> isize {
    ret(kernel.sem_wait(SemId::from(sem_id)))
}

pub fn sys_semaphore_trydown<P: Platform>(kernel: &Kernel<P>, sem_id: usize) -> isize {
    ret(kernel.sem_try_wait(SemId::from(sem_id)))
}

pub fn sys_semaphore_timeddown<P: Platform>(kernel: &Kernel<P>, sem_id: usize, ticks: usize) -> isize {
    ret(kernel.sem_timed_wait(SemId::from(sem_id), ticks as u64))
}

pub fn sys_semaphore_getvalue<P: Platform>(kernel: &Kernel<P>, sem_id: usize) -> isize {
    match kernel.sem_get_value(SemId::from(sem_id)) {
        Ok(value) => value as isize,
        Err(err) => errno(err),
    }
}

pub fn sys_semaphore_destroy<P: Platform>(kernel: &Kernel<P>, sem_id: usize) -> isize {
    ret(kernel.sem_destroy(SemId::from(sem_id)))
}
