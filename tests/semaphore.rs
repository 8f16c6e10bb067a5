mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{Events, Harness};
use rtsem::{Error, SemFlags, TaskState};

#[test]
fn counting_wait_then_post_then_trywait() {
    let mut h = Harness::new();
    let sem = h.kernel.sem_init(0, SemFlags::empty()).unwrap();
    let events = Events::default();

    let ev = events.clone();
    let t1 = h.spawn("t1", 5, move |k, _| {
        ev.push("t1 waits");
        assert_eq!(k.sem_wait(sem), Ok(()));
        ev.push("t1 resumed");
    });
    let ev = events.clone();
    h.spawn("t2", 5, move |k, _| {
        ev.push("t2 posts");
        k.sem_post(sem);
    });
    let ev = events.clone();
    h.spawn("t3", 5, move |k, _| {
        assert_eq!(k.sem_try_wait(sem), Err(Error::WouldBlock));
        ev.push("t3 would block");
    });

    h.run();
    assert_eq!(h.kernel.task_state(t1), Some(TaskState::Zombie));
    assert_eq!(
        events.take(),
        ["t1 waits", "t2 posts", "t3 would block", "t1 resumed"]
    );
    assert_eq!(h.kernel.sem_get_value(sem), Ok(0));
    h.join();
}

#[test]
fn uncontended_mutex_takes_fast_path() {
    let mut h = Harness::new();
    let m = h.kernel.sem_init(1, SemFlags::MUTEX).unwrap();
    let gate = h.kernel.sem_init(0, SemFlags::empty()).unwrap();
    let events = Events::default();

    let ev = events.clone();
    h.spawn("t1", 5, move |k, _| {
        let before = k.platform().switch_count();
        assert_eq!(k.sem_wait(m), Ok(()));
        assert_eq!(k.platform().switch_count(), before);
        ev.push("t1 locked");
        k.sem_wait(gate).unwrap();
        ev.push("t1 unlocks");
        k.sem_post(m);
        ev.push("t1 done");
    });
    let ev = events.clone();
    let t2 = h.spawn("t2", 5, move |k, _| {
        ev.push("t2 waits");
        assert_eq!(k.sem_wait(m), Ok(()));
        ev.push("t2 locked");
        k.sem_post(m);
    });

    h.run();
    assert_eq!(h.kernel.task_state(t2), Some(TaskState::WaitSem));
    assert_eq!(h.kernel.waitobj(t2), Some(m));
    assert_eq!(h.kernel.sem_get_value(m), Ok(-1));

    h.interrupt(|k| k.sem_post(gate));
    h.run();
    assert_eq!(
        events.take(),
        ["t1 locked", "t2 waits", "t1 unlocks", "t1 done", "t2 locked"]
    );
    assert_eq!(h.kernel.sem_get_value(m), Ok(1));
    h.join();
}

#[test]
fn equal_priorities_wake_in_arrival_order() {
    let mut h = Harness::new();
    let sem = h.kernel.sem_init(0, SemFlags::empty()).unwrap();
    let events = Events::default();

    let mut tasks = Vec::new();
    for name in ["a", "b"] {
        let ev = events.clone();
        tasks.push(h.spawn(name, 5, move |k, _| {
            k.sem_wait(sem).unwrap();
            ev.push(name);
        }));
    }
    h.run();
    assert_eq!(h.kernel.sem_waiters(sem), tasks);
    assert_eq!(h.kernel.sem_get_value(sem), Ok(-2));

    // A post from an interrupt handler only makes the waiter ready.
    let switches = h.switches().len();
    h.interrupt(|k| k.sem_post(sem));
    assert_eq!(h.switches().len(), switches);
    assert_eq!(h.kernel.task_state(tasks[0]), Some(TaskState::Ready));
    h.run();
    assert_eq!(events.take(), ["a"]);

    h.interrupt(|k| k.sem_post(sem));
    h.run();
    assert_eq!(events.take(), ["b"]);
    h.join();
}

#[test]
fn higher_priority_waiter_is_woken_first() {
    let mut h = Harness::new();
    let sem = h.kernel.sem_init(0, SemFlags::empty()).unwrap();
    let events = Events::default();

    let ev = events.clone();
    let a = h.spawn("a", 5, move |k, _| {
        k.sem_wait(sem).unwrap();
        ev.push("a");
    });
    h.run();
    let ev = events.clone();
    let b = h.spawn("b", 9, move |k, _| {
        k.sem_wait(sem).unwrap();
        ev.push("b");
    });
    h.run();
    assert_eq!(h.kernel.sem_waiters(sem), [b, a]);

    h.interrupt(|k| k.sem_post(sem));
    h.run();
    assert_eq!(events.take(), ["b"]);
    assert_eq!(h.kernel.task_state(a), Some(TaskState::WaitSem));

    h.interrupt(|k| k.sem_post(sem));
    h.run();
    assert_eq!(events.take(), ["a"]);
    h.join();
}

#[test]
fn post_from_task_preempts_for_more_urgent_waiter() {
    let mut h = Harness::new();
    let sem = h.kernel.sem_init(0, SemFlags::empty()).unwrap();
    let events = Events::default();

    let ev = events.clone();
    h.spawn("high", 9, move |k, _| {
        k.sem_wait(sem).unwrap();
        ev.push("high");
    });
    let ev = events.clone();
    h.spawn("low", 2, move |k, _| {
        k.sem_post(sem);
        ev.push("low");
    });
    h.run();
    assert_eq!(events.take(), ["high", "low"]);
    h.join();
}

/// Runs `tasks` tasks that each enter the section guarded by `guard` `rounds`
/// times, parking inside it until the test thread posts `park`. Returns the
/// largest number of tasks ever inside at once.
fn max_concurrency(initial: u32, flags: SemFlags, tasks: usize, rounds: usize) -> usize {
    let mut h = Harness::new();
    let guard = h.kernel.sem_init(initial, flags).unwrap();
    let park = h.kernel.sem_init(0, SemFlags::empty()).unwrap();
    let inside = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    for i in 0..tasks {
        let inside = inside.clone();
        let peak = peak.clone();
        h.spawn(&format!("worker{}", i), 3 + i as u8, move |k, _| {
            for _ in 0..rounds {
                k.sem_wait(guard).unwrap();
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                k.sem_wait(park).unwrap();
                inside.fetch_sub(1, Ordering::SeqCst);
                k.sem_post(guard);
            }
        });
    }

    h.run();
    for _ in 0..tasks * rounds {
        h.interrupt(|k| k.sem_post(park));
        h.run();
    }
    assert_eq!(h.kernel.sem_get_value(guard), Ok(initial as i32));
    assert_eq!(h.kernel.sem_get_value(park), Ok(0));
    h.join();
    peak.load(Ordering::SeqCst)
}

#[test]
fn mutex_admits_one_holder() {
    assert_eq!(max_concurrency(1, SemFlags::MUTEX, 4, 3), 1);
}

#[test]
fn inheriting_mutex_admits_one_holder() {
    assert_eq!(
        max_concurrency(1, SemFlags::MUTEX | SemFlags::PRIO_INHERIT, 4, 3),
        1
    );
}

#[test]
fn counting_semaphore_admits_up_to_its_count() {
    assert_eq!(max_concurrency(2, SemFlags::empty(), 4, 3), 2);
}

#[test]
fn destroy_of_idle_semaphore_succeeds() {
    let mut h = Harness::new();
    let sem = h.kernel.sem_init(1, SemFlags::empty()).unwrap();
    h.spawn("user", 4, move |k, _| {
        k.sem_wait(sem).unwrap();
        k.sem_post(sem);
        k.sem_destroy(sem).unwrap();
        assert_eq!(k.sem_wait(sem), Err(Error::Invalid));
    });
    h.run();
    h.join();
}

#[test]
#[should_panic(expected = "interrupt context")]
fn waiting_in_an_interrupt_handler_is_fatal() {
    let h = Harness::new();
    let sem = h.kernel.sem_init(1, SemFlags::empty()).unwrap();
    h.interrupt(|k| k.sem_wait(sem)).ok();
}
