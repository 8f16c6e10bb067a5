//! Host simulator: every kernel task is an OS thread, and a baton makes sure
//! exactly one of them runs at a time. The test thread itself is the idle
//! task and the source of interrupts.

#![allow(dead_code)]

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use rtsem::{Kernel, KernelConfig, Platform, Priority, TaskId};

pub type SimKernel = Kernel<SimPlatform>;

pub struct Sim {
    baton: Mutex<TaskId>,
    turn: Condvar,
    in_irq: AtomicBool,
    switches: Mutex<Vec<(TaskId, TaskId)>>,
}

impl Sim {
    fn new() -> Self {
        Self {
            baton: Mutex::new(TaskId::IDLE),
            turn: Condvar::new(),
            in_irq: AtomicBool::new(false),
            switches: Mutex::new(Vec::new()),
        }
    }

    fn hand_to(&self, to: TaskId) {
        *self.baton.lock().unwrap() = to;
        self.turn.notify_all();
    }

    fn wait_turn(&self, me: TaskId) {
        let mut baton = self.baton.lock().unwrap();
        while *baton != me {
            baton = self.turn.wait(baton).unwrap();
        }
    }
}

pub struct SimPlatform(Arc<Sim>);

impl SimPlatform {
    /// Context switches performed so far, for tasks to observe.
    pub fn switch_count(&self) -> usize {
        self.0.switches.lock().unwrap().len()
    }
}

impl Platform for SimPlatform {
    fn switch_context(&self, from: TaskId, to: TaskId) {
        self.0.switches.lock().unwrap().push((from, to));
        self.0.hand_to(to);
        self.0.wait_turn(from);
    }

    fn exit_context(&self, from: TaskId, to: TaskId) {
        self.0.switches.lock().unwrap().push((from, to));
        self.0.hand_to(to);
    }

    fn in_interrupt_context(&self) -> bool {
        self.0.in_irq.load(Ordering::SeqCst)
    }
}

pub struct Harness {
    pub kernel: Arc<SimKernel>,
    sim: Arc<Sim>,
    handles: Vec<JoinHandle<()>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(KernelConfig::default())
    }

    pub fn with_config(config: KernelConfig) -> Self {
        let sim = Arc::new(Sim::new());
        let kernel = Arc::new(Kernel::new(SimPlatform(sim.clone()), config));
        Self {
            kernel,
            sim,
            handles: Vec::new(),
        }
    }

    /// Creates a task running `body`. It starts at the next reschedule point
    /// and exits when `body` returns.
    pub fn spawn<F>(&mut self, name: &str, prio: Priority, body: F) -> TaskId
    where
        F: FnOnce(&SimKernel, TaskId) + Send + 'static,
    {
        let tid = self.kernel.spawn(name, prio).unwrap();
        let kernel = self.kernel.clone();
        let sim = self.sim.clone();
        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                sim.wait_turn(tid);
                let result = panic::catch_unwind(AssertUnwindSafe(|| body(&kernel, tid)));
                kernel.exit_current();
                if let Err(payload) = result {
                    panic::resume_unwind(payload);
                }
            })
            .unwrap();
        self.handles.push(handle);
        tid
    }

    /// Lets every ready task run until all of them have blocked or exited.
    pub fn run(&self) {
        self.kernel.reschedule();
    }

    /// Runs `f` as an interrupt handler on top of the idle task. Woken tasks
    /// only run at the following [`Harness::run`].
    pub fn interrupt<R>(&self, f: impl FnOnce(&SimKernel) -> R) -> R {
        self.sim.in_irq.store(true, Ordering::SeqCst);
        let r = f(&self.kernel);
        self.sim.in_irq.store(false, Ordering::SeqCst);
        r
    }

    pub fn switches(&self) -> Vec<(TaskId, TaskId)> {
        self.sim.switches.lock().unwrap().clone()
    }

    /// Waits for every task thread, re-raising the first task panic.
    pub fn join(self) {
        for handle in self.handles {
            if let Err(payload) = handle.join() {
                panic::resume_unwind(payload);
            }
        }
    }
}

/// Ordered record of what tasks observed, shared between task bodies.
#[derive(Clone, Default)]
pub struct Events(Arc<Mutex<Vec<String>>>);

impl Events {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}
