use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::platform::RuntimeScheduler;

type Task = Box<dyn FnOnce() + 'static>;

struct RuntimeInner {
    scheduler: Arc<dyn RuntimeScheduler>,
    needs_turn: Cell<bool>,
    pending_tasks: RefCell<VecDeque<Task>>, // FUTURE(no_std): migrate to ring buffer.
    turn: Cell<u64>,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            scheduler,
            needs_turn: Cell::new(false),
            pending_tasks: RefCell::new(VecDeque::new()),
            turn: Cell::new(0),
        }
    }

    fn schedule(&self) {
        self.needs_turn.set(true);
        self.scheduler.request_turn();
    }

    fn enqueue_task(&self, task: Task) {
        self.pending_tasks.borrow_mut().push_back(task);
        self.schedule();
    }

    /// Runs the tasks that were queued before this call. Tasks queued while
    /// draining wait for the following turn.
    fn drain_tasks(&self) -> usize {
        let tasks: Vec<Task> = {
            let mut pending = self.pending_tasks.borrow_mut();
            pending.drain(..).collect()
        };
        self.turn.set(self.turn.get() + 1);
        let count = tasks.len();
        for task in tasks {
            task();
        }
        if !self.has_tasks() {
            self.needs_turn.set(false);
        }
        count
    }

    fn has_tasks(&self) -> bool {
        !self.pending_tasks.borrow().is_empty()
    }
}

/// Serial task queue shared by everything that runs on the host's update turn.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>, // FUTURE(no_std): replace Rc with arena-managed runtime storage.
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    pub fn needs_turn(&self) -> bool {
        self.inner.needs_turn.get()
    }

    pub fn has_pending_tasks(&self) -> bool {
        self.inner.has_tasks()
    }

    /// Runs one host turn worth of queued tasks.
    pub fn drain_tasks(&self) -> usize {
        self.inner.drain_tasks()
    }

    /// Number of turns drained so far.
    pub fn turn(&self) -> u64 {
        self.inner.turn.get()
    }
}

#[derive(Default)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn request_turn(&self) {}
}

#[cfg(test)]
#[derive(Default)]
pub struct TestScheduler {
    requests: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl TestScheduler {
    pub fn requests(&self) -> usize {
        self.requests.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl RuntimeScheduler for TestScheduler {
    fn request_turn(&self) {
        self.requests
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct RuntimeHandle(Weak<RuntimeInner>);

impl RuntimeHandle {
    pub fn schedule(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.schedule();
        }
    }

    /// Queues `task` for the next turn. Without a live runtime the task is
    /// dropped unrun.
    pub fn spawn_task(&self, task: Box<dyn FnOnce() + 'static>) {
        match self.0.upgrade() {
            Some(inner) => inner.enqueue_task(task),
            None => {
                log::warn!("runtime gone; dropping spawned task");
                drop(task);
            }
        }
    }

    pub fn drain_tasks(&self) -> usize {
        self.0
            .upgrade()
            .map(|inner| inner.drain_tasks())
            .unwrap_or(0)
    }

    pub fn has_pending_tasks(&self) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.has_tasks())
            .unwrap_or(false)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
