//! Standard runtime services backed by Rust's `std` library.
//!
//! This crate provides a concrete [`RuntimeScheduler`] for `compose-map-core`.
//! Hosts construct a [`StdRuntime`], hand its handle to the coordinator and
//! poll [`StdRuntime::take_turn_request`] (or register a waker) to learn when
//! queued work is waiting.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use compose_map_core::{Runtime, RuntimeHandle, RuntimeScheduler};

type Waker = Arc<dyn Fn() + Send + Sync + 'static>;

/// Scheduler that records turn requests in an atomic flag.
pub struct StdScheduler {
    turn_requested: AtomicBool,
    turn_waker: RwLock<Option<Waker>>,
}

impl StdScheduler {
    pub fn new() -> Self {
        Self {
            turn_requested: AtomicBool::new(false),
            turn_waker: RwLock::new(None),
        }
    }

    /// Returns whether a turn has been requested since the last call.
    pub fn take_turn_request(&self) -> bool {
        self.turn_requested.swap(false, Ordering::SeqCst)
    }

    /// Registers a waker that will be invoked whenever a new turn is requested.
    pub fn set_turn_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self
            .turn_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(waker));
    }

    /// Clears any registered turn waker.
    pub fn clear_turn_waker(&self) {
        *self
            .turn_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn wake(&self) {
        let waker = self
            .turn_waker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field("turn_requested", &self.turn_requested.load(Ordering::SeqCst))
            .finish()
    }
}

impl RuntimeScheduler for StdScheduler {
    fn request_turn(&self) {
        self.turn_requested.store(true, Ordering::SeqCst);
        self.wake();
    }
}

type RemoteTask = Box<dyn FnOnce() + Send + 'static>;

/// Queue other threads use to hop onto the thread that drives the runtime.
///
/// Renderer engines frequently report results from worker threads; posting
/// here keeps every coordinator callback on one serial context.
#[derive(Clone)]
pub struct RemoteTaskQueue {
    tasks: Arc<Mutex<VecDeque<RemoteTask>>>,
    scheduler: Arc<StdScheduler>,
}

impl RemoteTaskQueue {
    fn new(scheduler: Arc<StdScheduler>) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(VecDeque::new())),
            scheduler,
        }
    }

    /// Queues `task` and asks for a turn. Callable from any thread.
    pub fn post(&self, task: impl FnOnce() + Send + 'static) {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Box::new(task));
        self.scheduler.request_turn();
    }

    pub fn len(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs every task posted so far on the calling thread.
    fn drain(&self) -> usize {
        let tasks: Vec<RemoteTask> = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        let count = tasks.len();
        for task in tasks {
            task();
        }
        count
    }
}

impl fmt::Debug for RemoteTaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTaskQueue")
            .field("pending", &self.len())
            .finish()
    }
}

/// Convenience container bundling the standard scheduler, the serial runtime
/// and the cross-thread queue feeding it.
#[derive(Clone)]
pub struct StdRuntime {
    scheduler: Arc<StdScheduler>,
    runtime: Runtime,
    remote: RemoteTaskQueue,
}

impl StdRuntime {
    pub fn new() -> Self {
        let scheduler = Arc::new(StdScheduler::default());
        let runtime = Runtime::new(scheduler.clone());
        let remote = RemoteTaskQueue::new(Arc::clone(&scheduler));
        Self {
            scheduler,
            runtime,
            remote,
        }
    }

    /// Returns the [`compose_map_core::Runtime`] configured with the standard scheduler.
    pub fn runtime(&self) -> Runtime {
        self.runtime.clone()
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn scheduler(&self) -> Arc<StdScheduler> {
        Arc::clone(&self.scheduler)
    }

    /// Sender half for other threads.
    pub fn remote_queue(&self) -> RemoteTaskQueue {
        self.remote.clone()
    }

    /// Returns whether a turn was requested since the last poll.
    pub fn take_turn_request(&self) -> bool {
        self.scheduler.take_turn_request()
    }

    pub fn set_turn_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.scheduler.set_turn_waker(waker);
    }

    pub fn clear_turn_waker(&self) {
        self.scheduler.clear_turn_waker();
    }

    /// Whether remote posts or runtime tasks are waiting.
    pub fn has_pending_work(&self) -> bool {
        !self.remote.is_empty() || self.runtime.has_pending_tasks()
    }

    /// Runs one host turn: remote posts first, then the runtime's queue.
    /// Returns the number of tasks executed.
    pub fn run_turn(&self) -> usize {
        let remote = self.remote.drain();
        let local = self.runtime.drain_tasks();
        if remote + local > 0 {
            log::trace!("turn {} ran {remote} remote and {local} local tasks", self.runtime.turn());
        }
        remote + local
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .field("remote", &self.remote)
            .finish()
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}
