//! Host shell that owns the runtime, the coordinator and a renderer.

use compose_map::{ApplyFailure, CoordinatorOptions, CycleReport, MapCoordinator, MapDeclaration};
use compose_map_core::{ContentError, RuntimeHandle};
use compose_map_renderer::{MapRenderer, ScreenPoint};
use compose_map_runtime_std::{RemoteTaskQueue, StdRuntime};

#[derive(Clone, Debug)]
pub struct ShellConfig {
    pub coordinator: CoordinatorOptions,
    /// Upper bound on turns a single [`MapShell::pump`] runs.
    pub max_turns_per_pump: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            coordinator: CoordinatorOptions::default(),
            max_turns_per_pump: 64,
        }
    }
}

pub struct MapShell<R: MapRenderer> {
    runtime: StdRuntime,
    coordinator: MapCoordinator,
    renderer: R,
    config: ShellConfig,
    live: bool,
}

impl<R: MapRenderer> MapShell<R> {
    pub fn new(renderer: R, config: ShellConfig) -> Self {
        let runtime = StdRuntime::new();
        let coordinator = MapCoordinator::new(runtime.runtime_handle(), config.coordinator.clone());
        Self {
            runtime,
            coordinator,
            renderer,
            config,
            live: false,
        }
    }

    /// Reconciles the renderer against `declaration`.
    pub fn update(&mut self, declaration: &MapDeclaration) -> Result<CycleReport, ContentError> {
        let report = self.coordinator.update(&mut self.renderer, declaration)?;
        self.live = true;
        Ok(report)
    }

    /// Runs queued turns until the queue is empty or the configured bound
    /// is reached. Returns the number of tasks executed.
    pub fn pump(&mut self) -> usize {
        let mut executed = 0;
        let mut turns = 0;
        while turns < self.config.max_turns_per_pump && self.runtime.has_pending_work() {
            executed += self.runtime.run_turn();
            turns += 1;
        }
        if self.runtime.has_pending_work() {
            log::debug!(
                "pump stopped after {turns} turns with work still queued ({executed} tasks ran)"
            );
        }
        executed
    }

    /// Whether queued work or a bound-state write is waiting for the host.
    ///
    /// Consumes the pending turn request.
    pub fn needs_turn(&self) -> bool {
        let requested = self.runtime.take_turn_request();
        requested || self.runtime.has_pending_work()
    }

    pub fn tap(&mut self, point: ScreenPoint) {
        self.coordinator.tap(&mut self.renderer, point);
    }

    pub fn long_press(&mut self, point: ScreenPoint) {
        self.coordinator.long_press(&mut self.renderer, point);
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.runtime_handle()
    }

    /// Queue for renderer threads that need to deliver work to this shell.
    pub fn remote_queue(&self) -> RemoteTaskQueue {
        self.runtime.remote_queue()
    }

    pub fn set_turn_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.runtime.set_turn_waker(waker);
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn coordinator(&self) -> &MapCoordinator {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut MapCoordinator {
        &mut self.coordinator
    }

    /// Destroys every backing object. A later [`MapShell::update`] starts
    /// from scratch.
    pub fn teardown(&mut self) -> Vec<ApplyFailure> {
        if !self.live {
            return Vec::new();
        }
        self.live = false;
        self.coordinator.teardown(&mut self.renderer)
    }
}

impl<R: MapRenderer> Drop for MapShell<R> {
    fn drop(&mut self) {
        self.teardown();
        self.runtime.clear_turn_waker();
    }
}
