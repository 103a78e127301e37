// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! The [`Engine`] owns the executor, time and the components of a simulation.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use tbs_track::entity::{Entity, toplevel};
use tbs_track::tracker::stdout_tracker;
use tbs_track::{Tracker, debug, trace};

use crate::executor::{self, Executor, Spawner};
use crate::time::clock::Clock;
use crate::types::{Component, SimResult};

pub struct Registry {
    pub entity: Rc<Entity>,
    components: RefCell<Vec<Component>>,
}

impl Registry {
    fn new(parent: &Rc<Entity>) -> Self {
        Self {
            entity: Rc::new(Entity::new(parent, "registry")),
            components: RefCell::new(Vec::new()),
        }
    }

    pub fn spawn_components(&self, spawner: &Spawner) {
        let mut guard = self.components.borrow_mut();

        trace!(self.entity ; "Spawning {} components", guard.len());

        for component in guard.drain(..) {
            spawner.spawn(async move { component.run().await });
        }
    }

    pub fn register(&self, component: Component) {
        self.components.borrow_mut().push(component);
    }
}

pub struct Engine {
    pub executor: Executor,
    spawner: Spawner,
    toplevel: Rc<Entity>,
    tracker: Tracker,
    registry: Registry,
}

impl Engine {
    /// Create a standalone engine.
    pub fn new(tracker: &Tracker) -> Self {
        let toplevel = toplevel(tracker, "top");
        let (executor, spawner) = executor::new_executor_and_spawner(&toplevel);
        let registry = Registry::new(&toplevel);
        Self {
            executor,
            spawner,
            toplevel,
            tracker: tracker.clone(),
            registry,
        }
    }

    /// Register a component that will be run as the simulation starts
    pub fn register(&self, component: Component) {
        self.registry.register(component);
    }

    /// Run until no task has anything left to do.
    pub fn run(&mut self) -> SimResult {
        self.registry.spawn_components(&self.spawner);
        let result = self.executor.run(None);
        if result.is_err() {
            self.executor.cancel_all();
        }
        result
    }

    /// Run all events that are due strictly before `horizon_ns`.
    ///
    /// Time is left at the horizon and every task that has not completed is
    /// cancelled, so the engine cannot be resumed.
    pub fn run_until_ns(&mut self, horizon_ns: f64) -> SimResult {
        self.registry.spawn_components(&self.spawner);
        let result = self.executor.run(Some(horizon_ns));
        debug!(self.toplevel ; "Run stopped at {:.1}ns", self.time_now_ns());
        self.executor.cancel_all();
        result
    }

    #[must_use]
    pub fn spawner(&self) -> Spawner {
        self.spawner.clone()
    }

    pub fn spawn(&self, future: impl Future<Output = SimResult> + 'static) {
        self.spawner.spawn(future);
    }

    #[must_use]
    pub fn clock_mhz(&mut self, freq_mhz: f64) -> Clock {
        self.executor.get_clock(freq_mhz)
    }

    #[must_use]
    pub fn time_now_ns(&self) -> f64 {
        self.executor.time_now_ns()
    }

    #[must_use]
    pub fn top(&self) -> &Rc<Entity> {
        &self.toplevel
    }

    #[must_use]
    pub fn tracker(&self) -> Tracker {
        self.tracker.clone()
    }
}

/// Create a default engine that sends [`Track`](tbs_track::Track) events to
/// stdout.
impl Default for Engine {
    fn default() -> Self {
        let tracker = stdout_tracker(log::Level::Warn);
        Self::new(&tracker)
    }
}
