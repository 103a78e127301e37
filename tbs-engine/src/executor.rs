// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Single-threaded executor.
//!
//! Tasks are polled in the order in which they become ready: newly spawned
//! tasks in spawn order and tasks resumed by a [`Clock`] in `(tick, sequence)`
//! order. Only one task is resumed from the clocks at a time, so given the
//! same set of tasks the execution order is always the same.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

use tbs_track::entity::Entity;
use tbs_track::trace;

use crate::time::clock::Clock;
use crate::time::simtime::SimTime;
use crate::types::SimResult;

static TASK_WAKER_VTABLE: RawWakerVTable =
    RawWakerVTable::new(clone_raw_waker, wake_task, wake_task_by_ref, drop_raw_waker);

fn waker_for_task(task: Rc<Task>) -> Waker {
    let ptr = Rc::into_raw(task) as *const ();
    // SAFETY: the pointer came from `Rc::into_raw` and the vtable functions
    // keep the strong count balanced.
    unsafe { Waker::from_raw(RawWaker::new(ptr, &TASK_WAKER_VTABLE)) }
}

unsafe fn clone_raw_waker(data: *const ()) -> RawWaker {
    unsafe {
        // Each waker owns one strong reference to the task
        Rc::increment_strong_count(data as *const Task);
    }
    RawWaker::new(data, &TASK_WAKER_VTABLE)
}

unsafe fn wake_task(data: *const ()) {
    let task = unsafe { Rc::from_raw(data as *const Task) };
    Task::schedule(task);
}

unsafe fn wake_task_by_ref(data: *const ()) {
    let task = unsafe {
        Rc::increment_strong_count(data as *const Task);
        Rc::from_raw(data as *const Task)
    };
    Task::schedule(task);
}

unsafe fn drop_raw_waker(data: *const ()) {
    unsafe {
        drop(Rc::from_raw(data as *const Task));
    }
}

type TaskFuture = Pin<Box<dyn Future<Output = SimResult>>>;

struct Task {
    /// Set to `None` once the task has completed or been cancelled.
    future: RefCell<Option<TaskFuture>>,
    executor_state: Weak<ExecutorState>,
}

impl Task {
    fn new(
        future: impl Future<Output = SimResult> + 'static,
        executor_state: &Rc<ExecutorState>,
    ) -> Task {
        Task {
            future: RefCell::new(Some(Box::pin(future))),
            executor_state: Rc::downgrade(executor_state),
        }
    }

    fn schedule(task: Rc<Task>) {
        if let Some(state) = task.executor_state.upgrade() {
            state.ready.borrow_mut().push_back(task);
        }
    }

    fn poll(&self, context: &mut Context) -> Poll<SimResult> {
        let mut guard = self.future.borrow_mut();
        let Some(future) = guard.as_mut() else {
            // Completed or cancelled tasks have nothing left to do
            return Poll::Ready(Ok(()));
        };
        let result = future.as_mut().poll(context);
        if result.is_ready() {
            *guard = None;
        }
        result
    }

    fn cancel(&self) {
        // Take the future out before dropping it so that any wakers it owns
        // can be dropped without the cell being borrowed.
        let future = self.future.borrow_mut().take();
        drop(future);
    }
}

struct ExecutorState {
    ready: RefCell<VecDeque<Rc<Task>>>,
    all_tasks: RefCell<Vec<Weak<Task>>>,
    time: RefCell<SimTime>,
}

impl ExecutorState {
    fn new(top: &Rc<Entity>) -> Self {
        Self {
            ready: RefCell::new(VecDeque::new()),
            all_tasks: RefCell::new(Vec::new()),
            time: RefCell::new(SimTime::new(top)),
        }
    }

    fn spawn(self: &Rc<Self>, future: impl Future<Output = SimResult> + 'static) {
        let task = Rc::new(Task::new(future, self));
        self.all_tasks.borrow_mut().push(Rc::downgrade(&task));
        self.ready.borrow_mut().push_back(task);
    }
}

/// Single-threaded executor
///
/// This is a thin-wrapper (using [`Rc`]) around the real executor, so that this
/// struct can be cloned and passed around.
///
/// See the [module documentation] for more details.
///
/// [module documentation]: index.html
#[derive(Clone)]
pub struct Executor {
    pub entity: Rc<Entity>,
    state: Rc<ExecutorState>,
}

impl Executor {
    pub fn spawn(&self, future: impl Future<Output = SimResult> + 'static) {
        self.state.spawn(future);
    }

    /// Run until there are no tasks left to resume or, if a horizon is given,
    /// until the next event would be at or beyond `horizon_ns`.
    ///
    /// The first task to return an error stops the run and the error is
    /// returned.
    pub fn run(&self, horizon_ns: Option<f64>) -> SimResult {
        loop {
            self.poll_ready()?;

            let next = self.state.time.borrow_mut().advance_time(horizon_ns);
            match next {
                Some(waker) => waker.wake(),
                None => break,
            }
        }

        if let Some(horizon_ns) = horizon_ns {
            self.state
                .time
                .borrow_mut()
                .advance_all_clocks_to(horizon_ns);
        }
        Ok(())
    }

    /// Poll every ready task, including any that become ready while doing so.
    fn poll_ready(&self) -> SimResult {
        loop {
            let task = self.state.ready.borrow_mut().pop_front();
            let Some(task) = task else {
                return Ok(());
            };

            let waker = waker_for_task(task.clone());
            let mut context = Context::from_waker(&waker);

            match task.poll(&mut context) {
                Poll::Ready(Err(e)) => {
                    // Error - return early
                    return Err(e);
                }
                Poll::Ready(Ok(())) => {
                    // Otherwise, drop task as it is complete
                }
                Poll::Pending => {
                    // Task will have parked itself waiting somewhere
                }
            }
        }
    }

    /// Drop every task that has not completed.
    ///
    /// Waiting tasks are removed from the clocks and the futures of all
    /// remaining tasks are dropped.
    pub fn cancel_all(&self) {
        let tasks: Vec<Weak<Task>> = self.state.all_tasks.borrow_mut().drain(..).collect();
        let num_live = tasks.iter().filter(|t| t.strong_count() > 0).count();
        trace!(self.entity ; "Cancelling {} tasks", num_live);

        self.state.ready.borrow_mut().clear();
        self.state.time.borrow_mut().clear();
        for task in tasks {
            if let Some(task) = task.upgrade() {
                task.cancel();
            }
        }
    }

    /// Number of tasks that are still alive.
    #[must_use]
    pub fn num_live_tasks(&self) -> usize {
        let mut all_tasks = self.state.all_tasks.borrow_mut();
        all_tasks.retain(|t| t.strong_count() > 0);
        all_tasks.len()
    }

    pub fn get_clock(&self, freq_mhz: f64) -> Clock {
        self.state.time.borrow_mut().get_clock(freq_mhz)
    }

    #[must_use]
    pub fn time_now_ns(&self) -> f64 {
        self.state.time.borrow().time_now_ns()
    }
}

/// `Spawner` spawns new futures into the executor.
#[derive(Clone)]
pub struct Spawner {
    state: Rc<ExecutorState>,
}

impl Spawner {
    pub fn spawn(&self, future: impl Future<Output = SimResult> + 'static) {
        self.state.spawn(future);
    }
}

pub fn new_executor_and_spawner(top: &Rc<Entity>) -> (Executor, Spawner) {
    let state = Rc::new(ExecutorState::new(top));
    let entity = Rc::new(Entity::new(top, "executor"));
    (
        Executor {
            entity,
            state: state.clone(),
        },
        Spawner { state },
    )
}
