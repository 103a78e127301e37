// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! This module represents a clock and the times at which tasks waiting on it
//! are due to be resumed.

use std::cell::{Cell, RefCell};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// ClockTick structure for representing a number of Clock ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTick {
    /// Clock ticks.
    tick: u64,
}

impl ClockTick {
    #[must_use]
    pub fn new() -> Self {
        Self { tick: 0 }
    }

    /// Get the current clock tick.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Change the default constructor value of `tick`.
    pub fn set_tick(&mut self, tick: u64) -> ClockTick {
        self.tick = tick;
        *self
    }

    /// Number of ticks from `earlier` to `self`, saturating at zero.
    #[must_use]
    pub fn ticks_since(&self, earlier: ClockTick) -> u64 {
        self.tick.saturating_sub(earlier.tick)
    }
}

/// Saturates at the last representable tick, which is never reached.
impl std::ops::Add<u64> for ClockTick {
    type Output = ClockTick;

    fn add(self, ticks: u64) -> ClockTick {
        ClockTick {
            tick: self.tick.saturating_add(ticks),
        }
    }
}

impl std::fmt::Display for ClockTick {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.tick)
    }
}

/// A task waiting to be resumed at a given tick.
///
/// `seq` is allocated from a counter shared by all clocks of an engine when
/// the wait is scheduled and is used to order tasks due at the same time.
pub struct TaskWaker {
    pub tick: ClockTick,
    pub seq: u64,
    pub waker: Waker,
}

impl PartialEq for TaskWaker {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick && self.seq == other.seq
    }
}

impl Eq for TaskWaker {}

impl Ord for TaskWaker {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tick
            .cmp(&other.tick)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for TaskWaker {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shared state between futures using a Clock and the Clock itself.
pub struct ClockState {
    now: Cell<ClockTick>,

    /// Min-heap of tasks waiting for the right time.
    waiting: RefCell<BinaryHeap<Reverse<TaskWaker>>>,

    /// Sequence counter shared with the other clocks of the same engine.
    sequence: Rc<Cell<u64>>,
}

impl ClockState {
    fn schedule(&self, tick: ClockTick, waker: Waker) {
        let seq = self.sequence.get();
        self.sequence.set(seq + 1);
        self.waiting
            .borrow_mut()
            .push(Reverse(TaskWaker { tick, seq, waker }));
    }

    /// The `(tick, seq)` of the next waiting task.
    pub fn peek_next(&self) -> Option<(ClockTick, u64)> {
        self.waiting
            .borrow()
            .peek()
            .map(|Reverse(next)| (next.tick, next.seq))
    }

    /// Remove the next waiting task and move the clock to its tick.
    pub fn pop_next(&self) -> Option<Waker> {
        let Reverse(next) = self.waiting.borrow_mut().pop()?;
        assert!(next.tick >= self.now.get(), "Time moving backwards");
        self.now.set(next.tick);
        Some(next.waker)
    }

    /// Number of tasks currently waiting on this clock.
    #[must_use]
    pub fn num_waiting(&self) -> usize {
        self.waiting.borrow().len()
    }

    /// Drop all waiting tasks.
    pub fn clear(&self) {
        // Take the heap out first so that dropping wakers cannot re-enter
        let waiting = std::mem::take(&mut *self.waiting.borrow_mut());
        drop(waiting);
    }

    fn advance_to(&self, tick: ClockTick) {
        if tick > self.now.get() {
            self.now.set(tick);
        }
    }
}

#[derive(Clone)]
/// State representing a clock.
pub struct Clock {
    /// Frequency of the clock in MHz.
    /// *Note*: Should never be changed as it is registered at this frequency.
    freq_mhz: f64,

    pub shared_state: Rc<ClockState>,
}

impl Clock {
    /// Create a new [Clock] at the specified frequency.
    ///
    /// The `sequence` counter must be shared by all clocks driven by the same
    /// executor.
    #[must_use]
    pub fn new(freq_mhz: f64, sequence: Rc<Cell<u64>>) -> Self {
        let shared_state = Rc::new(ClockState {
            now: Cell::new(ClockTick::new()),
            waiting: RefCell::new(BinaryHeap::new()),
            sequence,
        });

        Self {
            freq_mhz,
            shared_state,
        }
    }

    /// Returns the clocks frequency in MHz.
    #[must_use]
    pub fn freq_mhz(&self) -> f64 {
        self.freq_mhz
    }

    /// Returns the current [ClockTick].
    #[must_use]
    pub fn tick_now(&self) -> ClockTick {
        self.shared_state.now.get()
    }

    /// Returns the current time in `ns`.
    #[must_use]
    pub fn time_now_ns(&self) -> f64 {
        self.to_ns(&self.tick_now())
    }

    /// Returns the current time in `us`.
    #[must_use]
    pub fn time_now_us(&self) -> f64 {
        self.to_us(&self.tick_now())
    }

    /// Returns the tick and sequence number of the next event registered
    /// with this clock.
    #[must_use]
    pub fn next_event(&self) -> Option<(ClockTick, u64)> {
        self.shared_state.peek_next()
    }

    /// Convert the given [ClockTick] to a time in `ns` for this clock.
    #[must_use]
    pub fn to_ns(&self, clock_time: &ClockTick) -> f64 {
        clock_time.tick as f64 / self.freq_mhz * 1000.0
    }

    /// Convert the given [ClockTick] to a time in `us` for this clock.
    #[must_use]
    pub fn to_us(&self, clock_time: &ClockTick) -> f64 {
        clock_time.tick as f64 / self.freq_mhz
    }

    /// Convert a number of ticks to a duration in `us`.
    #[must_use]
    pub fn ticks_to_us(&self, ticks: u64) -> f64 {
        ticks as f64 / self.freq_mhz
    }

    /// Convert a duration in `us` to the nearest whole number of ticks.
    #[must_use]
    pub fn us_to_ticks(&self, duration_us: f64) -> u64 {
        (duration_us * self.freq_mhz).round().max(0.0) as u64
    }

    /// Returns a [ClockDelay] future which must be `await`ed to delay the
    /// specified number of ticks.
    ///
    /// A delay of zero ticks still yields so that all other tasks due at the
    /// current time run first.
    #[must_use = "Futures do nothing unless you `.await` or otherwise use them"]
    pub fn wait_ticks(&self, ticks: u64) -> ClockDelay {
        let until = self.tick_now() + ticks;
        ClockDelay {
            shared_state: self.shared_state.clone(),
            until,
            state: ClockDelayState::Pending,
        }
    }

    /// Returns the first tick at or after the specified time.
    ///
    /// Times within rounding error of a tick boundary map to that tick.
    #[must_use]
    pub fn first_tick_at_or_after(&self, time_ns: f64) -> ClockTick {
        let ticks = time_ns * self.freq_mhz / 1000.0;
        let nearest = ticks.round();
        let ticks = if (ticks - nearest).abs() < 1e-6 {
            nearest
        } else {
            ticks.ceil()
        };
        ClockTick::new().set_tick(ticks.max(0.0) as u64)
    }

    /// Move the clock to the first tick at or after the specified time.
    pub fn advance_to(&self, time_ns: f64) {
        self.shared_state
            .advance_to(self.first_tick_at_or_after(time_ns));
    }
}

/// Possible states of a ClockDelay.
enum ClockDelayState {
    Pending,
    Running,
}

/// Future returned by the clock to manage advancing time using async functions.
pub struct ClockDelay {
    shared_state: Rc<ClockState>,
    until: ClockTick,
    state: ClockDelayState,
}

impl Future for ClockDelay {
    type Output = ();
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.state {
            ClockDelayState::Pending => {
                self.shared_state.schedule(self.until, cx.waker().clone());
                self.state = ClockDelayState::Running;
                Poll::Pending
            }
            // The owning task may be polled early when it also awaits
            // other futures
            ClockDelayState::Running if self.shared_state.now.get() < self.until => {
                Poll::Pending
            }
            ClockDelayState::Running => Poll::Ready(()),
        }
    }
}
