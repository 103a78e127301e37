// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! The overall owner of time within a simulation.

use std::cell::Cell;
use std::rc::Rc;
use std::task::Waker;

use tbs_track::entity::Entity;
use tbs_track::set_time;

use super::clock::{Clock, ClockTick};

/// Contains all Clocks and the current simulation time in ns.
pub struct SimTime {
    pub entity: Rc<Entity>,

    current_ns: f64,

    /// Clocks are created on demand, one per frequency.
    clocks: Vec<Clock>,

    /// Scheduling order shared by all clocks.
    sequence: Rc<Cell<u64>>,
}

impl SimTime {
    #[must_use]
    pub fn new(parent: &Rc<Entity>) -> Self {
        Self {
            entity: Rc::new(Entity::new(parent, "time")),
            current_ns: 0.0,
            clocks: Vec::new(),
            sequence: Rc::new(Cell::new(0)),
        }
    }

    pub fn get_clock(&mut self, freq_mhz: f64) -> Clock {
        for clock in &self.clocks {
            if clock.freq_mhz() == freq_mhz {
                return clock.clone();
            }
        }
        let clock = Clock::new(freq_mhz, self.sequence.clone());
        self.clocks.push(clock.clone());
        clock
    }

    /// Choose the earliest pending event across all clocks and return its
    /// [`Waker`].
    ///
    /// Events at the same time are ordered by the sequence number assigned
    /// when they were scheduled. When `horizon_ns` is given, events at or
    /// beyond the horizon are left pending and `None` is returned.
    pub fn advance_time(&mut self, horizon_ns: Option<f64>) -> Option<Waker> {
        let mut next: Option<(usize, ClockTick, f64, u64)> = None;
        for (i, clock) in self.clocks.iter().enumerate() {
            let Some((tick, seq)) = clock.next_event() else {
                continue;
            };
            if let Some(horizon_ns) = horizon_ns {
                if tick >= clock.first_tick_at_or_after(horizon_ns) {
                    continue;
                }
            }
            let ns = clock.to_ns(&tick);
            let earlier = match next {
                None => true,
                Some((_, _, best_ns, best_seq)) => (ns, seq) < (best_ns, best_seq),
            };
            if earlier {
                next = Some((i, tick, ns, seq));
            }
        }

        let (index, tick, next_ns, _) = next?;
        if self.current_ns != next_ns {
            let clock = &self.clocks[index];
            set_time!(self.entity ; tick.tick(), clock.to_us(&tick));
            self.current_ns = next_ns;
        }
        self.clocks[index].shared_state.pop_next()
    }

    /// Move all clocks to their next tick at or after the specified time.
    pub fn advance_all_clocks_to(&mut self, time_ns: f64) {
        for clock in &self.clocks {
            clock.advance_to(time_ns);
        }
        if time_ns > self.current_ns {
            let tick = self.clocks.first().map_or(0, |c| c.tick_now().tick());
            set_time!(self.entity ; tick, time_ns / 1000.0);
            self.current_ns = time_ns;
        }
    }

    /// Drop every task waiting on any clock.
    pub fn clear(&mut self) {
        for clock in &self.clocks {
            clock.shared_state.clear();
        }
    }

    /// Total number of tasks waiting across all clocks.
    #[must_use]
    pub fn num_waiting(&self) -> usize {
        self.clocks
            .iter()
            .map(|c| c.shared_state.num_waiting())
            .sum()
    }

    #[must_use]
    pub fn time_now_ns(&self) -> f64 {
        self.current_ns
    }
}

#[cfg(test)]
mod tests {
    use tbs_track::entity::toplevel;
    use tbs_track::test_helpers::create_tracker;

    use super::*;

    #[test]
    fn clock_created_once() {
        let tracker = create_tracker(file!());
        let top = toplevel(&tracker, "top");

        let mut time = SimTime::new(&top);
        let _clk1 = time.get_clock(1000.0);
        assert_eq!(time.clocks.len(), 1);

        let _clk2 = time.get_clock(1000.0);
        assert_eq!(time.clocks.len(), 1);
    }

    #[test]
    fn create_different_clocks() {
        let tracker = create_tracker(file!());
        let top = toplevel(&tracker, "top");

        let mut time = SimTime::new(&top);
        let _clk1 = time.get_clock(1000.0);
        assert_eq!(time.clocks.len(), 1);

        let _clk2 = time.get_clock(1800.0);
        assert_eq!(time.clocks.len(), 2);
    }

    #[test]
    fn nothing_to_advance() {
        let tracker = create_tracker(file!());
        let top = toplevel(&tracker, "top");

        let mut time = SimTime::new(&top);
        let _clk = time.get_clock(10.0);
        assert!(time.advance_time(None).is_none());
        assert_eq!(time.num_waiting(), 0);

        time.advance_all_clocks_to(250.0);
        assert_eq!(time.time_now_ns(), 250.0);
    }

    #[test]
    fn time_events_use_bit_clock() {
        let (test_tracker, tracker) = tbs_track::test_init!(1);
        let top = toplevel(&tracker, "top");
        let mut time = SimTime::new(&top);
        let clk = time.get_clock(10.0);
        tbs_track::test_helpers::check_and_clear(
            &test_tracker,
            &["0: created 1, top, 0 bits", "1: created 2, top::time, 0 bits"],
        );

        time.advance_all_clocks_to(1500.0);
        tbs_track::test_helpers::check_and_clear(&test_tracker, &[r"2: time 15 \(1.5us\)"]);
        assert_eq!(clk.tick_now().tick(), 15);
    }
}
