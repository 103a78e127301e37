// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Station memory.
//!
//! A [`Station`] owns one FIFO queue and one set of delay samples per
//! [`TrafficClass`]. Frames are added by the station's arrival generators and
//! removed by its MAC engine when they are transmitted.

use std::cell::{Cell, OnceCell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use tbs_engine::sim_error;
use tbs_engine::time::clock::ClockTick;
use tbs_engine::types::SimResult;
use tbs_track::entity::Entity;
use tbs_track::value;

use crate::frame::{Address, Frame, TrafficClass};

#[derive(Default)]
struct ClassState {
    queue: VecDeque<Frame>,
    delays_us: Vec<f64>,
    generated: u64,
    transmitted: u64,
}

/// Timing of one token visit, used to check the service bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TokenVisit {
    /// Tick at which the token was seen on the medium.
    pub received: ClockTick,

    /// Tick at which class A service finished.
    pub class_a_done: ClockTick,

    /// Tick at which class B service finished.
    pub class_b_done: ClockTick,

    /// Tick at which the token was written back onto the medium.
    pub relayed: ClockTick,
}

pub struct Station {
    pub entity: Rc<Entity>,
    address: Address,
    next: OnceCell<Address>,
    classes: [RefCell<ClassState>; 2],
    rotation_deadline: Cell<ClockTick>,
    sequence_id: Cell<u64>,
    num_visits: Cell<usize>,

    /// Only kept when requested, as it grows with the run time.
    visit_log: Option<RefCell<Vec<TokenVisit>>>,
}

impl Station {
    /// Create the station `index` of a ring (named `station{index}`) with
    /// its rotation deadline initially at `rotation_deadline` (time zero
    /// plus the target rotation time).
    ///
    /// The timing of every token visit is kept when `record_visits` is set.
    #[must_use]
    pub fn new(
        parent: &Rc<Entity>,
        index: usize,
        address: Address,
        rotation_deadline: ClockTick,
        record_visits: bool,
    ) -> Self {
        Self {
            entity: Rc::new(Entity::numbered(parent, "station", index)),
            address,
            next: OnceCell::new(),
            classes: [
                RefCell::new(ClassState::default()),
                RefCell::new(ClassState::default()),
            ],
            rotation_deadline: Cell::new(rotation_deadline),
            sequence_id: Cell::new(0),
            num_visits: Cell::new(0),
            visit_log: record_visits.then(|| RefCell::new(Vec::new())),
        }
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Set the address of the next station in the logical ring.
    ///
    /// This can only be done once.
    pub fn set_next(&self, next: Address) -> SimResult {
        if self.next.set(next).is_err() {
            return sim_error!(format!(
                "{}: next station already set",
                self.entity.full_name()
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn next(&self) -> Option<Address> {
        self.next.get().copied()
    }

    /// Allocate the next sequence number. The sequence is shared by both
    /// traffic classes and starts at 1.
    pub fn next_sequence_id(&self) -> u64 {
        let id = self.sequence_id.get() + 1;
        self.sequence_id.set(id);
        id
    }

    /// Append a data frame to the queue for its class.
    ///
    /// Tokens are never queued.
    pub fn enqueue(&self, frame: Frame) -> SimResult {
        let Some(class) = frame.traffic_class() else {
            return sim_error!(format!(
                "{}: cannot queue {}",
                self.entity.full_name(),
                frame
            ));
        };
        let mut state = self.classes[class.index()].borrow_mut();
        state.queue.push_back(frame);
        state.generated += 1;
        value!(self.entity ; state.queue.len());
        Ok(())
    }

    /// Remove the oldest frame of the given class.
    pub fn dequeue(&self, class: TrafficClass) -> Option<Frame> {
        self.classes[class.index()].borrow_mut().queue.pop_front()
    }

    #[must_use]
    pub fn is_empty(&self, class: TrafficClass) -> bool {
        self.classes[class.index()].borrow().queue.is_empty()
    }

    #[must_use]
    pub fn queue_len(&self, class: TrafficClass) -> usize {
        self.classes[class.index()].borrow().queue.len()
    }

    /// Record the queueing plus transmission delay of a transmitted frame.
    pub fn record_delay(&self, class: TrafficClass, delay_us: f64) {
        let mut state = self.classes[class.index()].borrow_mut();
        state.delays_us.push(delay_us);
        state.transmitted += 1;
    }

    /// All delay samples (`us`) of the given class in transmission order.
    #[must_use]
    pub fn delay_samples_us(&self, class: TrafficClass) -> Vec<f64> {
        self.classes[class.index()].borrow().delays_us.clone()
    }

    #[must_use]
    pub fn num_generated(&self, class: TrafficClass) -> u64 {
        self.classes[class.index()].borrow().generated
    }

    #[must_use]
    pub fn num_transmitted(&self, class: TrafficClass) -> u64 {
        self.classes[class.index()].borrow().transmitted
    }

    #[must_use]
    pub fn rotation_deadline(&self) -> ClockTick {
        self.rotation_deadline.get()
    }

    pub fn set_rotation_deadline(&self, deadline: ClockTick) {
        self.rotation_deadline.set(deadline);
    }

    pub fn record_visit(&self, visit: TokenVisit) {
        self.num_visits.set(self.num_visits.get() + 1);
        if let Some(log) = &self.visit_log {
            log.borrow_mut().push(visit);
        }
    }

    /// The recorded token visits, empty unless the station was created to
    /// record them.
    #[must_use]
    pub fn visits(&self) -> Vec<TokenVisit> {
        self.visit_log
            .as_ref()
            .map(|log| log.borrow().clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn num_token_visits(&self) -> usize {
        self.num_visits.get()
    }
}
