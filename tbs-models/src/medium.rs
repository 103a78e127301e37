// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The shared medium.
//!
//! The medium is a single slot: the last frame written is the only one that
//! stations can read. Reading does not consume the frame and writing always
//! replaces it.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tbs_track::entity::Entity;
use tbs_track::id::Unique;
use tbs_track::{enter, exit, trace};

use crate::frame::Frame;

pub struct Medium {
    pub entity: Rc<Entity>,
    current: RefCell<Frame>,
    writes: Cell<u64>,
}

impl Medium {
    /// Create the medium already holding its first frame (normally the
    /// initial token) so that it is never observed empty.
    #[must_use]
    pub fn new(parent: &Rc<Entity>, initial: Frame) -> Self {
        let entity = Rc::new(Entity::new(parent, "medium"));
        enter!(entity ; initial.id());
        Self {
            entity,
            current: RefCell::new(initial),
            writes: Cell::new(0),
        }
    }

    /// Replace the current frame.
    pub fn write(&self, frame: Frame) {
        trace!(self.entity ; "write {}", frame);
        let previous = self.current.replace(frame);
        exit!(self.entity ; previous.id());
        enter!(self.entity ; self.current.borrow().id());
        self.writes.set(self.writes.get() + 1);
    }

    /// Return the current frame without consuming it.
    #[must_use]
    pub fn read(&self) -> Frame {
        self.current.borrow().clone()
    }

    /// Number of writes since the medium was created.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.writes.get()
    }
}

#[cfg(test)]
mod tests {
    use tbs_engine::time::clock::ClockTick;
    use tbs_track::entity::toplevel;
    use tbs_track::test_helpers::create_tracker;

    use super::*;
    use crate::frame::{Address, TrafficClass};

    #[test]
    fn last_write_wins() {
        let tracker = create_tracker(file!());
        let top = toplevel(&tracker, "top");
        let a = Address::new(10_000_001).unwrap();

        let token = Frame::new_token(&top, ClockTick::new(), 368, None, a);
        let medium = Medium::new(&top, token.clone());
        assert_eq!(medium.read().id(), token.id());
        assert_eq!(medium.read().id(), token.id());
        assert_eq!(medium.writes(), 0);

        let first = Frame::new_data(&top, ClockTick::new(), 1208, 1, a, TrafficClass::A);
        let second = Frame::new_data(&top, ClockTick::new(), 1208, 2, a, TrafficClass::A);
        medium.write(first);
        medium.write(second.clone());
        assert_eq!(medium.read().id(), second.id());
        assert_eq!(medium.read().sequence_id(), 2);
        assert_eq!(medium.writes(), 2);
    }
}
