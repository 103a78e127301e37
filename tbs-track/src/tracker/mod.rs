// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! The [`Track`] interface and the trackers that implement it.

/// Per-entity level selection.
pub mod filter;
/// The text tracker.
pub mod text;

use std::fmt;
use std::io;
use std::rc::Rc;

pub use filter::LevelFilter;
pub use text::TextTracker;

use crate::Id;

/// Error used to return configuration errors
#[derive(Debug)]
pub struct TrackConfigError(pub String);

impl fmt::Display for TrackConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Track configuration error: {}", self.0)
    }
}

impl std::error::Error for TrackConfigError {}

/// Receiver of the _log_ and _trace_ events of a simulation.
pub trait Track {
    /// Allocate an [`Id`] that is unique within this tracker.
    fn unique_id(&self) -> Id;

    /// Whether events of `level` from the entity `id` are wanted.
    fn is_entity_enabled(&self, id: Id, level: log::Level) -> bool;

    /// Register the full hierarchical name of an entity.
    fn add_entity(&self, id: Id, entity_name: &str);

    /// An object (e.g. a frame) has been placed into an entity.
    fn enter(&self, enter_into: Id, enter_obj: Id);

    /// An object has been removed from an entity.
    fn exit(&self, exit_from: Id, exit_obj: Id);

    /// An entity has a new value (e.g. a queue depth).
    fn value(&self, id: Id, value: f64);

    /// An object of `num_bits` bits was created. Entities are created with
    /// zero bits.
    fn create(&self, created_by: Id, created_obj: Id, num_bits: u64, name: &str);

    fn destroy(&self, destroyed_by: Id, destroyed_obj: Id);

    fn log(&self, msg_by: Id, level: log::Level, msg: fmt::Arguments);

    /// Simulation time has moved to `tick` of the bit clock, which is
    /// `time_us` microseconds.
    fn time(&self, set_by: Id, tick: u64, time_us: f64);

    /// Flush any buffered output.
    fn shutdown(&self);
}

/// The type of a [`Tracker`] that is shared across entities.
pub type Tracker = Rc<dyn Track>;

/// Create a [`Tracker`] that prints events at `level` and above to `stdout`.
#[must_use]
pub fn stdout_tracker(level: log::Level) -> Tracker {
    let stdout = Box::new(io::BufWriter::new(io::stdout()));
    Rc::new(TextTracker::new().with_sink(LevelFilter::new(level), stdout))
}

/// Create a [`Tracker`] that drops every event but still hands out unique
/// ids.
#[must_use]
pub fn dev_null_tracker() -> Tracker {
    Rc::new(TextTracker::new())
}
