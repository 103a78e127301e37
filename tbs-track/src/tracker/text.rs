// Copyright (c) 2020 Graphcore Ltd. All rights reserved.

use std::cell::{Cell, RefCell};
use std::fmt;

use crate::tracker::{LevelFilter, Track};
use crate::{Id, ROOT, Writer};

struct Sink {
    filter: LevelFilter,
    writer: RefCell<Writer>,
}

/// Writes events as text lines to any number of sinks.
///
/// Each sink has its own [`LevelFilter`] so that, for example, stdout can show
/// warnings while a log file records a trace of the MAC engines. Every line
/// is prefixed with the bit-clock tick and time of the latest time event:
///
/// ```txt
/// [12080 1208.0us] 7:INFO: token received
/// ```
///
/// With no sinks every event is dropped.
pub struct TextTracker {
    next_id: Cell<u64>,
    tick: Cell<u64>,
    time_us: Cell<f64>,
    sinks: Vec<Sink>,
}

impl Default for TextTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TextTracker {
    /// Create a tracker with no sinks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(ROOT.0),
            tick: Cell::new(0),
            time_us: Cell::new(0.0),
            sinks: Vec::new(),
        }
    }

    /// Add a sink receiving the events that `filter` allows.
    #[must_use]
    pub fn with_sink(mut self, filter: LevelFilter, writer: Writer) -> Self {
        self.sinks.push(Sink {
            filter,
            writer: RefCell::new(writer),
        });
        self
    }

    fn emit(&self, id: Id, level: log::Level, args: fmt::Arguments) {
        let tick = self.tick.get();
        let time_us = self.time_us.get();
        for sink in self.sinks.iter().filter(|s| s.filter.allows(id, level)) {
            let mut writer = sink.writer.borrow_mut();
            if let Err(e) = writeln!(writer, "[{tick} {time_us:.1}us] {args}") {
                eprintln!("Text tracker failed to write: {e}");
            }
        }
    }
}

impl Track for TextTracker {
    fn unique_id(&self) -> Id {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Id(id)
    }

    fn is_entity_enabled(&self, id: Id, level: log::Level) -> bool {
        self.sinks.iter().any(|s| s.filter.allows(id, level))
    }

    fn add_entity(&self, id: Id, entity_name: &str) {
        for sink in &self.sinks {
            sink.filter.register(id, entity_name);
        }
    }

    fn enter(&self, id: Id, object: Id) {
        self.emit(id, log::Level::Trace, format_args!("{id}: enter {object}"));
    }

    fn exit(&self, id: Id, object: Id) {
        self.emit(id, log::Level::Trace, format_args!("{id}: exit {object}"));
    }

    fn value(&self, id: Id, value: f64) {
        self.emit(id, log::Level::Trace, format_args!("{id}: value {value}"));
    }

    fn create(&self, created_by: Id, id: Id, num_bits: u64, name: &str) {
        // Entities filter on their own id, frames on their creator's
        let key = if num_bits == 0 { id } else { created_by };
        self.emit(
            key,
            log::Level::Trace,
            format_args!("{created_by}: created {id}, {name}, {num_bits} bits"),
        );
    }

    fn destroy(&self, destroyed_by: Id, id: Id) {
        self.emit(
            id,
            log::Level::Trace,
            format_args!("{destroyed_by}: destroyed {id}"),
        );
    }

    fn log(&self, id: Id, level: log::Level, msg: fmt::Arguments) {
        self.emit(id, level, format_args!("{id}:{level}: {msg}"));
    }

    fn time(&self, _set_by: Id, tick: u64, time_us: f64) {
        self.tick.set(tick);
        self.time_us.set(time_us);
    }

    fn shutdown(&self) {
        for sink in &self.sinks {
            if let Err(e) = sink.writer.borrow_mut().flush() {
                eprintln!("Text tracker failed to flush: {e}");
            }
        }
    }
}
