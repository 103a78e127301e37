// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

#![doc(test(attr(warn(unused))))]

//! Token bus simulation engine.
//!
//! This library provides a deterministic, single-threaded
//! [engine](crate::engine::Engine) which executes event driven asynchronous
//! simulation tasks.
//!
//! Tasks suspend themselves by awaiting a [clock](crate::time::clock) delay.
//! Resumption order is fully determined by the `(tick, sequence)` at which
//! each delay was scheduled, so the same tasks always run in the same order.
//!
//! # Simple Application
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use tbs_engine::engine::Engine;
//! use tbs_engine::run_simulation;
//!
//! let mut engine = Engine::default();
//! let clock = engine.clock_mhz(10.0);
//! let count = Rc::new(Cell::new(0));
//! {
//!     let count = count.clone();
//!     engine.spawn(async move {
//!         for _ in 0..10 {
//!             clock.wait_ticks(8).await;
//!             count.set(count.get() + 1);
//!         }
//!         Ok(())
//!     });
//! }
//! run_simulation!(engine);
//! assert_eq!(count.get(), 10);
//! assert_eq!(engine.time_now_ns(), 8000.0);
//! ```
//!
//! Components that implement [`Runnable`](crate::traits::Runnable) can
//! instead be [registered](crate::engine::Engine::register) with the engine
//! and are spawned as the simulation starts.

pub mod engine;
pub mod executor;
pub mod test_helpers;
pub mod time;
pub mod traits;
pub mod types;

#[macro_export]
/// Spawn all component run() functions and then run the simulation.
macro_rules! run_simulation {
    ($engine:ident) => {
        $engine.run().unwrap();
    };
    ($engine:ident, $expect:expr) => {
        match $engine.run() {
            Ok(()) => panic!("Expected an error!"),
            Err(e) => assert_eq!(format!("{e}").as_str(), $expect),
        }
    };
}
