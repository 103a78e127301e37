// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Simulation time.
//!
//! Time is owned by [`SimTime`](simtime::SimTime) which manages one or more
//! [`Clock`](clock::Clock)s. Every suspension point is recorded as a
//! `(tick, sequence)` pair so that tasks due at the same time resume in the
//! order in which they were scheduled.

pub mod clock;
pub mod simtime;
