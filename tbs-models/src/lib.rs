// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Models of a timed-token bus.
//!
//! A number of [stations](crate::station) share a single-slot
//! [medium](crate::medium). Each station runs two
//! [arrival generators](crate::arrival) (one per traffic class) and a
//! [MAC engine](crate::mac) which only transmits while it holds the token.
//! The [ring builder](crate::ring_builder) wires the stations into a logical
//! ring and [`run_load_point`](crate::run::run_load_point) runs one
//! simulation to its horizon.
//!
//! # Time
//!
//! All models use a clock running at the medium bandwidth so that one tick is
//! one bit time. Configuration values are given in microseconds and converted
//! to ticks by rounding to the nearest tick.

pub mod arrival;
pub mod config;
pub mod distributions;
pub mod frame;
pub mod mac;
pub mod medium;
pub mod ring_builder;
pub mod run;
pub mod station;
