// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Sweep the offered load of a timed-token bus.
//!
//! Each load point builds a fresh ring of stations sharing one medium and
//! runs it for the configured time. The delay between a frame arriving at a
//! station and the end of its transmission is recorded per traffic class and
//! summarised in a [report](crate::report::Report) of per-station and system
//! series.
//!
//! Class A traffic is served for at most `Ts` after the token arrives. Class B
//! traffic is served until `Trt` has passed since the previous token arrival
//! at the station.
//!
//! # Examples
//!
//! Run the default ten-station sweep:
//! ```txt
//! cargo run --bin sim-token-bus --release
//! ```
//!
//! A shorter three-station sweep with progress and trace of the MAC engines:
//! ```txt
//! cargo run --bin sim-token-bus --release -- --num-stations 3 --run-time-us 100000 \
//!     --progress --stdout --stdout-level trace --stdout-filter-regex '.*mac'
//! ```
//!
//! The same values can be set in a TOML file given by `--conf-file` or in
//! `TBS_` environment variables (e.g. `TBS_LOAD_STEPS=5`).

use tbs_engine::types::SimError;
use tbs_models::config::TokenBusConfig;
use tbs_models::run::{LoadPointResult, run_load_point};
use tbs_track::Tracker;

use crate::config::Config;

pub mod config;
pub mod report;

/// Offered loads of a sweep of `steps` points: `1/steps, 2/steps, ..., 1`.
#[must_use]
pub fn sweep_loads(steps: usize) -> Vec<f64> {
    (1..=steps).map(|i| i as f64 / steps as f64).collect()
}

/// Seed of the load point with the given index.
#[must_use]
pub fn load_point_seed(seed: u64, index: usize) -> u64 {
    seed.wrapping_add(index as u64)
}

/// The model configuration of every load point of a sweep.
pub fn load_point_configs(config: &Config) -> Result<Vec<TokenBusConfig>, SimError> {
    let seed = config.seed();
    sweep_loads(config.load_steps()?)
        .into_iter()
        .enumerate()
        .map(|(i, load)| config.to_token_bus_config(load, load_point_seed(seed, i + 1)))
        .collect()
}

/// Run every load point in turn, calling `on_done` as each one completes.
pub fn run_sweep<F>(
    tracker: &Tracker,
    config: &Config,
    mut on_done: F,
) -> Result<Vec<LoadPointResult>, SimError>
where
    F: FnMut(&LoadPointResult),
{
    let mut results = Vec::new();
    for point in load_point_configs(config)? {
        let result = run_load_point(tracker, &point)?;
        on_done(&result);
        results.push(result);
    }
    Ok(results)
}
