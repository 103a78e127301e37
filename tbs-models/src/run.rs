// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Run a single load point to its horizon.

use std::rc::Rc;

use tbs_engine::engine::Engine;
use tbs_engine::types::SimError;
use tbs_track::{Tracker, info};

use crate::config::TokenBusConfig;
use crate::frame::{Address, TrafficClass};
use crate::ring_builder::build_ring;
use crate::station::Station;

/// Per-station results of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct StationResult {
    pub address: Address,

    /// Class A delay samples (`us`) in transmission order.
    pub delays_a_us: Vec<f64>,

    /// Class B delay samples (`us`) in transmission order.
    pub delays_b_us: Vec<f64>,

    pub generated: [u64; 2],
    pub transmitted: [u64; 2],
    pub token_visits: usize,
}

impl StationResult {
    fn from_station(station: &Station) -> Self {
        Self {
            address: station.address(),
            delays_a_us: station.delay_samples_us(TrafficClass::A),
            delays_b_us: station.delay_samples_us(TrafficClass::B),
            generated: TrafficClass::ALL.map(|c| station.num_generated(c)),
            transmitted: TrafficClass::ALL.map(|c| station.num_transmitted(c)),
            token_visits: station.num_token_visits(),
        }
    }

    /// Delay samples of the given class.
    #[must_use]
    pub fn delays_us(&self, class: TrafficClass) -> &[f64] {
        match class {
            TrafficClass::A => &self.delays_a_us,
            TrafficClass::B => &self.delays_b_us,
        }
    }
}

/// Results of one load point, with stations in ring creation order.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadPointResult {
    pub load: f64,
    pub stations: Vec<StationResult>,
    pub end_time_us: f64,
}

/// Build a ring for `config`, run it until the horizon and collect the
/// per-station delay samples.
pub fn run_load_point(
    tracker: &Tracker,
    config: &TokenBusConfig,
) -> Result<LoadPointResult, SimError> {
    config.validate()?;
    let config = Rc::new(config.clone());

    let mut engine = Engine::new(tracker);
    // One tick per bit time
    let clock = engine.clock_mhz(config.bandwidth_mbps);
    let top = engine.top().clone();
    let ring = build_ring(&engine, &clock, &top, &config)?;

    info!(top ; "Running load {:.2} for {}us", config.load, config.run_time_us);
    engine.run_until_ns(config.run_time_us * 1000.0)?;

    let stations: Vec<StationResult> = ring
        .stations
        .iter()
        .map(|station| StationResult::from_station(station))
        .collect();
    info!(top ; "Load {:.2}: {} frames sent in {} token visits",
        config.load,
        stations.iter().map(|s| s.transmitted.iter().sum::<u64>()).sum::<u64>(),
        stations.iter().map(|s| s.token_visits).sum::<usize>());

    Ok(LoadPointResult {
        load: config.load,
        stations,
        end_time_us: engine.time_now_ns() / 1000.0,
    })
}
