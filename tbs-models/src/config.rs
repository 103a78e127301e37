// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Configuration of a single token bus run.
//!
//! A [`TokenBusConfig`] is immutable once built and is shared (using an
//! [`Rc`](std::rc::Rc)) by the ring builder and every station.

use tbs_engine::sim_error;
use tbs_engine::types::SimResult;

use crate::distributions;

/// Configuration structure for one load point.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenBusConfig {
    /// Number of stations on the ring.
    pub num_stations: usize,

    /// Token holding time for class A traffic (`us`).
    pub ts_us: f64,

    /// Target rotation time bounding class B traffic (`us`).
    pub trt_us: f64,

    /// Simulation horizon (`us`).
    pub run_time_us: f64,

    /// Offered load as a fraction of the medium bandwidth.
    pub load: f64,

    /// Seed from which all random streams of the run are derived.
    pub seed: u64,

    /// Mean number of data bits in a frame.
    pub mean_data_bits: u64,

    /// Protocol overhead added to every frame (bits).
    pub overhead_bits: u64,

    /// Size of the token body (bits).
    pub token_bits: u64,

    /// Medium bandwidth in Mbit/s (bits per `us`).
    pub bandwidth_mbps: f64,

    /// Smallest class B data size (bits).
    pub min_b_data_bits: u64,

    /// Largest class B data size (bits).
    pub max_b_data_bits: u64,

    /// Delay before the arrival generators start (`us`).
    pub arrival_start_us: f64,

    /// Time after which the arrival generators stop (`us`).
    pub arrival_finish_us: Option<f64>,

    /// Keep the timing of every token visit at each station.
    pub record_visits: bool,
}

impl Default for TokenBusConfig {
    fn default() -> Self {
        Self {
            num_stations: 10,
            ts_us: 1000.0,
            trt_us: 15000.0,
            run_time_us: 1_000_000.0,
            load: 0.1,
            seed: 0,
            mean_data_bits: 1024,
            overhead_bits: 184,
            token_bits: 184,
            bandwidth_mbps: 10.0,
            min_b_data_bits: 800,
            max_b_data_bits: 1248,
            arrival_start_us: 0.0,
            arrival_finish_us: None,
            record_visits: false,
        }
    }
}

fn invalid(reason: &str) -> SimResult {
    sim_error!(format!("Invalid configuration: {reason}"))
}

fn check_positive(name: &str, value: f64) -> SimResult {
    if !value.is_finite() || value <= 0.0 {
        return invalid(&format!("{name} must be positive (got {value})"));
    }
    Ok(())
}

impl TokenBusConfig {
    /// Check that the configuration describes a runnable ring.
    pub fn validate(&self) -> SimResult {
        if self.num_stations == 0 {
            return invalid("num_stations must be at least 1");
        }
        check_positive("ts_us", self.ts_us)?;
        check_positive("trt_us", self.trt_us)?;
        check_positive("run_time_us", self.run_time_us)?;
        check_positive("bandwidth_mbps", self.bandwidth_mbps)?;
        if !self.load.is_finite() || self.load < 0.0 {
            return invalid(&format!("load must be a non-negative number (got {})", self.load));
        }
        if self.mean_data_bits == 0 {
            return invalid("mean_data_bits must be non-zero");
        }
        if self.min_b_data_bits > self.max_b_data_bits {
            return invalid(&format!(
                "min_b_data_bits ({}) is larger than max_b_data_bits ({})",
                self.min_b_data_bits, self.max_b_data_bits
            ));
        }
        if self.poll_step_bits() == 0 {
            return invalid("overhead_bits + token_bits must be non-zero");
        }
        if !self.arrival_start_us.is_finite() || self.arrival_start_us < 0.0 {
            return invalid("arrival_start_us must not be negative");
        }
        if let Some(finish) = self.arrival_finish_us {
            if finish.is_nan() || finish < self.arrival_start_us {
                return invalid("arrival_finish_us must not be before arrival_start_us");
            }
        }
        if let Some(period_ticks) = self.class_a_period_ticks() {
            if period_ticks < 1.0 {
                return invalid(&format!(
                    "load {} is too high for {} station(s) at {}Mbit/s: class A frames would arrive every {:.2}us, within one bit time",
                    self.load,
                    self.num_stations,
                    self.bandwidth_mbps,
                    1.0 / self.arrival_rate_per_us()
                ));
            }
        }
        Ok(())
    }

    /// Bits on the medium for one token, which is also the interval at which
    /// an idle station re-reads the medium.
    #[must_use]
    pub fn poll_step_bits(&self) -> u64 {
        self.overhead_bits + self.token_bits
    }

    /// Size of a token frame (bits).
    #[must_use]
    pub fn token_frame_bits(&self) -> u64 {
        self.poll_step_bits()
    }

    /// Frame arrival rate per station per class at the configured load.
    #[must_use]
    pub fn arrival_rate_per_us(&self) -> f64 {
        distributions::arrival_rate_per_us(self, self.load, self.num_stations)
    }

    /// Bit times between class A arrivals once the period is rounded to a
    /// whole `us`, or `None` without load.
    fn class_a_period_ticks(&self) -> Option<f64> {
        let rate = self.arrival_rate_per_us();
        if rate > 0.0 && rate.is_finite() {
            Some(((1.0 / rate).round() * self.bandwidth_mbps).round())
        } else {
            None
        }
    }

    /// Return a copy of this configuration with a different load and seed.
    #[must_use]
    pub fn for_load_point(&self, load: f64, seed: u64) -> Self {
        Self {
            load,
            seed,
            ..self.clone()
        }
    }
}
