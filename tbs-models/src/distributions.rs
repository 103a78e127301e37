// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Inter-arrival time and frame size distributions.
//!
//! Class A traffic is periodic with fixed size frames. Class B traffic
//! arrives as a Poisson process with exponentially distributed sizes clipped
//! to the configured bounds. All random values are drawn from a caller
//! supplied RNG so that runs are reproducible.

use rand::Rng;

use crate::config::TokenBusConfig;
use crate::frame::TrafficClass;

/// Sample an exponential distribution with the given mean using the inverse
/// CDF.
fn exponential<R: Rng + ?Sized>(mean: f64, rng: &mut R) -> f64 {
    let u: f64 = rng.r#gen();
    -mean * (1.0 - u).ln()
}

/// Frame arrival rate per station per class (frames per `us`).
///
/// Each class offers the full `load`, shared equally between the stations.
#[must_use]
pub fn arrival_rate_per_us(config: &TokenBusConfig, load: f64, num_stations: usize) -> f64 {
    (config.bandwidth_mbps * load)
        / ((config.mean_data_bits + config.overhead_bits) as f64 * num_stations as f64)
}

/// Time until the next arrival of a `class` frame at one station (`us`).
///
/// Returns `None` when the arrival rate is zero (no load), meaning no frame
/// will ever arrive.
pub fn inter_arrival_us<R: Rng + ?Sized>(
    config: &TokenBusConfig,
    class: TrafficClass,
    load: f64,
    num_stations: usize,
    rng: &mut R,
) -> Option<u64> {
    let rate = arrival_rate_per_us(config, load, num_stations);
    if rate <= 0.0 || !rate.is_finite() {
        return None;
    }

    let interval = match class {
        TrafficClass::A => (1.0 / rate).round(),
        TrafficClass::B => exponential(1.0 / rate, rng).round(),
    };
    Some(interval as u64)
}

/// Number of data bits in the next `class` frame (excluding overhead).
pub fn frame_size_bits<R: Rng + ?Sized>(
    config: &TokenBusConfig,
    class: TrafficClass,
    rng: &mut R,
) -> u64 {
    match class {
        TrafficClass::A => config.mean_data_bits,
        TrafficClass::B => {
            let size = exponential(config.mean_data_bits as f64, rng);
            if size < config.min_b_data_bits as f64 {
                config.min_b_data_bits
            } else if size > config.max_b_data_bits as f64 {
                config.max_b_data_bits
            } else {
                size.floor() as u64
            }
        }
    }
}
