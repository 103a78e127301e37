// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::rc::Rc;

use tbs_engine::test_helpers::start_test;
use tbs_models::config::TokenBusConfig;
use tbs_models::frame::TrafficClass;
use tbs_models::ring_builder::build_ring;
use tbs_models::run::{LoadPointResult, run_load_point};
use tbs_track::test_helpers::create_tracker;

fn run(config: &TokenBusConfig) -> LoadPointResult {
    run_load_point(&create_tracker(file!()), config).unwrap()
}

fn mean(samples: &[f64]) -> f64 {
    samples.iter().sum::<f64>() / samples.len() as f64
}

#[test]
fn no_load_gives_no_samples() {
    let config = TokenBusConfig {
        num_stations: 3,
        ts_us: 1000.0,
        trt_us: 15000.0,
        run_time_us: 100_000.0,
        load: 0.0,
        ..Default::default()
    };
    let result = run(&config);
    assert_eq!(result.stations.len(), 3);
    approx::assert_relative_eq!(result.end_time_us, 100_000.0);

    for station in &result.stations {
        assert!(station.delays_a_us.is_empty());
        assert!(station.delays_b_us.is_empty());
        assert_eq!(station.generated, [0, 0]);
        // The token keeps circulating even with nothing to send
        assert!(station.token_visits > 0);
    }

    // Visits are round robin
    let visits: Vec<usize> = result.stations.iter().map(|s| s.token_visits).collect();
    let min = *visits.iter().min().unwrap();
    let max = *visits.iter().max().unwrap();
    assert!(max - min <= 1, "unbalanced visits {visits:?}");
}

#[test]
fn single_station_delay_grows_with_load() {
    let base = TokenBusConfig {
        num_stations: 1,
        ts_us: 1000.0,
        trt_us: 15000.0,
        run_time_us: 200_000.0,
        ..Default::default()
    };

    let light = run(&base.for_load_point(0.01, 1));
    let heavy = run(&base.for_load_point(0.9, 1));

    let light_a = &light.stations[0].delays_a_us;
    let heavy_a = &heavy.stations[0].delays_a_us;
    assert!(!light_a.is_empty());
    assert!(!heavy_a.is_empty());

    // A 1208 bit class A frame takes 120.8us to send. When idle the station
    // can be at most one token relay and one class B frame away from sending.
    let light_mean = mean(light_a);
    assert!(light_mean >= 120.8 - 1e-9);
    assert!(light_mean <= 120.8 + 36.8 + 143.2, "mean {light_mean}");

    assert!(mean(heavy_a) > light_mean);
    assert!(heavy.stations[0].token_visits > 0);
}

#[test]
fn samples_cover_transmission_time() {
    let config = TokenBusConfig {
        num_stations: 4,
        run_time_us: 200_000.0,
        load: 0.6,
        seed: 17,
        ..Default::default()
    };
    let result = run(&config);
    let mut total = 0;
    for station in &result.stations {
        for delay in &station.delays_a_us {
            assert!(*delay >= 120.8 - 1e-9);
        }
        for delay in &station.delays_b_us {
            // Smallest class B frame is 800 + 184 bits
            assert!(*delay >= 98.4 - 1e-9);
        }
        total += station.delays_a_us.len() + station.delays_b_us.len();
        assert_eq!(station.transmitted[0] as usize, station.delays_a_us.len());
        assert!(station.transmitted[0] <= station.generated[0]);
    }
    assert!(total > 0);
}

#[test]
fn same_seed_same_result() {
    let config = TokenBusConfig {
        num_stations: 5,
        run_time_us: 150_000.0,
        load: 0.7,
        seed: 1234,
        ..Default::default()
    };
    let first = run(&config);
    let second = run(&config);
    assert_eq!(first, second);

    let other = run(&config.for_load_point(0.7, 4321));
    assert_ne!(
        first.stations.iter().map(|s| s.address).collect::<Vec<_>>(),
        other.stations.iter().map(|s| s.address).collect::<Vec<_>>()
    );
}

#[test]
fn service_bounded_by_timers() {
    let config = Rc::new(TokenBusConfig {
        num_stations: 3,
        ts_us: 500.0,
        trt_us: 3000.0,
        run_time_us: 300_000.0,
        load: 1.0,
        seed: 5,
        record_visits: true,
        ..Default::default()
    });

    let mut engine = start_test(file!());
    let clock = engine.clock_mhz(config.bandwidth_mbps);
    let top = engine.top().clone();
    let ring = build_ring(&engine, &clock, &top, &config).unwrap();
    engine.run_until_ns(config.run_time_us * 1000.0).unwrap();

    let ts_ticks = clock.us_to_ticks(config.ts_us);
    let trt_ticks = clock.us_to_ticks(config.trt_us);
    let class_a_bits = config.mean_data_bits + config.overhead_bits;
    let max_b_bits = config.max_b_data_bits + config.overhead_bits;
    let token_bits = config.token_frame_bits();

    for station in &ring.stations {
        let visits = station.visits();
        assert!(visits.len() > 2);

        let mut rotation_deadline = trt_ticks;
        for visit in &visits {
            let a_ticks = visit.class_a_done.ticks_since(visit.received);
            assert!(a_ticks < ts_ticks + class_a_bits);

            if visit.class_b_done > visit.class_a_done {
                // Class B only starts before the deadline and the last frame
                // is always completed
                assert!(visit.class_a_done.tick() < rotation_deadline);
                assert!(visit.class_b_done.tick() < rotation_deadline + max_b_bits);
            }

            assert_eq!(visit.relayed.ticks_since(visit.class_b_done), token_bits);
            rotation_deadline = visit.class_b_done.tick() + trt_ticks;
        }
    }

    // The medium holds the last frame sent
    assert!(ring.medium.writes() > 0);
    assert!(ring.medium.read().size_bits() > 0);
}

#[test]
fn arrival_window() {
    let config = TokenBusConfig {
        num_stations: 2,
        run_time_us: 100_000.0,
        load: 0.5,
        arrival_start_us: 20_000.0,
        arrival_finish_us: Some(40_000.0),
        ..Default::default()
    };
    let result = run(&config);

    // Class A is periodic with one frame every 483us. The last frame is
    // generated by a wait that started before 40ms.
    for station in &result.stations {
        let generated_a = station.generated[TrafficClass::A.index()];
        assert_eq!(generated_a, 42);
        assert_eq!(station.transmitted[TrafficClass::A.index()], 42);
    }
}

#[test]
fn arrivals_within_one_bit_time_rejected() {
    // Class A frames would arrive every 0.12us, which rounds to 0us
    let config = TokenBusConfig {
        num_stations: 1,
        bandwidth_mbps: 10_000.0,
        load: 1.0,
        run_time_us: 100.0,
        ..Default::default()
    };
    let err = run_load_point(&create_tracker(file!()), &config).unwrap_err();
    assert!(format!("{err}").contains("load 1 is too high"));
}

#[test]
fn timers_beyond_the_clock_range() {
    let config = TokenBusConfig {
        num_stations: 2,
        ts_us: 1e19,
        trt_us: 1e19,
        run_time_us: 50_000.0,
        load: 0.5,
        seed: 3,
        ..Default::default()
    };
    let result = run(&config);
    approx::assert_relative_eq!(result.end_time_us, 50_000.0);
    for station in &result.stations {
        assert!(!station.delays_a_us.is_empty());
        assert!(!station.delays_b_us.is_empty());
    }
}
