// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use approx::assert_relative_eq;
use sim_token_bus::config::Config;
use sim_token_bus::report::{EMPTY_SAMPLES_MS, Report};
use sim_token_bus::{load_point_configs, run_sweep, sweep_loads};
use tbs_models::config::TokenBusConfig;
use tbs_models::run::run_load_point;
use tbs_track::test_helpers::create_tracker;

fn short_sweep(load_steps: usize) -> Config {
    Config {
        num_stations: Some(3),
        run_time_us: Some(20_000.0),
        load_steps: Some(load_steps),
        seed: Some(5),
        ..Default::default()
    }
}

#[test]
fn loads_of_a_sweep() {
    let loads = sweep_loads(10);
    assert_eq!(loads.len(), 10);
    assert_relative_eq!(loads[0], 0.1);
    assert_relative_eq!(loads[9], 1.0);
}

#[test]
fn every_point_has_its_own_seed() {
    let configs = load_point_configs(&short_sweep(4)).unwrap();
    let seeds: Vec<u64> = configs.iter().map(|c| c.seed).collect();
    assert_eq!(seeds, vec![6, 7, 8, 9]);
    assert_relative_eq!(configs[1].load, 0.5);
    assert_eq!(configs[0].num_stations, 3);
}

#[test]
fn idle_ring_reports_sentinels() {
    let tracker = create_tracker(file!());
    let config = TokenBusConfig {
        num_stations: 3,
        ts_us: 1000.0,
        trt_us: 15000.0,
        run_time_us: 100_000.0,
        load: 0.0,
        ..Default::default()
    };
    let result = run_load_point(&tracker, &config).unwrap();
    let report = Report::from_results(&[result]);

    assert_eq!(report.loads, vec![0.0, 0.0]);
    for class in 0..2 {
        assert_eq!(report.system[class][1].mean_ms, EMPTY_SAMPLES_MS);
        assert_eq!(report.system[class][1].max_ms, EMPTY_SAMPLES_MS);
        for station in &report.stations {
            assert_eq!(station.series[class][0].mean_ms, 0.0);
            assert_eq!(station.series[class][1].max_ms, EMPTY_SAMPLES_MS);
        }
    }
}

#[test]
fn sweep_runs_every_point() {
    let tracker = create_tracker(file!());
    let mut seen = Vec::new();
    let results = run_sweep(&tracker, &short_sweep(2), |r| seen.push(r.load)).unwrap();

    assert_eq!(seen, vec![0.5, 1.0]);
    assert_eq!(results.len(), 2);
    for result in &results {
        assert_eq!(result.stations.len(), 3);
        assert_relative_eq!(result.end_time_us, 20_000.0);
    }

    let report = Report::from_results(&results);
    assert_eq!(report.loads.len(), 3);
    assert_eq!(report.stations.len(), 3);
}

#[test]
fn sweep_is_repeatable() {
    let tracker = create_tracker(file!());
    let first = run_sweep(&tracker, &short_sweep(2), |_| {}).unwrap();
    let second = run_sweep(&tracker, &short_sweep(2), |_| {}).unwrap();
    assert_eq!(first, second);
}

#[test]
fn invalid_config_fails_sweep() {
    let tracker = create_tracker(file!());
    let config = Config {
        ts_us: Some(0.0),
        ..short_sweep(2)
    };
    let err = run_sweep(&tracker, &config, |_| {}).unwrap_err();
    assert!(err.0.starts_with("Invalid configuration"));
}
