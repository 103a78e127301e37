// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::env;
use std::io::Write;

use clap::Parser;
use serial_test::serial;
use sim_token_bus::config::Config;

fn cli(args: &[&str]) -> Config {
    let mut argv = vec!["sim-token-bus"];
    argv.extend_from_slice(args);
    Config::try_parse_from(argv).unwrap()
}

fn conf_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn defaults_only() {
    let config = Config::merge_sources(cli(&[])).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
#[serial]
fn file_overrides_defaults() {
    let file = conf_file("num_stations = 4\nts_us = 250.0\n");
    let path = file.path().to_str().unwrap();
    let config = Config::merge_sources(cli(&["--conf-file", path])).unwrap();

    assert_eq!(config.num_stations, Some(4));
    assert_eq!(config.ts_us, Some(250.0));
    assert_eq!(config.trt_us, Config::default().trt_us);
}

#[test]
#[serial]
fn env_overrides_file_and_cli_overrides_env() {
    let file = conf_file("num_stations = 4\nseed = 1\nload_steps = 3\n");
    let path = file.path().to_str().unwrap();

    unsafe {
        env::set_var("TBS_NUM_STATIONS", "6");
        env::set_var("TBS_SEED", "9");
    }
    let result = Config::merge_sources(cli(&["--conf-file", path, "--seed", "11"]));
    unsafe {
        env::remove_var("TBS_NUM_STATIONS");
        env::remove_var("TBS_SEED");
    }

    let config = result.unwrap();
    assert_eq!(config.load_steps, Some(3));
    assert_eq!(config.num_stations, Some(6));
    assert_eq!(config.seed, Some(11));
}

#[test]
#[serial]
fn missing_file_is_an_error() {
    let err = Config::merge_sources(cli(&["--conf-file", "no/such/file.toml"])).unwrap_err();
    assert!(err.0.contains("not found"));
}

#[test]
#[serial]
fn bad_value_is_an_error() {
    let file = conf_file("num_stations = \"many\"\n");
    let path = file.path().to_str().unwrap();
    let err = Config::merge_sources(cli(&["--conf-file", path])).unwrap_err();
    assert!(err.0.starts_with("Unable to read configuration"));
}

#[test]
#[serial]
fn arrival_window_from_file_and_env() {
    let file = conf_file("arrival_start_us = 20000.0\narrival_finish_us = 40000.0\n");
    let path = file.path().to_str().unwrap();

    let config = Config::merge_sources(cli(&["--conf-file", path])).unwrap();
    assert_eq!(config.arrival_start_us, Some(20_000.0));
    assert_eq!(config.arrival_finish_us, Some(40_000.0));

    unsafe {
        env::set_var("TBS_ARRIVAL_FINISH_US", "60000");
    }
    let result = Config::merge_sources(cli(&["--conf-file", path]));
    unsafe {
        env::remove_var("TBS_ARRIVAL_FINISH_US");
    }

    let model = result.unwrap().to_token_bus_config(0.5, 0).unwrap();
    assert_eq!(model.arrival_start_us, 20_000.0);
    assert_eq!(model.arrival_finish_us, Some(60_000.0));
}
