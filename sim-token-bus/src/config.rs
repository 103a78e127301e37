// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Application configuration gathered from multiple sources.
//!
//! Values are merged from lowest to highest priority:
//!  - the built-in defaults,
//!  - the TOML file named by `--conf-file` (if any),
//!  - environment variables prefixed with `TBS_` (e.g. `TBS_NUM_STATIONS=4`),
//!  - options given explicitly on the command line.
//!
//! Every field is an `Option` so that unset command-line options can be told
//! apart from ones the user gave.

use std::path::{Path, PathBuf};

use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tbs_engine::sim_error;
use tbs_engine::types::SimError;
use tbs_models::config::TokenBusConfig;

/// Prefix of environment variables read by [`Config`].
pub const ENV_PREFIX: &str = "TBS_";

/// Command-line arguments and configuration of a load sweep.
#[derive(Parser, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[command(about = "Timed-token bus load sweep")]
pub struct Config {
    /// The number of stations on the ring.
    #[arg(long)]
    pub num_stations: Option<usize>,

    /// Token holding time for class A traffic (us).
    #[arg(long)]
    pub ts_us: Option<f64>,

    /// Target rotation time bounding class B traffic (us).
    #[arg(long)]
    pub trt_us: Option<f64>,

    /// Simulated time of each load point (us).
    #[arg(long)]
    pub run_time_us: Option<f64>,

    /// Number of load points between 0 and 1 (exclusive of 0).
    #[arg(long)]
    pub load_steps: Option<usize>,

    /// Seed for the random number generators.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Mean number of data bits in a frame.
    #[arg(long)]
    pub mean_data_bits: Option<u64>,

    /// Protocol overhead added to every frame (bits).
    #[arg(long)]
    pub overhead_bits: Option<u64>,

    /// Size of the token body (bits).
    #[arg(long)]
    pub token_bits: Option<u64>,

    /// Medium bandwidth (Mbit/s).
    #[arg(long)]
    pub bandwidth_mbps: Option<f64>,

    /// Smallest class B data size (bits).
    #[arg(long)]
    pub min_b_data_bits: Option<u64>,

    /// Largest class B data size (bits).
    #[arg(long)]
    pub max_b_data_bits: Option<u64>,

    /// Delay before frames start arriving at the stations (us).
    #[arg(long)]
    pub arrival_start_us: Option<f64>,

    /// Time after which no more frames arrive (us). Frames keep arriving
    /// until the end of the run when unset.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival_finish_us: Option<f64>,

    /// Path to a TOML configuration file.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conf_file: Option<PathBuf>,

    /// Enable logging to the console.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub stdout: Option<bool>,

    /// Level of log message to display.
    #[arg(long)]
    pub stdout_level: Option<log::Level>,

    /// Set a regular expression for which entities should have logging level set
    /// to `--stdout-level`. Others will have level set to `Error`.
    #[arg(long)]
    pub stdout_filter_regex: Option<String>,

    /// Also write log messages to this file.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,

    /// Show a progress bar advancing once per load point.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub progress: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        let model = TokenBusConfig::default();
        Self {
            num_stations: Some(model.num_stations),
            ts_us: Some(model.ts_us),
            trt_us: Some(model.trt_us),
            run_time_us: Some(model.run_time_us),
            load_steps: Some(10),
            seed: Some(model.seed),
            mean_data_bits: Some(model.mean_data_bits),
            overhead_bits: Some(model.overhead_bits),
            token_bits: Some(model.token_bits),
            bandwidth_mbps: Some(model.bandwidth_mbps),
            min_b_data_bits: Some(model.min_b_data_bits),
            max_b_data_bits: Some(model.max_b_data_bits),
            arrival_start_us: Some(model.arrival_start_us),
            arrival_finish_us: model.arrival_finish_us,
            conf_file: None,
            stdout: Some(false),
            stdout_level: Some(log::Level::Info),
            stdout_filter_regex: Some(String::new()),
            log_file: None,
            progress: Some(false),
        }
    }
}

/// Overwrite each field of `$config` that was given in `$cli`.
macro_rules! merge_set_fields {
    ($config:ident, $cli:ident ; $($field:ident),+) => {
        $(
            if $cli.$field.is_some() {
                $config.$field = $cli.$field;
            }
        )+
    };
}

impl Config {
    /// Parse the command line and merge it with all other sources.
    pub fn parse_all_sources() -> Result<Self, SimError> {
        Self::merge_sources(Self::parse())
    }

    /// Merge the defaults, configuration file and environment and then apply
    /// the values set in `cli` on top.
    pub fn merge_sources(cli: Config) -> Result<Self, SimError> {
        let mut figment = Self::figment_with_defaults();
        if let Some(conf_file) = &cli.conf_file {
            figment = Self::figment_conf_file_merge(figment, conf_file)?;
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX));

        let config: Config = figment
            .extract()
            .map_err(|e| SimError(format!("Unable to read configuration: {e}")))?;
        Ok(config.clap_merge(cli))
    }

    fn figment_with_defaults() -> Figment {
        Figment::new().merge(Serialized::defaults(Config::default()))
    }

    fn figment_conf_file_merge(figment: Figment, conf_file: &Path) -> Result<Figment, SimError> {
        if !conf_file.is_file() {
            return sim_error!(format!(
                "Configuration file '{}' not found",
                conf_file.display()
            ));
        }
        Ok(figment.merge(Toml::file(conf_file)))
    }

    fn clap_merge(mut self, cli: Config) -> Self {
        merge_set_fields!(self, cli ;
            num_stations, ts_us, trt_us, run_time_us, load_steps, seed,
            mean_data_bits, overhead_bits, token_bits, bandwidth_mbps,
            min_b_data_bits, max_b_data_bits, arrival_start_us,
            arrival_finish_us, conf_file, stdout,
            stdout_level, stdout_filter_regex, log_file, progress);
        self
    }

    /// Build the validated model configuration of one load point.
    pub fn to_token_bus_config(&self, load: f64, seed: u64) -> Result<TokenBusConfig, SimError> {
        let defaults = TokenBusConfig::default();
        let config = TokenBusConfig {
            num_stations: self.num_stations.unwrap_or(defaults.num_stations),
            ts_us: self.ts_us.unwrap_or(defaults.ts_us),
            trt_us: self.trt_us.unwrap_or(defaults.trt_us),
            run_time_us: self.run_time_us.unwrap_or(defaults.run_time_us),
            load,
            seed,
            mean_data_bits: self.mean_data_bits.unwrap_or(defaults.mean_data_bits),
            overhead_bits: self.overhead_bits.unwrap_or(defaults.overhead_bits),
            token_bits: self.token_bits.unwrap_or(defaults.token_bits),
            bandwidth_mbps: self.bandwidth_mbps.unwrap_or(defaults.bandwidth_mbps),
            min_b_data_bits: self.min_b_data_bits.unwrap_or(defaults.min_b_data_bits),
            max_b_data_bits: self.max_b_data_bits.unwrap_or(defaults.max_b_data_bits),
            arrival_start_us: self.arrival_start_us.unwrap_or(defaults.arrival_start_us),
            arrival_finish_us: self.arrival_finish_us.or(defaults.arrival_finish_us),
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }

    /// Number of load points in the sweep (at least one).
    pub fn load_steps(&self) -> Result<usize, SimError> {
        match self.load_steps {
            Some(0) => sim_error!("Invalid configuration: load_steps must be at least 1"),
            Some(steps) => Ok(steps),
            None => Ok(10),
        }
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed.unwrap_or_default()
    }

    #[must_use]
    pub fn progress(&self) -> bool {
        self.progress.unwrap_or(false)
    }
}
