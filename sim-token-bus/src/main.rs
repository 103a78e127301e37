// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Run a load sweep of a timed-token bus.
//!
//! See `lib.rs` for details.

use indicatif::ProgressBar;
use sim_token_bus::config::Config;
use sim_token_bus::report::Report;
use sim_token_bus::run_sweep;
use tbs_engine::types::SimError;
use tbs_track::builder::{TrackerConfig, TrackersConfig, setup_trackers};
use tbs_track::entity::toplevel;
use tbs_track::{Tracker, info};

fn setup_all_trackers(config: &Config) -> Result<Tracker, SimError> {
    let level = config.stdout_level.unwrap_or(log::Level::Info);
    let filter_regex = config.stdout_filter_regex.as_deref().unwrap_or("");
    let trackers = TrackersConfig {
        stdout: TrackerConfig {
            enable: config.stdout.unwrap_or(false),
            level,
            filter_regex,
            file: None,
        },
        log_file: TrackerConfig {
            enable: config.log_file.is_some(),
            level,
            filter_regex,
            file: config.log_file.as_deref(),
        },
    };
    setup_trackers(&trackers).map_err(|e| SimError(format!("{e}")))
}

fn main() -> Result<(), SimError> {
    let config = Config::parse_all_sources()?;
    let tracker = setup_all_trackers(&config)?;

    let top = toplevel(&tracker, "sweep");
    let steps = config.load_steps()?;
    info!(top ; "Sweep of {} load points with configuration {:?}", steps, config);

    let progress_bar = if config.progress() {
        ProgressBar::new(steps as u64)
    } else {
        ProgressBar::hidden()
    };

    let results = run_sweep(&tracker, &config, |result| {
        info!(top ; "Load {:.2} done at {}us", result.load, result.end_time_us);
        progress_bar.inc(1);
    })?;
    progress_bar.finish();

    print!("{}", Report::from_results(&results));
    tracker.shutdown();
    Ok(())
}
