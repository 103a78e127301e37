// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Library functions to build trackers as defined by the user.

use std::fs;
use std::io::{self, BufWriter};
use std::rc::Rc;

use crate::tracker::{LevelFilter, TextTracker, TrackConfigError};
use crate::{Tracker, Writer};

/// Configuration options for an individual tracker.
pub struct TrackerConfig<'a> {
    /// Enable this tracker.
    pub enable: bool,

    /// Set the level at which this tracker should be enabled.
    pub level: log::Level,

    /// A regular expression to match which entities should have this level
    /// applied.
    pub filter_regex: &'a str,

    /// If required, the name of the file to which the tracker will write.
    pub file: Option<&'a str>,
}

impl Default for TrackerConfig<'_> {
    fn default() -> Self {
        Self {
            enable: true,
            level: log::Level::Warn,
            filter_regex: "",
            file: None,
        }
    }
}

/// Configuration options for all tracking.
pub struct TrackersConfig<'a> {
    /// Configuration for stdout.
    pub stdout: TrackerConfig<'a>,

    /// Configuration for the text log file.
    pub log_file: TrackerConfig<'a>,
}

/// When a filter regular expression is given only matching entities are set
/// to the requested level and all other entities only emit errors.
fn build_filter(config: &TrackerConfig) -> Result<LevelFilter, TrackConfigError> {
    if config.filter_regex.is_empty() {
        Ok(LevelFilter::new(config.level))
    } else {
        LevelFilter::new(log::Level::Error).with_rule(config.filter_regex, config.level)
    }
}

fn open_log_file(config: &TrackerConfig) -> Result<Writer, TrackConfigError> {
    let Some(path) = config.file else {
        return Err(TrackConfigError(
            "Log file tracker enabled without a file name".to_string(),
        ));
    };
    let file = fs::File::create(path)
        .map_err(|e| TrackConfigError(format!("Unable to create '{path}': {e}")))?;
    Ok(Box::new(BufWriter::new(file)))
}

/// Build one text tracker with a sink for stdout and/or the log file.
///
/// When nothing is enabled the tracker drops all events.
pub fn setup_trackers(config: &TrackersConfig) -> Result<Tracker, TrackConfigError> {
    let mut tracker = TextTracker::new();
    if config.stdout.enable {
        let stdout: Writer = Box::new(BufWriter::new(io::stdout()));
        tracker = tracker.with_sink(build_filter(&config.stdout)?, stdout);
    }
    if config.log_file.enable {
        let file = open_log_file(&config.log_file)?;
        tracker = tracker.with_sink(build_filter(&config.log_file)?, file);
    }
    Ok(Rc::new(tracker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_enabled_drops_events() {
        let config = TrackersConfig {
            stdout: TrackerConfig {
                enable: false,
                ..Default::default()
            },
            log_file: TrackerConfig {
                enable: false,
                ..Default::default()
            },
        };
        let tracker = setup_trackers(&config).unwrap();
        assert!(!tracker.is_entity_enabled(crate::ROOT, log::Level::Error));
    }

    #[test]
    fn log_file_requires_name() {
        let config = TrackersConfig {
            stdout: TrackerConfig {
                enable: false,
                ..Default::default()
            },
            log_file: TrackerConfig::default(),
        };
        assert!(setup_trackers(&config).is_err());
    }

    #[test]
    fn stdout_and_log_file_share_one_tracker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let config = TrackersConfig {
            stdout: TrackerConfig {
                level: log::Level::Error,
                ..Default::default()
            },
            log_file: TrackerConfig {
                level: log::Level::Trace,
                filter_regex: "::mac$",
                file: path.to_str(),
                ..Default::default()
            },
        };
        let tracker = setup_trackers(&config).unwrap();
        let top = crate::entity::toplevel(&tracker, "sweep");
        let mac = crate::entity::Entity::new(&top, "mac");
        crate::trace!(mac ; "token received");
        crate::set_time!(mac ; 50, 5.0);
        crate::info!(top ; "not written");
        tracker.shutdown();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "[0 0.0us] 1: created 2, sweep::mac, 0 bits",
                "[0 0.0us] 2:TRACE: token received",
            ]
        );
    }

    #[test]
    fn bad_filter_is_reported() {
        let config = TrackersConfig {
            stdout: TrackerConfig {
                filter_regex: "(",
                ..Default::default()
            },
            log_file: TrackerConfig {
                enable: false,
                ..Default::default()
            },
        };
        assert!(setup_trackers(&config).is_err());
    }
}
