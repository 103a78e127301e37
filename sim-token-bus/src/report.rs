// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Aggregate the delay samples of a sweep into per-station and system
//! series and format them as text tables.

use std::fmt;

use tbs_models::frame::TrafficClass;
use tbs_models::run::LoadPointResult;

/// Value reported for both the mean and the maximum when a station did not
/// send any frame of a class.
pub const EMPTY_SAMPLES_MS: f64 = 10000.0;

/// Delay statistics of one sample sequence (`ms`).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DelayStats {
    pub mean_ms: f64,
    pub max_ms: f64,
}

impl DelayStats {
    /// Summarise delay samples given in `us`.
    #[must_use]
    pub fn from_samples_us(samples_us: &[f64]) -> Self {
        if samples_us.is_empty() {
            return Self {
                mean_ms: EMPTY_SAMPLES_MS,
                max_ms: EMPTY_SAMPLES_MS,
            };
        }
        let sum: f64 = samples_us.iter().sum();
        let max = samples_us.iter().copied().fold(f64::MIN, f64::max);
        Self {
            mean_ms: sum / samples_us.len() as f64 / 1000.0,
            max_ms: max / 1000.0,
        }
    }

    /// Combine per-station statistics into the system statistic: the mean of
    /// the means and the maximum of the maxima.
    #[must_use]
    pub fn combine(stations: &[DelayStats]) -> Self {
        if stations.is_empty() {
            return Self::default();
        }
        let mean_sum: f64 = stations.iter().map(|s| s.mean_ms).sum();
        Self {
            mean_ms: mean_sum / stations.len() as f64,
            max_ms: stations.iter().map(|s| s.max_ms).fold(f64::MIN, f64::max),
        }
    }
}

/// The series of one station in ring creation order, indexed by class then
/// load point.
#[derive(Clone, Debug, PartialEq)]
pub struct StationSeries {
    pub index: usize,
    pub series: [Vec<DelayStats>; 2],
}

/// Delay series of a whole sweep.
///
/// The first load point is always load 0 with all statistics zero.
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    pub loads: Vec<f64>,
    pub system: [Vec<DelayStats>; 2],
    pub stations: Vec<StationSeries>,
}

impl Report {
    /// Build the report of the given load points.
    #[must_use]
    pub fn from_results(results: &[LoadPointResult]) -> Self {
        let num_stations = results.iter().map(|r| r.stations.len()).max().unwrap_or(0);

        let mut loads = vec![0.0];
        let mut system = [vec![DelayStats::default()], vec![DelayStats::default()]];
        let mut stations: Vec<StationSeries> = (0..num_stations)
            .map(|index| StationSeries {
                index,
                series: [vec![DelayStats::default()], vec![DelayStats::default()]],
            })
            .collect();

        for result in results {
            loads.push(result.load);
            for class in TrafficClass::ALL {
                let per_station: Vec<DelayStats> = result
                    .stations
                    .iter()
                    .map(|s| DelayStats::from_samples_us(s.delays_us(class)))
                    .collect();
                system[class.index()].push(DelayStats::combine(&per_station));
                for (series, stats) in stations.iter_mut().zip(per_station) {
                    series.series[class.index()].push(stats);
                }
            }
        }

        Self {
            loads,
            system,
            stations,
        }
    }

    fn write_table(
        &self,
        f: &mut fmt::Formatter<'_>,
        title: &str,
        series: &[DelayStats],
    ) -> fmt::Result {
        writeln!(f, "{title}")?;
        writeln!(f, "{:>6} {:>12} {:>12}", "load", "mean (ms)", "max (ms)")?;
        for (load, stats) in self.loads.iter().zip(series) {
            writeln!(f, "{load:>6.2} {:>12.4} {:>12.4}", stats.mean_ms, stats.max_ms)?;
        }
        writeln!(f)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for class in TrafficClass::ALL {
            self.write_table(
                f,
                &format!("System: class {class} access delay"),
                &self.system[class.index()],
            )?;
        }
        for station in &self.stations {
            for class in TrafficClass::ALL {
                self.write_table(
                    f,
                    &format!("Station {}: class {class} access delay", station.index),
                    &station.series[class.index()],
                )?;
            }
        }
        Ok(())
    }
}
