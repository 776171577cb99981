//! CLI argument parsing for routegate

use crate::error::CompareError;
use crate::regression::CompareConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the comparison report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report lines (default)
    Text,
    /// JSON report for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "routegate")]
#[command(version)]
#[command(
    about = "Detect routing quality regressions between two benchmark snapshots",
    long_about = None
)]
pub struct Cli {
    /// Benchmark snapshot (A), the reference run
    #[arg(value_name = "BENCHMARK")]
    pub benchmark: PathBuf,

    /// Profile snapshot (B), the run under test
    #[arg(value_name = "PROFILE")]
    pub profile: PathBuf,

    /// Route duration threshold in seconds (default: 60)
    #[arg(short = 't', long = "threshold", value_name = "SECONDS")]
    pub threshold: Option<f64>,

    /// Minimum pass rate every compared dimension must reach (default: 95)
    #[arg(short = 'l', long = "limit", value_name = "PERCENT")]
    pub limit: Option<u32>,

    /// Compare the number of itineraries
    #[arg(short = 'i', long = "itineraries")]
    pub itineraries: bool,

    /// Itinerary count threshold (default: 1)
    #[arg(long = "itinerary-threshold", alias = "itinerarythreshold", value_name = "N")]
    pub itinerary_threshold: Option<f64>,

    /// Compare transport mode diversity
    #[arg(short = 'm', long = "modes")]
    pub modes: bool,

    /// Mode count threshold (default: 1)
    #[arg(long = "mode-threshold", alias = "modethreshold", value_name = "N")]
    pub mode_threshold: Option<f64>,

    /// Compare the leg count of the first itinerary
    #[arg(long = "legs")]
    pub legs: bool,

    /// Leg count threshold (default: 1)
    #[arg(long = "leg-threshold", alias = "legthreshold", value_name = "N")]
    pub leg_threshold: Option<f64>,

    /// Compare the trip count of the first itinerary
    #[arg(long = "trips")]
    pub trips: bool,

    /// Trip count threshold (default: 1)
    #[arg(long = "trip-threshold", alias = "tripthreshold", value_name = "N")]
    pub trip_threshold: Option<f64>,

    /// Compare walk and bicycle speeds
    #[arg(short = 's', long = "speeds")]
    pub speeds: bool,

    /// Speed threshold in m/s (default: 0.2)
    #[arg(long = "speed-threshold", alias = "speedthreshold", value_name = "M/S")]
    pub speed_threshold: Option<f64>,

    /// Compare server request times and timeouts
    #[arg(short = 'p', long = "performance")]
    pub performance: bool,

    /// Total request time threshold in ms (default: 200)
    #[arg(
        long = "total-time-threshold",
        alias = "totaltimethreshold",
        value_name = "MS"
    )]
    pub total_time_threshold: Option<f64>,

    /// Average request time threshold in ms (default: 40)
    #[arg(
        long = "average-time-threshold",
        alias = "averagetimethreshold",
        value_name = "MS"
    )]
    pub average_time_threshold: Option<f64>,

    /// Enable every optional dimension
    #[arg(short = 'a', long = "all")]
    pub all: bool,

    /// Load thresholds and enabled dimensions from a TOML file; flags override it
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug logging to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Resolve the comparison config: file (or defaults), then flags on top
    pub fn to_config(&self) -> Result<CompareConfig, CompareError> {
        let mut config = match &self.config {
            Some(path) => CompareConfig::from_file(path)?,
            None => CompareConfig::default(),
        };

        if self.all {
            config.itineraries = true;
            config.modes = true;
            config.legs = true;
            config.trips = true;
            config.speeds = true;
            config.performance = true;
        }
        config.itineraries |= self.itineraries;
        config.modes |= self.modes;
        config.legs |= self.legs;
        config.trips |= self.trips;
        config.speeds |= self.speeds;
        config.performance |= self.performance;

        let overrides = [
            (self.threshold, &mut config.duration_threshold),
            (self.itinerary_threshold, &mut config.itinerary_threshold),
            (self.mode_threshold, &mut config.mode_threshold),
            (self.leg_threshold, &mut config.leg_threshold),
            (self.trip_threshold, &mut config.trip_threshold),
            (self.speed_threshold, &mut config.speed_threshold),
            (self.total_time_threshold, &mut config.total_time_threshold),
            (self.average_time_threshold, &mut config.average_time_threshold),
        ];
        for (value, slot) in overrides {
            if let Some(value) = value {
                *slot = value;
            }
        }
        if let Some(limit) = self.limit {
            config.limit = limit;
        }

        config.validate()?;
        Ok(config)
    }
}
