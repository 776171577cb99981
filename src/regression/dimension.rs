// Declarative dimension descriptors
//
// Each quality dimension is described once (name, extractor, comparison
// policy) and a single generic fold drives all of them.

use crate::dataset::{Dataset, TestCaseId};
use crate::error::CompareError;
use crate::extract::{self, MetricMap, MetricValue, ServerTiming, SpeedProfile};
use crate::regression::classify::Policy;
use crate::regression::config::CompareConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Quality dimension compared between snapshots, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Duration,
    Itineraries,
    Modes,
    Legs,
    Trips,
    Speed,
    TotalTime,
    AverageTime,
    Timeouts,
}

impl Dimension {
    pub const ALL: [Dimension; 9] = [
        Dimension::Duration,
        Dimension::Itineraries,
        Dimension::Modes,
        Dimension::Legs,
        Dimension::Trips,
        Dimension::Speed,
        Dimension::TotalTime,
        Dimension::AverageTime,
        Dimension::Timeouts,
    ];

    /// Title used in verdict lines ("<name> test failed")
    pub fn name(self) -> &'static str {
        match self {
            Dimension::Duration => "Route duration",
            Dimension::Itineraries => "Itinerary",
            Dimension::Modes => "Mode",
            Dimension::Legs => "Leg",
            Dimension::Trips => "Trip",
            Dimension::Speed => "Speed",
            Dimension::TotalTime => "Total request time",
            Dimension::AverageTime => "Average request time",
            Dimension::Timeouts => "Timeout",
        }
    }

    /// Label used in per-test-case diagnostics
    pub fn label(self) -> &'static str {
        match self {
            Dimension::Duration => "route duration",
            Dimension::Itineraries => "itineraries",
            Dimension::Modes => "modes",
            Dimension::Legs => "legs",
            Dimension::Trips => "trips",
            Dimension::Speed => "speeds",
            Dimension::TotalTime => "total time",
            Dimension::AverageTime => "average time",
            Dimension::Timeouts => "timeouts",
        }
    }

    /// Comparison policy with this run's threshold
    pub fn policy(self, config: &CompareConfig) -> Policy {
        match self {
            Dimension::Duration => Policy::duration(config.duration_threshold),
            Dimension::Itineraries => Policy::lower_is_worse(config.itinerary_threshold),
            Dimension::Modes => Policy::lower_is_worse(config.mode_threshold),
            Dimension::Legs => Policy::higher_is_worse(config.leg_threshold),
            Dimension::Trips => Policy::higher_is_worse(config.trip_threshold),
            Dimension::Speed => Policy::lower_is_worse(config.speed_threshold),
            Dimension::TotalTime => Policy::higher_is_worse(config.total_time_threshold),
            Dimension::AverageTime => Policy::higher_is_worse(config.average_time_threshold),
            Dimension::Timeouts => Policy::transition(),
        }
    }

    pub fn is_enabled(self, config: &CompareConfig) -> bool {
        match self {
            Dimension::Duration => true,
            Dimension::Itineraries => config.itineraries,
            Dimension::Modes => config.modes,
            Dimension::Legs => config.legs,
            Dimension::Trips => config.trips,
            Dimension::Speed => config.speeds,
            Dimension::TotalTime | Dimension::AverageTime | Dimension::Timeouts => {
                config.performance
            }
        }
    }
}

/// An enabled dimension with its resolved policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DimensionSpec {
    pub dimension: Dimension,
    pub policy: Policy,
}

/// Enabled dimensions in report order; duration always comes first
pub fn enabled_dimensions(config: &CompareConfig) -> Vec<DimensionSpec> {
    Dimension::ALL
        .into_iter()
        .filter(|d| d.is_enabled(config))
        .map(|dimension| DimensionSpec {
            dimension,
            policy: dimension.policy(config),
        })
        .collect()
}

fn scalars(map: BTreeMap<TestCaseId, f64>) -> MetricMap {
    map.into_iter()
        .map(|(id, v)| (id, MetricValue::Scalar(v)))
        .collect()
}

fn counts(map: BTreeMap<TestCaseId, usize>) -> MetricMap {
    map.into_iter()
        .map(|(id, n)| (id, MetricValue::Scalar(n as f64)))
        .collect()
}

/// Metrics of one snapshot for a set of dimensions
///
/// Speed and server timing extraction runs once per snapshot even though
/// several dimensions and the report summaries read from it.
#[derive(Debug, Clone, Default)]
pub struct SnapshotMetrics {
    metrics: BTreeMap<Dimension, MetricMap>,
    speeds: Option<SpeedProfile>,
    timings: Option<BTreeMap<TestCaseId, ServerTiming>>,
}

impl SnapshotMetrics {
    pub fn extract(dataset: &Dataset, dimensions: &[Dimension]) -> Result<Self, CompareError> {
        let mut snapshot = Self::default();
        for &dimension in dimensions {
            let map = match dimension {
                Dimension::Duration => scalars(extract::durations(dataset)?),
                Dimension::Itineraries => counts(extract::itinerary_counts(dataset)),
                Dimension::Modes => counts(extract::mode_counts(dataset)?),
                Dimension::Legs => counts(extract::leg_counts(dataset)?),
                Dimension::Trips => counts(extract::trip_counts(dataset)?),
                Dimension::Speed => snapshot.speed_profile(dataset)?.samples(),
                Dimension::TotalTime => snapshot.timing_metric(dataset, |t| {
                    MetricValue::Scalar(t.total_time)
                })?,
                Dimension::AverageTime => snapshot.timing_metric(dataset, |t| {
                    MetricValue::Scalar(t.avg_time)
                })?,
                Dimension::Timeouts => {
                    snapshot.timing_metric(dataset, |t| MetricValue::Flag(t.timed_out))?
                }
            };
            tracing::debug!(
                "{}: extracted {} values for {}",
                dataset.origin(),
                map.len(),
                dimension.label()
            );
            snapshot.metrics.insert(dimension, map);
        }
        Ok(snapshot)
    }

    fn speed_profile(&mut self, dataset: &Dataset) -> Result<&SpeedProfile, CompareError> {
        let profile = match self.speeds.take() {
            Some(profile) => profile,
            None => extract::speeds(dataset)?,
        };
        Ok(self.speeds.insert(profile))
    }

    fn timing_metric(
        &mut self,
        dataset: &Dataset,
        pick: impl Fn(&ServerTiming) -> MetricValue,
    ) -> Result<MetricMap, CompareError> {
        let timings = match self.timings.take() {
            Some(timings) => timings,
            None => extract::server_timings(dataset)?,
        };
        Ok(self
            .timings
            .insert(timings)
            .iter()
            .map(|(id, timing)| (id.clone(), pick(timing)))
            .collect())
    }

    /// Per-test-case values of one dimension, if it was extracted
    pub fn metric(&self, dimension: Dimension) -> Option<&MetricMap> {
        self.metrics.get(&dimension)
    }

    pub fn value(&self, dimension: Dimension, id: &TestCaseId) -> Option<MetricValue> {
        self.metrics.get(&dimension)?.get(id).copied()
    }

    /// Speed samples and averages, present when speeds were extracted
    pub fn speeds(&self) -> Option<&SpeedProfile> {
        self.speeds.as_ref()
    }

    /// Server timings, present when a performance dimension was extracted
    pub fn timings(&self) -> Option<&BTreeMap<TestCaseId, ServerTiming>> {
        self.timings.as_ref()
    }
}
