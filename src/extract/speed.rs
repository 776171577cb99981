// Walk and bicycle speed extraction
//
// Itineraries only report a combined `walk_distance`, which for an
// itinerary with a BICYCLE leg also includes the cycled distance. The
// walking part is estimated from WALK leg times at a default walking speed
// and removed, leaving an estimate of the cycled distance.
//
// A test case yields at most one sample. Bicycle takes priority: any cycled
// time makes it a bicycle sample and it never appears among walk samples.

use crate::dataset::{Dataset, TestCaseId};
use crate::error::CompareError;
use crate::extract::{leg_modes, vector_mean, MetricMap, MetricValue, SpeedKind};
use std::collections::BTreeMap;

/// Default walking speed assumed by the routing engine (m/s)
pub const DEFAULT_WALK_SPEED: f64 = 1.222;

const WALK: &str = "WALK";
const BICYCLE: &str = "BICYCLE";

/// Speed samples of one snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeedProfile {
    pub walk_speeds: BTreeMap<TestCaseId, f64>,
    pub bicycle_speeds: BTreeMap<TestCaseId, f64>,
    /// Mean over walk samples, 0 without samples
    pub average_walk_speed: f64,
    /// Mean over bicycle samples, 0 without samples
    pub average_bicycle_speed: f64,
}

impl SpeedProfile {
    /// All samples tagged with their kind, for the generic comparison fold
    pub fn samples(&self) -> MetricMap {
        let walk = self.walk_speeds.iter().map(|(id, v)| {
            (
                id.clone(),
                MetricValue::Speed {
                    kind: SpeedKind::Walk,
                    value: *v,
                },
            )
        });
        let bicycle = self.bicycle_speeds.iter().map(|(id, v)| {
            (
                id.clone(),
                MetricValue::Speed {
                    kind: SpeedKind::Bicycle,
                    value: *v,
                },
            )
        });
        walk.chain(bicycle).collect()
    }

    pub fn average(&self, kind: SpeedKind) -> f64 {
        match kind {
            SpeedKind::Walk => self.average_walk_speed,
            SpeedKind::Bicycle => self.average_bicycle_speed,
        }
    }
}

#[derive(Debug, Default)]
struct Travelled {
    walk_time: f64,
    walk_distance: f64,
    bicycle_time: f64,
    bicycle_distance: f64,
}

impl Travelled {
    fn add(&mut self, modes: &[String], times: &[f64], distance: f64) {
        if modes.iter().any(|m| m == BICYCLE) {
            self.bicycle_distance += distance;
            for (mode, time) in modes.iter().zip(times) {
                match mode.as_str() {
                    WALK => self.bicycle_distance -= time * DEFAULT_WALK_SPEED,
                    BICYCLE => self.bicycle_time += time,
                    _ => {}
                }
            }
        } else {
            self.walk_distance += distance;
            self.walk_time += modes
                .iter()
                .zip(times)
                .filter(|(mode, _)| mode.as_str() == WALK)
                .map(|(_, time)| time)
                .sum::<f64>();
        }
    }

    fn sample(&self) -> Option<(SpeedKind, f64)> {
        if self.bicycle_time > 0.0 {
            Some((SpeedKind::Bicycle, self.bicycle_distance / self.bicycle_time))
        } else if self.walk_time > 0.0 {
            Some((SpeedKind::Walk, self.walk_distance / self.walk_time))
        } else {
            None
        }
    }
}

fn mean(samples: &BTreeMap<TestCaseId, f64>) -> f64 {
    let values: Vec<f64> = samples.values().copied().collect();
    vector_mean(&values)
}

/// Extract per-test-case walk and bicycle speeds with their means
pub fn speeds(dataset: &Dataset) -> Result<SpeedProfile, CompareError> {
    let mut profile = SpeedProfile::default();

    for (id, record) in dataset.iter() {
        let mut travelled = Travelled::default();
        for itin in record.itineraries() {
            let modes = leg_modes(dataset, id, itin)?;
            let times = itin.leg_times.as_deref().ok_or_else(|| {
                CompareError::malformed(
                    dataset.origin(),
                    format!("test case {}: itinerary lacks `leg_times`", id),
                )
            })?;
            if modes.len() != times.len() {
                return Err(CompareError::malformed(
                    dataset.origin(),
                    format!(
                        "test case {}: {} leg modes but {} leg times",
                        id,
                        modes.len(),
                        times.len()
                    ),
                ));
            }
            let distance = itin.walk_distance.ok_or_else(|| {
                CompareError::malformed(
                    dataset.origin(),
                    format!("test case {}: itinerary lacks `walk_distance`", id),
                )
            })?;
            travelled.add(modes, times, distance);
        }

        match travelled.sample() {
            Some((SpeedKind::Bicycle, speed)) => {
                profile.bicycle_speeds.insert(id.clone(), speed);
            }
            Some((SpeedKind::Walk, speed)) => {
                profile.walk_speeds.insert(id.clone(), speed);
            }
            None => {}
        }
    }

    profile.average_walk_speed = mean(&profile.walk_speeds);
    profile.average_bicycle_speed = mean(&profile.bicycle_speeds);
    tracing::debug!(
        "{}: {} walk speed samples, {} bicycle speed samples",
        dataset.origin(),
        profile.walk_speeds.len(),
        profile.bicycle_speeds.len()
    );
    Ok(profile)
}
