// Metric extraction from response datasets
//
// Each quality dimension has one extractor that turns the nested response
// records of a snapshot into a per-test-case scalar. A response without
// itineraries always maps to the dimension's empty sentinel; only
// structurally broken records (a needed field missing) are errors.

pub mod performance;
pub mod speed;

pub use performance::{server_timings, ServerTiming};
pub use speed::{speeds, SpeedProfile};

use crate::dataset::{Dataset, Itinerary, TestCaseId};
use crate::error::CompareError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Modes dropped from the mode-diversity count when any other mode is present
pub const UNRESTRICTED_MODES: [&str; 3] = ["WALK", "BICYCLE", "CAR"];

/// Duration recorded for a test case whose routing returned no itinerary
pub const FAILED_DURATION: f64 = -1.0;

/// Which speed sample a test case contributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedKind {
    Walk,
    Bicycle,
}

impl SpeedKind {
    pub fn label(self) -> &'static str {
        match self {
            SpeedKind::Walk => "walk",
            SpeedKind::Bicycle => "bicycle",
        }
    }
}

/// Value of one dimension for one test case
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Scalar(f64),
    Flag(bool),
    Speed { kind: SpeedKind, value: f64 },
}

impl MetricValue {
    /// Numeric view used by threshold comparisons; flags count as 0 or 1
    pub fn as_f64(self) -> f64 {
        match self {
            MetricValue::Scalar(v) | MetricValue::Speed { value: v, .. } => v,
            MetricValue::Flag(b) => f64::from(u8::from(b)),
        }
    }

    pub fn speed_kind(self) -> Option<SpeedKind> {
        match self {
            MetricValue::Speed { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// Two values can only be compared when they are the same sort of
    /// measurement; speeds must also be of the same kind.
    pub fn comparable_with(self, other: MetricValue) -> bool {
        match (self, other) {
            (MetricValue::Scalar(_), MetricValue::Scalar(_)) => true,
            (MetricValue::Flag(_), MetricValue::Flag(_)) => true,
            (MetricValue::Speed { kind: a, .. }, MetricValue::Speed { kind: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricValue::Scalar(v) => write!(f, "{}", v),
            MetricValue::Flag(b) => write!(f, "{}", b),
            MetricValue::Speed { value, .. } => write!(f, "{:.6}", value),
        }
    }
}

/// Per-test-case metric of one dimension for one snapshot
pub type MetricMap = BTreeMap<TestCaseId, MetricValue>;

/// Parse the numeric prefix of a `"<number> <unit...>"` duration string
pub fn parse_duration(text: &str) -> Option<f64> {
    text.split_whitespace().next()?.parse().ok()
}

/// Route duration of the first itinerary, `-1` when routing failed
pub fn durations(dataset: &Dataset) -> Result<BTreeMap<TestCaseId, f64>, CompareError> {
    dataset
        .iter()
        .map(|(id, record)| -> Result<_, CompareError> {
            let duration = match record.first_itinerary() {
                None => FAILED_DURATION,
                Some(itin) => {
                    let text = itin.duration.as_deref().ok_or_else(|| {
                        CompareError::malformed(
                            dataset.origin(),
                            format!("test case {}: first itinerary lacks `duration`", id),
                        )
                    })?;
                    parse_duration(text).ok_or_else(|| {
                        CompareError::malformed(
                            dataset.origin(),
                            format!("test case {}: unparseable duration {:?}", id, text),
                        )
                    })?
                }
            };
            Ok((id.clone(), duration))
        })
        .collect()
}

/// Number of itineraries returned, `0` when the list is absent
pub fn itinerary_counts(dataset: &Dataset) -> BTreeMap<TestCaseId, usize> {
    dataset
        .iter()
        .map(|(id, record)| (id.clone(), record.itineraries().len()))
        .collect()
}

/// Modes an itinerary contributes to the diversity count
///
/// An itinerary made only of WALK/BICYCLE/CAR legs contributes those modes.
/// Otherwise the unrestricted modes are access legs and only the remaining
/// modes count.
pub fn counted_modes(leg_modes: &[String]) -> BTreeSet<&str> {
    let is_unrestricted = |mode: &&str| UNRESTRICTED_MODES.contains(mode);
    let modes: BTreeSet<&str> = leg_modes.iter().map(String::as_str).collect();
    if modes.iter().all(is_unrestricted) {
        modes
    } else {
        modes.into_iter().filter(|m| !is_unrestricted(m)).collect()
    }
}

/// Size of the union of counted modes across all itineraries
pub fn mode_counts(dataset: &Dataset) -> Result<BTreeMap<TestCaseId, usize>, CompareError> {
    dataset
        .iter()
        .map(|(id, record)| -> Result<_, CompareError> {
            let mut union = BTreeSet::new();
            for itin in record.itineraries() {
                union.extend(counted_modes(leg_modes(dataset, id, itin)?));
            }
            Ok((id.clone(), union.len()))
        })
        .collect()
}

/// `nLegs` of the first itinerary
pub fn leg_counts(dataset: &Dataset) -> Result<BTreeMap<TestCaseId, usize>, CompareError> {
    dataset
        .iter()
        .map(|(id, record)| -> Result<_, CompareError> {
            let legs = match record.first_itinerary() {
                None => 0,
                Some(itin) => itin.n_legs.ok_or_else(|| {
                    CompareError::malformed(
                        dataset.origin(),
                        format!("test case {}: first itinerary lacks `n_legs`", id),
                    )
                })?,
            };
            Ok((id.clone(), legs))
        })
        .collect()
}

/// Number of transit trips in the first itinerary
pub fn trip_counts(dataset: &Dataset) -> Result<BTreeMap<TestCaseId, usize>, CompareError> {
    dataset
        .iter()
        .map(|(id, record)| -> Result<_, CompareError> {
            let trips = match record.first_itinerary() {
                None => 0,
                Some(itin) => itin.trips.as_ref().map(Vec::len).ok_or_else(|| {
                    CompareError::malformed(
                        dataset.origin(),
                        format!("test case {}: first itinerary lacks `trips`", id),
                    )
                })?,
            };
            Ok((id.clone(), trips))
        })
        .collect()
}

/// Sum of report-only totals using Trueno; 0 for no values
pub(crate) fn vector_sum(values: &[f64]) -> f64 {
    let values: Vec<f32> = values.iter().map(|&v| v as f32).collect();
    f64::from(trueno::Vector::from_slice(&values).sum().unwrap_or(0.0))
}

/// Mean of report-only samples using Trueno; 0 for no values
pub(crate) fn vector_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let values: Vec<f32> = values.iter().map(|&v| v as f32).collect();
    f64::from(trueno::Vector::from_slice(&values).mean().unwrap_or(0.0))
}

pub(crate) fn leg_modes<'a>(
    dataset: &Dataset,
    id: &TestCaseId,
    itin: &'a Itinerary,
) -> Result<&'a [String], CompareError> {
    itin.leg_modes.as_deref().ok_or_else(|| {
        CompareError::malformed(
            dataset.origin(),
            format!("test case {}: itinerary lacks `leg_modes`", id),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::IdComponent;

    fn dataset(json: &str) -> Dataset {
        Dataset::from_json_str("test.json", json).unwrap()
    }

    fn case(n: i64) -> TestCaseId {
        TestCaseId::new(vec![IdComponent::from("A"), n.into()])
    }

    fn modes(list: &[&str]) -> Vec<String> {
        list.iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn test_parse_duration_ignores_unit() {
        assert_eq!(parse_duration("100 s"), Some(100.0));
        assert_eq!(parse_duration("12.5 min and change"), Some(12.5));
        assert_eq!(parse_duration("42"), Some(42.0));
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn test_durations_with_failed_routing() {
        let ds = dataset(
            r#"{"responses": [
                {"id_tuple": ["A", 1], "itins": [{"duration": "100 s"}, {"duration": "300 s"}]},
                {"id_tuple": ["A", 2], "itins": []},
                {"id_tuple": ["A", 3]}
            ]}"#,
        );
        let map = durations(&ds).unwrap();
        assert_eq!(map[&case(1)], 100.0);
        assert_eq!(map[&case(2)], FAILED_DURATION);
        assert_eq!(map[&case(3)], FAILED_DURATION);
    }

    #[test]
    fn test_durations_missing_field_is_malformed() {
        let ds = dataset(r#"{"responses": [{"id_tuple": ["A", 1], "itins": [{}]}]}"#);
        assert!(matches!(
            durations(&ds),
            Err(CompareError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_durations_unparseable_is_malformed() {
        let ds = dataset(r#"{"responses": [{"id_tuple": ["A", 1], "itins": [{"duration": "n/a"}]}]}"#);
        assert!(durations(&ds).is_err());
    }

    #[test]
    fn test_itinerary_counts() {
        let ds = dataset(
            r#"{"responses": [
                {"id_tuple": ["A", 1], "itins": [{}, {}, {}]},
                {"id_tuple": ["A", 2], "itins": []},
                {"id_tuple": ["A", 3]}
            ]}"#,
        );
        let map = itinerary_counts(&ds);
        assert_eq!(map[&case(1)], 3);
        assert_eq!(map[&case(2)], 0);
        assert_eq!(map[&case(3)], 0);
    }

    #[test]
    fn test_counted_modes_unrestricted_only() {
        let leg_modes = modes(&["WALK", "CAR"]);
        let counted = counted_modes(&leg_modes);
        assert_eq!(counted.into_iter().collect::<Vec<_>>(), vec!["CAR", "WALK"]);
    }

    #[test]
    fn test_counted_modes_drops_access_modes() {
        let leg_modes = modes(&["WALK", "TRANSIT"]);
        let counted = counted_modes(&leg_modes);
        assert_eq!(counted.into_iter().collect::<Vec<_>>(), vec!["TRANSIT"]);
    }

    #[test]
    fn test_mode_counts_union_across_itineraries() {
        let ds = dataset(
            r#"{"responses": [
                {"id_tuple": ["A", 1], "itins": [
                    {"leg_modes": ["WALK", "BUS", "WALK"]},
                    {"leg_modes": ["WALK", "RAIL", "BUS"]},
                    {"leg_modes": ["BICYCLE"]}
                ]},
                {"id_tuple": ["A", 2], "itins": []}
            ]}"#,
        );
        let map = mode_counts(&ds).unwrap();
        // BUS, RAIL, BICYCLE
        assert_eq!(map[&case(1)], 3);
        assert_eq!(map[&case(2)], 0);
    }

    #[test]
    fn test_mode_counts_missing_leg_modes_is_malformed() {
        let ds = dataset(r#"{"responses": [{"id_tuple": ["A", 1], "itins": [{}]}]}"#);
        assert!(mode_counts(&ds).is_err());
    }

    #[test]
    fn test_leg_and_trip_counts_use_first_itinerary() {
        let ds = dataset(
            r#"{"responses": [
                {"id_tuple": ["A", 1], "itins": [
                    {"n_legs": 3, "trips": ["t1", "t2"]},
                    {"n_legs": 7, "trips": ["t3", "t4", "t5"]}
                ]},
                {"id_tuple": ["A", 2]}
            ]}"#,
        );
        let legs = leg_counts(&ds).unwrap();
        let trips = trip_counts(&ds).unwrap();
        assert_eq!(legs[&case(1)], 3);
        assert_eq!(legs[&case(2)], 0);
        assert_eq!(trips[&case(1)], 2);
        assert_eq!(trips[&case(2)], 0);
    }

    #[test]
    fn test_leg_counts_missing_field_is_malformed() {
        let ds = dataset(r#"{"responses": [{"id_tuple": ["A", 1], "itins": [{"trips": []}]}]}"#);
        assert!(leg_counts(&ds).is_err());
        assert_eq!(trip_counts(&ds).unwrap()[&case(1)], 0);
    }

    #[test]
    fn test_vector_statistics() {
        assert_eq!(vector_sum(&[100.0, 250.0, 50.0]), 400.0);
        assert_eq!(vector_sum(&[]), 0.0);
        assert_eq!(vector_mean(&[1.0, 2.0, 4.5]), 2.5);
        assert_eq!(vector_mean(&[]), 0.0);
    }

    #[test]
    fn test_metric_value_comparability() {
        let walk = MetricValue::Speed {
            kind: SpeedKind::Walk,
            value: 1.3,
        };
        let bike = MetricValue::Speed {
            kind: SpeedKind::Bicycle,
            value: 4.0,
        };
        assert!(walk.comparable_with(walk));
        assert!(!walk.comparable_with(bike));
        assert!(MetricValue::Scalar(1.0).comparable_with(MetricValue::Scalar(2.0)));
        assert!(!MetricValue::Scalar(1.0).comparable_with(MetricValue::Flag(true)));
        assert_eq!(MetricValue::Flag(true).as_f64(), 1.0);
    }
}
