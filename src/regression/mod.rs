// Threshold-based regression classification between two snapshots
//
// Pipeline for one run:
// 1. Extract every enabled dimension's metric from both snapshots
// 2. Establish the comparable test cases from route duration (mandatory)
// 3. Classify each test case per enabled dimension (generic fold)
// 4. Turn counters into pass rates against the limit and derive the verdict
//
// The comparison is a pure function of the two datasets and the config;
// the order of responses in either input file does not affect the result.

mod aggregate;
mod classify;
mod config;
mod dimension;
mod verdict;

pub use aggregate::{pass_rate, Aggregator, DimensionCounters, DimensionSummary, SideCounts};
pub use classify::{classify, Classification, Delta, Direction, Policy};
pub use config::CompareConfig;
pub use dimension::{enabled_dimensions, Dimension, DimensionSpec, SnapshotMetrics};
pub use verdict::{ComparisonReport, RequestTimeSummary, SnapshotPair, SpeedAverages, Verdict};

use crate::dataset::{Dataset, TestCaseId};
use crate::error::CompareError;
use crate::extract::{vector_sum, MetricMap, SpeedKind};

/// Every test case must exist in both snapshots' duration mappings
fn ensure_comparable(
    durations_a: &MetricMap,
    durations_b: &MetricMap,
    benchmark: &Dataset,
    profile: &Dataset,
) -> Result<(), CompareError> {
    let missing = |id: &TestCaseId, dataset: &Dataset| CompareError::MissingTestCase {
        id: id.clone(),
        missing_from: dataset.origin().to_string(),
    };

    if let Some(id) = durations_a.keys().find(|id| !durations_b.contains_key(*id)) {
        return Err(missing(id, profile));
    }
    if let Some(id) = durations_b.keys().find(|id| !durations_a.contains_key(*id)) {
        return Err(missing(id, benchmark));
    }
    if durations_a.is_empty() {
        return Err(CompareError::NoTestCases);
    }
    Ok(())
}

fn speed_averages(snapshot: &SnapshotMetrics) -> Option<SpeedAverages> {
    snapshot.speeds().map(|profile| SpeedAverages {
        walk: profile.average(SpeedKind::Walk),
        bicycle: profile.average(SpeedKind::Bicycle),
    })
}

fn total_request_time<'a>(
    snapshot: &SnapshotMetrics,
    ids: impl Iterator<Item = &'a TestCaseId>,
) -> Option<f64> {
    let timings = snapshot.timings()?;
    let totals: Vec<f64> = ids
        .filter_map(|id| timings.get(id))
        .map(|t| t.total_time)
        .collect();
    Some(vector_sum(&totals))
}

/// Compare a benchmark snapshot (A) against a profile snapshot (B)
///
/// # Example
/// ```
/// use routegate::dataset::Dataset;
/// use routegate::regression::{compare, CompareConfig};
///
/// let a = Dataset::from_json_str(
///     "bench.json",
///     r#"{"responses": [{"id_tuple": ["A", "B", 1], "itins": [{"duration": "100 s"}]}]}"#,
/// ).unwrap();
/// let b = Dataset::from_json_str(
///     "profile.json",
///     r#"{"responses": [{"id_tuple": ["A", "B", 1], "itins": [{"duration": "150 s"}]}]}"#,
/// ).unwrap();
///
/// let report = compare(&a, &b, &CompareConfig::default()).unwrap();
/// assert!(report.passed());
/// ```
pub fn compare(
    benchmark: &Dataset,
    profile: &Dataset,
    config: &CompareConfig,
) -> Result<ComparisonReport, CompareError> {
    config.validate()?;

    let specs = enabled_dimensions(config);
    let dimensions: Vec<Dimension> = specs.iter().map(|s| s.dimension).collect();
    for spec in &specs {
        tracing::info!(
            "Detecting regressions with a {} threshold of {} and test threshold {}",
            spec.dimension.label(),
            spec.policy.threshold,
            config.limit
        );
    }

    let metrics_a = SnapshotMetrics::extract(benchmark, &dimensions)?;
    let metrics_b = SnapshotMetrics::extract(profile, &dimensions)?;

    let empty = MetricMap::new();
    let durations_a = metrics_a.metric(Dimension::Duration).unwrap_or(&empty);
    let durations_b = metrics_b.metric(Dimension::Duration).unwrap_or(&empty);
    ensure_comparable(durations_a, durations_b, benchmark, profile)?;
    let count = durations_a.len();

    let mut aggregator = Aggregator::new(count, config.limit, &specs);
    let mut diagnostics = Vec::new();
    for id in durations_a.keys() {
        for spec in &specs {
            let dimension = spec.dimension;
            let (Some(a), Some(b)) = (metrics_a.value(dimension, id), metrics_b.value(dimension, id))
            else {
                continue;
            };
            let Some(delta) = classify(dimension.label(), id, a, b, &spec.policy) else {
                continue;
            };
            aggregator.record(dimension, &delta);
            if let Some(line) = delta.diagnostic {
                tracing::debug!("{}", line);
                diagnostics.push(line);
            }
        }
    }

    let summaries = aggregator.finish();
    let verdict = Verdict::from_summaries(&summaries);

    let speed_averages = match (speed_averages(&metrics_a), speed_averages(&metrics_b)) {
        (Some(a), Some(b)) => Some(SnapshotPair {
            benchmark: a,
            profile: b,
        }),
        _ => None,
    };
    let request_time = match (
        total_request_time(&metrics_a, durations_a.keys()),
        total_request_time(&metrics_b, durations_a.keys()),
    ) {
        (Some(a), Some(b)) => Some(RequestTimeSummary::new(a, b)),
        _ => None,
    };

    tracing::info!(
        "Compared {} test cases across {} dimensions: {}",
        count,
        summaries.len(),
        if verdict == Verdict::Pass { "pass" } else { "fail" }
    );

    Ok(ComparisonReport {
        benchmark: benchmark.origin().to_string(),
        profile: profile.origin().to_string(),
        count,
        limit: config.limit,
        dimensions: summaries,
        diagnostics,
        speed_averages,
        request_time,
        verdict,
    })
}
