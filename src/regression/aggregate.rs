// Folding per-test-case classifications into per-dimension pass rates
//
// The rate is `floor(100 * (count + regressions_a - regressions_b) / count)`.
// It adds the benchmark's regressions and subtracts the profile's, so it can
// exceed 100 when the profile improved and go negative when it got much
// worse. Consumers compare it against an integer limit; keep the formula
// exactly as is, including the floor.

use crate::extract::SpeedKind;
use crate::regression::classify::{Classification, Delta};
use crate::regression::dimension::{Dimension, DimensionSpec};
use serde::Serialize;
use std::collections::BTreeMap;

/// Regressions attributed to each snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SideCounts {
    /// Benchmark snapshot
    pub a: usize,
    /// Profile snapshot
    pub b: usize,
}

impl SideCounts {
    fn bump(&mut self, classification: Classification) {
        match classification {
            Classification::RegressedInA => self.a += 1,
            Classification::RegressedInB => self.b += 1,
            Classification::Equal => {}
        }
    }
}

/// Counters of one dimension
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DimensionCounters {
    /// Test cases with comparable values in both snapshots
    pub compared: usize,
    /// Test cases whose values differed at all, including below the threshold
    pub changed: usize,
    /// Threshold regressions
    pub regressions: SideCounts,
    /// Routing succeeded in one snapshot and failed in the other (duration only)
    pub failures: SideCounts,
    /// Regressions split by speed sample kind (speed only)
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub by_speed_kind: BTreeMap<SpeedKind, SideCounts>,
}

impl DimensionCounters {
    pub fn record(&mut self, delta: &Delta) {
        self.compared += 1;
        if delta.changed {
            self.changed += 1;
        }
        if !delta.is_regression() {
            return;
        }
        if delta.routing_failure {
            self.failures.bump(delta.classification);
        } else {
            self.regressions.bump(delta.classification);
        }
        if let Some(kind) = delta.speed_kind {
            self.by_speed_kind
                .entry(kind)
                .or_default()
                .bump(delta.classification);
        }
    }

    /// All regressions attributed to the benchmark snapshot
    pub fn total_a(&self) -> usize {
        self.regressions.a + self.failures.a
    }

    /// All regressions attributed to the profile snapshot
    pub fn total_b(&self) -> usize {
        self.regressions.b + self.failures.b
    }
}

/// Pass rate of one dimension; `count` must be non-zero
///
/// # Example
/// ```
/// use routegate::regression::pass_rate;
///
/// assert_eq!(pass_rate(10, 1, 0), 110);
/// assert_eq!(pass_rate(10, 0, 3), 70);
/// ```
pub fn pass_rate(count: usize, regressions_a: usize, regressions_b: usize) -> i64 {
    debug_assert!(count > 0, "pass rate needs at least one test case");
    let count = count as i64;
    let score = 100 * (count + regressions_a as i64 - regressions_b as i64);
    score.div_euclid(count)
}

/// Final result of one dimension
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionSummary {
    pub dimension: Dimension,
    pub name: String,
    pub threshold: f64,
    pub counters: DimensionCounters,
    pub rate: i64,
    pub passed: bool,
}

/// Single-pass accumulator over all test cases and enabled dimensions
#[derive(Debug, Clone)]
pub struct Aggregator {
    count: usize,
    limit: u32,
    specs: Vec<DimensionSpec>,
    counters: BTreeMap<Dimension, DimensionCounters>,
}

impl Aggregator {
    /// `count` is the number of comparable test cases, fixed by the
    /// duration dimension before folding starts
    pub fn new(count: usize, limit: u32, specs: &[DimensionSpec]) -> Self {
        Self {
            count,
            limit,
            specs: specs.to_vec(),
            counters: specs
                .iter()
                .map(|s| (s.dimension, DimensionCounters::default()))
                .collect(),
        }
    }

    pub fn record(&mut self, dimension: Dimension, delta: &Delta) {
        self.counters.entry(dimension).or_default().record(delta);
    }

    pub fn counters(&self, dimension: Dimension) -> Option<&DimensionCounters> {
        self.counters.get(&dimension)
    }

    /// Compute rates and pass flags, in report order
    pub fn finish(mut self) -> Vec<DimensionSummary> {
        self.specs
            .iter()
            .map(|spec| {
                let counters = self.counters.remove(&spec.dimension).unwrap_or_default();
                let rate = pass_rate(self.count, counters.total_a(), counters.total_b());
                let passed = rate >= i64::from(self.limit);
                if !passed {
                    tracing::warn!(
                        "{} test failed, {} < {}",
                        spec.dimension.name(),
                        rate,
                        self.limit
                    );
                }
                DimensionSummary {
                    dimension: spec.dimension,
                    name: spec.dimension.name().to_string(),
                    threshold: spec.policy.threshold,
                    counters,
                    rate,
                    passed,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regression::classify::Policy;

    fn delta(classification: Classification, routing_failure: bool) -> Delta {
        Delta {
            classification,
            routing_failure,
            changed: classification != Classification::Equal,
            speed_kind: None,
            diagnostic: None,
        }
    }

    fn duration_spec() -> DimensionSpec {
        DimensionSpec {
            dimension: Dimension::Duration,
            policy: Policy::duration(60.0),
        }
    }

    #[test]
    fn test_pass_rate_formula() {
        assert_eq!(pass_rate(10, 1, 0), 110);
        assert_eq!(pass_rate(10, 0, 3), 70);
        assert_eq!(pass_rate(1, 0, 1), 0);
        assert_eq!(pass_rate(4, 0, 0), 100);
    }

    #[test]
    fn test_pass_rate_floors() {
        // 100 * 2 / 3 = 66.67
        assert_eq!(pass_rate(3, 0, 1), 66);
        // 100 * -1 / 3 = -33.33, floored
        assert_eq!(pass_rate(3, 0, 4), -34);
    }

    #[test]
    fn test_equal_delta_counts_nothing() {
        let mut counters = DimensionCounters::default();
        counters.record(&delta(Classification::Equal, false));
        let mut below_threshold = delta(Classification::Equal, false);
        below_threshold.changed = true;
        counters.record(&below_threshold);
        assert_eq!(counters.compared, 2);
        assert_eq!(counters.changed, 1);
        assert_eq!(counters.total_a(), 0);
        assert_eq!(counters.total_b(), 0);
    }

    #[test]
    fn test_failures_tracked_apart_from_regressions() {
        let mut counters = DimensionCounters::default();
        counters.record(&delta(Classification::RegressedInA, true));
        counters.record(&delta(Classification::RegressedInB, false));
        counters.record(&delta(Classification::RegressedInB, false));

        assert_eq!(counters.failures, SideCounts { a: 1, b: 0 });
        assert_eq!(counters.regressions, SideCounts { a: 0, b: 2 });
        assert_eq!(counters.total_a(), 1);
        assert_eq!(counters.total_b(), 2);
    }

    #[test]
    fn test_speed_kind_breakdown() {
        let mut counters = DimensionCounters::default();
        let mut walk = delta(Classification::RegressedInB, false);
        walk.speed_kind = Some(SpeedKind::Walk);
        let mut bike = delta(Classification::RegressedInA, false);
        bike.speed_kind = Some(SpeedKind::Bicycle);
        counters.record(&walk);
        counters.record(&bike);

        assert_eq!(counters.by_speed_kind[&SpeedKind::Walk], SideCounts { a: 0, b: 1 });
        assert_eq!(counters.by_speed_kind[&SpeedKind::Bicycle], SideCounts { a: 1, b: 0 });
        assert_eq!(counters.regressions, SideCounts { a: 1, b: 1 });
    }

    #[test]
    fn test_aggregator_finish() {
        let mut aggregator = Aggregator::new(10, 95, &[duration_spec()]);
        aggregator.record(Dimension::Duration, &delta(Classification::RegressedInB, false));
        assert_eq!(aggregator.counters(Dimension::Duration).unwrap().total_b(), 1);

        let summaries = aggregator.finish();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].rate, 90);
        assert!(!summaries[0].passed);
        assert_eq!(summaries[0].name, "Route duration");
        assert_eq!(summaries[0].threshold, 60.0);
    }

    #[test]
    fn test_rate_at_limit_passes() {
        let aggregator = Aggregator::new(20, 100, &[duration_spec()]);
        let summaries = aggregator.finish();
        assert_eq!(summaries[0].rate, 100);
        assert!(summaries[0].passed);
    }
}
