// Per-test-case delta classification
//
// Compares one dimension's value for one test case between the benchmark
// snapshot (A) and the profile snapshot (B). A difference only counts once
// it reaches the dimension's threshold, in the direction that dimension
// considers worse.

use crate::dataset::TestCaseId;
use crate::extract::{MetricValue, SpeedKind};
use serde::Serialize;

/// Which way a dimension gets worse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Larger values are regressions (durations, leg counts, server time)
    HigherIsWorse,
    /// Smaller values are regressions (itinerary count, mode count, speed)
    LowerIsWorse,
    /// Boolean flag; switching it on is a regression, thresholds ignored
    Transition,
}

/// Comparison policy of one dimension
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Policy {
    pub direction: Direction,
    pub threshold: f64,
    /// Negative values mark failed routing; a failure on one side only is a
    /// regression for that side regardless of threshold
    pub failure_sentinel: bool,
}

impl Policy {
    pub fn higher_is_worse(threshold: f64) -> Self {
        Self {
            direction: Direction::HigherIsWorse,
            threshold,
            failure_sentinel: false,
        }
    }

    pub fn lower_is_worse(threshold: f64) -> Self {
        Self {
            direction: Direction::LowerIsWorse,
            threshold,
            failure_sentinel: false,
        }
    }

    pub fn transition() -> Self {
        Self {
            direction: Direction::Transition,
            threshold: 0.0,
            failure_sentinel: false,
        }
    }

    /// Route duration: higher is worse, with the failed-routing sign rule
    pub fn duration(threshold: f64) -> Self {
        Self {
            failure_sentinel: true,
            ..Self::higher_is_worse(threshold)
        }
    }
}

/// Three-way outcome for one test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Equal,
    /// The benchmark snapshot is worse
    RegressedInA,
    /// The profile snapshot is worse
    RegressedInB,
}

/// Classified difference for one dimension and one test case
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delta {
    pub classification: Classification,
    /// Set when the regressed side failed to route at all
    pub routing_failure: bool,
    /// The values differed, whether or not past the threshold
    pub changed: bool,
    pub speed_kind: Option<SpeedKind>,
    /// Human-readable description, absent for `Equal`
    pub diagnostic: Option<String>,
}

impl Delta {
    fn equal(speed_kind: Option<SpeedKind>, changed: bool) -> Self {
        Self {
            classification: Classification::Equal,
            routing_failure: false,
            changed,
            speed_kind,
            diagnostic: None,
        }
    }

    pub fn is_regression(&self) -> bool {
        self.classification != Classification::Equal
    }
}

fn threshold_classification(a: f64, b: f64, policy: &Policy) -> Classification {
    let (worse_a, worse_b) = match policy.direction {
        Direction::HigherIsWorse => (a >= b + policy.threshold, b >= a + policy.threshold),
        Direction::LowerIsWorse => (b >= a + policy.threshold, a >= b + policy.threshold),
        Direction::Transition => (a != 0.0, b != 0.0),
    };
    if worse_a {
        Classification::RegressedInA
    } else if worse_b {
        Classification::RegressedInB
    } else {
        Classification::Equal
    }
}

fn diagnostic(label: &str, id: &TestCaseId, a: MetricValue, b: MetricValue) -> String {
    match (a, b) {
        (MetricValue::Flag(_), MetricValue::Flag(_)) => {
            format!("Test {} {} t1={} t2={}", label, id, a, b)
        }
        (MetricValue::Speed { kind, value: va }, MetricValue::Speed { value: vb, .. }) => format!(
            "Test {} {} {} t1={} t2={} diff={:.6}",
            kind.label(),
            label,
            id,
            a,
            b,
            vb - va
        ),
        _ => format!(
            "Test {} {} t1={} t2={} diff={}",
            label,
            id,
            a,
            b,
            b.as_f64() - a.as_f64()
        ),
    }
}

/// Classify one test case's values `a` (benchmark) and `b` (profile)
///
/// Returns `None` when the two values are not comparable (e.g. a walk speed
/// sample against a bicycle speed sample); such test cases are skipped for
/// the dimension rather than counted.
pub fn classify(
    label: &str,
    id: &TestCaseId,
    a: MetricValue,
    b: MetricValue,
    policy: &Policy,
) -> Option<Delta> {
    if !a.comparable_with(b) {
        return None;
    }
    let speed_kind = a.speed_kind();
    if a == b {
        return Some(Delta::equal(speed_kind, false));
    }

    let (va, vb) = (a.as_f64(), b.as_f64());
    let (classification, routing_failure) = if policy.failure_sentinel && va < 0.0 && vb > 0.0 {
        (Classification::RegressedInA, true)
    } else if policy.failure_sentinel && va > 0.0 && vb < 0.0 {
        (Classification::RegressedInB, true)
    } else {
        (threshold_classification(va, vb, policy), false)
    };

    if classification == Classification::Equal {
        return Some(Delta::equal(speed_kind, true));
    }
    Some(Delta {
        classification,
        routing_failure,
        changed: true,
        speed_kind,
        diagnostic: Some(diagnostic(label, id, a, b)),
    })
}
