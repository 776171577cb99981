// Comparison verdict and structured report
//
// The report is the only output of a comparison run. The binary renders it
// either as text lines or as JSON; exit status follows `passed()`.

use crate::extract::SpeedKind;
use crate::regression::aggregate::DimensionSummary;
use crate::regression::dimension::Dimension;
use serde::Serialize;

/// Overall outcome of a comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verdict {
    /// Every enabled dimension reached the limit
    Pass,
    /// At least one enabled dimension fell below the limit
    Fail { failed_dimensions: Vec<Dimension> },
}

impl Verdict {
    pub fn from_summaries(summaries: &[DimensionSummary]) -> Self {
        let failed_dimensions: Vec<Dimension> = summaries
            .iter()
            .filter(|s| !s.passed)
            .map(|s| s.dimension)
            .collect();
        if failed_dimensions.is_empty() {
            Verdict::Pass
        } else {
            Verdict::Fail { failed_dimensions }
        }
    }
}

/// A value measured on both snapshots
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SnapshotPair<T> {
    pub benchmark: T,
    pub profile: T,
}

/// Mean speeds (m/s) over a snapshot's samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SpeedAverages {
    pub walk: f64,
    pub bicycle: f64,
}

/// Server request time summed over all compared test cases
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RequestTimeSummary {
    pub benchmark_total: f64,
    pub profile_total: f64,
    /// `benchmark_total - profile_total`
    pub difference: f64,
    /// Difference relative to the profile total, absent when that is 0
    pub percent_difference: Option<f64>,
}

impl RequestTimeSummary {
    pub fn new(benchmark_total: f64, profile_total: f64) -> Self {
        let difference = benchmark_total - profile_total;
        let percent_difference =
            (profile_total != 0.0).then(|| difference / profile_total * 100.0);
        Self {
            benchmark_total,
            profile_total,
            difference,
            percent_difference,
        }
    }
}

/// Structured result of comparing a benchmark snapshot with a profile snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    /// Origin of snapshot A
    pub benchmark: String,
    /// Origin of snapshot B
    pub profile: String,
    /// Number of comparable test cases
    pub count: usize,
    pub limit: u32,
    /// Enabled dimensions in report order, duration first
    pub dimensions: Vec<DimensionSummary>,
    /// One line per regressed test case and dimension
    pub diagnostics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_averages: Option<SnapshotPair<SpeedAverages>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_time: Option<RequestTimeSummary>,
    pub verdict: Verdict,
}

fn regression_phrase(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Duration => "are slower",
        Dimension::Itineraries => "have less itineraries",
        Dimension::Modes => "have less modes",
        Dimension::Legs => "have more legs",
        Dimension::Trips => "have more trips",
        Dimension::Speed => "have slower speeds",
        Dimension::TotalTime => "have longer total request time",
        Dimension::AverageTime => "have longer average request time",
        Dimension::Timeouts => "have more timeouts",
    }
}

impl ComparisonReport {
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }

    pub fn dimension(&self, dimension: Dimension) -> Option<&DimensionSummary> {
        self.dimensions.iter().find(|s| s.dimension == dimension)
    }

    /// Generate human-readable report
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();
        let (a, b) = (&self.benchmark, &self.profile);

        for summary in &self.dimensions {
            report.push_str(&format!(
                "Detecting regressions with a {} threshold of {} and test threshold {}\n",
                summary.dimension.label(),
                summary.threshold,
                self.limit
            ));
        }

        for line in &self.diagnostics {
            report.push_str(line);
            report.push('\n');
        }

        report.push_str(&format!("Test count: {}\n", self.count));

        for summary in &self.dimensions {
            let counters = &summary.counters;
            if summary.dimension == Dimension::Duration {
                report.push_str(&format!(
                    "Routings that failed only in {}: {}\n",
                    a, counters.failures.a
                ));
                report.push_str(&format!(
                    "Routings that failed only in {}: {}\n",
                    b, counters.failures.b
                ));
            }

            let phrase = regression_phrase(summary.dimension);
            report.push_str(&format!(
                "Routes that {} in {}: {}\n",
                phrase, a, counters.regressions.a
            ));
            report.push_str(&format!(
                "Routes that {} in {}: {}\n",
                phrase, b, counters.regressions.b
            ));

            if summary.dimension == Dimension::Speed {
                for kind in [SpeedKind::Walk, SpeedKind::Bicycle] {
                    let sides = counters
                        .by_speed_kind
                        .get(&kind)
                        .copied()
                        .unwrap_or_default();
                    report.push_str(&format!(
                        "Routes that have slower {} speed in {}: {}\n",
                        kind.label(),
                        a,
                        sides.a
                    ));
                    report.push_str(&format!(
                        "Routes that have slower {} speed in {}: {}\n",
                        kind.label(),
                        b,
                        sides.b
                    ));
                }
            }

            if summary.dimension == Dimension::Duration {
                report.push_str(&format!(
                    "Route duration regressions: {}\n",
                    counters.total_b()
                ));
                report.push_str(&format!(
                    "Route duration comparison rate: {}\n",
                    summary.rate
                ));
            } else {
                report.push_str(&format!("{} rate: {}\n", summary.name, summary.rate));
            }

            if !summary.passed {
                report.push_str(&format!(
                    "{} test failed, {} < {}\n",
                    summary.name, summary.rate, self.limit
                ));
            }
        }

        if let Some(speeds) = &self.speed_averages {
            for (origin, averages) in [(a, speeds.benchmark), (b, speeds.profile)] {
                report.push_str(&format!(
                    "Average walk speed in {}: {:.6} m/s\n",
                    origin, averages.walk
                ));
                report.push_str(&format!(
                    "Average cycling speed in {}: {:.6} m/s\n",
                    origin, averages.bicycle
                ));
            }
        }

        if let Some(times) = &self.request_time {
            report.push_str(&format!(
                "Total request time of all requests summed in {}: {}\n",
                a, times.benchmark_total
            ));
            report.push_str(&format!(
                "Total request time of all requests summed in {}: {}\n",
                b, times.profile_total
            ));
            report.push_str(&format!(
                "Difference in total request time of all requests summed: {}\n",
                times.difference
            ));
            if let Some(percent) = times.percent_difference {
                report.push_str(&format!(
                    "Percentage difference in total request time of all requests summed: {:.6}\n",
                    percent
                ));
            }
        }

        match &self.verdict {
            Verdict::Pass => report.push_str("Test passed\n"),
            Verdict::Fail { failed_dimensions } => {
                let names: Vec<&str> = failed_dimensions.iter().map(|d| d.name()).collect();
                report.push_str(&format!("Test failed: {}\n", names.join(", ")));
            }
        }

        report
    }
}
