//! Routegate - routing quality regression gate for journey planner benchmarks
//!
//! This library compares two snapshots of routing responses (a benchmark run
//! and a profile run) test case by test case. Each quality dimension (route
//! duration, itinerary and mode counts, legs, trips, speeds, server timings)
//! is classified against a noise threshold and folded into a pass rate that
//! must reach a configured limit.

pub mod cli;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod regression;

pub use dataset::{Dataset, TestCaseId};
pub use error::CompareError;
pub use regression::{compare, CompareConfig, ComparisonReport, Verdict};
