//! Error taxonomy for benchmark snapshot comparison

use crate::dataset::TestCaseId;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a comparison run
///
/// There is no partial-result mode: every variant ends the run. Missing
/// values in optional dimensions are skip conditions, not errors.
#[derive(Error, Debug)]
pub enum CompareError {
    /// Input JSON is missing a required field or is structurally inconsistent
    #[error("Malformed input in {origin}: {reason}")]
    MalformedInput { origin: String, reason: String },

    /// A test case exists in one snapshot but not in the other
    #[error("Test data is not comparable: test case {id} is missing from {missing_from}")]
    MissingTestCase {
        id: TestCaseId,
        missing_from: String,
    },

    /// Neither snapshot contains any test case, so no rate can be computed
    #[error("Test data is not comparable: no test cases to compare")]
    NoTestCases,

    #[error("Invalid comparison config: {0}")]
    InvalidConfig(String),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompareError {
    pub(crate) fn malformed(origin: &str, reason: impl Into<String>) -> Self {
        CompareError::MalformedInput {
            origin: origin.to_string(),
            reason: reason.into(),
        }
    }
}
