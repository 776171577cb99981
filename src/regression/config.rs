// Configuration for snapshot comparison
//
// One threshold per dimension, an enabled flag per optional dimension and a
// shared pass-rate limit. Route duration is always compared.

use crate::error::CompareError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Thresholds, limit and enabled dimensions for one comparison run
///
/// Differences smaller than a dimension's threshold are treated as noise.
///
/// # Example
/// ```
/// use routegate::regression::CompareConfig;
///
/// let config = CompareConfig::default();
/// assert_eq!(config.duration_threshold, 60.0);
/// assert_eq!(config.limit, 95);
/// assert!(!config.speeds);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Minimum pass rate (0-100) every enabled dimension must reach
    pub limit: u32,

    /// Route duration changes below this many seconds are ignored
    pub duration_threshold: f64,

    /// Compare the number of itineraries
    pub itineraries: bool,
    pub itinerary_threshold: f64,

    /// Compare transport mode diversity across itineraries
    pub modes: bool,
    pub mode_threshold: f64,

    /// Compare the leg count of the first itinerary
    pub legs: bool,
    pub leg_threshold: f64,

    /// Compare the trip count of the first itinerary
    pub trips: bool,
    pub trip_threshold: f64,

    /// Compare walk and bicycle speeds (m/s)
    pub speeds: bool,
    pub speed_threshold: f64,

    /// Compare server request handling (total time, average time, timeouts)
    pub performance: bool,
    /// Total request time changes (ms) below this are ignored
    pub total_time_threshold: f64,
    /// Average request time changes (ms) below this are ignored
    pub average_time_threshold: f64,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            limit: 95,
            duration_threshold: 60.0,
            itineraries: false,
            itinerary_threshold: 1.0,
            modes: false,
            mode_threshold: 1.0,
            legs: false,
            leg_threshold: 1.0,
            trips: false,
            trip_threshold: 1.0,
            speeds: false,
            speed_threshold: 0.2,
            performance: false,
            total_time_threshold: 200.0,
            average_time_threshold: 40.0,
        }
    }
}

impl CompareConfig {
    /// Default thresholds with every optional dimension enabled
    pub fn all_dimensions() -> Self {
        Self {
            itineraries: true,
            modes: true,
            legs: true,
            trips: true,
            speeds: true,
            performance: true,
            ..Self::default()
        }
    }

    /// Parse a TOML config; missing keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self, CompareError> {
        toml::from_str(text).map_err(|e| CompareError::InvalidConfig(e.to_string()))
    }

    /// Load a TOML config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CompareError> {
        let path_ref = path.as_ref();
        let text = fs::read_to_string(path_ref).map_err(|source| CompareError::Io {
            path: path_ref.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), CompareError> {
        if self.limit > 100 {
            return Err(CompareError::InvalidConfig(format!(
                "limit must be in [0, 100], got {}",
                self.limit
            )));
        }

        let thresholds = [
            ("duration_threshold", self.duration_threshold),
            ("itinerary_threshold", self.itinerary_threshold),
            ("mode_threshold", self.mode_threshold),
            ("leg_threshold", self.leg_threshold),
            ("trip_threshold", self.trip_threshold),
            ("speed_threshold", self.speed_threshold),
            ("total_time_threshold", self.total_time_threshold),
            ("average_time_threshold", self.average_time_threshold),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() || value < 0.0 {
                return Err(CompareError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = CompareConfig::default();
        assert_eq!(config.limit, 95);
        assert_eq!(config.duration_threshold, 60.0);
        assert_eq!(config.itinerary_threshold, 1.0);
        assert_eq!(config.speed_threshold, 0.2);
        assert_eq!(config.total_time_threshold, 200.0);
        assert_eq!(config.average_time_threshold, 40.0);
        assert!(!config.itineraries && !config.performance);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_all_dimensions_config() {
        let config = CompareConfig::all_dimensions();
        assert!(config.itineraries && config.modes && config.legs);
        assert!(config.trips && config.speeds && config.performance);
        assert_eq!(config.limit, 95);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_limit() {
        let mut config = CompareConfig::default();
        config.limit = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_threshold() {
        let mut config = CompareConfig::default();
        config.speed_threshold = -0.1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("speed_threshold"));

        config.speed_threshold = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = CompareConfig::from_toml_str("limit = 80\nspeeds = true\n").unwrap();
        assert_eq!(config.limit, 80);
        assert!(config.speeds);
        assert_eq!(config.speed_threshold, 0.2);
        assert_eq!(config.duration_threshold, 60.0);
    }

    #[test]
    fn test_invalid_toml() {
        let err = CompareConfig::from_toml_str("limit = \"lots\"").unwrap_err();
        assert!(matches!(err, CompareError::InvalidConfig(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "duration_threshold = 30.0").unwrap();
        writeln!(file, "performance = true").unwrap();
        file.flush().unwrap();

        let config = CompareConfig::from_file(file.path()).unwrap();
        assert_eq!(config.duration_threshold, 30.0);
        assert!(config.performance);
    }
}
