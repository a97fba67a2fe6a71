//! Tunable parameters of a favoritism test.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, QueryError};

/// Default simulated trials per test.
pub const DEFAULT_NUM_TRIALS: usize = 100_000;
/// Default percentile of the null distribution used as the threshold.
pub const DEFAULT_CONFIDENCE_PERCENTILE: f64 = 95.0;

/// Parameters shared by favoritism, collusion and matrix runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    /// Simulated trials per test. 100 000 keeps the threshold stable to
    /// roughly one percentage point.
    pub num_trials: usize,
    /// Percentile of the null distribution (0–100) the observed mean must
    /// exceed.
    pub confidence_percentile: f64,
    /// Base seed. `None` draws a fresh seed per run.
    pub seed: Option<u64>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            num_trials: DEFAULT_NUM_TRIALS,
            confidence_percentile: DEFAULT_CONFIDENCE_PERCENTILE,
            seed: None,
        }
    }
}

impl TestConfig {
    pub fn with_trials(mut self, num_trials: usize) -> Self {
        self.num_trials = num_trials;
        self
    }

    pub fn with_percentile(mut self, confidence_percentile: f64) -> Self {
        self.confidence_percentile = confidence_percentile;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        if self.num_trials == 0 {
            return Err(QueryError::ZeroTrials);
        }
        if !(0.0..=100.0).contains(&self.confidence_percentile) {
            return Err(QueryError::PercentileOutOfRange(
                self.confidence_percentile,
            ));
        }
        Ok(())
    }

    /// Load and validate a JSON config. Missing fields take their defaults.
    pub fn load_from_path(path: &Path) -> Result<Self, Error> {
        let config_err = |message: String| Error::Config {
            path: path.display().to_string(),
            message,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| config_err(e.to_string()))?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| config_err(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let c = TestConfig::default();
        assert_eq!(c.num_trials, 100_000);
        assert_eq!(c.confidence_percentile, 95.0);
        assert!(c.seed.is_none());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert_eq!(
            TestConfig::default().with_trials(0).validate(),
            Err(QueryError::ZeroTrials)
        );
        assert!(matches!(
            TestConfig::default().with_percentile(120.0).validate(),
            Err(QueryError::PercentileOutOfRange(_))
        ));
        assert!(
            TestConfig::default()
                .with_percentile(f64::NAN)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_load_partial_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"num_trials": 2000, "seed": 17}}"#).unwrap();
        let c = TestConfig::load_from_path(file.path()).unwrap();
        assert_eq!(c.num_trials, 2000);
        assert_eq!(c.seed, Some(17));
        assert_eq!(c.confidence_percentile, 95.0);
    }

    #[test]
    fn test_load_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            TestConfig::load_from_path(file.path()),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"confidence_percentile": -5}}"#).unwrap();
        assert!(matches!(
            TestConfig::load_from_path(file.path()),
            Err(Error::Query(QueryError::PercentileOutOfRange(_)))
        ));
    }
}
