//! Filter thresholds

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Thresholds for the three quality gates, fixed for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Reject files whose longest line exceeds this many characters
    pub line_max: i64,
    /// Reject files whose mean line length exceeds this
    pub line_mean: f64,
    /// Reject files with a smaller alphanumeric fraction
    pub alpha_frac: f64,
    /// Reject files from repositories with at most this many stars
    pub threshold_stars: i64,
    /// Comment ratio must be strictly above this...
    pub min_threshold_comments: f64,
    /// ...and strictly below this
    pub max_threshold_comments: f64,
    /// Worker threads for the evaluation pass
    pub num_workers: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            line_max: 1000,
            line_mean: 100.0,
            alpha_frac: 0.25,
            threshold_stars: 5,
            min_threshold_comments: 0.01,
            max_threshold_comments: 0.8,
            num_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

impl FilterConfig {
    /// Reject settings that cannot produce a meaningful run
    pub fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(Error::InvalidConfig("num_workers must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.alpha_frac) {
            return Err(Error::InvalidConfig(format!(
                "alpha_frac must be within [0, 1], got {}",
                self.alpha_frac
            )));
        }
        if self.line_mean.is_nan() {
            return Err(Error::InvalidConfig("line_mean must be a number".into()));
        }
        // Also rejects NaN bounds.
        if !(self.min_threshold_comments < self.max_threshold_comments) {
            return Err(Error::InvalidConfig(format!(
                "min_threshold_comments ({}) must be below max_threshold_comments ({})",
                self.min_threshold_comments, self.max_threshold_comments
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = FilterConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.num_workers >= 1);
        assert_eq!(config.line_max, 1000);
        assert_eq!(config.threshold_stars, 5);
    }

    #[test]
    fn test_invalid_settings() {
        let zero_workers = FilterConfig {
            num_workers: 0,
            ..Default::default()
        };
        assert!(matches!(zero_workers.validate(), Err(Error::InvalidConfig(_))));

        let bad_alpha = FilterConfig {
            alpha_frac: 1.5,
            ..Default::default()
        };
        assert!(bad_alpha.validate().is_err());

        let inverted = FilterConfig {
            min_threshold_comments: 0.8,
            max_threshold_comments: 0.01,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let nan = FilterConfig {
            max_threshold_comments: f64::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: FilterConfig =
            serde_json::from_str(r#"{"threshold_stars": 10, "line_max": 500}"#).unwrap();
        assert_eq!(config.threshold_stars, 10);
        assert_eq!(config.line_max, 500);
        assert_eq!(config.alpha_frac, 0.25);
    }
}
