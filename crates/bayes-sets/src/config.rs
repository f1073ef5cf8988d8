//! Runtime configuration, resolvable via explicit construction or
//! `BAYES_SETS_*` environment variables.

use crate::error::ConfigError;
use crate::explain::AttributionMode;
use std::path::PathBuf;

/// Tunables that affect index construction and query behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Beta-prior smoothing constant `c` shared by every feature's
    /// `alpha_j + beta_j = c`. Defaults to 2.0, the value used in the
    /// original Bayesian Sets paper.
    pub smoothing_c: f64,
    /// `top_k` used when a caller does not specify one explicitly.
    pub default_top_k: usize,
    /// Attribution mode an explanation uses when a caller does not
    /// specify one explicitly.
    pub attribution_mode: AttributionMode,
    /// Upper bound on the number of per-feature terms an explanation
    /// returns, regardless of how many features a candidate has.
    pub max_explain_terms: usize,
    /// Whether `ComputedIndex::load` may read/write the optional `.bsc`
    /// binary cache bundle alongside the canonical text files.
    pub enable_cache: bool,
    /// Directory holding the four-file on-disk index, used by the
    /// load-from-env convenience path. No default: unset unless
    /// `BAYES_SETS_INDEX_DIR` is present.
    pub index_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            smoothing_c: 2.0,
            default_top_k: 10,
            attribution_mode: AttributionMode::PresentOnly,
            max_explain_terms: 20,
            enable_cache: true,
            index_dir: None,
        }
    }
}

impl Config {
    /// Build a [`Config`] from `BAYES_SETS_*` environment variables,
    /// falling back to [`Config::default`] for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("BAYES_SETS_SMOOTHING_C") {
            config.smoothing_c = parse_env("BAYES_SETS_SMOOTHING_C", &raw)?;
        }
        if let Ok(raw) = std::env::var("BAYES_SETS_TOP_K_DEFAULT") {
            config.default_top_k = parse_env("BAYES_SETS_TOP_K_DEFAULT", &raw)?;
        }
        if let Ok(raw) = std::env::var("BAYES_SETS_ATTRIBUTION_MODE") {
            config.attribution_mode = match raw.as_str() {
                "present_only" => AttributionMode::PresentOnly,
                "include_absent" => AttributionMode::IncludeAbsent,
                _ => {
                    return Err(ConfigError::InvalidEnvValue {
                        var: "BAYES_SETS_ATTRIBUTION_MODE".to_string(),
                        value: raw,
                    })
                }
            };
        }
        if let Ok(raw) = std::env::var("BAYES_SETS_MAX_EXPLAIN_TERMS") {
            config.max_explain_terms = parse_env("BAYES_SETS_MAX_EXPLAIN_TERMS", &raw)?;
        }
        if let Ok(raw) = std::env::var("BAYES_SETS_ENABLE_CACHE") {
            config.enable_cache = match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::InvalidEnvValue {
                        var: "BAYES_SETS_ENABLE_CACHE".to_string(),
                        value: raw,
                    })
                }
            };
        }
        if let Ok(raw) = std::env::var("BAYES_SETS_INDEX_DIR") {
            config.index_dir = Some(PathBuf::from(raw));
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that every field holds a value the rest of the crate can act
    /// on without further guards.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.smoothing_c > 0.0) {
            return Err(ConfigError::InvalidSmoothingC(self.smoothing_c));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(var: &str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidEnvValue {
        var: var.to_string(),
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_smoothing_c() {
        let mut config = Config::default();
        config.smoothing_c = 0.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidSmoothingC(0.0))
        );

        config.smoothing_c = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn parse_env_reports_the_offending_variable() {
        let err = parse_env::<f64>("BAYES_SETS_SMOOTHING_C", "not-a-number").unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidEnvValue {
                var: "BAYES_SETS_SMOOTHING_C".to_string(),
                value: "not-a-number".to_string(),
            }
        );
    }
}
