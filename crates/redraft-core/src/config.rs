//! Engine configuration
//!
//! Every threshold the orchestrator uses lives here. Defaults match the
//! production tuning; `from_toml_str` accepts partial files and fills the
//! rest from [`Default`].

use crate::error::ConfigError;
use crate::types::SuggestionType;
use chrono::Duration;
use redraft_text::WindowConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Full vs differential decision thresholds
    pub decision: DecisionConfig,
    /// Context window sizing
    pub window: WindowConfig,
    /// Analysis cache limits
    pub cache: CacheConfig,
    /// Change ledger retention
    pub ledger: LedgerConfig,
    /// Repeat-flagging limits
    pub iteration: IterationPolicy,
    /// Per-document session registry
    pub session: SessionConfig,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML, filling missing keys with defaults
    ///
    /// # Errors
    /// Returns `ConfigError` if the TOML is malformed or a value is out of range
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` naming the first bad key
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ratio = self.decision.full_analysis_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "decision.full_analysis_ratio must be in (0, 1], got {ratio}"
            )));
        }
        if self.decision.max_consecutive_differential == 0 {
            return Err(invalid("decision.max_consecutive_differential must be > 0"));
        }
        if self.cache.ttl_secs == 0 {
            return Err(invalid("cache.ttl_secs must be > 0"));
        }
        if self.cache.max_entries_per_user == 0 {
            return Err(invalid("cache.max_entries_per_user must be > 0"));
        }
        if self.cache.eviction_batch == 0 {
            return Err(invalid("cache.eviction_batch must be > 0"));
        }
        if self.window.medium_document_paragraphs > self.window.large_document_paragraphs {
            return Err(invalid(
                "window.medium_document_paragraphs must not exceed large_document_paragraphs",
            ));
        }
        if self.iteration.focus_max_iterations == 0 || self.iteration.other_max_iterations == 0 {
            return Err(invalid("iteration limits must be > 0"));
        }
        if self.session.max_sessions == 0 {
            return Err(invalid("session.max_sessions must be > 0"));
        }
        Ok(())
    }

    /// With decision thresholds
    #[inline]
    #[must_use]
    pub fn with_decision(mut self, decision: DecisionConfig) -> Self {
        self.decision = decision;
        self
    }

    /// With window sizing
    #[inline]
    #[must_use]
    pub fn with_window(mut self, window: WindowConfig) -> Self {
        self.window = window;
        self
    }

    /// With cache limits
    #[inline]
    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// With iteration policy
    #[inline]
    #[must_use]
    pub fn with_iteration(mut self, iteration: IterationPolicy) -> Self {
        self.iteration = iteration;
        self
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}

/// Full vs differential thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Differential runs allowed before a full run is forced
    pub max_consecutive_differential: u32,
    /// Changed/total paragraph ratio above which a full run is used
    pub full_analysis_ratio: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            max_consecutive_differential: 10,
            full_analysis_ratio: 0.6,
        }
    }
}

/// Analysis cache limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry lifetime
    pub ttl_secs: u64,
    /// Entries kept per user before eviction
    pub max_entries_per_user: usize,
    /// Upper bound on deletions per eviction round
    pub eviction_batch: usize,
}

impl CacheConfig {
    /// Entry lifetime as a duration
    #[must_use]
    pub fn ttl(&self) -> Duration {
        seconds(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 24 * 60 * 60,
            max_entries_per_user: 1000,
            eviction_batch: 50,
        }
    }
}

/// Change ledger retention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Records older than this are deleted by cleanup
    pub retention_days: u32,
}

impl LedgerConfig {
    /// Retention as a duration
    #[must_use]
    pub fn retention(&self) -> Duration {
        Duration::days(i64::from(self.retention_days))
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self { retention_days: 7 }
    }
}

/// Repeat-flagging limits for modified areas
///
/// Clarity and engagement are the "focus" types: rewrites of the same
/// sentence tend to invite another rewrite, so they get the tighter limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IterationPolicy {
    /// Iterations before clarity/engagement are suppressed
    pub focus_max_iterations: u32,
    /// Iterations before other types are suppressed
    pub other_max_iterations: u32,
    /// Cooldown for clarity/engagement
    pub focus_cooldown_secs: u64,
    /// Cooldown for other types
    pub other_cooldown_secs: u64,
    /// Areas untouched this long get their iteration count reset
    pub area_retention_days: u32,
}

impl IterationPolicy {
    /// `(max_iterations, cooldown)` for a suggestion type
    #[must_use]
    pub fn limits_for(&self, kind: SuggestionType) -> (u32, Duration) {
        if kind.is_focus() {
            (self.focus_max_iterations, seconds(self.focus_cooldown_secs))
        } else {
            (self.other_max_iterations, seconds(self.other_cooldown_secs))
        }
    }

    /// Retention as a duration
    #[must_use]
    pub fn area_retention(&self) -> Duration {
        Duration::days(i64::from(self.area_retention_days))
    }
}

impl Default for IterationPolicy {
    fn default() -> Self {
        Self {
            focus_max_iterations: 1,
            other_max_iterations: 2,
            focus_cooldown_secs: 3 * 60,
            other_cooldown_secs: 30,
            area_retention_days: 30,
        }
    }
}

/// Per-document session registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sessions idle this long are dropped
    pub idle_secs: u64,
    /// Upper bound on live sessions
    pub max_sessions: u64,
}

impl SessionConfig {
    /// Idle timeout
    #[must_use]
    pub fn idle(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.idle_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_secs: 60 * 60,
            max_sessions: 10_000,
        }
    }
}

fn seconds(secs: u64) -> Duration {
    Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX / 1000))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.decision.max_consecutive_differential, 10);
        assert_eq!(config.cache.ttl(), Duration::hours(24));
        assert_eq!(config.ledger.retention(), Duration::days(7));
        assert_eq!(config.window.base_radius, 3);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r"
            [decision]
            full_analysis_ratio = 0.5

            [cache]
            max_entries_per_user = 10
            ",
        )
        .unwrap();
        assert!((config.decision.full_analysis_ratio - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.decision.max_consecutive_differential, 10);
        assert_eq!(config.cache.max_entries_per_user, 10);
        assert_eq!(config.cache.eviction_batch, 50);
    }

    #[test]
    fn out_of_range_ratio_is_rejected() {
        let err = EngineConfig::from_toml_str("[decision]\nfull_analysis_ratio = 1.5").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = EngineConfig::from_toml_str("[decision\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_batch_is_rejected() {
        let config = EngineConfig::new().with_cache(CacheConfig {
            eviction_batch: 0,
            ..CacheConfig::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn focus_types_get_tighter_limits() {
        let policy = IterationPolicy::default();
        assert_eq!(
            policy.limits_for(SuggestionType::Clarity),
            (1, Duration::minutes(3))
        );
        assert_eq!(
            policy.limits_for(SuggestionType::Grammar),
            (2, Duration::seconds(30))
        );
    }
}
