//! Pipeline configuration
//!
//! [`PipelineConfig`] holds every tunable of the edit pipeline, including the
//! named-color table. Loadable from TOML; all fields have defaults.

use bpe_validation::{normalize_hex, RulesError, ValidationRules};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Named-color lookup table (`"red"` → `"#ef4444"`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorTable(BTreeMap<String, String>);

impl ColorTable {
    /// Empty table
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// With a named color (name is stored lower-case)
    #[inline]
    #[must_use]
    pub fn with_color(mut self, name: impl AsRef<str>, hex: impl Into<String>) -> Self {
        self.0.insert(name.as_ref().to_ascii_lowercase(), hex.into());
        self
    }

    /// Hex value for a color name
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Whether `word` names a color
    #[inline]
    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        self.lookup(word).is_some()
    }

    /// Known names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, hex) in &self.0 {
            if normalize_hex(hex).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "color '{name}' is not a hex value: {hex}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for ColorTable {
    fn default() -> Self {
        [
            ("black", "#000000"),
            ("white", "#ffffff"),
            ("gray", "#6b7280"),
            ("grey", "#6b7280"),
            ("red", "#ef4444"),
            ("orange", "#f97316"),
            ("yellow", "#eab308"),
            ("green", "#22c55e"),
            ("teal", "#14b8a6"),
            ("blue", "#3b82f6"),
            ("indigo", "#6366f1"),
            ("purple", "#a855f7"),
            ("pink", "#ec4899"),
        ]
        .into_iter()
        .fold(Self::empty(), |table, (name, hex)| table.with_color(name, hex))
    }
}

/// How snapshots are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotMode {
    /// Independent copy per snapshot
    Full,
    /// Baseline plus field-level deltas
    #[default]
    Delta,
}

/// What a failing step rolls back to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Restore the state before the first step
    #[default]
    AllOrNothing,
    /// Restore the state before the failing step, keeping completed steps
    KeepCompleted,
}

/// Edit pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Percentage applied by relative resize requests
    pub resize_step_percent: f64,
    /// Units moved by a reposition request without a distance
    pub move_step: f64,
    /// Steps below this confidence are treated as ambiguous
    pub min_step_confidence: f64,
    /// Simulations riskier than this are unsafe
    pub max_risk_score: f64,
    /// Thresholds for the simulator's checks
    pub validation: ValidationRules,
    /// Named colors
    pub colors: ColorTable,
    /// Snapshot storage
    pub snapshot_mode: SnapshotMode,
    /// Rollback target on step failure
    pub failure_policy: FailurePolicy,
    /// Result cache capacity used by [`EditPipeline::with_default_cache`](crate::EditPipeline::with_default_cache)
    pub cache_capacity: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            resize_step_percent: 20.0,
            move_step: 16.0,
            min_step_confidence: 0.5,
            max_risk_score: 1.0,
            validation: ValidationRules::default(),
            colors: ColorTable::default(),
            snapshot_mode: SnapshotMode::default(),
            failure_policy: FailurePolicy::default(),
            cache_capacity: 10_000,
        }
    }
}

impl PipelineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With resize percentage
    #[inline]
    #[must_use]
    pub fn with_resize_step(mut self, percent: f64) -> Self {
        self.resize_step_percent = percent;
        self
    }

    /// With default move distance
    #[inline]
    #[must_use]
    pub fn with_move_step(mut self, units: f64) -> Self {
        self.move_step = units;
        self
    }

    /// With minimum step confidence
    #[inline]
    #[must_use]
    pub fn with_min_step_confidence(mut self, confidence: f64) -> Self {
        self.min_step_confidence = confidence;
        self
    }

    /// With maximum acceptable risk
    #[inline]
    #[must_use]
    pub fn with_max_risk(mut self, risk: f64) -> Self {
        self.max_risk_score = risk;
        self
    }

    /// With validation rules
    #[inline]
    #[must_use]
    pub fn with_validation(mut self, rules: ValidationRules) -> Self {
        self.validation = rules;
        self
    }

    /// With color table
    #[inline]
    #[must_use]
    pub fn with_colors(mut self, colors: ColorTable) -> Self {
        self.colors = colors;
        self
    }

    /// With snapshot mode
    #[inline]
    #[must_use]
    pub fn with_snapshot_mode(mut self, mode: SnapshotMode) -> Self {
        self.snapshot_mode = mode;
        self
    }

    /// With failure policy
    #[inline]
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// Returns error on malformed TOML or out-of-range values
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is invalid
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path.as_ref().display(), "pipeline config loaded");
        Ok(config)
    }

    /// Check ranges
    ///
    /// # Errors
    /// Returns the first invalid setting
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.resize_step_percent > 0.0 && self.resize_step_percent < 100.0) {
            return Err(ConfigError::Invalid(format!(
                "resize_step_percent must be within (0, 100), got {}",
                self.resize_step_percent
            )));
        }
        if !(self.move_step.is_finite() && self.move_step > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "move_step must be positive, got {}",
                self.move_step
            )));
        }
        for (name, value) in [
            ("min_step_confidence", self.min_step_confidence),
            ("max_risk_score", self.max_risk_score),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within 0..=1, got {value}"
                )));
            }
        }
        self.validation.validate()?;
        self.colors.validate()
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML did not parse
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Validation thresholds out of range
    #[error("invalid validation rules: {0}")]
    Rules(#[from] RulesError),

    /// Other out-of-range setting
    #[error("invalid config: {0}")]
    Invalid(String),
}
