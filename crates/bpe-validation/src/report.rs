//! Validation issues and reports

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// How bad an issue is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// Kind of check that produced an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    DuplicateId,
    NonFinite,
    NonPositiveBox,
    MinorOverflow,
    Overflow,
    Overlap,
    TouchTarget,
    InvisibleText,
    InconsistentToken,
}

impl Check {
    /// Severity this check always reports with
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::MinorOverflow | Self::Overlap => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Contribution to the risk score
    #[must_use]
    pub const fn weight(self) -> f64 {
        match self {
            Self::DuplicateId | Self::NonFinite | Self::NonPositiveBox => 1.0,
            Self::MinorOverflow => 0.1,
            Self::Overflow => 0.6,
            Self::Overlap => 0.05,
            Self::TouchTarget => 0.5,
            Self::InvisibleText => 0.8,
            Self::InconsistentToken => 0.4,
        }
    }

    /// Stable snake_case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateId => "duplicate_id",
            Self::NonFinite => "non_finite",
            Self::NonPositiveBox => "non_positive_box",
            Self::MinorOverflow => "minor_overflow",
            Self::Overflow => "overflow",
            Self::Overlap => "overlap",
            Self::TouchTarget => "touch_target",
            Self::InvisibleText => "invisible_text",
            Self::InconsistentToken => "inconsistent_token",
        }
    }
}

impl Display for Check {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One triggered check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub check: Check,
    pub severity: Severity,
    /// Component the issue is about; `None` for token issues
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
    pub message: String,
}

impl ValidationIssue {
    /// Issue on a component
    #[must_use]
    pub fn component(check: Check, id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            check,
            severity: check.severity(),
            component_id: Some(id.into()),
            message: message.into(),
        }
    }

    /// Issue not tied to a component
    #[must_use]
    pub fn global(check: Check, message: impl Into<String>) -> Self {
        Self {
            check,
            severity: check.severity(),
            component_id: None,
            message: message.into(),
        }
    }

    /// Whether this issue is an error
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl Display for ValidationIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.component_id {
            Some(id) => write!(f, "[{}] {}: {}", self.check, id, self.message),
            None => write!(f, "[{}] {}", self.check, self.message),
        }
    }
}

/// Every issue found in one document, in check order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Create from issues
    #[must_use]
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    /// Weighted sum of triggered checks, clamped to `[0, 1]`
    #[must_use]
    pub fn risk_score(&self) -> f64 {
        self.issues
            .iter()
            .map(|issue| issue.check.weight())
            .sum::<f64>()
            .clamp(0.0, 1.0)
    }

    /// Any error-severity issue
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(ValidationIssue::is_error)
    }

    /// No errors
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    /// Error-severity issues
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.is_error())
    }

    /// Warning-severity issues
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| !i.is_error())
    }

    /// Issues of one check kind
    pub fn of(&self, check: Check) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.check == check)
    }
}
