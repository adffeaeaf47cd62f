//! Simulation: apply a step's patches to a clone and score the result

use crate::error::SimulationError;
use bpe_document::{apply_patches, Document, Patch};
use bpe_validation::{DocumentValidator, StandardValidator, ValidationRules, ValidationReport};
use std::sync::Arc;

/// Result of a dry run
#[derive(Debug, Clone)]
pub struct SimulationOutcome {
    /// No error-severity issues and risk within the threshold
    pub safe: bool,
    pub risk_score: f64,
    pub report: ValidationReport,
    /// Patched clone; adopted only if the step commits
    pub document: Document,
}

impl SimulationOutcome {
    /// Error messages, for step failure reporting
    #[must_use]
    pub fn error_messages(&self) -> Vec<String> {
        self.report.errors().map(ToString::to_string).collect()
    }

    /// Warning messages
    #[must_use]
    pub fn warning_messages(&self) -> Vec<String> {
        self.report.warnings().map(ToString::to_string).collect()
    }
}

/// Dry-run executor
///
/// Never touches the caller's document: patches land on a clone which is
/// returned inside the outcome.
#[derive(Debug, Clone)]
pub struct Simulator {
    validator: Arc<dyn DocumentValidator>,
    max_risk: f64,
}

impl Simulator {
    /// Create with the standard validator
    #[must_use]
    pub fn new(rules: ValidationRules, max_risk: f64) -> Self {
        Self::with_validator(Arc::new(StandardValidator::new(rules)), max_risk)
    }

    /// Create with a custom validator
    #[must_use]
    pub fn with_validator(validator: Arc<dyn DocumentValidator>, max_risk: f64) -> Self {
        Self { validator, max_risk }
    }

    /// Validator in use
    #[inline]
    #[must_use]
    pub fn validator(&self) -> &Arc<dyn DocumentValidator> {
        &self.validator
    }

    /// Apply `patches` to a clone of `document` and validate the result
    ///
    /// # Errors
    /// Returns error if a patch cannot be applied
    pub fn simulate(
        &self,
        document: &Document,
        patches: &[Patch],
    ) -> Result<SimulationOutcome, SimulationError> {
        let patched = apply_patches(document, patches)?;
        Ok(self.assess(patched))
    }

    /// Validate an already patched document
    #[must_use]
    pub fn assess(&self, document: Document) -> SimulationOutcome {
        let report = self.validator.validate(&document);
        let risk_score = report.risk_score();
        let safe = !report.has_errors() && risk_score <= self.max_risk;
        tracing::debug!(safe, risk = risk_score, issues = report.issues.len(), "simulation assessed");
        SimulationOutcome {
            safe,
            risk_score,
            report,
            document,
        }
    }
}
