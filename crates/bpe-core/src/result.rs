//! Execution results and the reasoning trace

use crate::types::{Conflict, IntentKind};
use bpe_document::{Document, Patch};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Overall outcome of one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Every step applied
    Success,
    /// Some steps applied, then one failed and completed steps were kept
    Partial,
    /// Nothing applied (unresolvable command or a failed step)
    Failed,
    /// Plan rejected before execution (conflict or ambiguity)
    Conflicted,
}

impl ExecutionStatus {
    /// Stable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
            Self::Conflicted => "conflicted",
        }
    }
}

impl Display for ExecutionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Simulated, verified and applied
    Applied,
    /// Applied from a cached result
    Cached,
    /// Failed; the invocation halted here
    Failed,
}

/// Record of one executed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Position in the plan (0-based)
    pub index: usize,
    pub kind: IntentKind,
    pub clause: String,
    pub status: StepStatus,
    /// Resolved target, when resolution succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default)]
    pub patches: Vec<Patch>,
    pub risk_score: f64,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepResult {
    /// Whether the step applied (fresh or cached)
    #[inline]
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status != StepStatus::Failed
    }
}

/// Ordered, human-readable log of every decision
///
/// Each entry is also emitted as a `tracing` debug event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReasoningTrace(Vec<String>);

impl ReasoningTrace {
    /// Empty trace
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    pub fn record(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        tracing::debug!(target: "bpe_core::trace", "{entry}");
        self.0.push(entry);
    }

    /// Entries in order
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.0
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// No entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Any entry containing `needle`
    #[must_use]
    pub fn mentions(&self, needle: &str) -> bool {
        self.0.iter().any(|e| e.contains(needle))
    }
}

/// Complete outcome of `decompose_and_execute`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub final_document: Document,
    pub steps_executed: usize,
    pub steps_failed: usize,
    pub rollback_triggered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_reason: Option<String>,
    pub confidence: f64,
    pub reasoning_trace: ReasoningTrace,
    pub step_results: Vec<StepResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<Conflict>,
}

impl ExecutionResult {
    /// Result for a plan rejected before any step ran
    #[must_use]
    pub fn rejected(
        status: ExecutionStatus,
        document: Document,
        conflicts: Vec<Conflict>,
        trace: ReasoningTrace,
    ) -> Self {
        Self {
            status,
            final_document: document,
            steps_executed: 0,
            steps_failed: 0,
            rollback_triggered: false,
            rollback_reason: None,
            confidence: 0.0,
            reasoning_trace: trace,
            step_results: Vec::new(),
            conflicts,
        }
    }

    /// Whether every step applied
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_keeps_order() {
        let mut trace = ReasoningTrace::new();
        trace.record("split into 2 clauses");
        trace.record(String::from("step 0 applied"));
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.entries()[1], "step 0 applied");
        assert!(trace.mentions("2 clauses"));
    }

    #[test]
    fn rejected_result_has_no_steps() {
        let result = ExecutionResult::rejected(
            ExecutionStatus::Conflicted,
            Document::default(),
            Vec::new(),
            ReasoningTrace::new(),
        );
        assert_eq!(result.steps_executed, 0);
        assert!((result.confidence).abs() < f64::EPSILON);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "conflicted");
        assert!(json["reasoning_trace"].is_array());
    }
}
