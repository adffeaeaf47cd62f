//! Error types for the edit pipeline
//!
//! Errors are recovered at the step or plan level; the executor turns them
//! into an [`ExecutionResult`](crate::ExecutionResult) and never returns them.

use crate::result::ExecutionStatus;
use crate::types::{Conflict, IntentKind, TargetSelector};
use bpe_document::{DocumentError, PatchError, PatchPath};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Why a clause could not become a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// No intent pattern matched
    NoIntent,
    /// Intent recognized but no target found
    UnresolvedTarget { kind: IntentKind },
    /// Interpretation too uncertain to act on
    LowConfidence { kind: IntentKind, confidence: f64 },
}

/// A clause left out of the plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedClause {
    /// Position in the command
    pub index: usize,
    pub clause: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

impl Display for SkippedClause {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.reason {
            SkipReason::NoIntent => write!(f, "clause {} '{}': no recognizable edit", self.index, self.clause),
            SkipReason::UnresolvedTarget { kind } => write!(
                f,
                "clause {} '{}': {kind} target not found",
                self.index, self.clause
            ),
            SkipReason::LowConfidence { kind, confidence } => write!(
                f,
                "clause {} '{}': {kind} confidence {confidence:.2} too low",
                self.index, self.clause
            ),
        }
    }
}

fn join<T: Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Command decomposition errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecompositionError {
    /// Blank command
    #[error("empty command")]
    EmptyCommand,

    /// No clause produced a usable step
    #[error("unresolvable command: {}", join(.skipped))]
    Unresolvable { skipped: Vec<SkippedClause> },

    /// Some clauses planned, others skipped; the plan is rejected
    #[error("ambiguous command, {planned} clause(s) understood but: {}", join(.skipped))]
    Ambiguous {
        skipped: Vec<SkippedClause>,
        planned: usize,
    },

    /// Incompatible verbs on one referent
    #[error("logical conflict: {}", join(.conflicts))]
    Conflict { conflicts: Vec<Conflict> },
}

impl DecompositionError {
    /// Status reported for a plan rejected with this error
    #[must_use]
    pub fn status(&self) -> ExecutionStatus {
        match self {
            Self::EmptyCommand | Self::Unresolvable { .. } => ExecutionStatus::Failed,
            Self::Ambiguous { .. } | Self::Conflict { .. } => ExecutionStatus::Conflicted,
        }
    }

    /// Check if error is a logical conflict
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Conflicts carried by this error
    #[must_use]
    pub fn conflicts(&self) -> &[Conflict] {
        match self {
            Self::Conflict { conflicts } => conflicts,
            _ => &[],
        }
    }
}

/// Target resolution errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    /// Nothing in the document matches
    #[error("no component matches {0}")]
    NoMatch(TargetSelector),

    /// Created-component reference before the creating step ran
    #[error("component #{0} created by this command does not exist yet")]
    NotCreated(usize),

    /// Token key missing from the document
    #[error("unknown token: {0}")]
    UnknownToken(String),
}

/// Patch planning errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanningError {
    /// Intent cannot apply to this kind of target
    #[error("{kind} cannot apply to {target}")]
    UnsupportedTarget { kind: IntentKind, target: String },

    /// Intent needs a field the component lacks
    #[error("component '{id}' has no {field}")]
    MissingField { id: String, field: &'static str },

    /// Generated patch left the allow-list
    #[error("refused patch: {0}")]
    Forbidden(#[from] PatchError),
}

/// Simulation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    /// Patch set did not apply to the clone
    #[error("patch failed: {0}")]
    Patch(#[from] PatchError),
}

/// Post-simulation verification failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VerificationError {
    /// Document invariant broken
    #[error("structure invalid: {0}")]
    Structure(#[from] DocumentError),

    /// A surviving component changed id
    #[error("component id changed at index {index}: '{before}' -> '{after}'")]
    IdChanged {
        index: usize,
        before: String,
        after: String,
    },

    /// A field changed that no patch touched
    #[error("untouched field changed: {0}")]
    UntouchedChange(PatchPath),

    /// Component count changed outside create/delete
    #[error("{kind} changed component count from {before} to {after}")]
    CountChanged {
        kind: IntentKind,
        before: usize,
        after: usize,
    },

    /// Components other than the inserted/removed one were disturbed
    #[error("surviving components were reordered or modified")]
    Disturbed,
}

/// Snapshot errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RollbackError {
    /// No snapshots captured
    #[error("no snapshot to roll back to")]
    Empty,

    /// No snapshot was taken before this step
    #[error("no snapshot for step {0}")]
    UnknownStep(usize),

    /// Reconstructed state does not match the recorded hash
    #[error("snapshot for step {step} failed integrity check")]
    Corrupt { step: usize },
}

/// Why a single step failed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StepError {
    #[error("target resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("planning failed: {0}")]
    Planning(#[from] PlanningError),

    #[error("simulation failed: {0}")]
    Simulation(#[from] SimulationError),

    /// Simulator reported the patched document unsafe
    #[error("unsafe edit (risk {risk:.2}): {}", .errors.join("; "))]
    Unsafe { risk: f64, errors: Vec<String> },

    #[error("verification failed: {0}")]
    Verification(#[from] VerificationError),

    /// Cached patches no longer applied
    #[error("cached patches failed: {0}")]
    Cache(PatchError),

    /// Panic caught at the step boundary
    #[error("internal error: {0}")]
    Internal(String),
}

impl StepError {
    /// Short category label
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Resolution(_) => "resolution",
            Self::Planning(_) => "planning",
            Self::Simulation(_) => "simulation",
            Self::Unsafe { .. } => "unsafe",
            Self::Verification(_) => "verification",
            Self::Cache(_) => "cache",
            Self::Internal(_) => "internal",
        }
    }
}
