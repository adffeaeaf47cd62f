//! Blueprint edit pipeline
//!
//! Turns a natural-language command into a deterministic, verified edit of
//! a blueprint [`Document`](bpe_document::Document):
//! - Decomposes the command into ordered, typed intents and rejects
//!   conflicting or ambiguous commands
//! - Resolves each intent's target and plans allow-listed patches
//! - Simulates every step on a clone and verifies it changed only what it
//!   should
//! - Snapshots before each step and rolls back on failure
//! - Optionally memoizes step results in a shared [`ResultCache`](bpe_cache::ResultCache)
//!
//! # Example
//!
//! ```rust
//! use bpe_core::{decompose_and_execute, ExecutionStatus};
//! use bpe_document::{BBox, Component, ComponentType, Document, Role};
//!
//! let doc = Document::new(vec![Component::new(
//!     "cta",
//!     ComponentType::Button,
//!     BBox::new(0.0, 0.0, 160.0, 50.0),
//! )
//! .with_role(Role::Cta)]);
//!
//! let result = decompose_and_execute("Make button bigger", &doc);
//! assert_eq!(result.status, ExecutionStatus::Success);
//! assert_eq!(result.final_document.components[0].bbox.height, 60.0);
//! assert_eq!(doc.components[0].bbox.height, 50.0);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Pipeline stages
pub mod decomposition;
pub mod executor;
pub mod planner;
pub mod resolver;
pub mod rollback;
pub mod simulator;
pub mod verification;

// Shared model
pub mod config;
pub mod error;
pub mod result;
pub mod types;

// Re-exports for convenience
pub use config::{ColorTable, ConfigError, FailurePolicy, PipelineConfig, SnapshotMode};
pub use decomposition::{split_clauses, EditPlan, IntentDecomposer, PlanStep, SEPARATORS};
pub use error::{
    DecompositionError, PlanningError, ResolutionError, RollbackError, SimulationError,
    SkipReason, SkippedClause, StepError, VerificationError,
};
pub use executor::{decompose_and_execute, CachedStep, EditPipeline};
pub use planner::PatchPlanner;
pub use resolver::{
    MatchReason, Resolution, ResolutionContext, ResolvedTarget, TargetResolver,
};
pub use result::{ExecutionResult, ExecutionStatus, ReasoningTrace, StepResult, StepStatus};
pub use rollback::{DeltaStore, FullCopyStore, RollbackManager, SnapshotMeta, SnapshotStore};
pub use simulator::{SimulationOutcome, Simulator};
pub use types::{
    Alignment, ColorChannel, ColorSpec, ColorValue, Conflict, CreateValue, Dimension, Intent,
    IntentKind, IntentValue, MoveDirection, MoveValue, Placement, ResizeValue, SizeDirection,
    StyleChange, TargetSelector, TextValue, Verb,
};
pub use verification::Verifier;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the pipeline
    pub use crate::{
        decompose_and_execute, EditPipeline, ExecutionResult, ExecutionStatus, FailurePolicy,
        PipelineConfig, SnapshotMode, StepStatus,
    };
    pub use bpe_cache::ResultCache;
    pub use bpe_document::{Document, Patch};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
