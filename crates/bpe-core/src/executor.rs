//! Pipeline orchestration
//!
//! [`EditPipeline`] drives one command end to end: decompose, then for each
//! step snapshot, resolve, consult the cache, plan, simulate, verify and
//! commit. A failing step rolls back according to the
//! [`FailurePolicy`] and halts the plan. Nothing here returns an error: every
//! outcome is described by the [`ExecutionResult`].

use crate::config::{FailurePolicy, PipelineConfig};
use crate::decomposition::{EditPlan, IntentDecomposer, PlanStep};
use crate::error::{SimulationError, StepError};
use crate::planner::PatchPlanner;
use crate::resolver::{ResolutionContext, ResolvedTarget, TargetResolver};
use crate::result::{ExecutionResult, ExecutionStatus, ReasoningTrace, StepResult, StepStatus};
use crate::rollback::RollbackManager;
use crate::simulator::Simulator;
use crate::verification::Verifier;
use bpe_cache::{CacheKey, ResultCache};
use bpe_document::{apply_patches, ContentHash, Document, Patch, PatchValue};
use bpe_validation::DocumentValidator;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Cached outcome of one successful step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedStep {
    pub target: ResolvedTarget,
    pub patches: Vec<Patch>,
    pub risk_score: f64,
    pub warnings: Vec<String>,
}

/// A committed step
#[derive(Debug)]
struct Applied {
    document: Document,
    step: CachedStep,
    cached: bool,
}

/// A failed step and whatever was known when it failed
#[derive(Debug)]
struct Failure {
    error: StepError,
    target: Option<ResolvedTarget>,
    patches: Vec<Patch>,
    risk_score: f64,
}

impl Failure {
    fn before_planning(error: impl Into<StepError>) -> Self {
        Self {
            error: error.into(),
            target: None,
            patches: Vec::new(),
            risk_score: 0.0,
        }
    }
}

/// The edit pipeline
///
/// Holds configuration and collaborators only; all per-invocation state
/// (running document, snapshots, resolution context) lives on the stack of
/// [`EditPipeline::execute`]. The optional cache is the one shared resource.
#[derive(Debug, Clone)]
pub struct EditPipeline {
    config: PipelineConfig,
    decomposer: IntentDecomposer,
    resolver: TargetResolver,
    planner: PatchPlanner,
    simulator: Simulator,
    verifier: Verifier,
    cache: Option<ResultCache<CachedStep>>,
}

impl Default for EditPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl EditPipeline {
    /// Create pipeline without a cache
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            decomposer: IntentDecomposer::new(&config),
            resolver: TargetResolver::new(),
            planner: PatchPlanner::new(&config),
            simulator: Simulator::new(config.validation.clone(), config.max_risk_score),
            verifier: Verifier::new(),
            cache: None,
            config,
        }
    }

    /// With a caller-owned result cache
    ///
    /// A cache must only be shared between pipelines with equal configuration.
    #[inline]
    #[must_use]
    pub fn with_cache(mut self, cache: ResultCache<CachedStep>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// With a fresh cache sized from the configuration
    #[inline]
    #[must_use]
    pub fn with_default_cache(self) -> Self {
        let cache = ResultCache::new(self.config.cache_capacity);
        self.with_cache(cache)
    }

    /// With a custom document validator
    #[inline]
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn DocumentValidator>) -> Self {
        self.simulator = Simulator::with_validator(validator, self.config.max_risk_score);
        self
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Attached cache, if any
    #[inline]
    #[must_use]
    pub fn cache(&self) -> Option<&ResultCache<CachedStep>> {
        self.cache.as_ref()
    }

    /// Run `command` against `document`
    ///
    /// `document` is only read. The returned result owns its final document.
    #[must_use]
    pub fn execute(&self, command: &str, document: &Document) -> ExecutionResult {
        let mut trace = ReasoningTrace::new();
        tracing::info!(command, components = document.components.len(), "executing command");

        let plan = match self.decomposer.decompose(command, document, &mut trace) {
            Ok(plan) => plan,
            Err(err) => {
                let status = err.status();
                trace.record(format!("plan rejected ({status}): {err}"));
                tracing::warn!(status = %status, error = %err, "plan rejected");
                return ExecutionResult::rejected(
                    status,
                    document.clone(),
                    err.conflicts().to_vec(),
                    trace,
                );
            }
        };

        self.run_plan(&plan, document, trace)
    }

    /// Run independent commands in parallel
    ///
    /// Results are returned in input order. The cache, if any, is shared.
    #[must_use]
    pub fn execute_batch(&self, jobs: &[(String, Document)]) -> Vec<ExecutionResult> {
        tracing::info!(jobs = jobs.len(), "executing batch");
        jobs.par_iter()
            .map(|(command, document)| self.execute(command, document))
            .collect()
    }

    fn run_plan(
        &self,
        plan: &EditPlan,
        document: &Document,
        mut trace: ReasoningTrace,
    ) -> ExecutionResult {
        let mut rollback = RollbackManager::new(self.config.snapshot_mode);
        rollback.begin();
        let mut context = ResolutionContext::new();
        let mut current = document.clone();
        let mut step_results = Vec::with_capacity(plan.len());
        let mut failed_at = None;

        for step in &plan.steps {
            rollback.capture(step.index, &current);

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                self.run_step(step, &current, &context, &mut trace)
            }))
            .unwrap_or_else(|payload| {
                Err(Failure::before_planning(StepError::Internal(
                    panic_message(&*payload),
                )))
            });

            match outcome {
                Ok(applied) => {
                    context.record(&applied.step.target);
                    if let Some(id) = created_id(&applied.step.patches) {
                        context.record_created(id);
                    }
                    let status = if applied.cached {
                        StepStatus::Cached
                    } else {
                        StepStatus::Applied
                    };
                    trace.record(format!(
                        "step {} {}: {} patch(es) on {}",
                        step.index,
                        if applied.cached { "applied from cache" } else { "applied" },
                        applied.step.patches.len(),
                        applied.step.target
                    ));
                    tracing::info!(
                        step = step.index,
                        kind = %step.intent.kind(),
                        target = %applied.step.target,
                        cached = applied.cached,
                        "step applied"
                    );
                    step_results.push(step_result(
                        step,
                        status,
                        Some(&applied.step.target),
                        applied.step.patches,
                        applied.step.risk_score,
                        applied.step.warnings,
                        None,
                    ));
                    current = applied.document;
                }
                Err(failure) => {
                    trace.record(format!(
                        "step {} failed ({}): {}",
                        step.index,
                        failure.error.category(),
                        failure.error
                    ));
                    tracing::warn!(
                        step = step.index,
                        kind = %step.intent.kind(),
                        error = %failure.error,
                        "step failed"
                    );
                    step_results.push(step_result(
                        step,
                        StepStatus::Failed,
                        failure.target.as_ref(),
                        failure.patches,
                        failure.risk_score,
                        Vec::new(),
                        Some(failure.error.to_string()),
                    ));
                    failed_at = Some((step.index, failure.error));
                    break;
                }
            }
        }

        let total = plan.len();
        let Some((failed_step, error)) = failed_at else {
            trace.record(format!("all {total} step(s) applied"));
            tracing::info!(steps = total, confidence = plan.confidence, "command succeeded");
            return ExecutionResult {
                status: ExecutionStatus::Success,
                final_document: current,
                steps_executed: total,
                steps_failed: 0,
                rollback_triggered: false,
                rollback_reason: None,
                confidence: plan.confidence,
                reasoning_trace: trace,
                step_results,
                conflicts: Vec::new(),
            };
        };

        let completed = step_results.iter().filter(|r| r.succeeded()).count();
        let (restore_to, status) = match self.config.failure_policy {
            FailurePolicy::AllOrNothing => (0, ExecutionStatus::Failed),
            FailurePolicy::KeepCompleted if completed > 0 => (failed_step, ExecutionStatus::Partial),
            FailurePolicy::KeepCompleted => (failed_step, ExecutionStatus::Failed),
        };

        let final_document = match rollback.rollback_to_step(restore_to) {
            Ok(restored) => {
                trace.record(format!("rolled back to the state before step {restore_to}"));
                restored
            }
            Err(err) => {
                trace.record(format!("snapshot restore failed ({err}); returning the input document"));
                tracing::warn!(error = %err, "snapshot restore failed");
                document.clone()
            }
        };

        #[allow(clippy::cast_precision_loss)]
        let confidence = if total == 0 {
            0.0
        } else {
            plan.confidence * completed as f64 / total as f64
        };

        tracing::warn!(status = %status, step = failed_step, completed, "command did not fully apply");
        ExecutionResult {
            status,
            final_document,
            steps_executed: completed,
            steps_failed: 1,
            rollback_triggered: true,
            rollback_reason: Some(format!("step {failed_step} failed: {error}")),
            confidence,
            reasoning_trace: trace,
            step_results,
            conflicts: Vec::new(),
        }
    }

    fn run_step(
        &self,
        step: &PlanStep,
        current: &Document,
        context: &ResolutionContext,
        trace: &mut ReasoningTrace,
    ) -> Result<Applied, Failure> {
        let intent = &step.intent;
        let resolution = self
            .resolver
            .resolve(&intent.target, intent.via_pronoun, current, context)
            .map_err(Failure::before_planning)?;
        let target = resolution.target;
        trace.record(format!(
            "step {} ({}) '{}': target {} by {}",
            step.index,
            intent.kind(),
            intent.clause,
            target,
            resolution.reason
        ));

        let key = self
            .cache
            .as_ref()
            .map(|_| CacheKey::new(cache_fragment(step, &target), ContentHash::of_document(current)));

        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(hit) = cache.get(key).filter(|hit| hit.target == target) {
                let document = apply_patches(current, &hit.patches).map_err(|err| Failure {
                    error: StepError::Cache(err),
                    target: Some(target.clone()),
                    patches: hit.patches.clone(),
                    risk_score: hit.risk_score,
                })?;
                return Ok(Applied {
                    document,
                    step: hit,
                    cached: true,
                });
            }
        }

        let fail = |error: StepError, patches: &[Patch], risk_score: f64| Failure {
            error,
            target: Some(target.clone()),
            patches: patches.to_vec(),
            risk_score,
        };

        let patches = self
            .planner
            .plan(intent, &target, current)
            .map_err(|err| fail(err.into(), &[], 0.0))?;
        trace.record(format!(
            "step {} planned: {}",
            step.index,
            patches.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
        ));

        let outcome = self
            .simulator
            .simulate(current, &patches)
            .map_err(|err: SimulationError| fail(err.into(), &patches, 0.0))?;
        trace.record(format!(
            "step {} simulated: safe={} risk={:.2} issues={}",
            step.index,
            outcome.safe,
            outcome.risk_score,
            outcome.report.issues.len()
        ));
        if !outcome.safe {
            return Err(fail(
                StepError::Unsafe {
                    risk: outcome.risk_score,
                    errors: outcome.error_messages(),
                },
                &patches,
                outcome.risk_score,
            ));
        }

        self.verifier
            .verify(intent.kind(), current, &outcome.document, &patches)
            .map_err(|err| fail(err.into(), &patches, outcome.risk_score))?;

        let applied = CachedStep {
            target: target.clone(),
            patches,
            risk_score: outcome.risk_score,
            warnings: outcome.warning_messages(),
        };
        if let (Some(cache), Some(key)) = (&self.cache, key) {
            cache.insert_once(key, applied.clone());
        }
        Ok(Applied {
            document: outcome.document,
            step: applied,
            cached: false,
        })
    }
}

/// Run `command` against `document` with the default configuration
///
/// Never fails and never modifies `document`.
#[must_use]
pub fn decompose_and_execute(command: &str, document: &Document) -> ExecutionResult {
    EditPipeline::default().execute(command, document)
}

/// Clause, selector and concrete target: enough to make context-dependent
/// steps (pronouns, created components) unambiguous
fn cache_fragment(step: &PlanStep, target: &ResolvedTarget) -> String {
    format!("{}|{}|{}", step.intent.clause, step.intent.target, target)
}

fn created_id(patches: &[Patch]) -> Option<String> {
    patches.iter().find_map(|patch| match &patch.value {
        Some(PatchValue::Component(component)) => Some(component.id.clone()),
        _ => None,
    })
}

fn step_result(
    step: &PlanStep,
    status: StepStatus,
    target: Option<&ResolvedTarget>,
    patches: Vec<Patch>,
    risk_score: f64,
    warnings: Vec<String>,
    error: Option<String>,
) -> StepResult {
    StepResult {
        index: step.index,
        kind: step.intent.kind(),
        clause: step.intent.clause.clone(),
        status,
        target: target.map(ToString::to_string),
        patches,
        risk_score,
        warnings,
        confidence: step.intent.confidence,
        error,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "step panicked".to_string())
}
