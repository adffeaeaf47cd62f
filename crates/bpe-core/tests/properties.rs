//! Property tests over generated documents and commands

use bpe_core::{EditPipeline, ExecutionStatus, FailurePolicy, PipelineConfig};
use bpe_document::Document;
use bpe_test_utils::{arb_command, arb_document, cta_button};
use proptest::prelude::*;

fn with_button(mut doc: Document) -> Document {
    doc.components.push(cta_button());
    doc
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn input_is_never_modified(doc in arb_document(), command in arb_command()) {
        let before = doc.clone();
        let _ = EditPipeline::default().execute(&command, &doc);
        prop_assert_eq!(doc, before);
    }

    #[test]
    fn repeated_runs_agree(doc in arb_document(), command in arb_command()) {
        let pipeline = EditPipeline::default();
        let runs: Vec<_> = (0..3).map(|_| pipeline.execute(&command, &doc)).collect();
        for run in &runs[1..] {
            prop_assert_eq!(run.status, runs[0].status);
            prop_assert_eq!(run.steps_executed, runs[0].steps_executed);
            prop_assert_eq!(run.confidence.to_bits(), runs[0].confidence.to_bits());
            prop_assert_eq!(
                run.final_document.canonical_json().unwrap(),
                runs[0].final_document.canonical_json().unwrap()
            );
        }
    }

    #[test]
    fn patches_stay_on_the_allow_list(doc in arb_document(), command in arb_command()) {
        let result = EditPipeline::default().execute(&command, &doc);
        for step in &result.step_results {
            for patch in &step.patches {
                prop_assert!(patch.path.is_allow_listed(), "{}", patch);
                prop_assert!(patch.validate().is_ok(), "{}", patch);
            }
        }
    }

    #[test]
    fn failed_commands_leave_the_input_state(doc in arb_document(), command in arb_command()) {
        let result = EditPipeline::default().execute(&command, &doc);
        if result.status != ExecutionStatus::Success {
            prop_assert_eq!(&result.final_document, &doc);
        }
        if result.status == ExecutionStatus::Conflicted {
            prop_assert_eq!(result.steps_executed, 0);
        }
        prop_assert!((0.0..=1.0).contains(&result.confidence));
    }

    #[test]
    fn delete_with_another_verb_conflicts(
        doc in arb_document(),
        verb in prop::sample::select(vec!["resize it", "move it up", "hide it", "make it bigger"]),
        separator in prop::sample::select(vec![" and ", ", then ", "; "]),
    ) {
        let doc = with_button(doc);
        let command = format!("delete the button{separator}{verb}");
        let result = EditPipeline::default().execute(&command, &doc);
        prop_assert_eq!(result.status, ExecutionStatus::Conflicted);
        prop_assert_eq!(result.steps_executed, 0);
        prop_assert!(!result.conflicts.is_empty());
    }

    #[test]
    fn bare_delete_shares_the_object_and_conflicts(
        doc in arb_document(),
        rest in prop::sample::select(vec!["resize the button", "move the button up", "hide the button"]),
        separator in prop::sample::select(vec![" and ", ", then ", "; "]),
    ) {
        let doc = with_button(doc);
        let command = format!("Delete{separator}{rest}");
        let result = EditPipeline::default().execute(&command, &doc);
        prop_assert_eq!(result.status, ExecutionStatus::Conflicted);
        prop_assert_eq!(result.steps_executed, 0);
        prop_assert!(!result.conflicts.is_empty());
        prop_assert!(result.reasoning_trace.mentions("conflict"));
    }

    #[test]
    fn cache_does_not_change_results(doc in arb_document(), command in arb_command()) {
        let plain = EditPipeline::default().execute(&command, &doc);
        let cached_pipeline = EditPipeline::default().with_default_cache();
        let warm = cached_pipeline.execute(&command, &doc);
        let hot = cached_pipeline.execute(&command, &doc);
        for run in [&warm, &hot] {
            prop_assert_eq!(run.status, plain.status);
            prop_assert_eq!(&run.final_document, &plain.final_document);
            prop_assert_eq!(run.confidence.to_bits(), plain.confidence.to_bits());
        }
    }

    #[test]
    fn keep_completed_never_exceeds_success(doc in arb_document(), command in arb_command()) {
        let pipeline = EditPipeline::new(
            PipelineConfig::default().with_failure_policy(FailurePolicy::KeepCompleted),
        );
        let result = pipeline.execute(&command, &doc);
        let applied = result.step_results.iter().filter(|s| s.succeeded()).count();
        prop_assert_eq!(applied, result.steps_executed);
        if result.status == ExecutionStatus::Partial {
            prop_assert!(result.steps_executed > 0);
            prop_assert!(result.rollback_triggered);
        }
    }
}

#[test]
fn batch_matches_sequential_runs() {
    let pipeline = EditPipeline::default().with_default_cache();
    let jobs: Vec<(String, Document)> = [
        "make the button bigger",
        "delete the button and resize it",
        "make the cta green",
        "hide the button, then center it",
    ]
    .iter()
    .map(|command| ((*command).to_string(), with_button(Document::default())))
    .collect();

    let batch = pipeline.execute_batch(&jobs);
    let sequential: Vec<_> = jobs
        .iter()
        .map(|(command, doc)| EditPipeline::default().execute(command, doc))
        .collect();

    assert_eq!(batch.len(), sequential.len());
    for (a, b) in batch.iter().zip(&sequential) {
        assert_eq!(a.status, b.status);
        assert_eq!(a.final_document, b.final_document);
    }
}
