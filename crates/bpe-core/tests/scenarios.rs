//! End-to-end command scenarios

use bpe_core::{
    EditPipeline, ExecutionStatus, FailurePolicy, PipelineConfig, StepStatus, Verb,
};
use bpe_document::{BBox, Component, ComponentType, Document};
use bpe_test_utils::{header_and_cta, init_tracing, invisible_text, landing_page, single_button};
use pretty_assertions::assert_eq;

fn pipeline() -> EditPipeline {
    init_tracing();
    EditPipeline::default()
}

#[test]
fn bigger_button_grows_by_step() {
    let doc = single_button();
    let result = pipeline().execute("Make button bigger", &doc);

    assert_eq!(result.status, ExecutionStatus::Success);
    assert_eq!(result.steps_executed, 1);
    let cta = result.final_document.component("cta").unwrap();
    assert_eq!(cta.bbox.height, 60.0);
    assert_eq!(cta.bbox.width, 192.0);
    assert_eq!(cta.visual_number("height"), Some(60.0));
    assert!(cta.bbox.height >= 44.0);
    assert!((result.confidence - 0.81).abs() < 1e-9);
    assert_eq!(doc, single_button());
}

#[test]
fn delete_then_resize_is_a_conflict() {
    let doc = single_button();
    let result = pipeline().execute("Delete button and resize it", &doc);

    assert_eq!(result.status, ExecutionStatus::Conflicted);
    assert_eq!(result.steps_executed, 0);
    assert!(result.step_results.is_empty());
    assert_eq!(result.conflicts.len(), 1);
    assert_eq!(result.conflicts[0].first, Verb::Delete);
    assert_eq!(result.conflicts[0].referent, "cta");
    assert_eq!(result.final_document, doc);
    assert_eq!(result.confidence, 0.0);
}

#[test]
fn matching_background_is_unsafe_and_rolled_back() {
    let doc = invisible_text();
    let result = pipeline().execute("Change text color to the same as background", &doc);

    assert_eq!(result.status, ExecutionStatus::Failed);
    assert!(result.rollback_triggered);
    assert_eq!(result.steps_failed, 1);
    assert_eq!(result.steps_executed, 0);
    assert_eq!(result.final_document, doc);

    let step = &result.step_results[0];
    assert_eq!(step.status, StepStatus::Failed);
    assert!(step.risk_score >= 0.8);
    assert!(step.error.as_deref().unwrap().contains("invisible_text"));
    assert!(result.reasoning_trace.mentions("rolled back"));
}

#[test]
fn pronoun_follows_previous_target() {
    let doc = header_and_cta();
    let result = pipeline().execute("Make header smaller and change its color to red", &doc);

    assert_eq!(result.status, ExecutionStatus::Success);
    assert_eq!(result.steps_executed, 2);
    let targets: Vec<_> = result
        .step_results
        .iter()
        .map(|s| s.target.as_deref().unwrap())
        .collect();
    assert_eq!(targets, vec!["'header'", "'header'"]);

    let header = result.final_document.component("header").unwrap();
    assert_eq!(header.bbox.height, 64.0);
    assert_eq!(header.visual_str("color"), Some("#ef4444"));
    assert_eq!(result.final_document.component("cta"), doc.component("cta"));
}

#[test]
fn repeated_runs_serialize_identically() {
    let doc = single_button();
    let outputs: Vec<String> = (0..3)
        .map(|_| {
            let result = pipeline().execute("Make button bigger", &doc.clone());
            result.final_document.canonical_json().unwrap()
        })
        .collect();
    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[1], outputs[2]);
}

#[test]
fn nonsense_is_unresolvable() {
    let result = pipeline().execute("sing a song", &single_button());
    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.steps_executed, 0);
    assert!(!result.rollback_triggered);
    assert!(result.reasoning_trace.mentions("no recognizable edit"));
}

#[test]
fn partly_understood_command_is_rejected() {
    let doc = single_button();
    let result = pipeline().execute("make the button bigger and sing a song", &doc);
    assert_eq!(result.status, ExecutionStatus::Conflicted);
    assert_eq!(result.steps_executed, 0);
    assert_eq!(result.final_document, doc);
}

#[test]
fn shrink_respects_touch_target() {
    let result = pipeline().execute("make the button 50% smaller", &single_button());
    assert_eq!(result.status, ExecutionStatus::Success);
    assert_eq!(result.final_document.component("cta").unwrap().bbox.height, 44.0);
}

#[test]
fn token_edits() {
    let doc = header_and_cta();
    let result = pipeline().execute("increase spacing by 50%", &doc);
    assert_eq!(result.status, ExecutionStatus::Success);
    assert_eq!(result.final_document.tokens["spacing"].as_f64(), Some(12.0));
}

#[test]
fn create_places_component_after_anchor() {
    let doc = landing_page();
    let result = pipeline().execute("add a card below the intro and add more padding to it", &doc);
    assert_eq!(result.status, ExecutionStatus::Success, "{:?}", result.reasoning_trace);

    let index = result.final_document.index_of("card-1").unwrap();
    assert_eq!(index, doc.index_of("intro").unwrap() + 1);
    let card = &result.final_document.components[index];
    assert_eq!(card.kind, ComponentType::Card);
    assert_eq!(card.visual_number("padding"), Some(19.0));
    assert_eq!(result.final_document.components.len(), doc.components.len() + 1);
}

#[test]
fn hide_then_show_other_component() {
    let doc = landing_page();
    let result = pipeline().execute("hide the footer, then show the logo", &doc);
    assert_eq!(result.status, ExecutionStatus::Success);
    assert!(!result.final_document.component("footer").unwrap().is_visible());
    assert!(result.final_document.component("logo").unwrap().is_visible());
}

#[test]
fn keep_completed_policy_keeps_earlier_steps() {
    let pipeline = EditPipeline::new(
        PipelineConfig::default().with_failure_policy(FailurePolicy::KeepCompleted),
    );
    let doc = header_and_cta();
    let result = pipeline.execute("make the header bold and set the button background to white", &doc);

    assert_eq!(result.status, ExecutionStatus::Partial);
    assert_eq!(result.steps_executed, 1);
    assert!(result.rollback_triggered);
    let header = result.final_document.component("header").unwrap();
    assert_eq!(header.visual_number("font_weight"), Some(700.0));
    assert_eq!(result.final_document.component("cta"), doc.component("cta"));
}

#[test]
fn configuration_from_toml_drives_planning() {
    let config = PipelineConfig::from_toml_str(
        r##"
        resize_step_percent = 50.0

        [colors]
        brand = "#7c3aed"
        "##,
    )
    .unwrap();
    let pipeline = EditPipeline::new(config);

    let result = pipeline.execute("make the button bigger", &single_button());
    assert_eq!(result.final_document.component("cta").unwrap().bbox.height, 75.0);

    let result = pipeline.execute("make the button brand", &single_button());
    assert_eq!(result.status, ExecutionStatus::Success, "{:?}", result.reasoning_trace);
    assert_eq!(
        result.final_document.component("cta").unwrap().visual_str("bg_color"),
        Some("#7c3aed")
    );
}

#[test]
fn result_serializes_for_callers() {
    let result = pipeline().execute("Make button bigger", &single_button());
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["step_results"][0]["kind"], "resize");
    assert_eq!(json["step_results"][0]["patches"][0]["path"], "/components/0/bbox");
    assert_eq!(json["final_document"]["metadata"]["updated_at"], "2024-05-01T12:00:00Z");
}

#[test]
fn overflowing_move_distance_is_not_an_edit() {
    let doc = header_and_cta();
    let command = format!("move the button down by {}", "9".repeat(400));
    let result = pipeline().execute(&command, &doc);
    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.final_document, doc);
}

#[test]
fn non_finite_geometry_is_rolled_back() {
    let doc = header_and_cta();
    let far = "9".repeat(308);
    let command = format!("move the button down by {far}, then move it down by {far}");
    let result = pipeline().execute(&command, &doc);

    assert_eq!(result.status, ExecutionStatus::Failed, "{:?}", result.reasoning_trace);
    assert_eq!(result.steps_executed, 1);
    assert!(result.rollback_triggered);
    assert!(result.step_results[1].error.as_deref().unwrap().contains("non_finite"));
    assert_eq!(result.final_document, doc);

    let json = serde_json::to_string(&result.final_document).unwrap();
    let back: Document = serde_json::from_str(&json).unwrap();
    assert_eq!(back, doc);
}

#[test]
fn text_of_a_button_edits_the_button() {
    let doc = header_and_cta();
    let result = pipeline().execute("change the text of the button to Buy now", &doc);
    assert_eq!(result.status, ExecutionStatus::Success);
    assert_eq!(result.step_results[0].target.as_deref(), Some("'cta'"));
    let cta = result.final_document.component("cta").unwrap();
    assert_eq!(cta.text.as_deref(), Some("Buy now"));
    assert_eq!(result.final_document.component("header"), doc.component("header"));

    let result = pipeline().execute("make the text on the button bold", &doc);
    assert_eq!(result.status, ExecutionStatus::Success);
    let cta = result.final_document.component("cta").unwrap();
    assert_eq!(cta.visual_number("font_weight"), Some(700.0));
    assert_eq!(result.final_document.component("header"), doc.component("header"));
}

#[test]
fn shared_object_conflict_is_explained() {
    let doc = single_button();
    let result = pipeline().execute("Delete and resize the button", &doc);
    assert_eq!(result.status, ExecutionStatus::Conflicted);
    assert_eq!(result.steps_executed, 0);
    assert_eq!(result.conflicts.len(), 1);
    assert_eq!(result.conflicts[0].referent, "cta");
    assert!(result.reasoning_trace.mentions("conflict"));
    assert_eq!(result.final_document, doc);
}

#[test]
fn existing_errors_elsewhere_block_every_edit() {
    let mut doc = header_and_cta();
    doc.components.push(Component::new(
        "tiny",
        ComponentType::Button,
        BBox::new(600.0, 300.0, 100.0, 40.0),
    ));
    let result = pipeline().execute("make the header bold", &doc);

    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.step_results[0].status, StepStatus::Failed);
    assert!(result.step_results[0].error.as_deref().unwrap().contains("touch_target"));
    assert_eq!(result.final_document, doc);
}
