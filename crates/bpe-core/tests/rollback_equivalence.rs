//! Full-copy and delta snapshots must restore identical documents

use bpe_core::{
    DeltaStore, EditPipeline, FailurePolicy, FullCopyStore, PipelineConfig, RollbackManager,
    SnapshotMode, SnapshotStore,
};
use bpe_document::{BBox, Component, ComponentType, Document};
use bpe_test_utils::{arb_command, arb_document, landing_page};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Mutation {
    Resize(usize, f64),
    Remove(usize),
    Insert(usize),
    Recolor(usize, &'static str),
    Token(f64),
    Metadata(u8),
    Hide(usize),
}

fn mutation() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        (any::<usize>(), 1.0f64..500.0).prop_map(|(i, h)| Mutation::Resize(i, h)),
        any::<usize>().prop_map(Mutation::Remove),
        any::<usize>().prop_map(Mutation::Insert),
        (any::<usize>(), prop::sample::select(vec!["#000000", "#22c55e", "#ef4444"]))
            .prop_map(|(i, c)| Mutation::Recolor(i, c)),
        (0.0f64..32.0).prop_map(Mutation::Token),
        any::<u8>().prop_map(Mutation::Metadata),
        any::<usize>().prop_map(Mutation::Hide),
    ]
}

fn apply(doc: &mut Document, mutation: &Mutation) {
    let len = doc.components.len();
    match *mutation {
        Mutation::Resize(i, h) if len > 0 => doc.components[i % len].bbox.height = h,
        Mutation::Remove(i) if len > 1 => {
            doc.components.remove(i % len);
        }
        Mutation::Insert(i) => {
            let id = doc.fresh_id(ComponentType::Card);
            let card = Component::new(id, ComponentType::Card, BBox::new(0.0, 0.0, 200.0, 120.0));
            doc.components.insert(i % (len + 1), card);
        }
        Mutation::Recolor(i, color) if len > 0 => {
            doc.components[i % len]
                .visual
                .insert("bg_color".to_string(), color.into());
        }
        Mutation::Token(spacing) => {
            doc.tokens.insert("spacing".to_string(), spacing.into());
        }
        Mutation::Metadata(n) => {
            doc.metadata.insert("revision".to_string(), n.to_string());
        }
        Mutation::Hide(i) if len > 0 => {
            doc.components[i % len]
                .visual
                .insert("visible".to_string(), false.into());
        }
        _ => {}
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn stores_restore_the_same_history(
        doc in arb_document(),
        mutations in prop::collection::vec(mutation(), 0..12),
    ) {
        let mut full = FullCopyStore::new();
        let mut delta = DeltaStore::new();
        let mut history = Vec::new();

        let mut current = doc;
        full.push(&current);
        delta.push(&current);
        history.push(current.clone());
        for m in &mutations {
            apply(&mut current, m);
            full.push(&current);
            delta.push(&current);
            history.push(current.clone());
        }

        prop_assert_eq!(full.len(), history.len());
        prop_assert_eq!(delta.len(), history.len());
        for (position, expected) in history.iter().enumerate() {
            let from_full = full.restore(position).unwrap();
            let from_delta = delta.restore(position).unwrap();
            prop_assert_eq!(&from_full, expected);
            prop_assert_eq!(&from_delta, expected);
            prop_assert_eq!(
                from_full.canonical_json().unwrap(),
                from_delta.canonical_json().unwrap()
            );
        }
    }

    #[test]
    fn snapshot_modes_give_identical_results(doc in arb_document(), command in arb_command()) {
        for policy in [FailurePolicy::AllOrNothing, FailurePolicy::KeepCompleted] {
            let config = PipelineConfig::default().with_failure_policy(policy);
            let full = EditPipeline::new(config.clone().with_snapshot_mode(SnapshotMode::Full))
                .execute(&command, &doc);
            let delta = EditPipeline::new(config.with_snapshot_mode(SnapshotMode::Delta))
                .execute(&command, &doc);

            prop_assert_eq!(full.status, delta.status);
            prop_assert_eq!(full.steps_executed, delta.steps_executed);
            prop_assert_eq!(&full.final_document, &delta.final_document);
        }
    }
}

#[test]
fn manager_rolls_back_to_any_step_in_both_modes() {
    for mode in [SnapshotMode::Full, SnapshotMode::Delta] {
        let mut manager = RollbackManager::new(mode);
        manager.begin();

        let mut doc = landing_page();
        let mut states = Vec::new();
        for (step, m) in [
            Mutation::Resize(2, 96.0),
            Mutation::Insert(3),
            Mutation::Hide(0),
            Mutation::Remove(4),
        ]
        .iter()
        .enumerate()
        {
            manager.capture(step, &doc);
            states.push(doc.clone());
            apply(&mut doc, m);
        }

        assert_eq!(manager.snapshots().len(), 4);
        for (step, expected) in states.iter().enumerate() {
            assert_eq!(&manager.rollback_to_step(step).unwrap(), expected, "{mode:?}");
        }
        assert_eq!(&manager.rollback_to_latest().unwrap(), &states[3]);
    }
}
