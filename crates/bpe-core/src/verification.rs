//! Post-simulation verification
//!
//! Checks that a simulated step changed only what its patches name:
//! surviving ids keep their positions, untouched fields are byte-equal and
//! the component count moves only for create/delete steps.

use crate::error::VerificationError;
use crate::types::IntentKind;
use bpe_document::{Component, Document, Patch, PatchOp, PatchPath, Scalar};
use std::collections::{BTreeMap, BTreeSet};

/// Diff-based step verifier
#[derive(Debug, Clone, Copy, Default)]
pub struct Verifier;

impl Verifier {
    /// Create new verifier
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Verify `after` is `before` with exactly `patches` applied
    ///
    /// # Errors
    /// Returns the first invariant the step broke
    pub fn verify(
        &self,
        kind: IntentKind,
        before: &Document,
        after: &Document,
        patches: &[Patch],
    ) -> Result<(), VerificationError> {
        after.validate_structure()?;

        let touched: BTreeSet<&PatchPath> = patches.iter().map(|p| &p.path).collect();
        check_tokens(&before.tokens, &after.tokens, &touched)?;

        if kind.is_structural() {
            return verify_structural(before, after, patches);
        }

        if before.components.len() != after.components.len() {
            return Err(VerificationError::CountChanged {
                kind,
                before: before.components.len(),
                after: after.components.len(),
            });
        }

        for (index, (old, new)) in before.components.iter().zip(&after.components).enumerate() {
            if old.id != new.id {
                return Err(VerificationError::IdChanged {
                    index,
                    before: old.id.clone(),
                    after: new.id.clone(),
                });
            }
            if let Some(path) = changed_field(index, old, new, &touched) {
                return Err(VerificationError::UntouchedChange(path));
            }
        }
        Ok(())
    }
}

/// Remove/insert: survivors must be exactly the old components in order
fn verify_structural(
    before: &Document,
    after: &Document,
    patches: &[Patch],
) -> Result<(), VerificationError> {
    let mut expected: Vec<&Component> = before.components.iter().collect();
    let mut inserted = BTreeSet::new();
    for patch in patches {
        match (&patch.path, patch.op) {
            (PatchPath::Component(i), PatchOp::Remove) if *i < expected.len() => {
                expected.remove(*i);
            }
            (PatchPath::Component(i), PatchOp::Add) => {
                inserted.insert(*i);
            }
            _ => return Err(VerificationError::Disturbed),
        }
    }

    let survivors: Vec<&Component> = after
        .components
        .iter()
        .enumerate()
        .filter(|(i, _)| !inserted.contains(i))
        .map(|(_, c)| c)
        .collect();

    if survivors.len() + inserted.len() != after.components.len() || survivors != expected {
        return Err(VerificationError::Disturbed);
    }
    Ok(())
}

fn check_tokens(
    before: &BTreeMap<String, Scalar>,
    after: &BTreeMap<String, Scalar>,
    touched: &BTreeSet<&PatchPath>,
) -> Result<(), VerificationError> {
    let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    for key in keys {
        if before.get(key) != after.get(key) {
            let path = PatchPath::token(key.as_str());
            if !touched.contains(&path) {
                return Err(VerificationError::UntouchedChange(path));
            }
        }
    }
    Ok(())
}

fn changed_field(
    index: usize,
    old: &Component,
    new: &Component,
    touched: &BTreeSet<&PatchPath>,
) -> Option<PatchPath> {
    let mut changed = Vec::new();
    if old.kind != new.kind || old.role != new.role {
        changed.push(PatchPath::Component(index));
    }
    if old.text != new.text {
        changed.push(PatchPath::Text(index));
    }
    if old.bbox != new.bbox {
        changed.push(PatchPath::Bbox(index));
    }
    let keys: BTreeSet<&String> = old.visual.keys().chain(new.visual.keys()).collect();
    for key in keys {
        if old.visual.get(key) != new.visual.get(key) {
            changed.push(PatchPath::visual(index, key.as_str()));
        }
    }
    changed.into_iter().find(|path| !touched.contains(path))
}
