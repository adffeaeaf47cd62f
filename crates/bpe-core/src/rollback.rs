//! Snapshots and rollback
//!
//! [`RollbackManager`] keeps one snapshot per step, taken immediately before
//! the step runs. Storage is pluggable through [`SnapshotStore`]:
//!
//! - [`FullCopyStore`] keeps an independent clone per snapshot
//! - [`DeltaStore`] keeps one baseline plus a chain of field-level deltas
//!
//! Both reconstruct identical documents; every restore is checked against
//! the [`ContentHash`] recorded at capture time.

use crate::config::SnapshotMode;
use crate::error::RollbackError;
use bpe_document::{BBox, Component, ComponentType, ContentHash, Document, Role, Scalar};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

/// Snapshot storage strategy
pub trait SnapshotStore: Send + Debug {
    /// Append a snapshot of `document`
    fn push(&mut self, document: &Document);

    /// Independent copy of the snapshot at `position`
    fn restore(&self, position: usize) -> Option<Document>;

    /// Number of snapshots held
    fn len(&self) -> usize;

    /// Check if store is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every snapshot
    fn clear(&mut self);
}

/// Full clone per snapshot
#[derive(Debug, Clone, Default)]
pub struct FullCopyStore {
    snapshots: Vec<Document>,
}

impl FullCopyStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for FullCopyStore {
    fn push(&mut self, document: &Document) {
        self.snapshots.push(document.clone());
    }

    fn restore(&self, position: usize) -> Option<Document> {
        self.snapshots.get(position).cloned()
    }

    fn len(&self) -> usize {
        self.snapshots.len()
    }

    fn clear(&mut self) {
        self.snapshots.clear();
    }
}

/// Where a component in a delta's order comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Index into the previous state
    Kept(usize),
    /// Index into the arena of inserted components
    Inserted(usize),
}

/// Changed fields of one component, by position in the new order
#[derive(Debug, Clone, Default)]
struct FieldChanges {
    kind: Option<ComponentType>,
    role: Option<Option<Role>>,
    text: Option<Option<String>>,
    bbox: Option<BBox>,
    visual: Vec<(String, Option<Scalar>)>,
}

impl FieldChanges {
    fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.role.is_none()
            && self.text.is_none()
            && self.bbox.is_none()
            && self.visual.is_empty()
    }

    fn apply(&self, component: &mut Component) {
        if let Some(kind) = self.kind {
            component.kind = kind;
        }
        if let Some(role) = self.role {
            component.role = role;
        }
        if let Some(text) = &self.text {
            component.text.clone_from(text);
        }
        if let Some(bbox) = self.bbox {
            component.bbox = bbox;
        }
        apply_entries(&mut component.visual, &self.visual);
    }
}

/// Difference between one snapshot and the one before it
#[derive(Debug, Clone)]
enum Delta {
    /// Ids were not unique; no id-based diff possible
    Full(Document),
    Changes {
        /// New component order; `None` when ids and order are unchanged
        order: Option<Vec<Slot>>,
        components: Vec<(usize, FieldChanges)>,
        tokens: Vec<(String, Option<Scalar>)>,
        metadata: Option<BTreeMap<String, String>>,
    },
}

/// Baseline plus delta chain
///
/// Inserted components live in an arena and are referenced by index from
/// the delta that introduced them. Reconstruction replays the chain from the
/// baseline, so restores cost O(chain length).
#[derive(Debug, Clone, Default)]
pub struct DeltaStore {
    baseline: Option<Document>,
    /// Most recent state, kept to diff the next push against
    latest: Option<Document>,
    deltas: Vec<Delta>,
    arena: Vec<Component>,
}

impl DeltaStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of full copies held (baseline plus fallbacks)
    #[must_use]
    pub fn full_copies(&self) -> usize {
        usize::from(self.baseline.is_some())
            + self.deltas.iter().filter(|d| matches!(d, Delta::Full(_))).count()
    }

    fn diff(&mut self, previous: &Document, next: &Document) -> Delta {
        if !unique_ids(previous) || !unique_ids(next) {
            return Delta::Full(next.clone());
        }

        let previous_index: BTreeMap<&str, usize> =
            previous.ids().enumerate().map(|(i, id)| (id, i)).collect();

        let mut order = Vec::with_capacity(next.components.len());
        let mut components = Vec::new();
        for (position, component) in next.components.iter().enumerate() {
            match previous_index.get(component.id.as_str()) {
                Some(&i) => {
                    order.push(Slot::Kept(i));
                    let changes = diff_component(&previous.components[i], component);
                    if !changes.is_empty() {
                        components.push((position, changes));
                    }
                }
                None => {
                    order.push(Slot::Inserted(self.arena.len()));
                    self.arena.push(component.clone());
                }
            }
        }

        let unchanged_order = order.len() == previous.components.len()
            && order
                .iter()
                .enumerate()
                .all(|(position, slot)| *slot == Slot::Kept(position));

        Delta::Changes {
            order: (!unchanged_order).then_some(order),
            components,
            tokens: diff_entries(&previous.tokens, &next.tokens),
            metadata: (previous.metadata != next.metadata).then(|| next.metadata.clone()),
        }
    }

    fn replay(&self, state: &Document, delta: &Delta) -> Document {
        match delta {
            Delta::Full(document) => document.clone(),
            Delta::Changes {
                order,
                components,
                tokens,
                metadata,
            } => {
                let mut next = state.clone();
                if let Some(order) = order {
                    next.components = order
                        .iter()
                        .filter_map(|slot| match slot {
                            Slot::Kept(i) => state.components.get(*i).cloned(),
                            Slot::Inserted(i) => self.arena.get(*i).cloned(),
                        })
                        .collect();
                }
                for (position, changes) in components {
                    if let Some(component) = next.components.get_mut(*position) {
                        changes.apply(component);
                    }
                }
                apply_entries(&mut next.tokens, tokens);
                if let Some(metadata) = metadata {
                    next.metadata.clone_from(metadata);
                }
                next
            }
        }
    }
}

impl SnapshotStore for DeltaStore {
    fn push(&mut self, document: &Document) {
        match self.latest.take() {
            None => {
                self.baseline = Some(document.clone());
            }
            Some(previous) => {
                let delta = self.diff(&previous, document);
                self.deltas.push(delta);
            }
        }
        self.latest = Some(document.clone());
    }

    fn restore(&self, position: usize) -> Option<Document> {
        if position >= self.len() {
            return None;
        }
        let mut state = self.baseline.clone()?;
        for delta in &self.deltas[..position] {
            state = self.replay(&state, delta);
        }
        Some(state)
    }

    fn len(&self) -> usize {
        usize::from(self.baseline.is_some()) + self.deltas.len()
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

fn unique_ids(document: &Document) -> bool {
    let mut seen = BTreeSet::new();
    document.ids().all(|id| seen.insert(id))
}

/// Bitwise equality so `-0.0`/`0.0` and NaN payloads survive replay
fn same_f64(a: f64, b: f64) -> bool {
    a.to_bits() == b.to_bits()
}

fn same_bbox(a: &BBox, b: &BBox) -> bool {
    same_f64(a.x, b.x) && same_f64(a.y, b.y) && same_f64(a.width, b.width) && same_f64(a.height, b.height)
}

fn same_scalar(a: &Scalar, b: &Scalar) -> bool {
    match (a, b) {
        (Scalar::Number(x), Scalar::Number(y)) => same_f64(*x, *y),
        _ => a == b,
    }
}

fn diff_component(old: &Component, new: &Component) -> FieldChanges {
    FieldChanges {
        kind: (old.kind != new.kind).then_some(new.kind),
        role: (old.role != new.role).then_some(new.role),
        text: (old.text != new.text).then(|| new.text.clone()),
        bbox: (!same_bbox(&old.bbox, &new.bbox)).then_some(new.bbox),
        visual: diff_entries(&old.visual, &new.visual),
    }
}

fn diff_entries(
    old: &BTreeMap<String, Scalar>,
    new: &BTreeMap<String, Scalar>,
) -> Vec<(String, Option<Scalar>)> {
    let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    keys.into_iter()
        .filter_map(|key| match (old.get(key), new.get(key)) {
            (Some(a), Some(b)) if same_scalar(a, b) => None,
            (None, None) => None,
            (_, value) => Some((key.clone(), value.cloned())),
        })
        .collect()
}

fn apply_entries(map: &mut BTreeMap<String, Scalar>, entries: &[(String, Option<Scalar>)]) {
    for (key, value) in entries {
        match value {
            Some(value) => {
                map.insert(key.clone(), value.clone());
            }
            None => {
                map.remove(key);
            }
        }
    }
}

/// Identity of one captured snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotMeta {
    /// Step about to run when the snapshot was taken
    pub step: usize,
    pub hash: ContentHash,
}

/// Per-invocation snapshot stack
#[derive(Debug)]
pub struct RollbackManager {
    store: Box<dyn SnapshotStore>,
    snapshots: Vec<SnapshotMeta>,
}

impl RollbackManager {
    /// Create with the given storage mode
    #[must_use]
    pub fn new(mode: SnapshotMode) -> Self {
        let store: Box<dyn SnapshotStore> = match mode {
            SnapshotMode::Full => Box::new(FullCopyStore::new()),
            SnapshotMode::Delta => Box::new(DeltaStore::new()),
        };
        Self::with_store(store)
    }

    /// Create with a custom store
    #[must_use]
    pub fn with_store(store: Box<dyn SnapshotStore>) -> Self {
        Self {
            store,
            snapshots: Vec::new(),
        }
    }

    /// Start a new invocation, dropping all snapshots
    pub fn begin(&mut self) {
        self.store.clear();
        self.snapshots.clear();
    }

    /// Capture `document` as the state before `step`
    pub fn capture(&mut self, step: usize, document: &Document) {
        let hash = ContentHash::of_document(document);
        self.store.push(document);
        self.snapshots.push(SnapshotMeta { step, hash });
        tracing::debug!(step, hash = %hash.short(), "snapshot captured");
    }

    /// Captured snapshots, oldest first
    #[inline]
    #[must_use]
    pub fn snapshots(&self) -> &[SnapshotMeta] {
        &self.snapshots
    }

    /// State before the most recently started step
    ///
    /// # Errors
    /// Returns error if nothing was captured or the snapshot is corrupt
    pub fn rollback_to_latest(&self) -> Result<Document, RollbackError> {
        let position = self.snapshots.len().checked_sub(1).ok_or(RollbackError::Empty)?;
        self.restore(position)
    }

    /// State as of just before `step`
    ///
    /// # Errors
    /// Returns error if no snapshot was taken before `step` or it is corrupt
    pub fn rollback_to_step(&self, step: usize) -> Result<Document, RollbackError> {
        let position = self
            .snapshots
            .iter()
            .position(|meta| meta.step == step)
            .ok_or(RollbackError::UnknownStep(step))?;
        self.restore(position)
    }

    fn restore(&self, position: usize) -> Result<Document, RollbackError> {
        let meta = self.snapshots.get(position).ok_or(RollbackError::Empty)?;
        let corrupt = RollbackError::Corrupt { step: meta.step };
        let document = self.store.restore(position).ok_or_else(|| corrupt.clone())?;
        if ContentHash::of_document(&document) != meta.hash {
            tracing::warn!(step = meta.step, "snapshot failed integrity check");
            return Err(corrupt);
        }
        tracing::info!(step = meta.step, "rolled back");
        Ok(document)
    }
}
