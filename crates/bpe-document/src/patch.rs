//! Patches: the only way a document changes
//!
//! A [`Patch`] is one `add`/`replace`/`remove` operation at a [`PatchPath`].
//! Patches are applied to a clone; [`apply_patches`] takes the source
//! document by shared reference and returns a new owned value.
//!
//! # Allow-list
//! Every patch is checked against the mutable-field allow-list before it is
//! applied. Whole-component entries may only be inserted (`add`) or removed
//! (`remove`); replacing a component wholesale would bypass the field list
//! and is refused.

use crate::document::{BBox, Component, Document, Scalar};
use crate::path::PatchPath;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Patch operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    /// Insert a component, or upsert a map entry / text
    Add,
    /// Overwrite an existing value
    Replace,
    /// Delete a component, map entry or text
    Remove,
}

impl Display for PatchOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "add",
            Self::Replace => "replace",
            Self::Remove => "remove",
        })
    }
}

/// Payload carried by `add`/`replace`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatchValue {
    Scalar(Scalar),
    BBox(BBox),
    Component(Box<Component>),
}

impl From<Scalar> for PatchValue {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

impl From<BBox> for PatchValue {
    fn from(value: BBox) -> Self {
        Self::BBox(value)
    }
}

impl From<Component> for PatchValue {
    fn from(value: Component) -> Self {
        Self::Component(Box::new(value))
    }
}

/// A single operation against a document path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub op: PatchOp,
    pub path: PatchPath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<PatchValue>,
}

impl Patch {
    /// Replace the value at `path`
    #[inline]
    #[must_use]
    pub fn replace(path: PatchPath, value: impl Into<PatchValue>) -> Self {
        Self {
            op: PatchOp::Replace,
            path,
            value: Some(value.into()),
        }
    }

    /// Add (insert or upsert) the value at `path`
    #[inline]
    #[must_use]
    pub fn add(path: PatchPath, value: impl Into<PatchValue>) -> Self {
        Self {
            op: PatchOp::Add,
            path,
            value: Some(value.into()),
        }
    }

    /// Remove the value at `path`
    #[inline]
    #[must_use]
    pub fn remove(path: PatchPath) -> Self {
        Self {
            op: PatchOp::Remove,
            path,
            value: None,
        }
    }

    /// Whether this patch inserts or removes a whole component
    #[inline]
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(self.path, PatchPath::Component(_))
    }

    /// Check the allow-list and op/value shape without touching a document
    ///
    /// # Errors
    /// Returns [`PatchError::ForbiddenField`] for anything off the allow-list,
    /// or a shape error when the value does not fit the path.
    pub fn validate(&self) -> Result<(), PatchError> {
        if !self.path.is_allow_listed() {
            return Err(PatchError::ForbiddenField(self.path.clone()));
        }

        match (&self.path, self.op) {
            (PatchPath::Component(_), PatchOp::Replace) => {
                return Err(PatchError::ForbiddenField(self.path.clone()));
            }
            (PatchPath::Bbox(_), PatchOp::Add | PatchOp::Remove) => {
                return Err(PatchError::InvalidOperation {
                    op: self.op,
                    path: self.path.clone(),
                });
            }
            _ => {}
        }

        if self.op == PatchOp::Remove {
            return match self.value {
                None => Ok(()),
                Some(_) => Err(PatchError::UnexpectedValue(self.path.clone())),
            };
        }

        let value = self
            .value
            .as_ref()
            .ok_or_else(|| PatchError::MissingValue(self.path.clone()))?;

        let fits = match (&self.path, value) {
            (PatchPath::Component(_), PatchValue::Component(_))
            | (PatchPath::Bbox(_), PatchValue::BBox(_))
            | (PatchPath::Text(_), PatchValue::Scalar(Scalar::Text(_)))
            | (PatchPath::Token(_), PatchValue::Scalar(_)) => true,
            (PatchPath::Visual(_, key), PatchValue::Scalar(scalar)) => {
                visual_value_fits(key, scalar)
            }
            _ => false,
        };

        if fits {
            Ok(())
        } else {
            Err(PatchError::TypeMismatch {
                path: self.path.clone(),
                found: value_kind(value),
            })
        }
    }
}

impl Display for Patch {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(PatchValue::Scalar(s)) => write!(f, "{} {} = {}", self.op, self.path, s),
            Some(PatchValue::BBox(b)) => write!(
                f,
                "{} {} = [{}, {}, {}, {}]",
                self.op, self.path, b.x, b.y, b.width, b.height
            ),
            Some(PatchValue::Component(c)) => {
                write!(f, "{} {} = <{} '{}'>", self.op, self.path, c.kind, c.id)
            }
            None => write!(f, "{} {}", self.op, self.path),
        }
    }
}

fn visual_value_fits(key: &str, value: &Scalar) -> bool {
    match key {
        "visible" => matches!(value, Scalar::Bool(_)),
        "color" | "bg_color" => matches!(value, Scalar::Text(_)),
        _ => matches!(value, Scalar::Number(_)),
    }
}

fn value_kind(value: &PatchValue) -> &'static str {
    match value {
        PatchValue::Scalar(s) => s.type_name(),
        PatchValue::BBox(_) => "bbox",
        PatchValue::Component(_) => "component",
    }
}

/// Apply a patch set to a clone of `document`
///
/// Patches apply in order; each sees the result of the previous one. The
/// source document is never modified; on error the partially patched clone
/// is dropped.
///
/// # Errors
/// Returns the first patch that fails validation or cannot be applied.
pub fn apply_patches(document: &Document, patches: &[Patch]) -> Result<Document, PatchError> {
    let mut working = document.clone();
    for patch in patches {
        apply_one(&mut working, patch)?;
    }
    Ok(working)
}

fn apply_one(doc: &mut Document, patch: &Patch) -> Result<(), PatchError> {
    patch.validate()?;

    let out_of_range = |index: usize, len: usize| PatchError::IndexOutOfRange { index, len };
    let len = doc.components.len();

    match (&patch.path, patch.op, patch.value.as_ref()) {
        (PatchPath::Component(i), PatchOp::Add, Some(PatchValue::Component(c))) => {
            if *i > len {
                return Err(out_of_range(*i, len));
            }
            if doc.component(&c.id).is_some() {
                return Err(PatchError::DuplicateId(c.id.clone()));
            }
            doc.components.insert(*i, (**c).clone());
        }
        (PatchPath::Component(i), PatchOp::Remove, None) => {
            if *i >= len {
                return Err(out_of_range(*i, len));
            }
            doc.components.remove(*i);
        }
        (PatchPath::Text(i), op, value) => {
            let component = doc.components.get_mut(*i).ok_or_else(|| out_of_range(*i, len))?;
            match (op, value) {
                (PatchOp::Remove, _) => component.text = None,
                (_, Some(PatchValue::Scalar(Scalar::Text(s)))) => component.text = Some(s.clone()),
                _ => return Err(PatchError::MissingValue(patch.path.clone())),
            }
        }
        (PatchPath::Bbox(i), PatchOp::Replace, Some(PatchValue::BBox(b))) => {
            let component = doc.components.get_mut(*i).ok_or_else(|| out_of_range(*i, len))?;
            component.bbox = *b;
        }
        (PatchPath::Visual(i, key), op, value) => {
            let component = doc.components.get_mut(*i).ok_or_else(|| out_of_range(*i, len))?;
            upsert_entry(&mut component.visual, key, op, value, &patch.path)?;
        }
        (PatchPath::Token(key), op, value) => {
            upsert_entry(&mut doc.tokens, key, op, value, &patch.path)?;
        }
        _ => {
            return Err(PatchError::InvalidOperation {
                op: patch.op,
                path: patch.path.clone(),
            })
        }
    }
    Ok(())
}

fn upsert_entry(
    map: &mut std::collections::BTreeMap<String, Scalar>,
    key: &str,
    op: PatchOp,
    value: Option<&PatchValue>,
    path: &PatchPath,
) -> Result<(), PatchError> {
    match (op, value) {
        (PatchOp::Remove, _) => {
            map.remove(key)
                .ok_or_else(|| PatchError::MissingEntry(path.clone()))?;
        }
        (PatchOp::Replace, Some(PatchValue::Scalar(s))) => {
            let slot = map
                .get_mut(key)
                .ok_or_else(|| PatchError::MissingEntry(path.clone()))?;
            *slot = s.clone();
        }
        (PatchOp::Add, Some(PatchValue::Scalar(s))) => {
            map.insert(key.to_string(), s.clone());
        }
        _ => return Err(PatchError::MissingValue(path.clone())),
    }
    Ok(())
}

/// Errors applying or validating patches
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatchError {
    /// Path is outside the mutable-field allow-list
    #[error("field is not mutable: {0}")]
    ForbiddenField(PatchPath),

    /// Operation not supported at this path
    #[error("invalid operation '{op}' at {path}")]
    InvalidOperation { op: PatchOp, path: PatchPath },

    /// `add`/`replace` without a value
    #[error("missing value for {0}")]
    MissingValue(PatchPath),

    /// `remove` carrying a value
    #[error("unexpected value for remove at {0}")]
    UnexpectedValue(PatchPath),

    /// Value does not fit the addressed field
    #[error("type mismatch at {path}: got {found}")]
    TypeMismatch { path: PatchPath, found: &'static str },

    /// Component index past the end of the list
    #[error("component index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// `replace`/`remove` of a map entry that does not exist
    #[error("no entry at {0}")]
    MissingEntry(PatchPath),

    /// Inserted component reuses an existing id
    #[error("component id already exists: {0}")]
    DuplicateId(String),
}
