//! Blueprint document model
//!
//! A [`Document`] is a flat token table plus an ordered list of
//! [`Component`]s. Component order is render order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};

/// Scalar value used for tokens and visual style entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Boolean flag (e.g. `visible`)
    Bool(bool),
    /// Numeric value (units, weights, sizes)
    Number(f64),
    /// String value (colors, keywords)
    Text(String),
}

impl Scalar {
    /// Numeric view, if this is a number
    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String view, if this is text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean view, if this is a flag
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Bounding box: x, y, width, height
///
/// Serialized as a 4-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BBox {
    /// Create a new box
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge
    #[inline]
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge
    #[inline]
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Width and height both strictly positive
    #[inline]
    #[must_use]
    pub fn has_positive_size(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Interiors intersect (touching edges do not count)
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// `other` lies entirely within `self`
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

impl From<[f64; 4]> for BBox {
    fn from([x, y, width, height]: [f64; 4]) -> Self {
        Self::new(x, y, width, height)
    }
}

impl From<BBox> for [f64; 4] {
    fn from(b: BBox) -> Self {
        [b.x, b.y, b.width, b.height]
    }
}

/// Closed set of component kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Text,
    Button,
    Image,
    Container,
    Input,
    Icon,
    Divider,
    Card,
}

impl ComponentType {
    /// Every kind, in declaration order
    pub const ALL: [Self; 8] = [
        Self::Text,
        Self::Button,
        Self::Image,
        Self::Container,
        Self::Input,
        Self::Icon,
        Self::Divider,
        Self::Card,
    ];

    /// Keyword used in ids and commands
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Button => "button",
            Self::Image => "image",
            Self::Container => "container",
            Self::Input => "input",
            Self::Icon => "icon",
            Self::Divider => "divider",
            Self::Card => "card",
        }
    }

    /// Exact keyword lookup (lowercase input expected)
    #[must_use]
    pub fn from_keyword(word: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == word)
    }
}

impl Display for ComponentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic role tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Hero,
    Cta,
    Content,
    Footer,
    Navigation,
    Media,
    #[serde(other)]
    Other,
}

impl Role {
    /// Every role, in declaration order
    pub const ALL: [Self; 7] = [
        Self::Hero,
        Self::Cta,
        Self::Content,
        Self::Footer,
        Self::Navigation,
        Self::Media,
        Self::Other,
    ];

    /// Keyword used in commands
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hero => "hero",
            Self::Cta => "cta",
            Self::Content => "content",
            Self::Footer => "footer",
            Self::Navigation => "navigation",
            Self::Media => "media",
            Self::Other => "other",
        }
    }

    /// Exact keyword lookup (lowercase input expected)
    #[must_use]
    pub fn from_keyword(word: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .filter(|r| *r != Self::Other)
            .find(|r| r.as_str() == word)
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One element of the blueprint
///
/// # Invariants
/// - `id` is unique within its document and never changes once created
/// - `bbox` has positive width and height
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ComponentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub bbox: BBox,
    #[serde(default)]
    pub visual: BTreeMap<String, Scalar>,
}

impl Component {
    /// Create a component with no role, text or style
    #[must_use]
    pub fn new(id: impl Into<String>, kind: ComponentType, bbox: BBox) -> Self {
        Self {
            id: id.into(),
            kind,
            role: None,
            text: None,
            bbox,
            visual: BTreeMap::new(),
        }
    }

    /// With role
    #[inline]
    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// With text content
    #[inline]
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// With a visual style entry
    #[inline]
    #[must_use]
    pub fn with_visual(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.visual.insert(key.into(), value.into());
        self
    }

    /// Visual entry as a number
    #[inline]
    #[must_use]
    pub fn visual_number(&self, key: &str) -> Option<f64> {
        self.visual.get(key).and_then(Scalar::as_f64)
    }

    /// Visual entry as a string
    #[inline]
    #[must_use]
    pub fn visual_str(&self, key: &str) -> Option<&str> {
        self.visual.get(key).and_then(Scalar::as_str)
    }

    /// Buttons, inputs and anything playing the CTA role
    #[inline]
    #[must_use]
    pub fn is_interactive(&self) -> bool {
        matches!(self.kind, ComponentType::Button | ComponentType::Input)
            || self.role == Some(Role::Cta)
    }

    /// Hidden only when `visual.visible` is explicitly false
    #[inline]
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visual
            .get("visible")
            .and_then(Scalar::as_bool)
            .unwrap_or(true)
    }
}

/// The versioned blueprint artifact
///
/// Callers own their documents; the edit pipeline only reads them and
/// produces new, independently-owned values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub tokens: BTreeMap<String, Scalar>,
    #[serde(default)]
    pub components: Vec<Component>,
    /// Free-form metadata (timestamps, authorship). Not content.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    /// Create document from components
    #[must_use]
    pub fn new(components: Vec<Component>) -> Self {
        Self {
            tokens: BTreeMap::new(),
            components,
            metadata: BTreeMap::new(),
        }
    }

    /// With a token entry
    #[inline]
    #[must_use]
    pub fn with_token(mut self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.tokens.insert(key.into(), value.into());
        self
    }

    /// With a metadata entry
    #[inline]
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Lookup component by id
    #[must_use]
    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.id == id)
    }

    /// Render-order index of a component id
    #[must_use]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.components.iter().position(|c| c.id == id)
    }

    /// Component ids in render order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(|c| c.id.as_str())
    }

    /// Smallest unused id of the form `<kind>-<n>`
    #[must_use]
    pub fn fresh_id(&self, kind: ComponentType) -> String {
        let taken: BTreeSet<&str> = self.ids().collect();
        (1..)
            .map(|n| format!("{kind}-{n}"))
            .find(|candidate| !taken.contains(candidate.as_str()))
            .unwrap_or_else(|| format!("{kind}-{}", self.components.len() + 1))
    }

    /// Check id uniqueness and positive box sizes
    ///
    /// # Errors
    /// Returns the first violated invariant
    pub fn validate_structure(&self) -> Result<(), DocumentError> {
        let mut seen = BTreeSet::new();
        for component in &self.components {
            if !seen.insert(component.id.as_str()) {
                return Err(DocumentError::DuplicateId(component.id.clone()));
            }
            if !component.bbox.has_positive_size() {
                return Err(DocumentError::NonPositiveBox {
                    id: component.id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Serialized form with stable key ordering
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Document invariant violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    /// Two components share an id
    #[error("duplicate component id: {0}")]
    DuplicateId(String),

    /// A bbox has zero or negative width/height
    #[error("component '{id}' has a non-positive bbox")]
    NonPositiveBox { id: String },
}
