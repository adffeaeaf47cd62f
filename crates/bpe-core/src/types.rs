//! Intent types
//!
//! An [`Intent`] is one atomic requested change: a typed [`IntentValue`]
//! payload, a [`TargetSelector`] saying what it applies to, and a
//! confidence score.

use bpe_document::{ComponentType, Role};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Kind of edit, in planning precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Delete,
    Create,
    Visibility,
    Restyle,
    Reposition,
    Resize,
    Align,
    Retext,
    Recolor,
}

impl IntentKind {
    /// Planning precedence; lower runs first
    #[inline]
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Delete => 0,
            Self::Create => 1,
            Self::Visibility => 2,
            Self::Restyle => 3,
            Self::Reposition => 4,
            Self::Resize => 5,
            Self::Align => 6,
            Self::Retext => 7,
            Self::Recolor => 8,
        }
    }

    /// Whether this kind changes the component list
    #[inline]
    #[must_use]
    pub const fn is_structural(self) -> bool {
        matches!(self, Self::Delete | Self::Create)
    }

    /// Stable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Create => "create",
            Self::Visibility => "visibility",
            Self::Restyle => "restyle",
            Self::Reposition => "reposition",
            Self::Resize => "resize",
            Self::Align => "align",
            Self::Retext => "retext",
            Self::Recolor => "recolor",
        }
    }
}

impl Display for IntentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grow or shrink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeDirection {
    Grow,
    Shrink,
}

/// Which box dimensions a resize touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Both,
    Width,
    Height,
}

/// Relative size change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResizeValue {
    pub direction: SizeDirection,
    /// Explicit percentage; the configured step applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    pub dimension: Dimension,
}

/// Screen direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Relative position change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveValue {
    pub direction: MoveDirection,
    /// Explicit distance; the configured step applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

/// Horizontal alignment within the viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Left,
    Center,
    Right,
}

/// Style adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleChange {
    Bold,
    Regular,
    Rounded,
    Square,
    MorePadding,
    LessPadding,
    LargerFont,
    SmallerFont,
}

/// Replacement text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextValue {
    pub text: String,
}

/// Where a recolor takes its color from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSpec {
    /// Concrete `#rrggbb` value
    Hex(String),
    /// Copy the component's `bg_color`
    MatchBackground,
    /// Copy the component's `color`
    MatchForeground,
}

/// Which color field a recolor writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorChannel {
    Foreground,
    Background,
    /// Background for filled components, foreground otherwise
    Auto,
}

/// Color change
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorValue {
    pub spec: ColorSpec,
    pub channel: ColorChannel,
}

/// Insertion side relative to an anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Before,
    After,
}

/// New component request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CreateValue {
    pub component_type: ComponentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub placement: Placement,
}

/// Typed payload, one variant per intent kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum IntentValue {
    Delete,
    Create(CreateValue),
    /// `true` shows, `false` hides
    Visibility(bool),
    Restyle(StyleChange),
    Reposition(MoveValue),
    Resize(ResizeValue),
    Align(Alignment),
    Retext(TextValue),
    Recolor(ColorValue),
}

impl IntentValue {
    /// Kind of this payload
    #[must_use]
    pub const fn kind(&self) -> IntentKind {
        match self {
            Self::Delete => IntentKind::Delete,
            Self::Create(_) => IntentKind::Create,
            Self::Visibility(_) => IntentKind::Visibility,
            Self::Restyle(_) => IntentKind::Restyle,
            Self::Reposition(_) => IntentKind::Reposition,
            Self::Resize(_) => IntentKind::Resize,
            Self::Align(_) => IntentKind::Align,
            Self::Retext(_) => IntentKind::Retext,
            Self::Recolor(_) => IntentKind::Recolor,
        }
    }

    /// Verb used by the conflict check
    #[must_use]
    pub const fn verb(&self) -> Verb {
        match self {
            Self::Delete => Verb::Delete,
            Self::Create(_) => Verb::Create,
            Self::Visibility(true) => Verb::Show,
            Self::Visibility(false) => Verb::Hide,
            Self::Restyle(_) => Verb::Restyle,
            Self::Reposition(_) => Verb::Move,
            Self::Resize(ResizeValue {
                direction: SizeDirection::Grow,
                ..
            }) => Verb::Grow,
            Self::Resize(ResizeValue {
                direction: SizeDirection::Shrink,
                ..
            }) => Verb::Shrink,
            Self::Align(_) => Verb::Align,
            Self::Retext(_) => Verb::Retext,
            Self::Recolor(_) => Verb::Recolor,
        }
    }
}

/// Finer-grained action name for conflict detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verb {
    Delete,
    Create,
    Show,
    Hide,
    Restyle,
    Move,
    Grow,
    Shrink,
    Align,
    Retext,
    Recolor,
}

impl Verb {
    /// Whether two verbs cannot both apply to one referent
    #[must_use]
    pub fn conflicts_with(self, other: Self) -> bool {
        Self::ordered_conflict(self, other) || Self::ordered_conflict(other, self)
    }

    fn ordered_conflict(a: Self, b: Self) -> bool {
        matches!(
            (a, b),
            (
                Self::Delete,
                Self::Create
                    | Self::Grow
                    | Self::Shrink
                    | Self::Move
                    | Self::Hide
                    | Self::Show
                    | Self::Align
                    | Self::Recolor
                    | Self::Retext
                    | Self::Restyle
            ) | (Self::Show, Self::Hide)
                | (Self::Grow, Self::Shrink)
        )
    }

    /// Stable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Create => "create",
            Self::Show => "show",
            Self::Hide => "hide",
            Self::Restyle => "restyle",
            Self::Move => "move",
            Self::Grow => "grow",
            Self::Shrink => "shrink",
            Self::Align => "align",
            Self::Retext => "retext",
            Self::Recolor => "recolor",
        }
    }
}

impl Display for Verb {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form reference to what an intent applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum TargetSelector {
    /// Exact component id
    Id(String),
    /// Component type keyword
    Type(ComponentType),
    /// Role keyword
    Role(Role),
    /// Common noun resolved by heuristics ("header", "logo")
    Noun(String),
    /// Token key
    Token(String),
    /// The n-th component created earlier in the same plan
    Created(usize),
    /// The document itself (creation without an anchor)
    Document,
}

impl TargetSelector {
    /// Selector confidence
    #[must_use]
    pub fn confidence(&self) -> f64 {
        match self {
            Self::Id(_) | Self::Document => 1.0,
            Self::Token(_) | Self::Created(_) => 0.95,
            Self::Type(_) | Self::Role(_) => 0.9,
            Self::Noun(_) => 0.8,
        }
    }
}

impl Display for TargetSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id:{id}"),
            Self::Type(t) => write!(f, "type:{t}"),
            Self::Role(r) => write!(f, "role:{r}"),
            Self::Noun(n) => write!(f, "noun:{n}"),
            Self::Token(k) => write!(f, "token:{k}"),
            Self::Created(n) => write!(f, "created:{n}"),
            Self::Document => f.write_str("document"),
        }
    }
}

/// One atomic edit request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    #[serde(flatten)]
    pub value: IntentValue,
    pub target: TargetSelector,
    /// Selector inherited from the previous clause through a pronoun
    #[serde(default)]
    pub via_pronoun: bool,
    pub confidence: f64,
    /// Clause the intent was parsed from
    pub clause: String,
}

impl Intent {
    /// Create with full confidence
    #[must_use]
    pub fn new(value: IntentValue, target: TargetSelector, clause: impl Into<String>) -> Self {
        Self {
            value,
            target,
            via_pronoun: false,
            confidence: 1.0,
            clause: clause.into(),
        }
    }

    /// With confidence, clamped to `[0, 1]`
    #[inline]
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Mark as pronoun-inherited
    #[inline]
    #[must_use]
    pub fn via_pronoun(mut self) -> Self {
        self.via_pronoun = true;
        self
    }

    /// Kind of this intent
    #[inline]
    #[must_use]
    pub fn kind(&self) -> IntentKind {
        self.value.kind()
    }
}

/// Two intents that cannot both apply to one referent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub first: Verb,
    pub second: Verb,
    /// Resolved id, or the selector when unresolved
    pub referent: String,
    /// Clause positions in the command
    pub clauses: (usize, usize),
}

impl Display for Conflict {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' (clause {}) conflicts with '{}' (clause {}) on {}",
            self.first, self.clauses.0, self.second, self.clauses.1, self.referent
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_matches_declaration_order() {
        let kinds = [
            IntentKind::Delete,
            IntentKind::Create,
            IntentKind::Visibility,
            IntentKind::Restyle,
            IntentKind::Reposition,
            IntentKind::Resize,
            IntentKind::Align,
            IntentKind::Retext,
            IntentKind::Recolor,
        ];
        for pair in kinds.windows(2) {
            assert!(pair[0].precedence() < pair[1].precedence());
        }
    }

    #[test]
    fn conflict_table_is_symmetric() {
        assert!(Verb::Delete.conflicts_with(Verb::Grow));
        assert!(Verb::Move.conflicts_with(Verb::Delete));
        assert!(Verb::Hide.conflicts_with(Verb::Show));
        assert!(Verb::Shrink.conflicts_with(Verb::Grow));
        assert!(!Verb::Grow.conflicts_with(Verb::Recolor));
        assert!(!Verb::Delete.conflicts_with(Verb::Delete));
        assert!(!Verb::Grow.conflicts_with(Verb::Grow));
    }

    #[test]
    fn intent_serializes_kind_tag() {
        let intent = Intent::new(
            IntentValue::Visibility(false),
            TargetSelector::Id("cta".to_string()),
            "hide cta",
        );
        let json = serde_json::to_value(&intent).unwrap();
        assert_eq!(json["kind"], "visibility");
        assert_eq!(json["value"], false);
        assert_eq!(json["target"]["by"], "id");
        assert_eq!(intent.kind(), IntentKind::Visibility);
    }

    #[test]
    fn verbs_split_resize_direction() {
        let grow = IntentValue::Resize(ResizeValue {
            direction: SizeDirection::Grow,
            percent: None,
            dimension: Dimension::Both,
        });
        assert_eq!(grow.verb(), Verb::Grow);
        assert_eq!(IntentValue::Visibility(true).verb(), Verb::Show);
    }
}
