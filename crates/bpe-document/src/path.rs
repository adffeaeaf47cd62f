//! Patch paths: pointers into a document
//!
//! Provides [`PatchPath`], rendered in JSON-pointer form
//! (`/components/0/visual/color`, `/tokens/primary`).

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Visual style keys a patch may write
pub const MUTABLE_VISUAL_KEYS: [&str; 9] = [
    "color",
    "bg_color",
    "height",
    "width",
    "font_weight",
    "font_size",
    "padding",
    "border_radius",
    "visible",
];

/// Pointer into a [`Document`](crate::Document)
///
/// Component segments address by render-order index, so a path is only
/// meaningful against the document it was planned for.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PatchPath {
    /// A whole component entry (`/components/<i>`)
    Component(usize),
    /// Component text (`/components/<i>/text`)
    Text(usize),
    /// Component bounding box (`/components/<i>/bbox`)
    Bbox(usize),
    /// One visual style entry (`/components/<i>/visual/<key>`)
    Visual(usize, String),
    /// One token entry (`/tokens/<key>`)
    Token(String),
}

impl PatchPath {
    /// Visual entry path
    #[inline]
    #[must_use]
    pub fn visual(index: usize, key: impl Into<String>) -> Self {
        Self::Visual(index, key.into())
    }

    /// Token entry path
    #[inline]
    #[must_use]
    pub fn token(key: impl Into<String>) -> Self {
        Self::Token(key.into())
    }

    /// Component index this path points into, if any
    #[inline]
    #[must_use]
    pub fn component_index(&self) -> Option<usize> {
        match self {
            Self::Component(i) | Self::Text(i) | Self::Bbox(i) | Self::Visual(i, _) => Some(*i),
            Self::Token(_) => None,
        }
    }

    /// Dotted field name (`text`, `bbox`, `visual.color`, `tokens.primary`)
    #[must_use]
    pub fn field_name(&self) -> String {
        match self {
            Self::Component(_) => "component".to_string(),
            Self::Text(_) => "text".to_string(),
            Self::Bbox(_) => "bbox".to_string(),
            Self::Visual(_, key) => format!("visual.{key}"),
            Self::Token(key) => format!("tokens.{key}"),
        }
    }

    /// Whether the field is on the mutable allow-list
    ///
    /// Whole-component entries are allow-listed here; which operations may
    /// touch them is decided by [`Patch`](crate::Patch).
    #[must_use]
    pub fn is_allow_listed(&self) -> bool {
        match self {
            Self::Component(_) | Self::Text(_) | Self::Bbox(_) | Self::Token(_) => true,
            Self::Visual(_, key) => MUTABLE_VISUAL_KEYS.contains(&key.as_str()),
        }
    }

    /// True if both paths address the same component or token entry
    #[must_use]
    pub fn same_entry(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Token(a), Self::Token(b)) => a == b,
            _ => match (self.component_index(), other.component_index()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

impl Display for PatchPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Component(i) => write!(f, "/components/{i}"),
            Self::Text(i) => write!(f, "/components/{i}/text"),
            Self::Bbox(i) => write!(f, "/components/{i}/bbox"),
            Self::Visual(i, key) => write!(f, "/components/{i}/visual/{}", escape(key)),
            Self::Token(key) => write!(f, "/tokens/{}", escape(key)),
        }
    }
}

impl FromStr for PatchPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix('/')
            .ok_or_else(|| PathError::NotAbsolute(s.to_string()))?;
        let segments: Vec<&str> = rest.split('/').collect();

        match segments.as_slice() {
            ["tokens", key] if !key.is_empty() => Ok(Self::Token(unescape(key))),
            ["components", index, tail @ ..] => {
                let index: usize = index
                    .parse()
                    .map_err(|_| PathError::InvalidIndex((*index).to_string()))?;
                match tail {
                    [] => Ok(Self::Component(index)),
                    ["text"] => Ok(Self::Text(index)),
                    ["bbox"] => Ok(Self::Bbox(index)),
                    ["visual", key] if !key.is_empty() => Ok(Self::Visual(index, unescape(key))),
                    _ => Err(PathError::UnknownField(tail.join("/"))),
                }
            }
            _ => Err(PathError::UnknownRoot(s.to_string())),
        }
    }
}

impl serde::Serialize for PatchPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for PatchPath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors parsing a patch path
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Path does not start with '/'
    #[error("path must start with '/': {0}")]
    NotAbsolute(String),

    /// First segment is neither `components` nor `tokens`
    #[error("unknown path root: {0}")]
    UnknownRoot(String),

    /// Component index is not a non-negative integer
    #[error("invalid component index: {0}")]
    InvalidIndex(String),

    /// Field chain below a component is not addressable
    #[error("unknown component field: {0}")]
    UnknownField(String),
}
