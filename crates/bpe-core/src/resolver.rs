//! Target resolution
//!
//! Maps a [`TargetSelector`] to a concrete component, token or the document.
//! Precedence: exact id, then type/role keyword, then common-noun
//! heuristics, then (for pronoun clauses) the most recently resolved target.

use crate::error::ResolutionError;
use crate::types::TargetSelector;
use bpe_document::{Component, ComponentType, Document, Role};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Concrete thing an intent applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum ResolvedTarget {
    /// Component by id, with its render-order index at resolution time
    Component { id: String, index: usize },
    /// Token entry
    Token { key: String },
    /// The document itself
    Document,
}

impl ResolvedTarget {
    /// Component id, if this is a component
    #[must_use]
    pub fn component_id(&self) -> Option<&str> {
        match self {
            Self::Component { id, .. } => Some(id),
            _ => None,
        }
    }
}

impl Display for ResolvedTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Component { id, .. } => write!(f, "'{id}'"),
            Self::Token { key } => write!(f, "token '{key}'"),
            Self::Document => f.write_str("document"),
        }
    }
}

/// Why a target was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    ExactId,
    TypeKeyword,
    RoleKeyword,
    NounHeuristic,
    Pronoun,
    Created,
    Token,
    Document,
}

impl Display for MatchReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ExactId => "exact id",
            Self::TypeKeyword => "type keyword",
            Self::RoleKeyword => "role keyword",
            Self::NounHeuristic => "noun heuristic",
            Self::Pronoun => "previous target",
            Self::Created => "created earlier",
            Self::Token => "token key",
            Self::Document => "document",
        })
    }
}

/// Resolved target plus how it was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub target: ResolvedTarget,
    pub reason: MatchReason,
}

/// Per-plan resolution state
#[derive(Debug, Clone, Default)]
pub struct ResolutionContext {
    last: Option<String>,
    created: Vec<String>,
}

impl ResolutionContext {
    /// Fresh context
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a resolved target for pronoun fallback
    pub fn record(&mut self, target: &ResolvedTarget) {
        if let Some(id) = target.component_id() {
            self.last = Some(id.to_string());
        }
    }

    /// Remember a component created by this plan
    pub fn record_created(&mut self, id: impl Into<String>) {
        let id = id.into();
        self.last = Some(id.clone());
        self.created.push(id);
    }

    /// Most recently resolved component id
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }

    /// Id of the n-th created component
    #[inline]
    #[must_use]
    pub fn created(&self, n: usize) -> Option<&str> {
        self.created.get(n).map(String::as_str)
    }
}

/// How a common noun picks a component
#[derive(Debug, Clone, Copy)]
enum NounRule {
    RoleOrType(Role, ComponentType),
    Role(Role),
    Type(ComponentType),
    TypePreferRole(ComponentType, Role),
}

const NOUNS: &[(&str, NounRule)] = &[
    ("button", NounRule::RoleOrType(Role::Cta, ComponentType::Button)),
    ("btn", NounRule::RoleOrType(Role::Cta, ComponentType::Button)),
    ("cta", NounRule::RoleOrType(Role::Cta, ComponentType::Button)),
    ("header", NounRule::Role(Role::Hero)),
    ("title", NounRule::Role(Role::Hero)),
    ("heading", NounRule::Role(Role::Hero)),
    ("headline", NounRule::Role(Role::Hero)),
    ("hero", NounRule::Role(Role::Hero)),
    ("banner", NounRule::Role(Role::Hero)),
    ("logo", NounRule::TypePreferRole(ComponentType::Image, Role::Navigation)),
    ("image", NounRule::TypePreferRole(ComponentType::Image, Role::Media)),
    ("picture", NounRule::TypePreferRole(ComponentType::Image, Role::Media)),
    ("photo", NounRule::TypePreferRole(ComponentType::Image, Role::Media)),
    ("paragraph", NounRule::TypePreferRole(ComponentType::Text, Role::Content)),
    ("copy", NounRule::TypePreferRole(ComponentType::Text, Role::Content)),
    ("body", NounRule::TypePreferRole(ComponentType::Text, Role::Content)),
    ("text", NounRule::Type(ComponentType::Text)),
    ("label", NounRule::Type(ComponentType::Text)),
    ("footer", NounRule::Role(Role::Footer)),
    ("nav", NounRule::Role(Role::Navigation)),
    ("navbar", NounRule::Role(Role::Navigation)),
    ("menu", NounRule::Role(Role::Navigation)),
    ("navigation", NounRule::Role(Role::Navigation)),
    ("section", NounRule::Type(ComponentType::Container)),
    ("box", NounRule::Type(ComponentType::Container)),
    ("panel", NounRule::Type(ComponentType::Container)),
    ("container", NounRule::Type(ComponentType::Container)),
    ("card", NounRule::Type(ComponentType::Card)),
    ("input", NounRule::Type(ComponentType::Input)),
    ("field", NounRule::Type(ComponentType::Input)),
    ("textbox", NounRule::Type(ComponentType::Input)),
    ("icon", NounRule::Type(ComponentType::Icon)),
    ("divider", NounRule::Type(ComponentType::Divider)),
    ("separator", NounRule::Type(ComponentType::Divider)),
];

fn noun_rule(word: &str) -> Option<NounRule> {
    NOUNS.iter().find(|(w, _)| *w == word).map(|(_, rule)| *rule)
}

/// Whether `word` names a component for selector extraction
#[must_use]
pub fn is_component_noun(word: &str) -> bool {
    noun_rule(word).is_some()
        || ComponentType::from_keyword(word).is_some()
        || Role::from_keyword(word).is_some()
}

/// Component type a noun creates ("heading" → text, "btn" → button)
#[must_use]
pub fn creatable_type(word: &str) -> Option<ComponentType> {
    if let Some(kind) = ComponentType::from_keyword(word) {
        return Some(kind);
    }
    match noun_rule(word)? {
        NounRule::RoleOrType(_, kind) | NounRule::Type(kind) | NounRule::TypePreferRole(kind, _) => {
            Some(kind)
        }
        NounRule::Role(Role::Hero) => Some(ComponentType::Text),
        NounRule::Role(_) => Some(ComponentType::Container),
    }
}

/// Stateless resolver
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetResolver;

impl TargetResolver {
    /// Create new resolver
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Resolve a selector against `document`
    ///
    /// # Errors
    /// Returns error if nothing matches and no pronoun fallback applies
    pub fn resolve(
        &self,
        selector: &TargetSelector,
        via_pronoun: bool,
        document: &Document,
        context: &ResolutionContext,
    ) -> Result<Resolution, ResolutionError> {
        let found = match selector {
            TargetSelector::Document => {
                return Ok(Resolution {
                    target: ResolvedTarget::Document,
                    reason: MatchReason::Document,
                })
            }
            TargetSelector::Token(key) => {
                return if document.tokens.contains_key(key) {
                    Ok(Resolution {
                        target: ResolvedTarget::Token { key: key.clone() },
                        reason: MatchReason::Token,
                    })
                } else {
                    Err(ResolutionError::UnknownToken(key.clone()))
                };
            }
            TargetSelector::Created(n) => {
                let id = context.created(*n).ok_or(ResolutionError::NotCreated(*n))?;
                document
                    .index_of(id)
                    .map(|index| (index, MatchReason::Created))
            }
            TargetSelector::Id(id) => document
                .index_of(id)
                .map(|index| (index, MatchReason::ExactId)),
            TargetSelector::Type(kind) => Self::first(document, |c| c.kind == *kind)
                .map(|index| (index, MatchReason::TypeKeyword))
                .or_else(|| Self::by_noun(kind.as_str(), document)),
            TargetSelector::Role(role) => Self::first(document, |c| c.role == Some(*role))
                .map(|index| (index, MatchReason::RoleKeyword))
                .or_else(|| Self::by_noun(role.as_str(), document)),
            TargetSelector::Noun(word) => Self::by_noun(word, document),
        };

        let found = found.or_else(|| {
            if via_pronoun {
                context
                    .last()
                    .and_then(|id| document.index_of(id))
                    .map(|index| (index, MatchReason::Pronoun))
            } else {
                None
            }
        });

        let (index, reason) = found.ok_or_else(|| ResolutionError::NoMatch(selector.clone()))?;
        let id = document.components[index].id.clone();
        tracing::debug!(selector = %selector, target = %id, reason = %reason, "target resolved");
        Ok(Resolution {
            target: ResolvedTarget::Component { id, index },
            reason,
        })
    }

    fn first(document: &Document, predicate: impl Fn(&Component) -> bool) -> Option<usize> {
        document.components.iter().position(predicate)
    }

    fn by_noun(word: &str, document: &Document) -> Option<(usize, MatchReason)> {
        let index = match noun_rule(word)? {
            NounRule::RoleOrType(role, kind) => {
                Self::first(document, |c| c.role == Some(role) || c.kind == kind)
            }
            NounRule::Role(role) => Self::first(document, |c| c.role == Some(role)),
            NounRule::Type(kind) => Self::first(document, |c| c.kind == kind),
            NounRule::TypePreferRole(kind, role) => {
                Self::first(document, |c| c.kind == kind && c.role == Some(role))
                    .or_else(|| Self::first(document, |c| c.kind == kind))
            }
        }?;
        Some((index, MatchReason::NounHeuristic))
    }
}
