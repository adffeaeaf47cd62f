//! Intent decomposition
//!
//! Splits a command into clauses, classifies each clause with an ordered
//! list of pattern rules, extracts its target selector and payload, checks
//! the whole command for conflicting verbs, and returns an [`EditPlan`]
//! sorted by planning precedence.
//!
//! # Rule order
//! delete, create, visibility, retext with a quoted literal, recolor,
//! restyle, align, reposition, resize, generic retext. The first rule that
//! yields a complete payload wins, so a clause with both a color word and a
//! size word is a recolor.

use crate::config::{ColorTable, PipelineConfig};
use crate::error::{DecompositionError, SkipReason, SkippedClause};
use crate::resolver::{creatable_type, is_component_noun, ResolutionContext, TargetResolver};
use crate::result::ReasoningTrace;
use crate::types::{
    Alignment, ColorChannel, ColorSpec, ColorValue, Conflict, CreateValue, Dimension, Intent,
    IntentValue, MoveDirection, MoveValue, Placement, ResizeValue, SizeDirection, StyleChange,
    TargetSelector, TextValue,
};
use bpe_document::{ComponentType, Document, Role};
use bpe_validation::normalize_hex;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Clause separators, most specific first
pub const SEPARATORS: [&str; 6] = ["; ", ", and ", ", then ", " then ", " and ", ", "];

/// Multiplier applied to pronoun-inherited selectors
const PRONOUN_PENALTY: f64 = 0.9;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid built-in pattern {pattern}: {err}"))
}

static QUOTED: Lazy<Regex> = Lazy::new(|| re(r#""([^"]*)"|“([^”]*)”|(?:^|\s)'([^']*)'"#));
static WORD: Lazy<Regex> = Lazy::new(|| re(r"[a-z0-9_#][a-z0-9_#\-]*"));

static DELETE: Lazy<Regex> = Lazy::new(|| re(r"\b(delete|remove|erase|drop|discard|get rid of)\b"));
static STYLE_NOUNS: Lazy<Regex> = Lazy::new(|| {
    re(r"\b(padding|border|radius|rounded|rounding|corners?|bold|shadow|underline|margin|spacing)\b")
});

static CREATE: Lazy<Regex> = Lazy::new(|| re(r"\b(add|create|insert|append|place)\b"));
static CREATE_STOP: Lazy<Regex> = Lazy::new(|| {
    re(r"^(to|on|in|into|onto|for|from|with|of|at|below|under|beneath|after|following|above|before|over)$")
});
static ANCHOR: Lazy<Regex> =
    Lazy::new(|| re(r"\b(below|under|beneath|after|following|above|before|over)\s+(.+)$"));

static HIDE: Lazy<Regex> = Lazy::new(|| re(r"\b(hide|conceal|invisible|hidden)\b"));
static SHOW: Lazy<Regex> = Lazy::new(|| re(r"\b(show|unhide|reveal|visible|display)\b"));

static RETEXT_VERB: Lazy<Regex> = Lazy::new(|| {
    re(r"\b(text|say|says|read|reads|label|rename|retitle|wording|copy|change|set|update|replace|edit|make|title|heading|headline|caption)\b")
});

static MATCH_BACKGROUND: Lazy<Regex> =
    Lazy::new(|| re(r"\bsame(?:\s+colou?r)?\s+as\s+(?:the\s+)?(?:background|bg|fill)\b"));
static MATCH_FOREGROUND: Lazy<Regex> =
    Lazy::new(|| re(r"\bsame(?:\s+colou?r)?\s+as\s+(?:the\s+)?(?:text|foreground|font)\b"));
static HEX: Lazy<Regex> = Lazy::new(|| re(r"#(?:[0-9a-f]{6}|[0-9a-f]{3})\b"));
static BACKGROUND: Lazy<Regex> = Lazy::new(|| re(r"\b(background|bg|fill|backdrop)\b"));
static FOREGROUND: Lazy<Regex> =
    Lazy::new(|| re(r"\b(?:text|font)\s+colou?r\b|\bforeground\b"));

static REGULAR: Lazy<Regex> = Lazy::new(|| {
    re(r"\b(unbold|regular|normal\s+weight|not\s+bold|no\s+bold|remove\s+(?:the\s+)?bold|lighter)\b")
});
static BOLD: Lazy<Regex> = Lazy::new(|| re(r"\b(bold|bolder|heavier)\b"));
static SQUARE: Lazy<Regex> = Lazy::new(|| {
    re(r"\b(square|sharp|no\s+(?:rounded\s+)?corners|remove\s+(?:the\s+)?(?:rounded\s+corners|rounding|radius|border\s+radius))\b")
});
static ROUNDED: Lazy<Regex> = Lazy::new(|| re(r"\b(round|rounded|rounder|pill|radius|corners)\b"));
static PADDING: Lazy<Regex> = Lazy::new(|| re(r"\b(padding|spacious|breathing room)\b"));
static FONT: Lazy<Regex> = Lazy::new(|| re(r"\b(font|type\s*size|text\s+size)\b"));
static LESS: Lazy<Regex> =
    Lazy::new(|| re(r"\b(less|reduce|decrease|smaller|tighter|remove|shrink|lower)\b"));

static ALIGN: Lazy<Regex> = Lazy::new(|| {
    re(r"\b(align|aligned|alignment|center|centre|centered|centred|justify|justified)\b")
});
static LEFT: Lazy<Regex> = Lazy::new(|| re(r"\bleft\b"));
static RIGHT: Lazy<Regex> = Lazy::new(|| re(r"\bright\b"));

static MOVE: Lazy<Regex> = Lazy::new(|| re(r"\b(move|shift|nudge|push|drag|reposition|slide)\b"));
static DIRECTION: Lazy<Regex> =
    Lazy::new(|| re(r"\b(up|down|left|right|higher|lower|upward|downward|upwards|downwards)\b"));
static DISTANCE: Lazy<Regex> = Lazy::new(|| {
    re(r"(\d+(?:\.\d+)?)\s*(?:px|pixels?|units?|pt)\b|\bby\s+(\d+(?:\.\d+)?)\b")
});

static GROW: Lazy<Regex> = Lazy::new(|| {
    re(r"\b(bigger|larger|grow|enlarge|increase|expand|wider|taller|huge|upsize|scale\s+up)\b")
});
static SHRINK: Lazy<Regex> = Lazy::new(|| {
    re(r"\b(smaller|shrink|reduce|decrease|narrower|shorter|tiny|compact|downsize|scale\s+down)\b")
});
static RESIZE: Lazy<Regex> = Lazy::new(|| re(r"\b(resize|size|scale)\b"));
static WIDTH: Lazy<Regex> = Lazy::new(|| re(r"\b(wider|narrower|width)\b"));
static HEIGHT: Lazy<Regex> = Lazy::new(|| re(r"\b(taller|shorter|height)\b"));
static PERCENT: Lazy<Regex> = Lazy::new(|| re(r"(\d+(?:\.\d+)?)\s*%"));

static RETEXT_TO: Lazy<Regex> = Lazy::new(|| {
    re(r"(?i)\b(?:text|label|title|heading|headline|wording|copy|caption|rename|retitle)\b.*?\bto\s+(.+)$")
});
static RETEXT_SAYS: Lazy<Regex> = Lazy::new(|| re(r"(?i)\b(?:say|says|read|reads)\s+(.+)$"));

/// One step of a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Execution position (0-based)
    pub index: usize,
    /// Position of the source clause in the command
    pub clause_index: usize,
    pub intent: Intent,
}

/// Ordered atomic steps for one command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditPlan {
    pub command: String,
    pub steps: Vec<PlanStep>,
    /// Mean step confidence, clamped to `[0, 1]`
    pub confidence: f64,
}

impl EditPlan {
    /// Number of steps
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// No steps
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// A clause after classification
#[derive(Debug, Clone)]
struct ParsedClause {
    index: usize,
    text: String,
    intent: Option<Intent>,
    /// Conflict referents; filled by the dry run
    referents: Vec<String>,
    resolved: bool,
}

/// Deterministic command decomposer
#[derive(Debug, Clone)]
pub struct IntentDecomposer {
    colors: ColorTable,
    min_step_confidence: f64,
    resolver: TargetResolver,
}

impl IntentDecomposer {
    /// Create from pipeline configuration
    #[must_use]
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            colors: config.colors.clone(),
            min_step_confidence: config.min_step_confidence,
            resolver: TargetResolver::new(),
        }
    }

    /// Decompose a command against a document
    ///
    /// The document is only read, to check that every target exists and to
    /// compare conflicting clauses by the component they resolve to.
    ///
    /// # Errors
    /// Returns error if the command is empty, conflicting, or any clause
    /// cannot be turned into a confident, resolvable step
    pub fn decompose(
        &self,
        command: &str,
        document: &Document,
        trace: &mut ReasoningTrace,
    ) -> Result<EditPlan, DecompositionError> {
        if command.trim().is_empty() {
            trace.record("command is empty");
            return Err(DecompositionError::EmptyCommand);
        }

        let clauses = split_clauses(command);
        trace.record(format!(
            "split command into {} clause(s): {}",
            clauses.len(),
            clauses
                .iter()
                .map(|c| format!("'{c}'"))
                .collect::<Vec<_>>()
                .join(", ")
        ));

        let mut parsed = self.classify(&clauses, document, trace);
        self.dry_run(&mut parsed, document, trace);

        let conflicts = find_conflicts(&parsed);
        if !conflicts.is_empty() {
            for conflict in &conflicts {
                trace.record(format!("conflict: {conflict}"));
            }
            tracing::warn!(command, conflicts = conflicts.len(), "command rejected: conflict");
            return Err(DecompositionError::Conflict { conflicts });
        }

        let mut skipped = Vec::new();
        let mut planned = Vec::new();
        for clause in parsed {
            match self.skip_reason(&clause) {
                Some(reason) => {
                    let skip = SkippedClause {
                        index: clause.index,
                        clause: clause.text,
                        reason,
                    };
                    trace.record(format!("skipped {skip}"));
                    skipped.push(skip);
                }
                None => {
                    if let Some(intent) = clause.intent {
                        planned.push((clause.index, intent));
                    }
                }
            }
        }

        if planned.is_empty() {
            tracing::warn!(command, "command rejected: nothing understood");
            return Err(DecompositionError::Unresolvable { skipped });
        }
        if !skipped.is_empty() {
            tracing::warn!(
                command,
                skipped = skipped.len(),
                planned = planned.len(),
                "command rejected: ambiguous clauses"
            );
            return Err(DecompositionError::Ambiguous {
                planned: planned.len(),
                skipped,
            });
        }

        // Stable: equal precedence keeps clause order.
        planned.sort_by_key(|(_, intent)| intent.kind().precedence());

        #[allow(clippy::cast_precision_loss)]
        let confidence = (planned.iter().map(|(_, i)| i.confidence).sum::<f64>()
            / planned.len() as f64)
            .clamp(0.0, 1.0);

        let steps: Vec<PlanStep> = planned
            .into_iter()
            .enumerate()
            .map(|(index, (clause_index, intent))| PlanStep {
                index,
                clause_index,
                intent,
            })
            .collect();

        trace.record(format!(
            "plan: {} (confidence {confidence:.2})",
            steps
                .iter()
                .map(|s| format!("{}:{}", s.index, s.intent.kind()))
                .collect::<Vec<_>>()
                .join(" → ")
        ));

        Ok(EditPlan {
            command: command.to_string(),
            steps,
            confidence,
        })
    }

    fn classify(
        &self,
        clauses: &[String],
        document: &Document,
        trace: &mut ReasoningTrace,
    ) -> Vec<ParsedClause> {
        let mut previous: Option<TargetSelector> = None;
        let mut created = 0;
        let mut parsed = Vec::with_capacity(clauses.len());
        let clauses: Vec<Clause> = clauses.iter().map(|text| Clause::new(text)).collect();

        for (index, clause) in clauses.iter().enumerate() {
            let text = &clause.original;
            let next = clauses.get(index + 1);
            let intent = self.parse_clause(clause, previous.as_ref(), next, created, document);

            match &intent {
                Some(intent) => {
                    trace.record(format!(
                        "clause {index} '{text}': {} on {}{} (confidence {:.2})",
                        intent.kind(),
                        intent.target,
                        if intent.via_pronoun { " via pronoun" } else { "" },
                        intent.confidence
                    ));
                    previous = Some(match intent.value {
                        IntentValue::Create(_) => {
                            created += 1;
                            TargetSelector::Created(created - 1)
                        }
                        _ => intent.target.clone(),
                    });
                }
                None => trace.record(format!("clause {index} '{text}': no recognizable edit")),
            }

            parsed.push(ParsedClause {
                index,
                text: text.clone(),
                intent,
                referents: Vec::new(),
                resolved: false,
            });
        }
        parsed
    }

    /// Classify one clause; `None` if no rule yields a targeted intent
    ///
    /// A bare verb ("delete" in "delete and resize the button") shares the
    /// object of the clause that follows it.
    fn parse_clause(
        &self,
        clause: &Clause,
        previous: Option<&TargetSelector>,
        next: Option<&Clause>,
        created: usize,
        document: &Document,
    ) -> Option<Intent> {
        let (value, rule_confidence) = self.detect(clause)?;

        let (target, via_pronoun) = match &value {
            IntentValue::Create(_) => anchor_selector(clause, previous, document)
                .unwrap_or((TargetSelector::Document, false)),
            _ => extract_selector(clause, previous, document).or_else(|| {
                let next = next.filter(|_| clause.words().len() <= 2)?;
                extract_selector(next, None, document)
            })?,
        };

        let mut confidence = rule_confidence * target.confidence();
        if via_pronoun {
            confidence *= PRONOUN_PENALTY;
        }

        let intent = Intent::new(value, target, clause.original.clone()).with_confidence(confidence);
        let intent = if via_pronoun { intent.via_pronoun() } else { intent };
        tracing::debug!(
            clause = %clause.original,
            kind = %intent.kind(),
            created,
            "clause classified"
        );
        Some(intent)
    }

    /// Run the ordered rule list
    fn detect(&self, clause: &Clause) -> Option<(IntentValue, f64)> {
        let text = clause.plain.as_str();

        if DELETE.is_match(text) && !STYLE_NOUNS.is_match(text) {
            return Some((IntentValue::Delete, 0.95));
        }
        if let Some(value) = detect_create(clause) {
            return Some((IntentValue::Create(value), 0.9));
        }
        if HIDE.is_match(text) {
            return Some((IntentValue::Visibility(false), 0.9));
        }
        if SHOW.is_match(text) {
            return Some((IntentValue::Visibility(true), 0.9));
        }
        if let Some(literal) = &clause.literal {
            if RETEXT_VERB.is_match(text) {
                let value = TextValue {
                    text: literal.clone(),
                };
                return Some((IntentValue::Retext(value), 0.95));
            }
        }
        if let Some((value, confidence)) = self.detect_color(text) {
            return Some((IntentValue::Recolor(value), confidence));
        }
        if let Some(change) = detect_style(text) {
            return Some((IntentValue::Restyle(change), 0.85));
        }
        if ALIGN.is_match(text) {
            let alignment = if LEFT.is_match(text) {
                Alignment::Left
            } else if RIGHT.is_match(text) {
                Alignment::Right
            } else {
                Alignment::Center
            };
            return Some((IntentValue::Align(alignment), 0.9));
        }
        if let Some(value) = detect_move(text) {
            return Some((IntentValue::Reposition(value), 0.85));
        }
        if let Some((value, confidence)) = detect_resize(text) {
            return Some((IntentValue::Resize(value), confidence));
        }
        detect_generic_text(&clause.original).map(|text| (IntentValue::Retext(text), 0.7))
    }

    fn detect_color(&self, text: &str) -> Option<(ColorValue, f64)> {
        let (spec, confidence, rest) = if let Some(m) = MATCH_BACKGROUND.find(text) {
            (ColorSpec::MatchBackground, 0.9, cut(text, m.range()))
        } else if let Some(m) = MATCH_FOREGROUND.find(text) {
            (ColorSpec::MatchForeground, 0.9, cut(text, m.range()))
        } else if let Some(m) = HEX.find(text) {
            let hex = normalize_hex(m.as_str())?;
            (ColorSpec::Hex(hex), 0.95, cut(text, m.range()))
        } else {
            let hex = WORD
                .find_iter(text)
                .find_map(|w| self.colors.lookup(w.as_str()))
                .and_then(normalize_hex)?;
            (ColorSpec::Hex(hex), 0.9, text.to_string())
        };

        let channel = if FOREGROUND.is_match(&rest) {
            ColorChannel::Foreground
        } else if BACKGROUND.is_match(&rest) {
            ColorChannel::Background
        } else {
            ColorChannel::Auto
        };
        Some((ColorValue { spec, channel }, confidence))
    }

    fn skip_reason(&self, clause: &ParsedClause) -> Option<SkipReason> {
        let Some(intent) = &clause.intent else {
            return Some(SkipReason::NoIntent);
        };
        if !clause.resolved {
            return Some(SkipReason::UnresolvedTarget {
                kind: intent.kind(),
            });
        }
        if intent.confidence < self.min_step_confidence {
            return Some(SkipReason::LowConfidence {
                kind: intent.kind(),
                confidence: intent.confidence,
            });
        }
        None
    }

    /// Resolve every target against the input document, in clause order
    fn dry_run(&self, parsed: &mut [ParsedClause], document: &Document, trace: &mut ReasoningTrace) {
        let mut context = ResolutionContext::new();
        let mut created = 0;

        for clause in parsed.iter_mut() {
            let Some(intent) = &clause.intent else {
                continue;
            };

            let (referent, resolved) = match &intent.target {
                TargetSelector::Created(n) => (format!("new component #{n}"), true),
                TargetSelector::Document => ("document".to_string(), true),
                selector => {
                    match self
                        .resolver
                        .resolve(selector, intent.via_pronoun, document, &context)
                    {
                        Ok(resolution) => {
                            context.record(&resolution.target);
                            let referent = match resolution.target.component_id() {
                                Some(id) => id.to_string(),
                                None => resolution.target.to_string(),
                            };
                            (referent, true)
                        }
                        Err(err) => {
                            trace.record(format!("clause {}: {err}", clause.index));
                            (selector.to_string(), false)
                        }
                    }
                }
            };

            clause.resolved = resolved;
            if let IntentValue::Create(_) = intent.value {
                clause.referents.push(format!("new component #{created}"));
                created += 1;
                if intent.target != TargetSelector::Document {
                    clause.referents.push(referent);
                }
            } else {
                clause.referents.push(referent);
            }
        }
    }
}

/// Incompatible verb pairs sharing a referent, in clause order
fn find_conflicts(parsed: &[ParsedClause]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    for (i, a) in parsed.iter().enumerate() {
        let Some(first) = &a.intent else { continue };
        for b in &parsed[i + 1..] {
            let Some(second) = &b.intent else { continue };
            let (va, vb) = (first.value.verb(), second.value.verb());
            if !va.conflicts_with(vb) {
                continue;
            }
            if let Some(referent) = a.referents.iter().find(|r| b.referents.contains(r)) {
                conflicts.push(Conflict {
                    first: va,
                    second: vb,
                    referent: referent.clone(),
                    clauses: (a.index, b.index),
                });
            }
        }
    }
    conflicts
}

/// A clause in the forms the rules need
#[derive(Debug, Clone)]
struct Clause {
    /// As written
    original: String,
    /// Lower-case with quoted literals blanked out
    plain: String,
    /// First quoted literal
    literal: Option<String>,
}

impl Clause {
    fn new(text: &str) -> Self {
        let spans = quoted_spans(text);
        let literal = QUOTED.captures(text).and_then(|caps| {
            (1..=3)
                .find_map(|i| caps.get(i))
                .map(|m| m.as_str().to_string())
        });

        let mut plain = String::with_capacity(text.len());
        let mut last = 0;
        for span in &spans {
            plain.push_str(&text[last..span.start]);
            plain.push(' ');
            last = span.end;
        }
        plain.push_str(&text[last..]);

        Self {
            original: text.to_string(),
            plain: plain.to_lowercase(),
            literal,
        }
    }

    fn words(&self) -> Vec<&str> {
        WORD.find_iter(&self.plain).map(|m| m.as_str()).collect()
    }
}

fn quoted_spans(text: &str) -> Vec<Range<usize>> {
    QUOTED.find_iter(text).map(|m| m.range()).collect()
}

/// Text with `range` removed
fn cut(text: &str, range: Range<usize>) -> String {
    format!("{} {}", &text[..range.start], &text[range.end..])
}

/// Split a command into trimmed clauses, never inside quotes
///
/// Separators are applied in [`SEPARATORS`] order; a command with none of
/// them is a single clause.
#[must_use]
pub fn split_clauses(command: &str) -> Vec<String> {
    let mut pieces = vec![command.to_string()];
    for separator in SEPARATORS {
        pieces = pieces
            .iter()
            .flat_map(|piece| split_outside_quotes(piece, separator))
            .collect();
    }
    pieces
        .into_iter()
        .map(|p| p.trim().trim_end_matches(['.', '!']).trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn split_outside_quotes(text: &str, separator: &str) -> Vec<String> {
    let spans = quoted_spans(text);
    let lowered = text.to_ascii_lowercase();
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut search = 0;

    while let Some(offset) = lowered[search..].find(separator) {
        let at = search + offset;
        if spans.iter().any(|s| s.contains(&at)) {
            search = at + separator.len();
            continue;
        }
        pieces.push(text[start..at].to_string());
        start = at + separator.len();
        search = start;
    }
    pieces.push(text[start..].to_string());
    pieces
}

fn singular(word: &str) -> Option<&str> {
    word.strip_suffix('s').filter(|w| w.len() > 2)
}

fn is_noun(word: &str) -> bool {
    is_component_noun(word) || singular(word).is_some_and(is_component_noun)
}

fn keyword_selector(word: &str) -> Option<TargetSelector> {
    let word = if is_component_noun(word) {
        word
    } else {
        singular(word).filter(|w| is_component_noun(w))?
    };
    Some(if let Some(kind) = ComponentType::from_keyword(word) {
        TargetSelector::Type(kind)
    } else if let Some(role) = Role::from_keyword(word) {
        TargetSelector::Role(role)
    } else {
        TargetSelector::Noun(word.to_string())
    })
}

fn is_pronoun(words: &[&str], i: usize) -> bool {
    match words[i] {
        "it" | "its" | "them" | "they" | "their" => true,
        "this" | "that" | "these" | "those" => words.get(i + 1).map_or(true, |next| !is_noun(next)),
        _ => false,
    }
}

/// Target of a non-create clause: id, token, pronoun, keyword, token key
fn extract_selector(
    clause: &Clause,
    previous: Option<&TargetSelector>,
    document: &Document,
) -> Option<(TargetSelector, bool)> {
    let words = clause.words();
    selector_from_words(&words, &clause.plain, previous, document)
}

fn selector_from_words(
    words: &[&str],
    plain: &str,
    previous: Option<&TargetSelector>,
    document: &Document,
) -> Option<(TargetSelector, bool)> {
    if let Some(id) = words.iter().find_map(|w| {
        document
            .components
            .iter()
            .find(|c| c.id.to_ascii_lowercase() == *w)
            .map(|c| c.id.clone())
    }) {
        return Some((TargetSelector::Id(id), false));
    }

    if words.contains(&"token") {
        if let Some(key) = token_key(words, plain, document) {
            return Some((TargetSelector::Token(key), false));
        }
    }

    if let Some(previous) = previous {
        if (0..words.len()).any(|i| is_pronoun(words, i)) {
            return Some((previous.clone(), true));
        }
    }

    let nouns: Vec<usize> = (0..words.len()).filter(|&i| is_noun(words[i])).collect();
    let chosen = nouns
        .iter()
        .copied()
        .find(|&i| !is_field_word(words, i, nouns.len()));
    if let Some(selector) = chosen.and_then(|i| keyword_selector(words[i])) {
        return Some((selector, false));
    }

    token_key(words, plain, document).map(|key| (TargetSelector::Token(key), false))
}

/// Nouns that may name a field of another component rather than a component
const FIELD_WORDS: [&str; 5] = ["text", "label", "copy", "title", "caption"];

/// `words[i]` is a field word: "the text of the button", "text color"
fn is_field_word(words: &[&str], i: usize, nouns: usize) -> bool {
    if !FIELD_WORDS.contains(&words[i]) {
        return false;
    }
    match words.get(i + 1) {
        Some(&("color" | "colour" | "size")) => nouns > 1,
        Some(&("of" | "on" | "in" | "inside" | "for")) => words[i + 2..]
            .iter()
            .find(|w| !matches!(**w, "the" | "a" | "an" | "this" | "that"))
            .is_some_and(|w| is_noun(w)),
        _ => false,
    }
}

/// Longest token key named in the clause
fn token_key(words: &[&str], plain: &str, document: &Document) -> Option<String> {
    document
        .tokens
        .keys()
        .filter(|key| {
            let lowered = key.to_ascii_lowercase();
            let spaced = lowered.replace(['_', '-'], " ");
            words.contains(&lowered.as_str())
                || (spaced.contains(' ')
                    && format!(" {} ", plain.split_whitespace().collect::<Vec<_>>().join(" "))
                        .contains(&format!(" {spaced} ")))
        })
        .max_by_key(|key| key.len())
        .cloned()
}

/// Anchor of a create clause ("below the header")
fn anchor_selector(
    clause: &Clause,
    previous: Option<&TargetSelector>,
    document: &Document,
) -> Option<(TargetSelector, bool)> {
    let caps = ANCHOR.captures(&clause.plain)?;
    let rest = caps.get(2)?.as_str();
    let words: Vec<&str> = WORD.find_iter(rest).map(|m| m.as_str()).collect();
    selector_from_words(&words, rest, previous, document)
}

fn placement(plain: &str) -> Placement {
    match ANCHOR.captures(plain).and_then(|c| c.get(1)).map(|m| m.as_str()) {
        Some("above" | "before" | "over") => Placement::Before,
        _ => Placement::After,
    }
}

fn detect_create(clause: &Clause) -> Option<CreateValue> {
    let text = clause.plain.as_str();
    if STYLE_NOUNS.is_match(text) {
        return None;
    }
    let verb = CREATE.find(text)?;
    let component_type = WORD
        .find_iter(&text[verb.end()..])
        .map(|m| m.as_str())
        .take_while(|w| !CREATE_STOP.is_match(w))
        .find_map(|w| creatable_type(w).or_else(|| singular(w).and_then(creatable_type)))?;

    Some(CreateValue {
        component_type,
        text: clause.literal.clone(),
        placement: placement(text),
    })
}

fn detect_style(text: &str) -> Option<StyleChange> {
    if REGULAR.is_match(text) {
        return Some(StyleChange::Regular);
    }
    if BOLD.is_match(text) {
        return Some(StyleChange::Bold);
    }
    if SQUARE.is_match(text) {
        return Some(StyleChange::Square);
    }
    if ROUNDED.is_match(text) {
        return Some(StyleChange::Rounded);
    }
    if PADDING.is_match(text) {
        return Some(if LESS.is_match(text) {
            StyleChange::LessPadding
        } else {
            StyleChange::MorePadding
        });
    }
    if FONT.is_match(text) {
        if SHRINK.is_match(text) {
            return Some(StyleChange::SmallerFont);
        }
        if GROW.is_match(text) {
            return Some(StyleChange::LargerFont);
        }
    }
    None
}

fn detect_move(text: &str) -> Option<MoveValue> {
    if !MOVE.is_match(text) {
        return None;
    }
    let direction = match DIRECTION.captures(text)?.get(1)?.as_str() {
        "up" | "higher" | "upward" | "upwards" => MoveDirection::Up,
        "down" | "lower" | "downward" | "downwards" => MoveDirection::Down,
        "left" => MoveDirection::Left,
        _ => MoveDirection::Right,
    };
    let distance = DISTANCE.captures(text).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .and_then(|m| m.as_str().parse::<f64>().ok())
    });
    if distance.is_some_and(|d| !d.is_finite()) {
        return None;
    }
    Some(MoveValue {
        direction,
        distance,
    })
}

fn detect_resize(text: &str) -> Option<(ResizeValue, f64)> {
    let (direction, confidence) = if SHRINK.is_match(text) {
        (SizeDirection::Shrink, 0.9)
    } else if GROW.is_match(text) {
        (SizeDirection::Grow, 0.9)
    } else if RESIZE.is_match(text) {
        (SizeDirection::Grow, 0.7)
    } else {
        return None;
    };

    let dimension = if WIDTH.is_match(text) {
        Dimension::Width
    } else if HEIGHT.is_match(text) {
        Dimension::Height
    } else {
        Dimension::Both
    };
    let percent = PERCENT
        .captures(text)
        .and_then(|caps| caps.get(1)?.as_str().parse::<f64>().ok())
        .filter(|p| *p > 0.0);
    if percent.is_some_and(|p| !p.is_finite()) {
        return None;
    }

    Some((
        ResizeValue {
            direction,
            percent,
            dimension,
        },
        confidence,
    ))
}

fn detect_generic_text(original: &str) -> Option<TextValue> {
    let caps = RETEXT_TO
        .captures(original)
        .or_else(|| RETEXT_SAYS.captures(original))?;
    let text = caps
        .get(1)?
        .as_str()
        .trim()
        .trim_end_matches(['.', '!'])
        .trim();
    if text.is_empty() {
        None
    } else {
        Some(TextValue {
            text: text.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecompositionError;
    use crate::types::{IntentKind, Verb};
    use bpe_document::{BBox, Component};
    use pretty_assertions::assert_eq;

    fn doc() -> Document {
        Document::new(vec![
            Component::new("header", ComponentType::Text, BBox::new(0.0, 0.0, 800.0, 80.0))
                .with_role(Role::Hero)
                .with_text("Welcome"),
            Component::new("cta", ComponentType::Button, BBox::new(0.0, 100.0, 160.0, 50.0))
                .with_role(Role::Cta),
            Component::new("photo", ComponentType::Image, BBox::new(0.0, 200.0, 320.0, 200.0)),
        ])
        .with_token("spacing", 8.0)
        .with_token("primary_color", "#2563eb")
    }

    fn decomposer() -> IntentDecomposer {
        IntentDecomposer::new(&PipelineConfig::default())
    }

    fn plan(command: &str) -> Result<EditPlan, DecompositionError> {
        decomposer().decompose(command, &doc(), &mut ReasoningTrace::new())
    }

    fn single(command: &str) -> Intent {
        let plan = plan(command).unwrap();
        assert_eq!(plan.len(), 1, "{command}");
        plan.steps[0].intent.clone()
    }

    #[test]
    fn splits_on_separators_outside_quotes() {
        assert_eq!(
            split_clauses("Make header smaller and change its color to red"),
            vec!["Make header smaller", "change its color to red"]
        );
        assert_eq!(
            split_clauses("hide the logo; move the button down, then make it bold."),
            vec!["hide the logo", "move the button down", "make it bold"]
        );
        assert_eq!(
            split_clauses(r#"set the title to "Salt and Pepper""#),
            vec![r#"set the title to "Salt and Pepper""#]
        );
        assert_eq!(split_clauses("make it bigger"), vec!["make it bigger"]);
    }

    #[test]
    fn resize_with_type_keyword() {
        let intent = single("Make button bigger");
        assert_eq!(intent.target, TargetSelector::Type(ComponentType::Button));
        assert_eq!(
            intent.value,
            IntentValue::Resize(ResizeValue {
                direction: SizeDirection::Grow,
                percent: None,
                dimension: Dimension::Both,
            })
        );
        assert!((intent.confidence - 0.81).abs() < 1e-9);
    }

    #[test]
    fn pronoun_inherits_previous_target() {
        let plan = plan("Make header smaller and change its color to red").unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.steps[0].intent.kind(), IntentKind::Resize);
        assert_eq!(plan.steps[1].intent.kind(), IntentKind::Recolor);
        assert_eq!(plan.steps[1].intent.target, TargetSelector::Id("header".to_string()));
        assert!(plan.steps[1].intent.via_pronoun);
        assert_eq!(
            plan.steps[1].intent.value,
            IntentValue::Recolor(ColorValue {
                spec: ColorSpec::Hex("#ef4444".to_string()),
                channel: ColorChannel::Auto,
            })
        );
    }

    #[test]
    fn delete_and_resize_same_target_conflicts() {
        let err = plan("Delete button and resize it").unwrap_err();
        let DecompositionError::Conflict { conflicts } = err else {
            panic!("expected conflict, got {err:?}");
        };
        assert_eq!(conflicts[0].first, Verb::Delete);
        assert_eq!(conflicts[0].second, Verb::Grow);
        assert_eq!(conflicts[0].referent, "cta");
    }

    #[test]
    fn conflict_compares_resolved_ids() {
        // "cta" and "button" name the same component
        let err = plan("hide the cta and show the button").unwrap_err();
        assert!(err.is_conflict());
        assert!(plan("hide the cta and show the photo").is_ok());
    }

    #[test]
    fn steps_follow_precedence() {
        let plan = plan("make the photo red, hide the button and delete the header").unwrap();
        let kinds: Vec<_> = plan.steps.iter().map(|s| s.intent.kind()).collect();
        assert_eq!(
            kinds,
            vec![IntentKind::Delete, IntentKind::Visibility, IntentKind::Recolor]
        );
        assert_eq!(plan.steps[0].clause_index, 2);
    }

    #[test]
    fn unknown_clause_rejects_whole_plan() {
        let err = plan("make the header bigger and sing a song").unwrap_err();
        assert!(matches!(err, DecompositionError::Ambiguous { planned: 1, .. }));

        let err = plan("sing a song").unwrap_err();
        assert!(matches!(err, DecompositionError::Unresolvable { .. }));

        assert_eq!(plan("   ").unwrap_err(), DecompositionError::EmptyCommand);
    }

    #[test]
    fn unresolvable_target_is_skipped() {
        let err = plan("hide the footer").unwrap_err();
        let DecompositionError::Unresolvable { skipped } = err else {
            panic!("expected unresolvable");
        };
        assert_eq!(
            skipped[0].reason,
            SkipReason::UnresolvedTarget {
                kind: IntentKind::Visibility
            }
        );
    }

    #[test]
    fn quoted_literal_is_retext() {
        let intent = single("change the header to 'Hello and welcome'");
        assert_eq!(
            intent.value,
            IntentValue::Retext(TextValue {
                text: "Hello and welcome".to_string()
            })
        );
    }

    #[test]
    fn generic_retext_keeps_case() {
        let intent = single("set the title text to Big Summer Sale");
        assert_eq!(
            intent.value,
            IntentValue::Retext(TextValue {
                text: "Big Summer Sale".to_string()
            })
        );
    }

    #[test]
    fn color_channel_and_match_spec() {
        let intent = single("Change text color to the same as background");
        assert_eq!(intent.target, TargetSelector::Type(ComponentType::Text));
        assert_eq!(
            intent.value,
            IntentValue::Recolor(ColorValue {
                spec: ColorSpec::MatchBackground,
                channel: ColorChannel::Foreground,
            })
        );

        let intent = single("set the button background to #0F0");
        assert_eq!(
            intent.value,
            IntentValue::Recolor(ColorValue {
                spec: ColorSpec::Hex("#00ff00".to_string()),
                channel: ColorChannel::Background,
            })
        );
    }

    #[test]
    fn style_rules() {
        assert_eq!(single("make the header bold").value, IntentValue::Restyle(StyleChange::Bold));
        assert_eq!(
            single("remove the padding from the button").value,
            IntentValue::Restyle(StyleChange::LessPadding)
        );
        assert_eq!(
            single("add rounded corners to the button").value,
            IntentValue::Restyle(StyleChange::Rounded)
        );
        assert_eq!(
            single("make the header font bigger").value,
            IntentValue::Restyle(StyleChange::LargerFont)
        );
    }

    #[test]
    fn align_move_and_resize_rules() {
        assert_eq!(single("center the photo").value, IntentValue::Align(Alignment::Center));
        assert_eq!(
            single("move the button left by 40").value,
            IntentValue::Reposition(MoveValue {
                direction: MoveDirection::Left,
                distance: Some(40.0)
            })
        );
        assert_eq!(
            single("make the photo 50% narrower").value,
            IntentValue::Resize(ResizeValue {
                direction: SizeDirection::Shrink,
                percent: Some(50.0),
                dimension: Dimension::Width,
            })
        );
    }

    #[test]
    fn create_with_anchor_and_follow_up() {
        let plan = plan("add a button saying 'Buy now' below the header and make it green").unwrap();
        assert_eq!(plan.len(), 2);

        let create = &plan.steps[0].intent;
        assert_eq!(create.target, TargetSelector::Id("header".to_string()));
        assert_eq!(
            create.value,
            IntentValue::Create(CreateValue {
                component_type: ComponentType::Button,
                text: Some("Buy now".to_string()),
                placement: Placement::After,
            })
        );
        assert_eq!(plan.steps[1].intent.target, TargetSelector::Created(0));
    }

    #[test]
    fn field_words_defer_to_the_component_they_belong_to() {
        let intent = single("change the text of the button to Buy now");
        assert_eq!(intent.target, TargetSelector::Type(ComponentType::Button));
        assert_eq!(
            intent.value,
            IntentValue::Retext(TextValue {
                text: "Buy now".to_string()
            })
        );

        let intent = single("make the text on the button bold");
        assert_eq!(intent.target, TargetSelector::Type(ComponentType::Button));
        assert_eq!(intent.value, IntentValue::Restyle(StyleChange::Bold));

        let intent = single("make the text bold");
        assert_eq!(intent.target, TargetSelector::Type(ComponentType::Text));
    }

    #[test]
    fn bare_verb_shares_the_next_object() {
        let err = plan("Delete and resize the button").unwrap_err();
        let DecompositionError::Conflict { conflicts } = err else {
            panic!("expected conflict, got {err:?}");
        };
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].first, Verb::Delete);
        assert_eq!(conflicts[0].referent, "cta");

        let plan = plan("hide, then show the photo");
        assert!(plan.unwrap_err().is_conflict());
    }

    #[test]
    fn overflowing_numbers_are_not_edits() {
        let huge = "9".repeat(400);
        let err = plan(&format!("move the button down by {huge}")).unwrap_err();
        assert!(matches!(err, DecompositionError::Unresolvable { .. }));

        let err = plan(&format!("make the photo {huge}% bigger")).unwrap_err();
        assert!(matches!(err, DecompositionError::Unresolvable { .. }));
    }

    #[test]
    fn create_then_delete_conflicts() {
        assert!(plan("add an image and delete it").unwrap_err().is_conflict());
    }

    #[test]
    fn token_targets() {
        let intent = single("change the primary color token to red");
        assert_eq!(intent.target, TargetSelector::Token("primary_color".to_string()));

        let intent = single("increase spacing by 50%");
        assert_eq!(intent.target, TargetSelector::Token("spacing".to_string()));
    }

    #[test]
    fn low_confidence_is_skipped() {
        let strict = IntentDecomposer::new(&PipelineConfig::default().with_min_step_confidence(0.9));
        let err = strict
            .decompose("resize the photo", &doc(), &mut ReasoningTrace::new())
            .unwrap_err();
        let DecompositionError::Unresolvable { skipped } = err else {
            panic!("expected unresolvable");
        };
        assert!(matches!(skipped[0].reason, SkipReason::LowConfidence { .. }));
    }

    #[test]
    fn trace_explains_decisions() {
        let mut trace = ReasoningTrace::new();
        decomposer()
            .decompose("Delete button and resize it", &doc(), &mut trace)
            .unwrap_err();
        assert!(trace.mentions("split command into 2 clause(s)"));
        assert!(trace.mentions("conflict"));
    }
}
