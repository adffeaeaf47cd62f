//! Document checks
//!
//! [`StandardValidator`] runs every structural, layout and accessibility
//! check against a document and collects the issues into a
//! [`ValidationReport`]. Checks never stop early; a report lists everything.

use crate::report::{Check, ValidationIssue, ValidationReport};
use crate::rules::ValidationRules;
use bpe_document::{Component, Document, Scalar};
use std::collections::BTreeSet;
use std::fmt::Debug;

/// Read-only document validation capability
pub trait DocumentValidator: Send + Sync + Debug {
    /// Validate a document, never failing
    fn validate(&self, document: &Document) -> ValidationReport;
}

/// Built-in validator driven by [`ValidationRules`]
#[derive(Debug, Clone, Default)]
pub struct StandardValidator {
    rules: ValidationRules,
}

impl StandardValidator {
    /// Create with rules
    #[inline]
    #[must_use]
    pub fn new(rules: ValidationRules) -> Self {
        Self { rules }
    }

    /// Active rules
    #[inline]
    #[must_use]
    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    fn check_ids(document: &Document, issues: &mut Vec<ValidationIssue>) {
        let mut seen = BTreeSet::new();
        for component in &document.components {
            if !seen.insert(component.id.as_str()) {
                issues.push(ValidationIssue::component(
                    Check::DuplicateId,
                    &component.id,
                    "id is used by more than one component",
                ));
            }
        }
    }

    fn check_geometry(&self, component: &Component, issues: &mut Vec<ValidationIssue>) {
        let bbox = component.bbox;
        let finite = [bbox.x, bbox.y, bbox.width, bbox.height]
            .into_iter()
            .chain(component.visual.values().filter_map(Scalar::as_f64))
            .all(f64::is_finite);
        if !finite {
            issues.push(ValidationIssue::component(
                Check::NonFinite,
                &component.id,
                "bbox or visual value is not a finite number",
            ));
            return;
        }
        if !bbox.has_positive_size() {
            issues.push(ValidationIssue::component(
                Check::NonPositiveBox,
                &component.id,
                format!("bbox size {}x{} is not positive", bbox.width, bbox.height),
            ));
            return;
        }

        let viewport = self.rules.viewport;
        let horizontal = (bbox.right() - viewport.width).max(-bbox.x).max(0.0);
        let vertical = (bbox.bottom() - viewport.height).max(-bbox.y).max(0.0);

        if horizontal > self.rules.horizontal_slack() {
            issues.push(ValidationIssue::component(
                Check::Overflow,
                &component.id,
                format!("extends {horizontal} units outside the viewport width"),
            ));
        } else if horizontal > 0.0 || vertical > 0.0 {
            issues.push(ValidationIssue::component(
                Check::MinorOverflow,
                &component.id,
                format!("extends outside the viewport by {}", horizontal.max(vertical)),
            ));
        }

        if component.is_interactive()
            && component.is_visible()
            && bbox.height < self.rules.min_touch_target
        {
            issues.push(ValidationIssue::component(
                Check::TouchTarget,
                &component.id,
                format!(
                    "height {} is below the {} touch target",
                    bbox.height, self.rules.min_touch_target
                ),
            ));
        }
    }

    fn check_contrast(component: &Component, issues: &mut Vec<ValidationIssue>) {
        let (Some(fg), Some(bg)) = (component.visual_str("color"), component.visual_str("bg_color"))
        else {
            return;
        };
        if same_color(fg, bg) {
            issues.push(ValidationIssue::component(
                Check::InvisibleText,
                &component.id,
                format!("text color {fg} equals background {bg}"),
            ));
        }
    }

    fn check_overlaps(document: &Document, issues: &mut Vec<ValidationIssue>) {
        let visible: Vec<&Component> = document
            .components
            .iter()
            .filter(|c| c.is_visible() && c.bbox.has_positive_size())
            .collect();

        for (i, a) in visible.iter().enumerate() {
            for b in &visible[i + 1..] {
                let nested = a.bbox.contains(&b.bbox) || b.bbox.contains(&a.bbox);
                if !nested && a.bbox.overlaps(&b.bbox) {
                    issues.push(ValidationIssue::component(
                        Check::Overlap,
                        &a.id,
                        format!("overlaps '{}'", b.id),
                    ));
                }
            }
        }
    }

    fn check_tokens(document: &Document, issues: &mut Vec<ValidationIssue>) {
        for (key, value) in &document.tokens {
            if let Some(reason) = token_problem(key, value) {
                issues.push(ValidationIssue::global(
                    Check::InconsistentToken,
                    format!("token '{key}' {reason}"),
                ));
            }
        }
    }
}

impl DocumentValidator for StandardValidator {
    fn validate(&self, document: &Document) -> ValidationReport {
        let mut issues = Vec::new();

        Self::check_ids(document, &mut issues);
        for component in &document.components {
            self.check_geometry(component, &mut issues);
            Self::check_contrast(component, &mut issues);
        }
        Self::check_overlaps(document, &mut issues);
        Self::check_tokens(document, &mut issues);

        let report = ValidationReport::new(issues);
        tracing::debug!(
            components = document.components.len(),
            issues = report.issues.len(),
            risk = report.risk_score(),
            "document validated"
        );
        report
    }
}

/// Validate with the default rules
///
/// Standalone entry for callers that only need a report.
#[must_use]
pub fn quick_validate(document: &Document) -> ValidationReport {
    StandardValidator::default().validate(document)
}

const NUMERIC_TOKEN_HINTS: [&str; 6] = ["spacing", "space", "padding", "radius", "gap", "size"];

fn token_problem(key: &str, value: &Scalar) -> Option<&'static str> {
    let key = key.to_ascii_lowercase();
    if key.contains("color") {
        return match value.as_str().and_then(normalize_hex) {
            Some(_) => None,
            None => Some("is not a hex color"),
        };
    }
    if NUMERIC_TOKEN_HINTS.iter().any(|hint| key.contains(hint)) {
        return match value.as_f64() {
            Some(n) if n.is_finite() && n >= 0.0 => None,
            Some(_) => Some("must not be negative"),
            None => Some("is not a number"),
        };
    }
    None
}

/// Lower-case `#rrggbb` form of a `#rgb`/`#rrggbb` color
#[must_use]
pub fn normalize_hex(color: &str) -> Option<String> {
    let digits = color.trim().strip_prefix('#')?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match digits.len() {
        6 => Some(format!("#{}", digits.to_ascii_lowercase())),
        3 => Some(
            digits
                .chars()
                .fold(String::from("#"), |mut acc, c| {
                    let c = c.to_ascii_lowercase();
                    acc.push(c);
                    acc.push(c);
                    acc
                }),
        ),
        _ => None,
    }
}

/// Colors equal after normalization (non-hex values compare case-insensitively)
#[must_use]
pub fn same_color(a: &str, b: &str) -> bool {
    match (normalize_hex(a), normalize_hex(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a.trim().eq_ignore_ascii_case(b.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpe_document::{BBox, ComponentType, Role};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn checks(report: &ValidationReport) -> Vec<Check> {
        report.issues.iter().map(|i| i.check).collect()
    }

    fn button(id: &str, bbox: BBox) -> Component {
        Component::new(id, ComponentType::Button, bbox).with_role(Role::Cta)
    }

    #[test]
    fn clean_document_has_no_issues() {
        let doc = Document::new(vec![
            Component::new("title", ComponentType::Text, BBox::new(0.0, 0.0, 600.0, 80.0)),
            button("cta", BBox::new(0.0, 100.0, 160.0, 50.0)),
        ])
        .with_token("spacing", 8.0)
        .with_token("primary_color", "#2563EB");

        let report = quick_validate(&doc);
        assert_eq!(report.issues, vec![]);
        assert!((report.risk_score()).abs() < f64::EPSILON);
    }

    #[test]
    fn small_button_fails_touch_target() {
        let doc = Document::new(vec![button("cta", BBox::new(0.0, 0.0, 160.0, 40.0))]);
        let report = quick_validate(&doc);
        assert_eq!(checks(&report), vec![Check::TouchTarget]);
        assert!(report.has_errors());
    }

    #[test]
    fn hidden_button_is_exempt_from_touch_target() {
        let doc = Document::new(vec![
            button("cta", BBox::new(0.0, 0.0, 160.0, 40.0)).with_visual("visible", false),
        ]);
        assert!(quick_validate(&doc).is_valid());
    }

    #[test]
    fn equal_colors_are_invisible_text() {
        let doc = Document::new(vec![Component::new(
            "note",
            ComponentType::Text,
            BBox::new(0.0, 0.0, 100.0, 20.0),
        )
        .with_visual("color", "#FFF")
        .with_visual("bg_color", "#ffffff")]);
        assert_eq!(checks(&quick_validate(&doc)), vec![Check::InvisibleText]);
    }

    #[test]
    fn overflow_severity_depends_on_tolerance() {
        let minor = Document::new(vec![Component::new(
            "wide",
            ComponentType::Container,
            BBox::new(0.0, 0.0, 1500.0, 100.0),
        )]);
        assert_eq!(checks(&quick_validate(&minor)), vec![Check::MinorOverflow]);

        let major = Document::new(vec![Component::new(
            "wide",
            ComponentType::Container,
            BBox::new(0.0, 0.0, 2000.0, 100.0),
        )]);
        assert_eq!(checks(&quick_validate(&major)), vec![Check::Overflow]);

        let below_fold = Document::new(vec![Component::new(
            "footer",
            ComponentType::Container,
            BBox::new(0.0, 880.0, 1440.0, 200.0),
        )]);
        assert_eq!(checks(&quick_validate(&below_fold)), vec![Check::MinorOverflow]);
    }

    #[test]
    fn nested_boxes_do_not_overlap() {
        let doc = Document::new(vec![
            Component::new("card", ComponentType::Card, BBox::new(0.0, 0.0, 400.0, 300.0)),
            Component::new("inside", ComponentType::Text, BBox::new(10.0, 10.0, 100.0, 20.0)),
            Component::new("across", ComponentType::Image, BBox::new(350.0, 250.0, 100.0, 100.0)),
        ]);
        let report = quick_validate(&doc);
        assert_eq!(checks(&report), vec![Check::Overlap]);
        assert_eq!(report.issues[0].component_id.as_deref(), Some("card"));
    }

    #[test]
    fn non_finite_geometry_is_an_error() {
        let doc = Document::new(vec![
            Component::new("far", ComponentType::Text, BBox::new(0.0, f64::INFINITY, 100.0, 20.0)),
            Component::new("huge", ComponentType::Text, BBox::new(0.0, 40.0, 100.0, 20.0))
                .with_visual("font_size", f64::NAN),
        ]);
        let report = quick_validate(&doc);
        assert_eq!(checks(&report), vec![Check::NonFinite, Check::NonFinite]);
        assert!(report.has_errors());
        assert!(report.risk_score() >= 1.0);
    }

    #[test]
    fn tokens_must_stay_consistent() {
        let doc = Document::default()
            .with_token("spacing", -4.0)
            .with_token("accent_color", "blue-ish")
            .with_token("font_family", "Inter");
        let report = quick_validate(&doc);
        assert_eq!(
            checks(&report),
            vec![Check::InconsistentToken, Check::InconsistentToken]
        );
    }

    #[test]
    fn duplicate_ids_and_empty_boxes_are_errors() {
        let doc = Document::new(vec![
            Component::new("a", ComponentType::Text, BBox::new(0.0, 0.0, 10.0, 10.0)),
            Component::new("a", ComponentType::Text, BBox::new(0.0, 20.0, 0.0, 10.0)),
        ]);
        let report = quick_validate(&doc);
        assert_eq!(checks(&report), vec![Check::DuplicateId, Check::NonPositiveBox]);
        assert!((report.risk_score() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn hex_normalization() {
        assert_eq!(normalize_hex("#ABC").as_deref(), Some("#aabbcc"));
        assert_eq!(normalize_hex("#2563eb").as_deref(), Some("#2563eb"));
        assert_eq!(normalize_hex("red"), None);
        assert_eq!(normalize_hex("#12345"), None);
        assert!(same_color("White", "white"));
    }

    #[test]
    fn report_serializes_with_snake_case_checks() {
        let doc = Document::new(vec![button("cta", BBox::new(0.0, 0.0, 160.0, 40.0))]);
        let json = serde_json::to_value(quick_validate(&doc)).unwrap();
        assert_eq!(json["issues"][0]["check"], "touch_target");
        assert_eq!(json["issues"][0]["severity"], "error");
        assert_eq!(json["issues"][0]["component_id"], "cta");
    }

    proptest! {
        #[test]
        fn normalized_hex_is_a_fixed_point(color in "#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})") {
            let once = normalize_hex(&color).unwrap();
            prop_assert_eq!(once.len(), 7);
            prop_assert_eq!(normalize_hex(&once), Some(once.clone()));
            prop_assert!(same_color(&color, &once));
        }

        #[test]
        fn risk_stays_in_unit_range(heights in prop::collection::vec(1.0f64..100.0, 0..8)) {
            let components = heights
                .iter()
                .enumerate()
                .map(|(i, h)| button(&format!("b{i}"), BBox::new(0.0, 120.0 * i as f64, 160.0, *h)))
                .collect();
            let risk = quick_validate(&Document::new(components)).risk_score();
            prop_assert!((0.0..=1.0).contains(&risk));
        }
    }
}
