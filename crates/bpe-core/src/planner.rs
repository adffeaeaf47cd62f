//! Patch planning
//!
//! Turns one resolved intent into patches against the running document.
//! Every patch is checked against the mutable-field allow-list before it
//! leaves the planner.

use crate::config::PipelineConfig;
use crate::error::PlanningError;
use crate::resolver::ResolvedTarget;
use crate::types::{
    Alignment, ColorChannel, ColorSpec, ColorValue, CreateValue, Dimension, Intent, IntentValue,
    MoveDirection, MoveValue, Placement, ResizeValue, SizeDirection, StyleChange,
};
use bpe_document::{BBox, Component, ComponentType, Document, Patch, PatchPath, Role, Scalar};
use bpe_validation::Viewport;

/// Vertical gap between stacked components
const STACK_GAP: f64 = 16.0;
const BOLD_WEIGHT: f64 = 700.0;
const REGULAR_WEIGHT: f64 = 400.0;
const ROUNDED_RADIUS: f64 = 8.0;
const DEFAULT_FONT_SIZE: f64 = 16.0;
const DEFAULT_PADDING: f64 = 16.0;

/// Converts resolved intents into allow-listed patches
#[derive(Debug, Clone)]
pub struct PatchPlanner {
    resize_step_percent: f64,
    move_step: f64,
    min_touch_target: f64,
    viewport: Viewport,
}

impl PatchPlanner {
    /// Create from pipeline configuration
    #[must_use]
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            resize_step_percent: config.resize_step_percent,
            move_step: config.move_step,
            min_touch_target: config.validation.min_touch_target,
            viewport: config.validation.viewport,
        }
    }

    /// Plan patches for one intent
    ///
    /// # Errors
    /// Returns error if the intent cannot apply to the target, or a
    /// generated patch would leave the allow-list
    pub fn plan(
        &self,
        intent: &Intent,
        target: &ResolvedTarget,
        document: &Document,
    ) -> Result<Vec<Patch>, PlanningError> {
        let patches = match target {
            ResolvedTarget::Component { index, .. } => {
                let component = document.components.get(*index).ok_or_else(|| {
                    PlanningError::UnsupportedTarget {
                        kind: intent.kind(),
                        target: target.to_string(),
                    }
                })?;
                self.plan_component(intent, *index, component, document)?
            }
            ResolvedTarget::Token { key } => self.plan_token(intent, key, document)?,
            ResolvedTarget::Document => match &intent.value {
                IntentValue::Create(value) => vec![self.create(value, None, document)],
                _ => {
                    return Err(PlanningError::UnsupportedTarget {
                        kind: intent.kind(),
                        target: target.to_string(),
                    })
                }
            },
        };

        for patch in &patches {
            patch.validate()?;
        }
        tracing::debug!(kind = %intent.kind(), target = %target, patches = patches.len(), "patches planned");
        Ok(patches)
    }

    fn plan_component(
        &self,
        intent: &Intent,
        index: usize,
        component: &Component,
        document: &Document,
    ) -> Result<Vec<Patch>, PlanningError> {
        let patches = match &intent.value {
            IntentValue::Delete => vec![Patch::remove(PatchPath::Component(index))],
            IntentValue::Create(value) => vec![self.create(value, Some(index), document)],
            IntentValue::Visibility(visible) => {
                vec![set_visual(index, component, "visible", Scalar::Bool(*visible))]
            }
            IntentValue::Restyle(change) => vec![self.restyle(index, component, *change)],
            IntentValue::Reposition(value) => vec![self.reposition(index, component, value)],
            IntentValue::Resize(value) => self.resize(index, component, value),
            IntentValue::Align(alignment) => vec![self.align(index, component, *alignment)],
            IntentValue::Retext(value) => {
                let path = PatchPath::Text(index);
                let text = Scalar::Text(value.text.clone());
                vec![if component.text.is_some() {
                    Patch::replace(path, text)
                } else {
                    Patch::add(path, text)
                }]
            }
            IntentValue::Recolor(value) => vec![recolor(index, component, value)?],
        };
        Ok(patches)
    }

    fn plan_token(
        &self,
        intent: &Intent,
        key: &str,
        document: &Document,
    ) -> Result<Vec<Patch>, PlanningError> {
        let unsupported = || PlanningError::UnsupportedTarget {
            kind: intent.kind(),
            target: format!("token '{key}'"),
        };
        let current = document.tokens.get(key).ok_or_else(unsupported)?;

        let value = match &intent.value {
            IntentValue::Recolor(ColorValue {
                spec: ColorSpec::Hex(hex),
                ..
            }) => Scalar::Text(hex.clone()),
            IntentValue::Resize(resize) => {
                let n = current.as_f64().ok_or_else(unsupported)?;
                Scalar::Number(self.scale(n, resize).max(0.0))
            }
            _ => return Err(unsupported()),
        };
        Ok(vec![Patch::replace(PatchPath::token(key), value)])
    }

    fn percent(&self, explicit: Option<f64>) -> f64 {
        explicit.unwrap_or(self.resize_step_percent)
    }

    /// Rounded value after a relative resize
    fn scale(&self, value: f64, resize: &ResizeValue) -> f64 {
        let fraction = self.percent(resize.percent) / 100.0;
        let factor = match resize.direction {
            SizeDirection::Grow => 1.0 + fraction,
            SizeDirection::Shrink => (1.0 - fraction).max(0.0),
        };
        (value * factor).round()
    }

    fn resize(&self, index: usize, component: &Component, resize: &ResizeValue) -> Vec<Patch> {
        let mut bbox = component.bbox;
        let height_floor = if component.is_interactive() {
            self.min_touch_target.max(1.0)
        } else {
            1.0
        };
        if matches!(resize.dimension, Dimension::Both | Dimension::Width) {
            bbox.width = self.scale(bbox.width, resize).max(1.0);
        }
        if matches!(resize.dimension, Dimension::Both | Dimension::Height) {
            bbox.height = self.scale(bbox.height, resize).max(height_floor);
        }

        let mut patches = vec![Patch::replace(PatchPath::Bbox(index), bbox)];
        if component.visual.contains_key("width") && bbox.width != component.bbox.width {
            patches.push(set_visual(index, component, "width", Scalar::Number(bbox.width)));
        }
        if component.visual.contains_key("height") && bbox.height != component.bbox.height {
            patches.push(set_visual(index, component, "height", Scalar::Number(bbox.height)));
        }
        if component.kind == ComponentType::Text && resize.dimension == Dimension::Both {
            if let Some(size) = component.visual_number("font_size") {
                let scaled = self.scale(size, resize).max(1.0);
                patches.push(set_visual(index, component, "font_size", Scalar::Number(scaled)));
            }
        }
        patches
    }

    fn reposition(&self, index: usize, component: &Component, value: &MoveValue) -> Patch {
        let distance = value.distance.unwrap_or(self.move_step);
        let mut bbox = component.bbox;
        match value.direction {
            MoveDirection::Up => bbox.y = (bbox.y - distance).max(0.0),
            MoveDirection::Down => bbox.y += distance,
            MoveDirection::Left => bbox.x = (bbox.x - distance).max(0.0),
            MoveDirection::Right => bbox.x += distance,
        }
        Patch::replace(PatchPath::Bbox(index), bbox)
    }

    fn align(&self, index: usize, component: &Component, alignment: Alignment) -> Patch {
        let mut bbox = component.bbox;
        let free = (self.viewport.width - bbox.width).max(0.0);
        bbox.x = match alignment {
            Alignment::Left => 0.0,
            Alignment::Center => (free / 2.0).round(),
            Alignment::Right => free,
        };
        Patch::replace(PatchPath::Bbox(index), bbox)
    }

    fn restyle(&self, index: usize, component: &Component, change: StyleChange) -> Patch {
        let step = ResizeValue {
            direction: SizeDirection::Grow,
            percent: None,
            dimension: Dimension::Both,
        };
        let shrink = ResizeValue {
            direction: SizeDirection::Shrink,
            ..step
        };
        let (key, value) = match change {
            StyleChange::Bold => ("font_weight", BOLD_WEIGHT),
            StyleChange::Regular => ("font_weight", REGULAR_WEIGHT),
            StyleChange::Rounded => ("border_radius", ROUNDED_RADIUS),
            StyleChange::Square => ("border_radius", 0.0),
            StyleChange::MorePadding | StyleChange::LessPadding => {
                let base = component.visual_number("padding").unwrap_or(DEFAULT_PADDING);
                let resize = if change == StyleChange::MorePadding { &step } else { &shrink };
                ("padding", self.scale(base, resize).max(0.0))
            }
            StyleChange::LargerFont | StyleChange::SmallerFont => {
                let base = component.visual_number("font_size").unwrap_or(DEFAULT_FONT_SIZE);
                let resize = if change == StyleChange::LargerFont { &step } else { &shrink };
                ("font_size", self.scale(base, resize).max(1.0))
            }
        };
        set_visual(index, component, key, Scalar::Number(value))
    }

    /// New component, inserted after/before `anchor` or appended below everything
    fn create(&self, value: &CreateValue, anchor: Option<usize>, document: &Document) -> Patch {
        let (width, height) = default_size(value.component_type);
        let width = width.min(self.viewport.width);
        let id = document.fresh_id(value.component_type);

        let (index, x, y) = match anchor.and_then(|i| document.components.get(i).map(|c| (i, c))) {
            Some((i, a)) if value.placement == Placement::Before => {
                (i, a.bbox.x, (a.bbox.y - height - STACK_GAP).max(0.0))
            }
            Some((i, a)) => (i + 1, a.bbox.x, a.bbox.bottom() + STACK_GAP),
            None => {
                let bottom = document
                    .components
                    .iter()
                    .map(|c| c.bbox.bottom())
                    .fold(None, |acc: Option<f64>, b| Some(acc.map_or(b, |m| m.max(b))));
                let y = bottom.map_or(0.0, |b| b + STACK_GAP);
                (document.components.len(), 0.0, y)
            }
        };

        let mut component = Component::new(id, value.component_type, BBox::new(x, y, width, height));
        if value.component_type == ComponentType::Button {
            component = component.with_role(Role::Cta);
        }
        let text = value.text.clone().or_else(|| default_text(value.component_type));
        if let Some(text) = text {
            component = component.with_text(text);
        }
        Patch::add(PatchPath::Component(index), component)
    }
}

fn default_size(kind: ComponentType) -> (f64, f64) {
    match kind {
        ComponentType::Text => (400.0, 40.0),
        ComponentType::Button => (160.0, 48.0),
        ComponentType::Image => (320.0, 200.0),
        ComponentType::Container => (800.0, 200.0),
        ComponentType::Input => (320.0, 48.0),
        ComponentType::Icon => (32.0, 32.0),
        ComponentType::Divider => (800.0, 2.0),
        ComponentType::Card => (360.0, 240.0),
    }
}

fn default_text(kind: ComponentType) -> Option<String> {
    match kind {
        ComponentType::Text => Some("New text".to_string()),
        ComponentType::Button => Some("Button".to_string()),
        _ => None,
    }
}

/// `replace` when the entry exists, `add` otherwise
fn set_visual(index: usize, component: &Component, key: &str, value: Scalar) -> Patch {
    let path = PatchPath::visual(index, key);
    if component.visual.contains_key(key) {
        Patch::replace(path, value)
    } else {
        Patch::add(path, value)
    }
}

fn uses_background(component: &Component) -> bool {
    matches!(
        component.kind,
        ComponentType::Button | ComponentType::Container | ComponentType::Card
    ) || component.role == Some(Role::Cta)
}

fn recolor(index: usize, component: &Component, value: &ColorValue) -> Result<Patch, PlanningError> {
    let key = match value.channel {
        ColorChannel::Foreground => "color",
        ColorChannel::Background => "bg_color",
        ColorChannel::Auto if uses_background(component) => "bg_color",
        ColorChannel::Auto => "color",
    };
    let color = match &value.spec {
        ColorSpec::Hex(hex) => hex.clone(),
        ColorSpec::MatchBackground => copy_color(component, "bg_color")?,
        ColorSpec::MatchForeground => copy_color(component, "color")?,
    };
    Ok(set_visual(index, component, key, Scalar::Text(color)))
}

fn copy_color(component: &Component, field: &'static str) -> Result<String, PlanningError> {
    component
        .visual_str(field)
        .map(str::to_string)
        .ok_or_else(|| PlanningError::MissingField {
            id: component.id.clone(),
            field,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TargetSelector, TextValue};
    use bpe_document::{apply_patches, PatchOp, PatchValue};
    use pretty_assertions::assert_eq;

    fn doc() -> Document {
        Document::new(vec![
            Component::new("header", ComponentType::Text, BBox::new(0.0, 0.0, 800.0, 80.0))
                .with_role(Role::Hero)
                .with_visual("font_size", 32.0)
                .with_visual("color", "#111111"),
            Component::new("cta", ComponentType::Button, BBox::new(0.0, 100.0, 160.0, 50.0))
                .with_role(Role::Cta)
                .with_visual("height", 50.0)
                .with_visual("bg_color", "#2563eb"),
        ])
        .with_token("spacing", 8.0)
    }

    fn planner() -> PatchPlanner {
        PatchPlanner::new(&PipelineConfig::default())
    }

    fn target(doc: &Document, id: &str) -> ResolvedTarget {
        ResolvedTarget::Component {
            id: id.to_string(),
            index: doc.index_of(id).unwrap(),
        }
    }

    fn run(value: IntentValue, id: &str) -> Document {
        let doc = doc();
        let intent = Intent::new(value, TargetSelector::Id(id.to_string()), "test");
        let patches = planner().plan(&intent, &target(&doc, id), &doc).unwrap();
        apply_patches(&doc, &patches).unwrap()
    }

    fn resize(direction: SizeDirection, percent: Option<f64>) -> IntentValue {
        IntentValue::Resize(ResizeValue {
            direction,
            percent,
            dimension: Dimension::Both,
        })
    }

    #[test]
    fn grow_applies_step_and_mirrors_visual_height() {
        let out = run(resize(SizeDirection::Grow, None), "cta");
        let cta = out.component("cta").unwrap();
        assert_eq!(cta.bbox, BBox::new(0.0, 100.0, 192.0, 60.0));
        assert_eq!(cta.visual_number("height"), Some(60.0));
    }

    #[test]
    fn shrink_floors_interactive_height() {
        let out = run(resize(SizeDirection::Shrink, Some(50.0)), "cta");
        let cta = out.component("cta").unwrap();
        assert_eq!(cta.bbox.height, 44.0);
        assert_eq!(cta.bbox.width, 80.0);
    }

    #[test]
    fn text_resize_scales_font() {
        let out = run(resize(SizeDirection::Shrink, None), "header");
        let header = out.component("header").unwrap();
        assert_eq!(header.bbox.height, 64.0);
        assert_eq!(header.visual_number("font_size"), Some(26.0));
    }

    #[test]
    fn auto_channel_picks_background_for_buttons() {
        let red = ColorValue {
            spec: ColorSpec::Hex("#ef4444".to_string()),
            channel: ColorChannel::Auto,
        };
        let out = run(IntentValue::Recolor(red.clone()), "cta");
        assert_eq!(out.component("cta").unwrap().visual_str("bg_color"), Some("#ef4444"));

        let out = run(IntentValue::Recolor(red), "header");
        assert_eq!(out.component("header").unwrap().visual_str("color"), Some("#ef4444"));
    }

    #[test]
    fn match_background_needs_bg_color() {
        let doc = doc();
        let intent = Intent::new(
            IntentValue::Recolor(ColorValue {
                spec: ColorSpec::MatchBackground,
                channel: ColorChannel::Foreground,
            }),
            TargetSelector::Id("header".to_string()),
            "test",
        );
        let err = planner().plan(&intent, &target(&doc, "header"), &doc).unwrap_err();
        assert_eq!(
            err,
            PlanningError::MissingField {
                id: "header".to_string(),
                field: "bg_color"
            }
        );
    }

    #[test]
    fn align_and_move() {
        let out = run(IntentValue::Align(Alignment::Center), "cta");
        assert_eq!(out.component("cta").unwrap().bbox.x, 640.0);

        let out = run(
            IntentValue::Reposition(MoveValue {
                direction: MoveDirection::Up,
                distance: None,
            }),
            "cta",
        );
        assert_eq!(out.component("cta").unwrap().bbox.y, 84.0);
    }

    #[test]
    fn restyle_writes_style_fields() {
        let out = run(IntentValue::Restyle(StyleChange::Bold), "header");
        assert_eq!(out.component("header").unwrap().visual_number("font_weight"), Some(700.0));

        let out = run(IntentValue::Restyle(StyleChange::MorePadding), "cta");
        assert_eq!(out.component("cta").unwrap().visual_number("padding"), Some(19.0));
    }

    #[test]
    fn visibility_and_text() {
        let out = run(IntentValue::Visibility(false), "cta");
        assert!(!out.component("cta").unwrap().is_visible());

        let out = run(
            IntentValue::Retext(TextValue {
                text: "Start free trial".to_string(),
            }),
            "cta",
        );
        assert_eq!(out.component("cta").unwrap().text.as_deref(), Some("Start free trial"));
    }

    #[test]
    fn create_after_anchor() {
        let doc = doc();
        let intent = Intent::new(
            IntentValue::Create(CreateValue {
                component_type: ComponentType::Button,
                text: Some("Buy".to_string()),
                placement: Placement::After,
            }),
            TargetSelector::Id("header".to_string()),
            "test",
        );
        let patches = planner().plan(&intent, &target(&doc, "header"), &doc).unwrap();
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].op, PatchOp::Add);
        assert_eq!(patches[0].path, PatchPath::Component(1));
        let Some(PatchValue::Component(created)) = &patches[0].value else {
            panic!("expected component");
        };
        assert_eq!(created.id, "button-1");
        assert_eq!(created.bbox, BBox::new(0.0, 96.0, 160.0, 48.0));

        let appended = planner()
            .plan(&intent, &ResolvedTarget::Document, &doc)
            .unwrap();
        assert_eq!(appended[0].path, PatchPath::Component(2));
    }

    #[test]
    fn token_recolor_and_resize() {
        let doc = doc();
        let grow = Intent::new(
            resize(SizeDirection::Grow, Some(50.0)),
            TargetSelector::Token("spacing".to_string()),
            "test",
        );
        let patches = planner()
            .plan(&grow, &ResolvedTarget::Token { key: "spacing".to_string() }, &doc)
            .unwrap();
        assert_eq!(patches, vec![Patch::replace(PatchPath::token("spacing"), Scalar::Number(12.0))]);

        let hide = Intent::new(
            IntentValue::Visibility(false),
            TargetSelector::Token("spacing".to_string()),
            "test",
        );
        assert!(matches!(
            planner().plan(&hide, &ResolvedTarget::Token { key: "spacing".to_string() }, &doc),
            Err(PlanningError::UnsupportedTarget { .. })
        ));
    }

    #[test]
    fn every_patch_is_allow_listed() {
        let values = [
            IntentValue::Delete,
            IntentValue::Visibility(true),
            IntentValue::Restyle(StyleChange::Rounded),
            IntentValue::Restyle(StyleChange::SmallerFont),
            IntentValue::Align(Alignment::Right),
            resize(SizeDirection::Grow, None),
        ];
        let doc = doc();
        for value in values {
            let intent = Intent::new(value, TargetSelector::Id("cta".to_string()), "test");
            for patch in planner().plan(&intent, &target(&doc, "cta"), &doc).unwrap() {
                assert!(patch.path.is_allow_listed(), "{patch}");
            }
        }
    }
}
