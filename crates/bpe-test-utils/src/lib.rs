//! Testing utilities for the blueprint edit workspace
//!
//! Shared fixtures, proptest strategies and tracing setup.

#![allow(missing_docs)]

use bpe_document::{BBox, Component, ComponentType, Document, Role};
use proptest::prelude::*;
use std::sync::Once;

static TRACING: Once = Once::new();

/// Install a test-writer subscriber filtered by `RUST_LOG`
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn cta_button() -> Component {
    Component::new("cta", ComponentType::Button, BBox::new(100.0, 200.0, 160.0, 50.0))
        .with_role(Role::Cta)
        .with_text("Sign up")
        .with_visual("height", 50.0)
        .with_visual("color", "#ffffff")
        .with_visual("bg_color", "#2563eb")
}

/// One CTA button, height 50
pub fn single_button() -> Document {
    Document::new(vec![cta_button()]).with_metadata("updated_at", "2024-05-01T12:00:00Z")
}

/// Hero header above a CTA button
pub fn header_and_cta() -> Document {
    Document::new(vec![
        Component::new("header", ComponentType::Text, BBox::new(100.0, 40.0, 800.0, 80.0))
            .with_role(Role::Hero)
            .with_text("Build faster")
            .with_visual("font_size", 32.0)
            .with_visual("color", "#111111"),
        cta_button(),
    ])
    .with_token("primary_color", "#2563eb")
    .with_token("spacing", 8.0)
}

/// A text component whose color equals its background
pub fn invisible_text() -> Document {
    Document::new(vec![Component::new(
        "subtitle",
        ComponentType::Text,
        BBox::new(100.0, 140.0, 600.0, 40.0),
    )
    .with_role(Role::Content)
    .with_text("Ship in days, not months")
    .with_visual("color", "#333333")
    .with_visual("bg_color", "#333333")])
}

/// A small landing page with one component per common role
pub fn landing_page() -> Document {
    Document::new(vec![
        Component::new("nav", ComponentType::Container, BBox::new(0.0, 0.0, 1440.0, 64.0))
            .with_role(Role::Navigation),
        Component::new("logo", ComponentType::Image, BBox::new(24.0, 12.0, 120.0, 40.0))
            .with_role(Role::Navigation),
        Component::new("headline", ComponentType::Text, BBox::new(120.0, 120.0, 800.0, 72.0))
            .with_role(Role::Hero)
            .with_text("Design at the speed of thought")
            .with_visual("font_size", 48.0)
            .with_visual("font_weight", 700.0),
        Component::new("intro", ComponentType::Text, BBox::new(120.0, 208.0, 640.0, 48.0))
            .with_role(Role::Content)
            .with_text("Blueprints that edit themselves."),
        Component::new("hero-image", ComponentType::Image, BBox::new(900.0, 120.0, 420.0, 280.0))
            .with_role(Role::Media),
        Component::new("signup", ComponentType::Button, BBox::new(120.0, 288.0, 180.0, 52.0))
            .with_role(Role::Cta)
            .with_text("Get started")
            .with_visual("color", "#ffffff")
            .with_visual("bg_color", "#111827")
            .with_visual("border_radius", 8.0),
        Component::new("footer", ComponentType::Container, BBox::new(0.0, 800.0, 1440.0, 80.0))
            .with_role(Role::Footer),
    ])
    .with_token("primary_color", "#111827")
    .with_token("spacing", 8.0)
    .with_token("radius", 8.0)
    .with_metadata("author", "fixtures")
}

const PALETTE: [&str; 6] = ["#ffffff", "#111827", "#2563eb", "#16a34a", "#f59e0b", "#ef4444"];

const CLAUSES: [&str; 22] = [
    "make the button bigger",
    "make the header smaller",
    "make it bold",
    "change its color to red",
    "set the button background to white",
    "hide the footer",
    "show the logo",
    "delete the image",
    "move the button down",
    "move it left by 40",
    "center the header",
    "align the text right",
    "change the title to 'Hello world'",
    "add a card below the header",
    "add a button",
    "make the text 50% larger",
    "round the button corners",
    "add more padding to the card",
    "increase spacing by 50%",
    "resize it",
    "make the cta green",
    "do a little dance",
];

/// Component with a random kind, role, box and colors; id assigned later
fn component() -> impl Strategy<Value = Component> {
    (
        prop::sample::select(ComponentType::ALL.to_vec()),
        prop::option::of(prop::sample::select(Role::ALL.to_vec())),
        0u16..1200,
        0u16..800,
        8u16..400,
        8u16..200,
        prop::option::of(prop::sample::select(PALETTE.to_vec())),
        prop::option::of(prop::sample::select(PALETTE.to_vec())),
    )
        .prop_map(|(kind, role, x, y, w, h, fg, bg)| {
            let mut component = Component::new(
                String::new(),
                kind,
                BBox::new(f64::from(x), f64::from(y), f64::from(w), f64::from(h)),
            );
            component.role = role;
            if kind == ComponentType::Text || kind == ComponentType::Button {
                component.text = Some(format!("{kind} label"));
            }
            if let Some(fg) = fg {
                component = component.with_visual("color", fg);
            }
            if let Some(bg) = bg {
                component = component.with_visual("bg_color", bg);
            }
            component
        })
}

/// Well-formed document with 1 to 6 components and unique ids
pub fn arb_document() -> impl Strategy<Value = Document> {
    (prop::collection::vec(component(), 1..=6), 0u8..=16).prop_map(|(components, spacing)| {
        let components = components
            .into_iter()
            .enumerate()
            .map(|(i, mut c)| {
                c.id = format!("{}-{}", c.kind, i + 10);
                c
            })
            .collect();
        Document::new(components)
            .with_token("spacing", f64::from(spacing))
            .with_token("primary_color", "#2563eb")
    })
}

/// One to three known clauses joined with a separator
pub fn arb_command() -> impl Strategy<Value = String> {
    (
        prop::collection::vec(prop::sample::select(CLAUSES.to_vec()), 1..=3),
        prop::sample::select(vec![" and ", ", ", "; ", ", then "]),
    )
        .prop_map(|(clauses, separator)| clauses.join(separator))
}
