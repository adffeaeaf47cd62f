//! Blueprint document validation
//!
//! Structural, layout and accessibility checks for blueprint documents.
//! Used by the edit pipeline's simulator and usable standalone through
//! [`quick_validate`].
//!
//! # Example
//!
//! ```rust
//! use bpe_document::{BBox, Component, ComponentType, Document};
//! use bpe_validation::{quick_validate, Check};
//!
//! let doc = Document::new(vec![Component::new(
//!     "cta",
//!     ComponentType::Button,
//!     BBox::new(0.0, 0.0, 120.0, 30.0),
//! )]);
//! let report = quick_validate(&doc);
//! assert_eq!(report.issues[0].check, Check::TouchTarget);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod report;
mod rules;
mod validator;

pub use report::{Check, Severity, ValidationIssue, ValidationReport};
pub use rules::{RulesError, ValidationRules, Viewport};
pub use validator::{normalize_hex, quick_validate, same_color, DocumentValidator, StandardValidator};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
