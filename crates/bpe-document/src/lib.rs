//! Blueprint document model
//!
//! Typed blueprint documents, content hashing and allow-listed patches.
//!
//! # Core Concepts
//!
//! - [`Document`]: token table plus render-ordered [`Component`]s
//! - [`ContentHash`]: 32-byte BLAKE3 hash of document content
//! - [`PatchPath`]: JSON-pointer style address of a mutable field
//! - [`Patch`]: one `add`/`replace`/`remove` operation
//!
//! # Example
//!
//! ```rust
//! use bpe_document::{apply_patches, BBox, Component, ComponentType, Document, Patch, PatchPath, Scalar};
//!
//! let doc = Document::new(vec![Component::new(
//!     "cta",
//!     ComponentType::Button,
//!     BBox::new(0.0, 0.0, 160.0, 48.0),
//! )]);
//! let patched = apply_patches(&doc, &[Patch::add(PatchPath::visual(0, "color"), Scalar::from("#ffffff"))]).unwrap();
//! assert_eq!(patched.components[0].visual_str("color"), Some("#ffffff"));
//! assert!(doc.components[0].visual.is_empty());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod document;
mod hash;
mod path;
mod patch;

pub use document::{BBox, Component, ComponentType, Document, DocumentError, Role, Scalar};
pub use hash::{ContentHash, HashError};
pub use patch::{apply_patches, Patch, PatchError, PatchOp, PatchValue};
pub use path::{PathError, PatchPath, MUTABLE_VISUAL_KEYS};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
