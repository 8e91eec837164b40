//! Core types for the docstruct template pipeline.
//!
//! This crate defines the intermediate element model shared by document
//! walkers and the structure engine, plus the workspace-wide error type.
//!
//! # Pipeline
//!
//! ```text
//! raw document bytes
//!       │  docstruct-backend (walker + extractors)
//!       ▼
//! flat stream of ParsedElement            (this crate)
//!       │  docstruct-structure (pattern-matching state machine)
//!       ▼
//! structured JSON nodes (serde_json::Value trees)
//! ```
//!
//! The structured nodes are the only artifact downstream consumers depend
//! on: plain JSON-compatible trees where every node carries a `type` field
//! and composite nodes carry a `data` child list.

pub mod element;
pub mod error;

pub use element::{ElementKind, ElementPayload, ParsedElement};
pub use error::{DocStructError, Result};
