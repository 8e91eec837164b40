//! Structure specification matching.
//!
//! Turns the flat element stream produced by a document backend into the
//! structured node tree persisted as a template:
//!
//! - [`spec`] holds the typed structure specification
//! - [`checker`] builds match predicates from declared properties
//! - [`component`] models base (single-element) and composite (window)
//!   patterns
//! - [`manager::StructureManager`] runs the state machine over a stream

pub mod checker;
pub mod component;
pub mod manager;
pub mod spec;

pub use checker::{CheckStatus, Checker, CheckerRegistry};
pub use component::{BaseComponent, CompositeComponent};
pub use manager::StructureManager;
pub use spec::{AnswerSpec, ComponentSpec, CompositeSpec, StructureSpec};
