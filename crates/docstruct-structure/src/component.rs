//! Structure components built from the specification.
//!
//! A base component matches a single element through its content type and
//! checkers; a composite component matches an ordered window of elements
//! through a fixed-length list of base components.

use serde_json::{Map, Value};

use docstruct_core::{ParsedElement, Result};

use crate::checker::{CheckStatus, Checker, CheckerRegistry};
use crate::spec::{ComponentSpec, CompositeSpec};

/// Single-element pattern with output shaping.
#[derive(Debug, Clone)]
pub struct BaseComponent {
    structure_type: Option<String>,
    content_type: Option<String>,
    /// Declared properties merged into the output node
    props: Map<String, Value>,
    /// Checker key and built checker per declared match condition
    checkers: Vec<(String, Checker)>,
}

impl BaseComponent {
    /// Build from a declaration: every declared property whose key is a
    /// registered checker becomes a match condition.
    ///
    /// # Errors
    ///
    /// `Config` when a checker cannot be built.
    pub fn new(registry: &CheckerRegistry, spec: &ComponentSpec) -> Result<Self> {
        let props = spec.declared_props();
        let mut checkers = Vec::new();
        for key in registry.keys() {
            match props.get(key) {
                Some(Value::Null) | None => {}
                Some(expected) => {
                    checkers.push((key.to_string(), registry.build(key, expected)?));
                }
            }
        }
        Ok(Self {
            structure_type: spec.structure_type.clone(),
            content_type: spec.content_type.clone(),
            props,
            checkers,
        })
    }

    /// Structure type tag this component assigns
    #[must_use]
    pub fn structure_type(&self) -> Option<&str> {
        self.structure_type.as_deref()
    }

    /// Whether the element matches: the content type must equal the
    /// element kind, and no checker may come back invalid (skips are
    /// fine).
    #[must_use]
    pub fn validate(&self, element: &ParsedElement) -> bool {
        if self.content_type.as_deref() != Some(element.kind.to_string().as_str()) {
            return false;
        }
        self.checkers
            .iter()
            .all(|(_, checker)| checker.check(element) != CheckStatus::Invalid)
    }

    /// Shape the output node: the element's JSON projection with the
    /// declared properties merged in and the checker keys stripped out
    /// (they are match-time metadata, not output).
    #[must_use]
    pub fn apply(&self, element: &ParsedElement) -> Value {
        let mut node = element.to_json();
        if let Some(object) = node.as_object_mut() {
            for (key, value) in &self.props {
                object.insert(key.clone(), value.clone());
            }
            for (key, _) in &self.checkers {
                object.remove(key);
            }
        }
        node
    }
}

/// Fixed-length ordered window pattern.
#[derive(Debug, Clone)]
pub struct CompositeComponent {
    /// Output metadata of the emitted composite node
    props: Map<String, Value>,
    components: Vec<BaseComponent>,
}

impl CompositeComponent {
    /// Build from a declaration.
    ///
    /// # Errors
    ///
    /// `Config` when any inner base component cannot be built.
    pub fn new(registry: &CheckerRegistry, spec: &CompositeSpec) -> Result<Self> {
        let components = spec
            .data
            .iter()
            .map(|component| BaseComponent::new(registry, component))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            props: spec.extra.clone(),
            components,
        })
    }

    /// Number of window elements one match consumes
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.components.len()
    }

    /// Whether the window prefix matches pairwise; windows shorter than
    /// the pattern never match.
    #[must_use]
    pub fn validate(&self, window: &[ParsedElement]) -> bool {
        if self.components.len() > window.len() {
            return false;
        }
        self.components
            .iter()
            .zip(window)
            .all(|(component, element)| component.validate(element))
    }

    /// The composite output node without its `data` children
    #[must_use]
    pub fn structure_template(&self) -> Map<String, Value> {
        self.props.clone()
    }
}
