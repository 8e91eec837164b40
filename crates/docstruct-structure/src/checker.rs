//! Element checkers.
//!
//! A checker is one match condition built from a structural property
//! declaration. The registry maps property keys to checker factories;
//! building a checker for an unknown key is a configuration error.

use serde_json::Value;

use docstruct_core::{DocStructError, ParsedElement, Result};

/// Outcome of one check against one element.
///
/// `Skip` means the element kind does not carry the checked attribute at
/// all; it never disqualifies a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Valid,
    Invalid,
    Skip,
}

type CompareFn = fn(&str, &str) -> bool;
type DirectFn = fn(&ParsedElement, &str) -> bool;

#[derive(Debug, Clone, Copy)]
enum Factory {
    /// Compare one element attribute against the expected value
    Common { attribute: &'static str, compare: CompareFn },
    /// Predicate over the whole element, for checks no single attribute
    /// can express
    Direct(DirectFn),
}

/// A built checker, bound to its expected value.
#[derive(Debug, Clone)]
pub struct Checker {
    factory: Factory,
    expected: String,
}

impl Checker {
    /// Check one element.
    ///
    /// For attribute checkers, an attribute the element kind does not
    /// carry yields `Skip`; a carried but unset attribute fails the
    /// comparison. Direct checkers never skip.
    #[must_use]
    pub fn check(&self, element: &ParsedElement) -> CheckStatus {
        match self.factory {
            Factory::Common { attribute, compare } => match element.field(attribute) {
                None => CheckStatus::Skip,
                Some(None) => CheckStatus::Invalid,
                Some(Some(actual)) => {
                    if compare(&actual, &self.expected) {
                        CheckStatus::Valid
                    } else {
                        CheckStatus::Invalid
                    }
                }
            },
            Factory::Direct(predicate) => {
                if predicate(element, &self.expected) {
                    CheckStatus::Valid
                } else {
                    CheckStatus::Invalid
                }
            }
        }
    }
}

/// Named registry of checker factories.
#[derive(Debug, Default)]
pub struct CheckerRegistry {
    factories: Vec<(String, Factory)>,
}

impl CheckerRegistry {
    /// Registry with the built-in checkers:
    ///
    /// - `hasProperty`: the element's JSON projection carries the named
    ///   property
    /// - `headerLevel`: heading level equality
    /// - `hasStyle`: style id equality
    /// - `startsWith`: text content prefix
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::default();
        // keys are fresh here, registration cannot fail
        let _ = registry.register_direct("hasProperty", |element, expected| {
            element.has_json_property(expected)
        });
        let _ = registry.register_common("headerLevel", "header_level", |current, expected| {
            current == expected
        });
        let _ = registry.register_common("hasStyle", "style_id", |current, expected| {
            current == expected
        });
        let _ = registry.register_common("startsWith", "data", |current, expected| {
            current.starts_with(expected)
        });
        registry
    }

    /// Register an attribute-comparison checker under `key`.
    ///
    /// # Errors
    ///
    /// `Config` when the key is already taken.
    pub fn register_common(
        &mut self,
        key: &str,
        attribute: &'static str,
        compare: CompareFn,
    ) -> Result<()> {
        self.insert(key, Factory::Common { attribute, compare })
    }

    /// Register a whole-element predicate checker under `key`.
    ///
    /// # Errors
    ///
    /// `Config` when the key is already taken.
    pub fn register_direct(&mut self, key: &str, predicate: DirectFn) -> Result<()> {
        self.insert(key, Factory::Direct(predicate))
    }

    fn insert(&mut self, key: &str, factory: Factory) -> Result<()> {
        if self.factories.iter().any(|(k, _)| k == key) {
            return Err(DocStructError::Config(format!(
                "checker key already registered: {key}"
            )));
        }
        self.factories.push((key.to_string(), factory));
        Ok(())
    }

    /// Registered checker keys, in registration order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.factories.iter().map(|(key, _)| key.as_str())
    }

    /// Build a checker for `key` with the given expected value.
    ///
    /// Non-string expected values compare through their JSON rendering.
    ///
    /// # Errors
    ///
    /// `Config` for unknown keys.
    pub fn build(&self, key: &str, expected: &Value) -> Result<Checker> {
        let factory = self
            .factories
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, factory)| *factory)
            .ok_or_else(|| DocStructError::Config(format!("unknown checker key: {key}")))?;
        Ok(Checker {
            factory,
            expected: expected_as_string(expected),
        })
    }
}

fn expected_as_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
