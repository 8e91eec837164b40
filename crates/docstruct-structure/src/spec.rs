//! Typed structure specification.
//!
//! The raw specification is a JSON document with exactly three sections:
//! `answer` (the inline answer delimiter), `base` (single-element
//! patterns) and `composite` (fixed-length multi-element patterns). It is
//! deserialized once at manager construction; a missing or malformed
//! section is a configuration error, raised before any document is
//! processed.
//!
//! ```json
//! {
//!   "answer": { "charDelimiter": "_", "minRepeatCount": 3 },
//!   "base": [
//!     { "type": "header", "contentType": "text", "headerLevel": 1 },
//!     { "type": "text", "contentType": "text" }
//!   ],
//!   "composite": [
//!     { "type": "observations", "data": [ { "contentType": "table" } ] }
//!   ]
//! }
//! ```

use serde::Deserialize;
use serde_json::{Map, Value};

use docstruct_core::{DocStructError, Result};

/// The `answer` section: delimiter configuration for inline answers.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSpec {
    /// Character sequence that repeats to form the delimiter
    pub char_delimiter: String,
    /// Number of repetitions forming the shortest valid delimiter
    pub min_repeat_count: usize,
}

impl AnswerSpec {
    /// The verbatim substring marking an inline answer
    #[must_use]
    pub fn delimiter(&self) -> String {
        self.char_delimiter.repeat(self.min_repeat_count)
    }
}

/// One base component declaration.
///
/// Besides the two well-known fields, a declaration carries arbitrary
/// structural properties; the ones matching registered checker keys act
/// as match conditions, the rest are merged verbatim into the output
/// node.
#[derive(Debug, Clone, Deserialize)]
pub struct ComponentSpec {
    /// Structure type tag assigned to matching elements
    #[serde(rename = "type", default)]
    pub structure_type: Option<String>,
    /// Element kind this component applies to
    #[serde(rename = "contentType", default)]
    pub content_type: Option<String>,
    /// Remaining declared properties (checker conditions and output
    /// metadata alike)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ComponentSpec {
    /// Every declared property, including `type` and `contentType`, as
    /// written in the specification.
    #[must_use]
    pub fn declared_props(&self) -> Map<String, Value> {
        let mut props = Map::new();
        if let Some(structure_type) = &self.structure_type {
            props.insert("type".to_string(), Value::String(structure_type.clone()));
        }
        if let Some(content_type) = &self.content_type {
            props.insert(
                "contentType".to_string(),
                Value::String(content_type.clone()),
            );
        }
        for (key, value) in &self.extra {
            props.insert(key.clone(), value.clone());
        }
        props
    }
}

/// One composite component declaration: an ordered window pattern plus
/// output metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct CompositeSpec {
    /// Ordered base declarations matched against the window prefix
    pub data: Vec<ComponentSpec>,
    /// Output metadata of the composite node
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The full validated specification.
#[derive(Debug, Clone, Deserialize)]
pub struct StructureSpec {
    pub answer: AnswerSpec,
    pub base: Vec<ComponentSpec>,
    pub composite: Vec<CompositeSpec>,
}

impl StructureSpec {
    /// Parse and validate a raw specification document.
    ///
    /// # Errors
    ///
    /// `Config` when any of the three sections is missing or malformed.
    pub fn parse(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(|e| {
            DocStructError::Config(format!("invalid structure specification: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_delimiter_repeats() {
        let spec = AnswerSpec {
            char_delimiter: "_".to_string(),
            min_repeat_count: 3,
        };
        assert_eq!(spec.delimiter(), "___");
    }

    #[test]
    fn test_parse_full_spec() {
        let spec = StructureSpec::parse(&json!({
            "answer": { "charDelimiter": "_", "minRepeatCount": 3 },
            "base": [
                { "type": "header", "contentType": "text", "headerLevel": 1 },
                { "type": "text", "contentType": "text" }
            ],
            "composite": [
                { "type": "observations", "data": [ { "contentType": "table" } ] }
            ]
        }))
        .unwrap();

        assert_eq!(spec.base.len(), 2);
        assert_eq!(spec.base[0].structure_type.as_deref(), Some("header"));
        assert_eq!(spec.composite[0].data.len(), 1);

        let props = spec.base[0].declared_props();
        assert_eq!(props.get("headerLevel"), Some(&json!(1)));
        assert_eq!(props.get("type"), Some(&json!("header")));
    }

    #[test]
    fn test_missing_section_is_config_error() {
        let err = StructureSpec::parse(&json!({
            "answer": { "charDelimiter": "_", "minRepeatCount": 3 },
            "base": []
        }))
        .unwrap_err();
        assert!(matches!(err, DocStructError::Config(_)));
        assert!(err.to_string().contains("structure specification"));
    }
}
