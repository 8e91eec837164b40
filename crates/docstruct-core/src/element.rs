//! Typed intermediate elements produced by document walkers.
//!
//! A walker converts native document nodes into a flat, document-ordered
//! stream of [`ParsedElement`] values. Every element is fully populated
//! before it enters the stream: nesting and numbering metadata are computed
//! up front, never patched in afterwards. The structure manager is the only
//! writer of [`ParsedElement::structure_type`].

use serde_json::{json, Map, Value};

/// Kind tag of a parsed element, fixed at construction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// Embedded picture, payload is the stored media path
    Image,
    /// Paragraph text, including headings and list items
    Text,
    /// Table, payload is the flat row-major cell list
    Table,
    /// Table cell, payload is the recursively parsed cell content
    Cell,
}

impl std::fmt::Display for ElementKind {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Text => write!(f, "text"),
            Self::Table => write!(f, "table"),
            Self::Cell => write!(f, "cell"),
        }
    }
}

/// Variant payload of a parsed element.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementPayload {
    /// Image path or paragraph text
    Content(String),
    /// Child elements (table cells, or a cell's parsed content)
    Elements(Vec<ParsedElement>),
}

impl ElementPayload {
    /// String content, if this payload carries one
    #[inline]
    #[must_use]
    pub fn as_content(&self) -> Option<&str> {
        match self {
            Self::Content(text) => Some(text),
            Self::Elements(_) => None,
        }
    }

    /// Child elements, if this payload carries them
    #[inline]
    #[must_use]
    pub fn as_elements(&self) -> Option<&[ParsedElement]> {
        match self {
            Self::Content(_) => None,
            Self::Elements(children) => Some(children),
        }
    }
}

/// One typed element of the intermediate document stream.
///
/// Optional fields are populated only where the element kind carries them;
/// checkers use [`ParsedElement::field`] to distinguish "attribute not
/// carried by this kind" from "attribute carried but unset".
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedElement {
    /// Element kind, immutable after construction
    pub kind: ElementKind,
    /// Variant payload
    pub payload: ElementPayload,
    /// Indentation depth computed from heading/list context
    pub nesting_level: Option<u32>,
    /// List level, set only for list participants
    pub numbering_level: Option<u32>,
    /// Rendered list marker text, set only for list participants
    pub numbering_text: Option<String>,
    /// True when discovered while parsing table cell content
    pub is_cell_element: bool,
    /// Owning paragraph style identifier (text only)
    pub style_id: Option<String>,
    /// Heading level (text only)
    pub header_level: Option<u32>,
    /// Vertical span in grid rows (cell only)
    pub rows: u32,
    /// Horizontal span in grid columns (cell only)
    pub cols: u32,
    /// Semantic role assigned by the structure manager
    pub structure_type: Option<String>,
}

impl ParsedElement {
    fn new(kind: ElementKind, payload: ElementPayload) -> Self {
        Self {
            kind,
            payload,
            nesting_level: None,
            numbering_level: None,
            numbering_text: None,
            is_cell_element: false,
            style_id: None,
            header_level: None,
            rows: 1,
            cols: 1,
            structure_type: None,
        }
    }

    /// Create a text element from extracted paragraph content
    #[inline]
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(ElementKind::Text, ElementPayload::Content(content.into()))
    }

    /// Create an image element carrying the stored media path
    #[inline]
    #[must_use]
    pub fn image(path: impl Into<String>) -> Self {
        Self::new(ElementKind::Image, ElementPayload::Content(path.into()))
    }

    /// Create a table element from its flat row-major cell list
    #[inline]
    #[must_use]
    pub fn table(cells: Vec<ParsedElement>) -> Self {
        Self::new(ElementKind::Table, ElementPayload::Elements(cells))
    }

    /// Create a cell element with its parsed content and span geometry
    #[must_use]
    pub fn cell(children: Vec<ParsedElement>, rows: u32, cols: u32) -> Self {
        let mut element = Self::new(ElementKind::Cell, ElementPayload::Elements(children));
        element.rows = rows;
        element.cols = cols;
        element
    }

    /// Set the style identifier (builder style)
    #[inline]
    #[must_use]
    pub fn with_style(mut self, style_id: impl Into<String>) -> Self {
        self.style_id = Some(style_id.into());
        self
    }

    /// Set the heading level (builder style)
    #[inline]
    #[must_use]
    pub const fn with_header_level(mut self, level: u32) -> Self {
        self.header_level = Some(level);
        self
    }

    /// Set the list numbering metadata (builder style)
    #[must_use]
    pub fn with_numbering(mut self, level: u32, marker: Option<String>) -> Self {
        self.numbering_level = Some(level);
        self.numbering_text = marker;
        self
    }

    /// True when either span exceeds one grid unit
    #[inline]
    #[must_use]
    pub const fn is_merged(&self) -> bool {
        self.rows > 1 || self.cols > 1
    }

    /// Capability lookup for checker attributes.
    ///
    /// Returns `None` when this element kind does not carry the attribute
    /// at all; callers treat that as "the check does not apply" rather
    /// than a failed comparison. A carried-but-unset attribute comes back
    /// as `Some(None)`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Option<String>> {
        match name {
            "data" => match self.kind {
                ElementKind::Text | ElementKind::Image => {
                    Some(self.payload.as_content().map(str::to_string))
                }
                ElementKind::Table | ElementKind::Cell => None,
            },
            "style_id" => match self.kind {
                ElementKind::Text => Some(self.style_id.clone()),
                _ => None,
            },
            "header_level" => match self.kind {
                ElementKind::Text => Some(self.header_level.map(|level| level.to_string())),
                _ => None,
            },
            "numbering_level" => Some(self.numbering_level.map(|level| level.to_string())),
            "nesting_level" => Some(self.nesting_level.map(|level| level.to_string())),
            _ => None,
        }
    }

    /// True when the JSON projection of this element carries the property
    #[must_use]
    pub fn has_json_property(&self, name: &str) -> bool {
        self.to_json()
            .as_object()
            .is_some_and(|object| object.contains_key(name))
    }

    /// Plain JSON projection of this element and all of its children.
    ///
    /// The structure manager builds on this projection, replacing the
    /// `data` entry with structured child nodes.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        object.insert("type".to_string(), json!(self.kind.to_string()));

        match &self.payload {
            ElementPayload::Content(text) => {
                object.insert("data".to_string(), json!(text));
            }
            ElementPayload::Elements(children) => {
                let projected: Vec<Value> = children.iter().map(Self::to_json).collect();
                object.insert("data".to_string(), Value::Array(projected));
            }
        }

        if let Some(level) = self.nesting_level {
            object.insert("nestingLevel".to_string(), json!(level));
        }
        if let Some(marker) = &self.numbering_text {
            object.insert("numberingBulletText".to_string(), json!(marker));
        }
        if let Some(level) = self.header_level {
            object.insert("headerLevel".to_string(), json!(level));
        }
        if self.kind == ElementKind::Cell && self.is_merged() {
            object.insert("merged".to_string(), json!(true));
            if self.rows > 1 {
                object.insert("rows".to_string(), json!(self.rows));
            }
            if self.cols > 1 {
                object.insert("cols".to_string(), json!(self.cols));
            }
        }

        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_lowercase() {
        assert_eq!(ElementKind::Image.to_string(), "image");
        assert_eq!(ElementKind::Table.to_string(), "table");
        assert_eq!(json!(ElementKind::Text), json!("text"));
    }

    #[test]
    fn test_text_field_lookup() {
        let element = ParsedElement::text("Заголовок")
            .with_style("Heading1")
            .with_header_level(1);

        assert_eq!(element.field("data"), Some(Some("Заголовок".to_string())));
        assert_eq!(element.field("style_id"), Some(Some("Heading1".to_string())));
        assert_eq!(element.field("header_level"), Some(Some("1".to_string())));
        assert_eq!(element.field("unknown"), None);
    }

    #[test]
    fn test_absent_attribute_is_distinct_from_unset() {
        let image = ParsedElement::image("media/x.png");
        // Images never carry a header level
        assert_eq!(image.field("header_level"), None);

        // Plain text carries one, currently unset
        let text = ParsedElement::text("plain");
        assert_eq!(text.field("header_level"), Some(None));
    }

    #[test]
    fn test_table_data_is_not_string_content() {
        let table = ParsedElement::table(vec![ParsedElement::cell(vec![], 1, 1)]);
        assert_eq!(table.field("data"), None);
    }

    #[test]
    fn test_merged_cell_projection() {
        let cell = ParsedElement::cell(vec![ParsedElement::text("a")], 2, 1);
        let projected = cell.to_json();
        assert_eq!(projected["merged"], json!(true));
        assert_eq!(projected["rows"], json!(2));
        assert!(projected.get("cols").is_none());
    }

    #[test]
    fn test_plain_cell_omits_merge_fields() {
        let cell = ParsedElement::cell(vec![], 1, 1);
        let projected = cell.to_json();
        assert!(projected.get("merged").is_none());
        assert!(projected.get("rows").is_none());
    }

    #[test]
    fn test_header_projection() {
        let element = ParsedElement::text("Intro").with_header_level(2);
        let projected = element.to_json();
        assert_eq!(projected["type"], json!("text"));
        assert_eq!(projected["headerLevel"], json!(2));
        assert!(element.has_json_property("headerLevel"));
        assert!(!element.has_json_property("numberingBulletText"));
    }
}
