//! The structure manager: pattern-matching state machine over the flat
//! element stream.
//!
//! Elements are classified against the base components, buffered in a
//! sliding window bounded by the longest composite pattern, and emitted
//! as structured JSON nodes. Text elements containing the inline answer
//! delimiter carry the transient `QnA` tag and split into question and
//! answer nodes on emission.

use std::collections::VecDeque;

use log::debug;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use docstruct_core::{ElementKind, ElementPayload, ParsedElement, Result};

use crate::checker::CheckerRegistry;
use crate::component::{BaseComponent, CompositeComponent};
use crate::spec::StructureSpec;

/// Transient tag for text suspected of holding an inline question and
/// answer template pair
const QNA_TAG: &str = "QnA";

/// Applies a structure specification to parsed element streams.
///
/// Construction validates the whole specification; `apply` itself cannot
/// fail. The manager holds no per-document state and can be reused across
/// documents.
#[derive(Debug)]
pub struct StructureManager {
    delimiter: String,
    base: Vec<BaseComponent>,
    composite: Vec<CompositeComponent>,
    max_chunk: usize,
}

impl StructureManager {
    /// Build a manager from a raw specification document.
    ///
    /// # Errors
    ///
    /// `Config` when a section is missing or a declared checker key is
    /// unknown.
    pub fn new(structure: &Value) -> Result<Self> {
        let spec = StructureSpec::parse(structure)?;
        let registry = CheckerRegistry::with_defaults();

        let base = spec
            .base
            .iter()
            .map(|component| BaseComponent::new(&registry, component))
            .collect::<Result<Vec<_>>>()?;
        let composite = spec
            .composite
            .iter()
            .map(|component| CompositeComponent::new(&registry, component))
            .collect::<Result<Vec<_>>>()?;
        let max_chunk = composite
            .iter()
            .map(CompositeComponent::chunk_count)
            .max()
            .unwrap_or(1);

        Ok(Self {
            delimiter: spec.answer.delimiter(),
            base,
            composite,
            max_chunk,
        })
    }

    /// Structure a document's element stream into output nodes.
    pub fn apply(&self, elements: Vec<ParsedElement>) -> Vec<Value> {
        let element_count = elements.len();
        let mut nodes = Vec::new();
        let mut window: VecDeque<ParsedElement> = VecDeque::with_capacity(self.max_chunk);

        for mut element in elements {
            self.classify(&mut element);
            window.push_back(element);

            while window.len() == self.max_chunk {
                let matched = {
                    let slice = window.make_contiguous();
                    self.composite.iter().position(|c| c.validate(slice))
                };
                if let Some(index) = matched {
                    let composite = &self.composite[index];
                    let children: Vec<Value> = window
                        .drain(..composite.chunk_count())
                        .map(|child| self.structure_element(&child))
                        .collect();
                    let mut node = composite.structure_template();
                    node.insert("data".to_string(), Value::Array(children));
                    nodes.push(Value::Object(node));
                } else if let Some(oldest) = window.pop_front() {
                    self.emit(oldest, &mut nodes);
                }
            }
        }

        // stream ended: drain element-wise, no further composite attempts
        for element in window {
            self.emit(element, &mut nodes);
        }
        debug!("structured {element_count} elements into {} nodes", nodes.len());
        nodes
    }

    /// Classify one element: the first matching base component sets the
    /// structure type, then the answer-delimiter test overrides it.
    fn classify(&self, element: &mut ParsedElement) {
        if let Some(base) = self.base.iter().find(|b| b.validate(element)) {
            element.structure_type = base.structure_type().map(str::to_string);
        }
        if self.contains_answer_mark(element) {
            element.structure_type = Some(QNA_TAG.to_string());
        }
    }

    /// Emit one top-level element.
    ///
    /// A `QnA` element splits at the delimiter: question prose (when
    /// present) becomes a question node, always followed by a synthesized
    /// answer node. A marker-only element yields the answer node alone,
    /// attaching to the previously emitted block by order.
    fn emit(&self, element: ParsedElement, nodes: &mut Vec<Value>) {
        if element.structure_type.as_deref() != Some(QNA_TAG) {
            nodes.push(self.structure_element(&element));
            return;
        }

        let text = element.payload.as_content().unwrap_or_default().to_string();
        let (question_text, template) = self.split_inline_answer(&text);
        if !question_text.is_empty() {
            nodes.push(self.question_node(&element, question_text, template.as_deref()));
        }
        nodes.push(answer_node(element.nesting_level, template));
    }

    /// Recursively structure one element into its output node.
    fn structure_element(&self, element: &ParsedElement) -> Value {
        if element.structure_type.as_deref() == Some(QNA_TAG) {
            return self.inline_answer_node(element);
        }

        let structure_type = element.structure_type.clone().or_else(|| {
            self.base
                .iter()
                .find(|b| b.validate(element))
                .and_then(|b| b.structure_type().map(str::to_string))
        });

        let mut node = match structure_type.as_deref().and_then(|t| self.base_for(t)) {
            Some(base) => base.apply(element),
            None => element.to_json(),
        };

        if let ElementPayload::Elements(children) = &element.payload {
            let structured: Vec<Value> =
                children.iter().map(|child| self.child_node(child)).collect();
            if let Some(object) = node.as_object_mut() {
                object.insert("data".to_string(), Value::Array(structured));
            }
        }
        node
    }

    /// Structure one child element; child text containing the delimiter
    /// is replaced outright by a synthesized answer node inheriting the
    /// child's nesting level.
    fn child_node(&self, child: &ParsedElement) -> Value {
        if self.contains_answer_mark(child) {
            let text = child.payload.as_content().unwrap_or_default();
            let (_, template) = self.split_inline_answer(text);
            return answer_node(child.nesting_level, template);
        }
        self.structure_element(child)
    }

    /// Single-node rendition of a `QnA` element for recursive contexts:
    /// a question node when prose is present, a bare answer node
    /// otherwise.
    fn inline_answer_node(&self, element: &ParsedElement) -> Value {
        let text = element.payload.as_content().unwrap_or_default();
        let (question_text, template) = self.split_inline_answer(text);
        if question_text.is_empty() {
            return answer_node(element.nesting_level, template);
        }
        self.question_node(element, question_text, template.as_deref())
    }

    fn question_node(
        &self,
        element: &ParsedElement,
        question_text: String,
        template: Option<&str>,
    ) -> Value {
        let mut question = element.clone();
        question.payload = ElementPayload::Content(question_text);
        question.structure_type = Some("question".to_string());

        let mut node = match self.base_for("question") {
            Some(base) => base.apply(&question),
            None => question.to_json(),
        };
        if let (Some(object), Some(template)) = (node.as_object_mut(), template) {
            object.insert("answerTemplate".to_string(), json!(template));
        }
        node
    }

    fn base_for(&self, structure_type: &str) -> Option<&BaseComponent> {
        self.base
            .iter()
            .find(|b| b.structure_type() == Some(structure_type))
    }

    fn contains_answer_mark(&self, element: &ParsedElement) -> bool {
        element.kind == ElementKind::Text
            && element
                .payload
                .as_content()
                .is_some_and(|text| text.contains(&self.delimiter))
    }

    /// Split at the delimiter: question prose before the first
    /// occurrence, answer template after the last, both trimmed.
    fn split_inline_answer(&self, text: &str) -> (String, Option<String>) {
        let first = text.find(&self.delimiter).unwrap_or(0);
        let question = text[..first].trim().to_string();
        let tail_start = text
            .rfind(&self.delimiter)
            .map_or(text.len(), |index| index + self.delimiter.len());
        let template = text[tail_start..].trim();
        let template = if template.is_empty() {
            None
        } else {
            Some(template.to_string())
        };
        (question, template)
    }
}

/// Synthesized answer node; the id is fresh on every call.
fn answer_node(nesting_level: Option<u32>, template: Option<String>) -> Value {
    let mut object = Map::new();
    object.insert("type".to_string(), json!("answer"));
    object.insert("contentType".to_string(), json!("answer"));
    object.insert("id".to_string(), json!(Uuid::new_v4().to_string()));
    if let Some(level) = nesting_level {
        object.insert("nestingLevel".to_string(), json!(level));
    }
    if let Some(template) = template {
        object.insert("template".to_string(), json!(template));
    }
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manager() -> StructureManager {
        StructureManager::new(&json!({
            "answer": { "charDelimiter": "_", "minRepeatCount": 3 },
            "base": [
                { "type": "question", "contentType": "text", "hasStyle": "QuestionStyle", "editable": true },
                { "type": "header", "contentType": "text", "headerLevel": 1 },
                { "type": "text", "contentType": "text" },
                { "type": "table", "contentType": "table" },
                { "type": "cell", "contentType": "cell" }
            ],
            "composite": [
                {
                    "type": "experiment",
                    "data": [
                        { "contentType": "text", "startsWith": "Опыт" },
                        { "contentType": "table" }
                    ]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_missing_section_fails_construction() {
        let err = StructureManager::new(&json!({
            "base": [], "composite": []
        }))
        .unwrap_err();
        assert!(matches!(err, docstruct_core::DocStructError::Config(_)));
    }

    #[test]
    fn test_unknown_checker_key_passes_through_as_metadata() {
        // non-checker keys are output metadata, not match conditions
        let manager = StructureManager::new(&json!({
            "answer": { "charDelimiter": "_", "minRepeatCount": 3 },
            "base": [ { "type": "text", "contentType": "text", "weight": 2 } ],
            "composite": []
        }))
        .unwrap();
        let nodes = manager.apply(vec![ParsedElement::text("hello")]);
        assert_eq!(nodes[0]["weight"], json!(2));
    }

    #[test]
    fn test_plain_text_classified() {
        let nodes = manager().apply(vec![ParsedElement::text("Ход работы")]);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0]["type"], json!("text"));
        assert_eq!(nodes[0]["data"], json!("Ход работы"));
    }

    #[test]
    fn test_header_beats_plain_text() {
        let element = ParsedElement::text("Заголовок").with_header_level(1);
        let nodes = manager().apply(vec![element]);
        assert_eq!(nodes[0]["type"], json!("header"));
        // headerLevel was consumed as a match condition
        assert!(nodes[0].get("headerLevel").is_none());
    }

    #[test]
    fn test_composite_round_trip() {
        let nodes = manager().apply(vec![
            ParsedElement::text("Опыт 1"),
            ParsedElement::table(vec![ParsedElement::cell(vec![], 1, 1)]),
        ]);
        // exactly one composite node consuming both elements
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0]["type"], json!("experiment"));
        let children = nodes[0]["data"].as_array().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0]["data"], json!("Опыт 1"));
        assert_eq!(children[1]["type"], json!("table"));
    }

    #[test]
    fn test_qna_split() {
        let nodes = manager().apply(vec![ParsedElement::text("Вопрос ___ ответ-шаблон")]);
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0]["type"], json!("question"));
        assert_eq!(nodes[0]["data"], json!("Вопрос"));
        assert_eq!(nodes[0]["answerTemplate"], json!("ответ-шаблон"));
        assert_eq!(nodes[1]["type"], json!("answer"));
        assert_eq!(nodes[1]["template"], json!("ответ-шаблон"));
        assert!(nodes[1]["id"].is_string());
    }

    #[test]
    fn test_marker_only_emits_answer_alone() {
        let nodes = manager().apply(vec![
            ParsedElement::text("Какой вывод можно сделать?"),
            ParsedElement::text("______"),
        ]);
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0]["type"], json!("text"));
        // the marker-only element attaches as a bare answer node
        assert_eq!(nodes[1]["type"], json!("answer"));
        assert!(nodes[1].get("template").is_none());
        assert!(nodes[1].get("answerTemplate").is_none());
    }

    #[test]
    fn test_answer_ids_are_fresh() {
        let nodes = manager().apply(vec![
            ParsedElement::text("___"),
            ParsedElement::text("___"),
        ]);
        assert_eq!(nodes.len(), 2);
        assert_ne!(nodes[0]["id"], nodes[1]["id"]);
    }

    #[test]
    fn test_cell_child_with_delimiter_becomes_answer() {
        let mut inline = ParsedElement::text("напишите ответ: ___");
        inline.is_cell_element = true;
        inline.nesting_level = Some(2);
        let table = ParsedElement::table(vec![ParsedElement::cell(vec![inline], 1, 1)]);

        let nodes = manager().apply(vec![ParsedElement::text("filler"), table]);
        let table_node = &nodes[1];
        let cell = &table_node["data"][0];
        let child = &cell["data"][0];
        assert_eq!(child["type"], json!("answer"));
        assert_eq!(child["nestingLevel"], json!(2));
    }

    #[test]
    fn test_drain_preserves_order() {
        // window capacity is 2; three non-matching elements must come out
        // in document order
        let nodes = manager().apply(vec![
            ParsedElement::text("a"),
            ParsedElement::table(vec![]),
            ParsedElement::text("c"),
        ]);
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0]["data"], json!("a"));
        assert_eq!(nodes[1]["type"], json!("table"));
        assert_eq!(nodes[2]["data"], json!("c"));
    }
}
