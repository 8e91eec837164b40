//! DOCX document parser.
//!
//! A DOCX file is a zip archive of XML parts. Loading splits into two
//! phases: lookup tables (relationships, styles, numbering definitions)
//! are built once with streaming event parsing, then `word/document.xml`
//! is walked as a DOM in document order, dispatching each block node to a
//! text, image or table extractor.
//!
//! ## Part layout
//! ```text
//! word/document.xml          main body (mandatory)
//! word/styles.xml            style definitions (headings, style numbering)
//! word/numbering.xml         list numbering definitions
//! word/_rels/document.xml.rels  relationship id -> target map
//! word/media/*               embedded images
//! ```

use std::collections::HashMap;
use std::io::{Cursor, Read as IoRead, Seek};
use std::sync::Arc;

use log::{debug, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use roxmltree::Node;
use zip::result::ZipError;
use zip::ZipArchive;

use docstruct_core::{DocStructError, ParsedElement, Result};

use crate::nesting::NestingCalculator;
use crate::numbering::{NumFormat, NumberingEngine, NumberingItem};
use crate::storage::FileStorage;

/// WordprocessingML main namespace
const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
/// Office relationship namespace (attribute namespace of `r:embed`)
const ODR_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
/// DrawingML picture namespace
const PIC_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

/// Raw XML parts and media bytes pulled out of the archive.
#[derive(Debug, Default)]
pub struct DocxPackage {
    document_xml: String,
    styles_xml: Option<String>,
    numbering_xml: Option<String>,
    relationships_xml: Option<String>,
    /// Media basename to raw bytes
    media: HashMap<String, Vec<u8>>,
}

impl DocxPackage {
    /// Open the archive and read every part the parser needs.
    ///
    /// Only `word/document.xml` is mandatory; documents without styles,
    /// numbering or media are valid.
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| DocStructError::Parse(format!("not a valid docx archive: {e}")))?;

        let document_xml = read_part(&mut archive, "word/document.xml")?
            .ok_or_else(|| DocStructError::Parse("word/document.xml is missing".to_string()))?;
        let styles_xml = read_part(&mut archive, "word/styles.xml")?;
        let numbering_xml = read_part(&mut archive, "word/numbering.xml")?;
        let relationships_xml = read_part(&mut archive, "word/_rels/document.xml.rels")?;

        let media_names: Vec<String> = archive
            .file_names()
            .filter(|name| name.starts_with("word/media/"))
            .map(str::to_string)
            .collect();
        let mut media = HashMap::new();
        for name in media_names {
            let mut file = archive
                .by_name(&name)
                .map_err(|e| DocStructError::Parse(format!("cannot read {name}: {e}")))?;
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes)?;
            media.insert(basename(&name).to_string(), bytes);
        }

        Ok(Self {
            document_xml,
            styles_xml,
            numbering_xml,
            relationships_xml,
            media,
        })
    }
}

fn read_part<R: IoRead + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>> {
    match archive.by_name(name) {
        Ok(mut file) => {
            let mut content = String::new();
            file.read_to_string(&mut content)?;
            Ok(Some(content))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(DocStructError::Parse(format!("cannot read {name}: {e}"))),
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Extract an attribute value by exact key from an XML start tag
fn get_attr_string(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| std::str::from_utf8(&a.value).ok().map(str::to_string))
}

/// Extract an attribute value as i32 by exact key from an XML start tag
fn get_attr_i32(e: &BytesStart<'_>, key: &[u8]) -> Option<i32> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| std::str::from_utf8(&a.value).ok()?.parse::<i32>().ok())
}

/// Parse `document.xml.rels` into an id to target map.
///
/// ```xml
/// <Relationships>
///   <Relationship Id="rId4" Target="media/image1.png" .../>
/// </Relationships>
/// ```
fn parse_relationships(xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut relationships = HashMap::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e) | Event::Empty(ref e)) => {
                if e.name().as_ref() == b"Relationship" {
                    if let (Some(id), Some(target)) =
                        (get_attr_string(e, b"Id"), get_attr_string(e, b"Target"))
                    {
                        relationships.insert(id, target);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(DocStructError::Parse(format!(
                    "document.xml.rels parse error: {e}"
                )))
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(relationships)
}

/// Reference to a numbering definition, as carried by a paragraph or a
/// style (`numId` plus indentation level).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberingRef {
    pub id: String,
    pub level: u32,
}

#[derive(Debug, Default)]
struct RawStyle {
    id: String,
    name: Option<String>,
    based_on: Option<String>,
    outline_level: Option<u32>,
    num_id: Option<String>,
    num_level: u32,
}

/// Style lookups: heading levels and style-embedded numbering.
#[derive(Debug, Default)]
struct StyleMaps {
    /// Style id to resolved heading level
    heading_levels: HashMap<String, u32>,
    /// Style id to the numbering reference embedded in the style
    numbering: HashMap<String, NumberingRef>,
}

/// Parse `styles.xml` into heading-level and style-numbering lookups.
///
/// The Title style (matched by display name) is heading level 1 and
/// pushes every outline-level heading one level deeper. Custom styles
/// based on a heading style inherit its resolved level, following
/// `basedOn` chains.
fn parse_styles(xml: &str) -> Result<StyleMaps> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut styles: Vec<RawStyle> = Vec::new();
    let mut current: Option<RawStyle> = None;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e) | Event::Empty(ref e)) => match e.name().as_ref() {
                b"w:style" => {
                    if let Some(id) = get_attr_string(e, b"w:styleId") {
                        current = Some(RawStyle {
                            id,
                            ..RawStyle::default()
                        });
                    }
                }
                b"w:name" => {
                    if let Some(ref mut style) = current {
                        style.name = get_attr_string(e, b"w:val");
                    }
                }
                b"w:basedOn" => {
                    if let Some(ref mut style) = current {
                        style.based_on = get_attr_string(e, b"w:val");
                    }
                }
                b"w:outlineLvl" => {
                    if let Some(ref mut style) = current {
                        style.outline_level =
                            get_attr_i32(e, b"w:val").and_then(|v| u32::try_from(v).ok());
                    }
                }
                b"w:numId" => {
                    if let Some(ref mut style) = current {
                        style.num_id = get_attr_string(e, b"w:val");
                    }
                }
                b"w:ilvl" => {
                    if let Some(ref mut style) = current {
                        if let Some(level) =
                            get_attr_i32(e, b"w:val").and_then(|v| u32::try_from(v).ok())
                        {
                            style.num_level = level;
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => {
                if e.name().as_ref() == b"w:style" {
                    if let Some(style) = current.take() {
                        styles.push(style);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(DocStructError::Parse(format!("styles.xml parse error: {e}")))
            }
            _ => {}
        }
        buf.clear();
    }

    let mut maps = StyleMaps::default();

    let mut level_shift = 1;
    if let Some(title) = styles.iter().find(|s| s.name.as_deref() == Some("Title")) {
        maps.heading_levels.insert(title.id.clone(), 1);
        level_shift += 1;
    }
    for style in &styles {
        if let Some(outline) = style.outline_level {
            maps.heading_levels
                .insert(style.id.clone(), outline + level_shift);
        }
    }
    // basedOn chains: repeat until no more styles inherit a level
    loop {
        let mut changed = false;
        for style in &styles {
            if maps.heading_levels.contains_key(&style.id) {
                continue;
            }
            let inherited = style
                .based_on
                .as_ref()
                .and_then(|base| maps.heading_levels.get(base))
                .copied();
            if let Some(level) = inherited {
                maps.heading_levels.insert(style.id.clone(), level);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    for style in styles {
        if let Some(num_id) = style.num_id {
            maps.numbering.insert(
                style.id,
                NumberingRef {
                    id: num_id,
                    level: style.num_level,
                },
            );
        }
    }

    Ok(maps)
}

/// Level fields as written in `numbering.xml`; every field is optional so
/// overrides can fall back per field.
#[derive(Debug, Clone, Default)]
struct RawLevel {
    format: Option<String>,
    start: Option<i32>,
    text: Option<String>,
}

#[derive(Debug, Default)]
struct NumEntry {
    abstract_id: String,
    overrides: HashMap<u32, RawLevel>,
}

/// All numbering definitions from `numbering.xml`, joined through the
/// `num` to `abstractNum` indirection.
#[derive(Debug, Default)]
pub struct NumberingDefinitions {
    abstract_levels: HashMap<(String, u32), RawLevel>,
    nums: HashMap<String, NumEntry>,
}

impl NumberingDefinitions {
    /// Resolve the effective definition for a (numId, level) pair.
    ///
    /// An override level substitutes only the fields it sets; the rest
    /// fall back to the abstract definition. Returns `None` when the
    /// level does not exist or its format is unusable (`"none"` or
    /// unknown), meaning the pair must not be registered.
    #[must_use]
    pub fn resolve(&self, num_id: &str, level: u32) -> Option<NumberingItem> {
        let entry = self.nums.get(num_id)?;
        let base = self
            .abstract_levels
            .get(&(entry.abstract_id.clone(), level));
        let over = entry.overrides.get(&level);

        let format_value = over
            .and_then(|l| l.format.clone())
            .or_else(|| base.and_then(|l| l.format.clone()))?;
        let format = NumFormat::parse(&format_value)?;
        let start = over
            .and_then(|l| l.start)
            .or_else(|| base.and_then(|l| l.start))
            .unwrap_or(1);
        let text = over
            .and_then(|l| l.text.clone())
            .or_else(|| base.and_then(|l| l.text.clone()))
            .unwrap_or_default();
        Some(NumberingItem { format, start, text })
    }
}

/// Parse `numbering.xml`.
///
/// ```xml
/// <w:numbering>
///   <w:abstractNum w:abstractNumId="0">
///     <w:lvl w:ilvl="0">
///       <w:start w:val="1"/>
///       <w:numFmt w:val="decimal"/>
///       <w:lvlText w:val="%1."/>
///     </w:lvl>
///   </w:abstractNum>
///   <w:num w:numId="5">
///     <w:abstractNumId w:val="0"/>
///     <w:lvlOverride w:ilvl="0">
///       <w:lvl w:ilvl="0"><w:start w:val="3"/></w:lvl>
///     </w:lvlOverride>
///   </w:num>
/// </w:numbering>
/// ```
#[allow(clippy::too_many_lines)]
fn parse_numbering(xml: &str) -> Result<NumberingDefinitions> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut defs = NumberingDefinitions::default();

    let mut current_abstract: Option<String> = None;
    let mut current_num: Option<String> = None;
    let mut current_override: Option<u32> = None;
    let mut current_level_index: Option<u32> = None;
    let mut current_level: Option<RawLevel> = None;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e) | Event::Empty(ref e)) => match e.name().as_ref() {
                b"w:abstractNum" => {
                    current_abstract = get_attr_string(e, b"w:abstractNumId");
                }
                b"w:num" => {
                    current_num = get_attr_string(e, b"w:numId");
                }
                b"w:abstractNumId" => {
                    if let (Some(num_id), Some(abstract_id)) =
                        (current_num.clone(), get_attr_string(e, b"w:val"))
                    {
                        defs.nums.entry(num_id).or_default().abstract_id = abstract_id;
                    }
                }
                b"w:lvlOverride" => {
                    current_override =
                        get_attr_i32(e, b"w:ilvl").and_then(|v| u32::try_from(v).ok());
                }
                b"w:lvl" => {
                    let own_index =
                        get_attr_i32(e, b"w:ilvl").and_then(|v| u32::try_from(v).ok());
                    current_level_index = current_override.or(own_index);
                    current_level = Some(RawLevel::default());
                }
                b"w:numFmt" => {
                    if let Some(ref mut level) = current_level {
                        level.format = get_attr_string(e, b"w:val");
                    }
                }
                b"w:start" => {
                    if let Some(ref mut level) = current_level {
                        level.start = get_attr_i32(e, b"w:val");
                    }
                }
                b"w:lvlText" => {
                    if let Some(ref mut level) = current_level {
                        level.text = get_attr_string(e, b"w:val");
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"w:lvl" => {
                    if let (Some(index), Some(level)) =
                        (current_level_index.take(), current_level.take())
                    {
                        if let Some(override_index) = current_override {
                            if let Some(num_id) = current_num.clone() {
                                defs.nums
                                    .entry(num_id)
                                    .or_default()
                                    .overrides
                                    .insert(override_index, level);
                            }
                        } else if let Some(abstract_id) = current_abstract.clone() {
                            defs.abstract_levels.insert((abstract_id, index), level);
                        }
                    }
                }
                b"w:lvlOverride" => current_override = None,
                b"w:abstractNum" => current_abstract = None,
                b"w:num" => current_num = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(DocStructError::Parse(format!(
                    "numbering.xml parse error: {e}"
                )))
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(defs)
}

/// Per-parse mutable state threaded through the walk
struct WalkState {
    engine: NumberingEngine,
    nesting: NestingCalculator,
}

/// Parses a single DOCX document into a flat element stream.
///
/// Built once per document; numbering counters and the heading baseline
/// are parse-scoped state, so a parser instance is single-use per call
/// to [`DocxParser::parse`] but safe to call repeatedly (each call gets
/// fresh state).
pub struct DocxParser {
    package: DocxPackage,
    relationships: HashMap<String, String>,
    heading_levels: HashMap<String, u32>,
    style_numbering: HashMap<String, NumberingRef>,
    numbering: NumberingDefinitions,
    storage: Arc<dyn FileStorage>,
    media_dir: String,
}

impl DocxParser {
    /// Load the archive and build all lookup tables.
    ///
    /// `media_dir` is the logical directory extracted images are saved
    /// under.
    pub fn new(
        bytes: &[u8],
        storage: Arc<dyn FileStorage>,
        media_dir: impl Into<String>,
    ) -> Result<Self> {
        let package = DocxPackage::load(bytes)?;

        let relationships = match &package.relationships_xml {
            Some(xml) => parse_relationships(xml)?,
            None => HashMap::new(),
        };
        let style_maps = match &package.styles_xml {
            Some(xml) => parse_styles(xml)?,
            None => StyleMaps::default(),
        };
        let numbering = match &package.numbering_xml {
            Some(xml) => parse_numbering(xml)?,
            None => NumberingDefinitions::default(),
        };

        // A style numbering reference only counts when it resolves to a
        // usable definition.
        let style_numbering = style_maps
            .numbering
            .into_iter()
            .filter(|(_, r)| numbering.resolve(&r.id, r.level).is_some())
            .collect();

        Ok(Self {
            package,
            relationships,
            heading_levels: style_maps.heading_levels,
            style_numbering,
            numbering,
            storage,
            media_dir: media_dir.into(),
        })
    }

    /// Walk the document body and return the flat element stream in
    /// document order.
    pub fn parse(&self) -> Result<Vec<ParsedElement>> {
        let doc = roxmltree::Document::parse(&self.package.document_xml)
            .map_err(|e| DocStructError::Parse(format!("word/document.xml: {e}")))?;
        let mut state = WalkState {
            engine: NumberingEngine::new(),
            nesting: NestingCalculator::new(),
        };
        Ok(self.walk(doc.root_element(), false, &mut state))
    }

    /// One pass over a subtree: top-level block nodes become elements,
    /// nodes inside a nested table are left to the cell recursion.
    fn walk(&self, root: Node<'_, '_>, cell_mode: bool, state: &mut WalkState) -> Vec<ParsedElement> {
        let mut elements = Vec::new();
        for node in root.descendants() {
            let is_table = node.has_tag_name((W_NS, "tbl"));
            let is_paragraph = node.has_tag_name((W_NS, "p"));
            if !is_table && !is_paragraph {
                continue;
            }
            if inside_table(node, root) {
                continue;
            }

            let extracted = if is_table {
                Some(self.extract_table(node, state))
            } else if contains_image(node) {
                self.extract_image(node)
            } else {
                Self::extract_text(node, &self.heading_levels)
            };
            let Some(mut element) = extracted else {
                continue;
            };

            if cell_mode {
                element.is_cell_element = true;
            }
            if is_paragraph {
                self.apply_numbering(node, &mut element, state);
            }
            element.nesting_level = state.nesting.level_of(&element);
            elements.push(element);
        }
        elements
    }

    /// Attach numbering metadata to a paragraph element.
    ///
    /// An explicit paragraph `numPr` always beats numbering inherited
    /// from the style; id "0" means "no numbering". The definition
    /// registers with the engine the first time an (id, level) pair is
    /// seen.
    fn apply_numbering(
        &self,
        node: Node<'_, '_>,
        element: &mut ParsedElement,
        state: &mut WalkState,
    ) {
        let Some(reference) = self.find_numbering(node) else {
            return;
        };
        if !state.engine.has(&reference.id, reference.level) {
            if let Some(item) = self.numbering.resolve(&reference.id, reference.level) {
                state.engine.register(&reference.id, reference.level, item);
            }
        }
        element.numbering_level = Some(reference.level);
        element.numbering_text = state.engine.next_marker(&reference.id, reference.level);
    }

    fn find_numbering(&self, node: Node<'_, '_>) -> Option<NumberingRef> {
        if let Some(num_pr) = node
            .descendants()
            .find(|n| n.has_tag_name((W_NS, "numPr")))
        {
            let id = num_pr
                .children()
                .find(|n| n.has_tag_name((W_NS, "numId")))
                .and_then(|n| n.attribute((W_NS, "val")))?;
            if id == "0" {
                return None;
            }
            let level = num_pr
                .children()
                .find(|n| n.has_tag_name((W_NS, "ilvl")))
                .and_then(|n| n.attribute((W_NS, "val")))
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            return Some(NumberingRef {
                id: id.to_string(),
                level,
            });
        }

        let style_id = paragraph_style(node)?;
        self.style_numbering.get(&style_id).cloned()
    }

    /// Concatenate text runs and line breaks, attach style metadata.
    /// Whitespace-only paragraphs yield no element.
    fn extract_text(
        node: Node<'_, '_>,
        heading_levels: &HashMap<String, u32>,
    ) -> Option<ParsedElement> {
        let mut text = String::new();
        for descendant in node.descendants() {
            if descendant.has_tag_name((W_NS, "t")) {
                if let Some(run_text) = descendant.text() {
                    text.push_str(run_text);
                }
            } else if descendant.has_tag_name((W_NS, "br")) {
                text.push('\n');
            }
        }
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let mut element = ParsedElement::text(text);
        if let Some(style_id) = paragraph_style(node) {
            element.header_level = heading_levels.get(&style_id).copied();
            element.style_id = Some(style_id);
        }
        Some(element)
    }

    /// Resolve the embedded image through the relationship map, persist
    /// the bytes and carry the stored name as element data. Any broken
    /// link in the chain yields no element.
    fn extract_image(&self, node: Node<'_, '_>) -> Option<ParsedElement> {
        let embed_id = node
            .descendants()
            .find_map(|n| n.attribute((ODR_NS, "embed")))?;
        let Some(target) = self.relationships.get(embed_id) else {
            debug!("image relationship {embed_id} has no target");
            return None;
        };
        let name = basename(target);
        let Some(bytes) = self.package.media.get(name) else {
            debug!("media part {name} is missing from the archive");
            return None;
        };
        let extension = name
            .rfind('.')
            .map(|dot| name[dot..].to_string())
            .unwrap_or_default();

        match self.storage.save(&self.media_dir, bytes, &extension) {
            Ok(stored) => Some(ParsedElement::image(stored)),
            Err(e) => {
                warn!("failed to store image {name}: {e}");
                None
            }
        }
    }

    /// Parse a table into its flat row-major cell list. Vertical-merge
    /// continuation cells are dropped; the origin cell carries the span.
    fn extract_table(&self, table: Node<'_, '_>, state: &mut WalkState) -> ParsedElement {
        let rows: Vec<Node<'_, '_>> = table
            .children()
            .filter(|n| n.has_tag_name((W_NS, "tr")))
            .collect();

        let mut cells = Vec::new();
        for (row_index, row) in rows.iter().enumerate() {
            for cell in row.children().filter(|n| n.has_tag_name((W_NS, "tc"))) {
                if is_merge_continuation(cell) {
                    continue;
                }
                let children = self.walk(cell, true, state);
                let row_span = vertical_span(&rows, row_index, cell);
                let col_span = horizontal_span(cell);
                cells.push(ParsedElement::cell(children, row_span, col_span));
            }
        }
        ParsedElement::table(cells)
    }
}

/// Whether the node sits inside a `w:tbl` strictly below `root`
fn inside_table(node: Node<'_, '_>, root: Node<'_, '_>) -> bool {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        if ancestor == root {
            return false;
        }
        if ancestor.has_tag_name((W_NS, "tbl")) {
            return true;
        }
        current = ancestor.parent();
    }
    false
}

fn contains_image(node: Node<'_, '_>) -> bool {
    node.descendants()
        .any(|n| n.has_tag_name((PIC_NS, "blipFill")))
}

fn paragraph_style(node: Node<'_, '_>) -> Option<String> {
    node.descendants()
        .find(|n| n.has_tag_name((W_NS, "pStyle")))
        .and_then(|n| n.attribute((W_NS, "val")))
        .map(str::to_string)
}

fn cell_property<'a, 'input>(
    cell: Node<'a, 'input>,
    name: &str,
) -> Option<Node<'a, 'input>> {
    let properties = cell
        .children()
        .find(|n| n.has_tag_name((W_NS, "tcPr")))?;
    properties.children().find(|n| n.has_tag_name((W_NS, name)))
}

/// A cell continues a vertical merge when `vMerge` is present with no
/// value or with `continue`
fn is_merge_continuation(cell: Node<'_, '_>) -> bool {
    match cell_property(cell, "vMerge") {
        Some(merge) => !matches!(merge.attribute((W_NS, "val")), Some("restart")),
        None => false,
    }
}

/// Horizontal span from `gridSpan`, 1 when absent
fn horizontal_span(cell: Node<'_, '_>) -> u32 {
    cell_property(cell, "gridSpan")
        .and_then(|n| n.attribute((W_NS, "val")))
        .and_then(|v| v.parse().ok())
        .unwrap_or(1)
}

/// Grid column the cell starts at, counting preceding cells' horizontal
/// spans rather than raw ordinals
fn grid_column(row: Node<'_, '_>, cell: Node<'_, '_>) -> i64 {
    let mut column: i64 = -1;
    for candidate in row.children().filter(|n| n.has_tag_name((W_NS, "tc"))) {
        column += i64::from(horizontal_span(candidate));
        if candidate == cell {
            break;
        }
    }
    column
}

/// Vertical span of a merge-origin cell: scan following rows for
/// continuation markers at the same grid column.
fn vertical_span(rows: &[Node<'_, '_>], row_index: usize, cell: Node<'_, '_>) -> u32 {
    let mut span = 1;
    let Some(merge) = cell_property(cell, "vMerge") else {
        return span;
    };
    if merge.attribute((W_NS, "val")).is_none() {
        return span;
    }

    let column = grid_column(rows[row_index], cell);
    for row in &rows[row_index + 1..] {
        let mut current_column: i64 = -1;
        for candidate in row.children().filter(|n| n.has_tag_name((W_NS, "tc"))) {
            current_column += i64::from(horizontal_span(candidate));
            if current_column != column {
                continue;
            }
            let Some(merge) = cell_property(candidate, "vMerge") else {
                return span;
            };
            match merge.attribute((W_NS, "val")) {
                Some("restart") => return span,
                _ => span += 1,
            }
            break;
        }
    }
    span
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use docstruct_core::ElementKind;

    fn test_parser(document_xml: &str) -> DocxParser {
        DocxParser {
            package: DocxPackage {
                document_xml: document_xml.to_string(),
                ..DocxPackage::default()
            },
            relationships: HashMap::new(),
            heading_levels: HashMap::new(),
            style_numbering: HashMap::new(),
            numbering: NumberingDefinitions::default(),
            storage: Arc::new(MemoryStorage::new()),
            media_dir: "media".to_string(),
        }
    }

    fn wrap_body(body: &str) -> String {
        format!(
            r#"<w:document xmlns:w="{W_NS}" xmlns:r="{ODR_NS}" xmlns:pic="{PIC_NS}"><w:body>{body}</w:body></w:document>"#
        )
    }

    #[test]
    fn test_parse_relationships() {
        let xml = r#"<Relationships>
            <Relationship Id="rId4" Type="image" Target="media/image1.png"/>
            <Relationship Id="rId5" Type="hyperlink" Target="https://example.com"/>
        </Relationships>"#;
        let map = parse_relationships(xml).unwrap();
        assert_eq!(map.get("rId4").map(String::as_str), Some("media/image1.png"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_parse_styles_heading_levels() {
        let xml = format!(
            r#"<w:styles xmlns:w="{W_NS}">
                <w:style w:styleId="Title0"><w:name w:val="Title"/></w:style>
                <w:style w:styleId="H1"><w:name w:val="heading 1"/>
                    <w:pPr><w:outlineLvl w:val="0"/></w:pPr>
                </w:style>
                <w:style w:styleId="MyH1"><w:name w:val="Custom"/>
                    <w:basedOn w:val="H1"/>
                </w:style>
                <w:style w:styleId="Body"><w:name w:val="Body Text"/></w:style>
            </w:styles>"#
        );
        let maps = parse_styles(&xml).unwrap();
        assert_eq!(maps.heading_levels.get("Title0"), Some(&1));
        // Title present, so outline level 0 lands at 2
        assert_eq!(maps.heading_levels.get("H1"), Some(&2));
        assert_eq!(maps.heading_levels.get("MyH1"), Some(&2));
        assert_eq!(maps.heading_levels.get("Body"), None);
    }

    #[test]
    fn test_parse_styles_without_title() {
        let xml = format!(
            r#"<w:styles xmlns:w="{W_NS}">
                <w:style w:styleId="H2"><w:name w:val="heading 2"/>
                    <w:pPr><w:outlineLvl w:val="1"/></w:pPr>
                </w:style>
            </w:styles>"#
        );
        let maps = parse_styles(&xml).unwrap();
        assert_eq!(maps.heading_levels.get("H2"), Some(&2));
    }

    #[test]
    fn test_parse_styles_numbering_reference() {
        let xml = format!(
            r#"<w:styles xmlns:w="{W_NS}">
                <w:style w:styleId="ListPara"><w:name w:val="List Paragraph"/>
                    <w:pPr><w:numPr><w:ilvl w:val="1"/><w:numId w:val="7"/></w:numPr></w:pPr>
                </w:style>
            </w:styles>"#
        );
        let maps = parse_styles(&xml).unwrap();
        assert_eq!(
            maps.numbering.get("ListPara"),
            Some(&NumberingRef {
                id: "7".to_string(),
                level: 1
            })
        );
    }

    #[test]
    fn test_parse_numbering_resolution() {
        let xml = format!(
            r#"<w:numbering xmlns:w="{W_NS}">
                <w:abstractNum w:abstractNumId="0">
                    <w:lvl w:ilvl="0">
                        <w:start w:val="1"/>
                        <w:numFmt w:val="decimal"/>
                        <w:lvlText w:val="%1."/>
                    </w:lvl>
                    <w:lvl w:ilvl="1">
                        <w:numFmt w:val="none"/>
                    </w:lvl>
                </w:abstractNum>
                <w:num w:numId="5">
                    <w:abstractNumId w:val="0"/>
                </w:num>
            </w:numbering>"#
        );
        let defs = parse_numbering(&xml).unwrap();
        let item = defs.resolve("5", 0).unwrap();
        assert_eq!(item.format, NumFormat::Decimal);
        assert_eq!(item.start, 1);
        assert_eq!(item.text, "%1.");
        // format "none" is not usable
        assert_eq!(defs.resolve("5", 1), None);
        assert_eq!(defs.resolve("6", 0), None);
    }

    #[test]
    fn test_numbering_override_falls_back_per_field() {
        let xml = format!(
            r#"<w:numbering xmlns:w="{W_NS}">
                <w:abstractNum w:abstractNumId="0">
                    <w:lvl w:ilvl="0">
                        <w:start w:val="1"/>
                        <w:numFmt w:val="decimal"/>
                        <w:lvlText w:val="%1."/>
                    </w:lvl>
                </w:abstractNum>
                <w:num w:numId="5">
                    <w:abstractNumId w:val="0"/>
                    <w:lvlOverride w:ilvl="0">
                        <w:lvl w:ilvl="0"><w:start w:val="4"/></w:lvl>
                    </w:lvlOverride>
                </w:num>
            </w:numbering>"#
        );
        let defs = parse_numbering(&xml).unwrap();
        let item = defs.resolve("5", 0).unwrap();
        assert_eq!(item.start, 4);
        // format and text come from the abstract definition
        assert_eq!(item.format, NumFormat::Decimal);
        assert_eq!(item.text, "%1.");
    }

    #[test]
    fn test_walk_plain_paragraphs() {
        let document = wrap_body(
            r#"<w:p><w:r><w:t>First</w:t></w:r></w:p>
               <w:p><w:r><w:t>   </w:t></w:r></w:p>
               <w:p><w:r><w:t>Second </w:t><w:br/><w:t>line</w:t></w:r></w:p>"#,
        );
        let elements = test_parser(&document).parse().unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].payload.as_content(), Some("First"));
        assert_eq!(elements[1].payload.as_content(), Some("Second \nline"));
        assert_eq!(elements[0].nesting_level, Some(1));
    }

    #[test]
    fn test_walk_heading_and_numbering() {
        let mut parser = test_parser("");
        parser.heading_levels.insert("H1".to_string(), 1);
        parser.numbering.abstract_levels.insert(
            ("0".to_string(), 0),
            RawLevel {
                format: Some("decimal".to_string()),
                start: Some(1),
                text: Some("%1.".to_string()),
            },
        );
        parser.numbering.nums.insert(
            "5".to_string(),
            NumEntry {
                abstract_id: "0".to_string(),
                overrides: HashMap::new(),
            },
        );
        parser.package.document_xml = wrap_body(
            r#"<w:p><w:pPr><w:pStyle w:val="H1"/></w:pPr><w:r><w:t>Intro</w:t></w:r></w:p>
               <w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="5"/></w:numPr></w:pPr>
                   <w:r><w:t>first item</w:t></w:r></w:p>
               <w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="5"/></w:numPr></w:pPr>
                   <w:r><w:t>second item</w:t></w:r></w:p>"#,
        );

        let elements = parser.parse().unwrap();
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[0].header_level, Some(1));
        assert_eq!(elements[0].nesting_level, Some(1));
        assert_eq!(elements[1].numbering_text.as_deref(), Some("1."));
        assert_eq!(elements[2].numbering_text.as_deref(), Some("2."));
        assert_eq!(elements[1].nesting_level, Some(2));
    }

    #[test]
    fn test_numbering_id_zero_means_none() {
        let document = wrap_body(
            r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="0"/></w:numPr></w:pPr>
                   <w:r><w:t>plain</w:t></w:r></w:p>"#,
        );
        let elements = test_parser(&document).parse().unwrap();
        assert_eq!(elements[0].numbering_level, None);
        assert_eq!(elements[0].numbering_text, None);
    }

    #[test]
    fn test_walk_table_with_vertical_merge() {
        // 2x2 grid; first column merged vertically
        let document = wrap_body(
            r#"<w:tbl>
                 <w:tr>
                   <w:tc><w:tcPr><w:vMerge w:val="restart"/></w:tcPr>
                     <w:p><w:r><w:t>A</w:t></w:r></w:p></w:tc>
                   <w:tc><w:p><w:r><w:t>B</w:t></w:r></w:p></w:tc>
                 </w:tr>
                 <w:tr>
                   <w:tc><w:tcPr><w:vMerge/></w:tcPr><w:p/></w:tc>
                   <w:tc><w:p><w:r><w:t>C</w:t></w:r></w:p></w:tc>
                 </w:tr>
               </w:tbl>"#,
        );
        let elements = test_parser(&document).parse().unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].kind, ElementKind::Table);

        let cells = elements[0].payload.as_elements().unwrap();
        // continuation cell dropped, merge origin spans two rows
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0].rows, 2);
        assert_eq!(cells[0].cols, 1);
        assert_eq!(cells[1].rows, 1);

        let first_content = cells[0].payload.as_elements().unwrap();
        assert_eq!(first_content[0].payload.as_content(), Some("A"));
        assert!(first_content[0].is_cell_element);
    }

    #[test]
    fn test_nested_table_emitted_once() {
        let document = wrap_body(
            r#"<w:tbl>
                 <w:tr><w:tc>
                   <w:p><w:r><w:t>outer</w:t></w:r></w:p>
                   <w:tbl><w:tr><w:tc><w:p><w:r><w:t>inner</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
                 </w:tc></w:tr>
               </w:tbl>"#,
        );
        let elements = test_parser(&document).parse().unwrap();
        // only the outer table surfaces at the top level
        assert_eq!(elements.len(), 1);

        let cells = elements[0].payload.as_elements().unwrap();
        let cell_content = cells[0].payload.as_elements().unwrap();
        // the cell holds one paragraph and one nested table
        assert_eq!(cell_content.len(), 2);
        assert_eq!(cell_content[0].payload.as_content(), Some("outer"));
        assert_eq!(cell_content[1].kind, ElementKind::Table);
    }

    #[test]
    fn test_horizontal_merge_span() {
        let document = wrap_body(
            r#"<w:tbl>
                 <w:tr>
                   <w:tc><w:tcPr><w:gridSpan w:val="2"/></w:tcPr>
                     <w:p><w:r><w:t>wide</w:t></w:r></w:p></w:tc>
                 </w:tr>
                 <w:tr>
                   <w:tc><w:p><w:r><w:t>a</w:t></w:r></w:p></w:tc>
                   <w:tc><w:p><w:r><w:t>b</w:t></w:r></w:p></w:tc>
                 </w:tr>
               </w:tbl>"#,
        );
        let elements = test_parser(&document).parse().unwrap();
        let cells = elements[0].payload.as_elements().unwrap();
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0].cols, 2);
        assert_eq!(cells[0].rows, 1);
        assert!(cells[0].is_merged());
    }

    #[test]
    fn test_image_extraction_through_relationships() {
        let storage = Arc::new(MemoryStorage::new());
        let mut parser = test_parser("");
        parser.storage = Arc::clone(&storage) as Arc<dyn FileStorage>;
        parser
            .relationships
            .insert("rId4".to_string(), "media/image1.png".to_string());
        parser
            .package
            .media
            .insert("image1.png".to_string(), vec![1, 2, 3]);
        parser.package.document_xml = wrap_body(
            r#"<w:p><w:r><w:drawing><pic:blipFill><a:blip xmlns:a="urn:a" r:embed="rId4"/></pic:blipFill></w:drawing></w:r></w:p>"#,
        );

        let elements = parser.parse().unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].kind, ElementKind::Image);
        let stored = storage.files();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].dir, "media");
        assert!(stored[0].name.ends_with(".png"));
        assert_eq!(
            elements[0].payload.as_content(),
            Some(stored[0].name.as_str())
        );
    }

    #[test]
    fn test_unresolvable_image_is_skipped() {
        let document = wrap_body(
            r#"<w:p><w:r><w:drawing><pic:blipFill><a:blip xmlns:a="urn:a" r:embed="rId9"/></pic:blipFill></w:drawing></w:r></w:p>"#,
        );
        let elements = test_parser(&document).parse().unwrap();
        assert!(elements.is_empty());
    }

    #[test]
    fn test_load_rejects_non_archive() {
        let err = DocxPackage::load(b"not a zip").unwrap_err();
        assert!(matches!(err, DocStructError::Parse(_)));
    }
}
