//! List numbering engine.
//!
//! Tracks multi-level list counters per (numbering id, level) pair and
//! renders the next marker text for each list item. Counters cascade: when
//! level L advances, every registered deeper level of the same id resets to
//! its start value minus one, so the next item at that deeper level renders
//! the start value again.
//!
//! ## Marker templates
//!
//! A level's marker template may reference counters of any level through
//! `%N` placeholders (`%1` = level 0, `%2` = level 1, ...), e.g. `"%1.%2."`
//! renders `"2.1."`. A placeholder referencing an unregistered level
//! renders as an empty string. A template without placeholders renders the
//! current level's formatted counter alone.

use std::collections::HashMap;

/// Numbering format types
///
/// Maps to `<w:numFmt w:val="..."/>` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum NumFormat {
    /// Decimal: 1, 2, 3
    Decimal,
    /// Lower Letter: a, b, c
    LowerLetter,
    /// Upper Letter: A, B, C
    UpperLetter,
    /// Lower Roman: i, ii, iii
    LowerRoman,
    /// Upper Roman: I, II, III
    UpperRoman,
    /// Bullet (non-numbered)
    Bullet,
}

impl NumFormat {
    /// Parse from an XML `w:val` attribute.
    ///
    /// Returns `None` for `"none"` and for unrecognized values: a level
    /// without a usable format must not be registered at all.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "decimal" => Some(Self::Decimal),
            "lowerLetter" => Some(Self::LowerLetter),
            "upperLetter" => Some(Self::UpperLetter),
            "lowerRoman" => Some(Self::LowerRoman),
            "upperRoman" => Some(Self::UpperRoman),
            "bullet" => Some(Self::Bullet),
            _ => None,
        }
    }
}

/// Format, start value and marker template governing one level of one
/// numbering definition.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NumberingItem {
    /// Marker format
    pub format: NumFormat,
    /// Starting counter value (usually 1)
    pub start: i32,
    /// Marker template, possibly with `%N` placeholders
    pub text: String,
}

/// Counter state for one registered (id, level) pair
#[derive(Debug, Clone)]
struct LevelState {
    item: NumberingItem,
    value: i32,
}

/// Glyph substituted for non-printable bullet characters (symbol fonts
/// encode bullets in the private use area).
const DEFAULT_BULLET: &str = "•";

/// Numbering engine scoped to a single parse invocation.
///
/// Never shared across documents: counters are document state.
#[derive(Debug, Clone, Default)]
pub struct NumberingEngine {
    levels: HashMap<(String, u32), LevelState>,
}

impl NumberingEngine {
    /// Create an empty engine
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register numbering data for an (id, level) pair.
    ///
    /// First registration wins; later calls for the same pair are no-ops,
    /// so whichever definition the document surfaces first (style-level or
    /// per-paragraph) stays authoritative.
    pub fn register(&mut self, id: &str, level: u32, item: NumberingItem) {
        let key = (id.to_string(), level);
        if self.levels.contains_key(&key) {
            return;
        }
        let value = item.start - 1;
        self.levels.insert(key, LevelState { item, value });
    }

    /// Whether numbering data was registered for the pair
    #[inline]
    #[must_use]
    pub fn has(&self, id: &str, level: u32) -> bool {
        self.levels.contains_key(&(id.to_string(), level))
    }

    /// Advance the counter at (id, level) and render the next marker text.
    ///
    /// Returns `None` when the pair was never registered; callers treat
    /// that as "no marker", not as a failure. Advancing a level resets
    /// every registered deeper level of the same id back to start - 1.
    #[must_use]
    pub fn next_marker(&mut self, id: &str, level: u32) -> Option<String> {
        let key = (id.to_string(), level);
        self.levels.get_mut(&key)?.value += 1;
        self.reset_deeper_levels(id, level);
        Some(self.render(id, level))
    }

    fn reset_deeper_levels(&mut self, id: &str, level: u32) {
        for (key, state) in &mut self.levels {
            if key.0 == id && key.1 > level {
                state.value = state.item.start - 1;
            }
        }
    }

    /// Render the marker for the current counter values.
    ///
    /// The pair must be registered.
    fn render(&self, id: &str, level: u32) -> String {
        let state = &self.levels[&(id.to_string(), level)];
        if !state.item.text.contains('%') {
            return format_value(state);
        }

        let mut text = state.item.text.clone();
        // lvlText placeholders are single digits (%1 through %9)
        for reference in 1..=9u32 {
            let placeholder = format!("%{reference}");
            if !text.contains(&placeholder) {
                continue;
            }
            let substituted = self
                .levels
                .get(&(id.to_string(), reference - 1))
                .map(format_value)
                .unwrap_or_default();
            text = text.replace(&placeholder, &substituted);
        }
        text
    }
}

fn format_value(state: &LevelState) -> String {
    match state.item.format {
        NumFormat::Decimal => state.value.to_string(),
        NumFormat::LowerLetter => to_letter(state.value).to_string(),
        NumFormat::UpperLetter => to_letter(state.value).to_ascii_uppercase().to_string(),
        NumFormat::LowerRoman => to_lower_roman(state.value),
        NumFormat::UpperRoman => to_lower_roman(state.value).to_uppercase(),
        NumFormat::Bullet => printable_bullet(&state.item.text),
    }
}

/// Convert a counter value to a single lowercase letter (1 = a).
///
/// Values past 26 walk out of the letter range; multi-letter sequences
/// ("aa") are not produced. Known limitation, kept as-is.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn to_letter(value: i32) -> char {
    char::from((b'a' as i32 - 1 + value) as u8)
}

/// Convert a counter value to lowercase Roman numerals via the standard
/// subtractive algorithm.
fn to_lower_roman(mut value: i32) -> String {
    const SYMBOLS: [(&str, i32); 13] = [
        ("m", 1000),
        ("cm", 900),
        ("d", 500),
        ("cd", 400),
        ("c", 100),
        ("xc", 90),
        ("l", 50),
        ("xl", 40),
        ("x", 10),
        ("ix", 9),
        ("v", 5),
        ("iv", 4),
        ("i", 1),
    ];

    let mut numeral = String::new();
    for (symbol, symbol_value) in SYMBOLS {
        while value >= symbol_value {
            numeral.push_str(symbol);
            value -= symbol_value;
        }
    }
    numeral
}

/// The bullet glyph itself, or the default printable bullet when the
/// declared glyph is a control or private-use character.
fn printable_bullet(glyph: &str) -> String {
    let printable = !glyph.is_empty()
        && glyph
            .chars()
            .all(|c| !c.is_control() && !('\u{e000}'..='\u{f8ff}').contains(&c));
    if printable {
        glyph.to_string()
    } else {
        DEFAULT_BULLET.to_string()
    }
}
