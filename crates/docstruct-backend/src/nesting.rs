//! Nesting level assignment.
//!
//! Derives each element's indentation depth from heading levels and list
//! levels. The calculation depends only on the running last-seen heading
//! level and the element's own numbering level, never on later elements.

use docstruct_core::{ElementKind, ParsedElement};

/// Assigns indentation depth to extracted elements in document order.
///
/// Remembers the level of the last non-cell heading as the baseline for
/// subsequent elements. Inside table cells, headings are ignored and the
/// baseline is 0.
#[derive(Debug, Clone, Default)]
pub struct NestingCalculator {
    last_header_level: u32,
}

impl NestingCalculator {
    /// Start with no heading seen (baseline 0)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the nesting level for an element.
    ///
    /// A non-cell heading records its own level as the new baseline and
    /// returns it. A numbered element sits at its numbering level + 1,
    /// clamped below by the baseline. Plain content sits one past the
    /// baseline. Cell elements with neither numbering nor a deep enough
    /// list level get no nesting at all.
    pub fn level_of(&mut self, element: &ParsedElement) -> Option<u32> {
        let baseline = if element.is_cell_element {
            0
        } else {
            self.last_header_level
        };

        if element.kind == ElementKind::Text && !element.is_cell_element {
            if let Some(header_level) = element.header_level {
                self.last_header_level = header_level;
                return Some(header_level);
            }
        }

        if let Some(numbering_level) = element.numbering_level {
            let shifted = numbering_level + 1;
            if shifted > baseline {
                return Some(shifted);
            }
            if shifted == baseline {
                return Some(baseline + 1);
            }
        }

        if element.is_cell_element {
            None
        } else {
            Some(baseline + 1)
        }
    }
}
