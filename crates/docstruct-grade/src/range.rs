//! Value range specifications.
//!
//! A specification is the bracket content of reference answers like
//! `[1-5 | 7 | abc | -1.5 - 2.5]`: pipe-separated alternatives, each an
//! integer, a float, a numeric span or a literal word.

use std::sync::OnceLock;

use regex::Regex;

const FLOAT_TOLERANCE: f64 = 1e-9;

fn span_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([+-]?\d+(?:\.\d+)?)\s*-\s*([+-]?\d+(?:\.\d+)?)\s*$").unwrap()
    })
}

fn int_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?\d+$").unwrap())
}

fn float_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?\d+\.\d+$").unwrap())
}

fn numeric_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?\d+(?:\.\d+)?$").unwrap())
}

/// One alternative of a specification.
#[derive(Debug, Clone, PartialEq)]
pub enum RangePart {
    Int(i64),
    Float(f64),
    /// Inclusive numeric span, endpoints ordered
    Span(f64, f64),
    Text(String),
}

/// A parsed value specification.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeSpec {
    raw: String,
    parts: Vec<RangePart>,
}

impl RangeSpec {
    /// Parse the bracket content. Tokens that fit no numeric form become
    /// literal text alternatives; parsing never fails.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().to_string();
        let mut parts = Vec::new();
        for token in raw.split('|').map(str::trim).filter(|t| !t.is_empty()) {
            if let Some(captures) = span_re().captures(token) {
                let start: f64 = captures[1].parse().unwrap_or(0.0);
                let end: f64 = captures[2].parse().unwrap_or(0.0);
                let (low, high) = if start <= end { (start, end) } else { (end, start) };
                parts.push(RangePart::Span(low, high));
            } else if int_re().is_match(token) {
                match token.parse::<i64>() {
                    Ok(value) => parts.push(RangePart::Int(value)),
                    Err(_) => parts.push(RangePart::Text(token.to_string())),
                }
            } else if float_re().is_match(token) {
                match token.parse::<f64>() {
                    Ok(value) => parts.push(RangePart::Float(value)),
                    Err(_) => parts.push(RangePart::Text(token.to_string())),
                }
            } else {
                parts.push(RangePart::Text(token.to_string()));
            }
        }
        Self { raw, parts }
    }

    /// The specification as written
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether every alternative is numeric
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.parts
            .iter()
            .all(|part| !matches!(part, RangePart::Text(_)))
    }

    /// Regex fragment capturing one candidate value for this
    /// specification.
    #[must_use]
    pub fn regex_fragment(&self) -> &'static str {
        if self.is_numeric() {
            r"(-?\d+(?:\.\d+)?)"
        } else {
            r"(\S+)"
        }
    }

    /// Whether a candidate value satisfies any alternative.
    ///
    /// Numeric candidates compare numerically (spans are inclusive, float
    /// equality uses a small tolerance); any candidate also matches a
    /// literal alternative case-insensitively.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        let stripped = text.trim();

        if numeric_re().is_match(stripped) {
            if let Ok(value) = stripped.parse::<f64>() {
                for part in &self.parts {
                    let hit = match part {
                        RangePart::Span(low, high) => (*low..=*high).contains(&value),
                        #[allow(clippy::cast_precision_loss)]
                        RangePart::Int(expected) => {
                            (value - *expected as f64).abs() < FLOAT_TOLERANCE
                        }
                        RangePart::Float(expected) => (value - expected).abs() < FLOAT_TOLERANCE,
                        RangePart::Text(_) => false,
                    };
                    if hit {
                        return true;
                    }
                }
            }
        }

        let lowered = stripped.to_lowercase();
        self.parts.iter().any(|part| match part {
            RangePart::Text(word) => word.to_lowercase() == lowered,
            RangePart::Int(value) => value.to_string() == lowered,
            RangePart::Float(value) => value.to_string() == lowered,
            RangePart::Span(_, _) => false,
        })
    }
}
