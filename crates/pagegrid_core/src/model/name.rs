//! Compound element-name parser.
//!
//! # Responsibility
//! - Parse `"element"` and `"element#cell"` declarations into a tagged
//!   result instead of ad-hoc string splitting at call sites.
//!
//! # Invariants
//! - The plain element part is never empty and never contains `#`.
//! - At most one `#cell` suffix is accepted.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static COMPOUND_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9_][A-Za-z0-9_-]*)(?:#([A-Za-z0-9_][A-Za-z0-9_-]*))?$")
        .expect("compound element name pattern is valid")
});

/// Errors from compound name parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementNameError {
    /// Input is empty or whitespace only.
    Empty,
    /// Input does not match `name` or `name#cell` grammar.
    InvalidFormat(String),
}

impl Display for ElementNameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "element name must not be empty"),
            Self::InvalidFormat(raw) => {
                write!(f, "element name `{raw}` must match `name` or `name#cell`")
            }
        }
    }
}

impl Error for ElementNameError {}

/// Parsed element declaration: a plain name with an optional cell part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementName {
    /// Layout-declared element type name.
    pub element: String,
    /// Target cell name when the declaration carried a `#cell` suffix.
    pub cell: Option<String>,
}

impl ElementName {
    /// Parses a raw declaration such as `"article"` or `"article#header"`.
    pub fn parse(raw: &str) -> Result<Self, ElementNameError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ElementNameError::Empty);
        }

        let captures = COMPOUND_NAME
            .captures(trimmed)
            .ok_or_else(|| ElementNameError::InvalidFormat(raw.to_string()))?;

        Ok(Self {
            element: captures[1].to_string(),
            cell: captures.get(2).map(|m| m.as_str().to_string()),
        })
    }
}

impl Display for ElementName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cell {
            Some(cell) => write!(f, "{}#{cell}", self.element),
            None => write!(f, "{}", self.element),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ElementName, ElementNameError};

    #[test]
    fn plain_name_has_no_cell_part() {
        let parsed = ElementName::parse("article").unwrap();
        assert_eq!(parsed.element, "article");
        assert_eq!(parsed.cell, None);
    }

    #[test]
    fn compound_name_splits_element_and_cell() {
        let parsed = ElementName::parse("article#header").unwrap();
        assert_eq!(parsed.element, "article");
        assert_eq!(parsed.cell.as_deref(), Some("header"));
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let parsed = ElementName::parse("  news_teaser#sidebar-1 ").unwrap();
        assert_eq!(parsed.element, "news_teaser");
        assert_eq!(parsed.cell.as_deref(), Some("sidebar-1"));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(ElementName::parse("   "), Err(ElementNameError::Empty));
    }

    #[test]
    fn dangling_or_double_hash_is_rejected() {
        for raw in ["article#", "#header", "a#b#c", "a b"] {
            assert!(matches!(
                ElementName::parse(raw),
                Err(ElementNameError::InvalidFormat(_))
            ));
        }
    }

    #[test]
    fn display_round_trips_both_forms() {
        for raw in ["article", "article#header"] {
            assert_eq!(ElementName::parse(raw).unwrap().to_string(), raw);
        }
    }
}
