//! Matching of raw cluster output lines against expected patterns.
//!
//! Server responses are matched either by a literal substring or by a
//! regular expression, depending on what the dialect specifies. The
//! match itself is a pure function with no I/O.

use regex::Regex;
use std::fmt;

/// A pattern an expected server response line is checked against.
///
/// Literal patterns match as a case-sensitive substring anywhere in the
/// line; regex patterns match wherever the expression finds a match.
#[derive(Debug, Clone)]
pub enum LinePattern {
    Literal(String),
    Regex(Regex),
}

impl LinePattern {
    /// A literal substring pattern.
    pub fn literal(pattern: impl Into<String>) -> Self {
        LinePattern::Literal(pattern.into())
    }

    /// A regular expression pattern.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(LinePattern::Regex(Regex::new(pattern)?))
    }

    /// Whether this pattern matches the given line.
    pub fn matches(&self, line: &str) -> bool {
        match self {
            LinePattern::Literal(s) => line.contains(s.as_str()),
            LinePattern::Regex(re) => re.is_match(line),
        }
    }
}

impl fmt::Display for LinePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinePattern::Literal(s) => write!(f, "{}", s),
            LinePattern::Regex(re) => write!(f, "{}", re.as_str()),
        }
    }
}
