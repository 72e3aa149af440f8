//! Line classification for TODO markers.
//!
//! Two patterns are tried in order. The strict pattern accepts only
//! `[<comment token> ]TODO(#<digits>): <description>` at the start of the
//! line's content; the loose pattern flags anything else that looks like a
//! marker attempt (`todo`, any case, followed later by `(`). Lines matching
//! neither are plain text and never reported.

use crate::error::{CheckError, Result};
use crate::models::{Classification, Location, TodoOccurrence};
use regex::Regex;

/// Comment-start tokens accepted before a well-formed marker.
pub const DEFAULT_COMMENT_PREFIXES: &[&str] = &["//", "#", "<!--", "/*", "*", "--"];

const LOOSE_PATTERN: &str = r"(?i)todo.*\(";

pub struct TodoExtractor {
    strict: Regex,
    loose: Regex,
}

impl TodoExtractor {
    /// Build an extractor for the given comment-start tokens. Blank tokens
    /// are ignored; an empty list only accepts bare markers.
    pub fn new<S: AsRef<str>>(comment_prefixes: &[S]) -> Result<Self> {
        let alternatives: Vec<String> = comment_prefixes
            .iter()
            .map(|p| p.as_ref().trim())
            .filter(|p| !p.is_empty())
            .map(regex::escape)
            .collect();
        let prefix = if alternatives.is_empty() {
            String::new()
        } else {
            format!("(?:(?:{}) )?", alternatives.join("|"))
        };
        let strict_src = format!(r"^\s*{}TODO\(#(\d+)\): \S", prefix);
        let strict = compile(&strict_src)?;
        let loose = compile(LOOSE_PATTERN)?;
        Ok(Self { strict, loose })
    }

    pub fn classify_line(&self, line: &str) -> Classification {
        if let Some(caps) = self.strict.captures(line) {
            // A digit run too long for u64 cannot name any issue.
            return match caps[1].parse::<u64>() {
                Ok(id) => Classification::WellFormed(id),
                Err(_) => Classification::Malformed,
            };
        }
        if self.loose.is_match(line) {
            Classification::Malformed
        } else {
            Classification::NoMarker
        }
    }

    /// Classify every line of `contents`, returning only marker lines.
    pub fn extract(&self, file: &str, contents: &str) -> Vec<TodoOccurrence> {
        contents
            .lines()
            .enumerate()
            .filter_map(|(idx, line)| match self.classify_line(line) {
                Classification::NoMarker => None,
                classification => Some(TodoOccurrence {
                    location: Location::new(file, line_number(idx)),
                    classification,
                }),
            })
            .collect()
    }
}

fn compile(src: &str) -> Result<Regex> {
    Regex::new(src).map_err(|e| CheckError::InvalidPattern {
        pattern: src.to_string(),
        message: e.to_string(),
    })
}

fn line_number(idx: usize) -> u32 {
    u32::try_from(idx + 1).unwrap_or(u32::MAX)
}
