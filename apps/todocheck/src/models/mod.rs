//! Shared data models for extraction, reconciliation and report output.

pub mod exemption;
pub mod issue;

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// A line within a scanned file. `file` is relative to the repository root
/// and forward-slash separated; `line` is 1-based.
///
/// Field order drives the derived ordering: path byte order first, then
/// numeric line.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// How a single source line was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    NoMarker,
    WellFormed(u64),
    Malformed,
}

/// A classified line. Only `WellFormed` and `Malformed` occurrences are ever
/// materialized; any line without one is `NoMarker`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoOccurrence {
    pub location: Location,
    pub classification: Classification,
}

/// The three reported categories. Sets keep entries sorted and unique.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ViolationSet {
    pub redundant_exemptions: BTreeSet<Location>,
    pub malformed_todos: BTreeSet<Location>,
    pub unresolved_issue_todos: BTreeSet<Location>,
}

impl ViolationSet {
    pub fn is_empty(&self) -> bool {
        self.redundant_exemptions.is_empty()
            && self.malformed_todos.is_empty()
            && self.unresolved_issue_todos.is_empty()
    }

    pub fn verdict(&self) -> Verdict {
        if self.is_empty() {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    /// True when at least one marker itself needs fixing (as opposed to only
    /// stale exemptions).
    pub fn has_marker_violations(&self) -> bool {
        !self.malformed_todos.is_empty() || !self.unresolved_issue_todos.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
/// Aggregated counts used by printers.
pub struct Summary {
    pub redundant: usize,
    pub malformed: usize,
    pub unresolved: usize,
    pub files: usize,
}
