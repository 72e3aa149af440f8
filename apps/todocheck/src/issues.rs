//! Open-issue registry loaded from a pre-fetched JSON list.

use crate::error::{CheckError, Result};
use crate::models::issue::IssueRecord;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Default, Clone)]
pub struct IssueRegistry {
    open: HashSet<u64>,
}

impl IssueRegistry {
    /// Parse `[{"number": 1}, ...]`. Extra fields are ignored.
    pub fn from_json_str(s: &str) -> std::result::Result<Self, serde_json::Error> {
        let records: Vec<IssueRecord> = serde_json::from_str(s)?;
        Ok(records.into_iter().map(|r| r.number).collect())
    }

    /// Load `root/rel_path`. A missing file is fatal and reported before any
    /// scanning happens.
    pub fn load(root: &Path, rel_path: &str) -> Result<Self> {
        let path = root.join(rel_path);
        if !path.is_file() {
            return Err(CheckError::MissingInputFile(path));
        }
        let data = fs::read_to_string(&path).map_err(|source| CheckError::Io {
            path: path.clone(),
            source,
        })?;
        let registry = Self::from_json_str(&data)
            .map_err(|source| CheckError::InvalidIssues { path: path.clone(), source })?;
        debug!(path = %path.display(), open = registry.len(), "loaded open issues");
        Ok(registry)
    }

    pub fn contains(&self, number: u64) -> bool {
        self.open.contains(&number)
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}

impl FromIterator<u64> for IssueRegistry {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        Self {
            open: iter.into_iter().collect(),
        }
    }
}
