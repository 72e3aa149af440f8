//! Issue record schema from the open-issues JSON.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
/// One entry of the pre-fetched issue list. Only `number` is read; every
/// other field is ignored.
pub struct IssueRecord {
    pub number: u64,
}
