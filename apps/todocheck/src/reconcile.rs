//! Reconciliation of classified markers against open issues and exemptions.
//!
//! Works entirely on `(file, line)` keys:
//! - violations = malformed lines plus well-formed lines naming a non-open
//!   issue;
//! - reported violations = violations minus exemptions;
//! - redundant exemptions = exemptions minus violations.
//!
//! The unfiltered violation map also feeds regeneration, so a collection
//! derived from it makes the next run pass.

use crate::exemptions::ExemptionStore;
use crate::issues::IssueRegistry;
use crate::models::{Classification, Location, TodoOccurrence, ViolationSet};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub violations: ViolationSet,
    /// Every current malformed or unresolved line, exempted or not, grouped
    /// by file.
    pub current: BTreeMap<String, BTreeSet<u32>>,
}

impl Reconciliation {
    /// Replacement exemption collection covering exactly the current
    /// violations.
    pub fn regenerated_exemptions(&self) -> ExemptionStore {
        ExemptionStore::derive_from(&self.current)
    }
}

/// Reconcile occurrences from all files. Input order does not matter.
pub fn reconcile<'a, I>(
    occurrences: I,
    issues: &IssueRegistry,
    exemptions: &ExemptionStore,
) -> Reconciliation
where
    I: IntoIterator<Item = &'a TodoOccurrence>,
{
    let mut malformed: BTreeSet<Location> = BTreeSet::new();
    let mut unresolved: BTreeSet<Location> = BTreeSet::new();
    for occ in occurrences {
        match occ.classification {
            Classification::Malformed => {
                malformed.insert(occ.location.clone());
            }
            Classification::WellFormed(id) if !issues.contains(id) => {
                unresolved.insert(occ.location.clone());
            }
            Classification::WellFormed(_) | Classification::NoMarker => {}
        }
    }

    let mut current: BTreeMap<String, BTreeSet<u32>> = BTreeMap::new();
    for loc in malformed.iter().chain(unresolved.iter()) {
        current.entry(loc.file.clone()).or_default().insert(loc.line);
    }

    let redundant_exemptions: BTreeSet<Location> = exemptions
        .locations()
        .filter(|loc| !malformed.contains(loc) && !unresolved.contains(loc))
        .collect();

    let violations = ViolationSet {
        redundant_exemptions,
        malformed_todos: malformed
            .into_iter()
            .filter(|l| !exemptions.is_exempt(&l.file, l.line))
            .collect(),
        unresolved_issue_todos: unresolved
            .into_iter()
            .filter(|l| !exemptions.is_exempt(&l.file, l.line))
            .collect(),
    };
    Reconciliation {
        violations,
        current,
    }
}
