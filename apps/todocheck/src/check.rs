//! Check runner: scan, classify, reconcile, render.
//!
//! Required inputs are loaded before any file is read, so a missing issues
//! file aborts without scanning. Per-file extraction runs on the rayon pool;
//! results land in ordered sets, so scheduling never affects the report.

use crate::config::Effective;
use crate::error::{CheckError, Result};
use crate::exemptions::ExemptionStore;
use crate::extract::{TodoExtractor, DEFAULT_COMMENT_PREFIXES};
use crate::issues::IssueRegistry;
use crate::models::{TodoOccurrence, Verdict, ViolationSet};
use crate::output::{compose_report, ReportOptions, DEFAULT_DOCS_URL};
use crate::reconcile::{reconcile, Reconciliation};
use crate::scan::{FileScanner, ScannedFile};
use rayon::prelude::*;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct CheckOptions {
    pub repo_root: PathBuf,
    /// Issues JSON path relative to `repo_root`.
    pub issues: String,
    pub exemptions: PathBuf,
    pub regenerate: bool,
    pub comment_prefixes: Vec<String>,
    pub skip_dirs: Vec<String>,
    pub exclude: Vec<String>,
    pub docs_url: String,
}

impl CheckOptions {
    /// Defaults for `repo_root`: `open_issues.json` at the root, exemptions
    /// under `scripts/assets/`.
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        let repo_root = repo_root.into();
        Self {
            exemptions: repo_root.join(crate::config::DEFAULT_EXEMPTIONS),
            repo_root,
            issues: crate::config::DEFAULT_ISSUES.to_string(),
            regenerate: false,
            comment_prefixes: DEFAULT_COMMENT_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            skip_dirs: vec![".git".to_string()],
            exclude: Vec::new(),
            docs_url: DEFAULT_DOCS_URL.to_string(),
        }
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            regenerate: self.regenerate,
            exemption_file_name: self
                .exemptions
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.exemptions.to_string_lossy().into_owned()),
            docs_url: self.docs_url.clone(),
        }
    }
}

impl From<Effective> for CheckOptions {
    fn from(eff: Effective) -> Self {
        Self {
            repo_root: eff.repo_root,
            issues: eff.issues,
            exemptions: eff.exemptions,
            regenerate: eff.regenerate,
            comment_prefixes: eff.comment_prefixes,
            skip_dirs: eff.skip_dirs,
            exclude: eff.exclude,
            docs_url: eff.docs_url,
        }
    }
}

/// Result of one run. `report` is the rendered human text.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub reconciliation: Reconciliation,
    pub regenerated: ExemptionStore,
    pub files_scanned: usize,
    pub markers_found: usize,
    pub report: String,
}

impl CheckOutcome {
    pub fn violations(&self) -> &ViolationSet {
        &self.reconciliation.violations
    }

    pub fn verdict(&self) -> Verdict {
        self.violations().verdict()
    }

    /// Turn a failing outcome into `CheckFailed` carrying the report.
    pub fn into_result(self) -> Result<Self> {
        match self.verdict() {
            Verdict::Pass => Ok(self),
            Verdict::Fail => Err(CheckError::CheckFailed {
                report: self.report,
            }),
        }
    }
}

/// Run the full check and return the outcome, pass or fail.
pub fn run_check(opts: &CheckOptions) -> Result<CheckOutcome> {
    let issues = IssueRegistry::load(&opts.repo_root, &opts.issues)?;
    let exemptions = ExemptionStore::load(&opts.exemptions)?;
    let extractor = TodoExtractor::new(&opts.comment_prefixes)?;
    let scanner = FileScanner::new(&opts.repo_root)
        .skip_dirs(&opts.skip_dirs)
        .exclude(&opts.exclude)?;

    let files = scanner.scan();
    let occurrences: Vec<TodoOccurrence> = files
        .par_iter()
        .flat_map_iter(|f| extract_file(&extractor, f))
        .collect();

    let reconciliation = reconcile(&occurrences, &issues, &exemptions);
    let regenerated = reconciliation.regenerated_exemptions();
    let report = compose_report(
        &reconciliation.violations,
        &regenerated,
        &opts.report_options(),
    );
    let v = &reconciliation.violations;
    info!(
        files = files.len(),
        markers = occurrences.len(),
        redundant = v.redundant_exemptions.len(),
        malformed = v.malformed_todos.len(),
        unresolved = v.unresolved_issue_todos.len(),
        "todo check finished"
    );
    Ok(CheckOutcome {
        files_scanned: files.len(),
        markers_found: occurrences.len(),
        reconciliation,
        regenerated,
        report,
    })
}

/// Run the check and fail with `CheckFailed` unless every category is empty.
pub fn check_for_open_todos(opts: &CheckOptions) -> Result<CheckOutcome> {
    run_check(opts)?.into_result()
}

fn extract_file(extractor: &TodoExtractor, file: &ScannedFile) -> Vec<TodoOccurrence> {
    let bytes = match fs::read(&file.path) {
        Ok(b) => b,
        Err(e) => {
            warn!(file = %file.relative, error = %e, "skipping unreadable file");
            return Vec::new();
        }
    };
    let contents = String::from_utf8_lossy(&bytes);
    let found = extractor.extract(&file.relative, &contents);
    if !found.is_empty() {
        debug!(file = %file.relative, markers = found.len(), "markers found");
    }
    found
}
