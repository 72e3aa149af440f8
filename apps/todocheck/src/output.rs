//! Report rendering for the check command.
//!
//! Supports `human` (default) and `json` outputs. The human text is a pure
//! function of the violation sets so that the same string is printed to
//! stdout and carried as the failure payload.

use crate::exemptions::ExemptionStore;
use crate::models::{Location, Summary, Verdict, ViolationSet};
use crate::utils;
use serde_json::json;
use serde_json::Value as JsonVal;
use std::collections::BTreeSet;

pub const PASSED_INDICATOR: &str = "TODO CHECK PASSED";
pub const FAILED_INDICATOR: &str = "TODO CHECK FAILED";

pub const DEFAULT_DOCS_URL: &str =
    "https://github.com/oppia/oppia-android/wiki/Static-Analysis-Checks#todo-open-checks";

const REDUNDANT_HEADER: &str =
    "Redundant exemptions (there are no TODOs corresponding to these lines):";
const MALFORMED_HEADER: &str = "TODOs not in correct format:";
const UNRESOLVED_HEADER: &str = "TODOs not corresponding to open issues on GitHub:";
const REGENERATED_HEADER: &str = "Regenerated exemptions:";
const RERUN_NOTE: &str = "There were failures. Re-run the command with \"--regenerate\" to regenerate the exemption file with all failures as exempted.";

/// Inputs to rendering that do not come from the scan itself.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub regenerate: bool,
    /// File name quoted in the redundant-exemption hint.
    pub exemption_file_name: String,
    pub docs_url: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            regenerate: false,
            exemption_file_name: "todo_open_exemptions.textproto".into(),
            docs_url: DEFAULT_DOCS_URL.into(),
        }
    }
}

/// Compose the human report (pure). On pass this is exactly the success
/// banner; on failure, the sections in fixed order followed by the notes.
pub fn compose_report(
    violations: &ViolationSet,
    regenerated: &ExemptionStore,
    opts: &ReportOptions,
) -> String {
    if violations.verdict() == Verdict::Pass {
        return PASSED_INDICATOR.to_string();
    }
    let mut blocks: Vec<String> = Vec::new();
    if !violations.redundant_exemptions.is_empty() {
        let mut b = section(REDUNDANT_HEADER, &violations.redundant_exemptions);
        b.push_str(&format!(
            "\nPlease remove them from {}",
            opts.exemption_file_name
        ));
        blocks.push(b);
    }
    if !violations.malformed_todos.is_empty() {
        blocks.push(section(MALFORMED_HEADER, &violations.malformed_todos));
    }
    if !violations.unresolved_issue_todos.is_empty() {
        blocks.push(section(UNRESOLVED_HEADER, &violations.unresolved_issue_todos));
    }
    if violations.has_marker_violations() {
        blocks.push(format!(
            "Refer to {} for more details on how to fix this.",
            opts.docs_url
        ));
    }
    if opts.regenerate {
        if regenerated.is_empty() {
            blocks.push(REGENERATED_HEADER.to_string());
        } else {
            blocks.push(format!(
                "{}\n\n{}",
                REGENERATED_HEADER,
                regenerated.to_textproto()
            ));
        }
    } else {
        blocks.push(RERUN_NOTE.to_string());
    }
    blocks.join("\n\n")
}

fn section(header: &str, entries: &BTreeSet<Location>) -> String {
    let mut out = header.to_string();
    for loc in entries {
        out.push_str(&format!("\n- {}", loc));
    }
    out
}

/// Compose report JSON object (pure) for testing/snapshot purposes.
pub fn compose_report_json(
    violations: &ViolationSet,
    regenerated: Option<&ExemptionStore>,
    files: usize,
) -> JsonVal {
    let summary = Summary {
        redundant: violations.redundant_exemptions.len(),
        malformed: violations.malformed_todos.len(),
        unresolved: violations.unresolved_issue_todos.len(),
        files,
    };
    let mut out = json!({
        "verdict": violations.verdict(),
        "redundant_exemptions": violations.redundant_exemptions,
        "malformed_todos": violations.malformed_todos,
        "unresolved_issue_todos": violations.unresolved_issue_todos,
        "summary": summary,
    });
    if let Some(store) = regenerated {
        out["regenerated_exemptions"] = serde_json::to_value(store.to_records())
            .map(|v| v["todo_open_exemption"].clone())
            .unwrap_or(JsonVal::Null);
    }
    out
}

/// Print the report in the requested format. Status prefixes go to stderr;
/// stdout carries only the report.
pub fn print_report(
    violations: &ViolationSet,
    regenerated: &ExemptionStore,
    files: usize,
    output: &str,
    opts: &ReportOptions,
) {
    match output {
        "json" => {
            let regen = if opts.regenerate && violations.verdict() == Verdict::Fail {
                Some(regenerated)
            } else {
                None
            };
            let out = compose_report_json(violations, regen, files);
            match serde_json::to_string_pretty(&out) {
                Ok(s) => println!("{}", s),
                Err(e) => eprintln!("{} {}", utils::error_prefix(), e),
            }
        }
        _ => {
            println!("{}", compose_report(violations, regenerated, opts));
            if violations.verdict() == Verdict::Fail {
                eprintln!("{} {}", utils::error_prefix(), FAILED_INDICATOR);
            }
        }
    }
}
