//! todocheck core library.
//!
//! Scans a repository for `TODO(#<issue>): ...` markers, checks their format,
//! cross-checks issue numbers against a pre-fetched list of open issues, and
//! reconciles the results with an exemption file.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Discovery and effective configuration resolution.
//! - `scan`: Repository file enumeration.
//! - `extract`: Per-line marker classification.
//! - `issues`: Open-issue registry from JSON.
//! - `exemptions`: Exemption collection loading, lookup and regeneration.
//! - `reconcile`: Violation categories and verdict.
//! - `check`: End-to-end runner.
//! - `output`: Human/JSON report rendering.
//! - `models`: Shared data models.
//! - `error`, `telemetry`, `utils`: Supporting pieces.
pub mod check;
pub mod cli;
pub mod config;
pub mod error;
pub mod exemptions;
pub mod extract;
pub mod issues;
pub mod models;
pub mod output;
pub mod reconcile;
pub mod scan;
pub mod telemetry;
pub mod utils;

pub use check::{check_for_open_todos, run_check, CheckOptions, CheckOutcome};
pub use error::{CheckError, Result};
