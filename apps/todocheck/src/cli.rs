//! CLI argument parsing via `clap`.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "todocheck",
    version,
    about = "Check TODO markers against open issues",
    long_about = "todocheck — scan a repository for TODO(#issue) markers, verify their format, and make sure every referenced issue is still open.\n\nConfiguration precedence: CLI > todocheck.toml > defaults.",
    after_help = "Examples:\n  todocheck check --issues open_issues.json\n  todocheck check --exemptions scripts/assets/todo_open_exemptions.textproto --regenerate\n  todocheck check --output json",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[arg(short, long, global = true, action = clap::ArgAction::SetTrue, help = "Enable debug logging")]
    pub verbose: bool,
    #[arg(long, global = true, action = clap::ArgAction::SetTrue, help = "Emit logs as JSON lines on stderr")]
    pub log_json: bool,
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current todocheck version.")]
    Version,
    /// Run the TODO check
    #[command(
        about = "Run the TODO check",
        long_about = "Classify every TODO marker in the repository, cross-check issue numbers against the open-issue list, and reconcile with the exemption file. Exits 1 when anything is reported.",
        after_help = "Examples:\n  todocheck check --repo-root . --issues open_issues.json\n  todocheck check --regenerate"
    )]
    Check {
        #[arg(long, help = "Repository root (default: detected from current dir)")]
        repo_root: Option<String>,
        #[arg(long, help = "Open-issues JSON, relative to repo root (default: open_issues.json)")]
        issues: Option<String>,
        #[arg(long, help = "Exemption file, relative to repo root (.textproto|.json|.toml|.yaml)")]
        exemptions: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Print a replacement exemption file covering all current failures")]
        regenerate: bool,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
    },
}
