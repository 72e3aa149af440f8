//! todocheck CLI binary entry point.
//! Resolves configuration, runs the check and prints the report.

use clap::Parser;
use todocheck::check::{self, CheckOptions};
use todocheck::cli::{Cli, Commands};
use todocheck::models::Verdict;
use todocheck::{config, output, telemetry, utils};
use tracing::Level;

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    telemetry::init_tracing(cli.log_json, level);

    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Check {
            repo_root,
            issues,
            exemptions,
            regenerate,
            output,
        } => {
            let eff = match config::resolve_effective(
                repo_root.as_deref(),
                issues.as_deref(),
                exemptions.as_deref(),
                output.as_deref(),
                if regenerate { Some(true) } else { None },
            ) {
                Ok(eff) => eff,
                Err(e) => {
                    eprintln!("{} {}", utils::error_prefix(), e);
                    std::process::exit(e.exit_code());
                }
            };
            if !eff.config_found && eff.output != "json" {
                eprintln!(
                    "{} {}",
                    utils::note_prefix(),
                    "No todocheck.toml found; using defaults."
                );
            }
            let out_mode = eff.output.clone();
            let opts = CheckOptions::from(eff);
            let outcome = match check::run_check(&opts) {
                Ok(o) => o,
                Err(e) => {
                    eprintln!("{} {}", utils::error_prefix(), e);
                    std::process::exit(e.exit_code());
                }
            };
            output::print_report(
                outcome.violations(),
                &outcome.regenerated,
                outcome.files_scanned,
                &out_mode,
                &opts.report_options(),
            );
            if outcome.verdict() == Verdict::Fail {
                std::process::exit(1);
            }
        }
    }
}
