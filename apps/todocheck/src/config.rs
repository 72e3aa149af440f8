//! Configuration discovery and effective settings resolution.
//!
//! todocheck reads `todocheck.toml|yaml|yml` from the repository root and
//! merges it with CLI flags to produce an `Effective` config.
//! Defaults:
//! - `issues`: `open_issues.json` (relative to the repository root)
//! - `exemptions`: `scripts/assets/todo_open_exemptions.textproto`
//! - `output`: `human`
//! - `regenerate`: false
//! - `check.comment_prefixes`: `//`, `#`, `<!--`, `/*`, `*`, `--`
//! - `check.skip_dirs`: `.git`
//! - `check.exclude`: none
//!
//! Overrides precedence: CLI > config file > defaults.

use crate::error::{CheckError, Result};
use crate::extract::DEFAULT_COMMENT_PREFIXES;
use crate::output::DEFAULT_DOCS_URL;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_ISSUES: &str = "open_issues.json";
pub const DEFAULT_EXEMPTIONS: &str = "scripts/assets/todo_open_exemptions.textproto";

const CONFIG_NAMES: [&str; 3] = ["todocheck.toml", "todocheck.yaml", "todocheck.yml"];

#[derive(Debug, Default, Deserialize, Clone)]
/// Scanning and matching options under `[check]`.
pub struct CheckCfg {
    pub comment_prefixes: Option<Vec<String>>,
    pub skip_dirs: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub docs_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `todocheck.toml|yaml`.
pub struct TodoCheckConfig {
    pub issues: Option<String>,
    pub exemptions: Option<String>,
    pub output: Option<String>,
    pub regenerate: Option<bool>,
    #[serde(default)]
    pub check: Option<CheckCfg>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by the check after applying precedence.
pub struct Effective {
    pub repo_root: PathBuf,
    /// Issues JSON path relative to `repo_root`.
    pub issues: String,
    pub exemptions: PathBuf,
    pub output: String,
    pub regenerate: bool,
    pub comment_prefixes: Vec<String>,
    pub skip_dirs: Vec<String>,
    pub exclude: Vec<String>,
    pub docs_url: String,
    pub config_found: bool,
}

/// Walk upward from `start` to detect the repository root.
///
/// Stops when a todocheck config file or a `.git` entry is found.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if CONFIG_NAMES.iter().any(|n| cur.join(n).exists()) || cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Load `TodoCheckConfig` from the first config file present in `root`.
pub fn load_config(root: &Path) -> Result<Option<TodoCheckConfig>> {
    for name in CONFIG_NAMES {
        let path = root.join(name);
        if !path.exists() {
            continue;
        }
        let s = fs::read_to_string(&path).map_err(|source| CheckError::Io {
            path: path.clone(),
            source,
        })?;
        let parsed = if name.ends_with(".toml") {
            toml::from_str::<TodoCheckConfig>(&s).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str::<TodoCheckConfig>(&s).map_err(|e| e.to_string())
        };
        return parsed
            .map(Some)
            .map_err(|message| CheckError::InvalidConfig { path, message });
    }
    Ok(None)
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
///
/// An explicit `cli_repo_root` is used as-is; otherwise the root is detected
/// from the current directory.
pub fn resolve_effective(
    cli_repo_root: Option<&str>,
    cli_issues: Option<&str>,
    cli_exemptions: Option<&str>,
    cli_output: Option<&str>,
    cli_regenerate: Option<bool>,
) -> Result<Effective> {
    let repo_root = match cli_repo_root {
        Some(r) => PathBuf::from(r),
        None => detect_repo_root(Path::new(".")),
    };
    let loaded = load_config(&repo_root)?;
    let config_found = loaded.is_some();
    let cfg = loaded.unwrap_or_default();
    let check = cfg.check.unwrap_or_default();

    let issues = cli_issues
        .map(|s| s.to_string())
        .or(cfg.issues)
        .unwrap_or_else(|| DEFAULT_ISSUES.to_string());

    let exemptions_rel = cli_exemptions
        .map(|s| s.to_string())
        .or(cfg.exemptions)
        .unwrap_or_else(|| DEFAULT_EXEMPTIONS.to_string());
    let exemptions = repo_root.join(exemptions_rel);

    let output = cli_output
        .map(|s| s.to_string())
        .or(cfg.output)
        .unwrap_or_else(|| "human".to_string());

    let regenerate = cli_regenerate.or(cfg.regenerate).unwrap_or(false);

    let comment_prefixes = check.comment_prefixes.unwrap_or_else(|| {
        DEFAULT_COMMENT_PREFIXES
            .iter()
            .map(|s| s.to_string())
            .collect()
    });
    let skip_dirs = check
        .skip_dirs
        .unwrap_or_else(|| vec![".git".to_string()]);
    let exclude = check.exclude.unwrap_or_default();
    let docs_url = check
        .docs_url
        .unwrap_or_else(|| DEFAULT_DOCS_URL.to_string());

    Ok(Effective {
        repo_root,
        issues,
        exemptions,
        output,
        regenerate,
        comment_prefixes,
        skip_dirs,
        exclude,
        docs_url,
        config_found,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_config() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let eff = resolve_effective(root.to_str(), None, None, None, None).unwrap();
        assert!(!eff.config_found);
        assert_eq!(eff.issues, "open_issues.json");
        assert_eq!(
            eff.exemptions,
            root.join("scripts/assets/todo_open_exemptions.textproto")
        );
        assert_eq!(eff.output, "human");
        assert!(!eff.regenerate);
        assert_eq!(eff.comment_prefixes.len(), DEFAULT_COMMENT_PREFIXES.len());
        assert_eq!(eff.skip_dirs, vec![".git".to_string()]);
        assert!(eff.exclude.is_empty());
        assert_eq!(eff.docs_url, DEFAULT_DOCS_URL);
    }

    #[test]
    fn test_detect_and_load_toml() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("todocheck.toml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
issues = "data/issues.json"
exemptions = "exempt.json"
output = "json"
regenerate = true
[check]
comment_prefixes = ["//", ";;"]
exclude = ["third_party/**"]
docs_url = "https://example.test/todo"
    "#
        )
        .unwrap();

        let eff = resolve_effective(root.to_str(), None, None, None, None).unwrap();
        assert!(eff.config_found);
        assert_eq!(eff.issues, "data/issues.json");
        assert_eq!(eff.exemptions, root.join("exempt.json"));
        assert_eq!(eff.output, "json");
        assert!(eff.regenerate);
        assert_eq!(eff.comment_prefixes, vec!["//".to_string(), ";;".to_string()]);
        assert_eq!(eff.exclude, vec!["third_party/**".to_string()]);
        assert_eq!(eff.docs_url, "https://example.test/todo");
    }

    #[test]
    fn test_load_yaml() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("todocheck.yaml"),
            "issues: issues.json\ncheck:\n  skip_dirs: [\".git\", node_modules]\n",
        )
        .unwrap();
        let eff = resolve_effective(root.to_str(), None, None, None, None).unwrap();
        assert_eq!(eff.issues, "issues.json");
        assert_eq!(
            eff.skip_dirs,
            vec![".git".to_string(), "node_modules".to_string()]
        );
    }

    #[test]
    fn test_cli_takes_precedence() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("todocheck.toml"),
            "issues = \"a.json\"\noutput = \"json\"\nregenerate = true\n",
        )
        .unwrap();
        let eff = resolve_effective(
            root.to_str(),
            Some("b.json"),
            Some("/abs/exempt.textproto"),
            Some("human"),
            Some(false),
        )
        .unwrap();
        assert_eq!(eff.issues, "b.json");
        assert_eq!(eff.exemptions, PathBuf::from("/abs/exempt.textproto"));
        assert_eq!(eff.output, "human");
        assert!(!eff.regenerate);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("todocheck.toml"), "issues = [").unwrap();
        let err = resolve_effective(dir.path().to_str(), None, None, None, None).unwrap_err();
        assert!(matches!(err, CheckError::InvalidConfig { .. }));
    }

    #[test]
    fn test_detect_repo_root_walks_up_to_git() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("a/b")).unwrap();
        assert_eq!(detect_repo_root(&root.join("a/b")), root.to_path_buf());
    }
}
