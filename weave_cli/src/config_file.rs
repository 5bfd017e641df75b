//! `--config=<path>` layered config file (SPEC_FULL.md §3 supplemental
//! feature): a TOML or JSON file holding the same per-run options the CLI
//! flags set, so a host can check a filter policy into a repo instead of
//! reconstructing a long invocation. CLI flags always take precedence,
//! mirroring the file-then-flags layering
//! `bsharp_cli::commands::analyze::execute` uses for `AnalysisConfig`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub prefix: Option<String>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub output: Option<PathBuf>,
    pub no_backup: bool,
    pub backup_dir: Option<PathBuf>,
    pub instrument_compiler_generated: bool,
    pub search_dirs: Vec<PathBuf>,
    pub dry_run: bool,
}

impl FileConfig {
    /// Reads and parses `path`, dispatching on its extension the way
    /// `bsharp_cli::commands::analyze::execute` does for `AnalysisConfig`
    /// (`.toml` parses as TOML, anything else as JSON).
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        let parsed = if ext == "toml" {
            toml::from_str(&text)?
        } else {
            serde_json::from_str(&text)?
        };
        Ok(parsed)
    }

    /// Applies every value this file actually set as the base for a
    /// `weave_core::Config`; CLI flags are layered on top by the caller.
    pub fn apply_to(self, config: &mut weave_core::Config) {
        if let Some(prefix) = self.prefix {
            config.field_prefix = prefix;
        }
        if !self.include.is_empty() {
            config.include_namespaces = self.include;
        }
        if !self.exclude.is_empty() {
            config.exclude_namespaces.extend(self.exclude);
        }
        if self.output.is_some() {
            config.output = self.output;
        }
        if self.no_backup {
            config.no_backup = true;
        }
        if self.backup_dir.is_some() {
            config.backup_dir = self.backup_dir;
        }
        if self.instrument_compiler_generated {
            config.instrument_compiler_generated = true;
        }
        if !self.search_dirs.is_empty() {
            config.search_dirs = self.search_dirs;
        }
        if self.dry_run {
            config.dry_run = true;
        }
    }
}
