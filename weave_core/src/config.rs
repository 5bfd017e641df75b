//! The configuration record the (out-of-scope) argument/config parser
//! produces and the weaver consumes (spec.md §1, §6).

use std::path::PathBuf;

/// Default counter-field prefix (spec.md §6).
pub const DEFAULT_FIELD_PREFIX: &str = "_invokeCount_";

/// Helper-type name suffix (spec.md §3).
pub const HELPER_SUFFIX: &str = "_InvokeCounters";

fn default_exclude_namespaces() -> Vec<String> {
    // The runtime/editor/system namespaces of the host platform (spec.md §6).
    // InvokeTracker-style tools run inside a Unity/Mono host, so the default
    // blocklist covers the CLR's own namespaces plus the editor integration's.
    [
        "System",
        "Microsoft",
        "Mono",
        "UnityEngine",
        "UnityEditor",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the target module (first positional argument).
    pub input: PathBuf,
    /// Counter field prefix; overrides `DEFAULT_FIELD_PREFIX`.
    pub field_prefix: String,
    /// Namespaces to include; empty means "all not excluded".
    pub include_namespaces: Vec<String>,
    /// Namespaces to exclude; takes precedence over `include_namespaces`.
    pub exclude_namespaces: Vec<String>,
    /// Write to a distinct path instead of overwriting the input.
    pub output: Option<PathBuf>,
    /// Disable backup creation.
    pub no_backup: bool,
    /// Directory for backup files and `.bak.path` sidecars.
    pub backup_dir: Option<PathBuf>,
    /// Include compiler-generated types/methods.
    pub instrument_compiler_generated: bool,
    /// Additional directories to search when resolving references.
    pub search_dirs: Vec<PathBuf>,
    /// Report eligible work without writing anything (supplemental feature,
    /// SPEC_FULL.md §3).
    pub dry_run: bool,
}

impl Config {
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            field_prefix: DEFAULT_FIELD_PREFIX.to_string(),
            include_namespaces: Vec::new(),
            exclude_namespaces: default_exclude_namespaces(),
            output: None,
            no_backup: false,
            backup_dir: None,
            instrument_compiler_generated: false,
            search_dirs: Vec::new(),
            dry_run: false,
        }
    }

    /// Path the Saver should write to: the configured output, or the input
    /// path when none was given (spec.md §4.1).
    pub fn output_path(&self) -> &std::path::Path {
        self.output.as_deref().unwrap_or(&self.input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_excludes_host_platform_namespaces() {
        let cfg = Config::new(PathBuf::from("App.dll"));
        assert!(cfg.exclude_namespaces.contains(&"System".to_string()));
        assert!(cfg.include_namespaces.is_empty());
        assert_eq!(cfg.output_path(), PathBuf::from("App.dll"));
    }

    #[test]
    fn explicit_output_overrides_input_as_save_target() {
        let mut cfg = Config::new(PathBuf::from("App.dll"));
        cfg.output = Some(PathBuf::from("App.instrumented.dll"));
        assert_eq!(cfg.output_path(), PathBuf::from("App.instrumented.dll"));
    }
}
