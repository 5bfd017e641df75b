//! Symbol File Reconciler (spec.md §4.1, §4.7): the writer always emits the
//! long convention (`<base>.<ext>.sym`) next to whatever it saved. If the
//! loader originally detected the short convention (`<base>.sym`) on the
//! input, a downstream loader that only probes the short form would never
//! find the new symbols, so this reconciles the two by deleting whatever
//! stale short-convention file is sitting at the save target and renaming
//! the just-emitted long-convention file onto that short path — including
//! when the save target is the same path as the original input (the
//! common in-place overwrite).

use std::fs;
use std::path::{Path, PathBuf};

use crate::cil::SymbolConvention;
use crate::error::Result;

/// Reconciles the symbol file at `save_target` against the convention
/// recorded at load time (spec.md §4.7). A no-op unless the loader detected
/// the short convention and the writer actually emitted a long-convention
/// file there — the other direction (long detected, short emitted) doesn't
/// arise since the writer only ever emits the long form.
pub fn reconcile(save_target: &Path, detected_convention: Option<&SymbolConvention>) -> Result<Option<PathBuf>> {
    if !matches!(detected_convention, Some(SymbolConvention::Short)) {
        return Ok(None);
    }

    let emitted = symbol_path_for(save_target, &SymbolConvention::Long);
    if !emitted.exists() {
        return Ok(None);
    }

    let target = symbol_path_for(save_target, &SymbolConvention::Short);
    if target.exists() && target != emitted {
        fs::remove_file(&target)?;
    }
    fs::rename(&emitted, &target)?;
    Ok(Some(target))
}

fn symbol_path_for(module_path: &Path, convention: &SymbolConvention) -> PathBuf {
    match convention {
        SymbolConvention::Short => module_path.with_extension("sym"),
        SymbolConvention::Long => {
            let file_name = module_path.file_name().unwrap_or_default().to_string_lossy().into_owned();
            module_path.with_file_name(format!("{file_name}.sym"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_convention_recorded_means_nothing_to_reconcile() {
        let output = PathBuf::from("/tmp/App.instrumented.dll");
        let result = reconcile(&output, None).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn long_convention_detected_is_left_alone() {
        let output = PathBuf::from("/tmp/App.dll");
        let result = reconcile(&output, Some(&SymbolConvention::Long)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn short_convention_symbol_path_is_extension_swap() {
        let path = symbol_path_for(Path::new("/tmp/App.dll"), &SymbolConvention::Short);
        assert_eq!(path, PathBuf::from("/tmp/App.sym"));
    }

    #[test]
    fn long_convention_symbol_path_appends_sym() {
        let path = symbol_path_for(Path::new("/tmp/App.dll"), &SymbolConvention::Long);
        assert_eq!(path, PathBuf::from("/tmp/App.dll.sym"));
    }

    #[test]
    fn in_place_save_still_renames_the_emitted_file_to_the_short_convention() {
        let dir = tempfile::tempdir().unwrap();
        let module = dir.path().join("App.dll");
        let stale_short = dir.path().join("App.sym");
        let emitted_long = dir.path().join("App.dll.sym");
        fs::write(&stale_short, b"stale symbol data").unwrap();
        fs::write(&emitted_long, b"freshly written symbol data").unwrap();

        let result = reconcile(&module, Some(&SymbolConvention::Short)).unwrap();

        assert_eq!(result, Some(stale_short.clone()));
        assert!(stale_short.exists());
        assert!(!emitted_long.exists());
        assert_eq!(fs::read(&stale_short).unwrap(), b"freshly written symbol data");
    }

    #[test]
    fn reconcile_at_a_distinct_output_path_renames_there_too() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("App.instrumented.dll");
        let emitted_long = dir.path().join("App.instrumented.dll.sym");
        fs::write(&emitted_long, b"symbol data").unwrap();

        let result = reconcile(&output, Some(&SymbolConvention::Short)).unwrap();

        let expected = dir.path().join("App.instrumented.sym");
        assert_eq!(result, Some(expected.clone()));
        assert!(expected.exists());
        assert!(!emitted_long.exists());
    }

    #[test]
    fn missing_emitted_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("App.dll");

        let result = reconcile(&output, Some(&SymbolConvention::Short)).unwrap();
        assert!(result.is_none());
    }
}
