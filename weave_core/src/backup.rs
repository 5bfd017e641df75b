//! Backup Manager (SPEC_FULL.md §3 supplemental feature): copies the input
//! module aside before the Saver overwrites it, and can restore it.
//!
//! Grounded on `bsharp_cli`'s pattern of keeping filesystem side effects (it
//! writes analysis reports to disk the same way) behind a small function
//! that returns a `Result` the caller logs and decides whether to treat as
//! fatal, rather than threading a generic "IO layer" abstraction through
//! the crate.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Where a module's backup landed, and the path it should be restored to.
#[derive(Debug, Clone)]
pub struct BackupRecord {
    pub original_path: PathBuf,
    pub backup_path: PathBuf,
}

/// Copies `module_path` to `<backup_dir>/<filename>.bak`, alongside a
/// `.bak.path` sidecar holding the original absolute path — so a later,
/// separate `weave --restore`-style invocation can find its way back
/// without the caller having to remember where the module came from.
pub fn create(module_path: &Path, backup_dir: Option<&Path>) -> Result<BackupRecord> {
    let dir = backup_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| module_path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf());
    fs::create_dir_all(&dir)?;

    let file_name = module_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "module".to_string());
    let backup_path = dir.join(format!("{file_name}.bak"));

    fs::copy(module_path, &backup_path)?;

    let sidecar_path = dir.join(format!("{file_name}.bak.path"));
    let absolute = fs::canonicalize(module_path).unwrap_or_else(|_| module_path.to_path_buf());
    fs::write(&sidecar_path, absolute.to_string_lossy().as_bytes())?;

    Ok(BackupRecord {
        original_path: module_path.to_path_buf(),
        backup_path,
    })
}

/// Copies the backup back over the original location, undoing a weave run.
pub fn restore(record: &BackupRecord) -> Result<()> {
    fs::copy(&record.backup_path, &record.original_path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn backup_then_restore_round_trips_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let module_path = dir.path().join("App.dll");
        let mut f = fs::File::create(&module_path).unwrap();
        f.write_all(b"original bytes").unwrap();
        drop(f);

        let record = create(&module_path, None).unwrap();
        assert!(record.backup_path.exists());
        assert!(dir.path().join("App.dll.bak.path").exists());

        fs::write(&module_path, b"overwritten by weave").unwrap();
        restore(&record).unwrap();

        let restored = fs::read(&module_path).unwrap();
        assert_eq!(restored, b"original bytes");
    }

    #[test]
    fn backup_dir_override_is_respected() {
        let dir = tempfile::tempdir().unwrap();
        let module_path = dir.path().join("App.dll");
        fs::write(&module_path, b"bytes").unwrap();

        let backup_dir = dir.path().join("backups");
        let record = create(&module_path, Some(&backup_dir)).unwrap();

        assert_eq!(record.backup_path.parent().unwrap(), backup_dir);
    }
}
