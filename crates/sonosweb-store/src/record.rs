use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::warn;

/// Points the installer at an installation directory.
///
/// Lives in the configuration directory, not inside the installation, so that
/// `start`/`stop`/`uninstall` can find a custom `--install-dir` chosen at install
/// time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRecord {
    pub install_dir: PathBuf,
    pub repository: String,
    pub branch: String,
    pub installed_at: String,
}

impl InstallRecord {
    pub fn new(install_dir: impl Into<PathBuf>, repository: &str, branch: &str) -> Self {
        Self {
            install_dir: install_dir.into(),
            repository: repository.to_owned(),
            branch: branch.to_owned(),
            installed_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// A missing or unreadable record both classify as "not installed".
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotInstalled(path.to_path_buf()));
            }
            Err(e) => {
                warn!("cannot read install record {}: {e}", path.display());
                return Err(StoreError::NotInstalled(path.to_path_buf()));
            }
        };
        serde_json::from_str(&content).map_err(|e| {
            warn!("install record {} is corrupt: {e}", path.display());
            StoreError::NotInstalled(path.to_path_buf())
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let dir = path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(dir)?;
        let content = serde_json::to_string_pretty(self)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
        crate::fsync_dir(dir)?;
        Ok(())
    }

    /// Returns `true` if a record was removed.
    pub fn remove(path: &Path) -> Result<bool, StoreError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("install.json");
        let record = InstallRecord::new("/srv/sonos-web", "Villager-B/sonos-web", "master");
        record.save(&path).unwrap();

        let loaded = InstallRecord::load(&path).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn save_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/cfg/install.json");
        InstallRecord::new("/srv/x", "a/b", "main")
            .save(&path)
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn missing_record_is_not_installed() {
        let dir = tempfile::tempdir().unwrap();
        let err = InstallRecord::load(&dir.path().join("install.json")).unwrap_err();
        assert!(matches!(err, StoreError::NotInstalled(_)));
    }

    #[test]
    fn corrupt_record_is_not_installed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("install.json");
        fs::write(&path, "{ not json").unwrap();
        let err = InstallRecord::load(&path).unwrap_err();
        assert!(matches!(err, StoreError::NotInstalled(_)));
    }

    #[test]
    fn remove_reports_whether_anything_was_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("install.json");
        assert!(!InstallRecord::remove(&path).unwrap());
        InstallRecord::new("/srv/x", "a/b", "main")
            .save(&path)
            .unwrap();
        assert!(InstallRecord::remove(&path).unwrap());
        assert!(!path.exists());
    }
}
