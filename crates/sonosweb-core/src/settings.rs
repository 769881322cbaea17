use crate::CoreError;
use serde::{Deserialize, Serialize};
use sonosweb_runtime::ToolchainSpec;
use sonosweb_store::{anchor, expand_tilde};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 1800;

/// User settings read from `config.toml`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Where a new installation goes; `~/` is expanded.
    pub install_dir: Option<String>,
    pub repository: String,
    pub branch: String,
    /// `shell` runs the real tools, `mock` fabricates their results.
    pub toolchain: String,
    pub npm: String,
    pub supervisor: String,
    /// Per external command; `0` disables the limit.
    pub step_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let spec = ToolchainSpec::default();
        Self {
            install_dir: None,
            repository: spec.repository,
            branch: spec.branch,
            toolchain: "shell".to_owned(),
            npm: spec.npm,
            supervisor: spec.supervisor,
            step_timeout_secs: DEFAULT_STEP_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&content).map_err(|e| CoreError::Settings {
            path: path.to_path_buf(),
            reason: e.message().to_owned(),
        })
    }

    pub fn step_timeout(&self) -> Option<Duration> {
        match self.step_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn toolchain_spec(&self) -> ToolchainSpec {
        ToolchainSpec {
            repository: self.repository.clone(),
            branch: self.branch.clone(),
            npm: self.npm.clone(),
            supervisor: self.supervisor.clone(),
        }
    }

    /// Target for a new installation when neither a flag nor a record names one.
    /// A relative `install_dir` is taken from the current directory.
    pub fn default_install_dir(&self) -> PathBuf {
        anchor(
            self.install_dir
                .as_deref()
                .map_or_else(sonosweb_store::default_install_dir, expand_tilde),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.toolchain, "shell");
        assert_eq!(settings.step_timeout(), Some(Duration::from_secs(1800)));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "branch = \"develop\"\nstep_timeout_secs = 0\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.branch, "develop");
        assert_eq!(settings.repository, "Villager-B/sonos-web");
        assert_eq!(settings.step_timeout(), None);
    }

    #[test]
    fn invalid_file_is_settings_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "step_timeout_secs = \"soon\"\n").unwrap();
        assert!(matches!(
            Settings::load(&path),
            Err(CoreError::Settings { .. })
        ));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "instal_dir = \"/tmp\"\n").unwrap();
        assert!(Settings::load(&path).is_err());
    }

    #[test]
    fn toolchain_spec_carries_binaries() {
        let settings = Settings {
            npm: "pnpm".to_owned(),
            supervisor: "/opt/bin/forever".to_owned(),
            ..Settings::default()
        };
        let spec = settings.toolchain_spec();
        assert_eq!(spec.npm, "pnpm");
        assert_eq!(spec.supervisor, "/opt/bin/forever");
    }

    #[test]
    fn configured_install_dir_is_used() {
        let settings = Settings {
            install_dir: Some("/srv/sonos-web".to_owned()),
            ..Settings::default()
        };
        assert_eq!(settings.default_install_dir(), PathBuf::from("/srv/sonos-web"));
    }

    #[test]
    fn relative_install_dir_becomes_absolute() {
        let settings = Settings {
            install_dir: Some("apps/sonos-web".to_owned()),
            ..Settings::default()
        };
        assert_eq!(
            settings.default_install_dir(),
            std::env::current_dir().unwrap().join("apps/sonos-web")
        );
    }
}
