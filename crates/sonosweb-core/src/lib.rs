//! Lifecycle orchestration for a sonos-web installation.
//!
//! This crate ties the store and runtime layers together into the `Manager`, the
//! API behind every CLI command: install, start, stop, uninstall, update and
//! status. It owns the state-machine preconditions, the ordered install steps and
//! their runner, `.env` parsing, build-output relocation, user settings, and the
//! lifecycle lock that keeps two commands from mutating one installation at once.

pub mod concurrency;
pub mod envfile;
pub mod lifecycle;
pub mod manager;
pub mod relocate;
pub mod settings;
pub mod steps;

pub use concurrency::{install_signal_handler, shutdown_requested, LifecycleLock};
pub use envfile::{parse_env, read_port};
pub use lifecycle::{validate_action, Action};
pub use manager::{InstallReport, Manager, StartReport, StatusReport, StopOutcome, UninstallOutcome};
pub use relocate::relocate_build_output;
pub use settings::Settings;
pub use steps::{run_steps, InstallStep, NoProgress, Progress};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("store error: {0}")]
    Store(#[from] sonosweb_store::StoreError),
    #[error("runtime error: {0}")]
    Runtime(#[from] sonosweb_runtime::RuntimeError),
    #[error("sonos-web is already installed at {}", .0.display())]
    AlreadyInstalled(PathBuf),
    #[error("sonos-web is not installed at {}", .0.display())]
    NotInstalled(PathBuf),
    #[error("sonos-web is already running (pid file {})", .0.display())]
    AlreadyRunning(PathBuf),
    #[error("sonos-web is not running (no pid file at {})", .0.display())]
    NotRunning(PathBuf),
    #[error("no PORT entry in {}", .0.display())]
    MissingPort(PathBuf),
    #[error("invalid PORT value '{value}' in {}", .path.display())]
    InvalidPort { path: PathBuf, value: String },
    #[error("{}: {source}", .step.failure_message())]
    StepFailed {
        step: InstallStep,
        log: PathBuf,
        #[source]
        source: Box<CoreError>,
    },
    #[error("{action}: {source}")]
    Relocate {
        action: String,
        #[source]
        source: std::io::Error,
    },
    #[error("refusing to delete {}: it does not look like a sonos-web installation", .0.display())]
    UnrecognizedInstallDir(PathBuf),
    #[error("another sonos-web command is running (lock {} is held)", .0.display())]
    LockHeld(PathBuf),
    #[error("invalid settings in {}: {reason}", .path.display())]
    Settings { path: PathBuf, reason: String },
    #[error("operation interrupted")]
    Interrupted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// A corrective next step to show the user alongside the error, if any.
    pub fn hint(&self) -> Option<String> {
        match self {
            CoreError::AlreadyInstalled(_) => Some(
                "run `sonos-web update` to reinstall, or `sonos-web uninstall` first".to_owned(),
            ),
            CoreError::NotInstalled(_)
            | CoreError::Store(sonosweb_store::StoreError::NotInstalled(_)) => {
                Some("run `sonos-web install` first".to_owned())
            }
            CoreError::AlreadyRunning(_) => Some(
                "run `sonos-web stop` first; it also clears a pid file left by a crashed server"
                    .to_owned(),
            ),
            CoreError::MissingPort(path) | CoreError::InvalidPort { path, .. } => Some(format!(
                "add a line such as `PORT=5050` to {}",
                path.display()
            )),
            CoreError::StepFailed { log, source, .. } => Some(
                source
                    .hint()
                    .unwrap_or_else(|| format!("see {} for details", log.display())),
            ),
            CoreError::Runtime(sonosweb_runtime::RuntimeError::TimedOut { .. }) => Some(
                "raise the limit with --timeout or step_timeout_secs in config.toml".to_owned(),
            ),
            CoreError::LockHeld(_) => {
                Some("wait for the other command to finish and try again".to_owned())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_failure_display_leads_with_step_message() {
        let e = CoreError::StepFailed {
            step: InstallStep::BuildClient,
            log: PathBuf::from("/srv/sonos-web/install.log"),
            source: Box::new(CoreError::Io(std::io::Error::other("boom"))),
        };
        let msg = e.to_string();
        assert!(msg.starts_with("could not build client"));
        assert!(msg.contains("boom"));
    }

    #[test]
    fn step_failure_hint_points_at_log() {
        let e = CoreError::StepFailed {
            step: InstallStep::FetchSource,
            log: PathBuf::from("/srv/sonos-web/install.log"),
            source: Box::new(CoreError::Io(std::io::Error::other("boom"))),
        };
        assert!(e.hint().unwrap().contains("/srv/sonos-web/install.log"));
    }

    #[test]
    fn step_failure_hint_prefers_inner_hint() {
        let e = CoreError::StepFailed {
            step: InstallStep::Start,
            log: PathBuf::from("/srv/sonos-web/install.log"),
            source: Box::new(CoreError::MissingPort(PathBuf::from("/srv/sonos-web/.env"))),
        };
        assert!(e.hint().unwrap().contains("PORT=5050"));
    }

    #[test]
    fn precondition_errors_carry_hints() {
        let p = PathBuf::from("/srv/sonos-web");
        assert!(CoreError::AlreadyInstalled(p.clone())
            .hint()
            .unwrap()
            .contains("update"));
        assert!(CoreError::NotInstalled(p.clone())
            .hint()
            .unwrap()
            .contains("install"));
        assert!(CoreError::AlreadyRunning(p)
            .hint()
            .unwrap()
            .contains("stop"));
    }

    #[test]
    fn plain_io_error_has_no_hint() {
        assert!(CoreError::Io(std::io::Error::other("x")).hint().is_none());
    }
}
