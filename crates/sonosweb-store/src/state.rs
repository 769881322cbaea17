use crate::InstallLayout;
use serde::{Deserialize, Serialize};

/// Lifecycle state of one installation, derived purely from marker files.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstallState {
    Absent,
    Stopped,
    Running,
}

impl std::fmt::Display for InstallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstallState::Absent => write!(f, "absent"),
            InstallState::Stopped => write!(f, "stopped"),
            InstallState::Running => write!(f, "running"),
        }
    }
}

pub fn is_installed(layout: &InstallLayout) -> bool {
    layout.server_entry().is_file()
}

/// Trusts the supervisor's pid file; no liveness check is made here.
pub fn is_running(layout: &InstallLayout) -> bool {
    layout.pid_file().exists()
}

/// A pid file without an entry point still counts as absent.
pub fn current_state(layout: &InstallLayout) -> InstallState {
    if !is_installed(layout) {
        InstallState::Absent
    } else if is_running(layout) {
        InstallState::Running
    } else {
        InstallState::Stopped
    }
}

pub fn read_pid(layout: &InstallLayout) -> Option<u32> {
    std::fs::read_to_string(layout.pid_file())
        .ok()?
        .trim()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn installed_layout() -> (tempfile::TempDir, InstallLayout) {
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallLayout::new(dir.path());
        fs::write(layout.server_entry(), "// entry").unwrap();
        (dir, layout)
    }

    #[test]
    fn empty_directory_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallLayout::new(dir.path());
        assert!(!is_installed(&layout));
        assert_eq!(current_state(&layout), InstallState::Absent);
    }

    #[test]
    fn missing_directory_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallLayout::new(dir.path().join("nope"));
        assert_eq!(current_state(&layout), InstallState::Absent);
    }

    #[test]
    fn entry_point_means_stopped() {
        let (_dir, layout) = installed_layout();
        assert!(is_installed(&layout));
        assert!(!is_running(&layout));
        assert_eq!(current_state(&layout), InstallState::Stopped);
    }

    #[test]
    fn pid_file_means_running() {
        let (_dir, layout) = installed_layout();
        fs::write(layout.pid_file(), "4242\n").unwrap();
        assert_eq!(current_state(&layout), InstallState::Running);
        assert_eq!(read_pid(&layout), Some(4242));
    }

    #[test]
    fn pid_file_without_entry_point_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallLayout::new(dir.path());
        fs::write(layout.pid_file(), "1").unwrap();
        assert_eq!(current_state(&layout), InstallState::Absent);
    }

    #[test]
    fn garbage_pid_reads_as_none() {
        let (_dir, layout) = installed_layout();
        fs::write(layout.pid_file(), "not-a-pid").unwrap();
        assert!(is_running(&layout));
        assert_eq!(read_pid(&layout), None);
    }

    #[test]
    fn state_display() {
        assert_eq!(InstallState::Absent.to_string(), "absent");
        assert_eq!(InstallState::Stopped.to_string(), "stopped");
        assert_eq!(InstallState::Running.to_string(), "running");
    }
}
