use crate::CoreError;
use sonosweb_store::{InstallLayout, InstallState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Install,
    Start,
    Stop,
    Uninstall,
    Update,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Install => write!(f, "install"),
            Action::Start => write!(f, "start"),
            Action::Stop => write!(f, "stop"),
            Action::Uninstall => write!(f, "uninstall"),
            Action::Update => write!(f, "update"),
        }
    }
}

/// Check that `action` may run against an installation in `state`.
///
/// `Stop` outside `Running` yields `NotRunning`, which callers downgrade to an
/// informational outcome. `Uninstall` and `Update` are valid from every state.
pub fn validate_action(
    state: InstallState,
    action: Action,
    layout: &InstallLayout,
) -> Result<(), CoreError> {
    match (action, state) {
        (Action::Install, InstallState::Absent)
        | (Action::Start, InstallState::Stopped)
        | (Action::Stop, InstallState::Running)
        | (Action::Uninstall | Action::Update, _) => Ok(()),
        (Action::Install, InstallState::Stopped | InstallState::Running) => {
            Err(CoreError::AlreadyInstalled(layout.root().to_path_buf()))
        }
        (Action::Start, InstallState::Absent) => {
            Err(CoreError::NotInstalled(layout.root().to_path_buf()))
        }
        (Action::Start, InstallState::Running) => Err(CoreError::AlreadyRunning(layout.pid_file())),
        (Action::Stop, InstallState::Absent | InstallState::Stopped) => {
            Err(CoreError::NotRunning(layout.pid_file()))
        }
    }
}
