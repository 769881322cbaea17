use crate::CoreError;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// One install step. `ALL` is the order `install` executes them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallStep {
    CreateDir,
    FetchSource,
    BuildClient,
    InstallServer,
    Relocate,
    Start,
}

impl InstallStep {
    pub const ALL: [InstallStep; 6] = [
        InstallStep::CreateDir,
        InstallStep::FetchSource,
        InstallStep::BuildClient,
        InstallStep::InstallServer,
        InstallStep::Relocate,
        InstallStep::Start,
    ];

    pub fn name(self) -> &'static str {
        match self {
            InstallStep::CreateDir => "create-dir",
            InstallStep::FetchSource => "fetch-source",
            InstallStep::BuildClient => "build-client",
            InstallStep::InstallServer => "install-server",
            InstallStep::Relocate => "relocate",
            InstallStep::Start => "start",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            InstallStep::CreateDir => "creating install directory...",
            InstallStep::FetchSource => "downloading sonos-web...",
            InstallStep::BuildClient => "building client (this can take a few minutes)...",
            InstallStep::InstallServer => "installing server dependencies...",
            InstallStep::Relocate => "arranging installed files...",
            InstallStep::Start => "starting sonos-web...",
        }
    }

    pub fn done_message(self) -> &'static str {
        match self {
            InstallStep::CreateDir => "install directory created",
            InstallStep::FetchSource => "sonos-web downloaded",
            InstallStep::BuildClient => "client built",
            InstallStep::InstallServer => "server dependencies installed",
            InstallStep::Relocate => "installed files arranged",
            InstallStep::Start => "sonos-web started",
        }
    }

    pub fn failure_message(self) -> &'static str {
        match self {
            InstallStep::CreateDir => "could not create install directory",
            InstallStep::FetchSource => "could not download sonos-web",
            InstallStep::BuildClient => "could not build client",
            InstallStep::InstallServer => "could not install server dependencies",
            InstallStep::Relocate => "could not arrange installed files",
            InstallStep::Start => "could not start sonos-web",
        }
    }
}

/// Observer for step-level feedback (spinners in the CLI, nothing in tests).
pub trait Progress {
    fn step_started(&mut self, _step: InstallStep) {}
    fn step_succeeded(&mut self, _step: InstallStep) {}
    fn step_failed(&mut self, _step: InstallStep, _error: &CoreError) {}
}

pub struct NoProgress;

impl Progress for NoProgress {}

/// Execute `steps` in order, stopping at the first failure.
///
/// The failing step's error is wrapped in `StepFailed` together with `log`, the
/// file holding the captured output of every external command run so far.
/// `cancelled` is checked before each step; once it returns `true` no further
/// step starts and the run ends with `Interrupted`.
pub fn run_steps<F>(
    steps: &[InstallStep],
    log: &Path,
    progress: &mut dyn Progress,
    cancelled: &dyn Fn() -> bool,
    mut execute: F,
) -> Result<(), CoreError>
where
    F: FnMut(InstallStep) -> Result<(), CoreError>,
{
    for &step in steps {
        if cancelled() {
            warn!("install interrupted before step {}", step.name());
            return Err(CoreError::Interrupted);
        }
        info!("install step: {}", step.name());
        progress.step_started(step);
        if let Err(e) = execute(step) {
            warn!("install step {} failed: {e}", step.name());
            progress.step_failed(step, &e);
            return Err(CoreError::StepFailed {
                step,
                log: log.to_path_buf(),
                source: Box::new(e),
            });
        }
        progress.step_succeeded(step);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl Progress for Recorder {
        fn step_started(&mut self, step: InstallStep) {
            self.events.push(format!("start:{}", step.name()));
        }
        fn step_succeeded(&mut self, step: InstallStep) {
            self.events.push(format!("ok:{}", step.name()));
        }
        fn step_failed(&mut self, step: InstallStep, _error: &CoreError) {
            self.events.push(format!("fail:{}", step.name()));
        }
    }

    #[test]
    fn runs_every_step_in_order() {
        let mut seen = Vec::new();
        run_steps(
            &InstallStep::ALL,
            Path::new("install.log"),
            &mut NoProgress,
            &|| false,
            |step| {
                seen.push(step);
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(seen, InstallStep::ALL.to_vec());
    }

    #[test]
    fn stops_at_first_failure() {
        let mut recorder = Recorder::default();
        let mut executed = Vec::new();
        let err = run_steps(
            &InstallStep::ALL,
            Path::new("/srv/sonos-web/install.log"),
            &mut recorder,
            &|| false,
            |step| {
                executed.push(step);
                if step == InstallStep::BuildClient {
                    Err(CoreError::Io(std::io::Error::other("npm exploded")))
                } else {
                    Ok(())
                }
            },
        )
        .unwrap_err();

        assert_eq!(
            executed,
            vec![
                InstallStep::CreateDir,
                InstallStep::FetchSource,
                InstallStep::BuildClient
            ]
        );
        assert_eq!(
            recorder.events.last().map(String::as_str),
            Some("fail:build-client")
        );
        match err {
            CoreError::StepFailed { step, log, .. } => {
                assert_eq!(step, InstallStep::BuildClient);
                assert_eq!(log, Path::new("/srv/sonos-web/install.log"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn cancellation_between_steps_is_interrupted() {
        let completed = Cell::new(0);
        let mut recorder = Recorder::default();
        let err = run_steps(
            &InstallStep::ALL,
            Path::new("install.log"),
            &mut recorder,
            &|| completed.get() >= 2,
            |_| {
                completed.set(completed.get() + 1);
                Ok(())
            },
        )
        .unwrap_err();

        assert!(matches!(err, CoreError::Interrupted));
        assert_eq!(completed.get(), 2);
        assert_eq!(
            recorder.events,
            vec![
                "start:create-dir",
                "ok:create-dir",
                "start:fetch-source",
                "ok:fetch-source"
            ]
        );
    }

    #[test]
    fn cancelled_before_start_runs_nothing() {
        let mut executed = 0;
        let err = run_steps(
            &InstallStep::ALL,
            Path::new("install.log"),
            &mut NoProgress,
            &|| true,
            |_| {
                executed += 1;
                Ok(())
            },
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Interrupted));
        assert_eq!(executed, 0);
    }

    #[test]
    fn every_step_has_distinct_name() {
        let mut names: Vec<_> = InstallStep::ALL.into_iter().map(InstallStep::name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), InstallStep::ALL.len());
    }

    #[test]
    fn create_dir_failure_message() {
        assert_eq!(
            InstallStep::CreateDir.failure_message(),
            "could not create install directory"
        );
    }
}
