use crate::concurrency::{shutdown_requested, LifecycleLock};
use crate::envfile::read_port;
use crate::lifecycle::{validate_action, Action};
use crate::relocate::relocate_build_output;
use crate::settings::Settings;
use crate::steps::{run_steps, InstallStep, Progress};
use crate::CoreError;
use serde::Serialize;
use sonosweb_runtime::{
    primary_ipv4, process_alive, select_toolchain, truncate_log, ProcessRunner, ToolContext,
    Toolchain,
};
use sonosweb_store::{
    current_state, read_pid, ConfigLayout, InstallLayout, InstallRecord, InstallState, StoreError,
};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Drives every lifecycle action against one configuration directory.
///
/// Mutating actions hold the lifecycle lock for their whole duration; `status`
/// only reads.
pub struct Manager {
    config: ConfigLayout,
    settings: Settings,
    install_dir_override: Option<PathBuf>,
    toolchain: Box<dyn Toolchain>,
    runner: ProcessRunner,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartReport {
    pub install_dir: PathBuf,
    pub port: u16,
    pub local_url: String,
    pub network_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub install_dir: PathBuf,
    pub log: PathBuf,
    pub start: StartReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StopOutcome {
    Stopped,
    NotRunning,
    /// The supervisor refused; `cleared_stale_marker` is set when the pid file
    /// named a dead process and was removed.
    SupervisorNotRunning {
        reason: String,
        cleared_stale_marker: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UninstallOutcome {
    Removed {
        install_dir: PathBuf,
        stop: StopOutcome,
    },
    NotInstalled,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub state: InstallState,
    pub install_dir: PathBuf,
    pub port: Option<u16>,
    pub pid: Option<u32>,
    pub process_alive: Option<bool>,
}

impl Manager {
    pub fn new(
        config: ConfigLayout,
        settings: Settings,
        install_dir_override: Option<PathBuf>,
    ) -> Result<Self, CoreError> {
        let toolchain = select_toolchain(&settings.toolchain, settings.toolchain_spec())?;
        Ok(Self::with_toolchain(
            config,
            settings,
            install_dir_override,
            toolchain,
        ))
    }

    pub fn with_toolchain(
        config: ConfigLayout,
        settings: Settings,
        install_dir_override: Option<PathBuf>,
        toolchain: Box<dyn Toolchain>,
    ) -> Self {
        let runner = ProcessRunner::new()
            .with_timeout(settings.step_timeout())
            .with_cancel(shutdown_requested);
        Self {
            config,
            settings,
            install_dir_override,
            toolchain,
            runner,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config(&self) -> &ConfigLayout {
        &self.config
    }

    pub fn toolchain(&self) -> &dyn Toolchain {
        self.toolchain.as_ref()
    }

    /// Directory of an existing installation: the override, else the record.
    pub fn resolve_installed(&self) -> Result<InstallLayout, CoreError> {
        if let Some(dir) = &self.install_dir_override {
            return Ok(InstallLayout::new(dir.clone()));
        }
        match InstallRecord::load(&self.config.record_file()) {
            Ok(record) => Ok(InstallLayout::new(record.install_dir)),
            Err(StoreError::NotInstalled(_)) => Err(CoreError::NotInstalled(
                self.settings.default_install_dir(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Directory a new installation goes to: override, record, settings, default.
    pub fn resolve_target(&self) -> PathBuf {
        if let Some(dir) = &self.install_dir_override {
            return dir.clone();
        }
        match InstallRecord::load(&self.config.record_file()) {
            Ok(record) => record.install_dir,
            Err(_) => self.settings.default_install_dir(),
        }
    }

    fn lock(&self) -> Result<LifecycleLock, CoreError> {
        LifecycleLock::acquire(&self.config.lock_file())
    }

    /// Per-installation lock, always taken after the configuration lock.
    fn lock_installation(&self, layout: &InstallLayout) -> Result<LifecycleLock, CoreError> {
        LifecycleLock::acquire(&layout.lock_file())
    }

    fn context<'a>(&'a self, layout: &'a InstallLayout, log: Option<&'a Path>) -> ToolContext<'a> {
        ToolContext {
            layout,
            runner: &self.runner,
            log,
        }
    }

    pub fn install(&self, progress: &mut dyn Progress) -> Result<InstallReport, CoreError> {
        let _lock = self.lock()?;
        let layout = InstallLayout::new(self.resolve_target());
        let _install_lock = self.lock_installation(&layout)?;
        self.ensure_no_other_installation(&layout)?;
        self.install_into(&layout, progress)
    }

    /// The record may point at a different, still installed directory when an
    /// override is given; one configuration directory tracks one installation.
    fn ensure_no_other_installation(&self, layout: &InstallLayout) -> Result<(), CoreError> {
        if let Ok(record) = InstallRecord::load(&self.config.record_file()) {
            let recorded = InstallLayout::new(record.install_dir);
            if recorded.root() != layout.root() && current_state(&recorded) != InstallState::Absent
            {
                return Err(CoreError::AlreadyInstalled(recorded.root().to_path_buf()));
            }
        }
        Ok(())
    }

    fn install_into(
        &self,
        layout: &InstallLayout,
        progress: &mut dyn Progress,
    ) -> Result<InstallReport, CoreError> {
        validate_action(current_state(layout), Action::Install, layout)?;
        info!("installing sonos-web into {}", layout.root().display());

        let log = layout.install_log();
        run_steps(&InstallStep::ALL, &log, progress, &shutdown_requested, |step| {
            self.execute_step(step, layout, &log)
        })?;

        let port = read_port(&layout.env_file())?;
        info!("sonos-web installed at {}", layout.root().display());
        Ok(InstallReport {
            install_dir: layout.root().to_path_buf(),
            log,
            start: start_report(layout, port),
        })
    }

    fn execute_step(
        &self,
        step: InstallStep,
        layout: &InstallLayout,
        log: &Path,
    ) -> Result<(), CoreError> {
        let ctx = self.context(layout, Some(log));
        match step {
            InstallStep::CreateDir => {
                std::fs::create_dir_all(layout.root())?;
                truncate_log(log)?;
                InstallRecord::new(
                    layout.root(),
                    &self.settings.repository,
                    &self.settings.branch,
                )
                .save(&self.config.record_file())?;
            }
            InstallStep::FetchSource => self.toolchain.fetch_source(&ctx)?,
            InstallStep::BuildClient => self.toolchain.build_client(&ctx)?,
            InstallStep::InstallServer => self.toolchain.install_server(&ctx)?,
            InstallStep::Relocate => relocate_build_output(layout, Some(log))?,
            InstallStep::Start => {
                self.launch(layout, log)?;
            }
        }
        Ok(())
    }

    /// Validate `.env` before the supervisor is involved, then start.
    fn launch(&self, layout: &InstallLayout, log: &Path) -> Result<StartReport, CoreError> {
        let port = read_port(&layout.env_file())?;
        debug!("starting {} on port {port}", layout.server_entry().display());
        self.toolchain.start(&self.context(layout, Some(log)))?;
        Ok(start_report(layout, port))
    }

    pub fn start(&self) -> Result<StartReport, CoreError> {
        let _lock = self.lock()?;
        let layout = self.resolve_installed()?;
        let _install_lock = self.lock_installation(&layout)?;
        validate_action(current_state(&layout), Action::Start, &layout)?;
        info!("starting sonos-web at {}", layout.root().display());
        self.launch(&layout, &layout.install_log())
    }

    pub fn stop(&self) -> Result<StopOutcome, CoreError> {
        let _lock = self.lock()?;
        let layout = match self.resolve_installed() {
            Ok(layout) => layout,
            Err(CoreError::NotInstalled(_)) => return Ok(StopOutcome::NotRunning),
            Err(e) => return Err(e),
        };
        let _install_lock = self.lock_installation(&layout)?;
        self.stop_at(&layout)
    }

    fn stop_at(&self, layout: &InstallLayout) -> Result<StopOutcome, CoreError> {
        match validate_action(current_state(layout), Action::Stop, layout) {
            Ok(()) => {}
            Err(CoreError::NotRunning(_)) => return Ok(StopOutcome::NotRunning),
            Err(e) => return Err(e),
        }
        info!("stopping sonos-web at {}", layout.root().display());
        let log = layout.install_log();
        match self.toolchain.stop(&self.context(layout, Some(&log))) {
            Ok(()) => Ok(StopOutcome::Stopped),
            Err(e) => {
                warn!("supervisor could not stop sonos-web: {e}");
                let cleared_stale_marker = clear_stale_marker(layout)?;
                Ok(StopOutcome::SupervisorNotRunning {
                    reason: e.to_string(),
                    cleared_stale_marker,
                })
            }
        }
    }

    pub fn uninstall(&self) -> Result<UninstallOutcome, CoreError> {
        let _lock = self.lock()?;
        let layout = match self.resolve_installed() {
            Ok(layout) => layout,
            Err(CoreError::NotInstalled(_)) => return Ok(UninstallOutcome::NotInstalled),
            Err(e) => return Err(e),
        };
        let _install_lock = self.lock_installation(&layout)?;
        self.uninstall_at(&layout)
    }

    fn uninstall_at(&self, layout: &InstallLayout) -> Result<UninstallOutcome, CoreError> {
        let root = layout.root();
        if !root.exists() {
            self.forget_record(root)?;
            return Ok(UninstallOutcome::NotInstalled);
        }
        if !layout.server_entry().exists() && !layout.install_log().exists() {
            return Err(CoreError::UnrecognizedInstallDir(root.to_path_buf()));
        }

        let stop = self.stop_at(layout)?;
        info!("removing {}", root.display());
        std::fs::remove_dir_all(root)?;
        self.forget_record(root)?;
        Ok(UninstallOutcome::Removed {
            install_dir: root.to_path_buf(),
            stop,
        })
    }

    /// Delete the record unless it names a different installation.
    fn forget_record(&self, root: &Path) -> Result<(), CoreError> {
        let path = self.config.record_file();
        match InstallRecord::load(&path) {
            Ok(record) if InstallLayout::new(&record.install_dir).root() != root => {
                debug!(
                    "keeping record for {}, not {}",
                    record.install_dir.display(),
                    root.display()
                );
            }
            _ => {
                InstallRecord::remove(&path)?;
            }
        }
        Ok(())
    }

    /// Uninstall then install into the same directory. Not atomic: a failed
    /// install leaves nothing of the previous version behind.
    pub fn update(&self, progress: &mut dyn Progress) -> Result<InstallReport, CoreError> {
        let _lock = self.lock()?;
        let layout = InstallLayout::new(self.resolve_target());
        let _install_lock = self.lock_installation(&layout)?;
        validate_action(current_state(&layout), Action::Update, &layout)?;
        info!("updating sonos-web at {}", layout.root().display());

        let removed = self.uninstall_at(&layout)?;
        debug!("update: {removed:?}");
        self.install_into(&layout, progress)
    }

    pub fn status(&self) -> StatusReport {
        let layout = InstallLayout::new(self.resolve_target());
        let state = current_state(&layout);
        let port = match state {
            InstallState::Absent => None,
            _ => read_port(&layout.env_file()).ok(),
        };
        let pid = read_pid(&layout);
        StatusReport {
            state,
            install_dir: layout.root().to_path_buf(),
            port,
            pid,
            process_alive: pid.map(process_alive),
        }
    }
}

fn start_report(layout: &InstallLayout, port: u16) -> StartReport {
    let lan = primary_ipv4().unwrap_or(Ipv4Addr::LOCALHOST);
    StartReport {
        install_dir: layout.root().to_path_buf(),
        port,
        local_url: format!("http://localhost:{port}"),
        network_url: format!("http://{lan}:{port}"),
    }
}

/// Remove a pid file whose process no longer exists. Returns whether it did.
fn clear_stale_marker(layout: &InstallLayout) -> Result<bool, CoreError> {
    let pid_file = layout.pid_file();
    if !pid_file.exists() {
        return Ok(false);
    }
    if let Some(pid) = read_pid(layout) {
        if process_alive(pid) {
            return Ok(false);
        }
    }
    debug!("removing stale pid file {}", pid_file.display());
    match std::fs::remove_file(&pid_file) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
