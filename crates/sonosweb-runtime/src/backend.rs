use crate::prereq::Prerequisite;
use crate::process::ProcessRunner;
use crate::RuntimeError;
use sonosweb_store::InstallLayout;
use std::path::Path;

/// Where the source comes from and which binaries drive the install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainSpec {
    /// GitHub `owner/name`.
    pub repository: String,
    pub branch: String,
    pub npm: String,
    pub supervisor: String,
}

impl Default for ToolchainSpec {
    fn default() -> Self {
        Self {
            repository: "Villager-B/sonos-web".to_owned(),
            branch: "master".to_owned(),
            npm: "npm".to_owned(),
            supervisor: "forever".to_owned(),
        }
    }
}

impl ToolchainSpec {
    pub fn archive_url(&self) -> String {
        format!(
            "https://codeload.github.com/{}/tar.gz/{}",
            self.repository, self.branch
        )
    }
}

/// Everything a toolchain step needs: where the installation lives, how to run
/// commands, and where (if anywhere) their output should be logged.
#[derive(Debug, Clone, Copy)]
pub struct ToolContext<'a> {
    pub layout: &'a InstallLayout,
    pub runner: &'a ProcessRunner,
    pub log: Option<&'a Path>,
}

impl ToolContext<'_> {
    pub fn run(&self, command: &str, cwd: Option<&Path>) -> Result<String, RuntimeError> {
        self.runner.run(command, cwd, self.log)
    }
}

/// The external collaborators of an installation, treated as black boxes.
pub trait Toolchain {
    fn name(&self) -> &str;

    /// Binaries that must be on `PATH` for a full install.
    fn required_tools(&self) -> Vec<Prerequisite>;

    /// Binaries needed to start an existing installation.
    fn start_tools(&self) -> Vec<Prerequisite> {
        self.required_tools()
    }

    /// Populate the installation root with the application's source tree.
    fn fetch_source(&self, ctx: &ToolContext<'_>) -> Result<(), RuntimeError>;

    /// Install front-end dependencies and build into `client/dist`.
    fn build_client(&self, ctx: &ToolContext<'_>) -> Result<(), RuntimeError>;

    /// Install the back end's production dependencies in `server/`.
    fn install_server(&self, ctx: &ToolContext<'_>) -> Result<(), RuntimeError>;

    /// Launch `server.js` daemonised; the supervisor writes the pid file.
    fn start(&self, ctx: &ToolContext<'_>) -> Result<(), RuntimeError>;

    /// Stop `server.js`; the supervisor removes the pid file.
    fn stop(&self, ctx: &ToolContext<'_>) -> Result<(), RuntimeError>;
}

pub fn select_toolchain(
    name: &str,
    spec: ToolchainSpec,
) -> Result<Box<dyn Toolchain>, RuntimeError> {
    match name {
        "shell" => Ok(Box::new(crate::shell::ShellToolchain::new(spec))),
        "mock" => Ok(Box::new(crate::mock::MockToolchain::from_env())),
        other => Err(RuntimeError::ToolchainUnavailable(other.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_valid_toolchains() {
        assert_eq!(
            select_toolchain("shell", ToolchainSpec::default())
                .unwrap()
                .name(),
            "shell"
        );
        assert_eq!(
            select_toolchain("mock", ToolchainSpec::default())
                .unwrap()
                .name(),
            "mock"
        );
    }

    #[test]
    fn select_invalid_toolchain_fails() {
        assert!(matches!(
            select_toolchain("docker", ToolchainSpec::default()),
            Err(RuntimeError::ToolchainUnavailable(_))
        ));
    }

    #[test]
    fn archive_url_uses_repository_and_branch() {
        let spec = ToolchainSpec {
            repository: "someone/fork".to_owned(),
            branch: "dev".to_owned(),
            ..ToolchainSpec::default()
        };
        assert_eq!(
            spec.archive_url(),
            "https://codeload.github.com/someone/fork/tar.gz/dev"
        );
    }
}
