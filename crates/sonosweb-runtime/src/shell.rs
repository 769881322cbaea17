use crate::backend::{ToolContext, Toolchain, ToolchainSpec};
use crate::prereq::Prerequisite;
use crate::process::shell_quote;
use crate::RuntimeError;
use std::path::Path;
use tracing::info;

const ARCHIVE_NAME: &str = "source.tar.gz";

/// Drives the real tools: `curl` + `tar` for the source, `npm` for packages and
/// `forever` (or whatever `supervisor` names) for the background process.
///
/// `npm` and `supervisor` are command prefixes spliced in unquoted, so values
/// like `npx forever` work.
pub struct ShellToolchain {
    spec: ToolchainSpec,
}

impl ShellToolchain {
    pub fn new(spec: ToolchainSpec) -> Self {
        Self { spec }
    }
}

fn quoted(path: &Path) -> String {
    shell_quote(&path.to_string_lossy())
}

/// First word of a command prefix, i.e. the binary that must exist.
fn program_name(prefix: &str) -> &str {
    prefix.split_whitespace().next().unwrap_or(prefix)
}

impl Toolchain for ShellToolchain {
    fn name(&self) -> &'static str {
        "shell"
    }

    fn required_tools(&self) -> Vec<Prerequisite> {
        let mut tools = vec![
            Prerequisite::new(
                "curl",
                "downloading the source archive",
                "apt install curl | dnf install curl | pacman -S curl",
            ),
            Prerequisite::new(
                "tar",
                "unpacking the source archive",
                "apt install tar | dnf install tar | pacman -S tar",
            ),
            Prerequisite::new(
                program_name(&self.spec.npm),
                "installing dependencies and building the client",
                "ships with nodejs; apt install npm",
            ),
        ];
        tools.extend(self.start_tools());
        tools
    }

    fn start_tools(&self) -> Vec<Prerequisite> {
        vec![
            Prerequisite::new(
                "node",
                "running the server",
                "https://nodejs.org or your distribution's nodejs package",
            ),
            Prerequisite::new(
                program_name(&self.spec.supervisor),
                "running the server in the background",
                "npm install -g forever",
            ),
        ]
    }

    fn fetch_source(&self, ctx: &ToolContext<'_>) -> Result<(), RuntimeError> {
        let root = ctx.layout.root();
        let archive = root.join(ARCHIVE_NAME);
        let url = self.spec.archive_url();
        info!("downloading {url}");

        ctx.run(
            &format!(
                "curl -fsSL -o {} {}",
                quoted(&archive),
                shell_quote(&url)
            ),
            Some(root),
        )?;
        ctx.run(
            &format!(
                "tar -xzf {} --strip-components=1 -C {}",
                quoted(&archive),
                quoted(root)
            ),
            Some(root),
        )?;
        std::fs::remove_file(&archive)?;
        Ok(())
    }

    fn build_client(&self, ctx: &ToolContext<'_>) -> Result<(), RuntimeError> {
        let client = ctx.layout.client_dir();
        let npm = &self.spec.npm;
        ctx.run(&format!("{npm} install"), Some(&client))?;
        ctx.run(&format!("{npm} run build"), Some(&client))?;
        Ok(())
    }

    fn install_server(&self, ctx: &ToolContext<'_>) -> Result<(), RuntimeError> {
        let server = ctx.layout.server_dir();
        let npm = &self.spec.npm;
        ctx.run(&format!("{npm} install --production"), Some(&server))?;
        Ok(())
    }

    fn start(&self, ctx: &ToolContext<'_>) -> Result<(), RuntimeError> {
        let layout = ctx.layout;
        ctx.run(
            &format!(
                "{} start -a -l {} -o {} -e {} --pidFile {} --workingDir {} {}",
                self.spec.supervisor,
                quoted(&layout.supervisor_log()),
                quoted(&layout.app_log()),
                quoted(&layout.app_log()),
                quoted(&layout.pid_file()),
                quoted(layout.root()),
                quoted(&layout.server_entry()),
            ),
            Some(layout.root()),
        )?;
        Ok(())
    }

    fn stop(&self, ctx: &ToolContext<'_>) -> Result<(), RuntimeError> {
        let layout = ctx.layout;
        ctx.run(
            &format!(
                "{} stop {}",
                self.spec.supervisor,
                quoted(&layout.server_entry())
            ),
            Some(layout.root()),
        )
        .map_err(|e| RuntimeError::Supervisor(e.to_string()))?;
        Ok(())
    }
}
