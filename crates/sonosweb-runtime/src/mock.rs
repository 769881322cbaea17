use crate::backend::{ToolContext, Toolchain};
use crate::prereq::Prerequisite;
use crate::process::shell_quote;
use crate::RuntimeError;
use std::fs;

/// Port written into the mock `.env.example`.
pub const MOCK_PORT: u16 = 5050;

/// Names a stage for the mock to fail at, e.g. `SONOS_WEB_MOCK_FAIL=build-client`.
pub const MOCK_FAIL_ENV: &str = "SONOS_WEB_MOCK_FAIL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockStage {
    FetchSource,
    BuildClient,
    InstallServer,
    Start,
    Stop,
}

impl MockStage {
    pub fn as_str(self) -> &'static str {
        match self {
            MockStage::FetchSource => "fetch-source",
            MockStage::BuildClient => "build-client",
            MockStage::InstallServer => "install-server",
            MockStage::Start => "start",
            MockStage::Stop => "stop",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fetch-source" => Some(MockStage::FetchSource),
            "build-client" => Some(MockStage::BuildClient),
            "install-server" => Some(MockStage::InstallServer),
            "start" => Some(MockStage::Start),
            "stop" => Some(MockStage::Stop),
            _ => None,
        }
    }
}

/// Fabricates the sonos-web source tree and supervisor behaviour on disk so the
/// whole lifecycle can run without network, node or forever.
///
/// Every stage still goes through the process runner (an `echo`), so install log
/// behaviour is exercised for real. A stage chosen with [`failing_at`](Self::failing_at)
/// prints to both stdout and stderr and exits nonzero.
#[derive(Debug, Clone)]
pub struct MockToolchain {
    fail_at: Option<MockStage>,
    env_template: String,
}

impl Default for MockToolchain {
    fn default() -> Self {
        Self {
            fail_at: None,
            env_template: format!("PORT={MOCK_PORT}\nNODE_ENV=production\n"),
        }
    }
}

impl MockToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let mut mock = Self::default();
        if let Ok(stage) = std::env::var(MOCK_FAIL_ENV) {
            mock.fail_at = MockStage::parse(&stage);
        }
        mock
    }

    #[must_use]
    pub fn failing_at(mut self, stage: MockStage) -> Self {
        self.fail_at = Some(stage);
        self
    }

    /// Contents of the `.env.example` shipped with the fake source tree.
    #[must_use]
    pub fn with_env_template(mut self, template: &str) -> Self {
        template.clone_into(&mut self.env_template);
        self
    }

    fn announce(
        &self,
        ctx: &ToolContext<'_>,
        stage: MockStage,
        what: &str,
    ) -> Result<(), RuntimeError> {
        let name = stage.as_str();
        if self.fail_at == Some(stage) {
            ctx.run(
                &format!(
                    "echo {}; echo {} >&2; exit 1",
                    shell_quote(&format!("mock {name}: stdout before failure")),
                    shell_quote(&format!("mock {name}: stderr before failure")),
                ),
                None,
            )?;
        }
        ctx.run(&format!("echo {}", shell_quote(&format!("mock: {what}"))), None)?;
        Ok(())
    }
}

impl Toolchain for MockToolchain {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn required_tools(&self) -> Vec<Prerequisite> {
        vec![Prerequisite::new(
            "sh",
            "running mock steps",
            "part of the base system",
        )]
    }

    fn fetch_source(&self, ctx: &ToolContext<'_>) -> Result<(), RuntimeError> {
        self.announce(ctx, MockStage::FetchSource, "fetching source")?;
        let root = ctx.layout.root();
        let client = ctx.layout.client_dir();
        let server = ctx.layout.server_dir();
        fs::create_dir_all(client.join("src"))?;
        fs::create_dir_all(&server)?;

        fs::write(root.join(".gitignore"), "node_modules\ndist\n.env\n")?;
        fs::write(root.join("package.json"), "{\"name\":\"sonos-web\"}\n")?;
        fs::write(root.join("README.md"), "# sonos-web\n")?;
        fs::write(client.join("package.json"), "{\"name\":\"sonos-web-client\"}\n")?;
        fs::write(client.join("src/main.js"), "// client entry\n")?;
        fs::write(server.join("package.json"), "{\"name\":\"sonos-web-server\"}\n")?;
        fs::write(server.join("server.js"), "// server entry\n")?;
        fs::write(server.join(".env.example"), &self.env_template)?;
        Ok(())
    }

    fn build_client(&self, ctx: &ToolContext<'_>) -> Result<(), RuntimeError> {
        self.announce(ctx, MockStage::BuildClient, "building client")?;
        let client = ctx.layout.client_dir();
        fs::create_dir_all(client.join("node_modules"))?;
        fs::create_dir_all(ctx.layout.client_dist_dir())?;
        fs::write(
            ctx.layout.client_dist_dir().join("index.html"),
            "<!doctype html><title>sonos-web</title>\n",
        )?;
        Ok(())
    }

    fn install_server(&self, ctx: &ToolContext<'_>) -> Result<(), RuntimeError> {
        self.announce(ctx, MockStage::InstallServer, "installing server dependencies")?;
        let modules = ctx.layout.server_dir().join("node_modules");
        fs::create_dir_all(&modules)?;
        fs::write(modules.join(".mock"), "")?;
        Ok(())
    }

    fn start(&self, ctx: &ToolContext<'_>) -> Result<(), RuntimeError> {
        self.announce(ctx, MockStage::Start, "starting server")?;
        let layout = ctx.layout;
        if !layout.server_entry().is_file() {
            return Err(RuntimeError::Supervisor(format!(
                "{} does not exist",
                layout.server_entry().display()
            )));
        }
        fs::write(layout.pid_file(), format!("{}\n", std::process::id()))?;
        crate::process::append_log(&layout.app_log(), "mock server listening\n")?;
        Ok(())
    }

    fn stop(&self, ctx: &ToolContext<'_>) -> Result<(), RuntimeError> {
        self.announce(ctx, MockStage::Stop, "stopping server")?;
        let pid_file = ctx.layout.pid_file();
        if !pid_file.exists() {
            return Err(RuntimeError::Supervisor(
                "no running process found for server.js".to_owned(),
            ));
        }
        fs::remove_file(pid_file)?;
        Ok(())
    }
}
