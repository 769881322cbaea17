mod commands;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_FAILURE, EXIT_SUCCESS};
use sonosweb_core::{install_signal_handler, Manager, Settings};
use sonosweb_runtime::Prerequisite;
use sonosweb_store::{anchor, expand_tilde, ConfigLayout};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

#[derive(Debug, Parser)]
#[command(
    name = "sonos-web",
    version,
    about = "Install, run and update a local sonos-web server"
)]
struct Cli {
    /// Installation directory (overrides the install record and config.toml).
    #[arg(long, global = true)]
    install_dir: Option<String>,

    /// Directory holding config.toml, the install record and the lifecycle lock.
    /// The installation itself is also locked through `<install-dir>.lock`.
    #[arg(long, global = true, default_value = "~/.config/sonos-web")]
    config_dir: String,

    /// Timeout in seconds for each external command (0 disables).
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download, build and start sonos-web.
    Install,
    /// Reinstall the latest sonos-web in place (uninstall, then install).
    Update,
    /// Start the installed server in the background.
    Start,
    /// Stop the background server.
    Stop,
    /// Stop the server and delete the installation.
    Uninstall,
    /// Show installation state, port and process.
    Status,
    /// Run diagnostic checks on the host and the installation.
    Doctor,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp
                | ErrorKind::DisplayVersion
                | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => EXIT_SUCCESS,
                _ => EXIT_FAILURE,
            };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    let Some(command) = cli.command else {
        let _ = Cli::command().print_help();
        return ExitCode::from(EXIT_SUCCESS);
    };

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("SONOS_WEB_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    install_signal_handler();

    let json_output = cli.json;
    let config = ConfigLayout::new(expand_tilde(&cli.config_dir));
    let install_dir = cli
        .install_dir
        .as_deref()
        .map(|dir| anchor(expand_tilde(dir)));
    debug!(
        "config dir {}, install dir override {:?}",
        config.dir().display(),
        install_dir
    );

    let timeout = cli.timeout;
    let with_manager = |prereqs: Prereqs, action: fn(&Manager, bool) -> Result<u8, String>| {
        let manager = load_manager(config.clone(), install_dir.clone(), timeout)?;
        check_toolchain_prereqs(&manager, prereqs)?;
        action(&manager, json_output)
    };

    let result = match command {
        Commands::Install => with_manager(Prereqs::Install, commands::install::run),
        Commands::Update => with_manager(Prereqs::Install, commands::update::run),
        Commands::Start => with_manager(Prereqs::Start, commands::start::run),
        Commands::Stop => with_manager(Prereqs::None, commands::stop::run),
        Commands::Uninstall => with_manager(Prereqs::None, commands::uninstall::run),
        Commands::Status => with_manager(Prereqs::None, commands::status::run),
        Commands::Doctor => {
            commands::doctor::run(&config, install_dir.clone(), timeout, json_output)
        }
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn load_manager(
    config: ConfigLayout,
    install_dir: Option<PathBuf>,
    timeout: Option<u64>,
) -> Result<Manager, String> {
    let mut settings =
        Settings::load(&config.settings_file()).map_err(|e| commands::format_error(&e))?;
    if let Some(secs) = timeout {
        settings.step_timeout_secs = secs;
    }
    Manager::new(config, settings, install_dir).map_err(|e| commands::format_error(&e))
}

/// Which host tools an action needs before it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prereqs {
    None,
    Install,
    Start,
}

fn check_toolchain_prereqs(manager: &Manager, prereqs: Prereqs) -> Result<(), String> {
    if std::env::var("SONOS_WEB_SKIP_PREREQS").as_deref() == Ok("1") {
        return Ok(());
    }
    let tools: Vec<Prerequisite> = match prereqs {
        Prereqs::None => return Ok(()),
        Prereqs::Install => manager.toolchain().required_tools(),
        Prereqs::Start => manager.toolchain().start_tools(),
    };
    debug!("checking {} prerequisites", tools.len());
    let missing = sonosweb_runtime::check_prereqs(&tools);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(sonosweb_runtime::format_missing(&missing))
    }
}
