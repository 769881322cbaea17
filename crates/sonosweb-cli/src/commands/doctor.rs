use super::{json_pretty, EXIT_FAILURE, EXIT_SUCCESS};
use serde::Serialize;
use sonosweb_core::{read_port, LifecycleLock, Manager, Settings};
use sonosweb_store::{ConfigLayout, InstallLayout, InstallState};
use std::path::{Path, PathBuf};

pub fn run(
    config: &ConfigLayout,
    install_dir: Option<PathBuf>,
    timeout: Option<u64>,
    json_output: bool,
) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    let settings = match Settings::load(&config.settings_file()) {
        Ok(mut s) => {
            if let Some(secs) = timeout {
                s.step_timeout_secs = secs;
            }
            checks.push(Check::pass("settings", "Settings loaded"));
            s
        }
        Err(e) => {
            all_pass = false;
            checks.push(Check::fail("settings", &e.to_string()));
            Settings::default()
        }
    };
    checks.push(Check::info(
        "step_timeout",
        &match settings.step_timeout() {
            Some(t) => format!("External steps time out after {}s", t.as_secs()),
            None => "External steps never time out".to_owned(),
        },
    ));

    let mut install_lock = None;
    match Manager::new(config.clone(), settings, install_dir) {
        Ok(manager) => {
            check_prereqs(&manager, &mut checks, &mut all_pass);
            install_lock = check_installation(&manager, &mut checks, &mut all_pass);
        }
        Err(e) => {
            all_pass = false;
            checks.push(Check::fail("toolchain", &e.to_string()));
        }
    }

    check_lock(
        "lifecycle_lock",
        &config.lock_file(),
        &mut checks,
        &mut all_pass,
    );
    if let Some(path) = install_lock {
        check_lock("install_lock", &path, &mut checks, &mut all_pass);
    }

    print_results(&checks, all_pass, json_output)
}

/// Checks the lock without creating or rewriting its file.
fn check_lock(name: &'static str, path: &Path, checks: &mut Vec<Check>, all_pass: &mut bool) {
    match LifecycleLock::is_free(path) {
        Ok(true) => checks.push(Check::pass(
            name,
            &format!("Lock {} is free", path.display()),
        )),
        Ok(false) => checks.push(Check::warn(
            name,
            &match LifecycleLock::holder(path) {
                Some(pid) => format!("Lock {} is held by sonos-web process {pid}", path.display()),
                None => format!("Lock {} is held by another sonos-web command", path.display()),
            },
        )),
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail(
                name,
                &format!("Cannot check lock {}: {e}", path.display()),
            ));
        }
    }
}

fn check_prereqs(manager: &Manager, checks: &mut Vec<Check>, all_pass: &mut bool) {
    let toolchain = manager.toolchain();
    let missing = sonosweb_runtime::check_prereqs(&toolchain.required_tools());
    if missing.is_empty() {
        checks.push(Check::pass(
            "prerequisites",
            &format!("Tools for the '{}' toolchain are installed", toolchain.name()),
        ));
    } else {
        *all_pass = false;
        checks.push(Check::fail(
            "prerequisites",
            &format!(
                "Missing prerequisites: {}",
                sonosweb_runtime::format_missing(&missing)
            ),
        ));
    }
}

/// Returns the installation's lock file, checked after the configuration lock.
fn check_installation(
    manager: &Manager,
    checks: &mut Vec<Check>,
    all_pass: &mut bool,
) -> Option<PathBuf> {
    let status = manager.status();
    let layout = InstallLayout::new(&status.install_dir);
    let dir = status.install_dir.display();
    if status.state == InstallState::Absent {
        checks.push(Check::info(
            "installation",
            &format!("sonos-web is not installed (target {dir})"),
        ));
        return None;
    }
    checks.push(Check::pass(
        "installation",
        &format!("sonos-web is installed at {dir} ({})", status.state),
    ));

    match read_port(&layout.env_file()) {
        Ok(port) => checks.push(Check::pass("port", &format!("PORT={port} in .env"))),
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail("port", &e.to_string()));
        }
    }

    match (status.pid, status.process_alive) {
        (Some(pid), Some(false)) => checks.push(Check::warn(
            "pid_file",
            &format!("pid file names process {pid}, which is gone (`sonos-web stop` clears it)"),
        )),
        (Some(pid), _) => checks.push(Check::pass(
            "pid_file",
            &format!("Server process {pid} is alive"),
        )),
        (None, _) if status.state == InstallState::Running => checks.push(Check::warn(
            "pid_file",
            "pid file exists but does not contain a pid",
        )),
        (None, _) => {}
    }
    Some(layout.lock_file())
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let payload = serde_json::json!({
            "healthy": all_pass,
            "checks": checks,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("sonos-web doctor\n");
        for check in checks {
            let icon = match check.status {
                "pass" => "✓",
                "fail" => "✗",
                "warn" => "⚠",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

#[derive(Serialize)]
struct Check {
    name: &'static str,
    status: &'static str,
    message: String,
}

impl Check {
    fn new(name: &'static str, status: &'static str, message: &str) -> Self {
        Self {
            name,
            status,
            message: message.to_owned(),
        }
    }

    fn pass(name: &'static str, message: &str) -> Self {
        Self::new(name, "pass", message)
    }

    fn fail(name: &'static str, message: &str) -> Self {
        Self::new(name, "fail", message)
    }

    fn warn(name: &'static str, message: &str) -> Self {
        Self::new(name, "warn", message)
    }

    fn info(name: &'static str, message: &str) -> Self {
        Self::new(name, "info", message)
    }
}
