use super::{colorize_state, json_pretty, EXIT_SUCCESS};
use sonosweb_core::Manager;
use sonosweb_store::InstallState;

pub fn run(manager: &Manager, json: bool) -> Result<u8, String> {
    let report = manager.status();
    if json {
        println!("{}", json_pretty(&report)?);
        return Ok(EXIT_SUCCESS);
    }

    println!("state:       {}", colorize_state(report.state));
    println!("install dir: {}", report.install_dir.display());
    if report.state == InstallState::Absent {
        return Ok(EXIT_SUCCESS);
    }
    match report.port {
        Some(port) => println!("port:        {port} (http://localhost:{port})"),
        None => println!("port:        not configured"),
    }
    match (report.pid, report.process_alive) {
        (Some(pid), Some(true)) => println!("pid:         {pid}"),
        (Some(pid), _) => println!("pid:         {pid} (no such process; stale pid file)"),
        (None, _) if report.state == InstallState::Running => {
            println!("pid:         unreadable pid file");
        }
        (None, _) => {}
    }
    Ok(EXIT_SUCCESS)
}
