use super::{format_error, json_pretty, EXIT_SUCCESS};
use sonosweb_core::{Manager, StopOutcome, UninstallOutcome};

pub fn run(manager: &Manager, json: bool) -> Result<u8, String> {
    let outcome = manager.uninstall().map_err(|e| format_error(&e))?;
    if json {
        println!("{}", json_pretty(&outcome)?);
        return Ok(EXIT_SUCCESS);
    }
    match outcome {
        UninstallOutcome::Removed { install_dir, stop } => {
            if stop == StopOutcome::Stopped {
                println!("sonos-web stopped");
            }
            println!("removed {}", install_dir.display());
        }
        UninstallOutcome::NotInstalled => println!("sonos-web is not installed"),
    }
    Ok(EXIT_SUCCESS)
}
