use super::{format_error, json_pretty, EXIT_SUCCESS};
use sonosweb_core::{Manager, StopOutcome};

pub fn run(manager: &Manager, json: bool) -> Result<u8, String> {
    let outcome = manager.stop().map_err(|e| format_error(&e))?;
    if json {
        println!("{}", json_pretty(&outcome)?);
        return Ok(EXIT_SUCCESS);
    }
    match outcome {
        StopOutcome::Stopped => println!("sonos-web stopped"),
        StopOutcome::NotRunning => println!("sonos-web is not running"),
        StopOutcome::SupervisorNotRunning {
            reason,
            cleared_stale_marker,
        } => {
            println!("sonos-web does not appear to be running ({reason})");
            if cleared_stale_marker {
                println!("removed stale pid file");
            }
        }
    }
    Ok(EXIT_SUCCESS)
}
