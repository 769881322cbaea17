use super::{format_error, json_pretty, print_urls, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use sonosweb_core::Manager;

pub fn run(manager: &Manager, json: bool) -> Result<u8, String> {
    let pb = if json {
        None
    } else {
        Some(spinner("starting sonos-web..."))
    };

    let report = match manager.start() {
        Ok(r) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, "sonos-web started");
            }
            r
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "could not start sonos-web");
            }
            return Err(format_error(&e));
        }
    };

    if json {
        println!("{}", json_pretty(&report)?);
    } else {
        print_urls(&report);
    }
    Ok(EXIT_SUCCESS)
}
