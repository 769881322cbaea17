use super::{format_error, json_pretty, print_urls, SpinnerProgress, EXIT_SUCCESS};
use sonosweb_core::Manager;

pub fn run(manager: &Manager, json: bool) -> Result<u8, String> {
    let mut progress = SpinnerProgress::new(json);
    let report = manager
        .update(&mut progress)
        .map_err(|e| format_error(&e))?;
    if json {
        println!("{}", json_pretty(&report)?);
    } else {
        println!("updated sonos-web in {}", report.install_dir.display());
        print_urls(&report.start);
    }
    Ok(EXIT_SUCCESS)
}
