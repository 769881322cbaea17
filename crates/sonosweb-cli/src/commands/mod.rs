pub mod completions;
pub mod doctor;
pub mod install;
pub mod man_pages;
pub mod start;
pub mod status;
pub mod stop;
pub mod uninstall;
pub mod update;

use indicatif::{ProgressBar, ProgressStyle};
use sonosweb_core::{CoreError, InstallStep, Progress, StartReport};
use sonosweb_store::InstallState;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_state(state: InstallState) -> String {
    use console::Style;
    let text = state.to_string();
    match state {
        InstallState::Running => Style::new().green().bold().apply_to(text).to_string(),
        InstallState::Stopped => Style::new().yellow().apply_to(text).to_string(),
        InstallState::Absent => Style::new().dim().apply_to(text).to_string(),
    }
}

/// `<message>` plus a `hint:` line when the error carries one.
pub fn format_error(error: &CoreError) -> String {
    match error.hint() {
        Some(hint) => format!("{error}\nhint: {hint}"),
        None => error.to_string(),
    }
}

pub fn print_urls(report: &StartReport) {
    println!("sonos-web is running");
    println!("  local:   {}", report.local_url);
    println!("  network: {}", report.network_url);
}

/// One spinner per install step; silent in JSON mode.
pub struct SpinnerProgress {
    enabled: bool,
    current: Option<ProgressBar>,
}

impl SpinnerProgress {
    pub fn new(json: bool) -> Self {
        Self {
            enabled: !json,
            current: None,
        }
    }
}

impl Progress for SpinnerProgress {
    fn step_started(&mut self, step: InstallStep) {
        if self.enabled {
            self.current = Some(spinner(step.description()));
        }
    }

    fn step_succeeded(&mut self, step: InstallStep) {
        if let Some(pb) = self.current.take() {
            spin_ok(&pb, step.done_message());
        }
    }

    fn step_failed(&mut self, step: InstallStep, _error: &CoreError) {
        if let Some(pb) = self.current.take() {
            spin_fail(&pb, step.failure_message());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn json_pretty_serializes_string() {
        let val = serde_json::json!({"key": "value"});
        let result = json_pretty(&val).unwrap();
        assert!(result.contains("\"key\""));
        assert!(result.contains("\"value\""));
    }

    #[test]
    fn colorize_state_keeps_text() {
        for state in [
            InstallState::Absent,
            InstallState::Stopped,
            InstallState::Running,
        ] {
            assert!(colorize_state(state).contains(&state.to_string()));
        }
    }

    #[test]
    fn format_error_appends_hint() {
        let msg = format_error(&CoreError::NotInstalled(PathBuf::from("/srv/sonos-web")));
        assert!(msg.starts_with("sonos-web is not installed"));
        assert!(msg.contains("\nhint: run `sonos-web install` first"));
    }

    #[test]
    fn format_error_without_hint_is_single_line() {
        let msg = format_error(&CoreError::Interrupted);
        assert_eq!(msg, "operation interrupted");
    }

    #[test]
    fn exit_codes_are_distinct() {
        assert_ne!(EXIT_SUCCESS, EXIT_FAILURE);
    }

    #[test]
    fn spinner_progress_tracks_steps() {
        let mut progress = SpinnerProgress::new(false);
        progress.step_started(InstallStep::CreateDir);
        assert!(progress.current.is_some());
        progress.step_succeeded(InstallStep::CreateDir);
        assert!(progress.current.is_none());

        progress.step_started(InstallStep::FetchSource);
        progress.step_failed(InstallStep::FetchSource, &CoreError::Interrupted);
        assert!(progress.current.is_none());
    }

    #[test]
    fn spinner_progress_silent_in_json_mode() {
        let mut progress = SpinnerProgress::new(true);
        progress.step_started(InstallStep::CreateDir);
        assert!(progress.current.is_none());
    }
}
