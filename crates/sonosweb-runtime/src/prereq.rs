use std::fmt;
use std::process::Command;

/// A binary a toolchain depends on, with actionable install instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prerequisite {
    pub name: String,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl Prerequisite {
    pub fn new(name: &str, purpose: &'static str, install_hint: &'static str) -> Self {
        Self {
            name: name.to_owned(),
            purpose,
            install_hint,
        }
    }
}

impl fmt::Display for Prerequisite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn command_exists(name: &str) -> bool {
    Command::new("sh")
        .args(["-c", "command -v \"$1\"", "sh", name])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Returns the prerequisites that are not on `PATH`. Empty means all present.
pub fn check_prereqs(required: &[Prerequisite]) -> Vec<Prerequisite> {
    required
        .iter()
        .filter(|p| !command_exists(&p.name))
        .cloned()
        .collect()
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[Prerequisite]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\nsonos-web needs these tools to download, build and run the application.");
    msg
}
