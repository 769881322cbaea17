//! Execution layer for the sonos-web installer.
//!
//! Everything that leaves the process lives here: the synchronous `ProcessRunner`
//! with its append-only install log, the pluggable `Toolchain` trait wrapping the
//! source fetch tool, package installer and process supervisor (a `shell` backend
//! for the real tools and a `mock` backend for tests), prerequisite checks, the pid
//! liveness probe, and LAN address discovery.

pub mod backend;
pub mod liveness;
pub mod mock;
pub mod net;
pub mod prereq;
pub mod process;
pub mod shell;

pub use backend::{select_toolchain, ToolContext, Toolchain, ToolchainSpec};
pub use liveness::process_alive;
pub use net::primary_ipv4;
pub use prereq::{check_prereqs, format_missing, Prerequisite};
pub use process::{append_log, shell_quote, truncate_log, ProcessRunner};

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` failed with {status}")]
    CommandFailed {
        command: String,
        status: String,
        code: Option<i32>,
    },
    #[error("external step timed out after {}s: `{command}`", .after.as_secs())]
    TimedOut { command: String, after: Duration },
    #[error("`{command}` was interrupted")]
    Interrupted { command: String },
    #[error("toolchain '{0}' is not available")]
    ToolchainUnavailable(String),
    #[error("supervisor error: {0}")]
    Supervisor(String),
}
