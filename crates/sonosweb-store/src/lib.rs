//! On-disk layout and state for a sonos-web installation.
//!
//! This crate resolves every path the installer touches (`InstallLayout` for the
//! installation directory, `ConfigLayout` for the installer's own configuration
//! directory), persists the `InstallRecord` that points at an installation, and
//! answers the marker-file questions "is it installed?" and "is it running?".

pub mod layout;
pub mod record;
pub mod state;

pub use layout::{anchor, default_install_dir, expand_tilde, ConfigLayout, InstallLayout};
pub use record::InstallRecord;
pub use state::{current_state, is_installed, is_running, read_pid, InstallState};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fsync a directory so that a preceding `rename()` into it is durable.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sonos-web is not installed (no install record at {0})")]
    NotInstalled(PathBuf),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
