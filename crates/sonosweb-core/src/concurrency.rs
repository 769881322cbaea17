use crate::CoreError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Exclusive advisory lock held for the duration of a mutating lifecycle action.
///
/// Taken on the configuration directory's `lifecycle.lock` and on the
/// installation's sibling `<root>.lock`. Neither file is inside the directory
/// `uninstall` deletes. While held the file contains the holder's pid.
pub struct LifecycleLock {
    file: File,
}

impl LifecycleLock {
    /// Never waits: contention is reported as `LockHeld`.
    pub fn acquire(lock_path: &Path) -> Result<Self, CoreError> {
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(lock_path)?;

        if file.try_lock_exclusive().is_err() {
            return Err(CoreError::LockHeld(lock_path.to_path_buf()));
        }
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        debug!("acquired {}", lock_path.display());
        Ok(Self { file })
    }

    /// Whether the lock is currently free, without taking it for longer than the
    /// check or writing to the file. A missing file counts as free.
    pub fn is_free(lock_path: &Path) -> Result<bool, CoreError> {
        let file = match File::open(lock_path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e.into()),
        };
        if file.try_lock_exclusive().is_err() {
            return Ok(false);
        }
        let _ = file.unlock();
        Ok(true)
    }

    /// Pid written by the most recent holder, if any.
    pub fn holder(lock_path: &Path) -> Option<u32> {
        std::fs::read_to_string(lock_path).ok()?.trim().parse().ok()
    }
}

impl Drop for LifecycleLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// First Ctrl-C cancels the running external step; a second exits immediately.
pub fn install_signal_handler() {
    let _ = ctrlc::set_handler(|| {
        if SHUTDOWN_REQUESTED.swap(true, Ordering::SeqCst) {
            std::process::exit(1);
        }
        eprintln!("\ninterrupt received, stopping current step (press Ctrl-C again to abort)");
    });
}

pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}
