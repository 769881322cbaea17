use tracing::debug;

/// Whether a process with this pid currently exists.
///
/// `EPERM` means the process exists but belongs to someone else, which still
/// counts as alive.
pub fn process_alive(pid: u32) -> bool {
    let Ok(pid_i32) = i32::try_from(pid) else {
        return false;
    };
    if pid_i32 <= 0 {
        return false;
    }
    // SAFETY: signal 0 only performs the existence and permission checks; nothing is delivered.
    #[allow(unsafe_code)]
    let ret = unsafe { libc::kill(pid_i32, 0) };
    if ret == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// SIGKILL every process in the group led by `pgid`.
pub(crate) fn kill_process_group(pgid: u32) {
    let Ok(pgid_i32) = i32::try_from(pgid) else {
        return;
    };
    if pgid_i32 <= 1 {
        return;
    }
    // SAFETY: a negative pid addresses the process group; pgid validated above.
    #[allow(unsafe_code)]
    let ret = unsafe { libc::kill(-pgid_i32, libc::SIGKILL) };
    if ret != 0 {
        debug!(
            "killing process group {pgid} failed: {}",
            std::io::Error::last_os_error()
        );
    }
}
