use crate::RuntimeError;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs shell commands to completion, one at a time.
///
/// stdout and stderr are captured in anonymous temp files, never pipes. The
/// child leads its own process group; a timeout or cancellation kills the whole
/// group, not just `sh`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
    cancel: Option<fn() -> bool>,
}

enum Outcome {
    Exited(ExitStatus),
    TimedOut(Duration),
    Interrupted,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` waits forever.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Polled while waiting; returning `true` kills the child.
    #[must_use]
    pub fn with_cancel(mut self, cancel: fn() -> bool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run `sh -c command` and return its stdout on exit status zero.
    ///
    /// When `log` is given the invocation, its captured stdout and stderr, and the
    /// way it ended are appended to that file whatever the outcome.
    pub fn run(
        &self,
        command: &str,
        cwd: Option<&Path>,
        log: Option<&Path>,
    ) -> Result<String, RuntimeError> {
        debug!("running `{command}`");
        let mut stdout_sink = tempfile::tempfile()?;
        let mut stderr_sink = tempfile::tempfile()?;

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_sink.try_clone()?))
            .stderr(Stdio::from(stderr_sink.try_clone()?))
            .process_group(0);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| RuntimeError::Spawn {
            command: command.to_owned(),
            source,
        })?;
        let outcome = self.wait(&mut child)?;

        let stdout = read_captured(&mut stdout_sink)?;
        let stderr = read_captured(&mut stderr_sink)?;
        if let Some(log) = log {
            if let Err(e) = append_invocation(log, command, &stdout, &stderr, &outcome) {
                warn!("could not write {}: {e}", log.display());
            }
        }

        match outcome {
            Outcome::Exited(status) if status.success() => Ok(stdout),
            Outcome::Exited(status) => Err(RuntimeError::CommandFailed {
                command: command.to_owned(),
                status: describe_status(status),
                code: status.code(),
            }),
            Outcome::TimedOut(after) => Err(RuntimeError::TimedOut {
                command: command.to_owned(),
                after,
            }),
            Outcome::Interrupted => Err(RuntimeError::Interrupted {
                command: command.to_owned(),
            }),
        }
    }

    fn wait(&self, child: &mut Child) -> Result<Outcome, RuntimeError> {
        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Outcome::Exited(status));
            }
            if self.cancel.is_some_and(|cancelled| cancelled()) {
                debug!("cancellation requested, killing pid {}", child.id());
                terminate(child);
                return Ok(Outcome::Interrupted);
            }
            if let Some(limit) = self.timeout {
                if started.elapsed() >= limit {
                    warn!(
                        "command exceeded {}s, killing pid {}",
                        limit.as_secs(),
                        child.id()
                    );
                    terminate(child);
                    return Ok(Outcome::TimedOut(limit));
                }
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

fn terminate(child: &mut Child) {
    crate::liveness::kill_process_group(child.id());
    let _ = child.kill();
    let _ = child.wait();
}

fn read_captured(file: &mut File) -> Result<String, RuntimeError> {
    file.seek(SeekFrom::Start(0))?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn describe_status(status: ExitStatus) -> String {
    if let Some(code) = status.code() {
        format!("exit code {code}")
    } else if let Some(sig) = status.signal() {
        format!("signal {sig}")
    } else {
        "unknown status".to_owned()
    }
}

fn append_invocation(
    log: &Path,
    command: &str,
    stdout: &str,
    stderr: &str,
    outcome: &Outcome,
) -> Result<(), RuntimeError> {
    let mut entry = format!("[{}] $ {command}\n", chrono::Utc::now().to_rfc3339());
    push_block(&mut entry, stdout);
    push_block(&mut entry, stderr);
    let footer = match outcome {
        Outcome::Exited(status) => describe_status(*status),
        Outcome::TimedOut(after) => format!("timed out after {}s", after.as_secs()),
        Outcome::Interrupted => "interrupted".to_owned(),
    };
    entry.push_str(&format!("[{footer}]\n"));
    append_log(log, &entry)
}

fn push_block(entry: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    entry.push_str(text);
    if !text.ends_with('\n') {
        entry.push('\n');
    }
}

/// Append free-form text to a log file, creating it if needed.
pub fn append_log(path: &Path, text: &str) -> Result<(), RuntimeError> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(text.as_bytes())?;
    Ok(())
}

pub fn truncate_log(path: &Path) -> Result<(), RuntimeError> {
    File::create(path)?;
    Ok(())
}

/// Single-quote a value for `sh`.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
