//! Child-process supervision with a bounded wall-clock budget.
//!
//! One child per run attempt. Two reader tasks drain stdout and stderr
//! while the supervisory loop polls liveness, so a chatty program cannot
//! deadlock on a full pipe. On timeout the child is asked to stop
//! (SIGTERM on Unix) and, after a grace window, killed.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crucible_core::{ExecutionOutcome, ExecutionStatus};

use crate::config::ExecutionConfig;

/// Bound on how long we wait for a reader task after the child is gone.
/// An orphaned grandchild can keep the pipe open indefinitely; partial
/// output is abandoned rather than blocking the pipeline on it.
const READER_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Supervises one child process per run attempt.
#[derive(Debug, Clone)]
pub struct ExecutionSupervisor {
    config: ExecutionConfig,
}

impl ExecutionSupervisor {
    pub fn new(config: ExecutionConfig) -> Self {
        Self { config }
    }

    /// Launch `argv` in `workdir` and supervise it to completion.
    ///
    /// Never returns an error: a process that cannot even start is a
    /// reportable [`ExecutionStatus::LaunchError`] outcome.
    pub async fn execute(
        &self,
        argv: &[String],
        workdir: &Path,
        env: &[(String, String)],
    ) -> ExecutionOutcome {
        let start = Instant::now();
        if argv.is_empty() {
            return launch_error("empty command".to_string(), start);
        }

        let mut command = Command::new(&argv[0]);
        command
            .args(&argv[1..])
            .current_dir(workdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in env {
            command.env(key, value);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return launch_error(format!("failed to launch {}: {e}", argv[0]), start);
            }
        };
        debug!(command = ?argv, pid = child.id(), "child spawned");

        // Close stdin right away: a program that reads input sees EOF
        // instead of hanging until the budget expires.
        drop(child.stdin.take());

        let stdout_buf = Arc::new(Mutex::new(Vec::new()));
        let stderr_buf = Arc::new(Mutex::new(Vec::new()));
        let stdout_task = drain(child.stdout.take(), stdout_buf.clone());
        let stderr_task = drain(child.stderr.take(), stderr_buf.clone());

        let timeout = Duration::from_millis(self.config.timeout_ms);
        let poll = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let mut timed_out = false;
        let mut exit_status: Option<ExitStatus> = None;

        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    exit_status = Some(status);
                    break;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "liveness poll failed");
                    break;
                }
            }
            if start.elapsed() >= timeout {
                timed_out = true;
                exit_status = self.terminate(&mut child).await;
                break;
            }
            tokio::time::sleep(poll).await;
        }

        let stdout = collect(stdout_task, &stdout_buf).await;
        let stderr = collect(stderr_task, &stderr_buf).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        if timed_out {
            return ExecutionOutcome {
                status: ExecutionStatus::Timeout,
                exit_code: exit_status.and_then(|s| s.code()),
                stdout,
                stderr,
                duration_ms,
            };
        }

        match exit_status {
            Some(status) if status.success() => ExecutionOutcome {
                status: ExecutionStatus::Success,
                exit_code: Some(0),
                stdout,
                stderr,
                duration_ms,
            },
            Some(status) => ExecutionOutcome {
                status: ExecutionStatus::RuntimeError,
                exit_code: status.code(),
                stdout,
                stderr,
                duration_ms,
            },
            None => ExecutionOutcome {
                status: ExecutionStatus::LaunchError,
                exit_code: None,
                stdout,
                stderr: "lost track of child process".to_string(),
                duration_ms,
            },
        }
    }

    /// Graceful stop, grace window, then forceful kill. Returns the exit
    /// status if the child was reaped.
    async fn terminate(&self, child: &mut Child) -> Option<ExitStatus> {
        debug!(pid = child.id(), "budget elapsed; requesting graceful stop");
        request_graceful_stop(child);

        let grace = Duration::from_millis(self.config.grace_ms);
        let poll = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let waited = Instant::now();
        while waited.elapsed() < grace {
            if let Ok(Some(status)) = child.try_wait() {
                return Some(status);
            }
            tokio::time::sleep(poll).await;
        }

        warn!(pid = child.id(), "grace window elapsed; killing child");
        if let Err(e) = child.kill().await {
            warn!(error = %e, "failed to kill child");
        }
        child.try_wait().ok().flatten()
    }
}

#[cfg(unix)]
fn request_graceful_stop(child: &mut Child) {
    if let Some(pid) = child.id() {
        // SAFETY: kill(2) with a pid we own; no memory is touched.
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
    }
}

#[cfg(not(unix))]
fn request_graceful_stop(child: &mut Child) {
    // No portable graceful signal; go straight to the kill request.
    let _ = child.start_kill();
}

/// Spawn a reader task that drains one pipe into the shared buffer. The
/// task is a pure consumer: it appends bytes and touches nothing else.
fn drain<R>(reader: Option<R>, buffer: Arc<Mutex<Vec<u8>>>) -> JoinHandle<()>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        if let Some(mut reader) = reader {
            let mut chunk = [0u8; 4096];
            loop {
                match reader.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        let mut buffer = buffer.lock().unwrap_or_else(|e| e.into_inner());
                        buffer.extend_from_slice(&chunk[..n]);
                    }
                }
            }
        }
    })
}

/// Wait briefly for the reader to finish, then take whatever it captured.
/// A reader pinned open by an orphaned grandchild is abandoned; the bytes
/// it already appended are still returned.
async fn collect(task: JoinHandle<()>, buffer: &Arc<Mutex<Vec<u8>>>) -> String {
    let _ = tokio::time::timeout(READER_JOIN_TIMEOUT, task).await;
    let bytes = buffer.lock().unwrap_or_else(|e| e.into_inner());
    String::from_utf8_lossy(&bytes).into_owned()
}

fn launch_error(message: String, start: Instant) -> ExecutionOutcome {
    ExecutionOutcome {
        status: ExecutionStatus::LaunchError,
        exit_code: None,
        stdout: String::new(),
        stderr: message,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}
