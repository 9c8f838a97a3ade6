//! Command runner

use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::WatchError;
use crate::process::command::CommandSpec;

/// Result of one external process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed or timed out
    pub exit_code: Option<i32>,

    /// Standard output followed by standard error
    pub output: String,

    /// The process exceeded its time budget and was killed
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Human readable reason for a failed invocation
    pub fn failure_reason(&self) -> String {
        if self.timed_out {
            "timed out".to_string()
        } else {
            match self.exit_code {
                Some(code) => format!("exited with code {}", code),
                None => "terminated by signal".to_string(),
            }
        }
    }
}

/// Runs external commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` in `dir` and capture its output.
    ///
    /// A non-zero exit is reported through [`CommandOutput`], not as an
    /// error. `Err` means the process could not be run at all.
    async fn run(&self, dir: &Path, command: &CommandSpec) -> Result<CommandOutput, WatchError>;
}

/// Runs commands as child processes with a bounded timeout
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, dir: &Path, command: &CommandSpec) -> Result<CommandOutput, WatchError> {
        debug!(dir = %dir.display(), command = %command.program, "Running command");

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so a timeout can take down everything the
        // command started.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| {
            WatchError::CommandError(format!(
                "Failed to run {} in {}: {}",
                command.program,
                dir.display(),
                e
            ))
        })?;

        let stdout = Capture::start(child.stdout.take());
        let stderr = Capture::start(child.stderr.take());

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(e)) => {
                return Err(WatchError::CommandError(format!(
                    "Failed to wait for {}: {}",
                    command.program, e
                )))
            }
            Err(_) => {
                warn!(
                    command = %command.program,
                    timeout = ?self.timeout,
                    "Command timed out and was killed"
                );
                kill_tree(&mut child).await;
                None
            }
        };

        let mut combined = stdout.finish().await;
        combined.push_str(&stderr.finish().await);
        debug!(status = ?status, len = combined.len(), "Command finished");

        Ok(CommandOutput {
            exit_code: status.and_then(|status| status.code()),
            output: combined,
            timed_out: status.is_none(),
        })
    }
}

/// How long to keep draining a pipe after the process is gone. A background
/// process that inherited the pipe would otherwise hold it open forever.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Collects one output stream as it is produced, so whatever was written
/// before a timeout is still available.
struct Capture {
    buffer: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

impl Capture {
    fn start<R>(reader: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);

        let task = tokio::spawn(async move {
            let Some(mut reader) = reader else {
                return;
            };
            let mut chunk = [0u8; 8192];
            loop {
                match reader.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if let Ok(mut buffer) = sink.lock() {
                            buffer.extend_from_slice(&chunk[..n]);
                        }
                    }
                }
            }
        });

        Self { buffer, task }
    }

    async fn finish(mut self) -> String {
        if tokio::time::timeout(DRAIN_GRACE, &mut self.task).await.is_err() {
            self.task.abort();
        }
        let bytes = self
            .buffer
            .lock()
            .map(|buffer| buffer.clone())
            .unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// Kill the child and, on unix, every process in its group
async fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
                debug!(pid, "Failed to kill process group: {}", e);
            }
        }
    }

    if let Err(e) = child.kill().await {
        debug!("Failed to kill command: {}", e);
    }
}
