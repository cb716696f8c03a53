// Engine process supervision
// Spawns one engine process, streams its output lines and handles cancellation

use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use sysinfo::{Pid, Signal, System};
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::models::{RunExit, RunResult};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Slack for filesystems with coarse modification times
const MTIME_SLACK: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub text: String,
}

struct RunOutcome {
    exit: RunExit,
    stdout_lines: Vec<String>,
    stderr_lines: Vec<String>,
}

/// Handle to one running engine process.
/// Lines arrive in order within each stream; the two streams interleave by arrival.
pub struct RunHandle {
    pid: Option<u32>,
    started_at: SystemTime,
    lines: mpsc::UnboundedReceiver<OutputLine>,
    cancel: CancellationToken,
    outcome: oneshot::Receiver<RunOutcome>,
}

impl RunHandle {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Next output line; `None` once both streams are closed
    pub async fn next_line(&mut self) -> Option<OutputLine> {
        self.lines.recv().await
    }

    /// Graceful stop first, forced kill after the grace period
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Waits for the process to end and scans for the expected output files
    pub async fn wait(self, expected_outputs: &[PathBuf]) -> RunResult {
        let outcome = self.outcome.await.unwrap_or_else(|_| RunOutcome {
            exit: RunExit::Unknown,
            stdout_lines: Vec::new(),
            stderr_lines: Vec::new(),
        });

        RunResult {
            exit: outcome.exit,
            stdout_lines: outcome.stdout_lines,
            stderr_lines: outcome.stderr_lines,
            produced_files: produced_files(expected_outputs, self.started_at),
        }
    }
}

/// Expected outputs that exist and were written during this run
pub fn produced_files(expected: &[PathBuf], since: SystemTime) -> Vec<PathBuf> {
    let threshold = since.checked_sub(MTIME_SLACK).unwrap_or(since);
    expected
        .iter()
        .filter(|path| {
            std::fs::metadata(path)
                .ok()
                .filter(|meta| meta.is_file())
                .and_then(|meta| meta.modified().ok())
                .map_or(false, |modified| modified >= threshold)
        })
        .cloned()
        .collect()
}

/// Starts the engine. Must be called from within a tokio runtime.
pub fn start(
    executable: &Path,
    args: &[String],
    cwd: Option<&Path>,
    grace: Duration,
    cancel: CancellationToken,
) -> std::io::Result<RunHandle> {
    let mut cmd = Command::new(executable);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);

    let started_at = SystemTime::now();
    let mut child = cmd.spawn()?;
    let pid = child.id();
    info!("Spawned engine {:?} (pid {:?})", executable, pid);

    let (line_tx, line_rx) = mpsc::unbounded_channel();
    let (outcome_tx, outcome_rx) = oneshot::channel();

    let stdout_lines = Arc::new(Mutex::new(Vec::new()));
    let stderr_lines = Arc::new(Mutex::new(Vec::new()));

    let stdout_task = child.stdout.take().map(|out| {
        tokio::spawn(pump_stream(
            out,
            OutputStream::Stdout,
            line_tx.clone(),
            stdout_lines.clone(),
        ))
    });
    let stderr_task = child.stderr.take().map(|err| {
        tokio::spawn(pump_stream(
            err,
            OutputStream::Stderr,
            line_tx.clone(),
            stderr_lines.clone(),
        ))
    });
    drop(line_tx);

    let token = cancel.clone();
    tokio::spawn(async move {
        let exit = tokio::select! {
            status = child.wait() => exit_from_status(status),
            _ = token.cancelled() => {
                terminate(&mut child, grace).await;
                RunExit::Cancelled
            }
        };
        let exit = if token.is_cancelled() {
            RunExit::Cancelled
        } else {
            exit
        };
        info!("Engine pid {:?} finished: {:?}", pid, exit);

        // Orphaned grandchildren can keep the pipes open; do not wait on them forever
        for task in [stdout_task, stderr_task].into_iter().flatten() {
            finish_reader(task, grace).await;
        }

        let _ = outcome_tx.send(RunOutcome {
            exit,
            stdout_lines: std::mem::take(&mut *stdout_lines.lock()),
            stderr_lines: std::mem::take(&mut *stderr_lines.lock()),
        });
    });

    Ok(RunHandle {
        pid,
        started_at,
        lines: line_rx,
        cancel,
        outcome: outcome_rx,
    })
}

fn exit_from_status(status: std::io::Result<ExitStatus>) -> RunExit {
    match status {
        Ok(status) => status.code().map_or(RunExit::Signaled, RunExit::Exited),
        Err(e) => {
            warn!("Failed to wait for engine process: {}", e);
            RunExit::Unknown
        }
    }
}

async fn finish_reader(mut task: JoinHandle<()>, grace: Duration) {
    if tokio::time::timeout(grace, &mut task).await.is_err() {
        warn!("Output reader still open after {:?}, abandoning it", grace);
        task.abort();
    }
}

/// Splits on both `\n` and `\r` so carriage-return progress bars arrive live
async fn pump_stream<R: AsyncRead + Unpin>(
    reader: R,
    stream: OutputStream,
    tx: mpsc::UnboundedSender<OutputLine>,
    collected: Arc<Mutex<Vec<String>>>,
) {
    let mut reader = BufReader::new(reader);
    let mut pending: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 4096];

    let emit = |pending: &mut Vec<u8>| {
        if pending.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(pending).to_string();
        pending.clear();
        debug!("[engine {:?}] {}", stream, text);
        collected.lock().push(text.clone());
        let _ = tx.send(OutputLine { stream, text });
    };

    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                warn!("Failed to read engine {:?}: {}", stream, e);
                break;
            }
        };
        for &byte in &chunk[..n] {
            if byte == b'\n' || byte == b'\r' {
                emit(&mut pending);
            } else {
                pending.push(byte);
            }
        }
    }
    emit(&mut pending);
}

async fn terminate(child: &mut Child, grace: Duration) {
    if let Some(pid) = child.id() {
        if request_graceful_stop(pid) {
            info!("Sent termination request to engine pid {}", pid);
            match tokio::time::timeout(grace, child.wait()).await {
                Ok(_) => return,
                Err(_) => warn!(
                    "Engine pid {} still running after {:?}, forcing termination",
                    pid, grace
                ),
            }
        }
    }

    if let Err(e) = child.kill().await {
        warn!("Failed to kill engine process: {}", e);
    }
}

/// SIGTERM on Unix. Returns false where the signal is unsupported.
fn request_graceful_stop(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    if !system.refresh_process(pid) {
        return false;
    }
    system
        .process(pid)
        .and_then(|process| process.kill_with(Signal::Term))
        .unwrap_or(false)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Instant;

    fn sh() -> PathBuf {
        PathBuf::from("/bin/sh")
    }

    fn script(body: &str) -> Vec<String> {
        vec!["-c".to_string(), body.to_string()]
    }

    #[tokio::test]
    async fn test_streams_lines_in_order() {
        let mut handle = start(
            &sh(),
            &script("echo one; echo two; echo oops 1>&2; printf '10%%\\r20%%\\n'"),
            None,
            Duration::from_secs(2),
            CancellationToken::new(),
        )
        .unwrap();

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        while let Some(line) = handle.next_line().await {
            match line.stream {
                OutputStream::Stdout => stdout.push(line.text),
                OutputStream::Stderr => stderr.push(line.text),
            }
        }
        assert_eq!(stdout, vec!["one", "two", "10%", "20%"]);
        assert_eq!(stderr, vec!["oops"]);

        let result = handle.wait(&[]).await;
        assert_eq!(result.exit, RunExit::Exited(0));
        assert_eq!(result.stderr_lines, vec!["oops"]);
    }

    #[tokio::test]
    async fn test_exit_code_and_produced_files() {
        let dir = tempfile::tempdir().unwrap();
        let srt = dir.path().join("clip.srt");
        let txt = dir.path().join("clip.txt");
        let body = format!("echo 1 > '{}'; exit 1", srt.display());

        let handle = start(
            &sh(),
            &script(&body),
            Some(dir.path()),
            Duration::from_secs(2),
            CancellationToken::new(),
        )
        .unwrap();
        let result = handle.wait(&[srt.clone(), txt]).await;
        assert_eq!(result.exit, RunExit::Exited(1));
        assert_eq!(result.produced_files, vec![srt]);
    }

    #[tokio::test]
    async fn test_cancel_reports_sentinel() {
        let handle = start(
            &sh(),
            &script("exec sleep 30"),
            None,
            Duration::from_secs(2),
            CancellationToken::new(),
        )
        .unwrap();
        assert!(handle.pid().is_some());

        let began = Instant::now();
        handle.cancel();
        let result = handle.wait(&[]).await;
        assert_eq!(result.exit, RunExit::Cancelled);
        assert!(began.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_cancel_escalates_to_kill_when_term_ignored() {
        let grace = Duration::from_millis(500);
        let mut handle = start(
            &sh(),
            &script("trap '' TERM; echo ready; while true; do sleep 1; done"),
            None,
            grace,
            CancellationToken::new(),
        )
        .unwrap();
        let pid = handle.pid().unwrap();
        assert_eq!(handle.next_line().await.map(|l| l.text).as_deref(), Some("ready"));

        let began = Instant::now();
        handle.cancel();
        let result = handle.wait(&[]).await;
        assert_eq!(result.exit, RunExit::Cancelled);
        assert!(began.elapsed() >= grace);
        assert!(began.elapsed() < Duration::from_secs(10));

        let alive = std::process::Command::new("kill")
            .args(["-0", &pid.to_string()])
            .status()
            .unwrap();
        assert!(!alive.success());
    }

    #[tokio::test]
    async fn test_spawn_failure_is_io_error() {
        let missing = PathBuf::from("/nonexistent/faster-whisper-xxl");
        assert!(start(&missing, &[], None, Duration::from_secs(1), CancellationToken::new()).is_err());
    }

    #[test]
    fn test_stale_outputs_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.txt");
        fs::write(&old, "x").unwrap();
        let future = SystemTime::now() + Duration::from_secs(60);
        assert!(produced_files(&[old.clone()], future).is_empty());
        assert_eq!(produced_files(&[old.clone()], SystemTime::now()), vec![old]);
    }
}
