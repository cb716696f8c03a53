// Job lifecycle data models
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::job_config::{ConfigNotice, JobConfig};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    SucceededWithWarning,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Succeeded | Self::SucceededWithWarning)
    }

    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPhase {
    LoadingModel,
    Preprocessing,
    Transcribing,
    Diarizing,
    Writing,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressEvent {
    pub phase: Option<ProgressPhase>,
    pub percent: Option<f64>,
    pub eta_secs: Option<u64>,
}

/// How the engine process ended
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "code", rename_all = "snake_case")]
pub enum RunExit {
    Exited(i32),
    /// Killed by a signal the queue did not send
    Signaled,
    /// Sentinel for runs stopped through cancellation, whatever the raw status was
    Cancelled,
    /// The process could not be started or awaited
    Unknown,
}

impl RunExit {
    pub fn code(self) -> Option<i32> {
        match self {
            Self::Exited(code) => Some(code),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub exit: RunExit,
    pub stdout_lines: Vec<String>,
    pub stderr_lines: Vec<String>,
    pub produced_files: Vec<PathBuf>,
}

impl RunResult {
    pub fn spawn_failed(error: &std::io::Error) -> Self {
        Self {
            exit: RunExit::Unknown,
            stdout_lines: Vec::new(),
            stderr_lines: vec![format!("Failed to start engine: {}", error)],
            produced_files: Vec::new(),
        }
    }

    /// Exit status alone never decides success; produced files do.
    pub fn classify(&self) -> JobState {
        let has_files = !self.produced_files.is_empty();
        match self.exit {
            RunExit::Cancelled => JobState::Cancelled,
            RunExit::Exited(0) if has_files => JobState::Succeeded,
            RunExit::Exited(0) => JobState::SucceededWithWarning,
            _ if has_files => JobState::SucceededWithWarning,
            _ => JobState::Failed,
        }
    }

    /// Text recorded on the job for anything short of a clean success
    pub fn outcome_text(&self) -> Option<String> {
        match self.classify() {
            JobState::Succeeded | JobState::Cancelled => None,
            JobState::SucceededWithWarning if self.exit == RunExit::Exited(0) => {
                Some("Engine exited successfully but produced no output files".to_string())
            }
            JobState::SucceededWithWarning => Some(format!(
                "Engine {} but output files were produced",
                self.describe_exit()
            )),
            _ => {
                let stderr = self.stderr_lines.join("\n");
                if stderr.trim().is_empty() {
                    Some(format!("Process {}", self.describe_exit()))
                } else {
                    Some(stderr)
                }
            }
        }
    }

    fn describe_exit(&self) -> String {
        match self.exit {
            RunExit::Exited(code) => format!("exited with code {}", code),
            RunExit::Signaled => "was terminated by a signal".to_string(),
            RunExit::Cancelled => "was cancelled".to_string(),
            RunExit::Unknown => "ended with an unknown status".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub config: JobConfig,
    pub state: JobState,
    pub progress: Option<ProgressEvent>,
    pub output_paths: Vec<PathBuf>,
    pub exit: Option<RunExit>,
    pub error_text: Option<String>,
    pub notices: Vec<ConfigNotice>,
    pub command: Option<String>,
    pub retry_of: Option<String>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}

impl Job {
    pub fn new(id: String, config: JobConfig, notices: Vec<ConfigNotice>) -> Self {
        Self {
            id,
            config,
            state: JobState::Pending,
            progress: None,
            output_paths: Vec::new(),
            exit: None,
            error_text: None,
            notices,
            command: None,
            retry_of: None,
            created_at: chrono::Utc::now().to_rfc3339(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit.and_then(RunExit::code)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobCounts {
    pub pending: usize,
    pub running: usize,
    pub succeeded: usize,
    pub warned: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl JobCounts {
    pub fn tally<'a>(jobs: impl IntoIterator<Item = &'a Job>) -> Self {
        let mut counts = Self::default();
        for job in jobs {
            match job.state {
                JobState::Pending => counts.pending += 1,
                JobState::Running => counts.running += 1,
                JobState::Succeeded => counts.succeeded += 1,
                JobState::SucceededWithWarning => counts.warned += 1,
                JobState::Failed => counts.failed += 1,
                JobState::Cancelled => counts.cancelled += 1,
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(exit: RunExit, files: &[&str]) -> RunResult {
        RunResult {
            exit,
            stdout_lines: Vec::new(),
            stderr_lines: vec!["CUDA out of memory".to_string()],
            produced_files: files.iter().map(PathBuf::from).collect(),
        }
    }

    #[test]
    fn test_nonzero_exit_with_srt_is_warning() {
        let r = result(RunExit::Exited(1), &["/out/a.srt"]);
        assert_eq!(r.classify(), JobState::SucceededWithWarning);
        assert!(r.outcome_text().unwrap().contains("code 1"));
    }

    #[test]
    fn test_zero_exit_without_files_is_suspect() {
        assert_eq!(
            result(RunExit::Exited(0), &[]).classify(),
            JobState::SucceededWithWarning
        );
        assert_eq!(
            result(RunExit::Exited(0), &["/out/a.txt"]).classify(),
            JobState::Succeeded
        );
    }

    #[test]
    fn test_failure_keeps_stderr_verbatim() {
        let r = result(RunExit::Exited(2), &[]);
        assert_eq!(r.classify(), JobState::Failed);
        assert_eq!(r.outcome_text().as_deref(), Some("CUDA out of memory"));
        assert_eq!(result(RunExit::Signaled, &[]).classify(), JobState::Failed);
    }

    #[test]
    fn test_cancelled_sentinel_wins() {
        let r = result(RunExit::Cancelled, &["/out/a.txt"]);
        assert_eq!(r.classify(), JobState::Cancelled);
        assert_eq!(r.outcome_text(), None);
    }
}
