// Queue events delivered to the caller over an unbounded channel
use serde::Serialize;
use std::path::PathBuf;

use crate::models::{ConfigNotice, JobState, ProgressEvent, RunExit};
use crate::process_manager::OutputStream;
use crate::transcript::SpeakerMap;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueEvent {
    JobQueued {
        job_id: String,
        input: PathBuf,
        notices: Vec<ConfigNotice>,
        retry_of: Option<String>,
    },
    JobStarted {
        job_id: String,
        command: String,
    },
    Progress {
        job_id: String,
        progress: ProgressEvent,
    },
    /// Every engine line, parsed or not
    Log {
        job_id: String,
        stream: OutputStream,
        line: String,
    },
    JobFinished {
        job_id: String,
        state: JobState,
        exit: Option<RunExit>,
        output_paths: Vec<PathBuf>,
        error: Option<String>,
    },
    /// Speaker labels found in a diarized transcript, awaiting names.
    /// Nothing is rewritten until the caller saves an edit.
    SpeakerReview {
        job_id: String,
        transcript: PathBuf,
        speakers: SpeakerMap,
    },
    QueueDrained,
}

impl QueueEvent {
    pub fn job_id(&self) -> Option<&str> {
        match self {
            Self::JobQueued { job_id, .. }
            | Self::JobStarted { job_id, .. }
            | Self::Progress { job_id, .. }
            | Self::Log { job_id, .. }
            | Self::JobFinished { job_id, .. }
            | Self::SpeakerReview { job_id, .. } => Some(job_id),
            Self::QueueDrained => None,
        }
    }
}
