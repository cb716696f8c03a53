//! Batch queue
//! Owns the job list, starts engine runs in submission order and reports
//! every state change as a `QueueEvent`.

pub mod events;

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::error::{ConfigError, QueueError};
use crate::models::{
    ConfigNotice, Job, JobConfig, JobCounts, JobState, Preferences, ProgressEvent, RunExit,
    RunResult,
};
use crate::process_manager::{
    build_command, check_preconditions, runner, EngineCommand, EngineConfig, ParsedLine,
    ProgressParser,
};
use crate::transcript::{
    extract_speakers_with_prefix, pick_review_transcript, read_transcript, SpeakerMap,
};

pub use events::QueueEvent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Engine processes allowed at once
    pub max_concurrent: usize,
    /// Time between the termination request and the forced kill
    pub cancel_grace: Duration,
    pub paused_on_start: bool,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 1,
            cancel_grace: Duration::from_secs(5),
            paused_on_start: false,
        }
    }
}

impl From<&Preferences> for QueueSettings {
    fn from(prefs: &Preferences) -> Self {
        Self {
            max_concurrent: prefs.max_concurrent_jobs.max(1) as usize,
            cancel_grace: Duration::from_millis(prefs.cancel_grace_period_ms),
            paused_on_start: false,
        }
    }
}

struct QueueState {
    jobs: Vec<Job>,
    active: HashMap<String, CancellationToken>,
    paused: bool,
    shutting_down: bool,
    /// Nothing running and nothing pending, as last reported
    drained: bool,
}

struct Inner {
    engine: EngineConfig,
    settings: QueueSettings,
    runtime: Handle,
    events: mpsc::UnboundedSender<QueueEvent>,
    state: Mutex<QueueState>,
    idle: watch::Sender<bool>,
}

/// A validated config ready to be appended
struct Prepared {
    config: JobConfig,
    notices: Vec<ConfigNotice>,
}

/// Cheap to clone; all clones drive the same queue.
#[derive(Clone)]
pub struct QueueManager {
    inner: Arc<Inner>,
}

impl QueueManager {
    /// Engine runs are spawned on `runtime`.
    pub fn new(
        engine: EngineConfig,
        settings: QueueSettings,
        runtime: Handle,
    ) -> (Self, mpsc::UnboundedReceiver<QueueEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let (idle, _) = watch::channel(true);
        let paused = settings.paused_on_start;

        let manager = Self {
            inner: Arc::new(Inner {
                engine,
                settings,
                runtime,
                events,
                state: Mutex::new(QueueState {
                    jobs: Vec::new(),
                    active: HashMap::new(),
                    paused,
                    shutting_down: false,
                    drained: true,
                }),
                idle,
            }),
        };
        (manager, receiver)
    }

    pub fn settings(&self) -> &QueueSettings {
        &self.inner.settings
    }

    fn emit(&self, event: QueueEvent) {
        // A dropped receiver only means nobody is listening
        let _ = self.inner.events.send(event);
    }

    fn prepare(&self, config: JobConfig) -> Result<Prepared, QueueError> {
        let notices = config.validate()?;
        check_preconditions(&self.inner.engine, config.model)?;
        build_command(&config, &self.inner.engine)?;
        Ok(Prepared { config, notices })
    }

    /// Validates one config and appends it as a Pending job
    pub fn submit(&self, config: JobConfig) -> Result<String, QueueError> {
        let ids = self.submit_batch(vec![config])?;
        Ok(ids.into_iter().next().unwrap_or_default())
    }

    /// All or nothing: one invalid config or output collision rejects the batch
    pub fn submit_batch(&self, configs: Vec<JobConfig>) -> Result<Vec<String>, QueueError> {
        if self.inner.state.lock().shutting_down {
            return Err(QueueError::ShuttingDown);
        }
        let prepared = configs
            .into_iter()
            .map(|config| self.prepare(config))
            .collect::<Result<Vec<_>, _>>()?;
        let ids = self.enqueue(prepared, None)?;
        self.pump();
        Ok(ids)
    }

    fn enqueue(&self, prepared: Vec<Prepared>, retry_of: Option<&str>) -> Result<Vec<String>, QueueError> {
        let mut state = self.inner.state.lock();
        if state.shutting_down {
            return Err(QueueError::ShuttingDown);
        }

        let mut batch_keys = HashSet::new();
        for item in &prepared {
            let key = item.config.output_key();
            if !batch_keys.insert(key.clone()) {
                return Err(ConfigError::BatchCollision(key).into());
            }
            let clash = state
                .jobs
                .iter()
                .find(|job| !job.state.is_terminal() && job.config.output_key() == key);
            if let Some(other) = clash {
                return Err(ConfigError::OutputCollision {
                    path: key,
                    other_job: other.id.clone(),
                }
                .into());
            }
        }

        let mut ids = Vec::with_capacity(prepared.len());
        for item in prepared {
            let id = uuid::Uuid::new_v4().to_string();
            let mut job = Job::new(id.clone(), item.config, item.notices);
            job.retry_of = retry_of.map(str::to_string);
            info!("Queued job {} for {:?}", id, job.config.input_path);

            self.emit(QueueEvent::JobQueued {
                job_id: id.clone(),
                input: job.config.input_path.clone(),
                notices: job.notices.clone(),
                retry_of: job.retry_of.clone(),
            });
            state.jobs.push(job);
            ids.push(id);
        }
        Ok(ids)
    }

    /// Starts Pending jobs in order while capacity allows
    fn pump(&self) {
        let mut state = self.inner.state.lock();

        while !state.paused
            && !state.shutting_down
            && state.active.len() < self.inner.settings.max_concurrent.max(1)
        {
            let Some(index) = state.jobs.iter().position(|j| j.state == JobState::Pending) else {
                break;
            };

            let token = CancellationToken::new();
            let job = &mut state.jobs[index];
            let job_id = job.id.clone();

            let command = match build_command(&job.config, &self.inner.engine) {
                Ok(command) => command,
                Err(e) => {
                    error!("Job {} has an invalid configuration: {}", job_id, e);
                    job.state = JobState::Failed;
                    job.error_text = Some(e.to_string());
                    job.finished_at = Some(chrono::Utc::now().to_rfc3339());
                    self.emit(QueueEvent::JobFinished {
                        job_id,
                        state: JobState::Failed,
                        exit: None,
                        output_paths: Vec::new(),
                        error: Some(e.to_string()),
                    });
                    continue;
                }
            };

            let preview = command.preview();
            job.state = JobState::Running;
            job.started_at = Some(chrono::Utc::now().to_rfc3339());
            job.command = Some(preview.clone());
            let expected = job.config.expected_outputs();
            info!("Starting job {}: {}", job_id, preview);

            state.active.insert(job_id.clone(), token.clone());
            self.emit(QueueEvent::JobStarted {
                job_id: job_id.clone(),
                command: preview,
            });

            let manager = self.clone();
            self.inner
                .runtime
                .spawn(manager.run_job(job_id, command, expected, token));
        }

        self.refresh_idle(&mut state);
    }

    /// `QueueDrained` fires each time the queue becomes empty of work,
    /// even when it was already idle because it is paused.
    fn refresh_idle(&self, state: &mut QueueState) {
        let has_pending = state.jobs.iter().any(|j| j.state == JobState::Pending);
        let idle = state.active.is_empty() && (!has_pending || state.paused);
        if idle != *self.inner.idle.borrow() {
            self.inner.idle.send_replace(idle);
        }

        let drained = state.active.is_empty() && !has_pending;
        if drained && !state.drained {
            info!("Queue drained");
            self.emit(QueueEvent::QueueDrained);
        }
        state.drained = drained;
    }

    async fn run_job(
        self,
        job_id: String,
        command: EngineCommand,
        expected: Vec<PathBuf>,
        token: CancellationToken,
    ) {
        let grace = self.inner.settings.cancel_grace;

        let result = if token.is_cancelled() {
            RunResult {
                exit: RunExit::Cancelled,
                stdout_lines: Vec::new(),
                stderr_lines: Vec::new(),
                produced_files: Vec::new(),
            }
        } else {
            match runner::start(&command.executable, &command.args, None, grace, token) {
                Ok(mut handle) => {
                    let mut parser = ProgressParser::new();
                    while let Some(line) = handle.next_line().await {
                        let parsed = parser.parse(&line.text);
                        self.emit(QueueEvent::Log {
                            job_id: job_id.clone(),
                            stream: line.stream,
                            line: line.text,
                        });
                        if let ParsedLine::Progress(progress) = parsed {
                            self.record_progress(&job_id, progress);
                        }
                    }
                    handle.wait(&expected).await
                }
                Err(e) => {
                    error!("Failed to start engine for job {}: {}", job_id, e);
                    RunResult::spawn_failed(&e)
                }
            }
        };

        self.complete(&job_id, result);
    }

    fn record_progress(&self, job_id: &str, progress: ProgressEvent) {
        let mut state = self.inner.state.lock();
        if let Some(job) = state.jobs.iter_mut().find(|j| j.id == job_id) {
            job.progress = Some(progress.clone());
        }
        self.emit(QueueEvent::Progress {
            job_id: job_id.to_string(),
            progress,
        });
    }

    fn complete(&self, job_id: &str, result: RunResult) {
        let final_state = result.classify();
        let review = {
            let mut state = self.inner.state.lock();
            state.active.remove(job_id);

            match state.jobs.iter_mut().find(|j| j.id == job_id) {
                Some(job) => {
                    job.state = final_state;
                    job.exit = Some(result.exit);
                    job.output_paths = result.produced_files.clone();
                    job.error_text = result.outcome_text();
                    job.finished_at = Some(chrono::Utc::now().to_rfc3339());

                    match final_state {
                        JobState::Failed => warn!("Job {} failed: {:?}", job_id, result.exit),
                        JobState::SucceededWithWarning => {
                            warn!("Job {} finished with a warning: {:?}", job_id, job.error_text)
                        }
                        _ => info!("Job {} finished: {:?}", job_id, final_state),
                    }

                    self.emit(QueueEvent::JobFinished {
                        job_id: job_id.to_string(),
                        state: final_state,
                        exit: job.exit,
                        output_paths: job.output_paths.clone(),
                        error: job.error_text.clone(),
                    });

                    match &job.config.diarization {
                        Some(diarization) if final_state.is_success() => {
                            pick_review_transcript(&job.output_paths)
                                .map(|path| (path, diarization.speaker_label.clone()))
                        }
                        _ => None,
                    }
                }
                None => {
                    debug!("Job {} was removed before it finished", job_id);
                    None
                }
            }
        };

        if let Some((transcript, prefix)) = review {
            self.offer_speaker_review(job_id, transcript, &prefix);
        }

        self.pump();
    }

    fn offer_speaker_review(&self, job_id: &str, transcript: PathBuf, prefix: &str) {
        match read_transcript(&transcript) {
            Ok(text) => {
                let labels = extract_speakers_with_prefix(&text, prefix);
                if labels.is_empty() {
                    info!("No speaker labels found in {:?}", transcript);
                    return;
                }
                self.emit(QueueEvent::SpeakerReview {
                    job_id: job_id.to_string(),
                    transcript,
                    speakers: SpeakerMap::with_prefix(prefix, labels),
                });
            }
            Err(e) => warn!("Speaker review skipped for job {}: {}", job_id, e),
        }
    }

    fn cancel_pending(&self, job: &mut Job) {
        job.state = JobState::Cancelled;
        job.finished_at = Some(chrono::Utc::now().to_rfc3339());
        self.emit(QueueEvent::JobFinished {
            job_id: job.id.clone(),
            state: JobState::Cancelled,
            exit: None,
            output_paths: Vec::new(),
            error: None,
        });
    }

    /// Pending jobs are cancelled on the spot and never start.
    /// Running jobs become Cancelled once their process has exited.
    pub fn cancel_one(&self, job_id: &str) -> Result<(), QueueError> {
        let mut state = self.inner.state.lock();
        let index = state
            .jobs
            .iter()
            .position(|j| j.id == job_id)
            .ok_or_else(|| QueueError::JobNotFound(job_id.to_string()))?;

        match state.jobs[index].state {
            JobState::Pending => {
                info!("Cancelled pending job {}", job_id);
                self.cancel_pending(&mut state.jobs[index]);
                self.refresh_idle(&mut state);
                Ok(())
            }
            JobState::Running => {
                info!("Cancellation requested for job {}", job_id);
                if let Some(token) = state.active.get(job_id) {
                    token.cancel();
                }
                Ok(())
            }
            from => Err(QueueError::InvalidTransition {
                from,
                action: "cancel",
            }),
        }
    }

    /// Cancels running jobs and every Pending job. Returns how many were affected.
    pub fn cancel_all(&self) -> usize {
        let mut state = self.inner.state.lock();
        let mut affected = 0;

        for token in state.active.values() {
            token.cancel();
            affected += 1;
        }

        let pending: Vec<usize> = state
            .jobs
            .iter()
            .enumerate()
            .filter(|(_, j)| j.state == JobState::Pending)
            .map(|(i, _)| i)
            .collect();
        for index in pending {
            self.cancel_pending(&mut state.jobs[index]);
            affected += 1;
        }

        info!("Cancel all: {} job(s) affected", affected);
        self.refresh_idle(&mut state);
        affected
    }

    /// Clones a Failed or Cancelled job's config into a new Pending job
    pub fn retry(&self, job_id: &str) -> Result<String, QueueError> {
        let config = {
            let state = self.inner.state.lock();
            if state.shutting_down {
                return Err(QueueError::ShuttingDown);
            }
            let job = state
                .jobs
                .iter()
                .find(|j| j.id == job_id)
                .ok_or_else(|| QueueError::JobNotFound(job_id.to_string()))?;
            if !job.state.is_retryable() {
                return Err(QueueError::InvalidTransition {
                    from: job.state,
                    action: "retry",
                });
            }
            job.config.clone()
        };

        let prepared = self.prepare(config)?;
        let ids = self.enqueue(vec![prepared], Some(job_id))?;
        self.pump();
        Ok(ids.into_iter().next().unwrap_or_default())
    }

    pub fn pause(&self) {
        let mut state = self.inner.state.lock();
        state.paused = true;
        info!("Queue paused");
        self.refresh_idle(&mut state);
    }

    pub fn resume(&self) {
        self.inner.state.lock().paused = false;
        info!("Queue resumed");
        self.pump();
    }

    pub fn is_paused(&self) -> bool {
        self.inner.state.lock().paused
    }

    /// Drops a finished job record
    pub fn remove(&self, job_id: &str) -> Result<Job, QueueError> {
        let mut state = self.inner.state.lock();
        let index = state
            .jobs
            .iter()
            .position(|j| j.id == job_id)
            .ok_or_else(|| QueueError::JobNotFound(job_id.to_string()))?;
        let from = state.jobs[index].state;
        if !from.is_terminal() {
            return Err(QueueError::InvalidTransition {
                from,
                action: "remove",
            });
        }
        Ok(state.jobs.remove(index))
    }

    pub fn clear_finished(&self) -> usize {
        let mut state = self.inner.state.lock();
        let before = state.jobs.len();
        state.jobs.retain(|j| !j.state.is_terminal());
        before - state.jobs.len()
    }

    pub fn snapshot(&self) -> Vec<Job> {
        self.inner.state.lock().jobs.clone()
    }

    pub fn job(&self, job_id: &str) -> Option<Job> {
        self.inner
            .state
            .lock()
            .jobs
            .iter()
            .find(|j| j.id == job_id)
            .cloned()
    }

    pub fn counts(&self) -> JobCounts {
        JobCounts::tally(self.inner.state.lock().jobs.iter())
    }

    /// Resolves once nothing is running and nothing can start
    pub async fn wait_idle(&self) {
        let mut idle = self.inner.idle.subscribe();
        let _ = idle.wait_for(|idle| *idle).await;
    }

    /// Rejects new work, cancels everything and waits for processes to exit
    pub async fn shutdown(&self) {
        self.inner.state.lock().shutting_down = true;
        info!("Shutting down queue");
        self.cancel_all();
        self.wait_idle().await;
    }
}
