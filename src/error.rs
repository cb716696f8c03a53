// Error taxonomy for job configuration, queue control and transcript editing
use std::path::PathBuf;
use thiserror::Error;

use crate::models::JobState;

/// Invalid or contradictory job configuration. Detected before a process starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Input file not found: {0:?}")]
    InputNotFound(PathBuf),

    #[error("Input path must be absolute: {0:?}")]
    InputNotAbsolute(PathBuf),

    #[error("Unsupported media format {extension:?} for {path:?}")]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("Invalid language code {0:?} (expected an ISO code or \"auto\")")]
    InvalidLanguage(String),

    #[error("At least one output format must be selected")]
    NoOutputFormats,

    #[error("Cannot set both exact speaker count and min/max speakers")]
    ExactWithRange,

    #[error("Minimum speakers ({min}) cannot be greater than maximum speakers ({max})")]
    MinAboveMax { min: u32, max: u32 },

    #[error("Speaker count must be at least 1")]
    ZeroSpeakers,

    #[error("Invalid speaker label {0:?} (letters, digits and '-' only)")]
    InvalidSpeakerLabel(String),

    #[error("{name} must be {expected}, got {value}")]
    OutOfRange {
        name: &'static str,
        expected: &'static str,
        value: f64,
    },

    #[error("Audio filter {0} appears more than once")]
    DuplicateFilter(&'static str),

    #[error("Output {path:?} collides with job {other_job}")]
    OutputCollision { path: PathBuf, other_job: String },

    #[error("Output files {0:?} would be produced by more than one job in the batch")]
    BatchCollision(PathBuf),
}

/// A required external binary or model is not present.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreconditionError {
    #[error("Transcription engine not found: {0:?}")]
    EngineMissing(PathBuf),

    #[error("Model {model} not found in {dir:?}")]
    ModelMissing { model: String, dir: PathBuf },

    #[error("Model {model} in {dir:?} is incomplete (missing config.json or model file)")]
    ModelIncomplete { model: String, dir: PathBuf },
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Cannot {action} job with state {from:?}")]
    InvalidTransition { from: JobState, action: &'static str },

    #[error("Queue is shutting down")]
    ShuttingDown,
}

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0:?} already exists; confirm overwrite to replace it")]
    WouldOverwrite(PathBuf),
}
