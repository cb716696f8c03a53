// Transcription engine process management
// Builds engine command lines, checks preconditions and supervises engine processes

pub mod command_builder;
pub mod preconditions;
pub mod progress;
pub mod runner;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::Preferences;
use crate::utils::{get_engine_dir, get_models_dir};

pub use command_builder::{build_command, preview_command, EngineCommand};
pub use preconditions::{check_preconditions, model_status, resolve_engine, ModelStatus};
pub use progress::{ParsedLine, ProgressParser};
pub use runner::{OutputLine, OutputStream, RunHandle};

#[cfg(windows)]
pub const ENGINE_BINARY: &str = "faster-whisper-xxl.exe";

#[cfg(not(windows))]
pub const ENGINE_BINARY: &str = "faster-whisper-xxl";

/// Where the engine lives and where it looks for models
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    pub executable: PathBuf,
    /// When unset the engine manages its own model cache
    pub model_dir: Option<PathBuf>,
    /// Lets the engine fetch a model absent from `model_dir`
    #[serde(default)]
    pub download_missing: bool,
}

impl EngineConfig {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            model_dir: None,
            download_missing: false,
        }
    }

    pub fn with_model_dir(mut self, model_dir: impl Into<PathBuf>) -> Self {
        self.model_dir = Some(model_dir.into());
        self
    }

    /// Preference paths first, then the bundled engine directory, then `PATH`.
    /// Without a model directory preference the app's own models folder is
    /// used and the engine may download into it.
    pub fn from_preferences(prefs: &Preferences) -> Self {
        Self::from_preferences_in(prefs, get_models_dir())
    }

    fn from_preferences_in(prefs: &Preferences, default_models: PathBuf) -> Self {
        let executable = match &prefs.engine_path {
            Some(path) => PathBuf::from(path),
            None => {
                let bundled = get_engine_dir().join(ENGINE_BINARY);
                if bundled.exists() {
                    bundled
                } else {
                    PathBuf::from(ENGINE_BINARY)
                }
            }
        };

        match &prefs.model_dir {
            Some(dir) => Self {
                executable,
                model_dir: Some(PathBuf::from(dir)),
                download_missing: false,
            },
            None => Self {
                executable,
                model_dir: Some(default_models),
                download_missing: true,
            },
        }
    }
}
