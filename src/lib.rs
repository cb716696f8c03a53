pub mod advisories;
pub mod audio_filters;
pub mod error;
pub mod file_manager;
pub mod gpu;
pub mod logging;
pub mod media;
pub mod models;
pub mod presets;
pub mod process_manager;
pub mod queue;
pub mod transcript;
pub mod utils;

pub use error::{ConfigError, PreconditionError, QueueError, TranscriptError};
pub use models::{Job, JobConfig, JobCounts, JobState, Preferences};
pub use presets::{JobConfigBuilder, Preset};
pub use process_manager::EngineConfig;
pub use queue::{QueueEvent, QueueManager, QueueSettings};

use file_manager::initialize_json_file;
use log::info;
use utils::{get_preferences_json_path, initialize_data_directories};

/// Creates the data directories and seeds the preferences file
pub fn initialize_app_data() -> Result<(), String> {
    initialize_data_directories()?;
    initialize_json_file(&get_preferences_json_path(), &Preferences::default())?;

    info!("App data initialized successfully");
    Ok(())
}
