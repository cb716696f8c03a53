use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

static APP_DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

pub fn get_app_data_dir() -> PathBuf {
    APP_DATA_DIR
        .get_or_init(|| {
            let base_dir = dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."));
            base_dir.join("WhisperBatch")
        })
        .clone()
}

pub fn get_data_dir() -> PathBuf {
    get_app_data_dir().join("data")
}

pub fn get_logs_dir() -> PathBuf {
    get_app_data_dir().join("logs")
}

pub fn get_models_dir() -> PathBuf {
    get_app_data_dir().join("models")
}

pub fn get_engine_dir() -> PathBuf {
    get_app_data_dir().join("engine")
}

pub fn get_preferences_json_path() -> PathBuf {
    get_data_dir().join("preferences.json")
}

pub fn get_log_file_path() -> PathBuf {
    let date = chrono::Local::now().format("%Y-%m-%d");
    get_logs_dir().join(format!("whisper-batch-{}.log", date))
}

pub fn initialize_data_directories() -> Result<(), String> {
    let directories = [
        get_data_dir(),
        get_logs_dir(),
        get_models_dir(),
        get_engine_dir(),
    ];

    for dir in &directories {
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| {
                format!("Failed to create directory {:?}: {}", dir, e)
            })?;
            info!("Created directory: {:?}", dir);
        }
    }

    info!("Data directories initialized at: {:?}", get_app_data_dir());
    Ok(())
}
