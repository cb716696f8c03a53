// Engine and model availability checks, run before any command is built

use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::EngineConfig;
use crate::error::PreconditionError;
use crate::models::WhisperModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    /// Folder with `config.json` and a `model.*` weights file
    Available,
    /// Folder exists but one of the required files is absent
    Partial,
    Missing,
}

pub fn model_path(model_dir: &Path, model: WhisperModel) -> PathBuf {
    model_dir.join(format!("faster-whisper-{}", model.as_str()))
}

pub fn model_status(model_dir: &Path, model: WhisperModel) -> ModelStatus {
    let path = model_path(model_dir, model);
    if !path.is_dir() {
        return ModelStatus::Missing;
    }

    let has_config = path.join("config.json").is_file();
    let has_weights = fs::read_dir(&path)
        .map(|entries| {
            entries.flatten().any(|entry| {
                entry.file_name().to_string_lossy().starts_with("model.")
                    && entry.path().is_file()
            })
        })
        .unwrap_or(false);

    if has_config && has_weights {
        ModelStatus::Available
    } else {
        ModelStatus::Partial
    }
}

/// Paths with a directory component must exist; bare names are looked up on `PATH`
pub fn resolve_engine(executable: &Path) -> Result<PathBuf, PreconditionError> {
    let is_bare = executable.components().count() == 1 && !executable.is_absolute();
    if is_bare {
        which::which(executable).map_err(|_| PreconditionError::EngineMissing(executable.to_path_buf()))
    } else if executable.is_file() {
        Ok(executable.to_path_buf())
    } else {
        Err(PreconditionError::EngineMissing(executable.to_path_buf()))
    }
}

pub fn check_preconditions(
    engine: &EngineConfig,
    model: WhisperModel,
) -> Result<PathBuf, PreconditionError> {
    let executable = resolve_engine(&engine.executable)?;

    if let Some(model_dir) = &engine.model_dir {
        match model_status(model_dir, model) {
            ModelStatus::Available => {}
            ModelStatus::Partial => {
                return Err(PreconditionError::ModelIncomplete {
                    model: model.to_string(),
                    dir: model_dir.clone(),
                })
            }
            ModelStatus::Missing if engine.download_missing => {
                info!("Model {} not in {:?}, engine will download it", model, model_dir);
            }
            ModelStatus::Missing => {
                return Err(PreconditionError::ModelMissing {
                    model: model.to_string(),
                    dir: model_dir.clone(),
                })
            }
        }
    }

    Ok(executable)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn install_model(model_dir: &Path, model: WhisperModel, weights: bool) {
        let path = model_path(model_dir, model);
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("config.json"), "{}").unwrap();
        if weights {
            fs::write(path.join("model.bin"), b"weights").unwrap();
        }
    }

    #[test]
    fn test_model_status() {
        let dir = tempfile::tempdir().unwrap();
        install_model(dir.path(), WhisperModel::LargeV2, true);
        install_model(dir.path(), WhisperModel::Medium, false);

        assert_eq!(model_status(dir.path(), WhisperModel::LargeV2), ModelStatus::Available);
        assert_eq!(model_status(dir.path(), WhisperModel::Medium), ModelStatus::Partial);
        assert_eq!(model_status(dir.path(), WhisperModel::Tiny), ModelStatus::Missing);
    }

    #[test]
    fn test_missing_engine() {
        let engine = EngineConfig::new("/nonexistent/faster-whisper-xxl");
        assert_eq!(
            check_preconditions(&engine, WhisperModel::Tiny),
            Err(PreconditionError::EngineMissing(PathBuf::from(
                "/nonexistent/faster-whisper-xxl"
            )))
        );
        assert!(resolve_engine(Path::new("surely-not-an-installed-engine-binary")).is_err());
    }

    #[test]
    fn test_model_checked_only_with_model_dir() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("engine");
        fs::write(&exe, "").unwrap();

        let engine = EngineConfig::new(&exe);
        assert_eq!(check_preconditions(&engine, WhisperModel::Small), Ok(exe.clone()));

        let engine = engine.with_model_dir(dir.path());
        assert!(matches!(
            check_preconditions(&engine, WhisperModel::Small),
            Err(PreconditionError::ModelMissing { .. })
        ));
        install_model(dir.path(), WhisperModel::Small, true);
        assert_eq!(check_preconditions(&engine, WhisperModel::Small), Ok(exe));
    }

    #[test]
    fn test_download_allowed_tolerates_missing_not_partial() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("engine");
        fs::write(&exe, "").unwrap();

        let mut engine = EngineConfig::new(&exe).with_model_dir(dir.path());
        engine.download_missing = true;
        assert_eq!(check_preconditions(&engine, WhisperModel::Medium), Ok(exe));

        install_model(dir.path(), WhisperModel::Medium, false);
        assert!(matches!(
            check_preconditions(&engine, WhisperModel::Medium),
            Err(PreconditionError::ModelIncomplete { .. })
        ));
    }
}
