// User preference data models
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::OutputLocation;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Preferences {
    pub show_best_practices_on_start: bool,
    pub max_concurrent_jobs: u32,
    pub cancel_grace_period_ms: u64,
    pub default_output_dir: Option<String>,
    pub engine_path: Option<String>,
    pub model_dir: Option<String>,
    pub last_preset: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            show_best_practices_on_start: true,
            max_concurrent_jobs: 1,
            cancel_grace_period_ms: 5_000,
            default_output_dir: None,
            engine_path: None,
            model_dir: None,
            last_preset: String::from("Standard"),
        }
    }
}

/// Partial update; an empty string clears an optional path
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePreferencesParams {
    pub show_best_practices_on_start: Option<bool>,
    pub max_concurrent_jobs: Option<u32>,
    pub cancel_grace_period_ms: Option<u64>,
    pub default_output_dir: Option<String>,
    pub engine_path: Option<String>,
    pub model_dir: Option<String>,
    pub last_preset: Option<String>,
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

impl Preferences {
    /// Where new jobs write unless they say otherwise
    pub fn default_output_location(&self) -> OutputLocation {
        match self.default_output_dir.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => OutputLocation::Directory(PathBuf::from(dir)),
            _ => OutputLocation::Source,
        }
    }

    pub fn apply(&mut self, params: UpdatePreferencesParams) {
        if let Some(show) = params.show_best_practices_on_start {
            self.show_best_practices_on_start = show;
        }
        if let Some(max) = params.max_concurrent_jobs {
            self.max_concurrent_jobs = max.max(1);
        }
        if let Some(grace) = params.cancel_grace_period_ms {
            self.cancel_grace_period_ms = grace;
        }
        if let Some(dir) = params.default_output_dir {
            self.default_output_dir = non_empty(dir);
        }
        if let Some(path) = params.engine_path {
            self.engine_path = non_empty(path);
        }
        if let Some(dir) = params.model_dir {
            self.model_dir = non_empty(dir);
        }
        if let Some(preset) = params.last_preset {
            self.last_preset = preset;
        }
    }
}
