// Preferences storage backed by the JSON helpers
use log::debug;
use std::path::Path;

use super::{read_json_file_or_default, update_json_file};
use crate::models::{Preferences, UpdatePreferencesParams};
use crate::utils::get_preferences_json_path;

pub fn load_preferences_from(path: &Path) -> Result<Preferences, String> {
    read_json_file_or_default(path)
}

pub fn update_preferences_at(
    path: &Path,
    params: UpdatePreferencesParams,
) -> Result<Preferences, String> {
    debug!("Updating preferences at {:?}: {:?}", path, params);
    update_json_file(path, |prefs: &mut Preferences| prefs.apply(params))
}

/// Get current preferences from the JSON file
pub fn get_preferences() -> Result<Preferences, String> {
    load_preferences_from(&get_preferences_json_path())
}

/// Update preferences with partial update support
pub fn update_preferences(params: UpdatePreferencesParams) -> Result<Preferences, String> {
    update_preferences_at(&get_preferences_json_path(), params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        assert_eq!(load_preferences_from(&path).unwrap(), Preferences::default());

        let updated = update_preferences_at(
            &path,
            UpdatePreferencesParams {
                show_best_practices_on_start: Some(false),
                last_preset: Some("Turbo".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(!updated.show_best_practices_on_start);
        assert_eq!(load_preferences_from(&path).unwrap(), updated);
    }
}
