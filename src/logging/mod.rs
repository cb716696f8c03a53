//! Logging for Whisper Batch
//! Sets up env_logger and handles log file cleanup for 7-day retention

use crate::utils::{get_log_file_path, get_logs_dir};
use log::info;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::time::{Duration, SystemTime};

const LOG_RETENTION_DAYS: u64 = 7;

/// Filter from `RUST_LOG`, default `info`. Writes to today's log file when
/// the logs directory is usable, stderr otherwise. Safe to call twice.
pub fn init_logging() {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();

    let log_path = get_log_file_path();
    let file = fs::create_dir_all(get_logs_dir())
        .and_then(|_| OpenOptions::new().create(true).append(true).open(&log_path));
    if let Ok(file) = file {
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    if builder.try_init().is_ok() {
        info!("Logging initialized ({:?})", log_path);
    }
}

pub fn cleanup_old_logs() {
    cleanup_logs_in(&get_logs_dir(), SystemTime::now());
}

fn cleanup_logs_in(logs_dir: &Path, now: SystemTime) -> usize {
    if !logs_dir.exists() {
        return 0;
    }

    let retention = Duration::from_secs(LOG_RETENTION_DAYS * 24 * 60 * 60);
    let mut removed = 0;

    if let Ok(entries) = fs::read_dir(logs_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "log") {
                let expired = fs::metadata(&path)
                    .and_then(|meta| meta.modified())
                    .ok()
                    .and_then(|modified| now.duration_since(modified).ok())
                    .map_or(false, |age| age > retention);
                if expired && fs::remove_file(&path).is_ok() {
                    info!("Cleaned up old log: {:?}", path.file_name());
                    removed += 1;
                }
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_expired_logs_removed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("whisper-batch-old.log"), "x").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        assert_eq!(cleanup_logs_in(dir.path(), SystemTime::now()), 0);

        let later = SystemTime::now() + Duration::from_secs(8 * 24 * 60 * 60);
        assert_eq!(cleanup_logs_in(dir.path(), later), 1);
        assert!(dir.path().join("notes.txt").exists());
    }
}
