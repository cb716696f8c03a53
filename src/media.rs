//! Media file discovery: extension allow-list, folder expansion and file info

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;

const FFPROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub const SUPPORTED_EXTENSIONS: [&str; 9] =
    ["mp3", "mp4", "wav", "m4a", "flac", "mkv", "avi", "mov", "wmv"];

pub fn media_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

pub fn is_supported_media(path: &Path) -> bool {
    media_extension(path).map_or(false, |ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Expands directories recursively and keeps allow-listed files only.
/// Paths are canonicalized, so symlinks and `..` segments cannot produce
/// the same file twice. Output is sorted and free of duplicates.
pub fn collect_media_files<P: AsRef<Path>>(paths: &[P]) -> Vec<PathBuf> {
    let mut found = BTreeSet::new();
    let mut visited = HashSet::new();
    for path in paths {
        collect_into(path.as_ref(), &mut found, &mut visited);
    }
    found.into_iter().collect()
}

fn collect_into(path: &Path, found: &mut BTreeSet<PathBuf>, visited: &mut HashSet<PathBuf>) {
    let real = match fs::canonicalize(path) {
        Ok(real) => real,
        Err(e) => {
            debug!("Skipping {:?}: {}", path, e);
            return;
        }
    };

    if real.is_dir() {
        if !visited.insert(real.clone()) {
            debug!("Already scanned {:?}", real);
            return;
        }
        let entries = match fs::read_dir(&real) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Skipping unreadable folder {:?}: {}", path, e);
                return;
            }
        };
        for entry in entries.flatten() {
            collect_into(&entry.path(), found, visited);
        }
    } else if real.is_file() {
        if is_supported_media(&real) {
            found.insert(real);
        } else {
            debug!("Ignoring unsupported file {:?}", path);
        }
    }
}

/// Stream details reported by ffprobe
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MediaDetails {
    pub duration_secs: Option<f64>,
    pub duration_formatted: Option<String>,
    pub bitrate: Option<String>,
    pub codec: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileInfo {
    pub size: u64,
    pub size_formatted: String,
    pub format: String,
    /// Only filled by `file_info_detailed` when ffprobe is available
    #[serde(default)]
    pub details: Option<MediaDetails>,
}

pub fn file_info(path: &Path) -> Result<FileInfo, String> {
    let meta = fs::metadata(path).map_err(|e| format!("Failed to stat {:?}: {}", path, e))?;
    Ok(FileInfo {
        size: meta.len(),
        size_formatted: format_size(meta.len()),
        format: media_extension(path).unwrap_or_default().to_uppercase(),
        details: None,
    })
}

/// `file_info` plus duration, bitrate and codec when ffprobe can be run
pub async fn file_info_detailed(path: &Path) -> Result<FileInfo, String> {
    let mut info = file_info(path)?;
    info.details = read_media_details(path).await;
    Ok(info)
}

/// Runs ffprobe from `PATH`. `None` when it is missing, fails or times out.
pub async fn read_media_details(path: &Path) -> Option<MediaDetails> {
    let ffprobe = match which::which("ffprobe") {
        Ok(ffprobe) => ffprobe,
        Err(_) => {
            debug!("ffprobe not found, no media details for {:?}", path);
            return None;
        }
    };

    let mut cmd = Command::new(ffprobe);
    cmd.args([
        "-v",
        "error",
        "-show_entries",
        "format=duration,bit_rate,format_name",
        "-show_entries",
        "stream=codec_name,codec_type",
        "-of",
        "default=noprint_wrappers=1",
    ])
    .arg(path)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::null())
    .kill_on_drop(true);

    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);

    let output = match tokio::time::timeout(FFPROBE_TIMEOUT, cmd.output()).await {
        Ok(Ok(output)) if output.status.success() => output,
        Ok(Ok(output)) => {
            debug!("ffprobe exited with {:?} for {:?}", output.status.code(), path);
            return None;
        }
        Ok(Err(e)) => {
            warn!("Failed to run ffprobe: {}", e);
            return None;
        }
        Err(_) => {
            warn!("ffprobe timed out on {:?}", path);
            return None;
        }
    };

    parse_ffprobe_output(&String::from_utf8_lossy(&output.stdout))
}

/// Parses `key=value` lines. The first audio stream's codec wins.
pub fn parse_ffprobe_output(text: &str) -> Option<MediaDetails> {
    let mut details = MediaDetails::default();
    let mut pending_codec: Option<String> = None;
    let mut fallback_codec: Option<String> = None;

    for line in text.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        match key {
            "duration" => {
                if let Ok(secs) = value.parse::<f64>() {
                    details.duration_secs = Some(secs);
                    details.duration_formatted = Some(format_duration(secs));
                }
            }
            "bit_rate" => {
                if let Ok(bps) = value.parse::<u64>() {
                    details.bitrate = Some(format_bitrate(bps));
                }
            }
            "codec_name" => {
                if fallback_codec.is_none() {
                    fallback_codec = Some(value.to_string());
                }
                pending_codec = Some(value.to_string());
            }
            "codec_type" => {
                if value == "audio" && details.codec.is_none() {
                    details.codec = pending_codec.take();
                }
            }
            _ => {}
        }
    }

    if details.codec.is_none() {
        details.codec = fallback_codec;
    }
    if details == MediaDetails::default() {
        None
    } else {
        Some(details)
    }
}

pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

pub fn format_bitrate(bps: u64) -> String {
    if bps < 1_000 {
        format!("{} bps", bps)
    } else if bps < 1_000_000 {
        format!("{:.1} kbps", bps as f64 / 1_000.0)
    } else {
        format!("{:.1} Mbps", bps as f64 / 1_000_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list_is_case_insensitive() {
        assert!(is_supported_media(Path::new("/a/Talk.MP3")));
        assert!(is_supported_media(Path::new("/a/clip.mkv")));
        assert!(!is_supported_media(Path::new("/a/notes.txt")));
        assert!(!is_supported_media(Path::new("/a/noext")));
    }

    #[test]
    fn test_collect_media_files_recurses_sorted_dedup() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = fs::canonicalize(tmp.path()).unwrap();
        let nested = dir.join("day2");
        fs::create_dir_all(&nested).unwrap();
        for name in ["b.wav", "a.mp3", "readme.md"] {
            fs::write(dir.join(name), b"x").unwrap();
        }
        fs::write(nested.join("c.flac"), b"x").unwrap();

        let a = dir.join("a.mp3");
        let dotted = nested.join("..").join("b.wav");
        let found = collect_media_files(&[dir.clone(), a.clone(), dotted]);
        assert_eq!(found, vec![a, dir.join("b.wav"), nested.join("c.flac")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_scanned_once() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = fs::canonicalize(tmp.path()).unwrap();
        fs::write(dir.join("a.wav"), b"x").unwrap();
        std::os::unix::fs::symlink(&dir, dir.join("loop")).unwrap();

        let found = collect_media_files(&[dir.clone(), dir.join("loop")]);
        assert_eq!(found, vec![dir.join("a.wav")]);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512.00 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024), "5.00 GB");
    }

    #[test]
    fn test_duration_and_bitrate_formatting() {
        assert_eq!(format_duration(42.9), "42s");
        assert_eq!(format_duration(125.0), "2m 5s");
        assert_eq!(format_duration(3723.4), "1h 2m 3s");
        assert_eq!(format_bitrate(800), "800 bps");
        assert_eq!(format_bitrate(128_000), "128.0 kbps");
        assert_eq!(format_bitrate(2_500_000), "2.5 Mbps");
    }

    #[test]
    fn test_parse_ffprobe_output_prefers_audio_codec() {
        let text = "codec_name=h264\ncodec_type=video\ncodec_name=aac\ncodec_type=audio\n\
                    format_name=mov,mp4,m4a\nduration=125.480000\nbit_rate=192000\n";
        let details = parse_ffprobe_output(text).unwrap();
        assert_eq!(details.duration_secs, Some(125.48));
        assert_eq!(details.duration_formatted.as_deref(), Some("2m 5s"));
        assert_eq!(details.bitrate.as_deref(), Some("192.0 kbps"));
        assert_eq!(details.codec.as_deref(), Some("aac"));

        assert_eq!(parse_ffprobe_output("duration=N/A\n"), None);
    }

    #[test]
    fn test_file_info() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memo.m4a");
        fs::write(&path, vec![0u8; 2048]).unwrap();
        let info = file_info(&path).unwrap();
        assert_eq!(info.size, 2048);
        assert_eq!(info.size_formatted, "2.00 KB");
        assert_eq!(info.format, "M4A");
        assert_eq!(info.details, None);
    }
}
