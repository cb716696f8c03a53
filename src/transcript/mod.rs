//! Transcript post-processing
//! Speaker renaming and timestamp stripping work on in-memory text only.
//! Reading and saving are separate calls so every write is an explicit decision.

pub mod speakers;
pub mod timestamps;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::TranscriptError;
use crate::models::OutputFormat;

pub use speakers::{
    apply_speaker_map, extract_speakers, extract_speakers_with_prefix, SpeakerEntry, SpeakerMap,
    DEFAULT_SPEAKER_PREFIX,
};
pub use timestamps::{strip_subtitle_timestamps, strip_timestamps};

/// Preference order when choosing the file shown for speaker review
const REVIEW_ORDER: [OutputFormat; 3] = [OutputFormat::Txt, OutputFormat::Srt, OutputFormat::Vtt];

fn format_of(path: &Path) -> Option<OutputFormat> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(OutputFormat::from_extension)
}

pub fn pick_review_transcript(paths: &[PathBuf]) -> Option<PathBuf> {
    REVIEW_ORDER.iter().find_map(|wanted| {
        paths
            .iter()
            .find(|path| format_of(path) == Some(*wanted))
            .cloned()
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOptions {
    pub remove_timestamps: bool,
    pub preserve_speaker_labels: bool,
}

/// Transformed content plus the suggested place to save it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEdit {
    pub content: String,
    pub save_target: PathBuf,
}

fn suggested_target(source: &Path, suffix: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match source.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };
    source.with_file_name(name)
}

/// Applies the speaker map, then strips timestamps if requested
pub fn prepare_edit(
    source: &Path,
    original: &str,
    map: &SpeakerMap,
    options: EditOptions,
) -> TranscriptEdit {
    let mut content = apply_speaker_map(original, map);
    if options.remove_timestamps {
        let format = format_of(source).unwrap_or(OutputFormat::Txt);
        content = strip_subtitle_timestamps(&content, format, options.preserve_speaker_labels);
    }

    let suffix = if map.has_renames() {
        "_renamed"
    } else {
        "_no_timestamps"
    };

    TranscriptEdit {
        content,
        save_target: suggested_target(source, suffix),
    }
}

pub fn read_transcript(path: &Path) -> Result<String, TranscriptError> {
    fs::read_to_string(path).map_err(|source| TranscriptError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Refuses to replace an existing file unless `overwrite` is set
pub fn save_transcript(path: &Path, content: &str, overwrite: bool) -> Result<(), TranscriptError> {
    if path.exists() && !overwrite {
        return Err(TranscriptError::WouldOverwrite(path.to_path_buf()));
    }
    fs::write(path, content).map_err(|source| TranscriptError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Saved transcript {:?}", path);
    Ok(())
}
