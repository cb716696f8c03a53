// Timestamp stripping for engine transcripts

use regex::Regex;

use crate::models::OutputFormat;

lazy_static::lazy_static! {
    // [00:38.120 --> 00:41.240] and [00:00:38,120 --> 00:00:41,240]
    static ref RANGE_PREFIX: Regex = Regex::new(
        r"\[\s*(?:\d{1,2}:)?\d{1,2}:\d{2}[.,]\d{3}\s*-->\s*(?:\d{1,2}:)?\d{1,2}:\d{2}[.,]\d{3}\s*\]\s*"
    ).unwrap();
    static ref WORD_MARKER: Regex =
        Regex::new(r"\[\s*(?:\d{1,2}:)?\d{1,2}:\d{2}[.,]\d{3}\s*\]\s*").unwrap();
    static ref SPEAKER_PREFIX: Regex =
        Regex::new(r"(?i)^(?:\[[^\]\n]+\]|SPEAKER_\d+)\s*:\s*").unwrap();
    static ref CUE_TIMING: Regex = Regex::new(
        r"^(?:\d{1,2}:)?\d{1,2}:\d{2}[.,]\d{3}\s*-->\s*(?:\d{1,2}:)?\d{1,2}:\d{2}[.,]\d{3}"
    ).unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

fn clean_line(line: &str, preserve_speaker_labels: bool) -> String {
    let line = RANGE_PREFIX.replace_all(line, "");
    let line = WORD_MARKER.replace_all(&line, "");
    let line = WHITESPACE.replace_all(line.trim(), " ");
    if preserve_speaker_labels {
        line.into_owned()
    } else {
        SPEAKER_PREFIX.replace(&line, "").into_owned()
    }
}

/// Removes range prefixes and word-level markers from TXT transcripts.
/// Lines are trimmed and blank lines dropped.
pub fn strip_timestamps(text: &str, preserve_speaker_labels: bool) -> String {
    text.lines()
        .map(|line| clean_line(line, preserve_speaker_labels))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_cue_timing(line: &str) -> bool {
    line.contains("-->") && CUE_TIMING.is_match(line)
}

fn join_cue(text_lines: &[&str], preserve_speaker_labels: bool) -> Option<String> {
    let joined = clean_line(&text_lines.join(" "), preserve_speaker_labels);
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

fn strip_srt(content: &str, preserve_speaker_labels: bool) -> String {
    let lines: Vec<&str> = content.lines().map(str::trim).collect();
    let mut cleaned = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let is_index = !line.is_empty() && line.chars().all(|c| c.is_ascii_digit());
        let timing_follows = lines.get(i + 1).map_or(false, |next| is_cue_timing(next));

        if (is_index && timing_follows) || is_cue_timing(line) {
            i += if is_cue_timing(line) { 1 } else { 2 };
            let start = i;
            while i < lines.len() && !lines[i].is_empty() {
                i += 1;
            }
            cleaned.extend(join_cue(&lines[start..i], preserve_speaker_labels));
            continue;
        }

        if !line.is_empty() {
            cleaned.push(clean_line(line, preserve_speaker_labels));
        }
        i += 1;
    }

    cleaned.join("\n")
}

fn strip_vtt(content: &str, preserve_speaker_labels: bool) -> String {
    let lines: Vec<&str> = content.lines().map(str::trim).collect();
    let mut cleaned = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let skip_block = line.starts_with("WEBVTT")
            || line.starts_with("NOTE")
            || line.starts_with("STYLE")
            || line.starts_with("REGION");
        if skip_block {
            while i < lines.len() && !lines[i].is_empty() {
                i += 1;
            }
            continue;
        }
        if line.is_empty() {
            i += 1;
            continue;
        }
        // cue identifier
        if lines.get(i + 1).map_or(false, |next| is_cue_timing(next)) && !is_cue_timing(line) {
            i += 1;
            continue;
        }
        if is_cue_timing(line) {
            i += 1;
            let start = i;
            while i < lines.len() && !lines[i].is_empty() && !is_cue_timing(lines[i]) {
                i += 1;
            }
            cleaned.extend(join_cue(&lines[start..i], preserve_speaker_labels));
            continue;
        }
        cleaned.push(clean_line(line, preserve_speaker_labels));
        i += 1;
    }

    cleaned.join("\n")
}

/// Format-aware variant. JSON is returned unchanged.
pub fn strip_subtitle_timestamps(
    content: &str,
    format: OutputFormat,
    preserve_speaker_labels: bool,
) -> String {
    match format {
        OutputFormat::Txt => strip_timestamps(content, preserve_speaker_labels),
        OutputFormat::Srt => strip_srt(content, preserve_speaker_labels),
        OutputFormat::Vtt => strip_vtt(content, preserve_speaker_labels),
        OutputFormat::Json => content.to_string(),
    }
}
