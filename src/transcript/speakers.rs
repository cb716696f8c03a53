// Speaker label discovery and renaming

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

lazy_static::lazy_static! {
    static ref SPEAKER_LABEL: Regex = Regex::new(r"(?i)\bSPEAKER_(\d+)\b").unwrap();
}

/// Label prefix the engine uses unless told otherwise with `--speaker`
pub const DEFAULT_SPEAKER_PREFIX: &str = "SPEAKER";

fn label_regex(prefix: &str) -> Regex {
    if prefix.eq_ignore_ascii_case(DEFAULT_SPEAKER_PREFIX) {
        return SPEAKER_LABEL.clone();
    }
    Regex::new(&format!(r"(?i)\b{}_(\d+)\b", regex::escape(prefix)))
        .unwrap_or_else(|_| SPEAKER_LABEL.clone())
}

fn normalize_with(prefix: &str, digits: &str) -> String {
    match digits.parse::<u32>() {
        Ok(n) => format!("{}_{:02}", prefix, n),
        Err(_) => format!("{}_{}", prefix, digits),
    }
}

/// `speaker_1` and `SPEAKER_001` both become `SPEAKER_01`
pub fn normalize_label(digits: &str) -> String {
    normalize_with(DEFAULT_SPEAKER_PREFIX, digits)
}

/// Distinct labels in order of first appearance
pub fn extract_speakers(text: &str) -> Vec<String> {
    extract_speakers_with_prefix(text, DEFAULT_SPEAKER_PREFIX)
}

/// Same as `extract_speakers` for a custom label prefix such as `Host`
pub fn extract_speakers_with_prefix(text: &str, prefix: &str) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for caps in label_regex(prefix).captures_iter(text) {
        let label = normalize_with(prefix, &caps[1]);
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerEntry {
    pub label: String,
    pub name: String,
}

fn default_prefix() -> String {
    DEFAULT_SPEAKER_PREFIX.to_string()
}

/// Raw label to display name. Keys are exactly the labels found in one transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerMap {
    #[serde(default = "default_prefix")]
    prefix: String,
    entries: Vec<SpeakerEntry>,
}

impl Default for SpeakerMap {
    fn default() -> Self {
        Self::from_labels(Vec::new())
    }
}

impl SpeakerMap {
    pub fn from_labels(labels: Vec<String>) -> Self {
        Self::with_prefix(DEFAULT_SPEAKER_PREFIX, labels)
    }

    pub fn with_prefix(prefix: &str, labels: Vec<String>) -> Self {
        Self {
            prefix: prefix.to_string(),
            entries: labels
                .into_iter()
                .map(|label| SpeakerEntry {
                    label,
                    name: String::new(),
                })
                .collect(),
        }
    }

    pub fn from_transcript(text: &str) -> Self {
        Self::from_labels(extract_speakers(text))
    }

    pub fn from_transcript_with_prefix(text: &str, prefix: &str) -> Self {
        Self::with_prefix(prefix, extract_speakers_with_prefix(text, prefix))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn entries(&self) -> &[SpeakerEntry] {
        &self.entries
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.label.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns false when the label is not part of this transcript
    pub fn rename(&mut self, label: &str, name: impl Into<String>) -> bool {
        let label = label_regex(&self.prefix)
            .captures(label)
            .map(|caps| normalize_with(&self.prefix, &caps[1]))
            .unwrap_or_else(|| label.to_string());
        match self.entries.iter_mut().find(|e| e.label == label) {
            Some(entry) => {
                entry.name = name.into().trim().to_string();
                true
            }
            None => false,
        }
    }

    /// `None` for unknown labels and labels left blank
    pub fn display_name(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.label == label && !e.name.is_empty())
            .map(|e| e.name.as_str())
    }

    pub fn has_renames(&self) -> bool {
        self.entries.iter().any(|e| !e.name.is_empty())
    }
}

/// Replaces every mapped label in one pass. Unmapped labels stay verbatim.
pub fn apply_speaker_map(text: &str, map: &SpeakerMap) -> String {
    if !map.has_renames() {
        return text.to_string();
    }
    label_regex(&map.prefix)
        .replace_all(text, |caps: &Captures| {
            let label = normalize_with(&map.prefix, &caps[1]);
            map.display_name(&label)
                .map(str::to_string)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
