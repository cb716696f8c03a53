// Per-file job configuration models
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::media::{is_supported_media, media_extension};
use crate::transcript::DEFAULT_SPEAKER_PREFIX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Srt,
    Vtt,
    Txt,
    Json,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [Self::Srt, Self::Vtt, Self::Txt, Self::Json];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Vtt => "vtt",
            Self::Txt => "txt",
            Self::Json => "json",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(ext))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WhisperModel {
    #[serde(rename = "tiny")]
    Tiny,
    #[serde(rename = "base")]
    Base,
    #[serde(rename = "small")]
    Small,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "large-v1")]
    LargeV1,
    #[serde(rename = "large-v2")]
    LargeV2,
    #[serde(rename = "large-v3")]
    LargeV3,
    #[serde(rename = "large-v3-turbo", alias = "turbo")]
    LargeV3Turbo,
}

impl WhisperModel {
    pub const ALL: [WhisperModel; 8] = [
        Self::Tiny,
        Self::Base,
        Self::Small,
        Self::Medium,
        Self::LargeV1,
        Self::LargeV2,
        Self::LargeV3,
        Self::LargeV3Turbo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tiny => "tiny",
            Self::Base => "base",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::LargeV1 => "large-v1",
            Self::LargeV2 => "large-v2",
            Self::LargeV3 => "large-v3",
            Self::LargeV3Turbo => "large-v3-turbo",
        }
    }

    pub fn is_large(self) -> bool {
        matches!(
            self,
            Self::LargeV1 | Self::LargeV2 | Self::LargeV3 | Self::LargeV3Turbo
        )
    }
}

impl fmt::Display for WhisperModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    #[default]
    Transcribe,
    Translate,
}

impl Task {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transcribe => "transcribe",
            Self::Translate => "translate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    #[default]
    Auto,
    Cpu,
    Cuda,
}

impl Device {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Cpu => "cpu",
            Self::Cuda => "cuda",
        }
    }
}

/// Model quantization passed with `-ct`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeType {
    #[default]
    Auto,
    Default,
    Int8,
    Float16,
    Float32,
}

impl ComputeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Default => "default",
            Self::Int8 => "int8",
            Self::Float16 => "float16",
            Self::Float32 => "float32",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiarizationMethod {
    #[serde(rename = "pyannote_v3.1")]
    PyannoteV31,
    #[serde(rename = "pyannote_v3.0")]
    PyannoteV30,
    #[serde(rename = "reverb_v2")]
    ReverbV2,
    #[serde(rename = "reverb_v1")]
    ReverbV1,
}

impl DiarizationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PyannoteV31 => "pyannote_v3.1",
            Self::PyannoteV30 => "pyannote_v3.0",
            Self::ReverbV2 => "reverb_v2",
            Self::ReverbV1 => "reverb_v1",
        }
    }
}

/// Speaker-count hints. `exact` is exclusive with a `min`/`max` range,
/// except that a bound equal to `exact` is tolerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpeakerBounds {
    #[serde(default)]
    pub exact: Option<u32>,
    #[serde(default)]
    pub min: Option<u32>,
    #[serde(default)]
    pub max: Option<u32>,
}

impl SpeakerBounds {
    pub fn exact(count: u32) -> Self {
        Self {
            exact: Some(count),
            ..Self::default()
        }
    }

    pub fn range(min: Option<u32>, max: Option<u32>) -> Self {
        Self {
            exact: None,
            min,
            max,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.exact.is_none() && self.min.is_none() && self.max.is_none()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if [self.exact, self.min, self.max].contains(&Some(0)) {
            return Err(ConfigError::ZeroSpeakers);
        }

        if let Some(exact) = self.exact {
            let conflicting = |bound: Option<u32>| bound.map_or(false, |b| b != exact);
            if conflicting(self.min) || conflicting(self.max) {
                return Err(ConfigError::ExactWithRange);
            }
        }

        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(ConfigError::MinAboveMax { min, max });
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiarizationSettings {
    pub method: DiarizationMethod,
    #[serde(default)]
    pub speakers: SpeakerBounds,
    /// Run diarization on the filtered audio rather than the raw input
    #[serde(default)]
    pub after_filters: bool,
    /// Label prefix written into transcripts, `SPEAKER` unless changed
    #[serde(default = "default_speaker_label")]
    pub speaker_label: String,
    #[serde(default)]
    pub device: Device,
    /// 0 lets the engine pick
    #[serde(default)]
    pub threads: u32,
}

fn default_speaker_label() -> String {
    DEFAULT_SPEAKER_PREFIX.to_string()
}

impl DiarizationSettings {
    pub const MAX_THREADS: u32 = 32;

    pub fn new(method: DiarizationMethod) -> Self {
        Self {
            method,
            speakers: SpeakerBounds::default(),
            after_filters: false,
            speaker_label: default_speaker_label(),
            device: Device::Auto,
            threads: 0,
        }
    }

    pub fn has_custom_label(&self) -> bool {
        self.speaker_label != DEFAULT_SPEAKER_PREFIX
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.speakers.validate()?;
        let label = self.speaker_label.as_str();
        let valid = !label.is_empty()
            && label.len() <= 32
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid {
            return Err(ConfigError::InvalidSpeakerLabel(self.speaker_label.clone()));
        }
        let threads = self.threads as f64;
        check_range(
            "diarize_threads",
            "between 0 and 32",
            threads,
            self.threads <= Self::MAX_THREADS,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VadMethod {
    SileroV4Fw,
    SileroV5Fw,
    PyannoteV3,
    Webrtc,
    Auditok,
}

impl VadMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SileroV4Fw => "silero_v4_fw",
            Self::SileroV5Fw => "silero_v5_fw",
            Self::PyannoteV3 => "pyannote_v3",
            Self::Webrtc => "webrtc",
            Self::Auditok => "auditok",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VadSettings {
    pub method: VadMethod,
    #[serde(default)]
    pub threshold: Option<f64>,
}

impl Default for VadSettings {
    fn default() -> Self {
        Self {
            method: VadMethod::SileroV4Fw,
            threshold: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodingParams {
    pub beam_size: u32,
    pub patience: f64,
    pub temperature: f64,
    pub best_of: u32,
    pub length_penalty: f64,
    pub repetition_penalty: f64,
}

impl Default for DecodingParams {
    fn default() -> Self {
        Self {
            beam_size: 5,
            patience: 2.0,
            temperature: 0.0,
            best_of: 5,
            length_penalty: 1.0,
            repetition_penalty: 1.0,
        }
    }
}

fn check_range(
    name: &'static str,
    expected: &'static str,
    value: f64,
    ok: bool,
) -> Result<(), ConfigError> {
    if ok && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            expected,
            value,
        })
    }
}

impl DecodingParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let beam = self.beam_size as f64;
        check_range("beam_size", "between 1 and 10", beam, (1.0..=10.0).contains(&beam))?;
        let best_of = self.best_of as f64;
        check_range("best_of", "between 1 and 10", best_of, (1.0..=10.0).contains(&best_of))?;
        check_range(
            "patience",
            "greater than 0 and at most 10",
            self.patience,
            self.patience > 0.0 && self.patience <= 10.0,
        )?;
        check_range(
            "temperature",
            "between 0 and 1",
            self.temperature,
            (0.0..=1.0).contains(&self.temperature),
        )?;
        check_range(
            "length_penalty",
            "between 0 and 2",
            self.length_penalty,
            (0.0..=2.0).contains(&self.length_penalty),
        )?;
        check_range(
            "repetition_penalty",
            "greater than 0 and at most 2",
            self.repetition_penalty,
            self.repetition_penalty > 0.0 && self.repetition_penalty <= 2.0,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    SpeechNormalize,
    LoudnessNormalize,
    Bandpass,
    Denoise,
    Tempo,
}

impl FilterKind {
    /// Canonical chain order used when filters are planned from several sources
    pub const CHAIN_ORDER: [FilterKind; 5] = [
        Self::SpeechNormalize,
        Self::LoudnessNormalize,
        Self::Bandpass,
        Self::Denoise,
        Self::Tempo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::SpeechNormalize => "speech_normalize",
            Self::LoudnessNormalize => "loudness_normalize",
            Self::Bandpass => "bandpass",
            Self::Denoise => "denoise",
            Self::Tempo => "tempo",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AudioFilter {
    SpeechNormalize,
    LoudnessNormalize,
    /// Keeps the speech band only. The engine's band is fixed at 50 to 7800 Hz.
    Bandpass,
    /// 0 disables the filter
    Denoise { intensity: u32 },
    /// 1.0 disables the filter
    Tempo { factor: f64 },
}

impl AudioFilter {
    pub const BANDPASS_LOW_HZ: u32 = 50;
    pub const BANDPASS_HIGH_HZ: u32 = 7800;

    pub fn kind(&self) -> FilterKind {
        match self {
            Self::SpeechNormalize => FilterKind::SpeechNormalize,
            Self::LoudnessNormalize => FilterKind::LoudnessNormalize,
            Self::Bandpass => FilterKind::Bandpass,
            Self::Denoise { .. } => FilterKind::Denoise,
            Self::Tempo { .. } => FilterKind::Tempo,
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Self::Denoise { intensity } => *intensity > 0,
            Self::Tempo { factor } => (*factor - 1.0).abs() > f64::EPSILON,
            _ => true,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Denoise { intensity } => check_range(
                "denoise",
                "between 0 and 97",
                *intensity as f64,
                *intensity <= 97,
            ),
            Self::Tempo { factor } => check_range(
                "tempo",
                "between 0.5 and 2.0",
                *factor,
                (0.5..=2.0).contains(factor),
            ),
            Self::SpeechNormalize | Self::LoudnessNormalize | Self::Bandpass => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleFormatting {
    pub max_line_width: u32,
    pub max_line_count: u32,
    pub max_comma_percent: u32,
    pub sentence_mode: bool,
}

impl Default for SubtitleFormatting {
    fn default() -> Self {
        Self {
            max_line_width: 42,
            max_line_count: 2,
            max_comma_percent: 70,
            sentence_mode: false,
        }
    }
}

impl SubtitleFormatting {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let width = self.max_line_width as f64;
        check_range("max_line_width", "between 1 and 200", width, (1.0..=200.0).contains(&width))?;
        let count = self.max_line_count as f64;
        check_range("max_line_count", "between 1 and 10", count, (1.0..=10.0).contains(&count))?;
        let comma = self.max_comma_percent as f64;
        check_range(
            "max_comma_percent",
            "between 20 and 100",
            comma,
            (20.0..=100.0).contains(&comma),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLocation {
    /// Next to the input file
    #[default]
    Source,
    Directory(PathBuf),
}

/// Adjustments applied while building a config. Reported, never silent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigNotice {
    SentenceModeForcedByDiarization,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    pub input_path: PathBuf,
    #[serde(default)]
    pub output_location: OutputLocation,
    pub output_formats: BTreeSet<OutputFormat>,
    pub model: WhisperModel,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub task: Task,
    #[serde(default)]
    pub diarization: Option<DiarizationSettings>,
    #[serde(default = "default_vad")]
    pub vad: Option<VadSettings>,
    #[serde(default = "default_true")]
    pub word_timestamps: bool,
    #[serde(default)]
    pub decoding: DecodingParams,
    #[serde(default)]
    pub audio_filters: Vec<AudioFilter>,
    #[serde(default)]
    pub subtitle_formatting: SubtitleFormatting,
    #[serde(default)]
    pub device: Device,
    #[serde(default)]
    pub compute_type: ComputeType,
    /// Karaoke-style word highlighting in subtitles
    #[serde(default)]
    pub highlight_words: bool,
    #[serde(default)]
    pub verbose: bool,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_vad() -> Option<VadSettings> {
    Some(VadSettings::default())
}

fn default_true() -> bool {
    true
}

pub const AUTO_LANGUAGE: &str = "auto";

impl JobConfig {
    pub fn new(input_path: impl Into<PathBuf>, model: WhisperModel) -> Self {
        Self {
            input_path: input_path.into(),
            output_location: OutputLocation::Source,
            output_formats: BTreeSet::from([OutputFormat::Txt]),
            model,
            language: default_language(),
            task: Task::default(),
            diarization: None,
            vad: default_vad(),
            word_timestamps: true,
            decoding: DecodingParams::default(),
            audio_filters: Vec::new(),
            subtitle_formatting: SubtitleFormatting::default(),
            device: Device::default(),
            compute_type: ComputeType::default(),
            highlight_words: false,
            verbose: false,
        }
    }

    pub fn is_auto_language(&self) -> bool {
        self.language.eq_ignore_ascii_case(AUTO_LANGUAGE)
    }

    /// Diarized runs always segment by sentence
    pub fn effective_sentence_mode(&self) -> bool {
        self.subtitle_formatting.sentence_mode || self.diarization.is_some()
    }

    pub fn input_stem(&self) -> String {
        self.input_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn output_dir(&self) -> PathBuf {
        match &self.output_location {
            OutputLocation::Directory(dir) => dir.clone(),
            OutputLocation::Source => self
                .input_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        }
    }

    /// `<output_dir>/<stem>`; two jobs sharing this key would overwrite each other.
    /// The directory is canonicalized when it exists so aliases compare equal.
    pub fn output_key(&self) -> PathBuf {
        let dir = self.output_dir();
        std::fs::canonicalize(&dir)
            .unwrap_or(dir)
            .join(self.input_stem())
    }

    pub fn expected_outputs(&self) -> Vec<PathBuf> {
        let dir = self.output_dir();
        let stem = self.input_stem();
        self.output_formats
            .iter()
            .map(|f| dir.join(format!("{}.{}", stem, f.extension())))
            .collect()
    }

    pub fn active_filters(&self) -> impl Iterator<Item = &AudioFilter> {
        self.audio_filters.iter().filter(|f| f.is_active())
    }

    /// Checks the input file on disk, then every setting
    pub fn validate(&self) -> Result<Vec<ConfigNotice>, ConfigError> {
        self.validate_input()?;
        self.validate_settings()
    }

    pub fn validate_input(&self) -> Result<(), ConfigError> {
        if !self.input_path.is_absolute() {
            return Err(ConfigError::InputNotAbsolute(self.input_path.clone()));
        }
        if !self.input_path.is_file() {
            return Err(ConfigError::InputNotFound(self.input_path.clone()));
        }
        if !is_supported_media(&self.input_path) {
            return Err(ConfigError::UnsupportedFormat {
                path: self.input_path.clone(),
                extension: media_extension(&self.input_path).unwrap_or_default(),
            });
        }
        Ok(())
    }

    /// Setting checks only; never touches the filesystem
    pub fn validate_settings(&self) -> Result<Vec<ConfigNotice>, ConfigError> {
        if self.output_formats.is_empty() {
            return Err(ConfigError::NoOutputFormats);
        }

        if !self.is_auto_language() {
            let code = self.language.as_str();
            let valid = (2..=3).contains(&code.len()) && code.chars().all(|c| c.is_ascii_alphabetic());
            if !valid {
                return Err(ConfigError::InvalidLanguage(self.language.clone()));
            }
        }

        if let Some(diarization) = &self.diarization {
            diarization.validate()?;
        }

        if let Some(threshold) = self.vad.as_ref().and_then(|v| v.threshold) {
            check_range(
                "vad_threshold",
                "between 0 and 1",
                threshold,
                (0.0..=1.0).contains(&threshold),
            )?;
        }

        self.decoding.validate()?;
        self.subtitle_formatting.validate()?;

        let mut seen = BTreeSet::new();
        for filter in &self.audio_filters {
            if !seen.insert(filter.kind()) {
                return Err(ConfigError::DuplicateFilter(filter.kind().name()));
            }
            filter.validate()?;
        }

        let mut notices = Vec::new();
        if self.diarization.is_some() && !self.subtitle_formatting.sentence_mode {
            notices.push(ConfigNotice::SentenceModeForcedByDiarization);
        }
        Ok(notices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JobConfig {
        JobConfig::new("/media/interview.wav", WhisperModel::LargeV2)
    }

    #[test]
    fn test_exact_speakers_with_conflicting_range_rejected() {
        let bounds = SpeakerBounds {
            exact: Some(2),
            min: Some(1),
            max: None,
        };
        assert_eq!(bounds.validate(), Err(ConfigError::ExactWithRange));

        let bounds = SpeakerBounds {
            exact: Some(2),
            min: None,
            max: Some(3),
        };
        assert_eq!(bounds.validate(), Err(ConfigError::ExactWithRange));
    }

    #[test]
    fn test_exact_speakers_with_equal_bounds_accepted() {
        let bounds = SpeakerBounds {
            exact: Some(2),
            min: Some(2),
            max: Some(2),
        };
        assert!(bounds.validate().is_ok());
    }

    #[test]
    fn test_min_above_max_rejected() {
        let bounds = SpeakerBounds::range(Some(4), Some(2));
        assert_eq!(bounds.validate(), Err(ConfigError::MinAboveMax { min: 4, max: 2 }));
        assert_eq!(SpeakerBounds::exact(0).validate(), Err(ConfigError::ZeroSpeakers));
    }

    #[test]
    fn test_out_of_range_decoding_is_error_not_clamped() {
        let mut cfg = config();
        cfg.decoding.beam_size = 0;
        assert!(matches!(
            cfg.validate_settings(),
            Err(ConfigError::OutOfRange { name: "beam_size", .. })
        ));

        let mut cfg = config();
        cfg.decoding.patience = 0.0;
        assert!(matches!(
            cfg.validate_settings(),
            Err(ConfigError::OutOfRange { name: "patience", .. })
        ));
        assert_eq!(cfg.decoding.patience, 0.0);
    }

    #[test]
    fn test_diarization_label_and_threads() {
        let mut cfg = config();
        let mut diarization = DiarizationSettings::new(DiarizationMethod::ReverbV2);
        assert!(!diarization.has_custom_label());
        diarization.speaker_label = "Host".to_string();
        diarization.threads = 8;
        assert!(diarization.has_custom_label());
        cfg.diarization = Some(diarization.clone());
        assert!(cfg.validate_settings().is_ok());

        diarization.threads = 33;
        cfg.diarization = Some(diarization.clone());
        assert!(matches!(
            cfg.validate_settings(),
            Err(ConfigError::OutOfRange { name: "diarize_threads", .. })
        ));

        diarization.threads = 0;
        diarization.speaker_label = "Host Name".to_string();
        cfg.diarization = Some(diarization);
        assert_eq!(
            cfg.validate_settings(),
            Err(ConfigError::InvalidSpeakerLabel("Host Name".to_string()))
        );
    }

    #[test]
    fn test_duplicate_filter_rejected() {
        let mut cfg = config();
        cfg.audio_filters = vec![
            AudioFilter::Denoise { intensity: 12 },
            AudioFilter::LoudnessNormalize,
            AudioFilter::Denoise { intensity: 20 },
        ];
        assert_eq!(
            cfg.validate_settings(),
            Err(ConfigError::DuplicateFilter("denoise"))
        );
    }

    #[test]
    fn test_filter_ranges() {
        assert!(AudioFilter::Denoise { intensity: 98 }.validate().is_err());
        assert!(AudioFilter::Tempo { factor: 2.5 }.validate().is_err());
        assert!(AudioFilter::Tempo { factor: 0.5 }.validate().is_ok());
        assert!(AudioFilter::Bandpass.validate().is_ok());
        assert!(!AudioFilter::Tempo { factor: 1.0 }.is_active());
        assert!(!AudioFilter::Denoise { intensity: 0 }.is_active());
    }

    #[test]
    fn test_diarization_forces_sentence_mode_with_notice() {
        let mut cfg = config();
        cfg.diarization = Some(DiarizationSettings::new(DiarizationMethod::PyannoteV31));
        assert!(!cfg.subtitle_formatting.sentence_mode);
        assert!(cfg.effective_sentence_mode());
        assert_eq!(
            cfg.validate_settings().unwrap(),
            vec![ConfigNotice::SentenceModeForcedByDiarization]
        );
    }

    #[test]
    fn test_language_codes() {
        let mut cfg = config();
        cfg.language = "auto".to_string();
        assert!(cfg.validate_settings().is_ok());
        cfg.language = "english".to_string();
        assert_eq!(
            cfg.validate_settings(),
            Err(ConfigError::InvalidLanguage("english".to_string()))
        );
    }

    #[test]
    fn test_expected_outputs_next_to_source() {
        let mut cfg = config();
        cfg.output_formats = BTreeSet::from([OutputFormat::Txt, OutputFormat::Srt]);
        assert_eq!(
            cfg.expected_outputs(),
            vec![
                PathBuf::from("/media/interview.srt"),
                PathBuf::from("/media/interview.txt"),
            ]
        );
        assert_eq!(cfg.output_key(), PathBuf::from("/media/interview"));
    }

    #[test]
    fn test_output_key_resolves_directory_aliases() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = std::fs::canonicalize(tmp.path()).unwrap();
        std::fs::create_dir_all(dir.join("sub")).unwrap();

        let plain = JobConfig::new(dir.join("a.wav"), WhisperModel::Small);
        let dotted = JobConfig::new(dir.join("sub").join("..").join("a.wav"), WhisperModel::Small);
        assert_eq!(plain.output_key(), dotted.output_key());
        assert_eq!(plain.output_key(), dir.join("a"));
    }

    #[test]
    fn test_model_serde_accepts_legacy_turbo_alias() {
        let model: WhisperModel = serde_json::from_str("\"turbo\"").unwrap();
        assert_eq!(model, WhisperModel::LargeV3Turbo);
        assert_eq!(serde_json::to_string(&model).unwrap(), "\"large-v3-turbo\"");
    }
}
