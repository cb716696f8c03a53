//! Named presets and the consuming `JobConfig` builder

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::models::{
    AudioFilter, ComputeType, ConfigNotice, DecodingParams, Device, DiarizationMethod,
    DiarizationSettings, JobConfig, OutputFormat, OutputLocation, SpeakerBounds,
    SubtitleFormatting, Task, VadMethod, VadSettings, WhisperModel,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preset {
    Standard,
    Turbo,
    Diarize,
    #[serde(rename = "Phone Conversation Audio")]
    PhoneConversation,
    Custom,
}

impl Preset {
    pub const ALL: [Preset; 5] = [
        Self::Standard,
        Self::Turbo,
        Self::Diarize,
        Self::PhoneConversation,
        Self::Custom,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::Turbo => "Turbo",
            Self::Diarize => "Diarize",
            Self::PhoneConversation => "Phone Conversation Audio",
            Self::Custom => "Custom",
        }
    }

    /// Unknown names resolve to Custom
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(name.trim()))
            .unwrap_or(Self::Custom)
    }

    pub fn default_filters(self) -> Vec<AudioFilter> {
        match self {
            Self::Standard | Self::Turbo | Self::Diarize => vec![AudioFilter::LoudnessNormalize],
            Self::PhoneConversation => vec![
                AudioFilter::SpeechNormalize,
                AudioFilter::LoudnessNormalize,
                AudioFilter::Bandpass,
                AudioFilter::Denoise { intensity: 15 },
            ],
            Self::Custom => Vec::new(),
        }
    }

    /// Base configuration for `input`, filters included
    pub fn template(self, input: impl Into<PathBuf>) -> JobConfig {
        let standard_formatting = SubtitleFormatting {
            max_line_width: 70,
            max_line_count: 3,
            max_comma_percent: 90,
            sentence_mode: true,
        };
        let txt = BTreeSet::from([OutputFormat::Txt]);
        let pyannote_vad = Some(VadSettings {
            method: VadMethod::PyannoteV3,
            threshold: None,
        });
        let subtitles = BTreeSet::from([OutputFormat::Txt, OutputFormat::Srt, OutputFormat::Vtt]);

        let mut config = match self {
            Self::Standard | Self::Diarize => {
                let mut config = JobConfig::new(input, WhisperModel::LargeV2);
                config.decoding = DecodingParams {
                    beam_size: 10,
                    patience: 5.0,
                    temperature: 0.0,
                    ..DecodingParams::default()
                };
                config.subtitle_formatting = standard_formatting;
                config.vad = pyannote_vad;
                config.output_formats = txt;
                if self == Self::Diarize {
                    config.diarization =
                        Some(DiarizationSettings::new(DiarizationMethod::PyannoteV31));
                    config.output_formats = subtitles;
                }
                config
            }
            Self::Turbo => {
                let mut config = JobConfig::new(input, WhisperModel::LargeV3Turbo);
                config.decoding = DecodingParams {
                    beam_size: 5,
                    patience: 2.0,
                    ..DecodingParams::default()
                };
                config.output_formats = txt;
                config
            }
            Self::PhoneConversation => {
                let mut config = JobConfig::new(input, WhisperModel::LargeV2);
                config.decoding = DecodingParams {
                    beam_size: 8,
                    patience: 4.0,
                    temperature: 0.0,
                    ..DecodingParams::default()
                };
                config.diarization = Some(DiarizationSettings::new(DiarizationMethod::PyannoteV31));
                config.vad = pyannote_vad;
                config.output_formats = subtitles;
                config
            }
            Self::Custom => JobConfig::new(input, WhisperModel::LargeV2),
        };
        config.audio_filters = self.default_filters();
        config
    }
}

pub fn preset_names() -> Vec<&'static str> {
    Preset::ALL.iter().map(|p| p.name()).collect()
}

impl JobConfig {
    pub fn from_preset(input: impl Into<PathBuf>, preset: Preset) -> Self {
        preset.template(input)
    }
}

/// Consuming builder over a preset template
#[derive(Debug, Clone)]
pub struct JobConfigBuilder {
    config: JobConfig,
}

impl JobConfigBuilder {
    pub fn new(input: impl Into<PathBuf>, preset: Preset) -> Self {
        Self {
            config: preset.template(input),
        }
    }

    pub fn model(mut self, model: WhisperModel) -> Self {
        self.config.model = model;
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.config.language = language.into();
        self
    }

    pub fn task(mut self, task: Task) -> Self {
        self.config.task = task;
        self
    }

    pub fn output_formats(mut self, formats: impl IntoIterator<Item = OutputFormat>) -> Self {
        self.config.output_formats = formats.into_iter().collect();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_location = OutputLocation::Directory(dir.into());
        self
    }

    pub fn diarization(mut self, method: Option<DiarizationMethod>) -> Self {
        let previous = self.config.diarization.take();
        self.config.diarization = method.map(|method| match previous {
            Some(settings) => DiarizationSettings { method, ..settings },
            None => DiarizationSettings::new(method),
        });
        self
    }

    /// Ignored unless diarization is enabled
    pub fn speakers(mut self, bounds: SpeakerBounds) -> Self {
        if let Some(diarization) = self.config.diarization.as_mut() {
            diarization.speakers = bounds;
        }
        self
    }

    pub fn diarize_after_filters(mut self, enabled: bool) -> Self {
        if let Some(diarization) = self.config.diarization.as_mut() {
            diarization.after_filters = enabled;
        }
        self
    }

    pub fn vad(mut self, vad: Option<VadSettings>) -> Self {
        self.config.vad = vad;
        self
    }

    pub fn word_timestamps(mut self, enabled: bool) -> Self {
        self.config.word_timestamps = enabled;
        self
    }

    pub fn decoding(mut self, decoding: DecodingParams) -> Self {
        self.config.decoding = decoding;
        self
    }

    pub fn audio_filters(mut self, filters: Vec<AudioFilter>) -> Self {
        self.config.audio_filters = filters;
        self
    }

    pub fn subtitle_formatting(mut self, formatting: SubtitleFormatting) -> Self {
        self.config.subtitle_formatting = formatting;
        self
    }

    pub fn device(mut self, device: Device) -> Self {
        self.config.device = device;
        self
    }

    pub fn compute_type(mut self, compute_type: ComputeType) -> Self {
        self.config.compute_type = compute_type;
        self
    }

    pub fn highlight_words(mut self, enabled: bool) -> Self {
        self.config.highlight_words = enabled;
        self
    }

    pub fn verbose(mut self, enabled: bool) -> Self {
        self.config.verbose = enabled;
        self
    }

    /// Ignored unless diarization is enabled
    pub fn speaker_label(mut self, label: impl Into<String>) -> Self {
        if let Some(diarization) = self.config.diarization.as_mut() {
            diarization.speaker_label = label.into();
        }
        self
    }

    /// Ignored unless diarization is enabled
    pub fn diarize_device(mut self, device: Device, threads: u32) -> Self {
        if let Some(diarization) = self.config.diarization.as_mut() {
            diarization.device = device;
            diarization.threads = threads;
        }
        self
    }

    /// Validates and applies the sentence-mode override for diarized runs
    pub fn build(self) -> Result<(JobConfig, Vec<ConfigNotice>), ConfigError> {
        let mut config = self.config;
        let notices = config.validate()?;
        if notices.contains(&ConfigNotice::SentenceModeForcedByDiarization) {
            config.subtitle_formatting.sentence_mode = true;
        }
        Ok((config, notices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_names_in_order() {
        assert_eq!(
            preset_names(),
            vec!["Standard", "Turbo", "Diarize", "Phone Conversation Audio", "Custom"]
        );
        assert_eq!(Preset::from_name("phone conversation audio"), Preset::PhoneConversation);
        assert_eq!(Preset::from_name("Podcast"), Preset::Custom);
    }

    #[test]
    fn test_phone_preset_filters() {
        let config = JobConfig::from_preset("/in/call.wav", Preset::PhoneConversation);
        assert_eq!(config.decoding.beam_size, 8);
        assert_eq!(
            config.audio_filters,
            vec![
                AudioFilter::SpeechNormalize,
                AudioFilter::LoudnessNormalize,
                AudioFilter::Bandpass,
                AudioFilter::Denoise { intensity: 15 },
            ]
        );
        assert!(config.diarization.is_some());
    }

    #[test]
    fn test_preset_vad_methods() {
        let vad = |preset: Preset| preset.template("/in/a.wav").vad.map(|v| v.method);
        assert_eq!(vad(Preset::Standard), Some(VadMethod::PyannoteV3));
        assert_eq!(vad(Preset::Diarize), Some(VadMethod::PyannoteV3));
        assert_eq!(vad(Preset::PhoneConversation), Some(VadMethod::PyannoteV3));
        assert_eq!(vad(Preset::Turbo), Some(VadMethod::SileroV4Fw));
    }

    #[test]
    fn test_every_preset_template_passes_setting_checks() {
        for preset in Preset::ALL {
            let config = preset.template("/in/a.wav");
            assert!(config.validate_settings().is_ok(), "{}", preset.name());
        }
    }

    #[test]
    fn test_builder_forces_sentence_mode_for_diarization() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("panel.mp3");
        std::fs::write(&input, b"x").unwrap();

        let (config, notices) = JobConfigBuilder::new(&input, Preset::Turbo)
            .diarization(Some(DiarizationMethod::ReverbV2))
            .speakers(SpeakerBounds::exact(3))
            .speaker_label("Guest")
            .diarize_device(Device::Cuda, 4)
            .compute_type(ComputeType::Float16)
            .build()
            .unwrap();
        assert!(config.subtitle_formatting.sentence_mode);
        assert_eq!(notices, vec![ConfigNotice::SentenceModeForcedByDiarization]);
        assert_eq!(config.compute_type, ComputeType::Float16);
        let diarization = config.diarization.unwrap();
        assert_eq!(diarization.speakers.exact, Some(3));
        assert_eq!(diarization.speaker_label, "Guest");
        assert_eq!((diarization.device, diarization.threads), (Device::Cuda, 4));
    }

    #[test]
    fn test_builder_rejects_missing_input() {
        let err = JobConfigBuilder::new("/definitely/not/here.wav", Preset::Standard)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InputNotFound(_)));
    }
}
