//! Pre-run advisories. These flag questionable settings and never block a job.

use serde::{Deserialize, Serialize};

use crate::models::{AudioFilter, Device, JobConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryLevel {
    Info,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryKind {
    AutoLanguage,
    UnboundedSpeakers,
    CpuWithLargeModel,
    AggressiveFilters,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    pub kind: AdvisoryKind,
    pub level: AdvisoryLevel,
    pub message: String,
}

impl Advisory {
    fn new(kind: AdvisoryKind, level: AdvisoryLevel, message: impl Into<String>) -> Self {
        Self {
            kind,
            level,
            message: message.into(),
        }
    }
}

pub fn advise(config: &JobConfig, gpu_available: bool) -> Vec<Advisory> {
    let mut advisories = Vec::new();

    if config.is_auto_language() {
        advisories.push(Advisory::new(
            AdvisoryKind::AutoLanguage,
            AdvisoryLevel::Info,
            "Language auto-detection uses the first 30 seconds only; set the language explicitly for better accuracy",
        ));
    }

    if let Some(diarization) = &config.diarization {
        if diarization.speakers.is_unbounded() {
            advisories.push(Advisory::new(
                AdvisoryKind::UnboundedSpeakers,
                AdvisoryLevel::Warning,
                "Diarization without a speaker count often merges or splits speakers; set an exact count or a range if known",
            ));
        }
    }

    if config.device == Device::Cpu && config.model.is_large() && gpu_available {
        advisories.push(Advisory::new(
            AdvisoryKind::CpuWithLargeModel,
            AdvisoryLevel::Warning,
            format!(
                "Model {} on CPU will be very slow while a CUDA GPU is available",
                config.model
            ),
        ));
    }

    let aggressive = config.active_filters().any(|f| {
        matches!(f, AudioFilter::Denoise { .. } | AudioFilter::Bandpass)
    });
    if aggressive {
        advisories.push(Advisory::new(
            AdvisoryKind::AggressiveFilters,
            AdvisoryLevel::Info,
            "Denoise and bandpass filters can remove speech detail on clean recordings",
        ));
    }

    advisories
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DiarizationMethod, DiarizationSettings, SpeakerBounds, WhisperModel};
    use crate::presets::Preset;

    fn kinds(advisories: &[Advisory]) -> Vec<AdvisoryKind> {
        advisories.iter().map(|a| a.kind).collect()
    }

    #[test]
    fn test_standard_preset_is_clean() {
        let config = Preset::Standard.template("/in/a.wav");
        assert!(advise(&config, true).is_empty());
    }

    #[test]
    fn test_phone_preset_flags_speakers_and_filters() {
        let config = Preset::PhoneConversation.template("/in/call.wav");
        assert_eq!(
            kinds(&advise(&config, false)),
            vec![AdvisoryKind::UnboundedSpeakers, AdvisoryKind::AggressiveFilters]
        );
    }

    #[test]
    fn test_cpu_large_model_only_warned_with_gpu() {
        let mut config = JobConfig::new("/in/a.wav", WhisperModel::LargeV3);
        config.device = Device::Cpu;
        config.language = "auto".to_string();
        assert_eq!(
            kinds(&advise(&config, true)),
            vec![AdvisoryKind::AutoLanguage, AdvisoryKind::CpuWithLargeModel]
        );
        assert_eq!(kinds(&advise(&config, false)), vec![AdvisoryKind::AutoLanguage]);
    }

    #[test]
    fn test_bounded_speakers_not_flagged() {
        let mut config = JobConfig::new("/in/a.wav", WhisperModel::Medium);
        config.diarization = Some(DiarizationSettings {
            speakers: SpeakerBounds::exact(2),
            ..DiarizationSettings::new(DiarizationMethod::ReverbV1)
        });
        assert!(advise(&config, false).is_empty());
    }
}
