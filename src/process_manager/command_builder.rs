// Engine command line rendering
// Flags are emitted in one fixed order so equal configs give identical argument vectors

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::EngineConfig;
use crate::error::ConfigError;
use crate::models::{AudioFilter, ComputeType, Device, JobConfig};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineCommand {
    pub executable: PathBuf,
    pub args: Vec<String>,
}

impl EngineCommand {
    pub fn preview(&self) -> String {
        preview_command(&self.executable, &self.args)
    }
}

/// Floats always carry a decimal point
fn fmt_float(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

fn push(args: &mut Vec<String>, name: &str, value: String) {
    args.push(name.to_string());
    args.push(value);
}

fn py_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Engine flags for the active filters, always in chain order.
/// Each filter kind has its own switch; inactive filters are left out.
pub fn filter_args(filters: &[AudioFilter]) -> Vec<String> {
    let mut active: Vec<&AudioFilter> = filters.iter().filter(|f| f.is_active()).collect();
    active.sort_by_key(|f| f.kind());

    let mut args = Vec::new();
    for filter in active {
        match filter {
            AudioFilter::SpeechNormalize => args.push("--ff_speechnorm".to_string()),
            AudioFilter::LoudnessNormalize => args.push("--ff_loudnorm".to_string()),
            AudioFilter::Bandpass => args.push("--ff_lowhighpass".to_string()),
            AudioFilter::Denoise { intensity } => push(&mut args, "--ff_fftdn", intensity.to_string()),
            AudioFilter::Tempo { factor } => push(&mut args, "--ff_tempo", fmt_float(*factor)),
        }
    }
    args
}

/// Renders the engine invocation for one job.
/// Settings are re-checked here; the input file is not touched.
pub fn build_command(config: &JobConfig, engine: &EngineConfig) -> Result<EngineCommand, ConfigError> {
    config.validate_settings()?;

    let mut args: Vec<String> = vec![config.input_path.to_string_lossy().to_string()];

    push(&mut args, "-o", config.output_dir().to_string_lossy().to_string());
    push(&mut args, "-m", config.model.as_str().to_string());
    if let Some(model_dir) = &engine.model_dir {
        push(&mut args, "--model_dir", model_dir.to_string_lossy().to_string());
    }
    push(&mut args, "--task", config.task.as_str().to_string());
    if !config.is_auto_language() {
        push(&mut args, "-l", config.language.to_lowercase());
    }

    args.push("-f".to_string());
    args.extend(config.output_formats.iter().map(|f| f.extension().to_string()));

    match &config.vad {
        Some(vad) => {
            push(&mut args, "--vad_method", vad.method.as_str().to_string());
            if let Some(threshold) = vad.threshold {
                push(&mut args, "--vad_threshold", fmt_float(threshold));
            }
        }
        None => push(&mut args, "--vad_filter", "False".to_string()),
    }

    if let Some(diarization) = &config.diarization {
        push(&mut args, "--diarize", diarization.method.as_str().to_string());
        let speakers = diarization.speakers;
        if let Some(exact) = speakers.exact {
            push(&mut args, "--num_speakers", exact.to_string());
        } else {
            if let Some(min) = speakers.min {
                push(&mut args, "--min_speakers", min.to_string());
            }
            if let Some(max) = speakers.max {
                push(&mut args, "--max_speakers", max.to_string());
            }
        }
        if diarization.has_custom_label() {
            push(&mut args, "--speaker", diarization.speaker_label.clone());
        }
        if diarization.device != Device::Auto {
            push(&mut args, "--diarize_device", diarization.device.as_str().to_string());
        }
        if diarization.threads > 0 {
            push(&mut args, "--diarize_threads", diarization.threads.to_string());
        }
        if diarization.after_filters {
            push(&mut args, "--diarize_ff", "True".to_string());
        }
    }

    push(&mut args, "--word_timestamps", py_bool(config.word_timestamps).to_string());
    if config.highlight_words {
        push(&mut args, "--highlight_words", "True".to_string());
    }

    args.extend(filter_args(&config.audio_filters));

    let decoding = &config.decoding;
    push(&mut args, "--temperature", fmt_float(decoding.temperature));
    push(&mut args, "--beam_size", decoding.beam_size.to_string());
    push(&mut args, "--best_of", decoding.best_of.to_string());
    push(&mut args, "--patience", fmt_float(decoding.patience));
    push(&mut args, "--length_penalty", fmt_float(decoding.length_penalty));
    push(&mut args, "--repetition_penalty", fmt_float(decoding.repetition_penalty));

    if config.device != Device::Auto {
        push(&mut args, "-d", config.device.as_str().to_string());
    }
    if config.compute_type != ComputeType::Auto {
        push(&mut args, "-ct", config.compute_type.as_str().to_string());
    }

    let formatting = &config.subtitle_formatting;
    push(&mut args, "--max_line_width", formatting.max_line_width.to_string());
    push(&mut args, "--max_line_count", formatting.max_line_count.to_string());
    push(&mut args, "--max_comma_cent", formatting.max_comma_percent.to_string());
    if config.effective_sentence_mode() {
        args.push("--sentence".to_string());
    }

    args.push("-pp".to_string());
    if config.verbose {
        push(&mut args, "-v", "True".to_string());
    }

    Ok(EngineCommand {
        executable: engine.executable.clone(),
        args,
    })
}

fn quote(part: &str) -> String {
    format!("\"{}\"", part.replace('"', "\\\""))
}

/// Shell-like display string. The executable is always quoted,
/// arguments only when they contain whitespace or are empty.
pub fn preview_command(executable: &Path, args: &[String]) -> String {
    let mut parts = vec![quote(&executable.to_string_lossy())];
    for arg in args {
        if arg.is_empty() || arg.chars().any(char::is_whitespace) {
            parts.push(quote(arg));
        } else {
            parts.push(arg.clone());
        }
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DiarizationMethod, DiarizationSettings, OutputFormat, SpeakerBounds, WhisperModel,
    };
    use crate::presets::Preset;
    use std::collections::BTreeSet;

    fn engine() -> EngineConfig {
        EngineConfig::new("/opt/fw/faster-whisper-xxl")
    }

    fn diarized(bounds: SpeakerBounds) -> JobConfig {
        let mut config = JobConfig::new("/in/meeting.wav", WhisperModel::LargeV2);
        config.diarization = Some(DiarizationSettings {
            speakers: bounds,
            ..DiarizationSettings::new(DiarizationMethod::PyannoteV31)
        });
        config
    }

    fn value_of<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_equal_configs_give_identical_args() {
        for preset in Preset::ALL {
            let a = preset.template("/in/a b.wav");
            let b = preset.template("/in/a b.wav");
            assert_eq!(a, b);
            assert_eq!(
                build_command(&a, &engine()).unwrap(),
                build_command(&b, &engine()).unwrap()
            );
        }
    }

    #[test]
    fn test_standard_preset_argument_vector() {
        let config = Preset::Standard.template("/in/talk.mp3");
        let cmd = build_command(&config, &engine()).unwrap();
        let expected: Vec<String> = [
            "/in/talk.mp3", "-o", "/in", "-m", "large-v2", "--task", "transcribe", "-l", "en",
            "-f", "txt", "--vad_method", "pyannote_v3", "--word_timestamps", "True",
            "--ff_loudnorm", "--temperature", "0.0", "--beam_size", "10", "--best_of",
            "5", "--patience", "5.0", "--length_penalty", "1.0", "--repetition_penalty", "1.0",
            "--max_line_width", "70", "--max_line_count", "3", "--max_comma_cent", "90",
            "--sentence", "-pp",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(cmd.args, expected);
    }

    #[test]
    fn test_exact_speakers_excludes_range_flags() {
        let cmd = build_command(&diarized(SpeakerBounds::exact(2)), &engine()).unwrap();
        assert_eq!(value_of(&cmd.args, "--num_speakers"), Some("2"));
        assert!(!cmd.args.iter().any(|a| a == "--min_speakers" || a == "--max_speakers"));
    }

    #[test]
    fn test_range_and_min_only_bounds() {
        let cmd = build_command(&diarized(SpeakerBounds::range(Some(2), Some(4))), &engine()).unwrap();
        assert_eq!(value_of(&cmd.args, "--min_speakers"), Some("2"));
        assert_eq!(value_of(&cmd.args, "--max_speakers"), Some("4"));
        assert!(!cmd.args.iter().any(|a| a == "--num_speakers"));

        let cmd = build_command(&diarized(SpeakerBounds::range(Some(3), None)), &engine()).unwrap();
        assert_eq!(value_of(&cmd.args, "--min_speakers"), Some("3"));
        assert!(!cmd.args.iter().any(|a| a == "--max_speakers"));
        assert!(cmd.args.iter().any(|a| a == "--sentence"));
    }

    #[test]
    fn test_conflicting_bounds_rejected_defensively() {
        let bounds = SpeakerBounds {
            exact: Some(2),
            min: Some(1),
            max: None,
        };
        assert_eq!(
            build_command(&diarized(bounds), &engine()),
            Err(ConfigError::ExactWithRange)
        );
    }

    #[test]
    fn test_auto_language_omits_flag() {
        let mut config = JobConfig::new("/in/a.wav", WhisperModel::Small);
        config.language = "auto".to_string();
        let cmd = build_command(&config, &engine()).unwrap();
        assert!(!cmd.args.iter().any(|a| a == "-l"));
        assert!(!cmd.args.iter().any(|a| a == "auto"));
    }

    #[test]
    fn test_each_filter_gets_its_own_flag_in_chain_order() {
        let filters = vec![
            AudioFilter::Denoise { intensity: 0 },
            AudioFilter::Tempo { factor: 1.25 },
            AudioFilter::Bandpass,
            AudioFilter::SpeechNormalize,
            AudioFilter::Denoise { intensity: 15 },
        ];
        assert_eq!(
            filter_args(&filters),
            ["--ff_speechnorm", "--ff_lowhighpass", "--ff_fftdn", "15", "--ff_tempo", "1.25"]
        );
        assert!(filter_args(&[AudioFilter::Tempo { factor: 1.0 }]).is_empty());
    }

    #[test]
    fn test_phone_preset_filter_flags() {
        let config = Preset::PhoneConversation.template("/in/call.wav");
        let cmd = build_command(&config, &engine()).unwrap();
        for flag in ["--ff_speechnorm", "--ff_loudnorm", "--ff_lowhighpass"] {
            assert!(cmd.args.iter().any(|a| a == flag), "{}", flag);
        }
        assert_eq!(value_of(&cmd.args, "--ff_fftdn"), Some("15"));
        assert!(!cmd.args.iter().any(|a| a.starts_with("--ff_") && a.contains('=')));
    }

    #[test]
    fn test_diarization_extras_and_engine_options() {
        let mut config = diarized(SpeakerBounds::exact(2));
        if let Some(diarization) = config.diarization.as_mut() {
            diarization.speaker_label = "Host".to_string();
            diarization.device = Device::Cuda;
            diarization.threads = 6;
            diarization.after_filters = true;
        }
        config.highlight_words = true;
        config.compute_type = ComputeType::Int8;
        config.verbose = true;

        let cmd = build_command(&config, &engine()).unwrap();
        assert_eq!(value_of(&cmd.args, "--speaker"), Some("Host"));
        assert_eq!(value_of(&cmd.args, "--diarize_device"), Some("cuda"));
        assert_eq!(value_of(&cmd.args, "--diarize_threads"), Some("6"));
        assert_eq!(value_of(&cmd.args, "--highlight_words"), Some("True"));
        assert_eq!(value_of(&cmd.args, "-ct"), Some("int8"));
        assert_eq!(&cmd.args[cmd.args.len() - 3..], ["-pp", "-v", "True"]);

        let position = |flag: &str| cmd.args.iter().position(|a| a == flag).unwrap();
        assert!(position("--num_speakers") < position("--speaker"));
        assert!(position("--diarize_threads") < position("--diarize_ff"));
        assert!(position("--word_timestamps") < position("--highlight_words"));

        let plain = build_command(&diarized(SpeakerBounds::default()), &engine()).unwrap();
        for flag in ["--speaker", "--diarize_device", "--diarize_threads", "--highlight_words", "-ct", "-v"] {
            assert!(!plain.args.iter().any(|a| a == flag), "{}", flag);
        }
    }

    #[test]
    fn test_vad_disabled_and_formats_sorted() {
        let mut config = JobConfig::new("/in/a.wav", WhisperModel::Tiny);
        config.vad = None;
        config.output_formats =
            BTreeSet::from([OutputFormat::Json, OutputFormat::Srt, OutputFormat::Txt]);
        let cmd = build_command(&config, &engine().with_model_dir("/models")).unwrap();
        assert_eq!(value_of(&cmd.args, "--vad_filter"), Some("False"));
        assert_eq!(value_of(&cmd.args, "--model_dir"), Some("/models"));
        let f = cmd.args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(&cmd.args[f + 1..f + 4], ["srt", "txt", "json"]);
    }

    #[test]
    fn test_preview_quotes_whitespace() {
        let preview = preview_command(
            Path::new("/opt/fw/faster-whisper-xxl"),
            &["/in/my talk.wav".to_string(), "-m".to_string(), "tiny".to_string()],
        );
        assert_eq!(preview, "\"/opt/fw/faster-whisper-xxl\" \"/in/my talk.wav\" -m tiny");
    }
}
