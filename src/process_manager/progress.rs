// Engine output parsing
// Turns raw engine lines into progress events; everything else stays log text

use regex::Regex;

use crate::models::{ProgressEvent, ProgressPhase};

lazy_static::lazy_static! {
    // Percent at the start of a line, optionally after one label word:
    // ` 45% | 81/180 | ...`, `Progress: 12.5% done`, `Diarization 10%`
    static ref PERCENT: Regex = Regex::new(
        r"(?i)^\s*(?:[a-z]+:?\s+)?(\d{1,3}(?:\.\d+)?)\s*%(?:\s*\||\s*$|\s+(?:done|complete|completed)\b)"
    )
    .unwrap();
    // Transcript segments echoed by the engine: `[00:01.000 --> 00:03.000] ...`
    static ref SEGMENT: Regex =
        Regex::new(r"^\s*\[\s*(?:\d+:)?\d{1,2}:\d{2}[.,]\d{3}\s*-->").unwrap();
    // `ETA: 01:23`, `ETA 1:02:03` or tqdm's `00:12<00:40`
    static ref ETA: Regex =
        Regex::new(r"(?i)(?:ETA:?\s*|<+\s*)(?:(\d+):)?(\d{1,2}):(\d{2})").unwrap();
}

const PHASE_KEYWORDS: &[(&str, ProgressPhase)] = &[
    ("loading model", ProgressPhase::LoadingModel),
    ("diariz", ProgressPhase::Diarizing),
    ("ffmpeg", ProgressPhase::Preprocessing),
    ("audio filter", ProgressPhase::Preprocessing),
    ("preprocess", ProgressPhase::Preprocessing),
    ("transcri", ProgressPhase::Transcribing),
    ("writing", ProgressPhase::Writing),
    ("saving", ProgressPhase::Writing),
];

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    Progress(ProgressEvent),
    /// Unrecognised line, or a percent that went backwards
    Raw(String),
}

/// Line parser for a single run. Remembers the last phase and percent seen.
#[derive(Debug, Default)]
pub struct ProgressParser {
    phase: Option<ProgressPhase>,
    last_percent: Option<f64>,
}

fn detect_phase(line: &str) -> Option<ProgressPhase> {
    let lower = line.to_lowercase();
    PHASE_KEYWORDS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, phase)| *phase)
}

fn parse_eta(line: &str) -> Option<u64> {
    let caps = ETA.captures(line)?;
    let num = |i: usize| {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };
    Some(num(1) * 3600 + num(2) * 60 + num(3))
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Option<ProgressPhase> {
        self.phase
    }

    pub fn last_percent(&self) -> Option<f64> {
        self.last_percent
    }

    /// Segment lines are transcript text and never count as progress
    pub fn parse(&mut self, line: &str) -> ParsedLine {
        if SEGMENT.is_match(line) {
            return ParsedLine::Raw(line.to_string());
        }

        let phase = detect_phase(line);
        let phase_changed = phase.is_some() && phase != self.phase;
        if phase.is_some() {
            self.phase = phase;
        }

        let percent = PERCENT
            .captures(line)
            .and_then(|c| c[1].parse::<f64>().ok())
            .filter(|p| *p <= 100.0);
        let eta_secs = parse_eta(line);

        match percent {
            Some(p) => {
                if self.last_percent.map_or(false, |last| p < last) {
                    return ParsedLine::Raw(line.to_string());
                }
                self.last_percent = Some(p);
                ParsedLine::Progress(ProgressEvent {
                    phase: self.phase,
                    percent: Some(p),
                    eta_secs,
                })
            }
            None if eta_secs.is_some() || phase_changed => ParsedLine::Progress(ProgressEvent {
                phase: self.phase,
                percent: self.last_percent,
                eta_secs,
            }),
            None => ParsedLine::Raw(line.to_string()),
        }
    }
}
