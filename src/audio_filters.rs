//! Merges preset filter defaults, an analysis suggestion and user overrides
//! into the final filter list of a job.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{AudioFilter, FilterKind};

/// Result of the external audio quality analyzer
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisSuggestion {
    pub noise_level: f64,
    pub volume_level: f64,
    pub quality_score: f64,
    pub suggested_filters: Vec<AudioFilter>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FilterOverride {
    Set(AudioFilter),
    Disable,
}

/// Explicit user choices, one per filter kind
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FilterOverrides(BTreeMap<FilterKind, FilterOverride>);

impl FilterOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, filter: AudioFilter) -> Self {
        self.0.insert(filter.kind(), FilterOverride::Set(filter));
        self
    }

    pub fn disable(mut self, kind: FilterKind) -> Self {
        self.0.insert(kind, FilterOverride::Disable);
        self
    }

    pub fn get(&self, kind: FilterKind) -> Option<&FilterOverride> {
        self.0.get(&kind)
    }
}

/// Per filter kind: override > suggestion > preset. Output is in chain order,
/// and disabled (no-op) filters are dropped.
pub fn plan(
    preset_defaults: &[AudioFilter],
    suggestion: Option<&AnalysisSuggestion>,
    overrides: &FilterOverrides,
) -> Vec<AudioFilter> {
    let pick = |source: &[AudioFilter], kind: FilterKind| {
        source.iter().find(|f| f.kind() == kind).cloned()
    };

    FilterKind::CHAIN_ORDER
        .into_iter()
        .filter_map(|kind| match overrides.get(kind) {
            Some(FilterOverride::Set(filter)) => Some(filter.clone()),
            Some(FilterOverride::Disable) => None,
            None => suggestion
                .and_then(|s| pick(&s.suggested_filters, kind))
                .or_else(|| pick(preset_defaults, kind)),
        })
        .filter(AudioFilter::is_active)
        .collect()
}
