use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{Baseline, Channel, Polarity, SampleSet};
use crate::wellness::config::WellnessConfig;
use crate::wellness::normalize::normalize;

/// Serialized with the variant names ("Calm", "MildStress", ...).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WellnessStatus {
    Calm,
    Neutral,
    MildStress,
    Stressed,
    Unknown,
}

impl WellnessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WellnessStatus::Calm => "Calm",
            WellnessStatus::Neutral => "Neutral",
            WellnessStatus::MildStress => "MildStress",
            WellnessStatus::Stressed => "Stressed",
            WellnessStatus::Unknown => "Unknown",
        }
    }

    /// Map an index onto the four bands, first match wins.
    pub fn from_index(index: f64, config: &WellnessConfig) -> Self {
        if index >= config.calm_threshold {
            WellnessStatus::Calm
        } else if index >= config.neutral_threshold {
            WellnessStatus::Neutral
        } else if index >= config.mild_stress_threshold {
            WellnessStatus::MildStress
        } else {
            WellnessStatus::Stressed
        }
    }
}

impl std::fmt::Display for WellnessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WellnessSnapshot {
    pub subject_id: String,
    /// 0-100, higher is calmer. `None` when there was nothing to fuse.
    pub index: Option<f64>,
    pub status: WellnessStatus,
    pub normalized_channels: BTreeMap<Channel, f64>,
    pub raw_channels: BTreeMap<Channel, Option<f64>>,
    pub timestamp: DateTime<Utc>,
}

impl WellnessSnapshot {
    /// Snapshot for a subject without usable data. Raw values are still
    /// reported when a sample exists.
    pub fn unknown(subject_id: &str, samples: Option<&SampleSet>) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            index: None,
            status: WellnessStatus::Unknown,
            normalized_channels: BTreeMap::new(),
            raw_channels: samples.map(raw_channels).unwrap_or_default(),
            timestamp: Utc::now(),
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

fn raw_channels(samples: &SampleSet) -> BTreeMap<Channel, Option<f64>> {
    samples
        .iter()
        .map(|(channel, sample)| {
            let raw = sample.mean.filter(|v| v.is_finite()).map(|v| round_to(v, 3));
            (channel, raw)
        })
        .collect()
}

/// Fuse a subject's current samples against their baseline into a
/// Wellness Index snapshot.
///
/// Stress-polarity channels (eda, temp, resp) raise the stress component;
/// calm-polarity channels (bvp, ecg) are inverted and raise the calm
/// component. `raw = (1 - stress) * stress_share + calm * calm_share`,
/// scaled to 0-100 and clamped.
pub fn compute_index(
    samples: &SampleSet,
    baseline: &Baseline,
    config: &WellnessConfig,
) -> WellnessSnapshot {
    if samples.all_missing() {
        return WellnessSnapshot::unknown(&baseline.subject_id, Some(samples));
    }

    let mut normalized = BTreeMap::new();
    let mut stress_component = 0.0;
    let mut calm_component = 0.0;

    for (channel, sample) in samples.iter() {
        let reference = baseline.channels.get(channel);
        let polarity = channel.polarity();
        let score = normalize(
            sample.mean,
            reference.mean,
            reference.std,
            polarity == Polarity::Calm,
        );
        let weighted = config.weights.get(channel) * score;
        match polarity {
            Polarity::Stress => stress_component += weighted,
            Polarity::Calm => calm_component += weighted,
        }
        normalized.insert(channel, round_to(score, 4));
    }

    let raw_index =
        (1.0 - stress_component) * config.stress_share + calm_component * config.calm_share;
    let index = round_to((raw_index * 100.0).clamp(0.0, 100.0), 2);

    WellnessSnapshot {
        subject_id: baseline.subject_id.clone(),
        index: Some(index),
        status: WellnessStatus::from_index(index, config),
        normalized_channels: normalized,
        raw_channels: raw_channels(samples),
        timestamp: Utc::now(),
    }
}
