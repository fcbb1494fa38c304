use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::db::Channel;

/// Per-channel fusion weights. Must sum to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChannelWeights {
    pub eda: f64,
    pub temp: f64,
    pub bvp: f64,
    pub ecg: f64,
    pub resp: f64,
}

impl Default for ChannelWeights {
    fn default() -> Self {
        Self {
            eda: 0.25,
            temp: 0.15,
            bvp: 0.20,
            ecg: 0.20,
            resp: 0.20,
        }
    }
}

impl ChannelWeights {
    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Eda => self.eda,
            Channel::Temp => self.temp,
            Channel::Bvp => self.bvp,
            Channel::Ecg => self.ecg,
            Channel::Resp => self.resp,
        }
    }

    pub fn total(&self) -> f64 {
        Channel::ALL.iter().map(|c| self.get(*c)).sum()
    }
}

/// Configuration for wellness fusion with tunable weights and status bands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WellnessConfig {
    pub weights: ChannelWeights,

    /// Mix of the inverted stress component and the calm component.
    pub stress_share: f64,
    pub calm_share: f64,

    /// Status bands on the 0-100 index, evaluated top-down.
    pub calm_threshold: f64,
    pub neutral_threshold: f64,
    pub mild_stress_threshold: f64,
}

impl Default for WellnessConfig {
    fn default() -> Self {
        Self {
            weights: ChannelWeights::default(),
            stress_share: 0.6,
            calm_share: 0.4,
            calm_threshold: 70.0,
            neutral_threshold: 40.0,
            mild_stress_threshold: 30.0,
        }
    }
}

const WEIGHT_TOLERANCE: f64 = 1e-9;

impl WellnessConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(channel) = Channel::ALL
            .iter()
            .find(|c| !(self.weights.get(**c) >= 0.0))
        {
            bail!("weight for {channel} must be non-negative");
        }

        let total = self.weights.total();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            bail!("channel weights must sum to 1.0, got {total}");
        }

        if (self.stress_share + self.calm_share - 1.0).abs() > WEIGHT_TOLERANCE {
            bail!(
                "stress_share + calm_share must equal 1.0, got {}",
                self.stress_share + self.calm_share
            );
        }

        let bands = [
            self.calm_threshold,
            self.neutral_threshold,
            self.mild_stress_threshold,
        ];
        if bands.iter().any(|b| !(0.0..=100.0).contains(b)) {
            bail!("status thresholds must lie within [0, 100]");
        }
        if !(bands[0] > bands[1] && bands[1] > bands[2]) {
            bail!("status thresholds must be strictly descending: {bands:?}");
        }

        Ok(())
    }
}
