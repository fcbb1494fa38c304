//! Physiological channel data models.
//!
//! A `SampleSet` is the per-window summary (mean/std per channel) produced by
//! the wearable preprocessing step. It is immutable once stored.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One physiological signal stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Electrodermal activity.
    Eda,
    /// Skin temperature.
    Temp,
    /// Blood-volume pulse.
    Bvp,
    /// Cardiac signal.
    Ecg,
    /// Respiration.
    Resp,
}

/// Direction in which a raw elevation moves the wellness estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Higher raw value means more stress.
    Stress,
    /// Higher raw value means more calm; the z-score is inverted.
    Calm,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Eda,
        Channel::Temp,
        Channel::Bvp,
        Channel::Ecg,
        Channel::Resp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Eda => "eda",
            Channel::Temp => "temp",
            Channel::Bvp => "bvp",
            Channel::Ecg => "ecg",
            Channel::Resp => "resp",
        }
    }

    pub fn polarity(&self) -> Polarity {
        match self {
            Channel::Eda | Channel::Temp | Channel::Resp => Polarity::Stress,
            Channel::Bvp | Channel::Ecg => Polarity::Calm,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary statistics of one channel over a collection window.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ChannelSample {
    pub mean: Option<f64>,
    pub std: Option<f64>,
}

impl ChannelSample {
    pub fn new(mean: f64, std: f64) -> Self {
        Self {
            mean: Some(mean),
            std: Some(std),
        }
    }

    pub fn missing() -> Self {
        Self::default()
    }

    /// Mean and population standard deviation of a raw signal window.
    /// Non-finite readings are dropped; an empty window yields a missing sample.
    pub fn from_signal(signal: &[f64]) -> Self {
        let finite: Vec<f64> = signal.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return Self::missing();
        }

        let n = finite.len() as f64;
        let mean = finite.iter().sum::<f64>() / n;
        let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        Self::new(mean, variance.sqrt())
    }
}

/// One `ChannelSample` per channel. Channels absent from a serialized
/// document default to missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SampleSet {
    pub eda: ChannelSample,
    pub temp: ChannelSample,
    pub bvp: ChannelSample,
    pub ecg: ChannelSample,
    pub resp: ChannelSample,
}

impl SampleSet {
    pub fn get(&self, channel: Channel) -> &ChannelSample {
        match channel {
            Channel::Eda => &self.eda,
            Channel::Temp => &self.temp,
            Channel::Bvp => &self.bvp,
            Channel::Ecg => &self.ecg,
            Channel::Resp => &self.resp,
        }
    }

    pub fn set(&mut self, channel: Channel, sample: ChannelSample) {
        match channel {
            Channel::Eda => self.eda = sample,
            Channel::Temp => self.temp = sample,
            Channel::Bvp => self.bvp = sample,
            Channel::Ecg => self.ecg = sample,
            Channel::Resp => self.resp = sample,
        }
    }

    pub fn with(mut self, channel: Channel, sample: ChannelSample) -> Self {
        self.set(channel, sample);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, &ChannelSample)> + '_ {
        Channel::ALL.into_iter().map(move |channel| (channel, self.get(channel)))
    }

    /// True when no channel carries a mean value.
    pub fn all_missing(&self) -> bool {
        self.iter().all(|(_, sample)| sample.mean.is_none())
    }
}
