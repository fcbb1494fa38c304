//! Per-subject reference statistics used for normalization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::channel::SampleSet;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    pub subject_id: String,
    pub channels: SampleSet,
    pub created_at: DateTime<Utc>,
}

impl Baseline {
    /// First-observation policy: the subject's current sample becomes the
    /// reference. There is no multi-day aggregation.
    pub fn from_observation(subject_id: &str, samples: &SampleSet, created_at: DateTime<Utc>) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            channels: samples.clone(),
            created_at,
        }
    }
}
