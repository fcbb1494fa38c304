use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::emotion::EstimateSource;
use crate::wellness::WellnessStatus;

/// Timings and outcome of one inference request. Never carries the text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceMetrics {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub subject_id: String,
    pub top_emotion: String,
    pub top_probability: f64,
    pub emotion_source: EstimateSource,
    pub wellness_index: Option<f64>,
    pub wellness_status: WellnessStatus,
    pub escalate: bool,
    pub text_length: usize,
    pub classifier_ms: u64,
    pub wellness_ms: u64,
    pub total_ms: u64,
    /// Classifier calls that failed or ran past the deadline.
    pub degraded_classifiers: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub recent_inferences: Vec<InferenceMetrics>,
    pub inference_count: u64,
    pub escalation_count: u64,
    pub degraded_classifier_count: u64,
    pub unknown_wellness_count: u64,
}
