//! Conversational context data model.
//!
//! Represents one prior turn for a subject. The engine only reads these for
//! the repeated-distress heuristic; the outer layer appends them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContextRecord {
    pub id: Option<i64>,
    pub subject_id: String,
    pub emotion_label: String,
    pub probability: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl ContextRecord {
    pub fn new(subject_id: &str, emotion_label: &str, probability: Option<f64>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: None,
            subject_id: subject_id.to_string(),
            emotion_label: emotion_label.to_lowercase(),
            probability,
            timestamp,
        }
    }
}
