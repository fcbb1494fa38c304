use serde::{Deserialize, Serialize};

use crate::emotion::{EmotionEstimate, EmotionScore};
use crate::error::EngineError;
use crate::safety::EscalationDecision;
use crate::wellness::WellnessSnapshot;

/// Everything the response layer needs for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceOutcome {
    pub request_id: String,
    pub subject_id: String,
    pub emotions: EmotionEstimate,
    pub wellness: WellnessSnapshot,
    pub escalation: EscalationDecision,
}

/// Result of asking one classifier slot for scores.
#[derive(Debug)]
pub(crate) enum ClassifierOutcome {
    Scores(Vec<EmotionScore>),
    NotConfigured,
    Failed(EngineError),
}

impl ClassifierOutcome {
    pub(crate) fn scores(&self) -> Option<&[EmotionScore]> {
        match self {
            ClassifierOutcome::Scores(scores) => Some(scores.as_slice()),
            _ => None,
        }
    }

    pub(crate) fn failure(&self) -> Option<&EngineError> {
        match self {
            ClassifierOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}
