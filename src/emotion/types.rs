use serde::{Deserialize, Serialize};

/// One ranked classifier output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmotionScore {
    pub label: String,
    pub probability: f64,
}

impl EmotionScore {
    pub fn new(label: impl Into<String>, probability: f64) -> Self {
        Self {
            label: label.into(),
            probability,
        }
    }
}

impl<S: Into<String>> From<(S, f64)> for EmotionScore {
    fn from((label, probability): (S, f64)) -> Self {
        Self::new(label, probability)
    }
}

/// Which inputs produced an estimate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EstimateSource {
    /// Primary was confident; secondary not consulted.
    Primary,
    /// Primary unavailable; secondary used alone.
    Secondary,
    /// Weighted blend of both classifiers.
    Blended,
    /// Keyword heuristic after both classifiers failed.
    Keyword,
    /// Nothing usable; neutral sentinel.
    Sentinel,
}

/// Ranked emotions, highest confidence first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmotionEstimate {
    pub emotions: Vec<EmotionScore>,
    pub source: EstimateSource,
}

impl EmotionEstimate {
    pub const NEUTRAL: &'static str = "neutral";

    pub fn sentinel() -> Self {
        Self {
            emotions: vec![EmotionScore::new(Self::NEUTRAL, 1.0)],
            source: EstimateSource::Sentinel,
        }
    }

    pub fn top(&self) -> Option<&EmotionScore> {
        self.emotions.first()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.emotions.iter().map(|e| e.label.as_str()).collect()
    }

    pub fn probabilities(&self) -> Vec<f64> {
        self.emotions.iter().map(|e| e.probability).collect()
    }
}
