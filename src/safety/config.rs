use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::wellness::WellnessStatus;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SafetyConfig {
    /// Emotion labels that count towards repeated distress.
    pub distress_labels: Vec<String>,

    /// Minimum number of distress turns in the context window.
    pub distress_threshold: usize,

    /// Wellness states that, combined with repeated distress, escalate.
    pub low_wellness: Vec<WellnessStatus>,

    /// Additional case-insensitive regexes treated as crisis phrases.
    pub extra_crisis_patterns: Vec<String>,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            distress_labels: vec!["sadness".into(), "fear".into()],
            distress_threshold: 3,
            low_wellness: vec![WellnessStatus::Stressed, WellnessStatus::Unknown],
            extra_crisis_patterns: Vec::new(),
        }
    }
}

impl SafetyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.distress_threshold == 0 {
            bail!("distress_threshold must be at least 1");
        }
        if self.distress_labels.iter().all(|l| l.trim().is_empty()) {
            bail!("distress_labels must name at least one emotion");
        }
        Ok(())
    }
}
