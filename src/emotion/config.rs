use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Tunables for the two-classifier merge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Primary's top probability at or above which the secondary is ignored.
    pub min_primary_confidence: f64,

    /// Share of the blended score taken from the primary.
    pub primary_weight: f64,

    /// Maximum number of ranked emotions returned.
    pub top_n: usize,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            min_primary_confidence: 0.45,
            primary_weight: 0.7,
            top_n: 3,
        }
    }
}

impl EnsembleConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_primary_confidence) {
            bail!(
                "min_primary_confidence must be within [0, 1], got {}",
                self.min_primary_confidence
            );
        }
        if !(0.0..=1.0).contains(&self.primary_weight) {
            bail!("primary_weight must be within [0, 1], got {}", self.primary_weight);
        }
        if self.top_n == 0 {
            bail!("top_n must be at least 1");
        }
        Ok(())
    }
}
