//! Collaborator interfaces consumed by the engine.
//!
//! The engine never reaches for a global connection; every read and the one
//! conditional write go through these traits so tests can swap in fakes.

use std::future::Future;

use anyhow::{anyhow, Result};

use crate::db::{Baseline, ContextRecord, Database, SampleSet};
use crate::emotion::EmotionScore;

pub trait PhysioStore: Send + Sync {
    /// Current sample set for the subject, or `None` when nothing was collected.
    fn get_physiological_sample(
        &self,
        subject_id: &str,
    ) -> impl Future<Output = Result<Option<SampleSet>>> + Send;

    fn get_baseline(&self, subject_id: &str) -> impl Future<Output = Result<Option<Baseline>>> + Send;

    /// Conditional write: stores `baseline` only if the subject has none and
    /// returns the surviving record either way.
    fn insert_baseline_if_absent(
        &self,
        baseline: &Baseline,
    ) -> impl Future<Output = Result<Baseline>> + Send;
}

pub trait ContextStore: Send + Sync {
    /// Up to `limit` most recent turns, oldest first.
    fn get_recent_context(
        &self,
        subject_id: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ContextRecord>>> + Send;
}

pub trait EmotionClassifier: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &'static str;

    /// Ranked `(label, probability)` pairs, highest first.
    fn classify(&self, text: &str) -> impl Future<Output = Result<Vec<EmotionScore>>> + Send;
}

impl PhysioStore for Database {
    async fn get_physiological_sample(&self, subject_id: &str) -> Result<Option<SampleSet>> {
        self.get_latest_sample(subject_id).await
    }

    async fn get_baseline(&self, subject_id: &str) -> Result<Option<Baseline>> {
        Database::get_baseline(self, subject_id).await
    }

    async fn insert_baseline_if_absent(&self, baseline: &Baseline) -> Result<Baseline> {
        Database::insert_baseline_if_absent(self, baseline).await
    }
}

impl ContextStore for Database {
    async fn get_recent_context(&self, subject_id: &str, limit: usize) -> Result<Vec<ContextRecord>> {
        Database::get_recent_context(self, subject_id, limit).await
    }
}

/// Stand-in for a provider that is not deployed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

impl EmotionClassifier for Unavailable {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    async fn classify(&self, _text: &str) -> Result<Vec<EmotionScore>> {
        Err(anyhow!("no classifier configured"))
    }
}

/// Classifier whose output was computed upstream, e.g. by a batch job that
/// already called the inference provider.
#[derive(Debug, Clone)]
pub struct Precomputed {
    name: &'static str,
    scores: Option<Vec<EmotionScore>>,
}

impl Precomputed {
    pub fn new(name: &'static str, scores: Option<Vec<EmotionScore>>) -> Self {
        Self { name, scores }
    }
}

impl EmotionClassifier for Precomputed {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn classify(&self, _text: &str) -> Result<Vec<EmotionScore>> {
        self.scores
            .clone()
            .ok_or_else(|| anyhow!("{} produced no output", self.name))
    }
}
