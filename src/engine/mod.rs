//! Per-request orchestration: emotion ensemble and wellness fusion run
//! concurrently, then the escalation decision sees the finished wellness
//! status. Every collaborator call carries a deadline and every failure is
//! turned into a fallback output.

mod outcome;

pub use outcome::InferenceOutcome;

use std::future::Future;
use std::time::Instant;

use anyhow::Context;
use chrono::Utc;
use tokio::time::timeout;
use uuid::Uuid;

use crate::db::ContextRecord;
use crate::emotion::{keyword_estimate, merge, EmotionEstimate};
use crate::error::{EngineError, EngineResult};
use crate::metrics::{InferenceMetrics, MetricsCollector};
use crate::safety::{EscalationDecision, SafetyGuard};
use crate::settings::EngineSettings;
use crate::store::{ContextStore, EmotionClassifier, PhysioStore, Unavailable};
use crate::wellness::{compute_index, get_or_create_baseline, WellnessSnapshot, WellnessStatus};
use outcome::ClassifierOutcome;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

pub struct Engine<S, C, P = Unavailable, Q = Unavailable> {
    store: S,
    context: C,
    primary: Option<P>,
    secondary: Option<Q>,
    settings: EngineSettings,
    /// `None` when the crisis patterns failed to compile; every decision is
    /// then the fail-safe escalation.
    guard: Option<SafetyGuard>,
    metrics: MetricsCollector,
}

impl<S, C, P, Q> Engine<S, C, P, Q>
where
    S: PhysioStore,
    C: ContextStore,
    P: EmotionClassifier,
    Q: EmotionClassifier,
{
    pub fn new(
        store: S,
        context: C,
        primary: Option<P>,
        secondary: Option<Q>,
        settings: EngineSettings,
    ) -> anyhow::Result<Self> {
        settings.validate().context("invalid engine settings")?;

        let guard = match SafetyGuard::new(&settings.safety) {
            Ok(guard) => Some(guard),
            Err(err) => {
                log_error!("safety guard unavailable, every request will escalate: {}", err);
                None
            }
        };

        Ok(Self {
            store,
            context,
            primary,
            secondary,
            settings,
            guard,
            metrics: MetricsCollector::new(),
        })
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Run the full pipeline with the engine's own classifiers.
    pub async fn infer(&self, subject_id: &str, text: &str) -> InferenceOutcome {
        self.infer_with(subject_id, text, self.primary.as_ref(), self.secondary.as_ref())
            .await
    }

    /// Run the full pipeline with caller-supplied classifiers, e.g. outputs
    /// that were computed upstream.
    pub async fn infer_with<A, B>(
        &self,
        subject_id: &str,
        text: &str,
        primary: Option<&A>,
        secondary: Option<&B>,
    ) -> InferenceOutcome
    where
        A: EmotionClassifier,
        B: EmotionClassifier,
    {
        let started = Instant::now();
        let request_id = Uuid::new_v4().to_string();

        let emotions = async {
            let begun = Instant::now();
            let (primary, secondary) = tokio::join!(
                self.run_classifier("primary", primary, text),
                self.run_classifier("secondary", secondary, text),
            );
            let degraded = [&primary, &secondary]
                .iter()
                .filter(|outcome| outcome.failure().is_some())
                .count() as u32;
            let estimate = self.fuse_emotions(text, &primary, &secondary);
            (estimate, degraded, elapsed_ms(begun))
        };

        let wellness = async {
            let begun = Instant::now();
            let snapshot = self.wellness_snapshot(subject_id).await;
            (snapshot, elapsed_ms(begun))
        };

        let ((estimate, degraded, classifier_ms), (snapshot, wellness_ms), history) =
            tokio::join!(emotions, wellness, self.recent_context(subject_id));

        let escalation = self.decide(subject_id, text, snapshot.status, &history);

        let top = estimate.top().cloned();
        self.metrics
            .record_inference(InferenceMetrics {
                request_id: request_id.clone(),
                timestamp: Utc::now(),
                subject_id: subject_id.to_string(),
                top_emotion: top
                    .as_ref()
                    .map(|s| s.label.clone())
                    .unwrap_or_else(|| EmotionEstimate::NEUTRAL.to_string()),
                top_probability: top.map(|s| s.probability).unwrap_or(0.0),
                emotion_source: estimate.source,
                wellness_index: snapshot.index,
                wellness_status: snapshot.status,
                escalate: escalation.escalate,
                text_length: text.chars().count(),
                classifier_ms,
                wellness_ms,
                total_ms: elapsed_ms(started),
                degraded_classifiers: degraded,
            })
            .await;

        InferenceOutcome {
            request_id,
            subject_id: subject_id.to_string(),
            emotions: estimate,
            wellness: snapshot,
            escalation,
        }
    }

    async fn run_classifier<K: EmotionClassifier>(
        &self,
        slot: &'static str,
        classifier: Option<&K>,
        text: &str,
    ) -> ClassifierOutcome {
        let Some(classifier) = classifier else {
            log_debug!("{} classifier not configured", slot);
            return ClassifierOutcome::NotConfigured;
        };

        let name = classifier.name();
        let error = match timeout(self.settings.classifier_timeout(), classifier.classify(text)).await
        {
            Ok(Ok(scores)) => return ClassifierOutcome::Scores(scores),
            Ok(Err(err)) => EngineError::ClassifierUnavailable {
                name,
                reason: format!("{err:#}"),
            },
            Err(_) => EngineError::ClassifierTimeout {
                name,
                timeout_ms: self.settings.classifier_timeout_ms,
            },
        };

        log_warn!("{} classifier degraded: {}", slot, error);
        ClassifierOutcome::Failed(error)
    }

    /// An empty score list counts as no output, so two silent classifiers
    /// take the keyword path like two failed ones.
    fn fuse_emotions(
        &self,
        text: &str,
        primary: &ClassifierOutcome,
        secondary: &ClassifierOutcome,
    ) -> EmotionEstimate {
        let primary = primary.scores().filter(|scores| !scores.is_empty());
        let secondary = secondary.scores().filter(|scores| !scores.is_empty());

        match (primary, secondary) {
            (None, None) => {
                log_info!("no classifier output, using keyword heuristic");
                keyword_estimate(text)
            }
            (primary, secondary) => merge(
                primary.unwrap_or_default(),
                secondary.unwrap_or_default(),
                self.settings.ensemble.top_n,
                &self.settings.ensemble,
            ),
        }
    }

    async fn with_store_deadline<T>(
        &self,
        fut: impl Future<Output = EngineResult<T>>,
    ) -> EngineResult<T> {
        let timeout_ms = self.settings.store_timeout_ms;
        timeout(self.settings.store_timeout(), fut)
            .await
            .map_err(|_| EngineError::StoreTimeout { timeout_ms })?
    }

    /// Wellness snapshot for the subject's latest sample. Missing data or a
    /// failing store yields an `Unknown` snapshot, never an error.
    pub async fn wellness_snapshot(&self, subject_id: &str) -> WellnessSnapshot {
        let fetched = self
            .with_store_deadline(async {
                self.store
                    .get_physiological_sample(subject_id)
                    .await
                    .map_err(EngineError::from)
            })
            .await;

        let samples = match fetched {
            Ok(Some(samples)) => samples,
            Ok(None) => {
                log_info!("no physiological sample for subject {}", subject_id);
                return WellnessSnapshot::unknown(subject_id, None);
            }
            Err(err) => {
                log_error!("sample fetch failed for subject {}: {}", subject_id, err);
                return WellnessSnapshot::unknown(subject_id, None);
            }
        };

        let baseline = self
            .with_store_deadline(get_or_create_baseline(&self.store, subject_id))
            .await;

        match baseline {
            Ok(baseline) => {
                let snapshot = compute_index(&samples, &baseline, &self.settings.wellness);
                log_debug!("subject {} wellness {}", subject_id, snapshot.status);
                snapshot
            }
            Err(EngineError::MissingData(_)) => {
                log_info!("no usable baseline for subject {}", subject_id);
                WellnessSnapshot::unknown(subject_id, Some(&samples))
            }
            Err(err) => {
                log_error!("baseline lookup failed for subject {}: {}", subject_id, err);
                WellnessSnapshot::unknown(subject_id, Some(&samples))
            }
        }
    }

    async fn recent_context(&self, subject_id: &str) -> Vec<ContextRecord> {
        let fetched = self
            .with_store_deadline(async {
                self.context
                    .get_recent_context(subject_id, self.settings.context_limit)
                    .await
                    .map_err(EngineError::from)
            })
            .await;

        match fetched {
            Ok(history) => history,
            Err(err) => {
                log_warn!("context fetch failed for subject {}: {}", subject_id, err);
                Vec::new()
            }
        }
    }

    fn decide(
        &self,
        subject_id: &str,
        text: &str,
        status: WellnessStatus,
        history: &[ContextRecord],
    ) -> EscalationDecision {
        let Some(guard) = &self.guard else {
            log_error!("safety check unavailable for subject {}, escalating", subject_id);
            return EscalationDecision::fail_safe();
        };

        let decision = guard.decide(text, status, history);
        if decision.escalate {
            log_warn!(
                "escalating subject {}: {:?}",
                subject_id,
                decision.reasons
            );
        }
        decision
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Baseline, Channel, ChannelSample, SampleSet};
    use crate::emotion::{EmotionScore, EstimateSource};
    use crate::safety::EscalationReason;
    use crate::store::Precomputed;
    use anyhow::{anyhow, Result};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct MemoryStore {
        sample: Option<SampleSet>,
        baseline: Mutex<Option<Baseline>>,
        fail: bool,
        sample_delay: Option<Duration>,
        baseline_delay: Option<Duration>,
    }

    async fn pause(delay: Option<Duration>) {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    impl PhysioStore for MemoryStore {
        async fn get_physiological_sample(&self, _subject_id: &str) -> Result<Option<SampleSet>> {
            pause(self.sample_delay).await;
            if self.fail {
                return Err(anyhow!("store offline"));
            }
            Ok(self.sample.clone())
        }

        async fn get_baseline(&self, _subject_id: &str) -> Result<Option<Baseline>> {
            pause(self.baseline_delay).await;
            Ok(self.baseline.lock().unwrap().clone())
        }

        async fn insert_baseline_if_absent(&self, baseline: &Baseline) -> Result<Baseline> {
            let mut slot = self.baseline.lock().unwrap();
            Ok(slot.get_or_insert_with(|| baseline.clone()).clone())
        }
    }

    struct History(Vec<ContextRecord>);

    impl ContextStore for History {
        async fn get_recent_context(&self, _subject_id: &str, limit: usize) -> Result<Vec<ContextRecord>> {
            let skip = self.0.len().saturating_sub(limit);
            Ok(self.0[skip..].to_vec())
        }
    }

    struct SlowHistory(Vec<ContextRecord>);

    impl ContextStore for SlowHistory {
        async fn get_recent_context(&self, _subject_id: &str, _limit: usize) -> Result<Vec<ContextRecord>> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(self.0.clone())
        }
    }

    struct Slow;

    impl EmotionClassifier for Slow {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn classify(&self, _text: &str) -> Result<Vec<EmotionScore>> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(vec![EmotionScore::new("joy", 0.99)])
        }
    }

    fn samples(eda: f64) -> SampleSet {
        SampleSet::default()
            .with(Channel::Eda, ChannelSample::new(eda, 0.2))
            .with(Channel::Bvp, ChannelSample::new(70.0, 4.0))
    }

    fn engine_with<P: EmotionClassifier, Q: EmotionClassifier>(
        store: MemoryStore,
        history: Vec<ContextRecord>,
        primary: Option<P>,
        secondary: Option<Q>,
        settings: EngineSettings,
    ) -> Engine<MemoryStore, History, P, Q> {
        Engine::new(store, History(history), primary, secondary, settings).unwrap()
    }

    fn distress_history() -> Vec<ContextRecord> {
        ["sadness", "fear", "sadness"]
            .iter()
            .map(|label| ContextRecord::new("S1", label, Some(0.7), Utc::now()))
            .collect()
    }

    fn store_deadline(ms: u64) -> EngineSettings {
        EngineSettings {
            store_timeout_ms: ms,
            ..EngineSettings::default()
        }
    }

    fn scores(pairs: &[(&str, f64)]) -> Vec<EmotionScore> {
        pairs.iter().map(|(l, p)| EmotionScore::new(*l, *p)).collect()
    }

    #[tokio::test]
    async fn first_request_seeds_baseline_and_reads_neutral() {
        let store = MemoryStore {
            sample: Some(samples(1.0)),
            ..MemoryStore::default()
        };
        let engine = engine_with(
            store,
            Vec::new(),
            Some(Precomputed::new("primary", Some(scores(&[("joy", 0.8)])))),
            None::<Unavailable>,
            EngineSettings::default(),
        );

        let outcome = engine.infer("S1", "had a nice walk").await;
        assert_eq!(outcome.wellness.index, Some(50.0));
        assert_eq!(outcome.wellness.status, WellnessStatus::Neutral);
        assert_eq!(outcome.emotions.source, EstimateSource::Primary);
        assert!(!outcome.escalation.escalate);
    }

    #[tokio::test]
    async fn store_failure_degrades_to_unknown() {
        let store = MemoryStore {
            fail: true,
            ..MemoryStore::default()
        };
        let engine = engine_with(
            store,
            Vec::new(),
            None::<Unavailable>,
            None::<Unavailable>,
            EngineSettings::default(),
        );

        let outcome = engine.infer("S1", "fine").await;
        assert_eq!(outcome.wellness.status, WellnessStatus::Unknown);
        assert_eq!(outcome.wellness.index, None);
    }

    #[tokio::test]
    async fn slow_classifier_falls_back_to_secondary() {
        let settings = EngineSettings {
            classifier_timeout_ms: 30,
            ..EngineSettings::default()
        };
        let engine = engine_with(
            MemoryStore::default(),
            Vec::new(),
            Some(Slow),
            Some(Precomputed::new("secondary", Some(scores(&[("sadness", 0.6)])))),
            settings,
        );

        let outcome = engine.infer("S1", "meh").await;
        assert_eq!(outcome.emotions.source, EstimateSource::Secondary);
        assert_eq!(outcome.emotions.labels(), vec!["sadness"]);

        let snapshot = engine.metrics().get_snapshot().await;
        assert_eq!(snapshot.degraded_classifier_count, 1);
    }

    #[tokio::test]
    async fn both_classifiers_failing_uses_keywords() {
        let engine = engine_with(
            MemoryStore::default(),
            Vec::new(),
            Some(Precomputed::new("primary", None)),
            Some(Precomputed::new("secondary", None)),
            EngineSettings::default(),
        );

        let outcome = engine.infer("S1", "I am so angry right now").await;
        assert_eq!(outcome.emotions.source, EstimateSource::Keyword);
        assert_eq!(outcome.emotions.labels(), vec!["anger"]);
    }

    #[tokio::test]
    async fn empty_classifier_outputs_use_keywords() {
        let engine = engine_with(
            MemoryStore::default(),
            Vec::new(),
            Some(Precomputed::new("primary", Some(Vec::new()))),
            Some(Precomputed::new("secondary", Some(Vec::new()))),
            EngineSettings::default(),
        );

        let outcome = engine.infer("S1", "I am so angry right now").await;
        assert_eq!(outcome.emotions.source, EstimateSource::Keyword);
        assert_eq!(outcome.emotions.labels(), vec!["anger"]);

        // empty output is not a provider failure
        let snapshot = engine.metrics().get_snapshot().await;
        assert_eq!(snapshot.degraded_classifier_count, 0);
    }

    #[tokio::test]
    async fn empty_primary_defers_to_secondary() {
        let engine = engine_with(
            MemoryStore::default(),
            Vec::new(),
            Some(Precomputed::new("primary", Some(Vec::new()))),
            Some(Precomputed::new("secondary", Some(scores(&[("fear", 0.4)])))),
            EngineSettings::default(),
        );

        let outcome = engine.infer("S1", "I am so angry right now").await;
        assert_eq!(outcome.emotions.source, EstimateSource::Secondary);
        assert_eq!(outcome.emotions.labels(), vec!["fear"]);
    }

    #[tokio::test]
    async fn missing_slot_is_not_counted_as_degraded() {
        let engine = engine_with(
            MemoryStore::default(),
            Vec::new(),
            None::<Unavailable>,
            None::<Unavailable>,
            EngineSettings::default(),
        );
        let secondary = Precomputed::new("secondary", Some(scores(&[("joy", 0.5)])));

        engine
            .infer_with("S1", "ok", None::<&Precomputed>, Some(&secondary))
            .await;
        assert_eq!(engine.metrics().get_snapshot().await.degraded_classifier_count, 0);

        let failing = Precomputed::new("primary", None);
        engine
            .infer_with("S1", "ok", Some(&failing), Some(&secondary))
            .await;
        assert_eq!(engine.metrics().get_snapshot().await.degraded_classifier_count, 1);
    }

    #[tokio::test]
    async fn slow_sample_fetch_reads_unknown() {
        let store = MemoryStore {
            sample: Some(samples(1.0)),
            sample_delay: Some(Duration::from_millis(500)),
            ..MemoryStore::default()
        };
        let engine = engine_with(
            store,
            Vec::new(),
            None::<Unavailable>,
            None::<Unavailable>,
            store_deadline(30),
        );

        let outcome = engine.infer("S1", "fine").await;
        assert_eq!(outcome.wellness.status, WellnessStatus::Unknown);
        assert_eq!(outcome.wellness.index, None);
        assert!(outcome.wellness.raw_channels.is_empty());
    }

    #[tokio::test]
    async fn slow_baseline_lookup_keeps_raw_values() {
        let store = MemoryStore {
            sample: Some(samples(1.0)),
            baseline_delay: Some(Duration::from_millis(500)),
            ..MemoryStore::default()
        };
        let engine = engine_with(
            store,
            Vec::new(),
            None::<Unavailable>,
            None::<Unavailable>,
            store_deadline(30),
        );

        let outcome = engine.infer("S1", "fine").await;
        assert_eq!(outcome.wellness.status, WellnessStatus::Unknown);
        assert_eq!(outcome.wellness.index, None);
        assert_eq!(outcome.wellness.raw_channels[&Channel::Eda], Some(1.0));
    }

    #[tokio::test]
    async fn slow_context_fetch_reads_as_empty_history() {
        let engine: Engine<MemoryStore, SlowHistory> = Engine::new(
            MemoryStore::default(),
            SlowHistory(distress_history()),
            None,
            None,
            store_deadline(30),
        )
        .unwrap();

        // with the history this would be repeated distress on Unknown wellness
        let outcome = engine.infer("S1", "another long day").await;
        assert_eq!(outcome.wellness.status, WellnessStatus::Unknown);
        assert!(!outcome.escalation.escalate);
        assert!(outcome.escalation.reasons.is_empty());

        let outcome = engine.infer("S1", "I want to kill myself").await;
        assert!(outcome.escalation.has(EscalationReason::CrisisKeyword));
    }

    #[tokio::test]
    async fn invalid_settings_are_rejected_up_front() {
        let mut zero_threshold = EngineSettings::default();
        zero_threshold.safety.distress_threshold = 0;

        let mut heavy_weights = EngineSettings::default();
        heavy_weights.wellness.weights.eda = 5.0;

        let zero_context = EngineSettings {
            context_limit: 0,
            ..EngineSettings::default()
        };

        for settings in [zero_threshold, heavy_weights, zero_context] {
            let built: anyhow::Result<Engine<MemoryStore, History>> = Engine::new(
                MemoryStore::default(),
                History(Vec::new()),
                None,
                None,
                settings,
            );
            assert!(built.is_err());
        }
    }

    #[tokio::test]
    async fn repeated_distress_with_unknown_wellness_escalates() {
        let engine = engine_with(
            MemoryStore::default(),
            distress_history(),
            None::<Unavailable>,
            None::<Unavailable>,
            EngineSettings::default(),
        );

        let outcome = engine.infer("S1", "another long day").await;
        assert_eq!(outcome.wellness.status, WellnessStatus::Unknown);
        assert!(outcome.escalation.escalate);
        assert!(outcome.escalation.has(EscalationReason::RepeatedDistress));
    }

    #[tokio::test]
    async fn context_limit_bounds_the_window() {
        let history: Vec<ContextRecord> = ["sadness", "sadness", "sadness", "joy", "joy"]
            .iter()
            .map(|label| ContextRecord::new("S1", label, None, Utc::now()))
            .collect();
        let settings = EngineSettings {
            context_limit: 2,
            ..EngineSettings::default()
        };
        let engine = engine_with(
            MemoryStore::default(),
            history,
            None::<Unavailable>,
            None::<Unavailable>,
            settings,
        );

        let outcome = engine.infer("S1", "ok").await;
        assert!(!outcome.escalation.escalate);
    }

    #[tokio::test]
    async fn broken_crisis_pattern_fails_safe() {
        let mut settings = EngineSettings::default();
        settings.safety.extra_crisis_patterns = vec!["[".into()];
        let engine = engine_with(
            MemoryStore::default(),
            Vec::new(),
            None::<Unavailable>,
            None::<Unavailable>,
            settings,
        );

        let outcome = engine.infer("S1", "what a lovely day").await;
        assert!(outcome.escalation.escalate);
        assert!(outcome
            .escalation
            .has(EscalationReason::SafetyCheckUnavailable));
    }
}
