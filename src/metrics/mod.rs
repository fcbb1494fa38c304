mod types;

pub use types::{InferenceMetrics, MetricsSnapshot};

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::wellness::WellnessStatus;

const MAX_RECENT_INFERENCES: usize = 20;

pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsState>>,
}

#[derive(Default)]
struct MetricsState {
    recent_inferences: VecDeque<InferenceMetrics>,
    inference_count: u64,
    escalation_count: u64,
    degraded_classifier_count: u64,
    unknown_wellness_count: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsState {
                recent_inferences: VecDeque::with_capacity(MAX_RECENT_INFERENCES),
                ..MetricsState::default()
            })),
        }
    }

    pub async fn record_inference(&self, metrics: InferenceMetrics) {
        let mut state = self.inner.lock().await;

        state.inference_count += 1;
        if metrics.escalate {
            state.escalation_count += 1;
        }
        if metrics.wellness_status == WellnessStatus::Unknown {
            state.unknown_wellness_count += 1;
        }
        state.degraded_classifier_count += u64::from(metrics.degraded_classifiers);

        state.recent_inferences.push_back(metrics);

        if state.recent_inferences.len() > MAX_RECENT_INFERENCES {
            state.recent_inferences.pop_front();
        }
    }

    pub async fn get_snapshot(&self) -> MetricsSnapshot {
        let state = self.inner.lock().await;

        MetricsSnapshot {
            recent_inferences: state.recent_inferences.iter().cloned().collect(),
            inference_count: state.inference_count,
            escalation_count: state.escalation_count,
            degraded_classifier_count: state.degraded_classifier_count,
            unknown_wellness_count: state.unknown_wellness_count,
        }
    }

    pub async fn reset(&self) {
        let mut state = self.inner.lock().await;
        *state = MetricsState::default();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MetricsCollector {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
