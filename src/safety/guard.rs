use std::collections::BTreeSet;

use regex::{RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};

use crate::db::ContextRecord;
use crate::error::EngineResult;
use crate::safety::config::SafetyConfig;
use crate::wellness::WellnessStatus;

/// Self-harm phrases matched as plain substrings of the normalized text.
const CRISIS_KEYWORDS: &[&str] = &[
    "kill myself",
    "suicide",
    "suicidal",
    "end my life",
    "self harm",
    "self-harm",
    "hurt myself",
    "want to die",
    "cut myself",
    "i dont want to live",
    "i don't want to live",
    "can't go on",
    "cant go on",
    "no point living",
    "better off dead",
    "jump off",
    "overdose",
];

/// Paraphrases the keyword list misses.
const CRISIS_PATTERNS: &[&str] = &[
    r"\bkill(?:ing)?\s+my\s*self\b",
    r"\bhurt(?:ing)?\s+my\s*self\b",
    r"\bwant(?:s|ed|ing)?\s+to\s+die\b",
    r"\bwish\s+i\s+(?:was|were)\s+(?:dead|never\s+born)\b",
    r"\bbetter\s+off\s+(?:dead|without\s+me)\b",
    r"\b(?:end|take)\s+my\s+(?:own\s+)?life\b",
    r"\bno\s+(?:point|reason)\s+(?:in\s+)?(?:living|to\s+live|going\s+on)\b",
    r"\bdon'?t\s+want\s+to\s+(?:live|be\s+alive|exist|wake\s+up)\b",
];

/// Phrases implying intent to harm others.
const VIOLENCE_KEYWORDS: &[&str] = &[
    "hurt someone",
    "kill someone",
    "kill them",
    "hurt them",
    "attack",
    "revenge",
    "violence",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    CrisisKeyword,
    RepeatedDistress,
    Violence,
    /// The crisis check itself could not run; escalation is the safe default.
    SafetyCheckUnavailable,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EscalationDecision {
    pub escalate: bool,
    pub reasons: BTreeSet<EscalationReason>,
}

impl EscalationDecision {
    pub fn fail_safe() -> Self {
        Self {
            escalate: true,
            reasons: BTreeSet::from([EscalationReason::SafetyCheckUnavailable]),
        }
    }

    pub fn has(&self, reason: EscalationReason) -> bool {
        self.reasons.contains(&reason)
    }
}

/// Lower-case, fold typographic apostrophes and collapse whitespace so the
/// substring list sees one canonical spelling.
fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .replace(['\u{2019}', '\u{2018}'], "'")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compiled crisis/violence matcher plus the repeated-distress heuristic.
#[derive(Debug, Clone)]
pub struct SafetyGuard {
    crisis_patterns: RegexSet,
    distress_labels: BTreeSet<String>,
    distress_threshold: usize,
    low_wellness: Vec<WellnessStatus>,
}

impl SafetyGuard {
    pub fn new(config: &SafetyConfig) -> EngineResult<Self> {
        let patterns = CRISIS_PATTERNS
            .iter()
            .map(|p| p.to_string())
            .chain(config.extra_crisis_patterns.iter().cloned());
        let crisis_patterns = RegexSetBuilder::new(patterns)
            .case_insensitive(true)
            .build()?;

        Ok(Self {
            crisis_patterns,
            distress_labels: config
                .distress_labels
                .iter()
                .map(|l| l.trim().to_lowercase())
                .collect(),
            distress_threshold: config.distress_threshold,
            low_wellness: config.low_wellness.clone(),
        })
    }

    pub fn is_crisis(&self, text: &str) -> bool {
        let normalized = normalize_text(text);
        CRISIS_KEYWORDS.iter().any(|kw| normalized.contains(kw))
            || self.crisis_patterns.is_match(&normalized)
    }

    pub fn is_violent(&self, text: &str) -> bool {
        let normalized = normalize_text(text);
        VIOLENCE_KEYWORDS.iter().any(|kw| normalized.contains(kw))
    }

    /// Number of context turns labelled with a distress emotion.
    pub fn distress_count(&self, history: &[ContextRecord]) -> usize {
        history
            .iter()
            .filter(|record| {
                self.distress_labels
                    .contains(&record.emotion_label.trim().to_lowercase())
            })
            .count()
    }

    /// Decide whether the reply must be replaced by the safety response.
    ///
    /// A crisis phrase escalates immediately and nothing else is checked.
    /// Repeated distress escalates only together with a low wellness status.
    /// Violence adds a reason but never flips the flag on its own.
    pub fn decide(
        &self,
        text: &str,
        wellness_status: WellnessStatus,
        history: &[ContextRecord],
    ) -> EscalationDecision {
        if self.is_crisis(text) {
            return EscalationDecision {
                escalate: true,
                reasons: BTreeSet::from([EscalationReason::CrisisKeyword]),
            };
        }

        let mut decision = EscalationDecision::default();

        let repeated_distress = self.distress_count(history) >= self.distress_threshold;
        let low_wellness = self.low_wellness.contains(&wellness_status);
        if repeated_distress && low_wellness {
            decision.escalate = true;
            decision.reasons.insert(EscalationReason::RepeatedDistress);
        }

        if self.is_violent(text) {
            decision.reasons.insert(EscalationReason::Violence);
        }

        decision
    }
}
