use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::emotion::config::EnsembleConfig;
use crate::emotion::types::{EmotionEstimate, EmotionScore, EstimateSource};

/// Lower-case labels, drop non-finite probabilities, clamp to [0, 1] and sort
/// descending. The sort is stable so equal probabilities keep provider order.
fn ranked(scores: &[EmotionScore]) -> Vec<EmotionScore> {
    let mut cleaned: Vec<EmotionScore> = scores
        .iter()
        .filter(|s| s.probability.is_finite())
        .map(|s| EmotionScore::new(s.label.trim().to_lowercase(), s.probability.clamp(0.0, 1.0)))
        .filter(|s| !s.label.is_empty())
        .collect();
    cleaned.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    cleaned
}

/// label -> probability. A label repeated after case folding keeps its
/// highest probability.
fn score_map(scores: &[EmotionScore]) -> BTreeMap<&str, f64> {
    let mut map = BTreeMap::new();
    for score in scores {
        let entry = map.entry(score.label.as_str()).or_insert(0.0_f64);
        *entry = entry.max(score.probability);
    }
    map
}

/// Descending score, then ascending label so ties resolve the same way on
/// every run.
fn by_score_then_label(a: &EmotionScore, b: &EmotionScore) -> Ordering {
    b.probability
        .total_cmp(&a.probability)
        .then_with(|| a.label.cmp(&b.label))
}

/// Merge the primary and secondary classifier outputs into one ranked
/// estimate of at most `top_n` emotions.
///
/// A confident primary (top probability >= `min_primary_confidence`) is
/// returned as-is and the secondary is never consulted. A missing primary
/// falls back to the secondary, and with neither the result is the
/// `("neutral", 1.0)` sentinel. Otherwise every label from either model is
/// scored `w * primary + (1 - w) * secondary`, absent labels counting as 0.
pub fn merge(
    primary: &[EmotionScore],
    secondary: &[EmotionScore],
    top_n: usize,
    config: &EnsembleConfig,
) -> EmotionEstimate {
    let top_n = top_n.max(1);
    let primary = ranked(primary);
    let secondary = ranked(secondary);

    let primary_conf = primary.first().map(|s| s.probability).unwrap_or(0.0);
    if !primary.is_empty() && primary_conf >= config.min_primary_confidence {
        return EmotionEstimate {
            emotions: primary.into_iter().take(top_n).collect(),
            source: EstimateSource::Primary,
        };
    }

    if primary.is_empty() {
        if secondary.is_empty() {
            return EmotionEstimate::sentinel();
        }
        return EmotionEstimate {
            emotions: secondary.into_iter().take(top_n).collect(),
            source: EstimateSource::Secondary,
        };
    }

    let weight = config.primary_weight.clamp(0.0, 1.0);
    let primary_scores = score_map(&primary);
    let secondary_scores = score_map(&secondary);

    let mut combined: Vec<EmotionScore> = primary_scores
        .keys()
        .chain(secondary_scores.keys())
        .copied()
        .collect::<std::collections::BTreeSet<&str>>()
        .into_iter()
        .map(|label| {
            let p = primary_scores.get(label).copied().unwrap_or(0.0);
            let s = secondary_scores.get(label).copied().unwrap_or(0.0);
            EmotionScore::new(label, weight * p + (1.0 - weight) * s)
        })
        .collect();

    combined.sort_by(by_score_then_label);
    combined.truncate(top_n);

    EmotionEstimate {
        emotions: combined,
        source: EstimateSource::Blended,
    }
}
