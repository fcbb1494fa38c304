//! Keyword heuristic used when no classifier answered in time.

use crate::emotion::types::{EmotionEstimate, EmotionScore, EstimateSource};

/// Checked in order; the first label with a matching word wins.
const EMOTION_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "joy",
        &["happy", "joy", "delighted", "excited", "glad", "cheerful", "positive", "great"],
    ),
    (
        "sadness",
        &["sad", "down", "depressed", "unhappy", "cry", "miserable", "disappointed", "lonely"],
    ),
    ("anger", &["angry", "mad", "furious", "irritated", "annoyed", "rage"]),
    (
        "fear",
        &["fear", "scared", "afraid", "terrified", "worried", "nervous", "anxious"],
    ),
    (
        "surprise",
        &["surprise", "amazed", "astonished", "shocked", "startled"],
    ),
    ("disgust", &["disgust", "gross", "nasty", "offended"]),
];

/// Whole-word match so that "sad" does not fire on "crusade".
fn contains_word(words: &[&str], keyword: &str) -> bool {
    words.iter().any(|w| *w == keyword)
}

/// Label the text from keyword hits alone. Returns the neutral sentinel when
/// nothing matches.
pub fn keyword_estimate(text: &str) -> EmotionEstimate {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .collect();

    for (label, keywords) in EMOTION_KEYWORDS {
        if keywords.iter().any(|k| contains_word(&words, k)) {
            return EmotionEstimate {
                emotions: vec![EmotionScore::new(*label, 1.0)],
                source: EstimateSource::Keyword,
            };
        }
    }

    EmotionEstimate::sentinel()
}
