use thiserror::Error;

/// Failure kinds inside the engine. None of these reach the caller of
/// `Engine::infer`: each one is turned into a neutral or fallback output.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no physiological data for subject {0}")]
    MissingData(String),

    #[error("classifier {name} unavailable: {reason}")]
    ClassifierUnavailable { name: &'static str, reason: String },

    #[error("classifier {name} exceeded {timeout_ms}ms deadline")]
    ClassifierTimeout { name: &'static str, timeout_ms: u64 },

    #[error("store call exceeded {timeout_ms}ms deadline")]
    StoreTimeout { timeout_ms: u64 },

    #[error("invalid crisis pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
