pub mod config;
pub mod ensemble;
pub mod fallback;
pub mod types;

pub use config::EnsembleConfig;
pub use ensemble::merge;
pub use fallback::keyword_estimate;
pub use types::{EmotionEstimate, EmotionScore, EstimateSource};
