pub mod baseline;
pub mod config;
pub mod fusion;
pub mod normalize;

pub use baseline::get_or_create_baseline;
pub use config::{ChannelWeights, WellnessConfig};
pub use fusion::{compute_index, WellnessSnapshot, WellnessStatus};
pub use normalize::normalize;
