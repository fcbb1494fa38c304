pub mod baseline;
pub mod channel;
pub mod context_record;

pub use baseline::Baseline;
pub use channel::{Channel, ChannelSample, Polarity, SampleSet};
pub use context_record::ContextRecord;
