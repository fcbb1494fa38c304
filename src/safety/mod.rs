pub mod config;
pub mod guard;

pub use config::SafetyConfig;
pub use guard::{EscalationDecision, EscalationReason, SafetyGuard};
