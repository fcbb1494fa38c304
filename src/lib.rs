pub mod cli;
pub mod db;
pub mod emotion;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod safety;
pub mod settings;
pub mod store;
mod utils;
pub mod wellness;

pub use db::Database;
pub use emotion::{EmotionEstimate, EmotionScore};
pub use engine::{Engine, InferenceOutcome};
pub use error::{EngineError, EngineResult};
pub use safety::{EscalationDecision, EscalationReason};
pub use settings::{EngineSettings, SettingsStore};
pub use wellness::{WellnessSnapshot, WellnessStatus};

pub fn run() -> anyhow::Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let command = cli::Command::parse(std::env::args().skip(1))?;
    log::info!("wellsense starting: {command:?}");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(cli::execute(command))
}
