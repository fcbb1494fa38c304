use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::emotion::EnsembleConfig;
use crate::safety::SafetyConfig;
use crate::wellness::WellnessConfig;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub const CLASSIFIER_TIMEOUT_ENV: &str = "WELLSENSE_CLASSIFIER_TIMEOUT_MS";
pub const CONTEXT_LIMIT_ENV: &str = "WELLSENSE_CONTEXT_LIMIT";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    pub ensemble: EnsembleConfig,
    pub wellness: WellnessConfig,
    pub safety: SafetyConfig,

    /// Number of prior turns read for the repeated-distress heuristic.
    pub context_limit: usize,

    pub classifier_timeout_ms: u64,
    pub store_timeout_ms: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            ensemble: EnsembleConfig::default(),
            wellness: WellnessConfig::default(),
            safety: SafetyConfig::default(),
            context_limit: 5,
            classifier_timeout_ms: 2000,
            store_timeout_ms: 2000,
        }
    }
}

impl EngineSettings {
    pub fn validate(&self) -> Result<()> {
        self.ensemble.validate().context("invalid ensemble settings")?;
        self.wellness.validate().context("invalid wellness settings")?;
        self.safety.validate().context("invalid safety settings")?;
        if self.context_limit == 0 {
            bail!("context_limit must be at least 1");
        }
        if self.classifier_timeout_ms == 0 {
            bail!("classifier_timeout_ms must be positive");
        }
        if self.store_timeout_ms == 0 {
            bail!("store_timeout_ms must be positive");
        }
        Ok(())
    }

    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_millis(self.classifier_timeout_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup(CLASSIFIER_TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => self.classifier_timeout_ms = ms,
                _ => log_warn!("ignoring {}={:?}: not a positive integer", CLASSIFIER_TIMEOUT_ENV, raw),
            }
        }
        if let Some(raw) = lookup(CONTEXT_LIMIT_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(limit) if limit > 0 => self.context_limit = limit,
                _ => log_warn!("ignoring {}={:?}: not a positive integer", CONTEXT_LIMIT_ENV, raw),
            }
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<EngineSettings>,
}

impl SettingsStore {
    /// Load settings from `path`. A missing file yields defaults; a malformed
    /// one is logged and also yields defaults.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(err) => {
                    log_warn!(
                        "malformed settings in {}, using defaults: {}",
                        path.display(),
                        err
                    );
                    EngineSettings::default()
                }
            }
        } else {
            EngineSettings::default()
        };

        log_info!("settings loaded from {}", path.display());

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, EngineSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, EngineSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Snapshot of the stored settings with environment overrides applied.
    pub fn effective(&self) -> EngineSettings {
        let mut settings = self.read_guard().clone();
        settings.apply_env();
        settings
    }

    pub fn update(&self, settings: EngineSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.write_guard();
        *guard = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &EngineSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: EngineSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Malformed settings in {}", self.path.display()))?;
        *self.write_guard() = data;
        Ok(())
    }
}
