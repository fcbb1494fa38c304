//! Line-oriented command front end: JSON lines on stdin, JSON lines on stdout.

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{Channel, ChannelSample, ContextRecord, Database, SampleSet};
use crate::emotion::EmotionScore;
use crate::engine::Engine;
use crate::settings::{EngineSettings, SettingsStore};
use crate::store::Precomputed;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

const USAGE: &str = "usage: wellsense ingest <db> | wellsense infer <db> [settings.json]";

#[derive(Debug)]
pub enum Command {
    Ingest { db_path: PathBuf },
    Infer { db_path: PathBuf, settings_path: Option<PathBuf> },
}

impl Command {
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut args = args.into_iter();
        let command = args.next();
        let db_path = args.next().map(PathBuf::from);

        match (command.as_deref(), db_path) {
            (Some("ingest"), Some(db_path)) => Ok(Command::Ingest { db_path }),
            (Some("infer"), Some(db_path)) => Ok(Command::Infer {
                db_path,
                settings_path: args.next().map(PathBuf::from),
            }),
            _ => bail!(USAGE),
        }
    }
}

/// One collection window. Either summaries or raw signal windows per channel;
/// raw signals win for channels present in both.
#[derive(Debug, Deserialize)]
struct IngestLine {
    subject_id: String,
    collected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    channels: SampleSet,
    #[serde(default)]
    signals: BTreeMap<Channel, Vec<f64>>,
}

impl IngestLine {
    fn sample_set(&self) -> SampleSet {
        self.signals
            .iter()
            .fold(self.channels.clone(), |set, (channel, signal)| {
                set.with(*channel, ChannelSample::from_signal(signal))
            })
    }
}

#[derive(Debug, Deserialize)]
struct InferLine {
    subject_id: String,
    text: String,
    primary: Option<Vec<EmotionScore>>,
    secondary: Option<Vec<EmotionScore>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RejectedLine {
    line: usize,
    error: String,
}

pub async fn execute(command: Command) -> Result<()> {
    match command {
        Command::Ingest { db_path } => {
            let database = Database::new(db_path)?;
            ingest(&database, io::stdin().lock(), io::stdout().lock()).await
        }
        Command::Infer {
            db_path,
            settings_path,
        } => {
            let settings = load_settings(settings_path)?;
            let database = Database::new(db_path)?;
            infer(&database, settings, io::stdin().lock(), io::stdout().lock()).await
        }
    }
}

fn load_settings(path: Option<PathBuf>) -> Result<EngineSettings> {
    let settings = match path {
        Some(path) => SettingsStore::new(path)?.effective(),
        None => {
            let mut settings = EngineSettings::default();
            settings.apply_env();
            settings
        }
    };
    settings.validate()?;
    Ok(settings)
}

fn reject<W: Write>(output: &mut W, line: usize, error: impl ToString) -> Result<()> {
    let rejected = RejectedLine {
        line,
        error: error.to_string(),
    };
    writeln!(output, "{}", serde_json::to_string(&rejected)?)?;
    Ok(())
}

pub async fn ingest<R: BufRead, W: Write>(database: &Database, input: R, mut output: W) -> Result<()> {
    let mut stored = 0usize;

    for (index, line) in input.lines().enumerate() {
        let line = line.context("failed to read input line")?;
        if line.trim().is_empty() {
            continue;
        }

        let record: IngestLine = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(err) => {
                log_warn!("skipping malformed ingest line {}: {}", index + 1, err);
                reject(&mut output, index + 1, err)?;
                continue;
            }
        };

        let collected_at = record.collected_at.unwrap_or_else(Utc::now);
        database
            .insert_physiological_sample(&record.subject_id, &record.sample_set(), collected_at)
            .await?;
        stored += 1;
    }

    log_info!("ingested {} sample sets", stored);
    Ok(())
}

pub async fn infer<R: BufRead, W: Write>(
    database: &Database,
    settings: EngineSettings,
    input: R,
    mut output: W,
) -> Result<()> {
    let engine: Engine<Database, Database> =
        Engine::new(database.clone(), database.clone(), None, None, settings)?;

    for (index, line) in input.lines().enumerate() {
        let line = line.context("failed to read input line")?;
        if line.trim().is_empty() {
            continue;
        }

        let request: InferLine = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(err) => {
                log_warn!("skipping malformed infer line {}: {}", index + 1, err);
                reject(&mut output, index + 1, err)?;
                continue;
            }
        };

        if request.text.trim().is_empty() {
            reject(&mut output, index + 1, "text must not be blank")?;
            continue;
        }

        // An absent field is an unconfigured slot, not a failed provider.
        let primary = request
            .primary
            .map(|scores| Precomputed::new("primary", Some(scores)));
        let secondary = request
            .secondary
            .map(|scores| Precomputed::new("secondary", Some(scores)));
        let outcome = engine
            .infer_with(
                &request.subject_id,
                &request.text,
                primary.as_ref(),
                secondary.as_ref(),
            )
            .await;

        writeln!(output, "{}", serde_json::to_string(&outcome)?)?;

        if let Some(top) = outcome.emotions.top() {
            let record = ContextRecord::new(
                &request.subject_id,
                &top.label,
                Some(top.probability),
                Utc::now(),
            );
            database.insert_context_record(&record).await?;
        }
    }

    let snapshot = engine.metrics().get_snapshot().await;
    log_info!(
        "processed {} requests: {} escalated, {} degraded classifier calls, {} unknown wellness",
        snapshot.inference_count,
        snapshot.escalation_count,
        snapshot.degraded_classifier_count,
        snapshot.unknown_wellness_count
    );

    Ok(())
}
