use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{from_str, to_string};

use crate::db::{
    connection::Database,
    helpers::{conversion_error, parse_datetime},
    models::{Baseline, SampleSet},
};

fn select_baseline(conn: &Connection, subject_id: &str) -> Result<Option<Baseline>> {
    let mut stmt = conn.prepare(
        "SELECT subject_id, channels_json, created_at
         FROM baselines
         WHERE subject_id = ?1",
    )?;

    let result = stmt
        .query_row(params![subject_id], |row| {
            let subject_id: String = row.get(0)?;
            let channels_json: String = row.get(1)?;
            let created_at: String = row.get(2)?;

            let channels: SampleSet = from_str(&channels_json)
                .map_err(|e| conversion_error(anyhow!("invalid channels_json: {e}")))?;
            let created_at =
                parse_datetime(&created_at, "created_at").map_err(conversion_error)?;

            Ok(Baseline {
                subject_id,
                channels,
                created_at,
            })
        })
        .optional()?;

    Ok(result)
}

impl Database {
    pub async fn get_baseline(&self, subject_id: &str) -> Result<Option<Baseline>> {
        let subject_id = subject_id.to_string();
        self.execute(move |conn| select_baseline(conn, &subject_id))
            .await
    }

    /// Insert the baseline unless one already exists for the subject, then
    /// return whichever record is stored. The whole channel set is written as a
    /// single row so concurrent creators converge on the first insert.
    pub async fn insert_baseline_if_absent(&self, baseline: &Baseline) -> Result<Baseline> {
        let record = baseline.clone();
        self.execute(move |conn| {
            let channels_json =
                to_string(&record.channels).context("failed to serialize baseline channels")?;

            let inserted = conn
                .execute(
                    "INSERT INTO baselines (subject_id, channels_json, created_at)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(subject_id) DO NOTHING",
                    params![
                        record.subject_id,
                        channels_json,
                        record.created_at.to_rfc3339(),
                    ],
                )
                .with_context(|| "failed to insert baseline")?;

            if inserted == 0 {
                log::debug!(
                    "baseline for {} already present; keeping stored record",
                    record.subject_id
                );
            }

            select_baseline(conn, &record.subject_id)?
                .ok_or_else(|| anyhow!("baseline for {} missing after insert", record.subject_id))
        })
        .await
    }
}
