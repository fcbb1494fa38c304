use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{channel_sample, finite_or_null},
    models::SampleSet,
};

fn row_to_sample_set(row: &Row) -> Result<SampleSet, rusqlite::Error> {
    Ok(SampleSet {
        eda: channel_sample(row.get("eda_mean")?, row.get("eda_std")?),
        temp: channel_sample(row.get("temp_mean")?, row.get("temp_std")?),
        bvp: channel_sample(row.get("bvp_mean")?, row.get("bvp_std")?),
        ecg: channel_sample(row.get("ecg_mean")?, row.get("ecg_std")?),
        resp: channel_sample(row.get("resp_mean")?, row.get("resp_std")?),
    })
}

impl Database {
    /// Store one collection window for a subject. Returns the row id.
    pub async fn insert_physiological_sample(
        &self,
        subject_id: &str,
        samples: &SampleSet,
        collected_at: DateTime<Utc>,
    ) -> Result<i64> {
        let subject_id = subject_id.to_string();
        let record = samples.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO physiological_samples (
                    subject_id,
                    collected_at,
                    eda_mean, eda_std,
                    temp_mean, temp_std,
                    bvp_mean, bvp_std,
                    ecg_mean, ecg_std,
                    resp_mean, resp_std
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    subject_id,
                    collected_at.to_rfc3339(),
                    finite_or_null(record.eda.mean),
                    finite_or_null(record.eda.std),
                    finite_or_null(record.temp.mean),
                    finite_or_null(record.temp.std),
                    finite_or_null(record.bvp.mean),
                    finite_or_null(record.bvp.std),
                    finite_or_null(record.ecg.mean),
                    finite_or_null(record.ecg.std),
                    finite_or_null(record.resp.mean),
                    finite_or_null(record.resp.std),
                ],
            )
            .with_context(|| "failed to insert physiological sample")?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Most recent collection window for a subject, if any.
    pub async fn get_latest_sample(&self, subject_id: &str) -> Result<Option<SampleSet>> {
        let subject_id = subject_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT eda_mean, eda_std, temp_mean, temp_std, bvp_mean, bvp_std,
                        ecg_mean, ecg_std, resp_mean, resp_std
                 FROM physiological_samples
                 WHERE subject_id = ?1
                 ORDER BY collected_at DESC, id DESC
                 LIMIT 1",
            )?;

            let result = stmt
                .query_row(params![subject_id], row_to_sample_set)
                .optional()?;

            Ok(result)
        })
        .await
    }
}
