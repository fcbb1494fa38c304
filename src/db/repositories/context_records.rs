use anyhow::{Context, Result};
use rusqlite::params;

use crate::db::{
    connection::Database,
    helpers::{conversion_error, parse_datetime, to_i64},
    models::ContextRecord,
};

impl Database {
    pub async fn insert_context_record(&self, record: &ContextRecord) -> Result<i64> {
        let record = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO context_records (subject_id, emotion_label, probability, timestamp)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.subject_id,
                    record.emotion_label,
                    record.probability.filter(|p| p.is_finite()),
                    record.timestamp.to_rfc3339(),
                ],
            )
            .with_context(|| "failed to insert context record")?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// The newest `limit` turns for a subject, returned oldest first.
    pub async fn get_recent_context(
        &self,
        subject_id: &str,
        limit: usize,
    ) -> Result<Vec<ContextRecord>> {
        let subject_id = subject_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, subject_id, emotion_label, probability, timestamp
                 FROM context_records
                 WHERE subject_id = ?1
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?2",
            )?;

            let records_iter = stmt.query_map(params![subject_id, to_i64(limit)?], |row| {
                let timestamp_str: String = row.get(4)?;
                let timestamp =
                    parse_datetime(&timestamp_str, "timestamp").map_err(conversion_error)?;

                Ok(ContextRecord {
                    id: row.get(0)?,
                    subject_id: row.get(1)?,
                    emotion_label: row.get(2)?,
                    probability: row.get(3)?,
                    timestamp,
                })
            })?;

            let mut records = Vec::new();
            for record_result in records_iter {
                records.push(record_result?);
            }
            records.reverse();

            Ok(records)
        })
        .await
    }
}
