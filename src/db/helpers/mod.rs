use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::db::models::ChannelSample;

pub fn to_i64(value: usize) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

/// Wraps a conversion error so it can be returned from a rusqlite row closure.
pub fn conversion_error(err: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        err.to_string(),
    )))
}

/// SQLite has no NaN; non-finite statistics are stored as NULL.
pub fn finite_or_null(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

pub fn channel_sample(mean: Option<f64>, std: Option<f64>) -> ChannelSample {
    ChannelSample {
        mean: finite_or_null(mean),
        std: finite_or_null(std),
    }
}
