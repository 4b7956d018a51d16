use std::fmt;

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::{bigquery::Table, measurement::Measurement};

/// Body of `tabledata.insertAll`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertAllRequest {
    pub rows: Vec<InsertAllRow>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertAllRow {
    /// Lets the service drop a duplicate delivery of the same request.
    pub insert_id: String,

    pub json: Map<String, Value>,
}

impl InsertAllRequest {
    pub fn new(rows: Vec<Map<String, Value>>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .map(|json| InsertAllRow {
                    insert_id: Uuid::new_v4().to_string(),
                    json,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertAllResponse {
    #[serde(default)]
    pub insert_errors: Vec<RowErrors>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RowErrors {
    pub index: u32,

    #[serde(default)]
    pub errors: Vec<ErrorProto>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorProto {
    #[serde(default)]
    pub reason: String,

    #[serde(default)]
    pub location: String,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub debug_info: String,
}

impl fmt::Display for ErrorProto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)?;
        if !self.location.is_empty() {
            write!(f, " at {}", self.location)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }

        Ok(())
    }
}

impl fmt::Display for RowErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        write!(f, "row {}: {}", self.index, errors.join(", "))
    }
}

/// The service accepted the request but rejected rows in it.
#[derive(Debug, Error)]
#[error("insert into {table} rejected: {}", display_errors(.errors))]
pub struct InsertError {
    pub table: String,
    pub errors: Vec<RowErrors>,
}

fn display_errors(errors: &[RowErrors]) -> String {
    let errors: Vec<String> = errors.iter().map(ToString::to_string).collect();
    errors.join("; ")
}

pub trait RowInserter {
    /// Appends rows and returns the per-row errors the service reported.
    fn insert_rows(
        &self,
        table: &Table,
        rows: Vec<Map<String, Value>>,
    ) -> impl Future<Output = Result<Vec<RowErrors>>>;
}

/// Appends one measurement. Row errors are returned as an [`InsertError`].
pub async fn insert_measurement<R: RowInserter>(
    inserter: &R,
    table: &Table,
    measurement: &Measurement,
) -> Result<()> {
    let row = table
        .row(measurement)
        .context("failed to build row from measurement")?;

    let errors = inserter
        .insert_rows(table, vec![row])
        .await
        .with_context(|| format!("failed to insert row into {}", table.table_reference))?;

    if !errors.is_empty() {
        return Err(InsertError {
            table: table.table_reference.to_string(),
            errors,
        }
        .into());
    }

    Ok(())
}
