use std::fmt;

use anyhow::{Result, bail};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::measurement::Measurement;

pub const MEASUREMENT_COLUMNS: [&str; 5] =
    ["lux", "broadband", "infrared", "sensor_id", "requested_at"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableReference {
    pub project_id: String,

    pub dataset_id: String,

    pub table_id: String,
}

impl TableReference {
    pub fn new(
        project_id: impl Into<String>,
        dataset_id: impl Into<String>,
        table_id: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            dataset_id: dataset_id.into(),
            table_id: table_id.into(),
        }
    }

    /// Resource path relative to the BigQuery v2 API root.
    pub fn path(&self) -> String {
        format!(
            "projects/{}/datasets/{}/tables/{}",
            self.project_id, self.dataset_id, self.table_id
        )
    }
}

impl fmt::Display for TableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project_id, self.dataset_id, self.table_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldSchema {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: String,

    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

/// Table metadata as returned by `tables.get`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub table_reference: TableReference,

    #[serde(default)]
    pub schema: TableSchema,
}

impl Table {
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.schema.fields.iter().find(|f| f.name == name)
    }

    pub fn ensure_columns(&self, names: &[&str]) -> Result<()> {
        let missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| self.field(name).is_none())
            .collect();

        if !missing.is_empty() {
            bail!(
                "table {} is missing columns: {}",
                self.table_reference,
                missing.join(", ")
            );
        }

        Ok(())
    }

    /// Shapes a measurement into a row, formatting `requested_at` for the
    /// column's type.
    pub fn row(&self, measurement: &Measurement) -> Result<Map<String, Value>> {
        self.ensure_columns(&MEASUREMENT_COLUMNS)?;

        let requested_at = match self.field("requested_at").map(|f| f.field_type.as_str()) {
            Some("TIMESTAMP") => measurement
                .requested_at
                .with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Micros, true),
            Some("DATETIME") => measurement
                .requested_at
                .naive_local()
                .format("%Y-%m-%dT%H:%M:%S%.6f")
                .to_string(),
            _ => measurement
                .requested_at
                .to_rfc3339_opts(SecondsFormat::Micros, false),
        };

        let mut row = Map::new();
        row.insert("lux".to_string(), measurement.lux.into());
        row.insert("broadband".to_string(), measurement.broadband.into());
        row.insert("infrared".to_string(), measurement.infrared.into());
        row.insert("sensor_id".to_string(), measurement.sensor_id.clone().into());
        row.insert("requested_at".to_string(), requested_at.into());

        Ok(row)
    }
}
