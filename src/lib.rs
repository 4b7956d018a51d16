pub mod bigquery;
pub mod measurement;
pub mod sensor;
pub mod tsl2561;
