use std::{fmt, sync::Arc};

use anyhow::{Context as _, Result, anyhow};
use gcp_auth::{Token, TokenProvider};
use reqwest::{Response, StatusCode};
use serde_json::{Map, Value};
use tracing::debug;

use crate::bigquery::{
    InsertAllRequest, InsertAllResponse, RowErrors, RowInserter, Table, TableReference,
};

const BIGQUERY_API_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";
const BIGQUERY_SCOPE: &str = "https://www.googleapis.com/auth/bigquery";

pub struct Client {
    http: reqwest::Client,
    auth: Arc<dyn TokenProvider>,
}

impl Client {
    /// Uses application default credentials.
    pub async fn new() -> Result<Self> {
        let auth = gcp_auth::provider()
            .await
            .context("failed to find Google Cloud credentials")?;

        Ok(Self {
            http: reqwest::Client::new(),
            auth,
        })
    }

    pub async fn get_table(&self, reference: &TableReference) -> Result<Table> {
        let url = format!("{BIGQUERY_API_URL}/{}", reference.path());
        let token = self.token().await?;

        let response = self
            .http
            .get(&url)
            .bearer_auth(token.as_str())
            .send()
            .await
            .with_context(|| format!("failed to request table {reference}"))?;

        let table = check_status(response)
            .await?
            .json::<Table>()
            .await
            .with_context(|| format!("failed to decode table {reference}"))?;

        Ok(table)
    }

    async fn token(&self) -> Result<Arc<Token>> {
        self.auth
            .token(&[BIGQUERY_SCOPE])
            .await
            .context("failed to get access token")
    }
}

impl RowInserter for Client {
    async fn insert_rows(
        &self,
        table: &Table,
        rows: Vec<Map<String, Value>>,
    ) -> Result<Vec<RowErrors>> {
        let url = format!("{BIGQUERY_API_URL}/{}/insertAll", table.table_reference.path());
        let token = self.token().await?;
        let request = InsertAllRequest::new(rows);

        debug!(%url, rows = request.rows.len(), "sending insertAll");

        let response = self
            .http
            .post(&url)
            .bearer_auth(token.as_str())
            .json(&request)
            .send()
            .await
            .context("failed to send insertAll request")?;

        let response = check_status(response)
            .await?
            .json::<InsertAllResponse>()
            .await
            .context("failed to decode insertAll response")?;

        Ok(response.insert_errors)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    Err(status_error(status, response.text().await))
}

fn status_error<E: fmt::Display>(status: StatusCode, body: Result<String, E>) -> anyhow::Error {
    let body = body.unwrap_or_else(|e| format!("<unreadable body: {e}>"));
    anyhow!("BigQuery API returned {status}: {body}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_includes_body() {
        let err = status_error::<String>(
            StatusCode::NOT_FOUND,
            Ok(r#"{"error":{"message":"Not found: Table home:env.luminosity"}}"#.to_string()),
        );
        assert_eq!(
            err.to_string(),
            r#"BigQuery API returned 404 Not Found: {"error":{"message":"Not found: Table home:env.luminosity"}}"#
        );
    }

    #[test]
    fn status_error_reports_unreadable_body() {
        let err = status_error(
            StatusCode::SERVICE_UNAVAILABLE,
            Err("connection reset by peer"),
        );
        assert_eq!(
            err.to_string(),
            "BigQuery API returned 503 Service Unavailable: <unreadable body: connection reset by peer>"
        );
    }
}
