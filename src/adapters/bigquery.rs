//! BigQuery REST API：`tabledata.insertAll` 串流寫入，以及健康檢查用的 `SELECT 1`。

use crate::adapters::{endpoint_url, error_message, parse_endpoint, TokenProvider};
use crate::core::{EventRow, TableRef, Warehouse};
use crate::domain::model::InsertError;
use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const DEFAULT_BIGQUERY_ENDPOINT: &str = "https://bigquery.googleapis.com";

const HEALTH_QUERY: &str = "SELECT 1";
const QUERY_TIMEOUT_MS: u64 = 10_000;
const MAX_QUERY_POLLS: u32 = 5;

#[derive(Serialize)]
struct InsertAllRequest<'a> {
    kind: &'static str,
    rows: Vec<InsertRow<'a>>,
}

#[derive(Serialize)]
struct InsertRow<'a> {
    json: &'a EventRow,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<InsertError>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    query: &'a str,
    use_legacy_sql: bool,
    timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    job_reference: Option<JobReference>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BigQueryClient {
    client: reqwest::Client,
    endpoint: Url,
    auth: TokenProvider,
    project: String,
    poll_interval: Duration,
}

impl BigQueryClient {
    pub fn new(
        client: reqwest::Client,
        endpoint: &str,
        auth: TokenProvider,
        project: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            client,
            endpoint: parse_endpoint("bigquery_endpoint", endpoint)?,
            auth,
            project: project.into(),
            poll_interval: Duration::from_millis(500),
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    async fn send_json<T, B>(&self, request: reqwest::RequestBuilder, body: Option<&B>) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = match body {
            Some(body) => request.json(body),
            None => request,
        };
        let response = self.auth.authorize(request).await?.send().await?;

        if !response.status().is_success() {
            let (status, message) = error_message(response).await;
            return Err(EtlError::BigQueryError { status, message });
        }
        Ok(response.json().await?)
    }

    async fn poll_query(&self, job: &JobReference) -> Result<QueryResponse> {
        let mut url = endpoint_url(
            &self.endpoint,
            &["bigquery", "v2", "projects", &self.project, "queries", &job.job_id],
        )?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("timeoutMs", &QUERY_TIMEOUT_MS.to_string());
            if let Some(location) = &job.location {
                query.append_pair("location", location);
            }
        }

        self.send_json::<QueryResponse, ()>(self.client.get(url), None).await
    }
}

impl Warehouse for BigQueryClient {
    async fn insert_rows(&self, table: &TableRef, rows: &[EventRow]) -> Result<Vec<InsertError>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let url = endpoint_url(
            &self.endpoint,
            &[
                "bigquery",
                "v2",
                "projects",
                &table.project,
                "datasets",
                &table.dataset,
                "tables",
                &table.table,
                "insertAll",
            ],
        )?;
        let body = InsertAllRequest {
            kind: "bigquery#tableDataInsertAllRequest",
            rows: rows.iter().map(|row| InsertRow { json: row }).collect(),
        };

        let response: InsertAllResponse = self.send_json(self.client.post(url), Some(&body)).await?;
        Ok(response.insert_errors)
    }

    async fn ping(&self) -> Result<()> {
        let url = endpoint_url(
            &self.endpoint,
            &["bigquery", "v2", "projects", &self.project, "queries"],
        )?;
        let body = QueryRequest {
            query: HEALTH_QUERY,
            use_legacy_sql: false,
            timeout_ms: QUERY_TIMEOUT_MS,
        };

        let mut response: QueryResponse = self.send_json(self.client.post(url), Some(&body)).await?;

        let mut polls = 0;
        while !response.job_complete {
            let Some(job) = response.job_reference.clone() else {
                return Err(EtlError::ProcessingError {
                    message: "query response has no job reference".to_string(),
                });
            };
            if polls >= MAX_QUERY_POLLS {
                return Err(EtlError::ProcessingError {
                    message: format!("query job {} did not complete", job.job_id),
                });
            }
            polls += 1;
            tokio::time::sleep(self.poll_interval).await;
            response = self.poll_query(&job).await?;
        }

        Ok(())
    }
}

/// `--dry-run` 使用：把每一列以 JSON lines 印到 stdout，不寫入 BigQuery
#[derive(Debug, Clone, Default)]
pub struct StdoutWarehouse;

impl Warehouse for StdoutWarehouse {
    async fn insert_rows(&self, table: &TableRef, rows: &[EventRow]) -> Result<Vec<InsertError>> {
        tracing::info!("Dry run: {} rows for {}", rows.len(), table.full_id());
        for row in rows {
            println!("{}", serde_json::to_string(row)?);
        }
        Ok(Vec::new())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::EventRecord;
    use httpmock::prelude::*;

    fn client(server: &MockServer) -> BigQueryClient {
        let http = reqwest::Client::new();
        let auth = TokenProvider::fixed("bq-token");
        BigQueryClient::new(http, &server.base_url(), auth, "test-project")
            .unwrap()
            .with_poll_interval(Duration::from_millis(1))
    }

    fn table() -> TableRef {
        TableRef::new("test-project", "network_logs", "error_disable_events")
    }

    fn row(device: &str) -> EventRow {
        EventRow::new(
            EventRecord {
                event_timestamp: "2024-03-05T07:08:09.000000".to_string(),
                device_name: device.to_string(),
                interface: "gi0/1".to_string(),
                error_reason: "bpduguard".to_string(),
                raw_message: format!("{device} %PM-4-ERR_DISABLE: bpduguard error detected on Gi0/1"),
            },
            "2024-03-05T07:08:10.000000",
        )
    }

    #[tokio::test]
    async fn test_insert_rows_success() {
        let server = MockServer::start();
        let insert = server.mock(|when, then| {
            when.method(POST)
                .path("/bigquery/v2/projects/test-project/datasets/network_logs/tables/error_disable_events/insertAll")
                .header("Authorization", "Bearer bq-token")
                .body_contains(r#""kind":"bigquery#tableDataInsertAllRequest""#)
                .body_contains(r#""device_name":"sw1""#)
                .body_contains(r#""ingestion_time":"2024-03-05T07:08:10.000000""#);
            then.status(200)
                .json_body(serde_json::json!({"kind": "bigquery#tableDataInsertAllResponse"}));
        });

        let errors = client(&server).insert_rows(&table(), &[row("sw1")]).await.unwrap();

        insert.assert();
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn test_insert_rows_returns_row_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path_contains("/insertAll");
            then.status(200).json_body(serde_json::json!({
                "kind": "bigquery#tableDataInsertAllResponse",
                "insertErrors": [
                    {"index": 1, "errors": [{"reason": "invalid", "location": "interface", "message": "too long"}]}
                ]
            }));
        });

        let errors = client(&server)
            .insert_rows(&table(), &[row("sw1"), row("sw2")])
            .await
            .unwrap();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].index, 1);
        assert_eq!(errors[0].errors[0].location.as_deref(), Some("interface"));
    }

    #[tokio::test]
    async fn test_insert_rows_table_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path_contains("/insertAll");
            then.status(404).json_body(serde_json::json!({
                "error": {"code": 404, "message": "Not found: Table test-project:network_logs.error_disable_events"}
            }));
        });

        let err = client(&server).insert_rows(&table(), &[row("sw1")]).await.unwrap_err();

        match err {
            EtlError::BigQueryError { status, message } => {
                assert_eq!(status, 404);
                assert!(message.starts_with("Not found: Table"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ping_completed_query() {
        let server = MockServer::start();
        let query = server.mock(|when, then| {
            when.method(POST)
                .path("/bigquery/v2/projects/test-project/queries")
                .json_body_partial(r#"{"query": "SELECT 1", "useLegacySql": false}"#);
            then.status(200).json_body(serde_json::json!({
                "kind": "bigquery#queryResponse",
                "jobComplete": true,
                "jobReference": {"projectId": "test-project", "jobId": "job_1", "location": "US"},
                "rows": [{"f": [{"v": "1"}]}]
            }));
        });

        client(&server).ping().await.unwrap();
        query.assert();
    }

    #[tokio::test]
    async fn test_ping_polls_until_complete() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/bigquery/v2/projects/test-project/queries");
            then.status(200).json_body(serde_json::json!({
                "jobComplete": false,
                "jobReference": {"projectId": "test-project", "jobId": "job_2", "location": "EU"}
            }));
        });
        let poll = server.mock(|when, then| {
            when.method(GET)
                .path("/bigquery/v2/projects/test-project/queries/job_2")
                .query_param("location", "EU");
            then.status(200).json_body(serde_json::json!({"jobComplete": true}));
        });

        client(&server).ping().await.unwrap();
        poll.assert_hits(1);
    }

    #[tokio::test]
    async fn test_ping_gives_up_after_max_polls() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.path_contains("/queries");
            then.status(200).json_body(serde_json::json!({
                "jobComplete": false,
                "jobReference": {"jobId": "job_3"}
            }));
        });

        let err = client(&server).ping().await.unwrap_err();
        assert!(err.to_string().contains("job_3"));
    }

    #[tokio::test]
    async fn test_ping_access_denied() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/bigquery/v2/projects/test-project/queries");
            then.status(403).json_body(serde_json::json!({
                "error": {"code": 403, "message": "Access Denied: Project test-project"}
            }));
        });

        let err = client(&server).ping().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "BigQuery request failed with status 403: Access Denied: Project test-project"
        );
    }
}
