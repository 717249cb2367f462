// Adapters layer: concrete implementations for external systems (GCS, BigQuery, Google credentials, local disk).

pub mod auth;
pub mod bigquery;
pub mod gcs;
pub mod local;

pub use auth::{AdcAuth, TokenProvider};
pub use bigquery::{BigQueryClient, StdoutWarehouse};
pub use gcs::GcsStorage;
pub use local::LocalStorage;

use crate::utils::error::{EtlError, Result};
use serde::Deserialize;
use url::Url;

#[derive(Deserialize)]
struct GoogleErrorBody {
    error: GoogleError,
}

#[derive(Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: String,
}

/// 取出 Google API 錯誤回應中的 message；無法解析時回傳原始內容
pub(crate) async fn error_message(response: reqwest::Response) -> (u16, String) {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = match serde_json::from_str::<GoogleErrorBody>(&body) {
        Ok(parsed) if !parsed.error.message.is_empty() => parsed.error.message,
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    };

    (status.as_u16(), message)
}

/// endpoint 加上路徑段落；每個段落都會被 percent-encode（包含 `/`）
pub(crate) fn endpoint_url(endpoint: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = endpoint.clone();
    url.path_segments_mut()
        .map_err(|_| EtlError::ConfigError {
            message: format!("Endpoint cannot be used as a base URL: {}", endpoint),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub(crate) fn parse_endpoint(field_name: &str, endpoint: &str) -> Result<Url> {
    Url::parse(endpoint).map_err(|e| EtlError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: endpoint.to_string(),
        reason: format!("Invalid URL format: {}", e),
    })
}
