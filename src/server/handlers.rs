use crate::config::settings::SERVICE_NAME;
use crate::core::{ObjectRef, ProcessSummary, Warehouse};
use crate::server::AppState;
use crate::utils::error::EtlError;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

const MISSING_PARAMS: &str = "bucket and file required";

/// 只接受 JSON 物件中非空字串的 `bucket` 與 `file`
pub fn parse_process_request(body: &[u8]) -> Option<ObjectRef> {
    let payload: Value = serde_json::from_slice(body).ok()?;
    let field = |name: &str| {
        payload
            .get(name)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    Some(ObjectRef::new(field("bucket")?, field("file")?))
}

fn summary_response(source: &ObjectRef, summary: ProcessSummary) -> Response {
    if summary.is_partial() {
        return (
            StatusCode::MULTI_STATUS,
            Json(json!({
                "status": "partial_success",
                "processed_lines": summary.processed_lines,
                "skipped_lines": summary.skipped_lines,
                "matched_records": summary.matched_records,
                "inserted_records": summary.inserted_records,
                "bigquery_errors": summary.insert_errors,
            })),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "processed_lines": summary.processed_lines,
            "skipped_lines": summary.skipped_lines,
            "matched_records": summary.matched_records,
            "inserted_records": summary.inserted_records,
            "bucket": source.bucket,
            "file": source.name,
        })),
    )
        .into_response()
}

fn error_response(error: EtlError) -> Response {
    match error {
        EtlError::ObjectNotFound { bucket, object } => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": format!("File {} not found in bucket {}", object, bucket),
            })),
        )
            .into_response(),
        other => {
            tracing::error!("❌ Processing failed: {} ({})", other, other.kind());
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "error": other.to_string(),
                    "error_type": other.kind(),
                })),
            )
                .into_response()
        }
    }
}

pub async fn process(State(state): State<AppState>, body: Bytes) -> Response {
    let Some(source) = parse_process_request(&body) else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": MISSING_PARAMS }))).into_response();
    };

    match state.engine().run(&source).await {
        Ok(summary) => summary_response(&source, summary),
        Err(e) => error_response(e),
    }
}

pub async fn health(State(state): State<AppState>) -> Response {
    let pipeline = state.engine().pipeline();

    match pipeline.warehouse().ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "service": SERVICE_NAME,
                "bigquery": "connected",
                "table": pipeline.table().full_id(),
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "unhealthy",
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::InsertError;

    #[test]
    fn test_parse_process_request() {
        let source = parse_process_request(br#"{"bucket": "logs", "file": "a/b.log"}"#).unwrap();
        assert_eq!(source, ObjectRef::new("logs", "a/b.log"));

        assert!(parse_process_request(br#"{"bucket": "logs"}"#).is_none());
        assert!(parse_process_request(br#"{"bucket": "", "file": "b.log"}"#).is_none());
        assert!(parse_process_request(br#"{"bucket": 1, "file": "b.log"}"#).is_none());
        assert!(parse_process_request(b"null").is_none());
        assert!(parse_process_request(b"not json").is_none());
        assert!(parse_process_request(b"").is_none());
    }

    #[test]
    fn test_summary_response_status() {
        let source = ObjectRef::new("logs", "a.log");
        let ok = ProcessSummary {
            processed_lines: 3,
            skipped_lines: 0,
            matched_records: 1,
            inserted_records: 1,
            insert_errors: vec![],
        };
        assert_eq!(summary_response(&source, ok.clone()).status(), StatusCode::OK);

        let partial = ProcessSummary {
            inserted_records: 0,
            insert_errors: vec![InsertError {
                index: 0,
                errors: vec![],
            }],
            ..ok
        };
        assert_eq!(
            summary_response(&source, partial).status(),
            StatusCode::MULTI_STATUS
        );
    }

    #[test]
    fn test_error_response_status() {
        let not_found = error_response(EtlError::ObjectNotFound {
            bucket: "logs".to_string(),
            object: "a.log".to_string(),
        });
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let failure = error_response(EtlError::BigQueryError {
            status: 404,
            message: "Not found: Table".to_string(),
        });
        assert_eq!(failure.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
