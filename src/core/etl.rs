use crate::core::{ObjectRef, Pipeline, ProcessSummary};
use crate::utils::error::Result;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    #[tracing::instrument(skip_all, fields(source = %source))]
    pub async fn run(&self, source: &ObjectRef) -> Result<ProcessSummary> {
        tracing::info!("Starting ETL process");

        // Extract
        let raw = self.pipeline.extract(source).await?;
        tracing::info!("Extracted {} bytes", raw.content.len());

        // Transform
        let transformed = self.pipeline.transform(raw).await?;
        tracing::info!(
            "Transformed {} lines ({} skipped), matched {} records",
            transformed.processed_lines,
            transformed.skipped_lines,
            transformed.records.len()
        );

        // Load
        let loaded = self.pipeline.load(&transformed).await?;
        if loaded.errors.is_empty() {
            tracing::info!("✅ Inserted {} records", loaded.inserted);
        } else {
            tracing::warn!("⚠️ BigQuery reported {} row errors", loaded.errors.len());
        }

        Ok(ProcessSummary {
            processed_lines: transformed.processed_lines,
            skipped_lines: transformed.skipped_lines,
            matched_records: transformed.records.len(),
            inserted_records: loaded.inserted,
            insert_errors: loaded.errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ExtractResult, LoadResult, TransformResult};
    use crate::domain::model::{EventRecord, InsertError};
    use crate::utils::error::EtlError;
    use async_trait::async_trait;

    struct FixedPipeline {
        fail_extract: bool,
        row_errors: bool,
    }

    #[async_trait]
    impl Pipeline for FixedPipeline {
        async fn extract(&self, source: &ObjectRef) -> Result<ExtractResult> {
            if self.fail_extract {
                return Err(EtlError::ObjectNotFound {
                    bucket: source.bucket.clone(),
                    object: source.name.clone(),
                });
            }
            Ok(ExtractResult {
                source: source.clone(),
                content: "line".to_string(),
            })
        }

        async fn transform(&self, _data: ExtractResult) -> Result<TransformResult> {
            Ok(TransformResult {
                processed_lines: 4,
                skipped_lines: 1,
                records: vec![EventRecord {
                    event_timestamp: "2024-01-01T00:00:00.000000".to_string(),
                    device_name: "sw1".to_string(),
                    interface: "gi0/1".to_string(),
                    error_reason: "bpduguard".to_string(),
                    raw_message: "raw".to_string(),
                }],
            })
        }

        async fn load(&self, result: &TransformResult) -> Result<LoadResult> {
            if self.row_errors {
                return Ok(LoadResult {
                    inserted: 0,
                    errors: vec![InsertError {
                        index: 0,
                        errors: vec![],
                    }],
                });
            }
            Ok(LoadResult {
                inserted: result.records.len(),
                errors: vec![],
            })
        }
    }

    #[tokio::test]
    async fn test_run_builds_summary() {
        let engine = EtlEngine::new(FixedPipeline {
            fail_extract: false,
            row_errors: false,
        });

        let summary = engine.run(&ObjectRef::new("logs", "a.log")).await.unwrap();

        assert_eq!(summary.processed_lines, 4);
        assert_eq!(summary.skipped_lines, 1);
        assert_eq!(summary.matched_records, 1);
        assert_eq!(summary.inserted_records, 1);
        assert!(!summary.is_partial());
    }

    #[tokio::test]
    async fn test_run_partial_insert() {
        let engine = EtlEngine::new(FixedPipeline {
            fail_extract: false,
            row_errors: true,
        });

        let summary = engine.run(&ObjectRef::new("logs", "a.log")).await.unwrap();

        assert_eq!(summary.inserted_records, 0);
        assert!(summary.is_partial());
    }

    #[tokio::test]
    async fn test_run_propagates_extract_error() {
        let engine = EtlEngine::new(FixedPipeline {
            fail_extract: true,
            row_errors: false,
        });

        let result = engine.run(&ObjectRef::new("logs", "a.log")).await;
        assert!(matches!(result, Err(EtlError::ObjectNotFound { .. })));
    }
}
