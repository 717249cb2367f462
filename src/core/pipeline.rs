use crate::core::parser::{split_lines, strip, LogParser};
use crate::core::{
    EventRecord, EventRow, ExtractResult, LoadResult, ObjectRef, Pipeline, Storage, TableRef,
    TransformResult, Warehouse,
};
use crate::domain::model::{format_timestamp, EventKind};
use crate::utils::error::{EtlError, Result};
use chrono::Utc;

/// GCS 物件 → port-manager 事件 → BigQuery
pub struct LogPipeline<S: Storage, W: Warehouse> {
    storage: S,
    warehouse: W,
    table: TableRef,
    parser: LogParser,
}

impl<S: Storage, W: Warehouse> LogPipeline<S, W> {
    pub fn new(storage: S, warehouse: W, table: TableRef) -> Result<Self> {
        Ok(Self {
            storage,
            warehouse,
            table,
            parser: LogParser::new()?,
        })
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    pub fn warehouse(&self) -> &W {
        &self.warehouse
    }
}

#[async_trait::async_trait]
impl<S: Storage, W: Warehouse> Pipeline for LogPipeline<S, W> {
    async fn extract(&self, source: &ObjectRef) -> Result<ExtractResult> {
        tracing::debug!("Checking object {}", source);
        if !self.storage.exists(source).await? {
            return Err(EtlError::ObjectNotFound {
                bucket: source.bucket.clone(),
                object: source.name.clone(),
            });
        }

        let content = self.storage.read_text(source).await?;
        tracing::debug!("Downloaded {} bytes from {}", content.len(), source);

        Ok(ExtractResult {
            source: source.clone(),
            content,
        })
    }

    async fn transform(&self, data: ExtractResult) -> Result<TransformResult> {
        let lines = split_lines(&data.content);
        let mut records = Vec::new();
        let mut skipped_lines = 0;
        let (mut disabled, mut recovered) = (0usize, 0usize);

        for line in &lines {
            if strip(line).is_empty() {
                skipped_lines += 1;
                continue;
            }

            let Some(event) = self.parser.parse_line(line) else {
                continue;
            };

            match event.event_kind {
                EventKind::ErrDisable => disabled += 1,
                EventKind::ErrRecover => recovered += 1,
            }
            tracing::trace!(
                "{} on {} {} ({})",
                event.event_kind.as_str(),
                event.device_name,
                event.interface,
                event.reason
            );

            records.push(EventRecord {
                event_timestamp: format_timestamp(Utc::now()),
                device_name: event.device_name,
                interface: event.interface,
                error_reason: event.reason,
                raw_message: line.to_string(),
            });
        }

        tracing::debug!(
            "Matched {} ERR_DISABLE and {} ERR_RECOVER events in {}",
            disabled,
            recovered,
            data.source
        );

        Ok(TransformResult {
            processed_lines: lines.len(),
            skipped_lines,
            records,
        })
    }

    async fn load(&self, result: &TransformResult) -> Result<LoadResult> {
        if result.records.is_empty() {
            tracing::debug!("No records to insert, skipping BigQuery");
            return Ok(LoadResult::default());
        }

        // 同一批次共用 ingestion_time
        let ingestion_time = format_timestamp(Utc::now());
        let rows: Vec<EventRow> = result
            .records
            .iter()
            .cloned()
            .map(|record| EventRow::new(record, ingestion_time.clone()))
            .collect();

        tracing::debug!("Inserting {} rows into {}", rows.len(), self.table.full_id());
        let errors = self.warehouse.insert_rows(&self.table, &rows).await?;

        if errors.is_empty() {
            Ok(LoadResult {
                inserted: rows.len(),
                errors,
            })
        } else {
            tracing::warn!(
                "BigQuery rejected {} of {} rows for {}",
                errors.len(),
                rows.len(),
                self.table.full_id()
            );
            Ok(LoadResult {
                inserted: 0,
                errors,
            })
        }
    }
}
