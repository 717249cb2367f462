use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// BigQuery 串流寫入使用的時間格式（UTC，不帶時區後綴）
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub name: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gs://{}/{}", self.bucket, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableRef {
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
            table: table.into(),
        }
    }

    pub fn full_id(&self) -> String {
        format!("{}.{}.{}", self.project, self.dataset, self.table)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    ErrDisable,
    ErrRecover,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ErrDisable => "ERR_DISABLE",
            EventKind::ErrRecover => "ERR_RECOVER",
        }
    }
}

/// 從單行 log 中辨識出的 port-manager 事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedEvent {
    pub event_kind: EventKind,
    pub device_name: String,
    pub reason: String,
    pub interface: String,
}

/// transform 階段產生的事件紀錄
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_timestamp: String,
    pub device_name: String,
    pub interface: String,
    pub error_reason: String,
    pub raw_message: String,
}

/// 寫入 `error_disable_events` 資料表的一列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRow {
    #[serde(flatten)]
    pub record: EventRecord,
    pub ingestion_time: String,
}

impl EventRow {
    pub fn new(record: EventRecord, ingestion_time: impl Into<String>) -> Self {
        Self {
            record,
            ingestion_time: ingestion_time.into(),
        }
    }
}

/// BigQuery insertAll 回傳的單列錯誤
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertError {
    pub index: u64,
    #[serde(default)]
    pub errors: Vec<ErrorProto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorProto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// 下載後的原始內容
#[derive(Debug, Clone)]
pub struct ExtractResult {
    pub source: ObjectRef,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub processed_lines: usize,
    pub skipped_lines: usize,
    pub records: Vec<EventRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadResult {
    pub inserted: usize,
    pub errors: Vec<InsertError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    pub processed_lines: usize,
    pub skipped_lines: usize,
    pub matched_records: usize,
    pub inserted_records: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub insert_errors: Vec<InsertError>,
}

impl ProcessSummary {
    pub fn is_partial(&self) -> bool {
        !self.insert_errors.is_empty()
    }
}
