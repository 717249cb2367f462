use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    PatternError(#[from] regex::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("File {object} not found in bucket {bucket}")]
    ObjectNotFound { bucket: String, object: String },

    #[error("Cloud Storage request failed with status {status}: {message}")]
    StorageError { status: u16, message: String },

    #[error("BigQuery request failed with status {status}: {message}")]
    BigQueryError { status: u16, message: String },

    #[error("Google credentials error: {0}")]
    CredentialsError(#[from] gcloud_auth::error::Error),

    #[error("Authentication failed: {message}")]
    AuthError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

impl EtlError {
    /// 錯誤類型名稱，用於 HTTP 回應的 `error_type` 欄位
    pub fn kind(&self) -> &'static str {
        match self {
            EtlError::ApiError(_) => "ApiError",
            EtlError::IoError(_) => "IoError",
            EtlError::SerializationError(_) => "SerializationError",
            EtlError::PatternError(_) => "PatternError",
            EtlError::ConfigError { .. } => "ConfigError",
            EtlError::MissingConfigError { .. } => "MissingConfigError",
            EtlError::InvalidConfigValueError { .. } => "InvalidConfigValueError",
            EtlError::ObjectNotFound { .. } => "ObjectNotFound",
            EtlError::StorageError { .. } => "StorageError",
            EtlError::BigQueryError { .. } => "BigQueryError",
            EtlError::CredentialsError(_) => "CredentialsError",
            EtlError::AuthError { .. } => "AuthError",
            EtlError::ProcessingError { .. } => "ProcessingError",
        }
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            EtlError::ConfigError { .. }
                | EtlError::MissingConfigError { .. }
                | EtlError::InvalidConfigValueError { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
