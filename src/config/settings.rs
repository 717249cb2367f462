//! 命令列 / 環境變數 → TOML 檔 → 內建預設值，依序合併成最終設定。

use crate::adapters::bigquery::DEFAULT_BIGQUERY_ENDPOINT;
use crate::adapters::gcs::DEFAULT_STORAGE_ENDPOINT;
use crate::config::toml_config::TomlConfig;
use crate::config::{AuthMode, CliConfig, LogFormat};
use crate::core::TableRef;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_WORKER_THREADS: usize = 8;
pub const DEFAULT_DATASET: &str = "network_logs";
pub const DEFAULT_TABLE: &str = "error_disable_events";
pub const SERVICE_NAME: &str = "log-preprocessor";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub port: u16,
    pub worker_threads: usize,
    /// `None` 代表不限時
    pub request_timeout: Option<Duration>,
    pub project: Option<String>,
    pub dataset: String,
    pub table: String,
    pub storage_endpoint: String,
    pub bigquery_endpoint: String,
    pub auth_mode: AuthMode,
    /// 明確指定的憑證檔；未指定時交給 ADC 自行尋找
    pub credentials: Option<PathBuf>,
    pub access_token: Option<String>,
    pub log_format: LogFormat,
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            worker_threads: DEFAULT_WORKER_THREADS,
            request_timeout: None,
            project: None,
            dataset: DEFAULT_DATASET.to_string(),
            table: DEFAULT_TABLE.to_string(),
            storage_endpoint: DEFAULT_STORAGE_ENDPOINT.to_string(),
            bigquery_endpoint: DEFAULT_BIGQUERY_ENDPOINT.to_string(),
            auth_mode: AuthMode::default(),
            credentials: None,
            access_token: None,
            log_format: LogFormat::default(),
            verbose: false,
        }
    }
}

/// 模擬器環境變數常只給 host:port，補上 http://
pub fn normalize_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl Settings {
    pub fn resolve(cli: &CliConfig) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };
        Ok(Self::merge(cli, file))
    }

    pub fn merge(cli: &CliConfig, file: TomlConfig) -> Self {
        let defaults = Self::default();

        let access_token = cli.access_token.clone().or(file.auth.access_token);
        // 有給 token 但沒指定模式時，直接用 token
        let auth_mode = cli.auth_mode.or(file.auth.mode).unwrap_or(if access_token.is_some() {
            AuthMode::Token
        } else {
            defaults.auth_mode
        });

        Self {
            port: cli.port.or(file.server.port).unwrap_or(defaults.port),
            worker_threads: cli
                .worker_threads
                .or(file.server.worker_threads)
                .unwrap_or(defaults.worker_threads),
            request_timeout: cli
                .request_timeout
                .or(file.server.request_timeout_secs)
                .and_then(timeout_from_secs),
            project: cli
                .project
                .clone()
                .or(file.bigquery.project)
                .filter(|p| !p.trim().is_empty()),
            dataset: cli
                .dataset
                .clone()
                .or(file.bigquery.dataset)
                .unwrap_or(defaults.dataset),
            table: cli
                .table
                .clone()
                .or(file.bigquery.table)
                .unwrap_or(defaults.table),
            storage_endpoint: cli
                .storage_endpoint
                .clone()
                .or(file.storage.endpoint)
                .map(|e| normalize_endpoint(&e))
                .unwrap_or(defaults.storage_endpoint),
            bigquery_endpoint: cli
                .bigquery_endpoint
                .clone()
                .or(file.bigquery.endpoint)
                .map(|e| normalize_endpoint(&e))
                .unwrap_or(defaults.bigquery_endpoint),
            auth_mode,
            credentials: cli.credentials.clone().or(file.auth.credentials),
            access_token,
            log_format: cli
                .log_format
                .or(file.logging.format)
                .unwrap_or(defaults.log_format),
            verbose: cli.verbose,
        }
    }

    pub fn table_ref(&self, project: &str) -> TableRef {
        TableRef::new(project, &self.dataset, &self.table)
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validation::validate_range("port", self.port, 1, u16::MAX)?;
        validation::validate_positive_number("worker_threads", self.worker_threads, 1)?;
        validation::validate_range("worker_threads", self.worker_threads, 1, 512)?;

        if let Some(project) = &self.project {
            validation::validate_project_id("project", project)?;
        }
        validation::validate_bigquery_identifier("dataset", &self.dataset)?;
        validation::validate_bigquery_identifier("table", &self.table)?;

        validation::validate_url("storage_endpoint", &self.storage_endpoint)?;
        validation::validate_url("bigquery_endpoint", &self.bigquery_endpoint)?;
        if let Some(path) = &self.credentials {
            validation::validate_path("credentials", &path.to_string_lossy())?;
        }

        if self.auth_mode == AuthMode::Token {
            let token = self
                .access_token
                .as_deref()
                .ok_or_else(|| EtlError::MissingConfigError {
                    field: "access_token".to_string(),
                })?;
            validation::validate_non_empty_string("access_token", token)?;
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> CliConfig {
        let mut argv = vec!["log-preprocessor"];
        argv.extend_from_slice(args);
        CliConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::merge(&cli(&[]), TomlConfig::default());

        assert_eq!(settings.port, 8080);
        assert_eq!(settings.worker_threads, 8);
        assert_eq!(settings.request_timeout, None);
        assert_eq!(settings.dataset, "network_logs");
        assert_eq!(settings.table, "error_disable_events");
        assert_eq!(settings.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = TomlConfig::from_toml_str(
            "[server]\nport = 9000\nworker_threads = 2\n[bigquery]\ndataset = \"file_ds\"\ntable = \"file_table\"\n",
        )
        .unwrap();
        let settings = Settings::merge(&cli(&["--port", "7000", "--table", "cli_table"]), file);

        assert_eq!(settings.port, 7000);
        assert_eq!(settings.worker_threads, 2);
        assert_eq!(settings.dataset, "file_ds");
        assert_eq!(settings.table, "cli_table");
    }

    #[test]
    fn test_zero_timeout_disables() {
        let settings = Settings::merge(&cli(&["--request-timeout", "0"]), TomlConfig::default());
        assert_eq!(settings.request_timeout, None);

        let settings = Settings::merge(&cli(&["--request-timeout", "15"]), TomlConfig::default());
        assert_eq!(settings.request_timeout, Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_endpoint_normalization() {
        let settings = Settings::merge(
            &cli(&[
                "--storage-endpoint",
                "localhost:9023/",
                "--bigquery-endpoint",
                "https://bq.example.com",
            ]),
            TomlConfig::default(),
        );

        assert_eq!(settings.storage_endpoint, "http://localhost:9023");
        assert_eq!(settings.bigquery_endpoint, "https://bq.example.com");
    }

    #[test]
    fn test_credentials_file_setting() {
        let file = TomlConfig::from_toml_str("[auth]\ncredentials = \"/etc/gcp/file.json\"\n").unwrap();
        let settings = Settings::merge(&cli(&[]), file.clone());
        assert_eq!(settings.auth_mode, AuthMode::Adc);
        assert_eq!(settings.credentials, Some(PathBuf::from("/etc/gcp/file.json")));

        let settings = Settings::merge(&cli(&["--credentials", "/etc/gcp/cli.json"]), file);
        assert_eq!(settings.credentials, Some(PathBuf::from("/etc/gcp/cli.json")));
    }

    #[test]
    fn test_access_token_implies_token_mode() {
        let settings = Settings::merge(&cli(&["--access-token", "abc"]), TomlConfig::default());
        assert_eq!(settings.auth_mode, AuthMode::Token);

        let settings = Settings::merge(
            &cli(&["--access-token", "abc", "--auth-mode", "anonymous"]),
            TomlConfig::default(),
        );
        assert_eq!(settings.auth_mode, AuthMode::Anonymous);
    }

    #[test]
    fn test_validate() {
        let valid = Settings {
            project: Some("network-ops".to_string()),
            ..Settings::default()
        };
        assert!(valid.validate().is_ok());

        let bad_table = Settings {
            table: "error-disable".to_string(),
            ..Settings::default()
        };
        assert!(bad_table.validate().is_err());

        let no_threads = Settings {
            worker_threads: 0,
            ..Settings::default()
        };
        assert!(no_threads.validate().is_err());

        let missing_token = Settings {
            auth_mode: AuthMode::Token,
            ..Settings::default()
        };
        assert!(matches!(
            missing_token.validate(),
            Err(EtlError::MissingConfigError { .. })
        ));
    }
}
