pub mod settings;
pub mod toml_config;

pub use settings::Settings;

use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Application Default Credentials（金鑰檔、gcloud 使用者憑證或 metadata server）
    #[default]
    #[serde(alias = "metadata")]
    #[value(alias = "metadata")]
    Adc,
    /// 固定的 OAuth access token
    Token,
    /// 不帶認證（模擬器）
    Anonymous,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "log-preprocessor", version)]
#[command(about = "Loads switch err-disable events from Cloud Storage logs into BigQuery")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[arg(long, env = "LOG_PREPROCESSOR_CONFIG", global = true, help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, env = "LOG_FORMAT", value_enum, global = true)]
    pub log_format: Option<LogFormat>,

    #[arg(long, env = "GOOGLE_CLOUD_PROJECT", global = true)]
    pub project: Option<String>,

    #[arg(long, env = "BQ_DATASET", global = true)]
    pub dataset: Option<String>,

    #[arg(long, env = "BQ_TABLE", global = true)]
    pub table: Option<String>,

    #[arg(long, env = "STORAGE_EMULATOR_HOST", global = true)]
    pub storage_endpoint: Option<String>,

    #[arg(long, env = "BIGQUERY_EMULATOR_HOST", global = true)]
    pub bigquery_endpoint: Option<String>,

    #[arg(
        long,
        env = "GOOGLE_APPLICATION_CREDENTIALS",
        global = true,
        help = "Service account key or authorized user JSON file"
    )]
    pub credentials: Option<PathBuf>,

    #[arg(long, env = "AUTH_MODE", value_enum, global = true)]
    pub auth_mode: Option<AuthMode>,

    #[arg(long, env = "GOOGLE_OAUTH_ACCESS_TOKEN", hide_env_values = true, global = true)]
    pub access_token: Option<String>,

    #[arg(long, env = "PORT", global = true)]
    pub port: Option<u16>,

    #[arg(long, env = "WORKER_THREADS", global = true)]
    pub worker_threads: Option<usize>,

    #[arg(
        long,
        env = "REQUEST_TIMEOUT",
        global = true,
        help = "Request timeout in seconds, 0 disables it"
    )]
    pub request_timeout: Option<u64>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Process a single object and print the summary
    Process(ProcessArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ProcessArgs {
    #[arg(long)]
    pub bucket: String,

    #[arg(long)]
    pub file: String,

    #[arg(long, help = "Read <DIR>/<bucket>/<file> from local disk instead of Cloud Storage")]
    pub source_dir: Option<PathBuf>,

    #[arg(long, help = "Print rows as JSON lines instead of inserting into BigQuery")]
    pub dry_run: bool,
}

impl Validate for ProcessArgs {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("bucket", &self.bucket)?;
        validation::validate_non_empty_string("file", &self.file)?;
        if let Some(dir) = &self.source_dir {
            validation::validate_path("source_dir", &dir.to_string_lossy())?;
        }
        Ok(())
    }
}
