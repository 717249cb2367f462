//! 依設定組裝 HTTP client、認證、GCS / BigQuery adapter 與 ETL 引擎。

use crate::adapters::auth::load_credentials;
use crate::adapters::{BigQueryClient, GcsStorage, LocalStorage, StdoutWarehouse, TokenProvider};
use crate::config::{AuthMode, ProcessArgs, Settings};
use crate::core::etl::EtlEngine;
use crate::core::pipeline::LogPipeline;
use crate::core::{ObjectRef, ProcessSummary, Storage, Warehouse};
use crate::server::AppState;
use crate::utils::error::{EtlError, Result};
use std::sync::Arc;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DRY_RUN_PROJECT: &str = "dry-run";

pub fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(CONNECT_TIMEOUT)
        .build()?)
}

/// 建立 token 來源；第二個值是憑證推得的專案 ID
pub async fn authenticate(settings: &Settings) -> Result<(TokenProvider, Option<String>)> {
    let credentials = match &settings.credentials {
        Some(path) => Some(load_credentials(path).await?),
        None => None,
    };
    let file_project = credentials.as_ref().and_then(|c| c.project_id.clone());

    match settings.auth_mode {
        AuthMode::Adc => {
            let adc = TokenProvider::application_default(credentials).await?;
            Ok((adc.provider, file_project.or(adc.project_id)))
        }
        AuthMode::Token => {
            let token = settings
                .access_token
                .clone()
                .ok_or_else(|| EtlError::MissingConfigError {
                    field: "access_token".to_string(),
                })?;
            Ok((TokenProvider::fixed(token), file_project))
        }
        AuthMode::Anonymous => Ok((TokenProvider::anonymous(), file_project)),
    }
}

/// 設定值優先，其次是憑證推得的專案
pub fn resolve_project(settings: &Settings, detected: Option<String>) -> Result<String> {
    match settings.project.clone() {
        Some(project) => Ok(project),
        None => {
            let project = detected
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| EtlError::MissingConfigError {
                    field: "project".to_string(),
                })?;
            tracing::info!("Detected project {} from Google credentials", project);
            Ok(project)
        }
    }
}

pub async fn build_state(settings: &Settings) -> Result<AppState> {
    let client = http_client()?;
    let (auth, detected) = authenticate(settings).await?;
    let project = resolve_project(settings, detected)?;

    let storage = GcsStorage::new(client.clone(), &settings.storage_endpoint, auth.clone())?;
    let warehouse = BigQueryClient::new(client, &settings.bigquery_endpoint, auth, project.clone())?;
    let pipeline = LogPipeline::new(storage, warehouse, settings.table_ref(&project))?;

    Ok(AppState::new(Arc::new(EtlEngine::new(pipeline))))
}

async fn run_pipeline<S: Storage, W: Warehouse>(
    storage: S,
    warehouse: W,
    settings: &Settings,
    project: &str,
    source: &ObjectRef,
) -> Result<ProcessSummary> {
    let pipeline = LogPipeline::new(storage, warehouse, settings.table_ref(project))?;
    EtlEngine::new(pipeline).run(source).await
}

/// `process` 子命令：只跑一次 ETL
pub async fn process_once(settings: &Settings, args: &ProcessArgs) -> Result<ProcessSummary> {
    let client = http_client()?;
    let source = ObjectRef::new(&args.bucket, &args.file);

    // 只有實際連線到 Google API 時才需要憑證
    let needs_auth = args.source_dir.is_none() || !args.dry_run;
    let (auth, detected) = if needs_auth {
        authenticate(settings).await?
    } else {
        (TokenProvider::anonymous(), None)
    };

    let project = if args.dry_run {
        settings
            .project
            .clone()
            .or(detected)
            .unwrap_or_else(|| DRY_RUN_PROJECT.to_string())
    } else {
        resolve_project(settings, detected)?
    };

    match (&args.source_dir, args.dry_run) {
        (Some(dir), true) => {
            run_pipeline(LocalStorage::new(dir), StdoutWarehouse, settings, &project, &source).await
        }
        (Some(dir), false) => {
            let warehouse =
                BigQueryClient::new(client, &settings.bigquery_endpoint, auth, project.clone())?;
            run_pipeline(LocalStorage::new(dir), warehouse, settings, &project, &source).await
        }
        (None, true) => {
            let storage = GcsStorage::new(client, &settings.storage_endpoint, auth)?;
            run_pipeline(storage, StdoutWarehouse, settings, &project, &source).await
        }
        (None, false) => {
            let storage = GcsStorage::new(client.clone(), &settings.storage_endpoint, auth.clone())?;
            let warehouse =
                BigQueryClient::new(client, &settings.bigquery_endpoint, auth, project.clone())?;
            run_pipeline(storage, warehouse, settings, &project, &source).await
        }
    }
}
