//! Google API 存取權杖。
//!
//! 預設走 Application Default Credentials：`GOOGLE_APPLICATION_CREDENTIALS` 金鑰檔、
//! `gcloud auth application-default login` 的使用者憑證，最後才是 metadata server。
//! 本機開發可直接給定 token，模擬器則不帶 `Authorization`。

use crate::utils::error::{EtlError, Result};
use gcloud_auth::credentials::CredentialsFile;
use gcloud_auth::project::Config;
use gcloud_auth::token::DefaultTokenSourceProvider;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use token_source::{TokenSource, TokenSourceProvider};

const SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

enum TokenKind {
    Adc(Arc<dyn TokenSource>),
    Static(String),
    Anonymous,
}

impl fmt::Debug for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Adc(_) => f.write_str("Adc"),
            TokenKind::Static(_) => f.write_str("Static(..)"),
            TokenKind::Anonymous => f.write_str("Anonymous"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenProvider {
    kind: Arc<TokenKind>,
}

/// ADC 建立的 token 來源，以及憑證能推得的專案 ID
pub struct AdcAuth {
    pub provider: TokenProvider,
    pub project_id: Option<String>,
}

impl TokenProvider {
    /// 有金鑰檔時直接使用，否則依 ADC 順序尋找憑證
    pub async fn application_default(credentials: Option<CredentialsFile>) -> Result<AdcAuth> {
        let config = Config::default().with_scopes(SCOPES);
        let provider = match credentials {
            Some(file) => {
                DefaultTokenSourceProvider::new_with_credentials(config, Box::new(file)).await?
            }
            None => DefaultTokenSourceProvider::new(config).await?,
        };
        tracing::debug!("Resolved application default credentials");

        Ok(AdcAuth {
            project_id: provider.project_id.clone(),
            provider: Self::from_source(provider.token_source()),
        })
    }

    pub fn from_source(source: Arc<dyn TokenSource>) -> Self {
        Self {
            kind: Arc::new(TokenKind::Adc(source)),
        }
    }

    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            kind: Arc::new(TokenKind::Static(token.into())),
        }
    }

    pub fn anonymous() -> Self {
        Self {
            kind: Arc::new(TokenKind::Anonymous),
        }
    }

    /// `Authorization` 標頭值；匿名時為 `None`
    pub async fn authorization(&self) -> Result<Option<String>> {
        match self.kind.as_ref() {
            TokenKind::Anonymous => Ok(None),
            TokenKind::Static(token) => Ok(Some(format!("Bearer {}", token))),
            TokenKind::Adc(source) => {
                let token = source.token().await.map_err(|e| EtlError::AuthError {
                    message: e.to_string(),
                })?;
                // token source 已帶 token type 前綴
                if token.contains(' ') {
                    Ok(Some(token))
                } else {
                    Ok(Some(format!("Bearer {}", token)))
                }
            }
        }
    }

    pub async fn authorize(&self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder> {
        Ok(match self.authorization().await? {
            Some(value) => request.header(reqwest::header::AUTHORIZATION, value),
            None => request,
        })
    }
}

/// 讀取服務帳戶金鑰或使用者憑證 JSON
pub async fn load_credentials(path: &Path) -> Result<CredentialsFile> {
    let credentials = CredentialsFile::new_from_file(path.to_string_lossy().to_string()).await?;
    tracing::info!("🔑 Loaded Google credentials from {}", path.display());
    Ok(credentials)
}
