use crate::adapters::{endpoint_url, error_message, parse_endpoint, TokenProvider};
use crate::core::{ObjectRef, Storage};
use crate::utils::error::{EtlError, Result};
use reqwest::StatusCode;
use url::Url;

pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";

/// Cloud Storage JSON API
#[derive(Debug, Clone)]
pub struct GcsStorage {
    client: reqwest::Client,
    endpoint: Url,
    auth: TokenProvider,
}

impl GcsStorage {
    pub fn new(client: reqwest::Client, endpoint: &str, auth: TokenProvider) -> Result<Self> {
        Ok(Self {
            client,
            endpoint: parse_endpoint("storage_endpoint", endpoint)?,
            auth,
        })
    }

    fn object_url(&self, object: &ObjectRef) -> Result<Url> {
        endpoint_url(
            &self.endpoint,
            &["storage", "v1", "b", &object.bucket, "o", &object.name],
        )
    }
}

impl Storage for GcsStorage {
    async fn exists(&self, object: &ObjectRef) -> Result<bool> {
        let url = self.object_url(object)?;
        let request = self.auth.authorize(self.client.get(url)).await?;
        let response = request.send().await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => {
                let (status, message) = error_message(response).await;
                Err(EtlError::StorageError { status, message })
            }
        }
    }

    async fn read_text(&self, object: &ObjectRef) -> Result<String> {
        let mut url = self.object_url(object)?;
        url.query_pairs_mut().append_pair("alt", "media");

        let request = self.auth.authorize(self.client.get(url)).await?;
        let response = request.send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(EtlError::ObjectNotFound {
                bucket: object.bucket.clone(),
                object: object.name.clone(),
            });
        }
        if !response.status().is_success() {
            let (status, message) = error_message(response).await;
            return Err(EtlError::StorageError { status, message });
        }

        let bytes = response.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(|e| EtlError::ProcessingError {
            message: format!("{} is not valid UTF-8 text: {}", object, e),
        })
    }
}
