use crate::core::{ObjectRef, Storage};
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

/// 本機目錄模擬 bucket：`<base_path>/<bucket>/<object>`
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn full_path(&self, object: &ObjectRef) -> PathBuf {
        Path::new(&self.base_path).join(&object.bucket).join(&object.name)
    }
}

impl Storage for LocalStorage {
    async fn exists(&self, object: &ObjectRef) -> Result<bool> {
        let full_path = self.full_path(object);
        Ok(tokio::fs::try_exists(&full_path).await? && full_path.is_file())
    }

    async fn read_text(&self, object: &ObjectRef) -> Result<String> {
        let data = tokio::fs::read_to_string(self.full_path(object)).await?;
        Ok(data)
    }
}
