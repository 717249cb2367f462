use crate::domain::model::{
    EventRow, ExtractResult, InsertError, LoadResult, ObjectRef, TableRef, TransformResult,
};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn exists(&self, object: &ObjectRef) -> impl std::future::Future<Output = Result<bool>> + Send;
    fn read_text(
        &self,
        object: &ObjectRef,
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

pub trait Warehouse: Send + Sync {
    /// 回傳 BigQuery 回報的逐列錯誤；空陣列代表全部寫入成功
    fn insert_rows(
        &self,
        table: &TableRef,
        rows: &[EventRow],
    ) -> impl std::future::Future<Output = Result<Vec<InsertError>>> + Send;

    fn ping(&self) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self, source: &ObjectRef) -> Result<ExtractResult>;
    async fn transform(&self, data: ExtractResult) -> Result<TransformResult>;
    async fn load(&self, result: &TransformResult) -> Result<LoadResult>;
}
