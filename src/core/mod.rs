pub mod etl;
pub mod parser;
pub mod pipeline;

pub use crate::domain::model::{
    EventRecord, EventRow, ExtractResult, LoadResult, ObjectRef, ProcessSummary, TableRef,
    TransformResult,
};
pub use crate::domain::ports::{Pipeline, Storage, Warehouse};
pub use crate::utils::error::Result;
