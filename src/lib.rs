pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod server;
pub mod utils;

pub use config::{CliConfig, Settings};
pub use core::{etl::EtlEngine, parser::LogParser, pipeline::LogPipeline};
pub use utils::error::{EtlError, Result};
