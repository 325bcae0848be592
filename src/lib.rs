pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use app::{pipelines::PreprocessPipeline, BatchProcessor, InteractiveSession, RecommendationSystem};
pub use config::{cli::LocalStorage, toml_config::AppConfig};
pub use core::{etl::EtlEngine, filter::AnimalFilter, preprocessor::DataPreprocessor};
pub use utils::error::{AppError, Result};
