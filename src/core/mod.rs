pub mod etl;
pub mod filter;
pub mod preprocessor;
pub mod scoring;

pub use crate::domain::model::{Animal, RawAnimalRow, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
