pub mod preprocess_pipeline;

pub use preprocess_pipeline::PreprocessPipeline;
