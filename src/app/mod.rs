pub mod batch;
pub mod interactive;
pub mod pipelines;
pub mod report;
pub mod system;

pub use batch::BatchProcessor;
pub use interactive::InteractiveSession;
pub use system::RecommendationSystem;
