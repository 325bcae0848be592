use crate::core::{Pipeline, TransformResult};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    /// Extract + Transform，不寫出檔案
    pub async fn process(&self) -> Result<TransformResult> {
        tracing::info!("📥 Extracting animal data...");
        let raw_rows = self.pipeline.extract().await?;
        tracing::info!("Extracted {} rows", raw_rows.len());
        self.monitor.log_stats("Extract");

        tracing::info!("🔧 Transforming animal data...");
        let result = self.pipeline.transform(raw_rows).await?;
        tracing::info!("Transformed {} animals", result.animals.len());
        self.monitor.log_stats("Transform");

        Ok(result)
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting preprocessing ETL");
        let result = self.process().await?;

        tracing::info!("💾 Loading processed data...");
        let output_path = self.pipeline.load(result).await?;
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        tracing::info!("Output saved to: {}", output_path);
        Ok(output_path)
    }
}
