use crate::app::pipelines::PreprocessPipeline;
use crate::app::report;
use crate::config::toml_config::AppConfig;
use crate::core::etl::EtlEngine;
use crate::core::filter::{results_csv, AnimalFilter};
use crate::core::preprocessor::{behavior_statistics, build_metadata, compute_statistics};
use crate::core::{Animal, ConfigProvider, Storage, TransformResult};
use crate::domain::criteria::{FilterCriteria, Preferences};
use crate::domain::model::{BehaviorTrait, DataStatistics, MatchResult, Metadata};
use crate::utils::error::{AppError, Result};
use std::path::Path;

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// 輸出檔名用的本地時間戳記
pub fn timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// 載入後的動物資料，加上篩選、推薦與結果儲存
pub struct RecommendationSystem<S: Storage> {
    config: AppConfig,
    storage: S,
    animals: Vec<Animal>,
    metadata: Metadata,
}

impl<S: Storage + Clone> RecommendationSystem<S> {
    /// 透過前處理 ETL 的 extract + transform 載入 CSV
    pub async fn load(config: AppConfig, storage: S, monitor_enabled: bool) -> Result<Self> {
        tracing::info!("📂 Loading animal data from {}", config.data_path());
        if !Path::new(config.data_path()).is_file() {
            tracing::error!("❌ Data file not found: {}", config.data_path());
            return Err(AppError::DataNotLoaded);
        }

        let pipeline = PreprocessPipeline::new(storage.clone(), config.clone());
        let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);
        let result = engine.process().await?;

        tracing::info!("✅ Loaded {} animals", result.animals.len());
        Ok(Self::from_transform(config, storage, result))
    }
}

impl<S: Storage> RecommendationSystem<S> {
    pub fn from_transform(config: AppConfig, storage: S, result: TransformResult) -> Self {
        Self {
            config,
            storage,
            animals: result.animals,
            metadata: result.metadata,
        }
    }

    pub fn from_animals(config: AppConfig, storage: S, animals: Vec<Animal>) -> Self {
        let metadata = build_metadata(&animals);
        Self {
            config,
            storage,
            animals,
            metadata,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn animals(&self) -> &[Animal] {
        &self.animals
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn statistics(&self) -> DataStatistics {
        compute_statistics(&self.animals, self.config.available_status())
    }

    pub fn behavior_statistics(&self) -> Vec<(BehaviorTrait, Option<f64>)> {
        behavior_statistics(&self.animals)
    }

    pub fn summary_report(&self) -> String {
        report::render_summary(&self.statistics(), &self.metadata, &self.behavior_statistics())
    }

    /// 每次呼叫都是新的 filter，不共享上一次的結果
    pub fn filter(&self) -> AnimalFilter {
        AnimalFilter::new(self.animals.clone()).with_available_status(self.config.available_status())
    }

    pub fn hard_filter(&self, criteria: &FilterCriteria) -> Vec<MatchResult> {
        let mut filter = self.filter();
        filter.apply_filters(criteria);
        filter.into_results()
    }

    /// 只對給定的動物評分，門檻以下剔除
    pub fn score(&self, animals: Vec<Animal>, preferences: &Preferences, threshold: f64) -> Vec<MatchResult> {
        let mut filter = AnimalFilter::new(animals).with_available_status(self.config.available_status());
        filter.apply_soft_filtering(preferences, threshold);
        filter.into_results()
    }

    /// 全部資料的推薦，最多 `recommendation.max_recommendations` 筆。
    /// 偏好中未指定的權重取自 `recommendation.default_weights`
    pub fn recommend(&self, preferences: &Preferences, threshold: Option<f64>) -> Vec<MatchResult> {
        let threshold = threshold.unwrap_or(self.config.recommendation.default_threshold);
        let preferences = Preferences {
            weights: preferences
                .weights
                .or(self.config.recommendation.default_weights.score_weights()),
            ..preferences.clone()
        };
        let mut results = self.score(self.animals.clone(), &preferences, threshold);
        results.truncate(self.config.recommendation.max_recommendations);
        tracing::info!("🎯 {} recommendations at threshold {:.2}", results.len(), threshold);
        results
    }

    pub fn render_results(&self, results: &[MatchResult], limit: Option<usize>) -> String {
        report::render_results(
            results,
            limit.unwrap_or(self.config.display.items_per_page),
            self.config.display.max_display_hashtags,
        )
    }

    /// 寫出 `<prefix>_<timestamp>.csv`；沒有結果時不寫檔
    pub async fn save_results(&self, results: &[MatchResult], prefix: &str) -> Result<Option<String>> {
        if results.is_empty() {
            tracing::warn!("⚠️ No results to save");
            return Ok(None);
        }

        let file_name = format!("{}_{}.csv", prefix, timestamp());
        let csv_output = results_csv(results)?;
        self.storage.write_file(&file_name, csv_output.as_bytes()).await?;

        let location = self.storage.location(&file_name);
        tracing::info!("💾 Saved {} results to {}", results.len(), location);
        Ok(Some(location))
    }
}
