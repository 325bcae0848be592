use crate::core::ConfigProvider;
use crate::domain::criteria::ScoreWeights;
use crate::utils::error::{AppError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

/// 應用程式設定；所有區段皆可省略
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub filters: FiltersConfig,
    pub recommendation: RecommendationConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_path: String,
    pub output_dir: String,
    pub log_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_path: "pimfyvirus_dog_data.csv".to_string(),
            output_dir: "results".to_string(),
            log_dir: "logs".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FiltersConfig {
    /// 可臨時保護的狀態值
    pub available_status: String,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            available_status: crate::core::preprocessor::DEFAULT_AVAILABLE_STATUS.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    pub default_threshold: f64,
    pub max_recommendations: usize,
    pub default_weights: WeightsConfig,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            default_threshold: crate::core::filter::DEFAULT_THRESHOLD,
            max_recommendations: 50,
            default_weights: WeightsConfig::default(),
        }
    }
}

/// 推薦權重；個別欄位省略時沿用預設值
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightsConfig {
    pub region: f64,
    pub age: f64,
    pub size: f64,
    pub personality: f64,
    pub behavior: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            region: 0.8,
            age: 1.0,
            size: 1.0,
            personality: 1.5,
            behavior: 1.2,
        }
    }
}

impl WeightsConfig {
    pub fn score_weights(&self) -> ScoreWeights {
        ScoreWeights {
            region: Some(self.region),
            age: Some(self.age),
            size: Some(self.size),
            personality: Some(self.personality),
            behavior: Some(self.behavior),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub items_per_page: usize,
    pub max_display_hashtags: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            items_per_page: 10,
            max_display_hashtags: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
    /// 是否同時寫入 `<log_dir>/system.log`
    pub to_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            to_file: true,
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| AppError::ConfigError {
            message: format!("Cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| AppError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 有指定檔案就讀檔，否則使用預設值
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                Self::from_file(path)
            }
            None => Ok(Self::default()),
        }
    }

    /// 替換環境變數 (例如 ${DATA_DIR})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("paths.data_path", &self.paths.data_path)?;
        validation::validate_file_extension("paths.data_path", &self.paths.data_path, &["csv"])?;
        validation::validate_path("paths.output_dir", &self.paths.output_dir)?;
        validation::validate_path("paths.log_dir", &self.paths.log_dir)?;
        validation::validate_non_empty_string("filters.available_status", &self.filters.available_status)?;
        validation::validate_range(
            "recommendation.default_threshold",
            self.recommendation.default_threshold,
            0.0,
            1.0,
        )?;
        validation::validate_positive_number(
            "recommendation.max_recommendations",
            self.recommendation.max_recommendations,
            1,
        )?;
        validation::validate_positive_number("display.items_per_page", self.display.items_per_page, 1)?;

        let weights = &self.recommendation.default_weights;
        for (field, weight) in [
            ("recommendation.default_weights.region", weights.region),
            ("recommendation.default_weights.age", weights.age),
            ("recommendation.default_weights.size", weights.size),
            ("recommendation.default_weights.personality", weights.personality),
            ("recommendation.default_weights.behavior", weights.behavior),
        ] {
            validation::validate_range(field, weight, 0.0, f64::MAX)?;
        }

        Ok(())
    }

    pub fn log_dir(&self) -> Option<&Path> {
        self.logging.to_file.then(|| Path::new(&self.paths.log_dir))
    }
}

impl ConfigProvider for AppConfig {
    fn data_path(&self) -> &str {
        &self.paths.data_path
    }

    fn output_dir(&self) -> &str {
        &self.paths.output_dir
    }

    fn available_status(&self) -> &str {
        &self.filters.available_status
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
