use crate::core::preprocessor::{parse_csv, processed_csv, DataPreprocessor};
use crate::core::{ConfigProvider, Pipeline, RawAnimalRow, Storage, TransformResult};
use crate::utils::error::Result;

pub const PROCESSED_FILE_NAME: &str = "processed_animal_data.csv";
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// CSV → 正規化動物資料 → processed CSV + metadata JSON
pub struct PreprocessPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    reference_year: Option<i32>,
}

impl<S: Storage, C: ConfigProvider> PreprocessPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self {
            storage,
            config,
            reference_year: None,
        }
    }

    /// 固定計算年齡用的年份 (預設為今年)
    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.reference_year = Some(year);
        self
    }

    fn preprocessor(&self) -> DataPreprocessor {
        let preprocessor = match self.reference_year {
            Some(year) => DataPreprocessor::with_reference_year(year),
            None => DataPreprocessor::new(),
        };
        preprocessor.with_available_status(self.config.available_status())
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for PreprocessPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<RawAnimalRow>> {
        tracing::debug!("Reading animal CSV from: {}", self.config.data_path());
        let bytes = tokio::fs::read(self.config.data_path()).await?;
        let rows = parse_csv(&bytes)?;

        if rows.is_empty() {
            tracing::warn!("⚠️ {} contains no animal rows", self.config.data_path());
        }
        Ok(rows)
    }

    async fn transform(&self, data: Vec<RawAnimalRow>) -> Result<TransformResult> {
        let mut preprocessor = self.preprocessor();
        preprocessor.process_rows(data);

        let csv_output = processed_csv(preprocessor.animals())?;
        let metadata = preprocessor.metadata().clone();

        Ok(TransformResult {
            animals: preprocessor.into_animals(),
            metadata,
            csv_output,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        tracing::debug!(
            "Writing {} processed animals to {}",
            result.animals.len(),
            self.config.output_dir()
        );
        self.storage
            .write_file(PROCESSED_FILE_NAME, result.csv_output.as_bytes())
            .await?;

        let metadata_json = serde_json::to_string_pretty(&result.metadata)?;
        self.storage
            .write_file(METADATA_FILE_NAME, metadata_json.as_bytes())
            .await?;

        Ok(self.storage.location(PROCESSED_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::preprocessor::tests::SAMPLE_CSV;
    use crate::utils::error::AppError;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tempfile::NamedTempFile;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                AppError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        fn location(&self, path: &str) -> String {
            format!("mock://{}", path)
        }
    }

    struct MockConfig {
        data_path: String,
    }

    impl ConfigProvider for MockConfig {
        fn data_path(&self) -> &str {
            &self.data_path
        }

        fn output_dir(&self) -> &str {
            "test_output"
        }

        fn available_status(&self) -> &str {
            "임보가능"
        }
    }

    fn csv_file() -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), SAMPLE_CSV).unwrap();
        file
    }

    #[tokio::test]
    async fn test_extract_reads_all_rows() {
        let file = csv_file();
        let config = MockConfig {
            data_path: file.path().to_str().unwrap().to_string(),
        };
        let pipeline = PreprocessPipeline::new(MockStorage::new(), config);

        let rows = pipeline.extract().await.unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].name.as_deref(), Some("초코"));
    }

    #[tokio::test]
    async fn test_extract_missing_file_is_io_error() {
        let config = MockConfig {
            data_path: "/nonexistent/dogs.csv".to_string(),
        };
        let pipeline = PreprocessPipeline::new(MockStorage::new(), config);

        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, AppError::IoError(_)));
    }

    #[tokio::test]
    async fn test_transform_and_load_write_outputs() {
        let file = csv_file();
        let storage = MockStorage::new();
        let config = MockConfig {
            data_path: file.path().to_str().unwrap().to_string(),
        };
        let pipeline = PreprocessPipeline::new(storage.clone(), config).with_reference_year(2025);

        let rows = pipeline.extract().await.unwrap();
        let result = pipeline.transform(rows).await.unwrap();
        assert_eq!(result.animals.len(), 3);
        assert_eq!(result.animals[0].age, Some(4));
        assert_eq!(result.metadata.regions, vec!["서울", "부산"]);

        let location = pipeline.load(result).await.unwrap();
        assert_eq!(location, "mock://processed_animal_data.csv");

        let csv_bytes = storage.get_file(PROCESSED_FILE_NAME).await.unwrap();
        let csv_text = String::from_utf8(csv_bytes).unwrap();
        assert_eq!(csv_text.lines().count(), 4);

        let metadata_bytes = storage.get_file(METADATA_FILE_NAME).await.unwrap();
        let metadata: serde_json::Value = serde_json::from_slice(&metadata_bytes).unwrap();
        assert_eq!(metadata["genders"], serde_json::json!(["male", "female"]));
    }
}
