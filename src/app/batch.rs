//! 批次模式：一次處理多位使用者的 profile，輸出摘要 JSON 與各自的推薦 CSV

use crate::app::system::{timestamp, RecommendationSystem};
use crate::core::filter::results_csv;
use crate::core::{Animal, Storage};
use crate::domain::criteria::UserProfile;
use crate::domain::model::MatchResult;
use crate::utils::error::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const TOP_MATCHES_PER_USER: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopMatch {
    pub name: String,
    pub id: Option<String>,
    pub match_score: f64,
    pub detail_link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummary {
    pub user_id: String,
    pub hard_filter_count: usize,
    pub recommendation_count: usize,
    pub top_matches: Vec<TopMatch>,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub summaries: Vec<UserSummary>,
    pub summary_location: String,
    pub result_locations: Vec<String>,
    pub archive_location: Option<String>,
}

/// 單一 profile 的處理結果
#[derive(Debug, Clone)]
pub struct ProfileOutcome {
    pub user_id: String,
    pub hard_filter_count: usize,
    /// 沒有 preferences 的 profile 不評分
    pub recommendations: Option<Vec<MatchResult>>,
}

impl ProfileOutcome {
    pub fn summary(&self) -> Option<UserSummary> {
        let recommendations = self.recommendations.as_ref()?;
        Some(UserSummary {
            user_id: self.user_id.clone(),
            hard_filter_count: self.hard_filter_count,
            recommendation_count: recommendations.len(),
            top_matches: recommendations
                .iter()
                .take(TOP_MATCHES_PER_USER)
                .map(|result| TopMatch {
                    name: result.animal.name.clone(),
                    id: result.animal.id.clone(),
                    match_score: result.match_score.unwrap_or(0.0),
                    detail_link: result.animal.detail_link.clone(),
                })
                .collect(),
        })
    }
}

/// 使用者 ID 轉成可當檔名的片段：只留字母、數字、`_`、`-`，
/// 重複時加上 profile 序號
fn file_stem(user_id: &str, index: usize, used: &mut HashSet<String>) -> String {
    let cleaned: String = user_id
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    let mut stem = if cleaned.is_empty() {
        format!("user_{}", index + 1)
    } else {
        cleaned
    };
    while used.contains(&stem) {
        stem = format!("{}_{}", stem, index + 1);
    }
    used.insert(stem.clone());
    stem
}

pub struct BatchProcessor<'a, S: Storage> {
    system: &'a RecommendationSystem<S>,
    compress: bool,
}

impl<'a, S: Storage> BatchProcessor<'a, S> {
    pub fn new(system: &'a RecommendationSystem<S>) -> Self {
        Self {
            system,
            compress: false,
        }
    }

    /// 另外把所有輸出打包成 `batch_results_<timestamp>.zip`
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn process_profile(&self, index: usize, profile: &UserProfile) -> ProfileOutcome {
        let user_id = profile
            .user_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("user_{}", index + 1));

        let candidates: Vec<Animal> = match &profile.hard_filters {
            Some(criteria) => self
                .system
                .hard_filter(criteria)
                .into_iter()
                .map(|result| result.animal)
                .collect(),
            None => self.system.filter().available().cloned().collect(),
        };
        let hard_filter_count = candidates.len();

        let recommendations = profile.preferences.as_ref().map(|preferences| {
            self.system.score(
                candidates,
                preferences,
                self.system.config().recommendation.default_threshold,
            )
        });

        tracing::info!(
            "👤 {}: {} after hard filters, {} recommended",
            user_id,
            hard_filter_count,
            recommendations.as_ref().map_or(0, Vec::len)
        );

        ProfileOutcome {
            user_id,
            hard_filter_count,
            recommendations,
        }
    }

    pub async fn run(&self, profiles: &[UserProfile]) -> Result<BatchReport> {
        tracing::info!("📦 Batch processing {} profiles", profiles.len());
        let ts = timestamp();
        let storage = self.system.storage();

        let mut report = BatchReport::default();
        let mut written: Vec<(String, Vec<u8>)> = Vec::new();
        let mut used_stems = HashSet::new();

        for (index, profile) in profiles.iter().enumerate() {
            let outcome = self.process_profile(index, profile);
            let Some(summary) = outcome.summary() else {
                continue;
            };

            if let Some(results) = outcome.recommendations.as_deref().filter(|r| !r.is_empty()) {
                let stem = file_stem(&outcome.user_id, index, &mut used_stems);
                let file_name = format!("recommendations_{}_{}.csv", stem, ts);
                let csv_output = results_csv(results)?;
                storage.write_file(&file_name, csv_output.as_bytes()).await?;
                report.result_locations.push(storage.location(&file_name));
                written.push((file_name, csv_output.into_bytes()));
            }
            report.summaries.push(summary);
        }

        let summary_name = format!("batch_summary_{}.json", ts);
        let summary_json = serde_json::to_string_pretty(&report.summaries)?;
        storage.write_file(&summary_name, summary_json.as_bytes()).await?;
        report.summary_location = storage.location(&summary_name);
        written.push((summary_name, summary_json.into_bytes()));

        if self.compress {
            let archive_name = format!("batch_results_{}.zip", ts);
            let archive = zip_files(&written)?;
            storage.write_file(&archive_name, &archive).await?;
            report.archive_location = Some(storage.location(&archive_name));
        }

        tracing::info!("✅ Batch summary saved to {}", report.summary_location);
        Ok(report)
    }
}

fn zip_files(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in files {
        zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
        zip.write_all(data)?;
    }
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::cli::LocalStorage;
    use crate::config::toml_config::AppConfig;
    use crate::domain::criteria::{sample_profiles, FilterCriteria, Preferences, Range, RangePreference};
    use tempfile::TempDir;

    fn dog(name: &str, age: i32) -> Animal {
        Animal {
            id: Some(format!("{}", age * 100)),
            name: name.to_string(),
            status: "임보가능".to_string(),
            rescue_location: "서울".to_string(),
            age: Some(age),
            weight: Some(7.0),
            ..Default::default()
        }
    }

    fn system(dir: &TempDir) -> RecommendationSystem<LocalStorage> {
        let storage = LocalStorage::new(dir.path().to_str().unwrap().to_string());
        let animals = (1..=8).map(|age| dog(&format!("dog{}", age), age)).collect();
        RecommendationSystem::from_animals(AppConfig::default(), storage, animals)
    }

    fn age_preferences() -> Preferences {
        Preferences {
            age_preference: Some(RangePreference {
                preferred: Range::new(1.0, 7.0),
                acceptable: Range::new(0.0, 10.0),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_profile_defaults_and_hard_filter_count() {
        let dir = TempDir::new().unwrap();
        let system = system(&dir);
        let processor = BatchProcessor::new(&system);

        let profile = UserProfile {
            user_id: None,
            hard_filters: Some(FilterCriteria {
                age_range: Some(Range::new(1.0, 3.0)),
                ..Default::default()
            }),
            preferences: Some(age_preferences()),
        };

        let outcome = processor.process_profile(2, &profile);
        assert_eq!(outcome.user_id, "user_3");
        assert_eq!(outcome.hard_filter_count, 3);
        assert_eq!(outcome.recommendations.as_ref().unwrap().len(), 3);
    }

    #[test]
    fn test_profile_without_preferences_has_no_summary() {
        let dir = TempDir::new().unwrap();
        let system = system(&dir);
        let processor = BatchProcessor::new(&system);

        let outcome = processor.process_profile(0, &UserProfile::default());
        assert_eq!(outcome.hard_filter_count, 8);
        assert!(outcome.summary().is_none());
    }

    #[test]
    fn test_summary_keeps_top_five() {
        let dir = TempDir::new().unwrap();
        let system = system(&dir);
        let processor = BatchProcessor::new(&system);

        let profile = UserProfile {
            user_id: Some("kim".to_string()),
            hard_filters: None,
            preferences: Some(age_preferences()),
        };
        let summary = processor.process_profile(0, &profile).summary().unwrap();

        assert_eq!(summary.user_id, "kim");
        assert_eq!(summary.recommendation_count, 8);
        assert_eq!(summary.top_matches.len(), TOP_MATCHES_PER_USER);
        assert_eq!(summary.top_matches[0].match_score, 1.0);
    }

    #[tokio::test]
    async fn test_run_writes_summary_results_and_archive() {
        let dir = TempDir::new().unwrap();
        let system = system(&dir);
        let processor = BatchProcessor::new(&system).with_compression(true);

        let profiles = vec![
            UserProfile {
                user_id: Some("kim".to_string()),
                hard_filters: None,
                preferences: Some(age_preferences()),
            },
            UserProfile::default(),
        ];
        let report = processor.run(&profiles).await.unwrap();

        assert_eq!(report.summaries.len(), 1);
        assert_eq!(report.result_locations.len(), 1);
        assert!(report.result_locations[0].contains("recommendations_kim_"));

        let summary: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report.summary_location).unwrap()).unwrap();
        assert_eq!(summary[0]["user_id"], "kim");
        assert_eq!(summary[0]["hard_filter_count"], 8);

        let archive_bytes = std::fs::read(report.archive_location.unwrap()).unwrap();
        let archive = zip::ZipArchive::new(std::io::Cursor::new(archive_bytes)).unwrap();
        assert_eq!(archive.len(), 2);
    }

    #[test]
    fn test_file_stem_strips_path_characters() {
        let mut used = HashSet::new();
        assert_eq!(file_stem("kim", 0, &mut used), "kim");
        assert_eq!(file_stem("kim", 1, &mut used), "kim_2");
        assert_eq!(file_stem("../x", 2, &mut used), "x");
        assert_eq!(file_stem("/..", 3, &mut used), "user_4");
        assert_eq!(file_stem("김 민수", 4, &mut used), "김민수");
    }

    #[tokio::test]
    async fn test_run_with_duplicate_and_unsafe_user_ids() {
        let dir = TempDir::new().unwrap();
        let system = system(&dir);
        let processor = BatchProcessor::new(&system).with_compression(true);

        let profile = |id: &str| UserProfile {
            user_id: Some(id.to_string()),
            hard_filters: None,
            preferences: Some(age_preferences()),
        };
        let profiles = vec![profile("kim"), profile("kim"), profile("../x")];
        let report = processor.run(&profiles).await.unwrap();

        assert_eq!(report.result_locations.len(), 3);
        let names: HashSet<String> = report
            .result_locations
            .iter()
            .map(|location| {
                let path = std::path::Path::new(location);
                assert_eq!(path.parent().unwrap(), dir.path());
                path.file_name().unwrap().to_string_lossy().into_owned()
            })
            .collect();
        assert_eq!(names.len(), 3);
        assert!(names.iter().any(|n| n.starts_with("recommendations_kim_2_")));
        assert!(names.iter().any(|n| n.starts_with("recommendations_x_")));

        // 摘要保留原本的 user_id
        assert_eq!(report.summaries[2].user_id, "../x");

        let archive_bytes = std::fs::read(report.archive_location.unwrap()).unwrap();
        let archive = zip::ZipArchive::new(std::io::Cursor::new(archive_bytes)).unwrap();
        assert_eq!(archive.len(), 4);
    }

    #[tokio::test]
    async fn test_sample_profiles_run_against_empty_data() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().to_str().unwrap().to_string());
        let system = RecommendationSystem::from_animals(AppConfig::default(), storage, Vec::new());

        let report = BatchProcessor::new(&system).run(&sample_profiles()).await.unwrap();
        assert_eq!(report.summaries.len(), 2);
        assert!(report.summaries.iter().all(|s| s.recommendation_count == 0));
        assert!(report.result_locations.is_empty());
        assert!(report.archive_location.is_none());
    }
}
