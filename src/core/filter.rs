use crate::core::preprocessor::DEFAULT_AVAILABLE_STATUS;
use crate::core::scoring::{is_nationwide, loosely_matches, match_score};
use crate::domain::criteria::{
    CarePreferences, FilterCriteria, HealthRequirements, Preferences, Range, TraitRequirement,
};
use crate::domain::model::{value_counts, Animal, BehaviorTrait, Distribution, Gender, MatchResult};
use crate::utils::error::{AppError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_THRESHOLD: f64 = 0.3;
const LIST_SEPARATOR: &str = "|";

/// 篩選結果的分布統計
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultStats {
    pub total_count: usize,
    pub gender_distribution: Distribution,
    pub age_distribution: Distribution,
    pub weight_distribution: Distribution,
    pub care_type_distribution: Distribution,
    pub region_distribution: Distribution,
}

/// 臨時保護動物的硬篩選與分數推薦
#[derive(Debug, Clone)]
pub struct AnimalFilter {
    animals: Vec<Animal>,
    available_status: String,
    filtered_results: Vec<MatchResult>,
}

impl AnimalFilter {
    pub fn new(animals: Vec<Animal>) -> Self {
        Self {
            animals,
            available_status: DEFAULT_AVAILABLE_STATUS.to_string(),
            filtered_results: Vec::new(),
        }
    }

    pub fn with_available_status(mut self, status: impl Into<String>) -> Self {
        self.available_status = status.into();
        self
    }

    pub fn set_animals(&mut self, animals: Vec<Animal>) -> &mut Self {
        self.animals = animals;
        self.filtered_results.clear();
        self
    }

    pub fn animals(&self) -> &[Animal] {
        &self.animals
    }

    pub fn available_status(&self) -> &str {
        &self.available_status
    }

    /// 只有可臨時保護狀態的動物會進入篩選
    pub fn available(&self) -> impl Iterator<Item = &Animal> {
        self.animals
            .iter()
            .filter(|animal| animal.status == self.available_status)
    }

    pub fn apply_filters(&mut self, criteria: &FilterCriteria) -> &[MatchResult] {
        let results: Vec<MatchResult> = self
            .available()
            .filter(|animal| matches_criteria(animal, criteria))
            .map(|animal| MatchResult {
                animal: animal.clone(),
                match_score: None,
            })
            .collect();

        tracing::debug!(
            "Hard filtering kept {} of {} animals",
            results.len(),
            self.animals.len()
        );
        self.filtered_results = results;
        &self.filtered_results
    }

    /// 依分數由高到低排序，低於門檻者剔除
    pub fn apply_soft_filtering(&mut self, preferences: &Preferences, threshold: f64) -> &[MatchResult] {
        let mut results: Vec<MatchResult> = self
            .available()
            .filter_map(|animal| {
                let score = match_score(animal, preferences);
                (score >= threshold).then(|| MatchResult {
                    animal: animal.clone(),
                    match_score: Some(score),
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.match_score
                .unwrap_or(0.0)
                .total_cmp(&a.match_score.unwrap_or(0.0))
        });

        tracing::debug!(
            "Soft filtering kept {} animals at threshold {:.2}",
            results.len(),
            threshold
        );
        self.filtered_results = results;
        &self.filtered_results
    }

    pub fn results(&self) -> &[MatchResult] {
        &self.filtered_results
    }

    pub fn into_results(self) -> Vec<MatchResult> {
        self.filtered_results
    }

    pub fn top_matches(&self, n: usize) -> &[MatchResult] {
        &self.filtered_results[..n.min(self.filtered_results.len())]
    }

    pub fn result_stats(&self) -> ResultStats {
        result_stats(&self.filtered_results)
    }

    pub fn export_results<P: AsRef<Path>>(&self, path: P) -> Result<bool> {
        if self.filtered_results.is_empty() {
            tracing::warn!("⚠️ No results to export");
            return Ok(false);
        }
        let csv_output = results_csv(&self.filtered_results)?;
        std::fs::write(path.as_ref(), csv_output)?;
        tracing::info!("💾 Results saved to {}", path.as_ref().display());
        Ok(true)
    }
}

fn non_empty<T>(values: &Option<Vec<T>>) -> Option<&[T]> {
    values.as_deref().filter(|v| !v.is_empty())
}

fn in_range(value: Option<f64>, range: &Range) -> bool {
    value.is_some_and(|v| range.contains(v))
}

fn contains_any_lowercase(text: &str, needles: &[String]) -> bool {
    let text = text.to_lowercase();
    needles
        .iter()
        .filter(|needle| !needle.is_empty())
        .any(|needle| text.contains(&needle.to_lowercase()))
}

fn matches_region(animal: &Animal, regions: &[String]) -> bool {
    regions.contains(&animal.rescue_location) || is_nationwide(animal)
}

fn matches_gender(animal: &Animal, genders: &[Gender]) -> bool {
    animal.gender.is_some_and(|gender| genders.contains(&gender))
}

fn matches_any_loosely(values: &[String], wanted: &[String]) -> bool {
    wanted
        .iter()
        .any(|w| values.iter().any(|value| loosely_matches(w, value)))
}

/// 動物沒有該項分數時略過該條件
fn matches_behavior(animal: &Animal, requirements: &BTreeMap<BehaviorTrait, TraitRequirement>) -> bool {
    requirements.iter().all(|(&behavior, requirement)| {
        animal
            .behavior_traits
            .get(behavior)
            .map_or(true, |value| requirement.accepts(value))
    })
}

fn matches_health(animal: &Animal, requirements: &HealthRequirements) -> bool {
    let health = &animal.health_info;

    // 沒有接種紀錄時不以次數排除
    if let Some(min) = requirements.min_vaccinations {
        if !health.vaccination.is_empty() && health.vaccination.len() < min {
            return false;
        }
    }

    if let Some(history) = &health.medical_history {
        if requirements.no_medical_history {
            return false;
        }
        if contains_any_lowercase(history, &requirements.exclude_conditions) {
            return false;
        }
    }

    true
}

fn matches_care_preferences(animal: &Animal, preferences: &CarePreferences) -> bool {
    let conditions = &animal.care_conditions;

    if let (Some(max), Some(duration)) = (preferences.max_duration, conditions.duration) {
        if duration > max {
            return false;
        }
    }

    if let Some(method) = &preferences.pickup_method {
        if !conditions.pickup.is_empty() && !conditions.pickup.contains(method.as_str()) {
            return false;
        }
    }

    if let Some(additional) = &conditions.additional_conditions {
        if contains_any_lowercase(additional, &preferences.exclude_conditions) {
            return false;
        }
    }

    true
}

/// 所有給定的條件都需符合 (狀態條件除外，由呼叫端處理)
pub fn matches_criteria(animal: &Animal, criteria: &FilterCriteria) -> bool {
    if let Some(regions) = non_empty(&criteria.region) {
        if !matches_region(animal, regions) {
            return false;
        }
    }
    if let Some(genders) = non_empty(&criteria.gender) {
        if !matches_gender(animal, genders) {
            return false;
        }
    }
    if let Some(care_types) = non_empty(&criteria.care_type) {
        if !care_types.contains(&animal.care_type) {
            return false;
        }
    }
    if let Some(range) = criteria.age_range.filter(|r| !r.is_unbounded()) {
        if !in_range(animal.age.map(f64::from), &range) {
            return false;
        }
    }
    if let Some(range) = criteria.weight_range.filter(|r| !r.is_unbounded()) {
        if !in_range(animal.weight, &range) {
            return false;
        }
    }
    if let Some(neutered) = criteria.neutered {
        if animal.neutered != Some(neutered) {
            return false;
        }
    }
    if let Some(hashtags) = non_empty(&criteria.hashtags) {
        if !matches_any_loosely(&animal.hashtags, hashtags) {
            return false;
        }
    }
    if let Some(homes) = non_empty(&criteria.suitable_homes) {
        if !matches_any_loosely(&animal.care_conditions.suitable_homes, homes) {
            return false;
        }
    }
    if let Some(requirements) = criteria.behavior_traits.as_ref().filter(|r| !r.is_empty()) {
        if !matches_behavior(animal, requirements) {
            return false;
        }
    }
    if let Some(requirements) = criteria.health_requirements.as_ref().filter(|r| !r.is_empty()) {
        if !matches_health(animal, requirements) {
            return false;
        }
    }
    if let Some(preferences) = criteria.care_preferences.as_ref().filter(|p| !p.is_empty()) {
        if !matches_care_preferences(animal, preferences) {
            return false;
        }
    }
    true
}

fn age_bucket(age: Option<i32>) -> &'static str {
    match age {
        None => "나이 불명",
        Some(a) if a <= 1 => "1세 이하",
        Some(a) if a <= 3 => "1-3세",
        Some(a) if a <= 7 => "4-7세",
        Some(_) => "8세 이상",
    }
}

fn weight_bucket(weight: Option<f64>) -> &'static str {
    match weight {
        None => "몸무게 불명",
        Some(w) if w < 5.0 => "소형견",
        Some(w) if w <= 15.0 => "중형견",
        Some(_) => "대형견",
    }
}

pub fn result_stats(results: &[MatchResult]) -> ResultStats {
    if results.is_empty() {
        return ResultStats::default();
    }

    let animals = || results.iter().map(|r| &r.animal);
    let mut region_distribution = value_counts(animals().map(|a| a.rescue_location.as_str()));
    region_distribution.truncate(10);

    ResultStats {
        total_count: results.len(),
        gender_distribution: value_counts(animals().filter_map(|a| a.gender).map(|g| g.as_str())),
        age_distribution: value_counts(animals().map(|a| age_bucket(a.age))),
        weight_distribution: value_counts(animals().map(|a| weight_bucket(a.weight))),
        care_type_distribution: value_counts(animals().map(|a| a.care_type.as_str())),
        region_distribution,
    }
}

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    id: Option<&'a str>,
    name: &'a str,
    gender: Option<&'static str>,
    age: Option<i32>,
    weight: Option<f64>,
    care_type: &'a str,
    rescue_location: &'a str,
    hashtags: String,
    match_score: f64,
    detail_link: &'a str,
}

impl<'a> From<&'a MatchResult> for ExportRow<'a> {
    fn from(result: &'a MatchResult) -> Self {
        let animal = &result.animal;
        Self {
            id: animal.id.as_deref(),
            name: &animal.name,
            gender: animal.gender.map(|g| g.as_str()),
            age: animal.age,
            weight: animal.weight,
            care_type: &animal.care_type,
            rescue_location: &animal.rescue_location,
            hashtags: animal.hashtags.join(LIST_SEPARATOR),
            match_score: result.match_score.unwrap_or(0.0),
            detail_link: &animal.detail_link,
        }
    }
}

/// 匯出用 CSV：id, name, gender, age, weight, care_type, rescue_location, hashtags, match_score, detail_link
pub fn results_csv(results: &[MatchResult]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for result in results {
        writer.serialize(ExportRow::from(result))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| AppError::processing(format!("CSV output is not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scoring::NATIONWIDE_REGION;
    use crate::domain::criteria::{RangePreference, ScoreWeights};
    use crate::domain::model::Vaccination;

    fn dog(name: &str, location: &str, age: Option<i32>, weight: Option<f64>) -> Animal {
        Animal {
            name: name.to_string(),
            status: DEFAULT_AVAILABLE_STATUS.to_string(),
            care_type: "일반임보".to_string(),
            rescue_location: location.to_string(),
            gender: Some(Gender::Male),
            neutered: Some(true),
            age,
            weight,
            ..Default::default()
        }
    }

    fn herd() -> Vec<Animal> {
        let mut choco = dog("초코", "서울", Some(3), Some(8.5));
        choco.hashtags = vec!["애교쟁이".to_string(), "사람좋아".to_string()];
        choco.care_conditions.suitable_homes = vec!["아파트".to_string()];
        choco.behavior_traits.barking = Some(2);
        choco.health_info.vaccination = vec![Vaccination {
            round: 1,
            date: "23.04.01".to_string(),
        }];

        let mut bori = dog("보리", "부산", Some(9), Some(22.0));
        bori.gender = Some(Gender::Female);
        bori.neutered = Some(false);
        bori.care_type = "단기임보".to_string();
        bori.care_conditions.region = NATIONWIDE_REGION.to_string();
        bori.care_conditions.duration = Some(6);
        bori.care_conditions.pickup = "탁송 가능".to_string();
        bori.health_info.medical_history = Some("심장사상충 치료".to_string());
        bori.hashtags = vec!["조용조용".to_string()];
        bori.behavior_traits.barking = Some(4);

        let mut kongi = dog("콩이", "서울", None, None);
        kongi.status = "입양완료".to_string();

        let mut dubu = dog("두부", "대구", Some(1), Some(3.2));
        dubu.care_conditions.additional_conditions = Some("다른 반려견 없는 집".to_string());

        vec![choco, bori, kongi, dubu]
    }

    fn names(results: &[MatchResult]) -> Vec<&str> {
        results.iter().map(|r| r.animal.name.as_str()).collect()
    }

    #[test]
    fn test_empty_criteria_keeps_available_only() {
        let mut filter = AnimalFilter::new(herd());
        let results = filter.apply_filters(&FilterCriteria::default());
        assert_eq!(names(results), vec!["초코", "보리", "두부"]);
    }

    #[test]
    fn test_region_filter_includes_nationwide() {
        let mut filter = AnimalFilter::new(herd());
        let criteria = FilterCriteria {
            region: Some(vec!["서울".to_string()]),
            ..Default::default()
        };
        assert_eq!(names(filter.apply_filters(&criteria)), vec!["초코", "보리"]);
    }

    #[test]
    fn test_age_and_weight_ranges_drop_unknowns() {
        let mut filter = AnimalFilter::new(herd());
        let criteria = FilterCriteria {
            age_range: Some(Range::new(1.0, 5.0)),
            weight_range: Some(Range {
                min: Some(5.0),
                max: None,
            }),
            ..Default::default()
        };
        assert_eq!(names(filter.apply_filters(&criteria)), vec!["초코"]);

        let unbounded = FilterCriteria {
            age_range: Some(Range::default()),
            ..Default::default()
        };
        assert_eq!(filter.apply_filters(&unbounded).len(), 3);
    }

    #[test]
    fn test_gender_care_type_and_neutered() {
        let mut filter = AnimalFilter::new(herd());
        let criteria = FilterCriteria {
            gender: Some(vec![Gender::Female]),
            care_type: Some(vec!["단기임보".to_string()]),
            neutered: Some(false),
            ..Default::default()
        };
        assert_eq!(names(filter.apply_filters(&criteria)), vec!["보리"]);
    }

    #[test]
    fn test_hashtag_and_home_filters_use_substrings() {
        let mut filter = AnimalFilter::new(herd());
        let criteria = FilterCriteria {
            hashtags: Some(vec!["애교".to_string(), "활발".to_string()]),
            suitable_homes: Some(vec!["아파트 (엘리베이터)".to_string()]),
            ..Default::default()
        };
        assert_eq!(names(filter.apply_filters(&criteria)), vec!["초코"]);
    }

    #[test]
    fn test_behavior_requirements_skip_unknown_values() {
        let mut filter = AnimalFilter::new(herd());
        let mut traits = BTreeMap::new();
        traits.insert(
            BehaviorTrait::Barking,
            TraitRequirement {
                max: Some(2),
                ..Default::default()
            },
        );
        let criteria = FilterCriteria {
            behavior_traits: Some(traits),
            ..Default::default()
        };
        // 두부 沒有吠叫分數，不受影響
        assert_eq!(names(filter.apply_filters(&criteria)), vec!["초코", "두부"]);
    }

    #[test]
    fn test_health_requirements() {
        let mut filter = AnimalFilter::new(herd());
        let criteria = FilterCriteria {
            health_requirements: Some(HealthRequirements {
                min_vaccinations: Some(2),
                exclude_conditions: vec!["심장사상충".to_string()],
                ..Default::default()
            }),
            ..Default::default()
        };
        // 초코 只有一次接種；두부 沒有紀錄所以保留
        assert_eq!(names(filter.apply_filters(&criteria)), vec!["두부"]);

        let no_history = FilterCriteria {
            health_requirements: Some(HealthRequirements {
                no_medical_history: true,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(names(filter.apply_filters(&no_history)), vec!["초코", "두부"]);
    }

    #[test]
    fn test_care_preferences() {
        let mut filter = AnimalFilter::new(herd());
        let criteria = FilterCriteria {
            care_preferences: Some(CarePreferences {
                max_duration: Some(3),
                exclude_conditions: vec!["반려견 없는".to_string()],
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(names(filter.apply_filters(&criteria)), vec!["초코"]);

        let pickup = FilterCriteria {
            care_preferences: Some(CarePreferences {
                pickup_method: Some("직접".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(names(filter.apply_filters(&pickup)), vec!["초코", "두부"]);
    }

    #[test]
    fn test_soft_filtering_sorts_by_score() {
        let mut filter = AnimalFilter::new(herd());
        let preferences = Preferences {
            age_preference: Some(RangePreference {
                preferred: Range::new(2.0, 4.0),
                acceptable: Range::new(1.0, 6.0),
            }),
            personality_traits: Some(vec!["애교쟁이".to_string()]),
            weights: ScoreWeights {
                age: Some(1.5),
                personality: Some(1.0),
                ..Default::default()
            },
            ..Default::default()
        };

        let results = filter.apply_soft_filtering(&preferences, DEFAULT_THRESHOLD);
        assert_eq!(names(results), vec!["초코", "두부"]);
        assert_eq!(results[0].match_score, Some(1.0));
        // 두부: (0.7 * 1.5 + 0.5) / 2.5
        assert!((results[1].match_score.unwrap() - 0.62).abs() < 1e-9);

        assert_eq!(filter.top_matches(1).len(), 1);
        assert_eq!(filter.top_matches(10).len(), 2);
    }

    #[test]
    fn test_result_stats_buckets() {
        let mut filter = AnimalFilter::new(herd());
        assert_eq!(filter.result_stats().total_count, 0);

        filter.apply_filters(&FilterCriteria::default());
        let stats = filter.result_stats();
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.gender_distribution[0], ("male".to_string(), 2));
        assert!(stats.age_distribution.contains(&("1세 이하".to_string(), 1)));
        assert!(stats.age_distribution.contains(&("8세 이상".to_string(), 1)));
        assert!(stats.weight_distribution.contains(&("소형견".to_string(), 1)));
        assert!(stats.weight_distribution.contains(&("대형견".to_string(), 1)));
    }

    #[test]
    fn test_export_results_skips_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("results.csv");

        let mut filter = AnimalFilter::new(herd());
        assert!(!filter.export_results(&path).unwrap());
        assert!(!path.exists());

        filter.apply_filters(&FilterCriteria::default());
        assert!(filter.export_results(&path).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 4);

        filter.set_animals(Vec::new());
        assert!(filter.results().is_empty());
    }

    #[test]
    fn test_results_csv_defaults_score_to_zero() {
        let mut filter = AnimalFilter::new(herd());
        filter.apply_filters(&FilterCriteria {
            region: Some(vec!["대구".to_string()]),
            ..Default::default()
        });

        let output = results_csv(filter.results()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines[0],
            "id,name,gender,age,weight,care_type,rescue_location,hashtags,match_score,detail_link"
        );
        // 보리 為全國可臨時保護
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains(",0.0,"));
    }
}
