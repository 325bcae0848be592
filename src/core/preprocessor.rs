use crate::domain::model::{
    value_counts, Animal, BehaviorTrait, BehaviorTraits, CareConditions, DataStatistics, Gender,
    HealthInfo, LabeledRange, Metadata, RawAnimalRow, Vaccination,
};
use crate::utils::error::{AppError, Result};
use chrono::Datelike;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

pub const DEFAULT_AVAILABLE_STATUS: &str = "임보가능";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const LIST_SEPARATOR: &str = "|";

static DETAIL_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/(\d+)/$").unwrap());
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{4})").unwrap());
static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)").unwrap());
static INTEGER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)").unwrap());
static VACCINATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)차접종.*?(\d{2}\.\d{2}\.\d{2})").unwrap());

/// 讀入 CSV 並轉換為 `Animal`，同時整理篩選用的 metadata
#[derive(Debug, Clone)]
pub struct DataPreprocessor {
    reference_year: i32,
    available_status: String,
    animals: Vec<Animal>,
    metadata: Metadata,
}

impl Default for DataPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DataPreprocessor {
    pub fn new() -> Self {
        Self::with_reference_year(chrono::Local::now().year())
    }

    /// 以指定年份計算年齡
    pub fn with_reference_year(reference_year: i32) -> Self {
        Self {
            reference_year,
            available_status: DEFAULT_AVAILABLE_STATUS.to_string(),
            animals: Vec::new(),
            metadata: Metadata::default(),
        }
    }

    pub fn with_available_status(mut self, status: impl Into<String>) -> Self {
        self.available_status = status.into();
        self
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    pub fn load_and_process<P: AsRef<Path>>(&mut self, csv_path: P) -> Result<&[Animal]> {
        let bytes = std::fs::read(csv_path.as_ref())?;
        let rows = parse_csv(&bytes)?;
        tracing::info!("📥 Loaded {} animal rows from {}", rows.len(), csv_path.as_ref().display());

        self.process_rows(rows);
        tracing::info!("✅ Preprocessing complete: {} animals", self.animals.len());
        Ok(&self.animals)
    }

    pub fn process_rows(&mut self, rows: Vec<RawAnimalRow>) -> &[Animal] {
        self.animals = rows.iter().map(|row| self.process_row(row)).collect();
        self.metadata = build_metadata(&self.animals);
        tracing::debug!(
            "Metadata: {} regions, {} hashtags, {} home types",
            self.metadata.regions.len(),
            self.metadata.all_hashtags.len(),
            self.metadata.suitable_home_types.len()
        );
        &self.animals
    }

    pub fn process_row(&self, row: &RawAnimalRow) -> Animal {
        let detail_link = text(&row.detail_link);
        let birth_year = row.birth.as_deref().and_then(extract_birth_year);

        let mut behavior_traits = BehaviorTraits::default();
        for (behavior, raw) in [
            (BehaviorTrait::ToiletTraining, &row.toilet_training),
            (BehaviorTrait::WalkingNeeds, &row.walking_needs),
            (BehaviorTrait::Barking, &row.barking),
            (BehaviorTrait::SeparationAnxiety, &row.separation_anxiety),
            (BehaviorTrait::Shedding, &row.shedding),
            (BehaviorTrait::Affection, &row.affection),
            (BehaviorTrait::HumanFriendly, &row.human_friendly),
            (BehaviorTrait::DogFriendly, &row.dog_friendly),
            (BehaviorTrait::SoloLiving, &row.solo_living),
            (BehaviorTrait::CatFriendly, &row.cat_friendly),
        ] {
            behavior_traits.set(behavior, raw.as_deref().and_then(parse_score));
        }

        Animal {
            id: extract_id(&detail_link),
            name: text(&row.name),
            status: text(&row.status),
            care_type: text(&row.care_type),
            rescue_location: text(&row.rescue_location),
            gender: row.gender.as_deref().map(Gender::normalize),
            neutered: row.neutered.as_deref().map(normalize_neutered),
            birth_year,
            weight: row.weight.as_deref().and_then(extract_weight),
            age: birth_year.map(|year| self.reference_year - year),
            hashtags: row.hashtags.as_deref().map(process_hashtags).unwrap_or_default(),
            care_conditions: CareConditions {
                region: text(&row.care_region),
                duration: row.care_duration.as_deref().and_then(extract_duration),
                pickup: text(&row.care_pickup),
                additional_conditions: optional_text(&row.care_additional_conditions),
                suitable_homes: row.suitable_homes.as_deref().map(split_list).unwrap_or_default(),
            },
            health_info: HealthInfo {
                vaccination: row.vaccination.as_deref().map(process_vaccination).unwrap_or_default(),
                examination: optional_text(&row.examination),
                medical_history: optional_text(&row.medical_history),
                additional_notes: optional_text(&row.health_notes),
            },
            behavior_traits,
            support_provided: text(&row.support_provided),
            sns_link: optional_text(&row.sns),
            announcement_number: text(&row.announcement_number),
            detail_link,
        }
    }

    pub fn animals(&self) -> &[Animal] {
        &self.animals
    }

    pub fn into_animals(self) -> Vec<Animal> {
        self.animals
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn statistics(&self) -> DataStatistics {
        compute_statistics(&self.animals, &self.available_status)
    }

    pub fn save_processed_data<P: AsRef<Path>>(&self, output_path: P) -> Result<()> {
        let csv_output = processed_csv(&self.animals)?;
        if let Some(parent) = output_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(output_path.as_ref(), csv_output)?;
        tracing::info!("💾 Processed data saved to {}", output_path.as_ref().display());
        Ok(())
    }
}

/// 解析 CSV 位元組；容許 UTF-8 BOM
pub fn parse_csv(bytes: &[u8]) -> Result<Vec<RawAnimalRow>> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record?);
    }
    Ok(rows)
}

fn text(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

fn optional_text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn extract_id(link: &str) -> Option<String> {
    DETAIL_ID_RE
        .captures(link)
        .map(|caps| caps[1].to_string())
}

/// `완료` 為已結紮；`미완료` 之類的否定寫法不算
pub fn normalize_neutered(raw: &str) -> bool {
    let value = raw.trim();
    value.contains('완') && !value.contains("미완")
}

pub fn extract_birth_year(raw: &str) -> Option<i32> {
    YEAR_RE.captures(raw).and_then(|caps| caps[1].parse().ok())
}

pub fn extract_weight(raw: &str) -> Option<f64> {
    NUMBER_RE.captures(raw).and_then(|caps| caps[1].parse().ok())
}

pub fn extract_duration(raw: &str) -> Option<u32> {
    INTEGER_RE.captures(raw).and_then(|caps| caps[1].parse().ok())
}

pub fn process_hashtags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|tag| tag.replace('#', "").trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn process_vaccination(raw: &str) -> Vec<Vaccination> {
    raw.lines()
        .filter_map(|line| {
            let caps = VACCINATION_RE.captures(line)?;
            Some(Vaccination {
                round: caps[1].parse().ok()?,
                date: caps[2].to_string(),
            })
        })
        .collect()
}

/// `"3"`、`"3.0"` 皆視為 3；無法解析時為 None
pub fn parse_score(raw: &str) -> Option<u8> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let truncated = value.trunc();
    (0.0..=f64::from(u8::MAX))
        .contains(&truncated)
        .then_some(truncated as u8)
}

/// 保留首次出現順序的去重
fn unique<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| !v.is_empty() && seen.insert(v.clone()))
        .collect()
}

pub fn build_metadata(animals: &[Animal]) -> Metadata {
    let mut genders = Vec::new();
    for gender in animals.iter().filter_map(|a| a.gender) {
        if !genders.contains(&gender) {
            genders.push(gender);
        }
    }

    let age_ranges = if animals.iter().any(|a| a.age.is_some()) {
        vec![
            LabeledRange::new("1세 미만", 0.0, 0.0),
            LabeledRange::new("1-3세", 1.0, 3.0),
            LabeledRange::new("4-7세", 4.0, 7.0),
            LabeledRange::new("8세 이상", 8.0, 100.0),
        ]
    } else {
        Vec::new()
    };

    let weight_ranges = if animals.iter().any(|a| a.weight.is_some()) {
        vec![
            LabeledRange::new("소형견 (5kg 미만)", 0.0, 4.9),
            LabeledRange::new("중형견 (5-15kg)", 5.0, 15.0),
            LabeledRange::new("대형견 (15kg 이상)", 15.1, 100.0),
        ]
    } else {
        Vec::new()
    };

    Metadata {
        regions: unique(animals.iter().map(|a| a.rescue_location.clone())),
        genders,
        care_types: unique(animals.iter().map(|a| a.care_type.clone())),
        age_ranges,
        weight_ranges,
        all_hashtags: unique(animals.iter().flat_map(|a| a.hashtags.iter().cloned())),
        suitable_home_types: unique(
            animals
                .iter()
                .flat_map(|a| a.care_conditions.suitable_homes.iter().cloned()),
        ),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

pub fn compute_statistics(animals: &[Animal], available_status: &str) -> DataStatistics {
    let mut region_distribution = value_counts(animals.iter().map(|a| a.rescue_location.as_str()));
    region_distribution.truncate(10);

    DataStatistics {
        total: animals.len(),
        available: animals
            .iter()
            .filter(|a| a.status == available_status)
            .count(),
        gender_distribution: value_counts(animals.iter().filter_map(|a| a.gender).map(|g| g.as_str())),
        care_type_distribution: value_counts(animals.iter().map(|a| a.care_type.as_str())),
        region_distribution,
        average_age: mean(animals.iter().filter_map(|a| a.age).map(f64::from)).map(round1),
        average_weight: mean(animals.iter().filter_map(|a| a.weight)).map(round1),
    }
}

/// 各行為特性的平均分數
pub fn behavior_statistics(animals: &[Animal]) -> Vec<(BehaviorTrait, Option<f64>)> {
    BehaviorTrait::ALL
        .iter()
        .map(|&behavior| {
            let average = mean(
                animals
                    .iter()
                    .filter_map(|a| a.behavior_traits.get(behavior))
                    .map(f64::from),
            );
            (behavior, average)
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct ProcessedRow<'a> {
    id: Option<&'a str>,
    name: &'a str,
    status: &'a str,
    care_type: &'a str,
    rescue_location: &'a str,
    gender: Option<&'static str>,
    neutered: Option<bool>,
    birth_year: Option<i32>,
    weight: Option<f64>,
    age: Option<i32>,
    hashtags: String,
    care_region: &'a str,
    care_duration: Option<u32>,
    care_pickup: &'a str,
    care_additional_conditions: Option<&'a str>,
    suitable_homes: String,
    vaccination_count: usize,
    medical_history: Option<&'a str>,
    toilet_training: Option<u8>,
    walking_needs: Option<u8>,
    barking: Option<u8>,
    separation_anxiety: Option<u8>,
    shedding: Option<u8>,
    affection: Option<u8>,
    human_friendly: Option<u8>,
    dog_friendly: Option<u8>,
    solo_living: Option<u8>,
    cat_friendly: Option<u8>,
    detail_link: &'a str,
}

impl<'a> From<&'a Animal> for ProcessedRow<'a> {
    fn from(animal: &'a Animal) -> Self {
        let traits = &animal.behavior_traits;
        Self {
            id: animal.id.as_deref(),
            name: &animal.name,
            status: &animal.status,
            care_type: &animal.care_type,
            rescue_location: &animal.rescue_location,
            gender: animal.gender.map(|g| g.as_str()),
            neutered: animal.neutered,
            birth_year: animal.birth_year,
            weight: animal.weight,
            age: animal.age,
            hashtags: animal.hashtags.join(LIST_SEPARATOR),
            care_region: &animal.care_conditions.region,
            care_duration: animal.care_conditions.duration,
            care_pickup: &animal.care_conditions.pickup,
            care_additional_conditions: animal.care_conditions.additional_conditions.as_deref(),
            suitable_homes: animal.care_conditions.suitable_homes.join(LIST_SEPARATOR),
            vaccination_count: animal.health_info.vaccination.len(),
            medical_history: animal.health_info.medical_history.as_deref(),
            toilet_training: traits.toilet_training,
            walking_needs: traits.walking_needs,
            barking: traits.barking,
            separation_anxiety: traits.separation_anxiety,
            shedding: traits.shedding,
            affection: traits.affection,
            human_friendly: traits.human_friendly,
            dog_friendly: traits.dog_friendly,
            solo_living: traits.solo_living,
            cat_friendly: traits.cat_friendly,
            detail_link: &animal.detail_link,
        }
    }
}

/// 將巢狀結構攤平成一列一隻動物的 CSV
pub fn processed_csv(animals: &[Animal]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for animal in animals {
        writer.serialize(ProcessedRow::from(animal))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| AppError::processing(format!("CSV output is not UTF-8: {}", e)))
}
