use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// 原始 CSV 的一列，欄位名稱沿用資料來源的韓文標題
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawAnimalRow {
    #[serde(rename = "상세링크")]
    pub detail_link: Option<String>,
    #[serde(rename = "이름")]
    pub name: Option<String>,
    #[serde(rename = "현 상황")]
    pub status: Option<String>,
    #[serde(rename = "임보종류")]
    pub care_type: Option<String>,
    #[serde(rename = "구조 지역")]
    pub rescue_location: Option<String>,
    #[serde(rename = "성별")]
    pub gender: Option<String>,
    #[serde(rename = "중성화 여부")]
    pub neutered: Option<String>,
    #[serde(rename = "출생시기")]
    pub birth: Option<String>,
    #[serde(rename = "몸무게")]
    pub weight: Option<String>,
    #[serde(rename = "해시태그")]
    pub hashtags: Option<String>,
    #[serde(rename = "임보조건_지역")]
    pub care_region: Option<String>,
    #[serde(rename = "임보조건_임보 기간")]
    pub care_duration: Option<String>,
    #[serde(rename = "임보조건_픽업")]
    pub care_pickup: Option<String>,
    #[serde(rename = "임보조건_기타 조건")]
    pub care_additional_conditions: Option<String>,
    #[serde(rename = "이런_집도_가능해요")]
    pub suitable_homes: Option<String>,
    #[serde(rename = "건강정보_접종 현황")]
    pub vaccination: Option<String>,
    #[serde(rename = "건강정보_검사 현황")]
    pub examination: Option<String>,
    #[serde(rename = "건강정보_병력 사항")]
    pub medical_history: Option<String>,
    #[serde(rename = "건강정보_기타 사항")]
    pub health_notes: Option<String>,
    #[serde(rename = "참고용정보_배변")]
    pub toilet_training: Option<String>,
    #[serde(rename = "참고용정보_산책")]
    pub walking_needs: Option<String>,
    #[serde(rename = "참고용정보_짖음")]
    pub barking: Option<String>,
    #[serde(rename = "참고용정보_분리불안")]
    pub separation_anxiety: Option<String>,
    #[serde(rename = "참고용정보_털빠짐")]
    pub shedding: Option<String>,
    #[serde(rename = "참고용정보_스킨십")]
    pub affection: Option<String>,
    #[serde(rename = "참고용정보_대인")]
    pub human_friendly: Option<String>,
    #[serde(rename = "참고용정보_대견")]
    pub dog_friendly: Option<String>,
    #[serde(rename = "참고용정보_외동")]
    pub solo_living: Option<String>,
    #[serde(rename = "참고용정보_대묘")]
    pub cat_friendly: Option<String>,
    #[serde(rename = "책임자_제공_사항")]
    pub support_provided: Option<String>,
    #[serde(rename = "SNS")]
    pub sns: Option<String>,
    #[serde(rename = "공고번호")]
    pub announcement_number: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Gender {
    /// 將 `남아` / `여아` / `male` / `female` 等寫法統一
    pub fn normalize(raw: &str) -> Self {
        let value = raw.trim().to_lowercase();
        // "female" 內含 "male"，必須先判斷
        if value.contains('여') || value.contains("female") {
            Gender::Female
        } else if value.contains('남') || value.contains("male") {
            Gender::Male
        } else {
            Gender::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "unknown" => Ok(Gender::Unknown),
            other => Err(format!("unknown gender '{}', expected male or female", other)),
        }
    }
}

/// 1-5 分的行為特性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorTrait {
    ToiletTraining,
    WalkingNeeds,
    Barking,
    SeparationAnxiety,
    Shedding,
    Affection,
    HumanFriendly,
    DogFriendly,
    SoloLiving,
    CatFriendly,
}

impl BehaviorTrait {
    pub const ALL: [BehaviorTrait; 10] = [
        BehaviorTrait::ToiletTraining,
        BehaviorTrait::WalkingNeeds,
        BehaviorTrait::Barking,
        BehaviorTrait::SeparationAnxiety,
        BehaviorTrait::Shedding,
        BehaviorTrait::Affection,
        BehaviorTrait::HumanFriendly,
        BehaviorTrait::DogFriendly,
        BehaviorTrait::SoloLiving,
        BehaviorTrait::CatFriendly,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            BehaviorTrait::ToiletTraining => "toilet_training",
            BehaviorTrait::WalkingNeeds => "walking_needs",
            BehaviorTrait::Barking => "barking",
            BehaviorTrait::SeparationAnxiety => "separation_anxiety",
            BehaviorTrait::Shedding => "shedding",
            BehaviorTrait::Affection => "affection",
            BehaviorTrait::HumanFriendly => "human_friendly",
            BehaviorTrait::DogFriendly => "dog_friendly",
            BehaviorTrait::SoloLiving => "solo_living",
            BehaviorTrait::CatFriendly => "cat_friendly",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|behavior| behavior.key() == key)
    }

    pub fn label(&self) -> &'static str {
        match self {
            BehaviorTrait::ToiletTraining => "배변 훈련",
            BehaviorTrait::WalkingNeeds => "산책 필요도",
            BehaviorTrait::Barking => "짖음 정도",
            BehaviorTrait::SeparationAnxiety => "분리불안",
            BehaviorTrait::Shedding => "털빠짐",
            BehaviorTrait::Affection => "애정표현",
            BehaviorTrait::HumanFriendly => "사람 친화성",
            BehaviorTrait::DogFriendly => "개 친화성",
            BehaviorTrait::SoloLiving => "혼자 지내기",
            BehaviorTrait::CatFriendly => "고양이 친화성",
        }
    }
}

impl fmt::Display for BehaviorTrait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// 分數刻度說明
pub fn score_description(score: u8) -> Option<&'static str> {
    match score {
        1 => Some("매우 낮음/거의 없음"),
        2 => Some("낮음/가끔"),
        3 => Some("보통"),
        4 => Some("높음/자주"),
        5 => Some("매우 높음/항상"),
        _ => None,
    }
}

/// 임보 종류 설명
pub fn care_type_description(care_type: &str) -> Option<&'static str> {
    match care_type {
        "일반임보" => Some("일반적인 임시보호"),
        "단기임보" => Some("짧은 기간 임시보호"),
        "입양전제" => Some("입양을 전제로 한 임시보호"),
        "긴급임보" => Some("응급상황 임시보호"),
        "릴레이임보" => Some("여러 가정이 번갈아 임보"),
        "수유임보" => Some("새끼 강아지 수유 임보"),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorTraits {
    pub toilet_training: Option<u8>,
    pub walking_needs: Option<u8>,
    pub barking: Option<u8>,
    pub separation_anxiety: Option<u8>,
    pub shedding: Option<u8>,
    pub affection: Option<u8>,
    pub human_friendly: Option<u8>,
    pub dog_friendly: Option<u8>,
    pub solo_living: Option<u8>,
    pub cat_friendly: Option<u8>,
}

impl BehaviorTraits {
    pub fn get(&self, behavior: BehaviorTrait) -> Option<u8> {
        match behavior {
            BehaviorTrait::ToiletTraining => self.toilet_training,
            BehaviorTrait::WalkingNeeds => self.walking_needs,
            BehaviorTrait::Barking => self.barking,
            BehaviorTrait::SeparationAnxiety => self.separation_anxiety,
            BehaviorTrait::Shedding => self.shedding,
            BehaviorTrait::Affection => self.affection,
            BehaviorTrait::HumanFriendly => self.human_friendly,
            BehaviorTrait::DogFriendly => self.dog_friendly,
            BehaviorTrait::SoloLiving => self.solo_living,
            BehaviorTrait::CatFriendly => self.cat_friendly,
        }
    }

    pub fn set(&mut self, behavior: BehaviorTrait, value: Option<u8>) {
        let slot = match behavior {
            BehaviorTrait::ToiletTraining => &mut self.toilet_training,
            BehaviorTrait::WalkingNeeds => &mut self.walking_needs,
            BehaviorTrait::Barking => &mut self.barking,
            BehaviorTrait::SeparationAnxiety => &mut self.separation_anxiety,
            BehaviorTrait::Shedding => &mut self.shedding,
            BehaviorTrait::Affection => &mut self.affection,
            BehaviorTrait::HumanFriendly => &mut self.human_friendly,
            BehaviorTrait::DogFriendly => &mut self.dog_friendly,
            BehaviorTrait::SoloLiving => &mut self.solo_living,
            BehaviorTrait::CatFriendly => &mut self.cat_friendly,
        };
        *slot = value;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vaccination {
    pub round: u32,
    pub date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CareConditions {
    pub region: String,
    pub duration: Option<u32>,
    pub pickup: String,
    pub additional_conditions: Option<String>,
    pub suitable_homes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthInfo {
    pub vaccination: Vec<Vaccination>,
    pub examination: Option<String>,
    pub medical_history: Option<String>,
    pub additional_notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    pub id: Option<String>,
    pub name: String,
    pub status: String,
    pub care_type: String,
    pub rescue_location: String,
    pub gender: Option<Gender>,
    pub neutered: Option<bool>,
    pub birth_year: Option<i32>,
    pub weight: Option<f64>,
    pub age: Option<i32>,
    pub hashtags: Vec<String>,
    pub care_conditions: CareConditions,
    pub health_info: HealthInfo,
    pub behavior_traits: BehaviorTraits,
    pub support_provided: String,
    pub detail_link: String,
    pub sns_link: Option<String>,
    pub announcement_number: String,
}

/// 篩選或推薦後的一筆結果；硬篩選沒有分數
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub animal: Animal,
    pub match_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledRange {
    pub label: String,
    pub min: f64,
    pub max: f64,
}

impl LabeledRange {
    pub fn new(label: &str, min: f64, max: f64) -> Self {
        Self {
            label: label.to_string(),
            min,
            max,
        }
    }
}

/// 篩選畫面可用的選項集合
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub regions: Vec<String>,
    pub genders: Vec<Gender>,
    pub care_types: Vec<String>,
    pub age_ranges: Vec<LabeledRange>,
    pub weight_ranges: Vec<LabeledRange>,
    pub all_hashtags: Vec<String>,
    pub suitable_home_types: Vec<String>,
}

/// 依出現次數遞減排序的 (值, 次數) 列表
pub type Distribution = Vec<(String, usize)>;

/// 計數後依次數遞減排序；同次數維持首次出現順序
pub fn value_counts<I, S>(values: I) -> Distribution
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for value in values {
        let value = value.into();
        match counts.get_mut(&value) {
            Some(count) => *count += 1,
            None => {
                counts.insert(value.clone(), 1);
                order.push(value);
            }
        }
    }

    let mut distribution: Distribution = order
        .into_iter()
        .map(|value| {
            let count = counts.get(&value).copied().unwrap_or(0);
            (value, count)
        })
        .collect();
    distribution.sort_by(|a, b| b.1.cmp(&a.1));
    distribution
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataStatistics {
    pub total: usize,
    pub available: usize,
    pub gender_distribution: Distribution,
    pub care_type_distribution: Distribution,
    pub region_distribution: Distribution,
    pub average_age: Option<f64>,
    pub average_weight: Option<f64>,
}

/// ETL transform 階段的產出
#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    pub animals: Vec<Animal>,
    pub metadata: Metadata,
    pub csv_output: String,
}
