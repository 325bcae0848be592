//! 使用者條件：硬篩選 (`FilterCriteria`)、推薦偏好 (`Preferences`) 與批次用的 `UserProfile`。
//! 全部可從 JSON 讀入，格式與批次 profile 檔相同。

use crate::domain::model::{BehaviorTrait, Gender};
use crate::utils::error::Result;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

const DEFAULT_RANGE_MIN: f64 = 0.0;
const DEFAULT_RANGE_MAX: f64 = 100.0;

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

/// 接受單一值或陣列，例如 `"gender": "male"` 與 `"gender": ["male"]`
fn one_or_many<'de, D, T>(deserializer: D) -> std::result::Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value: Option<OneOrMany<T>> = Option::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        OneOrMany::One(item) => vec![item],
        OneOrMany::Many(items) => items,
    }))
}

/// 行為特性表；不認得的特性名稱略過
fn known_traits<'de, D, V>(deserializer: D) -> std::result::Result<Option<BTreeMap<BehaviorTrait, V>>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    let raw: Option<BTreeMap<String, V>> = Option::deserialize(deserializer)?;
    Ok(raw.map(|entries| {
        entries
            .into_iter()
            .filter_map(|(key, value)| match BehaviorTrait::from_key(&key) {
                Some(behavior) => Some((behavior, value)),
                None => {
                    tracing::warn!("⚠️ Ignoring unknown behavior trait '{}'", key);
                    None
                }
            })
            .collect()
    }))
}

/// 閉區間；缺少的邊界視為 0 與 100
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Range {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min.unwrap_or(DEFAULT_RANGE_MIN) && value <= self.max.unwrap_or(DEFAULT_RANGE_MAX)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitRequirement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact: Option<u8>,
}

impl TraitRequirement {
    pub fn accepts(&self, value: u8) -> bool {
        self.min.map_or(true, |min| value >= min)
            && self.max.map_or(true, |max| value <= max)
            && self.exact.map_or(true, |exact| value == exact)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthRequirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_vaccinations: Option<usize>,
    #[serde(default)]
    pub no_medical_history: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_conditions: Vec<String>,
}

impl HealthRequirements {
    pub fn is_empty(&self) -> bool {
        self.min_vaccinations.is_none() && !self.no_medical_history && self.exclude_conditions.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarePreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_method: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_conditions: Vec<String>,
}

impl CarePreferences {
    pub fn is_empty(&self) -> bool {
        self.max_duration.is_none() && self.pickup_method.is_none() && self.exclude_conditions.is_empty()
    }
}

/// 硬篩選條件；未給或空的條件不套用
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Option::is_none")]
    pub region: Option<Vec<String>>,
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Option::is_none")]
    pub gender: Option<Vec<Gender>>,
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Option::is_none")]
    pub care_type: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_range: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_range: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neutered: Option<bool>,
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Option::is_none")]
    pub hashtags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Option::is_none")]
    pub suitable_homes: Option<Vec<String>>,
    #[serde(default, deserialize_with = "known_traits", skip_serializing_if = "Option::is_none")]
    pub behavior_traits: Option<BTreeMap<BehaviorTrait, TraitRequirement>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_requirements: Option<HealthRequirements>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub care_preferences: Option<CarePreferences>,
}

impl FilterCriteria {
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RangePreference {
    #[serde(default)]
    pub preferred: Range,
    #[serde(default)]
    pub acceptable: Range,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehaviorPreference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ideal: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acceptable: Vec<u8>,
}

impl BehaviorPreference {
    /// 理想值上下各容許 1 分；理想值先限制在 1-5
    pub fn around(ideal: u8) -> Self {
        let ideal = ideal.clamp(1, 5);
        let low = ideal.saturating_sub(1).max(1);
        let high = ideal.saturating_add(1).min(5);
        Self {
            ideal: Some(ideal),
            acceptable: vec![low, ideal, high],
        }
    }
}

/// 各評分項目的權重；未設定時為 1
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<f64>,
}

impl ScoreWeights {
    pub fn region(&self) -> f64 {
        self.region.unwrap_or(1.0)
    }

    pub fn age(&self) -> f64 {
        self.age.unwrap_or(1.0)
    }

    pub fn size(&self) -> f64 {
        self.size.unwrap_or(1.0)
    }

    pub fn personality(&self) -> f64 {
        self.personality.unwrap_or(1.0)
    }

    pub fn behavior(&self) -> f64 {
        self.behavior.unwrap_or(1.0)
    }

    /// 未設定的項目改用 `fallback`
    pub fn or(self, fallback: ScoreWeights) -> ScoreWeights {
        ScoreWeights {
            region: self.region.or(fallback.region),
            age: self.age.or(fallback.age),
            size: self.size.or(fallback.size),
            personality: self.personality.or(fallback.personality),
            behavior: self.behavior.or(fallback.behavior),
        }
    }
}

/// 推薦偏好；只有給出的項目參與加權平均
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Option::is_none")]
    pub region: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_preference: Option<RangePreference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_preference: Option<RangePreference>,
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Option::is_none")]
    pub personality_traits: Option<Vec<String>>,
    #[serde(default, deserialize_with = "known_traits", skip_serializing_if = "Option::is_none")]
    pub behavior_preferences: Option<BTreeMap<BehaviorTrait, BehaviorPreference>>,
    #[serde(default)]
    pub weights: ScoreWeights,
}

impl Preferences {
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hard_filters: Option<FilterCriteria>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Preferences>,
}

impl UserProfile {
    pub fn list_from_json_str(content: &str) -> Result<Vec<Self>> {
        Ok(serde_json::from_str(content)?)
    }
}

/// 範例 profile，供批次模式試跑
pub fn sample_profiles() -> Vec<UserProfile> {
    let mut first_behaviors = BTreeMap::new();
    first_behaviors.insert(
        BehaviorTrait::Affection,
        BehaviorPreference {
            ideal: Some(4),
            acceptable: vec![3, 4, 5],
        },
    );
    first_behaviors.insert(
        BehaviorTrait::HumanFriendly,
        BehaviorPreference {
            ideal: Some(5),
            acceptable: vec![4, 5],
        },
    );
    first_behaviors.insert(
        BehaviorTrait::Barking,
        BehaviorPreference {
            ideal: Some(2),
            acceptable: vec![1, 2, 3],
        },
    );

    let mut second_behaviors = BTreeMap::new();
    second_behaviors.insert(
        BehaviorTrait::Barking,
        BehaviorPreference {
            ideal: Some(1),
            acceptable: vec![1, 2],
        },
    );
    second_behaviors.insert(
        BehaviorTrait::SeparationAnxiety,
        BehaviorPreference {
            ideal: Some(1),
            acceptable: vec![1, 2],
        },
    );

    vec![
        UserProfile {
            user_id: Some("user_001".to_string()),
            hard_filters: Some(FilterCriteria {
                age_range: Some(Range::new(1.0, 5.0)),
                weight_range: Some(Range::new(3.0, 15.0)),
                gender: Some(vec![Gender::Male, Gender::Female]),
                ..Default::default()
            }),
            preferences: Some(Preferences {
                age_preference: Some(RangePreference {
                    preferred: Range::new(2.0, 4.0),
                    acceptable: Range::new(1.0, 6.0),
                }),
                size_preference: Some(RangePreference {
                    preferred: Range::new(5.0, 12.0),
                    acceptable: Range::new(3.0, 20.0),
                }),
                personality_traits: Some(vec![
                    "애교쟁이".to_string(),
                    "사람좋아".to_string(),
                    "순둥이".to_string(),
                ]),
                behavior_preferences: Some(first_behaviors),
                weights: ScoreWeights {
                    age: Some(1.5),
                    size: Some(1.2),
                    personality: Some(1.8),
                    behavior: Some(1.3),
                    region: None,
                },
                ..Default::default()
            }),
        },
        UserProfile {
            user_id: Some("user_002".to_string()),
            hard_filters: Some(FilterCriteria {
                neutered: Some(true),
                care_type: Some(vec!["일반임보".to_string(), "단기임보".to_string()]),
                ..Default::default()
            }),
            preferences: Some(Preferences {
                age_preference: Some(RangePreference {
                    preferred: Range::new(3.0, 8.0),
                    acceptable: Range::new(1.0, 10.0),
                }),
                personality_traits: Some(vec!["조용조용".to_string(), "똑똑이".to_string()]),
                behavior_preferences: Some(second_behaviors),
                weights: ScoreWeights {
                    age: Some(1.0),
                    personality: Some(2.0),
                    behavior: Some(1.5),
                    ..Default::default()
                },
                ..Default::default()
            }),
        },
    ]
}
