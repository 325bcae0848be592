//! 推薦分數：各項目 0..=1，依權重加權平均。

use crate::domain::criteria::{BehaviorPreference, Preferences, RangePreference};
use crate::domain::model::{Animal, BehaviorTrait};
use std::collections::BTreeMap;

pub const NATIONWIDE_REGION: &str = "전국";

const UNKNOWN_SCORE: f64 = 0.5;
const ACCEPTABLE_SCORE: f64 = 0.7;
/// 1-5 分制下的最大差距
const BEHAVIOR_SCALE_SPAN: f64 = 4.0;

/// 任一方包含另一方即視為相符，例如 `애교` 與 `애교쟁이`
pub fn loosely_matches(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

pub fn is_nationwide(animal: &Animal) -> bool {
    animal.care_conditions.region == NATIONWIDE_REGION
}

pub fn region_score(animal: &Animal, preferred_regions: &[String]) -> f64 {
    if is_nationwide(animal) || preferred_regions.contains(&animal.rescue_location) {
        1.0
    } else {
        0.0
    }
}

/// 年齡與體重共用：偏好區間 1.0，可接受區間 0.7，未知 0.5
pub fn range_score(value: Option<f64>, preference: &RangePreference) -> f64 {
    match value {
        None => UNKNOWN_SCORE,
        Some(v) if preference.preferred.contains(v) => 1.0,
        Some(v) if preference.acceptable.contains(v) => ACCEPTABLE_SCORE,
        Some(_) => 0.0,
    }
}

pub fn personality_score(animal: &Animal, personality_traits: &[String]) -> f64 {
    if animal.hashtags.is_empty() || personality_traits.is_empty() {
        return UNKNOWN_SCORE;
    }

    let matched = personality_traits
        .iter()
        .filter(|wanted| animal.hashtags.iter().any(|tag| loosely_matches(wanted, tag)))
        .count();

    matched as f64 / personality_traits.len() as f64
}

pub fn behavior_score(animal: &Animal, preferences: &BTreeMap<BehaviorTrait, BehaviorPreference>) -> f64 {
    let mut total = 0.0;
    let mut scored = 0usize;

    for (&behavior, preference) in preferences {
        let Some(value) = animal.behavior_traits.get(behavior) else {
            continue;
        };

        total += if preference.ideal == Some(value) {
            1.0
        } else if preference.acceptable.contains(&value) {
            ACCEPTABLE_SCORE
        } else {
            match preference.ideal {
                Some(ideal) => {
                    let distance = (f64::from(value) - f64::from(ideal)).abs();
                    (1.0 - distance / BEHAVIOR_SCALE_SPAN).max(0.0)
                }
                None => 1.0,
            }
        };
        scored += 1;
    }

    if scored > 0 {
        total / scored as f64
    } else {
        UNKNOWN_SCORE
    }
}

/// 僅計入偏好中有出現的項目；全部缺席時為 0
pub fn match_score(animal: &Animal, preferences: &Preferences) -> f64 {
    let weights = &preferences.weights;
    let mut components: Vec<(f64, f64)> = Vec::with_capacity(5);

    if let Some(regions) = &preferences.region {
        components.push((region_score(animal, regions), weights.region()));
    }
    if let Some(age) = &preferences.age_preference {
        components.push((range_score(animal.age.map(f64::from), age), weights.age()));
    }
    if let Some(size) = &preferences.size_preference {
        components.push((range_score(animal.weight, size), weights.size()));
    }
    if let Some(traits) = &preferences.personality_traits {
        components.push((personality_score(animal, traits), weights.personality()));
    }
    if let Some(behaviors) = &preferences.behavior_preferences {
        components.push((behavior_score(animal, behaviors), weights.behavior()));
    }

    let total_weight: f64 = components.iter().map(|(_, weight)| weight).sum();
    if total_weight > 0.0 {
        components.iter().map(|(score, weight)| score * weight).sum::<f64>() / total_weight
    } else {
        0.0
    }
}
