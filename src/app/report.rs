//! 終端輸出用的文字報表

use crate::core::filter::ResultStats;
use crate::domain::model::{care_type_description, BehaviorTrait, DataStatistics, Distribution, MatchResult, Metadata};
use std::fmt::Write;

const SEPARATOR_WIDTH: usize = 80;
const SUMMARY_TOP_N: usize = 5;

fn or_unknown<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "?".to_string(), |v| v.to_string())
}

fn write_distribution(out: &mut String, title: &str, distribution: &Distribution, limit: usize) {
    let _ = writeln!(out, "\n{}", title);
    if distribution.is_empty() {
        let _ = writeln!(out, "  • (none)");
    }
    for (label, count) in distribution.iter().take(limit) {
        let _ = writeln!(out, "  • {}: {}", label, count);
    }
}

pub fn render_summary(
    stats: &DataStatistics,
    metadata: &Metadata,
    behavior: &[(BehaviorTrait, Option<f64>)],
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "📊 Data summary");
    let _ = writeln!(out, "  • Animals: {}", stats.total);
    let _ = writeln!(out, "  • Available for foster care: {}", stats.available);
    let _ = writeln!(out, "  • Average age: {}", or_unknown(stats.average_age));
    let _ = writeln!(out, "  • Average weight (kg): {}", or_unknown(stats.average_weight));

    write_distribution(&mut out, "🏷️ Gender", &stats.gender_distribution, usize::MAX);

    let _ = writeln!(out, "\n🏠 Care types");
    for (care_type, count) in stats.care_type_distribution.iter().take(SUMMARY_TOP_N) {
        match care_type_description(care_type) {
            Some(description) => {
                let _ = writeln!(out, "  • {} ({}): {}", care_type, description, count);
            }
            None => {
                let _ = writeln!(out, "  • {}: {}", care_type, count);
            }
        }
    }

    write_distribution(&mut out, "📍 Rescue regions", &stats.region_distribution, SUMMARY_TOP_N);

    let _ = writeln!(out, "\n📈 Details");
    let _ = writeln!(out, "  • Hashtags: {}", metadata.all_hashtags.len());
    let _ = writeln!(out, "  • Rescue regions: {}", metadata.regions.len());
    let _ = writeln!(out, "  • Suitable home types: {}", metadata.suitable_home_types.len());

    let _ = writeln!(out, "\n🐕 Behavior averages");
    for (behavior, average) in behavior {
        if let Some(average) = average {
            let _ = writeln!(out, "  • {} ({}): {:.1}/5.0", behavior.label(), behavior, average);
        }
    }

    out
}

/// 前 `limit` 筆結果；有分數時顯示相符度
pub fn render_results(results: &[MatchResult], limit: usize, max_hashtags: usize) -> String {
    let mut out = String::new();
    let shown = results.len().min(limit);
    let _ = writeln!(out, "📋 Top {} of {} animals", shown, results.len());
    let _ = writeln!(out, "{}", "-".repeat(SEPARATOR_WIDTH));

    for (i, result) in results.iter().take(limit).enumerate() {
        let animal = &result.animal;
        let profile = format!(
            "{}, {}y, {}kg",
            or_unknown(animal.gender),
            or_unknown(animal.age),
            or_unknown(animal.weight)
        );

        match result.match_score {
            Some(score) => {
                let _ = writeln!(out, "{:2}. {} (match {:.1}%)", i + 1, animal.name, score * 100.0);
                let _ = writeln!(out, "    👤 {}", profile);
            }
            None => {
                let _ = writeln!(out, "{:2}. {} ({})", i + 1, animal.name, profile);
            }
        }

        let _ = writeln!(out, "    📍 {} | 🏠 {}", animal.rescue_location, animal.care_type);
        let tags: Vec<&str> = animal
            .hashtags
            .iter()
            .take(max_hashtags)
            .map(String::as_str)
            .collect();
        if !tags.is_empty() {
            let _ = writeln!(out, "    🏷️ {}", tags.join(", "));
        }
        if !animal.detail_link.is_empty() {
            let _ = writeln!(out, "    🔗 {}", animal.detail_link);
        }
    }

    out
}

pub fn render_result_stats(stats: &ResultStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "📊 Result statistics ({} animals)", stats.total_count);
    if stats.total_count == 0 {
        return out;
    }
    write_distribution(&mut out, "  Gender", &stats.gender_distribution, usize::MAX);
    write_distribution(&mut out, "  Age", &stats.age_distribution, usize::MAX);
    write_distribution(&mut out, "  Weight", &stats.weight_distribution, usize::MAX);
    write_distribution(&mut out, "  Care type", &stats.care_type_distribution, usize::MAX);
    write_distribution(&mut out, "  Region", &stats.region_distribution, usize::MAX);
    out
}
