//! 選單式互動模式；輸入與輸出可替換，方便測試

use crate::app::report;
use crate::app::system::RecommendationSystem;
use crate::core::Storage;
use crate::domain::criteria::{
    BehaviorPreference, FilterCriteria, Preferences, Range, RangePreference, ScoreWeights,
};
use crate::domain::model::{score_description, BehaviorTrait, Gender, MatchResult};
use crate::utils::error::Result;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};

const REGION_HINT_COUNT: usize = 10;
const HASHTAG_HINT_COUNT: usize = 10;
const PERSONALITY_HINT_COUNT: usize = 15;

/// 互動模式固定使用的推薦權重
pub const INTERACTIVE_WEIGHTS: ScoreWeights = ScoreWeights {
    region: None,
    age: Some(1.5),
    size: Some(1.2),
    personality: Some(1.8),
    behavior: Some(1.3),
};

/// 推薦時詢問的行為特性
const ASKED_BEHAVIORS: [BehaviorTrait; 3] = [
    BehaviorTrait::Affection,
    BehaviorTrait::HumanFriendly,
    BehaviorTrait::Barking,
];

pub struct InteractiveSession<'a, S: Storage, R: BufRead, W: Write> {
    system: &'a RecommendationSystem<S>,
    input: R,
    output: W,
}

fn parse_list(answer: &str) -> Option<Vec<String>> {
    let values: Vec<String> = answer
        .split(',')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    (!values.is_empty()).then_some(values)
}

fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

impl<'a, S: Storage, R: BufRead, W: Write> InteractiveSession<'a, S, R, W> {
    pub fn new(system: &'a RecommendationSystem<S>, input: R, output: W) -> Self {
        Self { system, input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub async fn run(&mut self) -> Result<()> {
        tracing::info!("🐾 Interactive session started");
        writeln!(self.output, "🐾 Foster animal recommender")?;

        loop {
            writeln!(self.output, "\n{}", "=".repeat(40))?;
            writeln!(self.output, "1. Filter animals")?;
            writeln!(self.output, "2. Get recommendations")?;
            writeln!(self.output, "3. Data statistics")?;
            writeln!(self.output, "4. Quit")?;

            let Some(choice) = self.prompt("Select (1-4): ")? else {
                break;
            };

            match choice.as_str() {
                "1" => self.filter_menu().await?,
                "2" => self.recommend_menu().await?,
                "3" => {
                    let summary = self.system.summary_report();
                    write!(self.output, "\n{}", summary)?;
                }
                "4" => {
                    writeln!(self.output, "👋 Bye!")?;
                    break;
                }
                other => writeln!(self.output, "❌ Invalid choice: {}", other)?,
            }
        }

        tracing::info!("Interactive session finished");
        Ok(())
    }

    /// 讀一行；輸入結束時回傳 `None`
    fn prompt(&mut self, question: &str) -> Result<Option<String>> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// 同 `prompt`，輸入結束時視為空白
    fn ask(&mut self, question: &str) -> Result<String> {
        Ok(self.prompt(question)?.unwrap_or_default())
    }

    fn ask_number<T: std::str::FromStr>(&mut self, question: &str) -> Result<Option<T>> {
        let answer = self.ask(question)?;
        if answer.is_empty() {
            return Ok(None);
        }
        match answer.parse() {
            Ok(value) => Ok(Some(value)),
            Err(_) => {
                writeln!(self.output, "⚠️ '{}' is not a number, skipped", answer)?;
                Ok(None)
            }
        }
    }

    fn ask_range(&mut self, min_question: &str, max_question: &str) -> Result<Option<Range>> {
        let min = self.ask_number::<f64>(min_question)?;
        let max = self.ask_number::<f64>(max_question)?;
        Ok((min.is_some() || max.is_some()).then_some(Range { min, max }))
    }

    /// 兩端都給了才算數
    fn ask_closed_range(&mut self, min_question: &str, max_question: &str) -> Result<Option<Range>> {
        let min = self.ask_number::<f64>(min_question)?;
        let max = self.ask_number::<f64>(max_question)?;
        Ok(min.zip(max).map(|(min, max)| Range::new(min, max)))
    }

    fn show_hint(&mut self, title: &str, values: &[String], limit: usize) -> Result<()> {
        if !values.is_empty() {
            let shown: Vec<&str> = values.iter().take(limit).map(String::as_str).collect();
            writeln!(self.output, "{}: {}", title, shown.join(", "))?;
        }
        Ok(())
    }

    fn collect_filter_criteria(&mut self) -> Result<FilterCriteria> {
        let mut criteria = FilterCriteria::default();
        writeln!(self.output, "\n🔍 Filter criteria (press Enter to skip)")?;

        let regions = self.system.metadata().regions.clone();
        self.show_hint("Regions", &regions, REGION_HINT_COUNT)?;
        criteria.region = parse_list(&self.ask("Region (comma separated): ")?);

        let gender = self.ask("Gender (male/female): ")?;
        if !gender.is_empty() {
            match gender.parse::<Gender>() {
                Ok(gender) => criteria.gender = Some(vec![gender]),
                Err(e) => writeln!(self.output, "⚠️ {}", e)?,
            }
        }

        criteria.age_range = self.ask_range("Minimum age: ", "Maximum age: ")?;
        criteria.weight_range = self.ask_range("Minimum weight (kg): ", "Maximum weight (kg): ")?;

        let neutered = self.ask("Neutered only? (y/n): ")?;
        criteria.neutered = parse_yes_no(&neutered);

        let hashtags = self.system.metadata().all_hashtags.clone();
        self.show_hint("Hashtags", &hashtags, HASHTAG_HINT_COUNT)?;
        criteria.hashtags = parse_list(&self.ask("Hashtags (comma separated): ")?);

        Ok(criteria)
    }

    fn collect_preferences(&mut self) -> Result<Preferences> {
        let mut preferences = Preferences {
            weights: INTERACTIVE_WEIGHTS,
            ..Default::default()
        };
        writeln!(self.output, "\n💝 Preferences (press Enter to skip)")?;

        if let Some(preferred) = self.ask_closed_range("Preferred minimum age: ", "Preferred maximum age: ")? {
            let acceptable = self
                .ask_closed_range("Acceptable minimum age: ", "Acceptable maximum age: ")?
                .unwrap_or_default();
            preferences.age_preference = Some(RangePreference { preferred, acceptable });
        }

        if let Some(preferred) = self.ask_closed_range(
            "Preferred minimum weight (kg): ",
            "Preferred maximum weight (kg): ",
        )? {
            preferences.size_preference = Some(RangePreference {
                preferred,
                acceptable: Range::default(),
            });
        }

        let hashtags = self.system.metadata().all_hashtags.clone();
        self.show_hint("Personality hashtags", &hashtags, PERSONALITY_HINT_COUNT)?;
        preferences.personality_traits = parse_list(&self.ask("Personality traits (comma separated): ")?);

        writeln!(self.output, "Behavior scale:")?;
        for score in 1..=5u8 {
            if let Some(description) = score_description(score) {
                writeln!(self.output, "  {} = {}", score, description)?;
            }
        }

        let mut behaviors = BTreeMap::new();
        for behavior in ASKED_BEHAVIORS {
            let question = format!("Ideal {} (1-5): ", behavior.label());
            match self.ask_number::<u8>(&question)? {
                Some(ideal) if (1..=5).contains(&ideal) => {
                    behaviors.insert(behavior, BehaviorPreference::around(ideal));
                }
                Some(ideal) => writeln!(self.output, "⚠️ {} is outside 1-5, skipped", ideal)?,
                None => {}
            }
        }
        if !behaviors.is_empty() {
            preferences.behavior_preferences = Some(behaviors);
        }

        Ok(preferences)
    }

    async fn offer_save(&mut self, results: &[MatchResult], prefix: &str) -> Result<()> {
        if results.is_empty() {
            return Ok(());
        }
        let answer = self.ask("Save results? (y/n): ")?;
        if parse_yes_no(&answer) == Some(true) {
            if let Some(location) = self.system.save_results(results, prefix).await? {
                writeln!(self.output, "💾 Saved to {}", location)?;
            }
        }
        Ok(())
    }

    async fn filter_menu(&mut self) -> Result<()> {
        let criteria = self.collect_filter_criteria()?;
        let results = self.system.hard_filter(&criteria);

        if results.is_empty() {
            writeln!(self.output, "😔 No animals match these criteria")?;
            return Ok(());
        }

        let listing = self.system.render_results(&results, None);
        let stats = report::render_result_stats(&crate::core::filter::result_stats(&results));
        write!(self.output, "\n{}\n{}", listing, stats)?;

        self.offer_save(&results, "filter_results").await
    }

    async fn recommend_menu(&mut self) -> Result<()> {
        let preferences = self.collect_preferences()?;
        let results = self.system.recommend(&preferences, None);

        if results.is_empty() {
            writeln!(self.output, "😔 No recommendations above the threshold")?;
            return Ok(());
        }

        let listing = self.system.render_results(&results, None);
        write!(self.output, "\n{}", listing)?;

        self.offer_save(&results, "recommendations").await
    }
}
