pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "animal-recommender")]
#[command(about = "Filter and recommend foster-care animals from a shelter CSV export")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Animal data CSV (overrides paths.data_path)
    #[arg(long, global = true)]
    pub data: Option<String>,

    /// Output directory (overrides paths.output_dir)
    #[arg(long, global = true)]
    pub output: Option<String>,

    /// Log directory (overrides paths.log_dir)
    #[arg(long, global = true)]
    pub log_dir: Option<String>,

    /// Disable the log file
    #[arg(long, global = true)]
    pub no_log_file: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log CPU and memory usage per ETL phase")]
    pub monitor: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the data summary and behavior statistics
    Stats,
    /// Normalize the CSV and write processed_animal_data.csv + metadata.json
    Preprocess,
    /// Apply hard filters
    Filter(FilterArgs),
    /// Score animals against preferences and list the best matches
    Recommend(RecommendArgs),
    /// Run every profile in a JSON file
    Batch(BatchArgs),
    /// Write the sample user profiles JSON
    SampleProfiles {
        #[arg(long, default_value = "sample_user_profiles.json")]
        path: PathBuf,
    },
    /// Menu-driven session on stdin
    Interactive,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// JSON file with filter criteria; flags below are merged on top
    #[arg(long)]
    pub criteria: Option<PathBuf>,

    #[arg(long, value_delimiter = ',')]
    pub region: Vec<String>,

    #[arg(long, value_delimiter = ',')]
    pub gender: Vec<crate::domain::model::Gender>,

    #[arg(long, value_delimiter = ',')]
    pub care_type: Vec<String>,

    #[arg(long)]
    pub min_age: Option<f64>,

    #[arg(long)]
    pub max_age: Option<f64>,

    #[arg(long)]
    pub min_weight: Option<f64>,

    #[arg(long)]
    pub max_weight: Option<f64>,

    #[arg(long)]
    pub neutered: Option<bool>,

    #[arg(long, value_delimiter = ',')]
    pub hashtags: Vec<String>,

    /// Save results as filter_results_<timestamp>.csv
    #[arg(long)]
    pub save: bool,
}

#[cfg(feature = "cli")]
impl FilterArgs {
    /// 以命令列旗標覆蓋 JSON 條件中的同名欄位
    pub fn merge_into(&self, mut criteria: crate::domain::criteria::FilterCriteria) -> crate::domain::criteria::FilterCriteria {
        use crate::domain::criteria::Range;

        if !self.region.is_empty() {
            criteria.region = Some(self.region.clone());
        }
        if !self.gender.is_empty() {
            criteria.gender = Some(self.gender.clone());
        }
        if !self.care_type.is_empty() {
            criteria.care_type = Some(self.care_type.clone());
        }
        if self.min_age.is_some() || self.max_age.is_some() {
            criteria.age_range = Some(Range {
                min: self.min_age,
                max: self.max_age,
            });
        }
        if self.min_weight.is_some() || self.max_weight.is_some() {
            criteria.weight_range = Some(Range {
                min: self.min_weight,
                max: self.max_weight,
            });
        }
        if self.neutered.is_some() {
            criteria.neutered = self.neutered;
        }
        if !self.hashtags.is_empty() {
            criteria.hashtags = Some(self.hashtags.clone());
        }
        criteria
    }
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Args)]
pub struct RecommendArgs {
    /// JSON file with preferences
    #[arg(long)]
    pub preferences: PathBuf,

    /// Minimum match score (defaults to recommendation.default_threshold)
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Number of matches to print
    #[arg(long)]
    pub limit: Option<usize>,

    /// Save results as recommendations_<timestamp>.csv
    #[arg(long)]
    pub save: bool,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Args)]
pub struct BatchArgs {
    /// JSON array of user profiles
    pub profiles: PathBuf,

    /// Also bundle all batch outputs into a ZIP archive
    #[arg(long)]
    pub zip: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 命令列參數覆蓋 TOML 設定
    pub fn apply_overrides(&self, config: &mut toml_config::AppConfig) {
        if let Some(data) = &self.data {
            config.paths.data_path = data.clone();
        }
        if let Some(output) = &self.output {
            config.paths.output_dir = output.clone();
        }
        if let Some(log_dir) = &self.log_dir {
            config.paths.log_dir = log_dir.clone();
        }
        if self.no_log_file {
            config.logging.to_file = false;
        }
        if self.json_logs {
            config.logging.json = true;
        }
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;
    use crate::domain::model::Gender;

    #[test]
    fn test_parse_filter_command() {
        let cli = CliConfig::parse_from([
            "animal-recommender",
            "--data",
            "dogs.csv",
            "filter",
            "--region",
            "서울,경기",
            "--gender",
            "female",
            "--max-age",
            "5",
            "--save",
        ]);

        match &cli.command {
            Command::Filter(args) => {
                assert_eq!(args.region, vec!["서울", "경기"]);
                assert_eq!(args.gender, vec![Gender::Female]);
                assert_eq!(args.max_age, Some(5.0));
                assert!(args.save);
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let mut config = toml_config::AppConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.paths.data_path, "dogs.csv");
        assert_eq!(config.paths.output_dir, "results");
    }

    #[test]
    fn test_filter_flags_override_json_criteria() {
        let base = crate::domain::criteria::FilterCriteria::from_json_str(
            r#"{"region": "부산", "neutered": true, "hashtags": ["순둥이"]}"#,
        )
        .unwrap();
        let args = FilterArgs {
            region: vec!["서울".to_string()],
            min_weight: Some(5.0),
            ..Default::default()
        };

        let merged = args.merge_into(base);
        assert_eq!(merged.region, Some(vec!["서울".to_string()]));
        assert_eq!(merged.neutered, Some(true));
        assert_eq!(merged.hashtags, Some(vec!["순둥이".to_string()]));
        let weight = merged.weight_range.unwrap();
        assert_eq!(weight.min, Some(5.0));
        assert_eq!(weight.max, None);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = CliConfig::parse_from(["animal-recommender", "stats", "--verbose", "--no-log-file"]);
        assert!(cli.verbose);

        let mut config = toml_config::AppConfig::default();
        cli.apply_overrides(&mut config);
        assert!(config.log_dir().is_none());
    }
}
