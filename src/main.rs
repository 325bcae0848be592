use animal_recommender::config::{BatchArgs, FilterArgs, RecommendArgs};
use animal_recommender::core::filter::result_stats;
use animal_recommender::domain::criteria::{sample_profiles, FilterCriteria, Preferences, UserProfile};
use animal_recommender::utils::error::AppError;
use animal_recommender::utils::{logger, validation::Validate};
use animal_recommender::{
    app::report, AppConfig, BatchProcessor, CliConfig, Command, EtlEngine, InteractiveSession,
    LocalStorage, PreprocessPipeline, RecommendationSystem,
};
use clap::Parser;
use std::path::Path;

type System = RecommendationSystem<LocalStorage>;

async fn read_json_file(path: &Path) -> Result<String, AppError> {
    tracing::debug!("Reading {}", path.display());
    Ok(tokio::fs::read_to_string(path).await?)
}

async fn run_filter(system: &System, args: &FilterArgs) -> Result<(), AppError> {
    let base = match &args.criteria {
        Some(path) => FilterCriteria::from_json_str(&read_json_file(path).await?)?,
        None => FilterCriteria::default(),
    };
    let criteria = args.merge_into(base);
    tracing::debug!("Filter criteria: {:?}", criteria);

    let results = system.hard_filter(&criteria);
    if results.is_empty() {
        println!("😔 No animals match these criteria");
        return Ok(());
    }

    println!("{}", system.render_results(&results, None));
    println!("{}", report::render_result_stats(&result_stats(&results)));

    if args.save {
        if let Some(location) = system.save_results(&results, "filter_results").await? {
            println!("💾 Results saved to: {}", location);
        }
    }
    Ok(())
}

async fn run_recommend(system: &System, args: &RecommendArgs) -> Result<(), AppError> {
    if let Some(threshold) = args.threshold.filter(|t| !(0.0..=1.0).contains(t)) {
        return Err(AppError::validation(format!(
            "threshold must be between 0 and 1, got {}",
            threshold
        )));
    }
    let preferences = Preferences::from_json_str(&read_json_file(&args.preferences).await?)?;
    let results = system.recommend(&preferences, args.threshold);

    if results.is_empty() {
        println!("😔 No recommendations above the threshold");
        return Ok(());
    }

    println!("{}", system.render_results(&results, args.limit));

    if args.save {
        if let Some(location) = system.save_results(&results, "recommendations").await? {
            println!("💾 Results saved to: {}", location);
        }
    }
    Ok(())
}

async fn run_batch(system: &System, args: &BatchArgs) -> Result<(), AppError> {
    let profiles = UserProfile::list_from_json_str(&read_json_file(&args.profiles).await?)?;
    if profiles.is_empty() {
        return Err(AppError::validation(format!(
            "{} contains no user profiles",
            args.profiles.display()
        )));
    }
    let report = BatchProcessor::new(system)
        .with_compression(args.zip)
        .run(&profiles)
        .await?;

    for summary in &report.summaries {
        println!(
            "👤 {}: {} after hard filters, {} recommended",
            summary.user_id, summary.hard_filter_count, summary.recommendation_count
        );
    }
    println!("📁 Batch summary saved to: {}", report.summary_location);
    if let Some(archive) = &report.archive_location {
        println!("📦 Archive saved to: {}", archive);
    }
    Ok(())
}

async fn run(cli: &CliConfig, config: AppConfig) -> Result<(), AppError> {
    let storage = LocalStorage::new(config.paths.output_dir.clone());

    match &cli.command {
        Command::SampleProfiles { path } => {
            let json = serde_json::to_string_pretty(&sample_profiles())?;
            tokio::fs::write(path, json).await?;
            println!("📝 Sample profiles written to: {}", path.display());
            return Ok(());
        }
        Command::Preprocess => {
            let pipeline = PreprocessPipeline::new(storage, config);
            let engine = EtlEngine::new_with_monitoring(pipeline, cli.monitor);
            let output_path = engine.run().await?;
            println!("✅ Preprocessing completed successfully!");
            println!("📁 Output saved to: {}", output_path);
            return Ok(());
        }
        _ => {}
    }

    let system = RecommendationSystem::load(config, storage, cli.monitor).await?;

    match &cli.command {
        Command::Stats => print!("{}", system.summary_report()),
        Command::Filter(args) => run_filter(&system, args).await?,
        Command::Recommend(args) => run_recommend(&system, args).await?,
        Command::Batch(args) => run_batch(&system, args).await?,
        Command::Interactive => {
            let stdin = std::io::stdin();
            let mut session = InteractiveSession::new(&system, stdin.lock(), std::io::stdout());
            session.run().await?;
        }
        Command::SampleProfiles { .. } | Command::Preprocess => {}
    }
    Ok(())
}

fn exit_with(e: &AppError) -> ! {
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
    std::process::exit(e.exit_code().max(1))
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let mut config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };
    cli.apply_overrides(&mut config);

    // 初始化日誌
    logger::init_cli_logger(cli.verbose, config.logging.json, config.log_dir());

    tracing::info!("Starting animal-recommender");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        exit_with(&e);
    }

    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    if let Err(e) = run(&cli, config).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = e.exit_code();
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}
