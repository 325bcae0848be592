use animal_recommender::app::pipelines::preprocess_pipeline::{METADATA_FILE_NAME, PROCESSED_FILE_NAME};
use animal_recommender::domain::criteria::{FilterCriteria, Preferences, UserProfile};
use animal_recommender::{
    AppConfig, BatchProcessor, EtlEngine, LocalStorage, PreprocessPipeline, RecommendationSystem,
};
use anyhow::{Context, Result};
use chrono::Datelike;
use std::io::Read;
use tempfile::TempDir;

/// 出生年份相對於今年，讓年齡固定
fn shelter_csv() -> String {
    let year = chrono::Local::now().year();
    format!(
        "\u{feff}상세링크,이름,현 상황,임보종류,구조 지역,성별,중성화 여부,출생시기,몸무게,해시태그,임보조건_지역,참고용정보_짖음,참고용정보_스킨십
https://pimfyvirus.com/dog/201/,몽이,임보가능,일반임보,서울,남아,중성화 완료,{}년생,6kg,\"#애교쟁이, #사람좋아\",서울,2,5
https://pimfyvirus.com/dog/202/,해피,임보가능,단기임보,부산,여아,미완료,{}년생,18kg,#순둥이,전국,4,3
https://pimfyvirus.com/dog/203/,별이,임보가능,일반임보,대구,여아,완료,{}년 추정,3.5kg,#활발,대구,3,4
https://pimfyvirus.com/dog/204/,복실,입양완료,입양전제,서울,남아,완료,{}년생,10kg,,서울,1,5
",
        year - 2,
        year - 7,
        year - 1,
        year - 3
    )
}

struct Fixture {
    _dir: TempDir,
    output_dir: String,
    config: AppConfig,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let data_path = dir.path().join("dogs.csv");
    std::fs::write(&data_path, shelter_csv()).unwrap();

    let output_dir = dir.path().join("results").to_str().unwrap().to_string();
    let mut config = AppConfig::default();
    config.paths.data_path = data_path.to_str().unwrap().to_string();
    config.paths.output_dir = output_dir.clone();

    Fixture {
        _dir: dir,
        output_dir,
        config,
    }
}

#[tokio::test]
async fn test_end_to_end_preprocess() -> Result<()> {
    let fixture = fixture();
    let storage = LocalStorage::new(fixture.output_dir.clone());
    let pipeline = PreprocessPipeline::new(storage, fixture.config.clone());

    let engine = EtlEngine::new_with_monitoring(pipeline, false);
    let output_path = engine.run().await?;
    assert!(output_path.ends_with(PROCESSED_FILE_NAME));

    let processed = std::fs::read_to_string(&output_path)?;
    assert_eq!(processed.lines().count(), 5);
    assert!(processed.contains("애교쟁이|사람좋아"));

    let metadata_path = std::path::Path::new(&fixture.output_dir).join(METADATA_FILE_NAME);
    let metadata: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(metadata_path)?)?;
    assert_eq!(metadata["regions"], serde_json::json!(["서울", "부산", "대구"]));
    assert_eq!(metadata["genders"], serde_json::json!(["male", "female"]));
    Ok(())
}

#[tokio::test]
async fn test_filter_and_recommend_from_csv() -> Result<()> {
    let fixture = fixture();
    let storage = LocalStorage::new(fixture.output_dir.clone());
    let system = RecommendationSystem::load(fixture.config.clone(), storage, false).await?;

    assert_eq!(system.animals().len(), 4);
    let stats = system.statistics();
    assert_eq!(stats.total, 4);
    assert_eq!(stats.available, 3);

    // 해피 可全國臨時保護；복실 已被領養
    let seoul = FilterCriteria::from_json_str(r#"{"region": "서울"}"#)?;
    let names: Vec<String> = system
        .hard_filter(&seoul)
        .into_iter()
        .map(|r| r.animal.name)
        .collect();
    assert_eq!(names, vec!["몽이", "해피"]);

    let not_neutered = FilterCriteria::from_json_str(r#"{"neutered": false}"#)?;
    assert_eq!(system.hard_filter(&not_neutered).len(), 1);

    let preferences = Preferences::from_json_str(
        r#"{
            "age_preference": {"preferred": {"min": 1, "max": 3}, "acceptable": {"min": 0, "max": 5}},
            "personality_traits": ["애교"],
            "behavior_preferences": {"barking": {"ideal": 2, "acceptable": [1, 2, 3]}}
        }"#,
    )?;
    let results = system.recommend(&preferences, None);

    assert_eq!(results[0].animal.name, "몽이");
    assert_eq!(results[0].match_score, Some(1.0));
    assert!(results.iter().all(|r| r.animal.name != "해피"));

    let saved = system
        .save_results(&results, "recommendations")
        .await?
        .context("recommendations were not saved")?;
    let content = std::fs::read_to_string(saved)?;
    assert!(content.starts_with("id,name,gender,age,weight"));
    assert!(content.contains("201,몽이,male,2,6.0"));
    Ok(())
}

#[tokio::test]
async fn test_batch_profiles_with_archive() -> Result<()> {
    let fixture = fixture();
    let storage = LocalStorage::new(fixture.output_dir.clone());
    let system = RecommendationSystem::load(fixture.config.clone(), storage, false).await?;

    let profiles = UserProfile::list_from_json_str(
        r#"[
            {
                "user_id": "quiet_home",
                "hard_filters": {"gender": "female"},
                "preferences": {"behavior_preferences": {"barking": {"ideal": 3, "acceptable": [2, 3, 4]}}}
            },
            {"hard_filters": {"region": ["대구"]}},
            {"preferences": {"region": ["부산"]}}
        ]"#,
    )?;

    let report = BatchProcessor::new(&system)
        .with_compression(true)
        .run(&profiles)
        .await?;

    assert_eq!(report.summaries.len(), 2);
    assert_eq!(report.summaries[0].user_id, "quiet_home");
    assert_eq!(report.summaries[0].hard_filter_count, 2);
    assert_eq!(report.summaries[0].top_matches[0].name, "별이");
    assert_eq!(report.summaries[1].user_id, "user_3");
    assert_eq!(report.summaries[1].recommendation_count, 1);

    let archive_path = report.archive_location.context("archive was not written")?;
    assert!(archive_path.contains("batch_results_"));
    let mut archive = zip::ZipArchive::new(std::fs::File::open(archive_path)?)?;
    assert_eq!(archive.len(), 3);

    let summary_name = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .find(|name| name.starts_with("batch_summary_"))
        .context("summary missing from archive")?;
    let mut summary = String::new();
    archive.by_name(&summary_name)?.read_to_string(&mut summary)?;
    assert!(summary.contains("quiet_home"));
    Ok(())
}
