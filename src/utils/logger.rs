use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const LOG_FILE_NAME: &str = "system.log";

fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("animal_recommender=debug,info"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("animal_recommender=info"))
    }
}

/// 初始化 CLI 日誌：終端輸出，並可選擇附加寫入 `<log_dir>/system.log`
pub fn init_cli_logger(verbose: bool, json: bool, log_dir: Option<&Path>) {
    let compact_layer = (!json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_filter(env_filter(verbose))
    });

    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .json()
            .with_filter(env_filter(verbose))
    });

    // 檔案日誌失敗時僅退回終端輸出
    let file_layer = log_dir.and_then(|dir| match open_log_file(dir) {
        Ok(file) => Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(file))
                .with_filter(LevelFilter::DEBUG),
        ),
        Err(e) => {
            eprintln!("⚠️ Could not open log file in {}: {}", dir.display(), e);
            None
        }
    });

    tracing_subscriber::registry()
        .with(compact_layer)
        .with(json_layer)
        .with(file_layer)
        .init();
}

fn open_log_file(dir: &Path) -> std::io::Result<fs::File> {
    fs::create_dir_all(dir)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_log_file_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join("logs");

        open_log_file(&log_dir).unwrap();

        assert!(log_dir.join(LOG_FILE_NAME).exists());
    }
}
