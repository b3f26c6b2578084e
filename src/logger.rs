/// Модуль для инициализации логирования
/// Пишет в файл logs/hfchat.log, чтобы не мешать диалогу в терминале

use anyhow::{Context, Result};
use log::LevelFilter;
use std::io::Write;

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "logs/hfchat.log";

pub fn init() -> Result<()> {
    let mut builder = env_logger::Builder::new();

    // Читаем RUST_LOG переменную если она установлена
    if let Ok(log_level) = std::env::var("RUST_LOG") {
        builder.parse_filters(&log_level);
    } else {
        builder.filter_level(LevelFilter::Info);
        // HTTP-стек слишком многословен
        builder.filter_module("reqwest", LevelFilter::Warn);
        builder.filter_module("hyper", LevelFilter::Warn);
        builder.filter_module("hyper_util", LevelFilter::Warn);
    }

    // Формат логов: [HH:MM:SS LEVEL] модуль - сообщение
    builder.format(|buf, record| {
        let now = chrono::Local::now().format("%H:%M:%S");
        writeln!(
            buf,
            "[{} {}] {} - {}",
            now,
            record.level(),
            record.target(),
            record.args()
        )
    });

    std::fs::create_dir_all(LOG_DIR)
        .with_context(|| format!("не удалось создать директорию {}", LOG_DIR))?;

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(LOG_FILE)
        .with_context(|| format!("не удалось открыть файл логов {}", LOG_FILE))?;

    builder
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()
        .context("логгер уже инициализирован")?;

    log::info!("Логирование инициализировано ✓");
    Ok(())
}
