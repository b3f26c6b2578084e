// Модули приложения
mod ai;
mod config;
mod core;
mod logger;
mod ui;

use crate::ai::local::RandomSource;
use crate::ai::{ReqwestTransport, SeededRandom, ThreadRandom};
use crate::core::{chat_loop, ChatAgent};
use crate::ui::{ChatSurface, MessageKind, TerminalSurface};
use anyhow::Result;
use config::Config;
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::mpsc;

const GREETING: &str = "Hi! Type a message and press Enter. /quit to exit.";

fn main() -> Result<()> {
    logger::init()?;
    log::info!("🚀 hfchat запущен");

    let config = Config::load()?;
    log::info!(
        "📁 Конфигурация загружена: моделей {}, прокси {}, правил {}",
        config.models.len(),
        config.cors_proxies.len(),
        config.fallback_responses.len()
    );
    if !config.is_token_configured() {
        log::warn!("⚠️ HF_TOKEN не задан, запросы пойдут без авторизации");
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config))
}

async fn run(config: Config) -> Result<()> {
    let random: Box<dyn RandomSource> = match config.random_seed {
        Some(seed) => {
            log::info!("🎲 Фиксированное зерно шаблонов: {}", seed);
            Box::new(SeededRandom::new(seed))
        }
        None => Box::new(ThreadRandom),
    };

    let surface = Arc::new(TerminalSurface::new(&config.bot_name));
    let agent = Arc::new(ChatAgent::new(
        &config,
        Arc::new(ReqwestTransport::new()),
        random,
        surface.clone(),
    ));

    surface.render_message(MessageKind::Bot, GREETING);
    surface.focus_input();

    chat_loop::run(agent, surface, spawn_stdin_reader()).await;

    log::info!("👋 hfchat завершён");
    Ok(())
}

/// Читает stdin в отдельном потоке, чтобы строки принимались и во время отправки
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::error!("❌ Ошибка чтения stdin: {}", e);
                    break;
                }
            }
        }
    });
    rx
}
