use super::agent::{AgentState, ChatAgent, SubmitOutcome};
use crate::ui::{ChatSurface, MessageKind};
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;

const QUIT_COMMANDS: [&str; 2] = ["/quit", "/exit"];

fn busy_note(line: &str) -> String {
    format!("Still waiting for the previous reply, \"{}\" was ignored.", line)
}

/// Главный цикл чата. Строки читаются и во время отправки: пока агент занят,
/// новые сообщения отклоняются с заметкой в чате.
/// Конец потока строк дожидается текущего ответа, `/quit` отменяет его.
pub async fn run(agent: Arc<ChatAgent>, surface: Arc<dyn ChatSurface>, mut lines: Receiver<String>) {
    let mut in_flight: Option<JoinHandle<SubmitOutcome>> = None;
    let mut quit = false;

    while let Some(line) = lines.recv().await {
        let line = line.trim();
        if QUIT_COMMANDS.contains(&line) {
            quit = true;
            break;
        }

        match agent.try_begin(line) {
            Ok(message) => {
                let agent = Arc::clone(&agent);
                in_flight = Some(tokio::spawn(async move { agent.complete(message).await }));
            }
            Err(SubmitOutcome::Busy) => surface.render_message(MessageKind::Error, &busy_note(line)),
            Err(_) => {
                if agent.state() == AgentState::Idle {
                    surface.focus_input();
                }
            }
        }
    }

    if let Some(task) = in_flight {
        if quit && !task.is_finished() {
            log::info!("🛑 Выход во время отправки, запрос отменён");
            task.abort();
        }
        match task.await {
            Ok(_) => {}
            // отменена до первого опроса: SendGuard не успел появиться
            Err(e) if e.is_cancelled() => {
                if agent.state() == AgentState::Sending {
                    agent.finish_send();
                }
            }
            Err(e) => log::error!("❌ Отправка завершилась аварийно: {}", e),
        }
    }
}
