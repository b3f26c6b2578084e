use crate::ai::local::RandomSource;
use crate::ai::transport::Transport;
use crate::ai::{HuggingFaceClient, LocalAI, SessionState};
use crate::config::Config;
use crate::ui::{ChatSurface, MessageKind};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;
use tokio::task::AbortHandle;

const THINKING_TEXT: &str = "Bot is thinking...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Idle,
    Sending,
    RenderingSuccess,
    RenderingFallback,
}

/// Чем закончилась попытка отправки
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Пустой ввод
    Ignored,
    /// Предыдущая отправка ещё не завершена
    Busy,
    Replied { reply: String },
    FellBack { note: String, reply: String },
}

/// Оркестратор: ввод → цепочка API → при неудаче локальные правила → отрисовка
pub struct ChatAgent {
    client: Arc<HuggingFaceClient>,
    session: Arc<Mutex<SessionState>>,
    local_ai: StdMutex<LocalAI>,
    state: StdMutex<AgentState>,
    surface: Arc<dyn ChatSurface>,
}

impl ChatAgent {
    pub fn new(
        config: &Config,
        transport: Arc<dyn Transport>,
        random: Box<dyn RandomSource>,
        surface: Arc<dyn ChatSurface>,
    ) -> Self {
        let session = SessionState::new();
        log::info!("📍 Session ID: {}", session.session_id);

        Self {
            client: Arc::new(HuggingFaceClient::new(config, transport)),
            session: Arc::new(Mutex::new(session)),
            local_ai: StdMutex::new(LocalAI::new(config.fallback_responses.clone(), random)),
            state: StdMutex::new(AgentState::Idle),
            surface,
        }
    }

    pub fn state(&self) -> AgentState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, next: AgentState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        log::debug!("Состояние: {:?} → {:?}", *state, next);
        *state = next;
    }

    /// Idle → Sending атомарно; `false`, если отправка уже идёт
    fn begin_send(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state != AgentState::Idle {
            return false;
        }
        *state = AgentState::Sending;
        true
    }

    /// Обрабатывает одно отправленное сообщение от начала до конца
    #[allow(dead_code)]
    pub async fn submit(&self, input: &str) -> SubmitOutcome {
        match self.try_begin(input) {
            Ok(message) => self.complete(message).await,
            Err(outcome) => outcome,
        }
    }

    /// Синхронная часть отправки: проверка ввода, захват Idle → Sending,
    /// сообщение пользователя и индикатор. `Err` значит, что отправки не будет.
    pub fn try_begin(&self, input: &str) -> Result<String, SubmitOutcome> {
        let message = input.trim();
        if message.is_empty() {
            return Err(SubmitOutcome::Ignored);
        }

        if !self.begin_send() {
            log::warn!("⏳ Отправка уже идёт, новое сообщение проигнорировано");
            return Err(SubmitOutcome::Busy);
        }

        self.surface.render_message(MessageKind::User, message);
        self.surface.set_input_enabled(false);
        self.surface.set_status("Connecting to AI...");
        self.surface.render_message(MessageKind::Typing, THINKING_TEXT);
        Ok(message.to_string())
    }

    /// Запускает цепочку для сообщения, принятого `try_begin`, и рисует итог.
    /// Если future бросят на полпути, `SendGuard` всё равно вернёт агента в Idle.
    pub async fn complete(&self, message: String) -> SubmitOutcome {
        let mut guard = SendGuard {
            agent: self,
            task: None,
        };

        // Цепочка в отдельной задаче: паника внутри не оставит агента в Sending
        let client = Arc::clone(&self.client);
        let session = Arc::clone(&self.session);
        let owned_message = message.clone();
        let handle = tokio::spawn(async move {
            let mut session = session.lock().await;
            client.get_response(&owned_message, &mut session).await
        });
        guard.task = Some(handle.abort_handle());
        let joined = handle.await;

        self.surface.remove_indicator();

        match joined {
            Ok(Ok(reply)) => {
                self.set_state(AgentState::RenderingSuccess);
                log::info!("✓ Ответ API получен");
                self.surface.render_message(MessageKind::Bot, &reply);
                self.surface.set_status("AI response generated");
                SubmitOutcome::Replied { reply }
            }
            Ok(Err(e)) => {
                self.set_state(AgentState::RenderingFallback);
                log::warn!("⚠️ API недоступен: {}", e);
                self.render_fallback(&message, format!("API Error: {}", e), "Using smart response")
            }
            Err(e) => {
                self.set_state(AgentState::RenderingFallback);
                log::error!("❌ Задача запроса завершилась аварийно: {}", e);
                self.render_fallback(&message, format!("Connection Error: {}", e), "Using fallback response")
            }
        }
    }

    /// Возвращает ввод и Idle. Если ответа так и не дождались, убирает индикатор.
    pub fn finish_send(&self) {
        if self.state() == AgentState::Sending {
            log::warn!("⚠️ Отправка отменена до ответа");
            self.surface.remove_indicator();
        }
        self.surface.set_input_enabled(true);
        self.surface.focus_input();
        self.set_state(AgentState::Idle);
    }

    fn render_fallback(&self, message: &str, note: String, status: &str) -> SubmitOutcome {
        let reply = self
            .local_ai
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_response(message);

        self.surface.render_message(MessageKind::Error, &note);
        self.surface.render_message(MessageKind::Bot, &reply);
        self.surface.set_status(status);
        SubmitOutcome::FellBack { note, reply }
    }
}

/// Возвращает ввод и состояние Idle при любом выходе из `complete`
struct SendGuard<'a> {
    agent: &'a ChatAgent,
    task: Option<AbortHandle>,
}

impl Drop for SendGuard<'_> {
    fn drop(&mut self) {
        if self.agent.state() == AgentState::Sending {
            if let Some(task) = &self.task {
                task.abort();
            }
        }
        self.agent.finish_send();
    }
}
