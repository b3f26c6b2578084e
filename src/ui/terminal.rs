//! Вывод чата в терминал: строки с префиксами, индикатор "думает" и приглашение ввода
use super::{ChatSurface, MessageKind};
use std::io::Write;
use std::sync::Mutex;

/// Стирает текущую строку терминала
const CLEAR_LINE: &str = "\r\x1b[2K";

pub struct TerminalSurface {
    bot_name: String,
    indicator_shown: Mutex<bool>,
}

impl TerminalSurface {
    pub fn new(bot_name: &str) -> Self {
        Self {
            bot_name: bot_name.to_string(),
            indicator_shown: Mutex::new(false),
        }
    }

    fn write(&self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }

    fn set_indicator(&self, shown: bool) -> bool {
        let mut flag = self.indicator_shown.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *flag, shown)
    }
}

impl ChatSurface for TerminalSurface {
    fn render_message(&self, kind: MessageKind, text: &str) {
        match kind {
            MessageKind::User => self.write(&format!("You: {}\n", text)),
            MessageKind::Bot => self.write(&format!("{}: {}\n", self.bot_name, text)),
            MessageKind::Error => self.write(&format!("Note: {}\n", text)),
            MessageKind::Typing => {
                // Без перевода строки, чтобы потом стереть
                self.set_indicator(true);
                self.write(&format!("{}: {}", self.bot_name, text));
            }
        }
    }

    fn remove_indicator(&self) {
        if self.set_indicator(false) {
            self.write(CLEAR_LINE);
        }
    }

    fn set_input_enabled(&self, enabled: bool) {
        log::debug!("Ввод {}", if enabled { "включен" } else { "выключен" });
    }

    fn set_status(&self, status: &str) {
        log::info!("📊 {}", status);
    }

    fn focus_input(&self) {
        self.write("> ");
    }
}
