//! Поверхность чата: агент рисует только через неё и не трогает терминал напрямую
pub mod terminal;

pub use terminal::TerminalSurface;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    User,
    Bot,
    /// Временный индикатор "бот думает"
    Typing,
    /// Служебная заметка об ошибке API
    Error,
}

pub trait ChatSurface: Send + Sync {
    fn render_message(&self, kind: MessageKind, text: &str);

    /// Убирает индикатор `Typing`, если он показан
    fn remove_indicator(&self);

    fn set_input_enabled(&self, enabled: bool);

    fn set_status(&self, status: &str);

    fn focus_input(&self);
}
