pub mod agent;
pub mod chat_loop;

pub use agent::ChatAgent;
