use thiserror::Error;

/// Ошибки цепочки запросов. `Display` — это текст, который видит пользователь
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// 503: модель ещё прогревается, в ответе есть оценка ожидания
    #[error("Model loading ({wait_secs}s)")]
    ServiceUnavailable { wait_secs: u64 },

    #[error("API: {status}")]
    Http { status: u16 },

    #[error("{0}")]
    Network(String),

    /// Текст ошибки, который вернул сам API (`error.message`)
    #[error("{0}")]
    Api(String),

    #[error("Unexpected response format")]
    MalformedResponse,

    #[error("All proxies failed")]
    RelaysExhausted,

    #[error("All API methods failed")]
    AllStrategiesExhausted,
}

/// Ошибка транспортного уровня (соединение, таймаут, чтение тела)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("{0}")]
    Connection(String),
}

impl From<TransportError> for ChainError {
    fn from(err: TransportError) -> Self {
        ChainError::Network(err.to_string())
    }
}
