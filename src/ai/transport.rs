use super::error::TransportError;
use async_trait::async_trait;
use std::time::Duration;

/// Один POST-запрос с JSON-телом
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
    /// `None` — используем таймаут транспорта по умолчанию
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Сетевой шов цепочки: в бою reqwest, в тестах — сценарный фейк
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Connection(err.to_string())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post_json(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.http_client.post(&request.url).json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_reqwest_error)?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tokio::sync::Semaphore;

    /// Отдаёт заранее заданные ответы по очереди и записывает все запросы.
    /// Когда очередь пуста, каждый запрос падает с ошибкой соединения.
    #[derive(Default)]
    pub struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
        requests: Mutex<Vec<HttpRequest>>,
        hold: Option<Arc<Semaphore>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Каждый запрос забирает разрешение у семафора перед ответом
        pub fn held(hold: Arc<Semaphore>) -> Self {
            Self {
                hold: Some(hold),
                ..Self::default()
            }
        }

        pub fn respond(self, status: u16, body: &str) -> Self {
            self.push(Ok(HttpResponse {
                status,
                body: body.to_string(),
            }))
        }

        pub fn fail(self, err: TransportError) -> Self {
            self.push(Err(err))
        }

        /// `n` неуспешных ответов подряд (500)
        pub fn fail_times(mut self, n: usize) -> Self {
            for _ in 0..n {
                self = self.respond(500, "");
            }
            self
        }

        fn push(self, outcome: Result<HttpResponse, TransportError>) -> Self {
            self.responses.lock().unwrap().push_back(outcome);
            self
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn post_json(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.requests.lock().unwrap().push(request);
            if let Some(hold) = &self.hold {
                if let Ok(permit) = hold.acquire().await {
                    permit.forget();
                }
            }
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Connection("no scripted response".to_string())))
        }
    }
}
