use super::decode::decode_reply;
use super::error::ChainError;
use super::gemini::GeminiClient;
use super::transport::{HttpRequest, HttpResponse, Transport};
use crate::config::{ApiParams, Config};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Результат одной отправки: текст ответа или типизированная ошибка
pub type CallResult = Result<String, ChainError>;

/// Оценка прогрева модели, если 503 пришёл без `estimated_time`
const DEFAULT_WAIT_SECS: u64 = 20;

/// Состояние сессии: курсоры модели и прокси живут между отправками
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: String,
    pub model_index: usize,
    pub proxy_index: usize,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            model_index: 0,
            proxy_index: 0,
        }
    }
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a, P: Serialize> {
    inputs: &'a str,
    parameters: P,
}

#[derive(Debug, Serialize)]
struct RelayParams {
    max_length: u32,
}

#[derive(Debug, Deserialize)]
struct LoadingResponse {
    estimated_time: Option<f64>,
}

/// Клиент Hugging Face Inference API с цепочкой запасных способов:
/// прямой вызов → CORS-прокси → следующая модель через прокси → Gemini (если есть ключ)
pub struct HuggingFaceClient {
    hf_token: Option<String>,
    models: Vec<String>,
    cors_proxies: Vec<String>,
    api_params: ApiParams,
    relay_max_length: u32,
    relay_timeout: Duration,
    gemini: Option<GeminiClient>,
    transport: Arc<dyn Transport>,
}

impl HuggingFaceClient {
    pub fn new(config: &Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            hf_token: config.hf_token.clone(),
            models: config.models.clone(),
            cors_proxies: config.cors_proxies.clone(),
            api_params: config.api_params.clone(),
            relay_max_length: config.relay_max_length,
            relay_timeout: config.relay_timeout,
            gemini: config.gemini_api_key.as_ref().map(|key| {
                GeminiClient::new(key.clone(), config.gemini_url.clone(), Arc::clone(&transport))
            }),
            transport,
        }
    }

    /// Пробует все способы по порядку и возвращается на первом успехе
    pub async fn get_response(&self, message: &str, session: &mut SessionState) -> CallResult {
        log::debug!("➡️ Прямой вызов API");
        match self.call_direct(message, session).await {
            Ok(reply) => return Ok(reply),
            Err(e) => log::warn!("⚠️ Прямой вызов не удался: {}", e),
        }

        log::debug!("➡️ Пробуем CORS-прокси");
        match self.call_with_proxies(message, session).await {
            Ok(reply) => return Ok(reply),
            Err(e) => log::warn!("⚠️ Прокси не помогли: {}", e),
        }

        log::debug!("➡️ Пробуем другую модель");
        match self.call_different_model(message, session).await {
            Ok(reply) => return Ok(reply),
            Err(e) => log::warn!("⚠️ Другая модель тоже недоступна: {}", e),
        }

        if let Some(gemini) = &self.gemini {
            log::debug!("➡️ Пробуем Gemini");
            match gemini.get_response(message).await {
                Ok(reply) => return Ok(reply),
                Err(e) => log::warn!("⚠️ Gemini не ответил: {}", e),
            }
        }

        Err(ChainError::AllStrategiesExhausted)
    }

    fn current_model<'a>(&'a self, session: &SessionState) -> Result<&'a str, ChainError> {
        if self.models.is_empty() {
            return Err(ChainError::AllStrategiesExhausted);
        }
        Ok(&self.models[session.model_index % self.models.len()])
    }

    fn auth_headers(&self) -> Vec<(String, String)> {
        match &self.hf_token {
            Some(token) => vec![("Authorization".to_string(), format!("Bearer {}", token))],
            None => Vec::new(),
        }
    }

    async fn call_direct(&self, message: &str, session: &SessionState) -> CallResult {
        let url = self.current_model(session)?.to_string();
        let body = serde_json::to_value(InferenceRequest {
            inputs: message,
            parameters: &self.api_params,
        })
        .map_err(|e| ChainError::Network(e.to_string()))?;

        let response = self
            .transport
            .post_json(HttpRequest {
                url,
                headers: self.auth_headers(),
                body,
                timeout: None,
            })
            .await?;

        log::debug!("Прямой ответ API: {}", response.status);
        interpret_direct(&response)
    }

    async fn call_with_proxies(&self, message: &str, session: &mut SessionState) -> CallResult {
        let model_url = self.current_model(session)?.to_string();
        let count = self.cors_proxies.len();
        if count == 0 {
            return Err(ChainError::RelaysExhausted);
        }

        let body = serde_json::to_value(InferenceRequest {
            inputs: message,
            parameters: RelayParams {
                max_length: self.relay_max_length,
            },
        })
        .map_err(|e| ChainError::Network(e.to_string()))?;

        let mut headers = self.auth_headers();
        headers.push(("X-Requested-With".to_string(), "XMLHttpRequest".to_string()));

        // Начинаем с прокси, который сработал в прошлый раз
        let start = session.proxy_index % count;
        for offset in 0..count {
            let index = (start + offset) % count;
            let proxy = &self.cors_proxies[index];
            log::debug!("Прокси {}: {}", index, proxy);

            let request = HttpRequest {
                url: relay_url(proxy, &model_url),
                headers: headers.clone(),
                body: body.clone(),
                timeout: Some(self.relay_timeout),
            };

            let response = match self.transport.post_json(request).await {
                Ok(response) => response,
                Err(e) => {
                    log::debug!("Прокси {} не ответил: {}", index, e);
                    continue;
                }
            };

            if !response.is_success() {
                log::debug!("Прокси {} вернул {}", index, response.status);
                continue;
            }

            match decode_reply(&response.body) {
                Ok((shape, reply)) => {
                    log::info!("✓ Ответ через прокси {} (формат {})", index, shape.as_str());
                    session.proxy_index = index;
                    return Ok(reply);
                }
                Err(e) => log::debug!("Прокси {}: {}", index, e),
            }
        }

        Err(ChainError::RelaysExhausted)
    }

    async fn call_different_model(&self, message: &str, session: &mut SessionState) -> CallResult {
        if self.models.is_empty() {
            return Err(ChainError::AllStrategiesExhausted);
        }
        session.model_index = (session.model_index + 1) % self.models.len();
        log::info!("🔁 Переключаемся на модель {}", session.model_index);

        self.call_with_proxies(message, session).await
    }
}

fn interpret_direct(response: &HttpResponse) -> CallResult {
    if response.is_success() {
        let (shape, reply) = decode_reply(&response.body)?;
        log::info!("✓ Прямой ответ API (формат {})", shape.as_str());
        return Ok(reply);
    }

    if response.status == 503 {
        let wait_secs = serde_json::from_str::<LoadingResponse>(&response.body)
            .ok()
            .and_then(|body| body.estimated_time)
            .map(|secs| secs.max(0.0).ceil() as u64)
            .unwrap_or(DEFAULT_WAIT_SECS);
        return Err(ChainError::ServiceUnavailable { wait_secs });
    }

    Err(ChainError::Http {
        status: response.status,
    })
}

/// `<прокси><percent-encoded URL модели>`
fn relay_url(proxy: &str, model_url: &str) -> String {
    format!("{}{}", proxy, urlencoding::encode(model_url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::error::TransportError;
    use crate::ai::transport::fake::ScriptedTransport;

    const OK_BODY: &str = r#"[{"generated_text":" Hello from the model "}]"#;

    fn client(transport: Arc<ScriptedTransport>) -> HuggingFaceClient {
        let mut config = Config::default();
        config.hf_token = Some("hf_test".to_string());
        HuggingFaceClient::new(&config, transport)
    }

    #[tokio::test]
    async fn direct_success_stops_the_chain() {
        let transport = Arc::new(ScriptedTransport::new().respond(200, OK_BODY));
        let mut session = SessionState::new();

        let result = client(transport.clone()).get_response("hi", &mut session).await;

        assert_eq!(result, Ok("Hello from the model".to_string()));
        assert_eq!(transport.request_count(), 1);
        let request = &transport.requests()[0];
        assert_eq!(request.url, Config::default().models[0]);
        assert_eq!(request.timeout, None);
        assert_eq!(request.body["inputs"], "hi");
        assert_eq!(request.body["parameters"]["max_length"], 150);
        assert_eq!(request.body["parameters"]["do_sample"], true);
        assert!(request
            .headers
            .contains(&("Authorization".to_string(), "Bearer hf_test".to_string())));
    }

    #[tokio::test]
    async fn stops_after_first_success_in_order() {
        // 1 прямой + 3 прокси + 3 прокси для следующей модели
        for failures in 0..7 {
            let transport = Arc::new(ScriptedTransport::new().fail_times(failures).respond(200, OK_BODY));
            let mut session = SessionState::new();

            let result = client(transport.clone()).get_response("hi", &mut session).await;

            assert!(result.is_ok(), "failures = {}", failures);
            assert_eq!(transport.request_count(), failures + 1, "failures = {}", failures);
        }
    }

    #[tokio::test]
    async fn all_strategies_failing_reports_exhaustion() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut session = SessionState::new();

        let result = client(transport.clone()).get_response("hi", &mut session).await;

        assert_eq!(result, Err(ChainError::AllStrategiesExhausted));
        assert_eq!(result.unwrap_err().to_string(), "All API methods failed");
        assert_eq!(transport.request_count(), 7);
        assert_eq!(session.model_index, 1);

        let models = Config::default().models;
        let requests = transport.requests();
        assert!(requests[1].url.ends_with(&*urlencoding::encode(&models[0])));
        assert!(requests[4].url.ends_with(&*urlencoding::encode(&models[1])));
    }

    #[tokio::test]
    async fn relay_requests_use_reduced_params_and_timeout() {
        let transport = Arc::new(ScriptedTransport::new().fail_times(1).respond(200, OK_BODY));
        let mut session = SessionState::new();

        client(transport.clone()).get_response("hi", &mut session).await.unwrap();

        let relay = &transport.requests()[1];
        assert_eq!(
            relay.url,
            "https://cors-anywhere.herokuapp.com/https%3A%2F%2Fapi-inference.huggingface.co%2Fmodels%2Fmicrosoft%2FDialoGPT-medium"
        );
        assert_eq!(relay.timeout, Some(Duration::from_secs(10)));
        assert_eq!(relay.body["parameters"], serde_json::json!({ "max_length": 100 }));
        assert!(relay
            .headers
            .contains(&("X-Requested-With".to_string(), "XMLHttpRequest".to_string())));
    }

    #[tokio::test]
    async fn working_proxy_is_remembered_and_tried_first() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .fail_times(2)
                .fail(TransportError::Timeout)
                .respond(200, OK_BODY),
        );
        let mut session = SessionState::new();
        let client = client(transport.clone());

        client.get_response("hi", &mut session).await.unwrap();
        assert_eq!(session.proxy_index, 2);

        // прямой вызов падает, сразу пробуем прокси 2
        let transport = Arc::new(ScriptedTransport::new().fail_times(1).respond(200, OK_BODY));
        let client = HuggingFaceClient::new(&Config::default(), transport.clone());
        client.get_response("hi", &mut session).await.unwrap();
        assert!(transport.requests()[1].url.starts_with("https://cors.bridged.cc/"));
    }

    #[tokio::test]
    async fn relay_with_undecodable_body_moves_on() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .fail_times(1)
                .respond(200, "<html>rate limited</html>")
                .respond(200, r#"{"generated_text":"second proxy"}"#),
        );
        let mut session = SessionState::new();

        let result = client(transport.clone()).get_response("hi", &mut session).await;

        assert_eq!(result, Ok("second proxy".to_string()));
        assert_eq!(session.proxy_index, 1);
    }

    #[tokio::test]
    async fn direct_503_reports_rounded_wait() {
        let transport = Arc::new(ScriptedTransport::new().respond(503, r#"{"error":"loading","estimated_time":12.3}"#));
        let session = SessionState::new();

        let err = client(transport).call_direct("hi", &session).await.unwrap_err();

        assert_eq!(err, ChainError::ServiceUnavailable { wait_secs: 13 });
        assert!(err.to_string().contains("13"));
    }

    #[test]
    fn direct_503_defaults_to_twenty_seconds() {
        for body in ["{}", "Service Unavailable"] {
            let err = interpret_direct(&HttpResponse {
                status: 503,
                body: body.to_string(),
            })
            .unwrap_err();
            assert!(err.to_string().contains("20"), "body = {}", body);
        }
    }

    #[test]
    fn other_statuses_report_code() {
        let err = interpret_direct(&HttpResponse {
            status: 401,
            body: String::new(),
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "API: 401");
    }

    #[tokio::test]
    async fn network_failure_carries_message() {
        let transport = Arc::new(ScriptedTransport::new().fail(TransportError::Connection("connection refused".to_string())));
        let session = SessionState::new();

        let err = client(transport).call_direct("hi", &session).await.unwrap_err();

        assert_eq!(err.to_string(), "connection refused");
    }

    #[tokio::test]
    async fn gemini_runs_last_when_key_is_configured() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .fail_times(7)
                .respond(200, r#"{"candidates":[{"content":{"parts":[{"text":"gemini says hi"}]}}]}"#),
        );
        let mut config = Config::default();
        config.gemini_api_key = Some("gm-key".to_string());
        let mut session = SessionState::new();

        let result = HuggingFaceClient::new(&config, transport.clone())
            .get_response("hi", &mut session)
            .await;

        assert_eq!(result, Ok("gemini says hi".to_string()));
        assert_eq!(transport.request_count(), 8);
        assert!(transport.requests()[7].url.ends_with("generateContent?key=gm-key"));
    }

    #[tokio::test]
    async fn gemini_failure_still_reports_exhaustion() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut config = Config::default();
        config.gemini_api_key = Some("gm-key".to_string());
        let mut session = SessionState::new();

        let result = HuggingFaceClient::new(&config, transport.clone())
            .get_response("hi", &mut session)
            .await;

        assert_eq!(result, Err(ChainError::AllStrategiesExhausted));
        assert_eq!(transport.request_count(), 8);
    }

    #[tokio::test]
    async fn no_proxies_means_relay_step_fails_fast() {
        let transport = Arc::new(ScriptedTransport::new().respond(500, ""));
        let mut config = Config::default();
        config.cors_proxies.clear();
        let mut session = SessionState::new();

        let result = HuggingFaceClient::new(&config, transport.clone())
            .get_response("hi", &mut session)
            .await;

        assert_eq!(result, Err(ChainError::AllStrategiesExhausted));
        assert_eq!(transport.request_count(), 1);
    }
}
