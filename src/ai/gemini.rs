use super::decode::decode_reply;
use super::error::ChainError;
use super::huggingface::CallResult;
use super::transport::{HttpRequest, HttpResponse, Transport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_GEMINI_URL: &str =
    "https://generativelanguage.googleapis.com/v1/models/gemini-pro:generateContent";

const PROMPT_PREFIX: &str =
    "You are a helpful and friendly AI assistant. Respond to this message conversationally: ";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Клиент Google Gemini: последний шаг цепочки, если задан ключ
pub struct GeminiClient {
    api_key: String,
    url: String,
    transport: Arc<dyn Transport>,
}

impl GeminiClient {
    pub fn new(api_key: String, url: String, transport: Arc<dyn Transport>) -> Self {
        Self {
            api_key,
            url,
            transport,
        }
    }

    fn build_request(message: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: format!("{}{}", PROMPT_PREFIX, message),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.7,
                top_k: 40,
                top_p: 0.95,
                max_output_tokens: 500,
            },
            safety_settings: vec![
                SafetySetting {
                    category: "HARM_CATEGORY_HARASSMENT",
                    threshold: "BLOCK_MEDIUM_AND_ABOVE",
                },
                SafetySetting {
                    category: "HARM_CATEGORY_HATE_SPEECH",
                    threshold: "BLOCK_MEDIUM_AND_ABOVE",
                },
            ],
        }
    }

    pub async fn get_response(&self, message: &str) -> CallResult {
        let body = serde_json::to_value(Self::build_request(message))
            .map_err(|e| ChainError::Network(e.to_string()))?;

        // Ключ передаётся в query, заголовка авторизации нет
        let response = self
            .transport
            .post_json(HttpRequest {
                url: format!("{}?key={}", self.url, urlencoding::encode(&self.api_key)),
                headers: Vec::new(),
                body,
                timeout: None,
            })
            .await?;

        log::debug!("Ответ Gemini: {}", response.status);
        if !response.is_success() {
            return Err(ChainError::Api(error_message(&response)));
        }

        let (shape, reply) = decode_reply(&response.body)?;
        log::info!("✓ Ответ Gemini (формат {})", shape.as_str());
        Ok(reply)
    }
}

/// `error.message` из тела, иначе само тело, иначе код статуса
fn error_message(response: &HttpResponse) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&response.body) {
        return envelope.error.message;
    }
    let body = response.body.trim();
    if body.is_empty() {
        format!("HTTP {}", response.status)
    } else {
        body.to_string()
    }
}
