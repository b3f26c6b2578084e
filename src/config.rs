use crate::ai::gemini::DEFAULT_GEMINI_URL;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Параметры генерации, которые уходят в `parameters` прямого запроса
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiParams {
    pub max_length: u32,
    pub temperature: f32,
    pub do_sample: bool,
    pub return_full_text: bool,
}

impl Default for ApiParams {
    fn default() -> Self {
        Self {
            max_length: 150,
            temperature: 0.9,
            do_sample: true,
            return_full_text: false,
        }
    }
}

/// Одно правило запасного ответа: фраза-триггер и готовый ответ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackRule {
    pub trigger: String,
    pub reply: String,
}

impl FallbackRule {
    fn new(trigger: &str, reply: &str) -> Self {
        Self {
            trigger: trigger.to_string(),
            reply: reply.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub hf_token: Option<String>,
    pub models: Vec<String>,
    pub cors_proxies: Vec<String>,
    pub api_params: ApiParams,
    /// `max_length` для запросов через прокси (урезанный набор параметров)
    pub relay_max_length: u32,
    pub relay_timeout: Duration,
    pub fallback_responses: Vec<FallbackRule>,
    /// Без ключа шаг Gemini пропускается
    pub gemini_api_key: Option<String>,
    pub gemini_url: String,
    pub bot_name: String,
    /// Фиксированное зерно для шаблонных ответов (воспроизводимые сессии)
    pub random_seed: Option<u64>,
}

/// Необязательный JSON-файл конфигурации, все поля опциональны
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    hf_token: Option<String>,
    models: Option<Vec<String>>,
    cors_proxies: Option<Vec<String>>,
    api_params: Option<ApiParams>,
    relay_max_length: Option<u32>,
    relay_timeout_secs: Option<u64>,
    fallback_responses: Option<Vec<FallbackRule>>,
    gemini_api_key: Option<String>,
    gemini_url: Option<String>,
    bot_name: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hf_token: None,
            models: vec![
                "https://api-inference.huggingface.co/models/microsoft/DialoGPT-medium".to_string(),
                "https://api-inference.huggingface.co/models/microsoft/DialoGPT-small".to_string(),
                "https://api-inference.huggingface.co/models/facebook/blenderbot-400M-distill"
                    .to_string(),
            ],
            cors_proxies: vec![
                "https://cors-anywhere.herokuapp.com/".to_string(),
                "https://api.allorigins.win/raw?url=".to_string(),
                "https://cors.bridged.cc/".to_string(),
            ],
            api_params: ApiParams::default(),
            relay_max_length: 100,
            relay_timeout: Duration::from_secs(10),
            fallback_responses: default_fallback_responses(),
            gemini_api_key: None,
            gemini_url: DEFAULT_GEMINI_URL.to_string(),
            bot_name: "Bot".to_string(),
            random_seed: None,
        }
    }
}

/// Порядок важен: побеждает первый совпавший триггер
fn default_fallback_responses() -> Vec<FallbackRule> {
    vec![
        FallbackRule::new("hello", "Hello! Nice to meet you! How can I assist you today?"),
        FallbackRule::new("hi", "Hi there! 😊 What would you like to talk about?"),
        FallbackRule::new("hey", "Hey! Great to see you. What's on your mind?"),
        FallbackRule::new("how are you", "I'm doing great! Thanks for asking. How about you?"),
        FallbackRule::new("what is your name", "I'm an AI chatbot powered by Hugging Face models!"),
        FallbackRule::new(
            "who are you",
            "I'm an AI assistant running on Hugging Face models, here to chat and help with your questions!",
        ),
        FallbackRule::new("thank you", "You're welcome! Is there anything else I can help with?"),
        FallbackRule::new("thanks", "You're welcome! Happy to help!"),
        // "goodbye" раньше "bye", иначе он недостижим
        FallbackRule::new("goodbye", "Goodbye! Have a wonderful day!"),
        FallbackRule::new("bye", "Goodbye! Feel free to come back if you have more questions!"),
        FallbackRule::new("see you", "See you later! It was nice chatting with you!"),
        FallbackRule::new("who created you", "I was created using the Hugging Face Inference API and Rust!"),
        FallbackRule::new(
            "what can you do",
            "I can chat with you, answer questions, and have conversations using AI!",
        ),
        FallbackRule::new("awesome", "Thank you! I'm glad you think so! 😊"),
        FallbackRule::new("good", "That's great to hear! How can I help you today?"),
        FallbackRule::new("bad", "I'm sorry to hear that. How can I improve?"),
        FallbackRule::new("nothing", "I'm here to help! What would you like to talk about?"),
        FallbackRule::new("you know", "I'm constantly learning! What would you like me to know?"),
    ]
}

impl Config {
    /// Загружает конфигурацию: значения по умолчанию → JSON-файл → переменные окружения
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = Config::default();

        if let Some(path) = Self::config_file_path() {
            if path.exists() {
                config.apply_file(&path)?;
                log::info!("📁 Конфигурация прочитана из {}", path.display());
            }
        }

        config.apply_env(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn config_file_path() -> Option<PathBuf> {
        if let Ok(path) = env::var("HFCHAT_CONFIG") {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("hfchat/config.json"))
    }

    fn apply_file(&mut self, path: &Path) -> Result<()> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("не удалось прочитать {}", path.display()))?;
        let file: ConfigFile = serde_json::from_str(&raw)
            .with_context(|| format!("некорректный JSON в {}", path.display()))?;

        if file.hf_token.is_some() {
            self.hf_token = file.hf_token;
        }
        if let Some(models) = file.models {
            self.models = models;
        }
        if let Some(proxies) = file.cors_proxies {
            self.cors_proxies = proxies;
        }
        if let Some(params) = file.api_params {
            self.api_params = params;
        }
        if let Some(max_length) = file.relay_max_length {
            self.relay_max_length = max_length;
        }
        if let Some(secs) = file.relay_timeout_secs {
            self.relay_timeout = Duration::from_secs(secs);
        }
        if let Some(rules) = file.fallback_responses {
            self.fallback_responses = rules;
        }
        if file.gemini_api_key.is_some() {
            self.gemini_api_key = file.gemini_api_key;
        }
        if let Some(url) = file.gemini_url {
            self.gemini_url = url;
        }
        if let Some(name) = file.bot_name {
            self.bot_name = name;
        }
        Ok(())
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("HF_TOKEN").filter(|t| !t.trim().is_empty()) {
            self.hf_token = Some(token.trim().to_string());
        }
        if let Some(models) = lookup("HF_MODELS") {
            self.models = split_list(&models);
        }
        if let Some(proxies) = lookup("HF_CORS_PROXIES") {
            self.cors_proxies = split_list(&proxies);
        }
        if let Some(max_length) = lookup("HF_MAX_LENGTH").and_then(|v| v.parse::<u32>().ok()) {
            self.api_params.max_length = max_length;
        }
        if let Some(temperature) = lookup("HF_TEMPERATURE").and_then(|v| v.parse::<f32>().ok()) {
            self.api_params.temperature = temperature;
        }
        if let Some(secs) = lookup("HF_RELAY_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok()) {
            self.relay_timeout = Duration::from_secs(secs);
        }
        if let Some(key) = lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.gemini_api_key = Some(key.trim().to_string());
        }
        if let Some(url) = lookup("GEMINI_API_URL").filter(|u| !u.trim().is_empty()) {
            self.gemini_url = url.trim().to_string();
        }
        if let Some(name) = lookup("HFCHAT_NAME").filter(|n| !n.trim().is_empty()) {
            self.bot_name = name;
        }
        if let Some(seed) = lookup("HFCHAT_SEED").and_then(|v| v.parse::<u64>().ok()) {
            self.random_seed = Some(seed);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.models.is_empty() {
            bail!("список моделей пуст: нужен хотя бы один URL");
        }
        if self.relay_timeout.is_zero() {
            bail!("таймаут прокси должен быть больше нуля");
        }
        for rule in &self.fallback_responses {
            if rule.trigger.trim().is_empty() || rule.reply.trim().is_empty() {
                bail!("пустой триггер или ответ в fallback_responses: {:?}", rule);
            }
        }
        Ok(())
    }

    pub fn is_token_configured(&self) -> bool {
        self.hf_token.as_deref().map_or(false, |t| !t.is_empty())
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
