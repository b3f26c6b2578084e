//! Декодеры ответа генеративного API.
//!
//! Разные бэкенды возвращают текст в разных местах, поэтому каждая форма
//! объявлена отдельным вариантом и пробуется по порядку из [`DECODERS`].

use super::error::ChainError;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `{ "generated_text": "..." }`
    Raw,
    /// `[ { "generated_text": "..." } ]`
    FirstElement,
    /// `{ "conversation": { "generated_responses": ["..."] } }`
    Conversation,
    /// `{ "candidates": [ { "content": { "parts": [ { "text": "..." } ] } } ] }`
    Candidates,
}

pub const DECODERS: [ResponseShape; 4] = [
    ResponseShape::Raw,
    ResponseShape::FirstElement,
    ResponseShape::Conversation,
    ResponseShape::Candidates,
];

#[derive(Deserialize)]
struct GeneratedText {
    generated_text: String,
}

#[derive(Deserialize)]
struct ConversationEnvelope {
    conversation: Conversation,
}

#[derive(Deserialize)]
struct Conversation {
    generated_responses: Vec<String>,
}

#[derive(Deserialize)]
struct CandidatesEnvelope {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: String,
}

impl ResponseShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseShape::Raw => "raw",
            ResponseShape::FirstElement => "first-element",
            ResponseShape::Conversation => "conversation",
            ResponseShape::Candidates => "candidates",
        }
    }

    /// Достаёт текст, если тело имеет эту форму
    pub fn decode(&self, body: &Value) -> Option<String> {
        let text = match self {
            ResponseShape::Raw => GeneratedText::deserialize(body).ok()?.generated_text,
            ResponseShape::FirstElement => Vec::<GeneratedText>::deserialize(body)
                .ok()?
                .into_iter()
                .next()?
                .generated_text,
            ResponseShape::Conversation => ConversationEnvelope::deserialize(body)
                .ok()?
                .conversation
                .generated_responses
                .into_iter()
                .next()?,
            ResponseShape::Candidates => CandidatesEnvelope::deserialize(body)
                .ok()?
                .candidates
                .into_iter()
                .next()?
                .content
                .parts
                .into_iter()
                .next()?
                .text,
        };

        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

/// Разбирает тело успешного ответа: первый подошедший декодер побеждает
pub fn decode_reply(body: &str) -> Result<(ResponseShape, String), ChainError> {
    let value: Value = serde_json::from_str(body).map_err(|_| ChainError::MalformedResponse)?;

    DECODERS
        .iter()
        .find_map(|shape| shape.decode(&value).map(|text| (*shape, text)))
        .ok_or(ChainError::MalformedResponse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_shape() {
        let body = json!({ "generated_text": "  hi there \n" });
        assert_eq!(ResponseShape::Raw.decode(&body).as_deref(), Some("hi there"));
        assert_eq!(ResponseShape::FirstElement.decode(&body), None);
    }

    #[test]
    fn first_element_shape() {
        let body = json!([{ "generated_text": "first" }, { "generated_text": "second" }]);
        assert_eq!(ResponseShape::FirstElement.decode(&body).as_deref(), Some("first"));
        assert_eq!(ResponseShape::FirstElement.decode(&json!([])), None);
    }

    #[test]
    fn conversation_shape() {
        let body = json!({
            "conversation": { "generated_responses": ["sure thing", "older"], "past_user_inputs": [] }
        });
        assert_eq!(ResponseShape::Conversation.decode(&body).as_deref(), Some("sure thing"));
    }

    #[test]
    fn candidates_shape() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "from gemini" }], "role": "model" } }]
        });
        assert_eq!(ResponseShape::Candidates.decode(&body).as_deref(), Some("from gemini"));
    }

    #[test]
    fn blank_text_does_not_match() {
        assert_eq!(ResponseShape::Raw.decode(&json!({ "generated_text": "   " })), None);
    }

    #[test]
    fn decode_reply_tries_shapes_in_order() {
        let (shape, text) = decode_reply(r#"[{"generated_text":"array reply"}]"#).unwrap();
        assert_eq!(shape, ResponseShape::FirstElement);
        assert_eq!(text, "array reply");
    }

    #[test]
    fn unknown_or_invalid_bodies_are_malformed() {
        assert_eq!(decode_reply(r#"{"error":"oops"}"#), Err(ChainError::MalformedResponse));
        assert_eq!(decode_reply("<html>proxy page</html>"), Err(ChainError::MalformedResponse));
    }
}
