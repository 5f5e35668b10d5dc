use super::AiError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(super) struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

impl<'a> GenerateRequest<'a> {
    pub(super) fn user_prompt(prompt: &'a str) -> Self {
        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Map an HTTP status and body from `generateContent` onto text or an [`AiError`].
pub fn interpret_response(status: u16, body: &str) -> Result<String, AiError> {
    if (200..300).contains(&status) {
        return interpret_success(body);
    }

    if status == 429 {
        return Err(AiError::RateLimit);
    }

    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(|error| error.message)
        .filter(|message| !message.trim().is_empty());

    if status == 400
        && message
            .as_deref()
            .is_some_and(|message| message.to_lowercase().contains("prompt was blocked"))
    {
        return Err(AiError::ContentFilter);
    }

    Err(AiError::Upstream(message.unwrap_or_else(|| {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("");
        format!("API Error: {} {}", status, reason).trim_end().to_string()
    })))
}

fn interpret_success(body: &str) -> Result<String, AiError> {
    let response: GenerateResponse = serde_json::from_str(body).map_err(|_| AiError::Format)?;

    let first = response.candidates.first();
    let text = first
        .and_then(|candidate| candidate.content.as_ref())
        .and_then(|content| content.parts.first())
        .and_then(|part| part.text.clone());

    if let Some(text) = text {
        return Ok(text);
    }

    let blocked = response
        .prompt_feedback
        .as_ref()
        .is_some_and(|feedback| feedback.block_reason.is_some())
        || first.is_some_and(|candidate| candidate.finish_reason.as_deref() == Some("SAFETY"));

    if blocked {
        Err(AiError::ContentFilter)
    } else {
        Err(AiError::Format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let body = serde_json::to_value(GenerateRequest::user_prompt("hi")).unwrap();
        assert_eq!(body, json!({ "contents": [{ "role": "user", "parts": [{ "text": "hi" }] }] }));
    }

    #[test]
    fn test_success_extracts_first_part() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Milk, eggs" }, { "text": "ignored" }] } }]
        })
        .to_string();
        assert_eq!(interpret_response(200, &body), Ok("Milk, eggs".to_string()));
    }

    #[test]
    fn test_missing_payload_is_format_error() {
        assert_eq!(interpret_response(200, r#"{ "candidates": [] }"#), Err(AiError::Format));
        assert_eq!(interpret_response(200, "not json"), Err(AiError::Format));
    }

    #[test]
    fn test_blocked_prompt_on_success_status() {
        let body = json!({ "promptFeedback": { "blockReason": "SAFETY" } }).to_string();
        assert_eq!(interpret_response(200, &body), Err(AiError::ContentFilter));

        let body = json!({ "candidates": [{ "finishReason": "SAFETY" }] }).to_string();
        assert_eq!(interpret_response(200, &body), Err(AiError::ContentFilter));
    }

    #[test]
    fn test_rate_limit() {
        assert_eq!(interpret_response(429, "{}"), Err(AiError::RateLimit));
    }

    #[test]
    fn test_blocked_prompt_on_bad_request() {
        let body = json!({ "error": { "code": 400, "message": "The prompt was blocked due to safety" } }).to_string();
        assert_eq!(interpret_response(400, &body), Err(AiError::ContentFilter));
    }

    #[test]
    fn test_upstream_uses_structured_message() {
        let body = json!({ "error": { "code": 403, "message": "API key not valid." } }).to_string();
        assert_eq!(
            interpret_response(403, &body),
            Err(AiError::Upstream("API key not valid.".to_string()))
        );
    }

    #[test]
    fn test_upstream_without_message_uses_status() {
        assert_eq!(
            interpret_response(503, "<html>"),
            Err(AiError::Upstream("API Error: 503 Service Unavailable".to_string()))
        );
    }
}
