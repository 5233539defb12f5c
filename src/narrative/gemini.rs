/*!
Gemini-backed narrator.

Requests are plain blocking HTTP calls. Async callers should run them on a
blocking thread so a slow answer never holds up the session.
*/

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::Narrator;
use crate::core::error::NarrativeError;

/// Default generation endpoint
pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-preview-05-20:generateContent";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Narrator calling the Gemini generation API
pub struct GeminiNarrator {
    api_key: String,
    endpoint: String,
    agent: ureq::Agent,
}

impl fmt::Debug for GeminiNarrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiNarrator")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl GeminiNarrator {
    /// Create a narrator with an explicit key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: GEMINI_API_URL.to_string(),
            agent: ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build(),
        }
    }

    /// Create a narrator from `GEMINI_API_KEY`
    pub fn from_env() -> Result<Self, NarrativeError> {
        Self::from_credential(std::env::var(API_KEY_ENV).ok())
    }

    /// Create a narrator if a non-blank key is present
    pub fn from_credential(api_key: Option<String>) -> Result<Self, NarrativeError> {
        match api_key {
            Some(key) if !key.trim().is_empty() => Ok(Self::new(key.trim())),
            _ => Err(NarrativeError::MissingCredential),
        }
    }

    /// Point at a different endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Endpoint in use
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Narrator for GeminiNarrator {
    fn explain(&self, prompt: &str) -> Result<String, NarrativeError> {
        let url = format!("{}?key={}", self.endpoint, self.api_key);
        let response = match self
            .agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_json(GenerateRequest::new(prompt))
        {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => return Err(NarrativeError::HttpStatus(code)),
            // The URL carries the key; report only the error kind.
            Err(ureq::Error::Transport(transport)) => {
                return Err(NarrativeError::Transport(transport.kind().to_string()));
            }
        };

        let body: GenerateResponse = response
            .into_json()
            .map_err(|e| NarrativeError::Decode(e.to_string()))?;
        body.first_text().ok_or(NarrativeError::EmptyResponse)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str) -> Self {
        Self {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
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

impl GenerateResponse {
    /// Text of the first part of the first candidate
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
            .filter(|text| !text.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let json = serde_json::to_value(GenerateRequest::new("hello")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }]
            })
        );
    }

    #[test]
    fn test_response_text_extraction() {
        let body: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Keys are safe."},{"text":"ignored"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(body.first_text().as_deref(), Some("Keys are safe."));

        for empty in [
            r#"{}"#,
            r#"{"candidates":[]}"#,
            r#"{"candidates":[{}]}"#,
            r#"{"candidates":[{"content":{"parts":[]}}]}"#,
            r#"{"candidates":[{"content":{"parts":[{"text":""}]}}]}"#,
        ] {
            let body: GenerateResponse = serde_json::from_str(empty).unwrap();
            assert!(body.first_text().is_none(), "{}", empty);
        }
    }

    #[test]
    fn test_debug_redacts_key() {
        let narrator = GeminiNarrator::new("AIza-secret-key").with_endpoint("http://127.0.0.1:9");
        let printed = format!("{:?}", narrator);
        assert!(!printed.contains("AIza-secret-key"));
        assert!(printed.contains("<redacted>"));
        assert!(printed.contains("http://127.0.0.1:9"));
    }

    #[test]
    fn test_blank_credential_is_missing() {
        assert!(matches!(
            GeminiNarrator::from_credential(None),
            Err(NarrativeError::MissingCredential)
        ));
        assert!(matches!(
            GeminiNarrator::from_credential(Some("  ".into())),
            Err(NarrativeError::MissingCredential)
        ));
        let narrator = GeminiNarrator::from_credential(Some("abc".into())).unwrap();
        assert_eq!(narrator.endpoint(), GEMINI_API_URL);
    }
}
