//! Structured contact-field extraction via an OpenRouter-style chat API.
//!
//! [`OpenRouterExtractor`] sends discovered content to a chat-completions
//! endpoint and post-processes the completion: first balanced JSON object
//! out of the (possibly noisy) text, then per-attribute cleaning. A
//! malformed completion is a parse error; the pipeline degrades it to
//! zero extracted fields for that row.

mod fields;
mod parse;

pub use fields::{clean_fields, clean_value};
pub use parse::{first_json_object, parse_object};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use leadloom_shared::{ExtractedFields, LeadloomError, Result};

/// Timeout in seconds for completion requests.
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Maximum completion tokens requested from the model.
const MAX_COMPLETION_TOKENS: u32 = 512;

/// User-Agent string for extraction requests.
const USER_AGENT: &str = concat!("LeadLoom/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// FieldExtraction contract
// ---------------------------------------------------------------------------

/// Structured extraction of contact attributes from raw content.
///
/// Implementations receive content already capped to their input-size
/// bound by the caller.
#[async_trait]
pub trait FieldExtraction: Send + Sync {
    async fn extract(&self, content: &str, entity: &str) -> Result<ExtractedFields>;
}

// ---------------------------------------------------------------------------
// Extractor options
// ---------------------------------------------------------------------------

/// Configuration for [`OpenRouterExtractor`].
#[derive(Debug, Clone)]
pub struct ExtractorOptions {
    /// API base URL (e.g. `https://openrouter.ai/api/v1`).
    pub base_url: String,
    /// Bearer API key.
    pub api_key: String,
    /// Model ID.
    pub model: String,
}

// ---------------------------------------------------------------------------
// OpenRouterExtractor
// ---------------------------------------------------------------------------

/// Chat-completions implementation of [`FieldExtraction`].
pub struct OpenRouterExtractor {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

const SYSTEM_PROMPT: &str = "You extract contact details for a named organization or person \
from web page text. Respond with a single JSON object and nothing else. Use only these keys: \
contact, phone, email, website, location, linkedin, address, twitter, facebook. \
Every value must be a string taken from the text; use \"not found\" for attributes \
the text does not support. Do not guess.";

impl OpenRouterExtractor {
    /// Create a new extractor with the given options.
    pub fn new(opts: ExtractorOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| LeadloomError::Extraction(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: opts.base_url,
            api_key: opts.api_key,
            model: opts.model,
        })
    }

    fn chat_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/chat/completions")
    }

    /// Send one completion request and return the raw completion text.
    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "max_tokens": MAX_COMPLETION_TOKENS,
            "temperature": 0.0,
        });

        let response = self
            .client
            .post(self.chat_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LeadloomError::Extraction(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LeadloomError::Extraction(format!(
                "API error ({status}): {text}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LeadloomError::Extraction(format!("invalid response body: {e}")))?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| LeadloomError::Extraction("response has no completion content".into()))
    }
}

fn user_prompt(content: &str, entity: &str) -> String {
    format!(
        "Entity: {entity}\n\nExtract the entity's contact details from this text:\n\n{content}"
    )
}

#[async_trait]
impl FieldExtraction for OpenRouterExtractor {
    async fn extract(&self, content: &str, entity: &str) -> Result<ExtractedFields> {
        let completion = self
            .complete(SYSTEM_PROMPT, &user_prompt(content, entity))
            .await?;

        let raw = parse::parse_object(&completion)?;
        let cleaned = fields::clean_fields(&raw);

        debug!(
            entity,
            raw_keys = raw.len(),
            kept = cleaned.len(),
            "extraction cleaned"
        );
        Ok(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadloom_shared::ContactField;

    fn extractor_for(server_uri: &str) -> OpenRouterExtractor {
        OpenRouterExtractor::new(ExtractorOptions {
            base_url: server_uri.to_string(),
            api_key: "test-key".into(),
            model: "test/model".into(),
        })
        .unwrap()
    }

    fn completion_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": content } }
            ]
        })
    }

    #[test]
    fn chat_url_handles_trailing_slash() {
        let a = OpenRouterExtractor::new(ExtractorOptions {
            base_url: "https://openrouter.ai/api/v1".into(),
            api_key: "k".into(),
            model: "m".into(),
        })
        .unwrap();
        let b = OpenRouterExtractor::new(ExtractorOptions {
            base_url: "https://openrouter.ai/api/v1/".into(),
            api_key: "k".into(),
            model: "m".into(),
        })
        .unwrap();
        assert_eq!(a.chat_url(), "https://openrouter.ai/api/v1/chat/completions");
        assert_eq!(a.chat_url(), b.chat_url());
    }

    #[tokio::test]
    async fn extract_parses_noisy_completion() {
        let server = wiremock::MockServer::start().await;

        let completion = "Here are the details I found:\n\
            {\"email\": \"info@acme.com\", \"website\": \"acme.com\", \"phone\": \"not found\"}\n\
            Let me know if you need anything else.";

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/chat/completions"))
            .and(wiremock::matchers::header("authorization", "Bearer test-key"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_json(completion_body(completion)),
            )
            .mount(&server)
            .await;

        let extractor = extractor_for(&server.uri());
        let fields = extractor
            .extract("Acme Robotics. Reach us at info@acme.com or acme.com.", "Acme")
            .await
            .unwrap();

        assert_eq!(fields.get(ContactField::Email), Some("info@acme.com"));
        assert_eq!(fields.get(ContactField::Website), Some("https://acme.com"));
        // Sentinel dropped, not stored empty
        assert_eq!(fields.get(ContactField::Phone), None);
        assert_eq!(fields.len(), 2);
    }

    #[tokio::test]
    async fn extract_errors_on_non_json_completion() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/chat/completions"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(completion_body("I could not find any contact details.")),
            )
            .mount(&server)
            .await;

        let extractor = extractor_for(&server.uri());
        let result = extractor.extract("some content", "Acme").await;

        assert!(matches!(result, Err(LeadloomError::Parse { .. })));
    }

    #[tokio::test]
    async fn extract_errors_on_api_failure() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/chat/completions"))
            .respond_with(
                wiremock::ResponseTemplate::new(429).set_body_string("rate limited"),
            )
            .mount(&server)
            .await;

        let extractor = extractor_for(&server.uri());
        let result = extractor.extract("some content", "Acme").await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn extract_errors_on_missing_content() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/chat/completions"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let extractor = extractor_for(&server.uri());
        let result = extractor.extract("some content", "Acme").await;

        assert!(matches!(result, Err(LeadloomError::Extraction(_))));
    }

    #[test]
    fn completion_fixture_parses() {
        let fixture = std::fs::read_to_string("../../../fixtures/json/completion.fixture.json")
            .expect("read completion fixture");
        let value: serde_json::Value =
            serde_json::from_str(&fixture).expect("deserialize fixture completion");
        let content = value["choices"][0]["message"]["content"]
            .as_str()
            .expect("fixture has completion content");
        let raw = parse_object(content).expect("fixture completion contains JSON");
        assert!(raw.contains_key("email"));
    }
}
