use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::Config;
use crate::error::TranslateError;
use crate::retry::{with_retry_if, RetryConfig};
use crate::translator::{build_translation_prompt, Translation, Translator};

/// Gemini generateContent request
#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u64>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();

        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Classify a non-success HTTP response.
/// 429 or a RESOURCE_EXHAUSTED status in the body means the quota is gone.
fn classify_error(status: u16, body: String) -> TranslateError {
    if status == 429 || body.contains("RESOURCE_EXHAUSTED") {
        TranslateError::QuotaExhausted { status, body }
    } else {
        TranslateError::Api { status, body }
    }
}

/// Translator backed by the Gemini API
pub struct GeminiTranslator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    retry: RetryConfig,
}

impl GeminiTranslator {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.gemini_api_url.trim_end_matches('/'),
                config.gemini_model
            ),
            api_key: config.gemini_api_key.clone(),
            retry: config.retry_config(),
        }
    }

    /// Override the retry policy (tests use short delays)
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn generate(&self, request: &GenerateContentRequest) -> Result<Translation, TranslateError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(classify_error(status.as_u16(), body));
        }

        let body = response.text().await?;
        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| TranslateError::MalformedResponse(e.to_string()))?;

        let text = parsed.text().ok_or_else(|| {
            TranslateError::MalformedResponse("response contained no candidate text".to_string())
        })?;

        let token_count = match parsed.usage_metadata.and_then(|u| u.total_token_count) {
            Some(count) => count,
            None => {
                warn!("usageMetadata not found in response, token usage counted as 0");
                0
            }
        };

        Ok(Translation { text, token_count })
    }
}

#[async_trait]
impl Translator for GeminiTranslator {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<Translation, TranslateError> {
        if text.trim().is_empty() {
            return Err(TranslateError::EmptyInput);
        }

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(build_translation_prompt(text, source_language, target_language)),
                }],
                role: Some("user".to_string()),
            }],
        };

        with_retry_if(
            &self.retry,
            &format!("Translation to {}", target_language),
            || self.generate(&request),
            TranslateError::is_transient,
        )
        .await
    }
}
