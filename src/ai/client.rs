//! HTTP-backed LLM providers for analysis and web search.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::{AiConfig, ProviderKind};
use crate::error::ProviderError;
use crate::workflow::{AnalysisProvider, WebSearchProvider};

use super::prompts::{
    format_analysis_prompt, format_web_search_prompt, ANALYSIS_SYSTEM_PROMPT,
    WEB_SEARCH_SYSTEM_PROMPT,
};

/// Connection timeout for HTTP requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Overall request timeout for HTTP requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum number of retries for transient failures.
const MAX_RETRIES: u32 = 3;

/// Build an HTTP client with proper timeout configuration.
fn build_http_client() -> Result<Client, ProviderError> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ProviderError::Unavailable(format!("Failed to build HTTP client: {e}")))
}

/// Determine if a request should be retried based on status code and attempt count.
fn should_retry(status_code: u16, attempt: u32) -> bool {
    if attempt >= MAX_RETRIES {
        return false;
    }
    (500..600).contains(&status_code)
}

/// Exponential backoff: 1s, 2s, 4s.
fn calculate_backoff(attempt: u32) -> Duration {
    Duration::from_secs(1 << attempt)
}

fn map_send_error(e: &reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(REQUEST_TIMEOUT)
    } else {
        ProviderError::RequestFailed(e.to_string())
    }
}

/// POST a JSON body, retrying 5xx responses with backoff.
async fn post_json(
    client: &Client,
    url: &str,
    headers: &[(&str, &str)],
    body: &serde_json::Value,
) -> Result<serde_json::Value, ProviderError> {
    let mut attempt = 0;
    loop {
        let mut request = client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(|e| map_send_error(&e))?;
        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| ProviderError::ParseError(e.to_string()));
        }

        let status_code = status.as_u16();
        if should_retry(status_code, attempt) {
            let backoff = calculate_backoff(attempt);
            tracing::debug!(status = status_code, attempt, ?backoff, "Retrying provider request");
            tokio::time::sleep(backoff).await;
            attempt += 1;
            continue;
        }

        let text = response.text().await.unwrap_or_default();
        return Err(ProviderError::RequestFailed(format!("HTTP {status}: {text}")));
    }
}

/// Extract the answer text from a Gemini `generateContent` response.
fn extract_gemini_text(json: &serde_json::Value) -> Result<String, ProviderError> {
    json["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| ProviderError::ParseError("No text in Gemini response".to_string()))
}

/// Extract the answer text from an OpenAI-style chat completion.
fn extract_chat_text(json: &serde_json::Value) -> Result<String, ProviderError> {
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| ProviderError::ParseError("No content in chat completion".to_string()))
}

/// Trait for chat-style LLM providers.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Generate a response from the AI provider.
    async fn generate(&self, system: &str, user: &str) -> Result<String, ProviderError>;
}

/// Gemini API provider.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl GeminiProvider {
    /// Create a new Gemini provider.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Unavailable` if the HTTP client cannot be built.
    pub fn new(
        base_url: String,
        api_key: String,
        model: String,
        max_tokens: u32,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_http_client()?,
            base_url,
            api_key,
            model,
            max_tokens,
        })
    }
}

#[async_trait]
impl AiProvider for GeminiProvider {
    async fn generate(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );

        let body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": user }]
            }],
            "systemInstruction": {
                "parts": [{ "text": system }]
            },
            "generationConfig": {
                "maxOutputTokens": self.max_tokens
            }
        });

        let json = post_json(
            &self.client,
            &url,
            &[("x-goog-api-key", self.api_key.as_str())],
            &body,
        )
        .await?;
        extract_gemini_text(&json)
    }
}

/// Perplexity API provider (OpenAI-compatible chat completions with web search).
#[derive(Debug, Clone)]
pub struct PerplexityProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl PerplexityProvider {
    /// Create a new Perplexity provider.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Unavailable` if the HTTP client cannot be built.
    pub fn new(
        base_url: String,
        api_key: String,
        model: String,
        max_tokens: u32,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_http_client()?,
            base_url,
            api_key,
            model,
            max_tokens,
        })
    }
}

#[async_trait]
impl AiProvider for PerplexityProvider {
    async fn generate(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ]
        });

        let bearer = format!("Bearer {}", self.api_key);
        let json = post_json(
            &self.client,
            &url,
            &[("Authorization", bearer.as_str())],
            &body,
        )
        .await?;
        extract_chat_text(&json)
    }
}

/// Provider enum for dispatch.
///
/// Every variant can serve both escalation capabilities; the stage binding
/// decides which ones it is used for.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Gemini(GeminiProvider),
    Perplexity(PerplexityProvider),
}

impl LlmProvider {
    /// Create a provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::MissingApiKey` if the configured API key
    /// environment variable is unset or empty.
    pub fn from_config(config: &AiConfig) -> Result<Self, ProviderError> {
        let api_key_env = config.api_key_env();
        let api_key = std::env::var(api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ProviderError::MissingApiKey(api_key_env.to_string()))?;

        let base_url = config.base_url().to_string();
        let model = config.model().to_string();

        Ok(match config.provider {
            ProviderKind::Gemini => Self::Gemini(GeminiProvider::new(
                base_url,
                api_key,
                model,
                config.max_tokens,
            )?),
            ProviderKind::Perplexity => Self::Perplexity(PerplexityProvider::new(
                base_url,
                api_key,
                model,
                config.max_tokens,
            )?),
        })
    }

    #[must_use]
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Gemini(_) => ProviderKind::Gemini,
            Self::Perplexity(_) => ProviderKind::Perplexity,
        }
    }

    #[must_use]
    pub fn model(&self) -> &str {
        match self {
            Self::Gemini(p) => &p.model,
            Self::Perplexity(p) => &p.model,
        }
    }
}

#[async_trait]
impl AiProvider for LlmProvider {
    async fn generate(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        match self {
            Self::Gemini(p) => p.generate(system, user).await,
            Self::Perplexity(p) => p.generate(system, user).await,
        }
    }
}

#[async_trait]
impl AnalysisProvider for LlmProvider {
    async fn analyze(&self, question: &str, context: &str) -> Result<String, ProviderError> {
        self.generate(
            ANALYSIS_SYSTEM_PROMPT,
            &format_analysis_prompt(question, context),
        )
        .await
    }
}

#[async_trait]
impl WebSearchProvider for LlmProvider {
    async fn search(&self, question: &str) -> Result<String, ProviderError> {
        self.generate(WEB_SEARCH_SYSTEM_PROMPT, &format_web_search_prompt(question))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_builds() {
        let client = build_http_client().unwrap();
        assert!(format!("{client:?}").contains("Client"));
    }

    #[test]
    fn test_should_retry_logic() {
        // 5xx errors should be retried
        assert!(should_retry(500, 0));
        assert!(should_retry(502, 1));
        assert!(should_retry(503, 2));
        assert!(should_retry(504, 0));

        // 4xx errors should NOT be retried
        assert!(!should_retry(400, 0));
        assert!(!should_retry(401, 0));
        assert!(!should_retry(404, 0));
        assert!(!should_retry(429, 0));

        assert!(!should_retry(200, 0));

        // Max retries should stop retry
        assert!(!should_retry(500, MAX_RETRIES));
        assert!(!should_retry(503, MAX_RETRIES + 1));
    }

    #[test]
    fn test_calculate_backoff() {
        assert_eq!(calculate_backoff(0).as_secs(), 1);
        assert_eq!(calculate_backoff(1).as_secs(), 2);
        assert_eq!(calculate_backoff(2).as_secs(), 4);
    }

    #[test]
    fn test_extract_gemini_text() {
        let json = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "x = 2" }] } }]
        });
        assert_eq!(extract_gemini_text(&json).unwrap(), "x = 2");

        let err = extract_gemini_text(&serde_json::json!({ "candidates": [] })).unwrap_err();
        assert!(matches!(err, ProviderError::ParseError(_)));
    }

    #[test]
    fn test_extract_chat_text() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "π²/6" } }]
        });
        assert_eq!(extract_chat_text(&json).unwrap(), "π²/6");

        let err = extract_chat_text(&serde_json::json!({})).unwrap_err();
        assert!(matches!(err, ProviderError::ParseError(_)));
    }

    #[test]
    fn test_from_config_missing_key() {
        let config = AiConfig {
            api_key_env: Some("MATH_RESOLVER_TEST_UNSET_KEY".to_string()),
            ..AiConfig::for_provider(ProviderKind::Gemini)
        };
        std::env::remove_var("MATH_RESOLVER_TEST_UNSET_KEY");

        let result = LlmProvider::from_config(&config);
        assert!(matches!(
            result,
            Err(ProviderError::MissingApiKey(ref env)) if env == "MATH_RESOLVER_TEST_UNSET_KEY"
        ));
    }

    #[test]
    fn test_from_config_gemini() {
        std::env::set_var("MATH_RESOLVER_TEST_GEMINI_KEY", "test-key");
        let config = AiConfig {
            model: Some("gemini-test".to_string()),
            api_key_env: Some("MATH_RESOLVER_TEST_GEMINI_KEY".to_string()),
            ..AiConfig::for_provider(ProviderKind::Gemini)
        };

        let provider = LlmProvider::from_config(&config).unwrap();
        assert_eq!(provider.kind(), ProviderKind::Gemini);
        assert_eq!(provider.model(), "gemini-test");
        std::env::remove_var("MATH_RESOLVER_TEST_GEMINI_KEY");
    }

    #[test]
    fn test_from_config_perplexity() {
        std::env::set_var("MATH_RESOLVER_TEST_PPLX_KEY", "test-key");
        let config = AiConfig {
            api_key_env: Some("MATH_RESOLVER_TEST_PPLX_KEY".to_string()),
            ..AiConfig::for_provider(ProviderKind::Perplexity)
        };

        let provider = LlmProvider::from_config(&config).unwrap();
        assert_eq!(provider.kind(), ProviderKind::Perplexity);
        assert_eq!(provider.model(), "sonar");
        std::env::remove_var("MATH_RESOLVER_TEST_PPLX_KEY");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_request_failure() {
        let provider = PerplexityProvider::new(
            "http://127.0.0.1:9".to_string(),
            "test-key".to_string(),
            "sonar".to_string(),
            64,
        )
        .unwrap();

        let err = provider.generate("system", "user").await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::RequestFailed(_) | ProviderError::Timeout(_)
        ));
    }
}
