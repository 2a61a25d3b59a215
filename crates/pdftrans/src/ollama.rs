//! Translator backed by a local Ollama server.

use std::time::Duration;

use pdftrans_core::{TranslationRequest, TranslationResult};
use serde::{Deserialize, Serialize};

use crate::translator::{RetryPolicy, Translator, build_prompt, parse_response};

/// Connection settings for [`OllamaTranslator`].
#[derive(Debug, Clone, PartialEq)]
pub struct OllamaConfig {
    /// Server root, e.g. `http://localhost:11434`.
    pub base_url: String,
    pub model: String,
    /// Attempts per page before giving up (default: 10).
    pub max_retries: usize,
    /// Wait before the first retry (default: 2 s).
    pub initial_backoff: Duration,
    /// Per-request HTTP timeout (default: 300 s).
    pub timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "gemma3:27b".to_string(),
            max_retries: 10,
            initial_backoff: Duration::from_secs(2),
            timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Why one call to the server failed.
#[derive(Debug, thiserror::Error)]
enum CallError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Response(#[from] crate::translator::ResponseError),
}

/// Sends each page to `POST {base_url}/api/generate` and parses the reply.
pub struct OllamaTranslator {
    config: OllamaConfig,
    retry: RetryPolicy,
    client: reqwest::blocking::Client,
}

impl OllamaTranslator {
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(config: OllamaConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()?;
        let retry = RetryPolicy {
            max_retries: config.max_retries,
            base_delay: config.initial_backoff,
            ..RetryPolicy::default()
        };
        Ok(Self {
            config,
            retry,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.config.base_url.trim_end_matches('/'))
    }

    fn call(&self, prompt: &str) -> Result<TranslationResult, CallError> {
        let body = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
        };
        let reply: GenerateResponse = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()?
            .error_for_status()?
            .json()?;
        Ok(parse_response(&reply.response)?)
    }
}

impl Translator for OllamaTranslator {
    fn translate(&self, request: &TranslationRequest) -> TranslationResult {
        if request.blocks.is_empty() {
            return TranslationResult::new();
        }
        let prompt = build_prompt(request);
        let what = format!("translation of page {}", request.page + 1);
        self.retry
            .run(&what, |_| self.call(&prompt), std::thread::sleep)
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for OllamaTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaTranslator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let t = OllamaTranslator::new(OllamaConfig {
            base_url: "http://127.0.0.1:11434/".to_string(),
            ..OllamaConfig::default()
        })
        .unwrap();
        assert_eq!(t.endpoint(), "http://127.0.0.1:11434/api/generate");
    }

    #[test]
    fn request_body_disables_streaming() {
        let body = GenerateRequest {
            model: "m",
            prompt: "p",
            stream: false,
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"model":"m","prompt":"p","stream":false}"#
        );
    }

    #[test]
    fn unreachable_server_yields_empty_result() {
        let t = OllamaTranslator::new(OllamaConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            max_retries: 1,
            timeout: Duration::from_secs(2),
            ..OllamaConfig::default()
        })
        .unwrap();
        let request = TranslationRequest {
            page: 0,
            target_language: "German".to_string(),
            blocks: vec![pdftrans_core::BlockPayload {
                id: 0,
                text: "Hello".to_string(),
            }],
            previous_pages: vec![],
            next_pages: vec![],
        };
        assert!(t.translate(&request).is_empty());
    }
}
