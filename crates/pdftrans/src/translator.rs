//! The translation service boundary.
//!
//! The pipeline hands one [`TranslationRequest`] per page to a
//! [`Translator`] and gets back a [`TranslationResult`]. How the text gets
//! translated is up to the implementation; an empty result means the page
//! could not be translated and is left as it is.

use std::time::Duration;

use pdftrans_core::{TranslationRequest, TranslationResult};
use serde::Deserialize;

/// Instruction sent ahead of every prompt to an LLM-backed translator.
pub const SYSTEM_INSTRUCTION: &str = "\
You are a layout-preserving PDF translator.
I will provide a JSON list of text blocks; each block has an 'id' and 'text'.
Your task:
1. Translate the 'text' to the target language.
2. Return strictly a JSON list of objects with 'id' and 'translation'.
3. DO NOT change the 'id'.
4. DO NOT translate technical IDs, numbers, or URLs, unless necessary.
5. The output must be valid JSON, not Markdown.
6. Some previous and next pages are provided for context. DO NOT translate them.";

/// Translates one page worth of blocks.
///
/// Implementations should not fail: on total failure they return an empty
/// result. Closures taking a request are translators too.
pub trait Translator {
    fn translate(&self, request: &TranslationRequest) -> TranslationResult;
}

impl<F> Translator for F
where
    F: Fn(&TranslationRequest) -> TranslationResult,
{
    fn translate(&self, request: &TranslationRequest) -> TranslationResult {
        self(request)
    }
}

/// Returns every block's original text. Useful to check layout without a
/// translation service.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTranslator;

impl Translator for IdentityTranslator {
    fn translate(&self, request: &TranslationRequest) -> TranslationResult {
        request
            .blocks
            .iter()
            .map(|b| (b.id, b.text.as_str()))
            .collect()
    }
}

/// Build the prompt for an LLM-backed translator.
pub fn build_prompt(request: &TranslationRequest) -> String {
    let blocks = serde_json::to_string(&request.blocks).unwrap_or_else(|_| "[]".to_string());
    let mut prompt = format!(
        "SYSTEM INSTRUCTION: {SYSTEM_INSTRUCTION}\nTarget language: {}.\n",
        request.target_language
    );
    prompt.push_str(&format!("\nblocks JSON: ```\n{blocks}\n```\n"));
    push_context(&mut prompt, "Previous pages", &request.previous_pages);
    push_context(&mut prompt, "Next pages", &request.next_pages);
    prompt
}

fn push_context(prompt: &mut String, title: &str, pages: &[String]) {
    prompt.push_str(&format!("\n{title}:\n```\n"));
    for page in pages {
        prompt.push_str(page);
        prompt.push('\n');
    }
    prompt.push_str("```\n");
}

/// Remove a surrounding Markdown code fence, with or without a `json` tag.
pub fn strip_code_fences(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Why a model response could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("response is not a JSON list of translations: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response contains no usable translations")]
    Empty,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ItemId {
    Number(usize),
    Text(String),
}

#[derive(Deserialize)]
struct ResponseItem {
    id: ItemId,
    translation: String,
}

/// Parse `[{"id": n, "translation": "..."}]`, fenced or not.
///
/// Ids given as numeric strings are accepted; other ids are ignored.
pub fn parse_response(text: &str) -> Result<TranslationResult, ResponseError> {
    let items: Vec<ResponseItem> = serde_json::from_str(strip_code_fences(text))?;
    let result: TranslationResult = items
        .into_iter()
        .filter_map(|item| {
            let id = match item.id {
                ItemId::Number(n) => n,
                ItemId::Text(s) => s.trim().parse().ok()?,
            };
            Some((id, item.translation))
        })
        .collect();
    if result.is_empty() {
        return Err(ResponseError::Empty);
    }
    Ok(result)
}

/// Exponential backoff between translation attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts before giving up (default: 10).
    pub max_retries: usize,
    /// Wait before the second attempt (default: 2 s).
    pub base_delay: Duration,
    /// Upper bound of any wait (default: 60 s).
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 10,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// The wait after `current`: doubled, at least the base delay, capped.
    pub fn next_delay(&self, current: Duration) -> Duration {
        current
            .saturating_mul(2)
            .max(self.base_delay)
            .min(self.max_delay)
    }

    /// Run `attempt` until it succeeds or the retries are used up.
    ///
    /// `sleep` is called between attempts; it is a parameter so callers can
    /// decide how to wait.
    pub fn run<T, E, F, S>(&self, what: &str, mut attempt: F, mut sleep: S) -> Option<T>
    where
        E: std::fmt::Display,
        F: FnMut(usize) -> Result<T, E>,
        S: FnMut(Duration),
    {
        let attempts = self.max_retries.max(1);
        let mut delay = self.base_delay.min(self.max_delay);
        for n in 1..=attempts {
            match attempt(n) {
                Ok(value) => return Some(value),
                Err(e) if n < attempts => {
                    tracing::warn!(
                        "{what} failed: {e}; retrying in {:.1}s (attempt {n}/{attempts})",
                        delay.as_secs_f32()
                    );
                    sleep(delay);
                    delay = self.next_delay(delay);
                }
                Err(e) => {
                    tracing::warn!("{what} failed: {e}; giving up after {attempts} attempts");
                }
            }
        }
        None
    }
}
