//! Client for the translation endpoint
//!
//! Used by admin tooling to pre-fill the other languages of a title or
//! description. Pre-filling is best-effort: a language that fails to
//! translate is simply left empty.

use crate::localized::LocalizedText;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while translating text.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// Network failure or timeout
    #[error("Translation request failed: {0}")]
    RequestError(String),

    /// The endpoint answered with an error status
    #[error("Translation failed (HTTP {status}): {message}")]
    Upstream { status: u16, message: String },

    /// The response body could not be parsed
    #[error("Failed to parse translation response: {0}")]
    ParseError(String),
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    text: &'a str,
    target: &'a str,
    source: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Client for `POST /api/translate`
#[derive(Debug, Clone)]
pub struct TranslateClient {
    client: reqwest::Client,
    endpoint: String,
}

impl TranslateClient {
    /// Creates a client for the service at `base_url`
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/api/translate", base_url.trim_end_matches('/')),
        }
    }

    /// Translates `text` from `source` into `target`
    pub async fn translate(
        &self,
        text: &str,
        target: &str,
        source: &str,
    ) -> Result<String, TranslateError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&TranslateRequest {
                text,
                target,
                source,
            })
            .send()
            .await
            .map_err(|e| TranslateError::RequestError(e.to_string()))?;

        let status = response.status();
        let body: TranslateResponse = response
            .json()
            .await
            .map_err(|e| TranslateError::ParseError(e.to_string()))?;

        if !status.is_success() {
            return Err(TranslateError::Upstream {
                status: status.as_u16(),
                message: body.error.unwrap_or_else(|| "Translate failed".to_string()),
            });
        }
        Ok(body.text.unwrap_or_default())
    }

    /// Fills the missing `targets` of `value` from its `source` entry
    ///
    /// Existing entries are never overwritten. Failures are logged and the
    /// language is skipped, so this never fails.
    pub async fn prefill(
        &self,
        value: &LocalizedText,
        source: &str,
        targets: &[&str],
    ) -> LocalizedText {
        let mut filled = value.clone();
        let text = value.resolve(source).trim().to_string();
        if text.is_empty() {
            return filled;
        }

        for target in targets.iter().filter(|t| **t != source) {
            if value.get(target).is_some() {
                continue;
            }
            match self.translate(&text, target, source).await {
                Ok(translated) if !translated.trim().is_empty() => {
                    filled.set(target, translated);
                }
                Ok(_) => {
                    tracing::debug!(lang = %target, "Empty translation, skipping");
                }
                Err(e) => {
                    tracing::warn!(lang = %target, error = %e, "Translation failed, skipping");
                }
            }
        }
        filled
    }
}
