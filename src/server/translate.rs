//! Translation endpoint backed by Google Cloud Translation v2.

use super::{ApiError, AppState};
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Default, Deserialize)]
struct TranslateBody {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Serialize)]
struct UpstreamRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
}

/// Client for the upstream translation API
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl GoogleTranslator {
    pub fn new(client: reqwest::Client, url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client,
            url: url.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Translates `text`; upstream errors keep their status and message
    pub(crate) async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, ApiError> {
        let response = self
            .client
            .post(&self.url)
            .query(&[("key", &self.api_key)])
            .json(&UpstreamRequest {
                q: text,
                source,
                target,
                format: "text",
            })
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Translation upstream unreachable");
                ApiError::internal(e.to_string())
            })?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Unreadable translation response");
            ApiError::internal(e.to_string())
        })?;

        if !status.is_success() {
            let message = body["error"]["message"]
                .as_str()
                .unwrap_or("Translate failed")
                .to_string();
            tracing::warn!(status = status.as_u16(), %message, "Translation upstream failed");
            let status =
                StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
            return Err(ApiError::new(status, message));
        }

        Ok(body["data"]["translations"][0]["translatedText"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }
}

/// `POST /api/translate` with `{text, target, source = "en"}`
pub(super) async fn translate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let body: TranslateBody = serde_json::from_slice(&body).unwrap_or_default();

    let (Some(text), Some(target)) = (
        body.text.filter(|t| !t.is_empty()),
        body.target.filter(|t| !t.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Missing 'text' or 'target'."));
    };
    let source = body
        .source
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "en".to_string());

    let translator = state
        .translator
        .as_ref()
        .ok_or_else(|| ApiError::internal("Missing GOOGLE_TRANSLATE_API_KEY."))?;

    let translated = translator.translate(&text, &source, &target).await?;
    tracing::debug!(%source, lang = %target, "Translated text");
    Ok(Json(json!({ "text": translated })))
}
