//! One-shot credential checks against both APIs.

use std::time::Duration;

use serde::Serialize;
use serde_json::json;

use crate::config::Settings;
use crate::error::ApiloadError;
use crate::target::{truncate_chars, HF_INFERENCE_BASE_URL, OPENAI_BASE_URL};

/// Value shipped in the sample `.env`; treated as no key at all.
pub const PLACEHOLDER_KEY: &str = "YOUR_API_KEY_HERE";

const DETAILS_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum KeyStatus {
    Valid,
    NotSet,
    /// The API answered but rejected the key; `details` is the start of the body.
    Invalid { details: String },
    /// The request never completed.
    RequestFailed { message: String },
}

impl KeyStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, KeyStatus::Valid)
    }
}

/// A chat completion body is valid when it carries `"choices"`.
pub fn classify_openai_body(body: &str) -> KeyStatus {
    if body.contains("\"choices\"") {
        KeyStatus::Valid
    } else {
        invalid(body)
    }
}

/// An inference body is valid when non-empty and not an `{"error` object.
pub fn classify_huggingface_body(body: &str) -> KeyStatus {
    if !body.trim().is_empty() && !body.starts_with("{\"error") {
        KeyStatus::Valid
    } else {
        invalid(body)
    }
}

fn invalid(body: &str) -> KeyStatus {
    KeyStatus::Invalid {
        details: truncate_chars(body, DETAILS_LEN),
    }
}

/// `None` for absent, blank or placeholder keys.
fn usable_key(key: Option<&str>) -> Option<&str> {
    key.filter(|k| !k.trim().is_empty() && *k != PLACEHOLDER_KEY)
}

pub struct KeyVerifier {
    client: reqwest::Client,
    openai_base_url: String,
    openai_model: String,
    hf_base_url: String,
    hf_model: String,
}

impl KeyVerifier {
    pub fn new(settings: &Settings) -> Result<Self, ApiloadError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!("apiload/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            openai_base_url: OPENAI_BASE_URL.to_string(),
            openai_model: settings.openai_model.clone(),
            hf_base_url: HF_INFERENCE_BASE_URL.to_string(),
            hf_model: settings.hf_model.clone(),
        })
    }

    pub fn with_base_urls(mut self, openai: impl Into<String>, huggingface: impl Into<String>) -> Self {
        self.openai_base_url = openai.into();
        self.hf_base_url = huggingface.into();
        self
    }

    pub async fn verify_openai(&self, key: Option<&str>) -> KeyStatus {
        let Some(key) = usable_key(key) else {
            return KeyStatus::NotSet;
        };
        let url = format!(
            "{}/v1/chat/completions",
            self.openai_base_url.trim_end_matches('/')
        );
        let body = json!({
            "model": self.openai_model,
            "messages": [
                {"role": "system", "content": "You are a helpful assistant."},
                {"role": "user", "content": "Hello"},
            ],
            "max_tokens": 5,
        });
        match self.post(&url, key, &body).await {
            Ok(text) => classify_openai_body(&text),
            Err(e) => KeyStatus::RequestFailed {
                message: e.to_string(),
            },
        }
    }

    pub async fn verify_huggingface(&self, key: Option<&str>) -> KeyStatus {
        let Some(key) = usable_key(key) else {
            return KeyStatus::NotSet;
        };
        let url = format!(
            "{}/pipeline/text-generation/{}",
            self.hf_base_url.trim_end_matches('/'),
            self.hf_model
        );
        match self.post(&url, key, &json!({ "inputs": "Hello" })).await {
            Ok(text) => classify_huggingface_body(&text),
            Err(e) => KeyStatus::RequestFailed {
                message: e.to_string(),
            },
        }
    }

    /// The response body regardless of status; only transport errors fail.
    async fn post(
        &self,
        url: &str,
        key: &str,
        body: &serde_json::Value,
    ) -> Result<String, reqwest::Error> {
        tracing::debug!(url, "verifying key");
        self.client
            .post(url)
            .bearer_auth(key)
            .json(body)
            .send()
            .await?
            .text()
            .await
    }
}
