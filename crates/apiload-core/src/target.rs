//! The two APIs under test: how to build each request and how to judge the
//! response.

use std::io;

use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{json, Serializer, Value};

use crate::config::Settings;
use crate::error::ApiloadError;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const HF_INFERENCE_BASE_URL: &str = "https://api-inference.huggingface.co";
pub const HF_HUB_BASE_URL: &str = "https://huggingface.co";

const PROMPT: &str = "Write a short description of API testing.";
const SYSTEM_PROMPT: &str = "You are a helpful assistant.";
const ERROR_SNIPPET_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiTarget {
    /// Chat completion endpoint.
    OpenAi {
        api_key: String,
        model: String,
        base_url: String,
    },
    /// Hosted text-generation inference, or the public model docs page when
    /// no key is configured or the inference toggle is off.
    HuggingFace {
        api_key: Option<String>,
        model: String,
        use_api: bool,
        base_url: String,
    },
}

/// Result of judging one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(String),
}

impl ApiTarget {
    pub fn openai(settings: &Settings) -> Result<Self, ApiloadError> {
        let api_key = settings.openai_api_key.clone().ok_or_else(|| {
            ApiloadError::Config(
                "OPENAI_API_KEY environment variable not set; add it to the .env file".to_string(),
            )
        })?;
        Ok(ApiTarget::OpenAi {
            api_key,
            model: settings.openai_model.clone(),
            base_url: OPENAI_BASE_URL.to_string(),
        })
    }

    pub fn huggingface(settings: &Settings) -> Self {
        let use_api = settings.hf_use_api && settings.hf_api_key.is_some();
        ApiTarget::HuggingFace {
            api_key: settings.hf_api_key.clone(),
            model: settings.hf_model.clone(),
            use_api,
            base_url: if use_api {
                HF_INFERENCE_BASE_URL
            } else {
                HF_HUB_BASE_URL
            }
            .to_string(),
        }
    }

    /// Point the target at a different host.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        match &mut self {
            ApiTarget::OpenAi { base_url, .. } | ApiTarget::HuggingFace { base_url, .. } => {
                *base_url = url.into();
            }
        }
        self
    }

    /// Short name used for the default report file prefix.
    pub fn system_name(&self) -> &'static str {
        match self {
            ApiTarget::OpenAi { .. } => "openai",
            ApiTarget::HuggingFace { .. } => "huggingface",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            ApiTarget::OpenAi { .. } => Method::POST,
            ApiTarget::HuggingFace { use_api: true, .. } => Method::POST,
            ApiTarget::HuggingFace { .. } => Method::GET,
        }
    }

    /// Request path; also the endpoint name in the stats files.
    pub fn path(&self) -> String {
        match self {
            ApiTarget::OpenAi { .. } => "/v1/chat/completions".to_string(),
            ApiTarget::HuggingFace {
                model,
                use_api: true,
                ..
            } => format!("/pipeline/text-generation/{model}"),
            ApiTarget::HuggingFace { model, .. } => {
                format!("/docs/transformers/model_doc/{model}")
            }
        }
    }

    pub fn url(&self) -> String {
        let base = match self {
            ApiTarget::OpenAi { base_url, .. } | ApiTarget::HuggingFace { base_url, .. } => {
                base_url.trim_end_matches('/')
            }
        };
        format!("{base}{}", self.path())
    }

    pub fn body(&self) -> Option<Value> {
        match self {
            ApiTarget::OpenAi { model, .. } => Some(json!({
                "model": model,
                "messages": [
                    {"role": "system", "content": SYSTEM_PROMPT},
                    {"role": "user", "content": PROMPT},
                ],
                "max_tokens": 50,
            })),
            ApiTarget::HuggingFace { use_api: true, .. } => Some(json!({ "inputs": PROMPT })),
            ApiTarget::HuggingFace { .. } => None,
        }
    }

    fn bearer(&self) -> Option<&str> {
        match self {
            ApiTarget::OpenAi { api_key, .. } => Some(api_key),
            ApiTarget::HuggingFace {
                api_key: Some(key),
                use_api: true,
                ..
            } => Some(key),
            ApiTarget::HuggingFace { .. } => None,
        }
    }

    pub fn request(&self, client: &Client) -> RequestBuilder {
        let mut builder = client.request(self.method(), self.url());
        if let Some(token) = self.bearer() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = self.body() {
            builder = builder.json(&body);
        }
        builder
    }

    /// 200 is success; anything else is a failure carrying the status and a
    /// short excerpt of the body.
    pub fn classify(&self, status: u16, body: &str) -> Outcome {
        if status == 200 {
            return Outcome::Success;
        }
        let detail = match self {
            ApiTarget::HuggingFace { use_api: false, .. } => truncate_chars(body, ERROR_SNIPPET_LEN),
            _ => match serde_json::from_str::<Value>(body) {
                Ok(value) => spaced_json(&value)
                    .unwrap_or_else(|| truncate_chars(body, ERROR_SNIPPET_LEN)),
                Err(_) => truncate_chars(body, ERROR_SNIPPET_LEN),
            },
        };
        Outcome::Failure(format!("Status code: {status}, Error: {detail}"))
    }
}

/// JSON with `", "` and `": "` separators and non-ASCII text escaped as
/// `\uXXXX`, the failure text locust records for a JSON error body.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        for c in fragment.chars() {
            if c.is_ascii() {
                writer.write_all(&[c as u8])?;
            } else {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }
}

fn spaced_json(value: &Value) -> Option<String> {
    let mut out = Vec::new();
    let mut ser = Serializer::with_formatter(&mut out, SpacedFormatter);
    value.serialize(&mut ser).ok()?;
    String::from_utf8(out).ok()
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
