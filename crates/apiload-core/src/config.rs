//! Credentials and model selection shared by the load runner and the key
//! verifier.

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_HF_MODEL: &str = "gpt2";

/// API keys, model names and the inference toggle.
///
/// Built once at startup and handed to whatever needs it; nothing below the
/// CLI reads the process environment directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub hf_api_key: Option<String>,
    pub hf_model: String,
    /// Call the hosted inference API instead of browsing the public model page.
    pub hf_use_api: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            hf_api_key: None,
            hf_model: DEFAULT_HF_MODEL.to_string(),
            hf_use_api: false,
        }
    }
}

impl Settings {
    /// Load `.env` from the working directory (if any), then read the
    /// process environment.
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            openai_api_key: non_empty("OPENAI_API_KEY"),
            openai_model: non_empty("OPENAI_MODEL")
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            hf_api_key: non_empty("HF_API_KEY"),
            hf_model: non_empty("HF_MODEL").unwrap_or_else(|| DEFAULT_HF_MODEL.to_string()),
            hf_use_api: non_empty("HF_USE_API")
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }

    /// Replace keys with explicitly supplied values; `None` keeps the
    /// current value.
    pub fn with_key_overrides(mut self, openai: Option<String>, hf: Option<String>) -> Self {
        if openai.is_some() {
            self.openai_api_key = openai;
        }
        if hf.is_some() {
            self.hf_api_key = hf;
        }
        self
    }
}
