//! Data models and structures
//!
//! Defines the caption records, the HTTP request/response bodies, and the
//! environment-driven service configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Category assigned when the model omits one or returns free text.
pub const DEFAULT_CATEGORY: &str = "General";

/// Tone used when the caller does not pick one.
pub const DEFAULT_TONE: &str = "casual";

/// Categories requested when the caller sends none.
pub const DEFAULT_CATEGORIES: [&str; 3] = ["Aesthetic", "Funny", "Inspirational"];

/// One generated caption suggestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Caption {
    pub text: String,
    pub category: String,
    pub hashtags: Vec<String>,
    pub emojis: Vec<String>,
}

impl Caption {
    /// Caption wrapping free text the model returned instead of JSON.
    ///
    /// The text is kept exactly as received.
    pub fn from_raw_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            hashtags: Vec::new(),
            emojis: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Body of `POST /api/generate-captions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCaptionsRequest {
    #[serde(default)]
    pub image_data: Vec<String>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default = "default_true")]
    pub include_hashtags: bool,
    #[serde(default = "default_true")]
    pub include_emojis: bool,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
}

/// Generation options after defaults have been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    pub tone: String,
    pub include_hashtags: bool,
    pub include_emojis: bool,
    pub categories: Vec<String>,
}

impl GenerationOptions {
    pub fn resolve(
        tone: Option<&str>,
        include_hashtags: bool,
        include_emojis: bool,
        categories: Option<&[String]>,
    ) -> Self {
        let tone = tone
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TONE)
            .to_string();

        let mut resolved: Vec<String> = Vec::new();
        for category in categories.unwrap_or_default() {
            let category = category.trim();
            if !category.is_empty() && !resolved.iter().any(|c| c == category) {
                resolved.push(category.to_string());
            }
        }
        if resolved.is_empty() {
            resolved = DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect();
        }

        Self {
            tone,
            include_hashtags,
            include_emojis,
            categories: resolved,
        }
    }
}

impl From<&GenerateCaptionsRequest> for GenerationOptions {
    fn from(request: &GenerateCaptionsRequest) -> Self {
        Self::resolve(
            request.tone.as_deref(),
            request.include_hashtags,
            request.include_emojis,
            request.categories.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionsResponse {
    pub captions: Vec<Caption>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    OpenAi,
    Gemini,
}

impl AiProvider {
    pub fn parse(value: &str) -> crate::Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            other => Err(crate::Error::Config(format!(
                "Unsupported AI_PROVIDER '{}'. Expected 'openai' or 'gemini'",
                other
            ))),
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Gemini => "gemini-2.0-flash",
        }
    }
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: AiProvider,
    pub api_key: String,
    pub model: String,
    /// Override for the provider's API origin (proxies, compatible gateways).
    pub base_url: Option<String>,
    pub max_images: usize,
    pub max_output_tokens: u32,
    pub max_captions: usize,
    pub cache_max_entries: usize,
    pub cache_ttl: Duration,
    pub request_timeout: Duration,
    pub bind_addr: String,
    pub max_body_bytes: usize,
    /// Ask for schema-validated output instead of plain JSON mode.
    pub structured_output: bool,
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match lookup("AI_PROVIDER") {
            Some(value) => AiProvider::parse(&value)?,
            None => AiProvider::OpenAi,
        };

        let key_var = match provider {
            AiProvider::OpenAi => "OPENAI_API_KEY",
            AiProvider::Gemini => "GEMINI_API_KEY",
        };
        let api_key = lookup(key_var)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| crate::Error::Config(format!("{} not set", key_var)))?;

        let model = lookup("CAPTION_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| provider.default_model().to_string());

        Ok(Self {
            provider,
            api_key,
            model,
            base_url: lookup("AI_BASE_URL").filter(|u| !u.trim().is_empty()),
            max_images: parse_var(&lookup, "MAX_IMAGES", 3)?,
            max_output_tokens: parse_var(&lookup, "MAX_OUTPUT_TOKENS", 1000)?,
            max_captions: parse_var(&lookup, "MAX_CAPTIONS", 10)?,
            cache_max_entries: parse_var(&lookup, "CACHE_MAX_ENTRIES", 256)?,
            cache_ttl: Duration::from_secs(parse_var(&lookup, "CACHE_TTL_SECS", 3600)?),
            request_timeout: Duration::from_secs(parse_var(&lookup, "REQUEST_TIMEOUT_SECS", 60)?),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            max_body_bytes: parse_var(&lookup, "MAX_BODY_BYTES", 25 * 1024 * 1024)?,
            structured_output: parse_var(&lookup, "STRUCTURED_OUTPUT", true)?,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> crate::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| crate::Error::Config(format!("{} has an invalid value '{}'", key, raw))),
        None => Ok(default),
    }
}
