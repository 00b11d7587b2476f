use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 60 * 60;
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

/// Settings shared by the terminal client and the HTTP server.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub addr: String,
    pub max_upload_bytes: usize,
    /// Sent as `generationConfig` only when set.
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    /// Sessions untouched for longer than this are dropped by the server.
    pub session_idle_timeout: Duration,
    pub max_sessions: usize,
}

impl Config {
    /// Reads the process environment. Call `dotenv::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("GEMINI_API_KEY environment variable not set"))?;

        let timeout_secs =
            parse_var(&lookup, "GEMINI_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS);
        let max_upload_bytes =
            parse_var(&lookup, "MAX_UPLOAD_BYTES")?.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
        let session_idle_secs =
            parse_var(&lookup, "SESSION_IDLE_SECS")?.unwrap_or(DEFAULT_SESSION_IDLE_SECS);
        let max_sessions = parse_var(&lookup, "MAX_SESSIONS")?.unwrap_or(DEFAULT_MAX_SESSIONS);
        if max_sessions == 0 {
            return Err(anyhow::anyhow!("MAX_SESSIONS must be at least 1"));
        }

        Ok(Self {
            api_key,
            model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: lookup("GEMINI_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            addr: lookup("CHATBOT_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string()),
            max_upload_bytes,
            temperature: parse_var(&lookup, "GEMINI_TEMPERATURE")?,
            max_output_tokens: parse_var(&lookup, "GEMINI_MAX_OUTPUT_TOKENS")?,
            session_idle_timeout: Duration::from_secs(session_idle_secs),
            max_sessions,
        })
    }

    /// Endpoint for a single non-streaming generation call, without the key.
    pub fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("invalid {key}: {raw}"))
        })
        .transpose()
}
