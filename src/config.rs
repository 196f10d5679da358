use crate::client::LlmConfig;
use crate::types::Credentials;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Defaults read from the environment for hosts and demos.
///
/// The pipeline never reads the environment itself; this only seeds the
/// credentials and model a host puts on its requests.
///
/// | Variable              | Default                     |
/// |-----------------------|-----------------------------|
/// | `OPENAI_API_KEY`      | (required)                  |
/// | `OPENAI_API_BASE_URL` | `https://api.openai.com/v1` |
/// | `AI_MODEL`            | `gpt-4`                     |
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub credentials: Credentials,
    pub llm: LlmConfig,
}

impl EnvConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = non_empty("OPENAI_API_KEY")
            .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY is not set"))?;
        let base_url = non_empty("OPENAI_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let mut llm = LlmConfig::default();
        if let Some(model) = non_empty("AI_MODEL") {
            llm.model = model;
        }

        Ok(Self {
            credentials: Credentials::new(api_key, base_url),
            llm,
        })
    }
}
