use std::net::SocketAddr;
use std::time::Duration;

use advisor_common::openai::OpenAiClientConfig;

use crate::error::AppError;

pub const DEFAULT_MODEL: &str = "openai/gpt-oss-20b:free";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1172;

/// Settings for the completion request built by the extractor.
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Service configuration loaded from environment variables.
///
/// Nothing is required at startup. A missing `OPENROUTER_API_KEY` is reported per
/// request so the service can still answer health checks and input errors.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    /// Serve the MCP tool surface on stdio instead of HTTP.
    pub mcp_stdio: bool,
    pub reddit_base_url: String,
    pub reddit_timeout: Duration,
    pub webhook_url: Option<String>,
    pub webhook_timeout: Duration,
    pub completion: CompletionSettings,
    pub openai: OpenAiClientConfig,
}

impl Config {
    /// Optional:
    /// - `ADVISOR_LISTEN_ADDR` (default "0.0.0.0:3000")
    /// - `MCP_STDIO`
    /// - `REDDIT_BASE_URL` (default "https://www.reddit.com"), `REDDIT_TIMEOUT_SECS` (default 10)
    /// - `DISCORD_WEBHOOK_URL`, `DISCORD_WEBHOOK_TIMEOUT_SECS` (default 5)
    /// - `OPENROUTER_MODEL`, `OPENROUTER_TEMPERATURE`, `OPENROUTER_MAX_TOKENS`
    /// - everything read by [`OpenAiClientConfig::from_env`]
    pub fn from_env() -> Result<Self, AppError> {
        let listen_raw =
            std::env::var("ADVISOR_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let listen_addr = listen_raw.parse::<SocketAddr>().map_err(|e| {
            AppError::Config(format!("invalid ADVISOR_LISTEN_ADDR {listen_raw:?}: {e}"))
        })?;

        let reddit_base_url = std::env::var("REDDIT_BASE_URL")
            .unwrap_or_else(|_| "https://www.reddit.com".to_string())
            .trim_end_matches('/')
            .to_string();

        let completion = CompletionSettings {
            model: std::env::var("OPENROUTER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            temperature: env_parse("OPENROUTER_TEMPERATURE").unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: env_parse("OPENROUTER_MAX_TOKENS").unwrap_or(DEFAULT_MAX_TOKENS),
        };

        Ok(Self {
            listen_addr,
            mcp_stdio: std::env::var("MCP_STDIO").is_ok(),
            reddit_base_url,
            reddit_timeout: Duration::from_secs(env_parse("REDDIT_TIMEOUT_SECS").unwrap_or(10)),
            webhook_url: std::env::var("DISCORD_WEBHOOK_URL").ok(),
            webhook_timeout: Duration::from_secs(
                env_parse("DISCORD_WEBHOOK_TIMEOUT_SECS").unwrap_or(5),
            ),
            completion,
            openai: OpenAiClientConfig::from_env(),
        })
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse::<T>().ok())
}
