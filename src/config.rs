// src/config.rs

use std::env;
use std::time::Duration;

use dotenvy::dotenv;
use url::Url;

/// Experience points awarded for each correct answer in a submitted test.
pub const XP_PER_CORRECT_ANSWER: i64 = 10;

/// Experience points needed to climb one level.
pub const XP_PER_LEVEL: i64 = 100;

/// Countdown for a single question while a session is in progress.
pub const QUESTION_TIME_LIMIT_SECS: u64 = 60;

/// Number of most recently earned badges shown on the stats view.
pub const RECENT_BADGES_LIMIT: i64 = 5;

const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_OPENROUTER_MODEL: &str = "anthropic/claude-3-haiku";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub llm: LlmConfig,
}

/// Settings for the chat-completion provider used for explanations.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// When unset the provider is disabled and every explanation uses the fallback text.
    pub api_key: Option<String>,
    pub base_url: Url,
    pub model: String,
    pub timeout: Duration,
    /// Sent as `HTTP-Referer`, OpenRouter uses it for attribution.
    pub app_url: Option<String>,
    pub app_title: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: Url::parse(DEFAULT_OPENROUTER_BASE_URL).expect("default base url is valid"),
            model: DEFAULT_OPENROUTER_MODEL.to_string(),
            timeout: Duration::from_secs(15),
            app_url: None,
            app_title: "Exam Prep".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60 * 60 * 24);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let admin_email = env::var("ADMIN_EMAIL").ok();
        let admin_password = env::var("ADMIN_PASSWORD").ok();

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_email,
            admin_password,
            llm: LlmConfig::from_env(),
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_key = env::var("OPENROUTER_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let base_url = match env::var("OPENROUTER_BASE_URL") {
            Ok(raw) => Url::parse(&raw).unwrap_or_else(|e| {
                tracing::warn!("Invalid OPENROUTER_BASE_URL '{}': {}, using default", raw, e);
                defaults.base_url.clone()
            }),
            Err(_) => defaults.base_url.clone(),
        };

        let model = env::var("OPENROUTER_MODEL").unwrap_or(defaults.model);

        let timeout = env::var("LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        Self {
            api_key,
            base_url,
            model,
            timeout,
            app_url: env::var("APP_URL").ok(),
            app_title: env::var("APP_TITLE").unwrap_or(defaults.app_title),
        }
    }

    /// Full URL of the chat-completions endpoint.
    pub fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.base_url.as_str().trim_end_matches('/')
        )
    }
}
