use mastery_core::gatherer::DEFAULT_QUERY_SUFFIX;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// The OpenAI-compatible chat backends the tutor can talk to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Gemini,
    Groq,
}

impl Provider {
    pub fn api_base(self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1/",
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
            Provider::Groq => "https://api.groq.com/openai/v1",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::OpenAI => "gpt-4o",
            Provider::Gemini => "gemini-2.0-flash",
            Provider::Groq => "llama-3.1-8b-instant",
        }
    }

    fn key_var(self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::Groq => "GROQ_API_KEY",
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub provider: Provider,
    pub llm_api_key: String,
    pub chat_model: String,
    pub brave_api_key: String,
    pub search_query_suffix: String,
    pub log_level: Level,
    pub prompts_path: PathBuf,
    pub catalog_path: Option<PathBuf>,
    /// `None` means remediation is never capped.
    pub max_remediation_rounds: Option<u32>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let provider_str = std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let provider = match provider_str.to_lowercase().as_str() {
            "openai" => Provider::OpenAI,
            "gemini" => Provider::Gemini,
            "groq" => Provider::Groq,
            other => {
                return Err(ConfigError::InvalidValue(
                    "LLM_PROVIDER".to_string(),
                    format!("'{}' is not one of openai, gemini, groq", other),
                ));
            }
        };

        let llm_api_key = std::env::var(provider.key_var())
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::MissingVar(format!(
                    "{} must be set for '{}' provider",
                    provider.key_var(),
                    provider_str.to_lowercase()
                ))
            })?;
        if provider == Provider::Groq && !llm_api_key.starts_with("gsk_") {
            return Err(ConfigError::InvalidValue(
                "GROQ_API_KEY".to_string(),
                "Groq keys start with 'gsk_'".to_string(),
            ));
        }

        let chat_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| provider.default_model().to_string());

        let brave_api_key = std::env::var("BRAVE_API_KEY")
            .map_err(|_| ConfigError::MissingVar("BRAVE_API_KEY".to_string()))?;

        let search_query_suffix = std::env::var("SEARCH_QUERY_SUFFIX")
            .unwrap_or_else(|_| DEFAULT_QUERY_SUFFIX.to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let prompts_path = std::env::var("PROMPTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./prompts"));

        let catalog_path = std::env::var("CATALOG_PATH").ok().map(PathBuf::from);

        let max_remediation_rounds = match std::env::var("MAX_REMEDIATION_ROUNDS") {
            Err(_) => Some(3),
            Ok(raw) if raw.eq_ignore_ascii_case("unlimited") => None,
            Ok(raw) => Some(raw.parse::<u32>().map_err(|_| {
                ConfigError::InvalidValue(
                    "MAX_REMEDIATION_ROUNDS".to_string(),
                    format!("'{}' is neither a number nor 'unlimited'", raw),
                )
            })?),
        };

        Ok(Self {
            bind_address,
            provider,
            llm_api_key,
            chat_model,
            brave_api_key,
            search_query_suffix,
            log_level,
            prompts_path,
            catalog_path,
            max_remediation_rounds,
        })
    }
}
