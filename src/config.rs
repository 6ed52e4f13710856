use crate::errors::AppError;
use crate::relay::{DEFAULT_API_URL, DEFAULT_MODEL};

const DEFAULT_PORT: u16 = 8080;

/// Process configuration, read from the environment (and `.env` in development).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub groq_api_key: String,
    pub groq_api_url: String,
    pub groq_model: String,
    /// Message store endpoints are only mounted when this is set.
    pub database_url: Option<String>,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let groq_api_key = non_empty("GROQ_API_KEY").ok_or_else(|| AppError::MissingConfig {
            name: "GROQ_API_KEY".to_string(),
        })?;

        let port = match non_empty("PORT") {
            Some(raw) => raw.parse().map_err(|_| AppError::InvalidConfig {
                name: "PORT".to_string(),
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            groq_api_key,
            groq_api_url: non_empty("GROQ_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            groq_model: non_empty("GROQ_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            database_url: non_empty("DATABASE_URL"),
            port,
        })
    }
}
