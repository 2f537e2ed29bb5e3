use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::reconciliation::fees::AnticipationPolicyKind;

pub const DEFAULT_API_BASE_URL: &str = "https://digitalmanager.guru/api/v2";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub guru_api_token: String,
    pub guru_api_base_url: String,
    pub bind_address: String,
    pub request_timeout_secs: u64,
    /// Widest date window sent to the upstream in a single query
    pub max_chunk_days: u32,
    /// Window used when a request carries no dates
    pub default_lookback_days: u32,
    pub anticipation_policy: AnticipationPolicyKind,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        Self::from_environment(config::Environment::default())
    }

    pub fn from_environment(environment: config::Environment) -> AppResult<Self> {
        let config: Config = config::Config::builder()
            .set_default("guru_api_base_url", DEFAULT_API_BASE_URL)?
            .set_default("bind_address", "0.0.0.0:3000")?
            .set_default("request_timeout_secs", 30i64)?
            .set_default("max_chunk_days", 180i64)?
            .set_default("default_lookback_days", 7i64)?
            .set_default("anticipation_policy", "per_installment")?
            .add_source(environment.try_parsing(true))
            .build()?
            .try_deserialize()?;

        if config.guru_api_token.trim().is_empty() {
            return Err(AppError::Config("GURU_API_TOKEN must not be empty".to_string()));
        }
        if config.max_chunk_days == 0 {
            return Err(AppError::Config("MAX_CHUNK_DAYS must be at least 1".to_string()));
        }

        Ok(config)
    }
}
