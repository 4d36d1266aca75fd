use anyhow::{bail, Context, Result};
use std::time::Duration;

use crate::models::DEFAULT_CURRENCY;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Testnet,
    Production,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,

    // AgentVerse API (invoice service)
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub request_timeout_secs: u64,

    pub default_currency: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let environment = Self::parse_environment(lookup("ENVIRONMENT"))?;

        let config = Self {
            environment,
            api_base_url: lookup("API_BASE_URL")
                .unwrap_or_else(|| "http://localhost:4101".to_string())
                .trim_end_matches('/')
                .to_string(),
            api_token: lookup("API_TOKEN").filter(|t| !t.trim().is_empty()),
            request_timeout_secs: lookup("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|| "30".to_string())
                .parse()
                .context("Invalid REQUEST_TIMEOUT_SECS")?,
            default_currency: lookup("DEFAULT_CURRENCY")
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn parse_environment(value: Option<String>) -> Result<Environment> {
        let env = value.unwrap_or_else(|| "development".to_string());

        match env.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "testnet" | "test" => Ok(Environment::Testnet),
            "production" | "prod" => Ok(Environment::Production),
            _ => bail!("Unknown environment: {}", env),
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.api_base_url.starts_with("http") {
            bail!("API_BASE_URL must be HTTP(S) URL");
        }
        if self.request_timeout_secs == 0 {
            bail!("REQUEST_TIMEOUT_SECS must be greater than zero");
        }
        if self.default_currency.trim().is_empty() {
            bail!("DEFAULT_CURRENCY must not be empty");
        }

        tracing::debug!(
            "Configuration validated for {:?} environment",
            self.environment
        );

        Ok(())
    }
}
