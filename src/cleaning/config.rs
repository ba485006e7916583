use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::cleaning::constants::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanConfig {
    pub base_url: String,
    pub assistant_id: String,
    pub temperature: f64,
    pub request_timeout_seconds: u64,
    pub output_file: String,
    pub verbose: bool,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            assistant_id: DEFAULT_ASSISTANT_ID.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            output_file: "cleaned.csv".to_string(),
            verbose: false,
        }
    }
}

impl CleanConfig {
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &std::path::Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(anyhow::anyhow!("Base URL must not be empty"));
        }

        if self.assistant_id.trim().is_empty() {
            return Err(anyhow::anyhow!("Assistant id must not be empty"));
        }

        if self.temperature < MIN_TEMPERATURE || self.temperature > MAX_TEMPERATURE {
            return Err(anyhow::anyhow!(
                "Temperature must be between {} and {}",
                MIN_TEMPERATURE, MAX_TEMPERATURE
            ));
        }

        if self.request_timeout_seconds < MIN_REQUEST_TIMEOUT_SECONDS
            || self.request_timeout_seconds > MAX_REQUEST_TIMEOUT_SECONDS {
            return Err(anyhow::anyhow!(
                "Request timeout must be between {} and {} seconds",
                MIN_REQUEST_TIMEOUT_SECONDS, MAX_REQUEST_TIMEOUT_SECONDS
            ));
        }

        Ok(())
    }

    pub fn endpoint(&self, path: &str) -> String {
        if self.base_url.ends_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}
