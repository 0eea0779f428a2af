use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const DEFAULT_API_PREFIX: &str = "/api";
pub const DEFAULT_CREDENTIAL_DB: &str = "./personabench.sqlite";

#[derive(Debug, Clone)]
pub struct Config {
    /// Origin of the orchestration service, e.g. `http://localhost:8000`.
    pub api_base: String,
    /// Path prefix prepended to relative API paths.
    pub api_prefix: String,
    /// SQLite file holding the persisted admin key. Empty disables persistence.
    pub credential_db: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            credential_db: DEFAULT_CREDENTIAL_DB.to_string(),
            timeout_secs: 15,
            max_retries: 2,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            api_base: std::env::var("PERSONABENCH_API_BASE").unwrap_or(d.api_base),
            api_prefix: std::env::var("PERSONABENCH_API_PREFIX").unwrap_or(d.api_prefix),
            credential_db: std::env::var("PERSONABENCH_CREDENTIAL_DB").unwrap_or(d.credential_db),
            timeout_secs: std::env::var("PERSONABENCH_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.timeout_secs),
            max_retries: std::env::var("PERSONABENCH_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.max_retries),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Prefix normalised to a single leading slash and no trailing slash.
    pub fn normalized_prefix(&self) -> String {
        let trimmed = self.api_prefix.trim().trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_prefix() {
        let mut cfg = Config::default();
        assert_eq!(cfg.normalized_prefix(), "/api");
        cfg.api_prefix = "api/v2/".to_string();
        assert_eq!(cfg.normalized_prefix(), "/api/v2");
        cfg.api_prefix = "/".to_string();
        assert_eq!(cfg.normalized_prefix(), "");
    }
}
