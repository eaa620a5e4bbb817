use crate::error::{PolicyError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PolicyConfig {
    /// Upper bound on connecting plus reading the initial config and first server list.
    pub handshake_timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_ms: 10_000,
            connect_timeout_ms: 5_000,
        }
    }
}

impl PolicyConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let config: PolicyConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.handshake_timeout_ms == 0 {
            return Err(PolicyError::ConfigError(
                "handshake_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = PolicyConfig::from_yaml_str("connect_timeout_ms: 250\n").unwrap();
        assert_eq!(config.connect_timeout(), Duration::from_millis(250));
        assert_eq!(config.handshake_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn zero_handshake_timeout_is_rejected() {
        let err = PolicyConfig::from_yaml_str("handshake_timeout_ms: 0\n").unwrap_err();
        assert!(matches!(err, PolicyError::ConfigError(_)));
    }

    #[test]
    fn unreadable_file_surfaces_io_error() {
        let err = PolicyConfig::from_file("/nonexistent/grpclb.yaml").unwrap_err();
        assert!(matches!(err, PolicyError::IoError(_)));
    }
}
