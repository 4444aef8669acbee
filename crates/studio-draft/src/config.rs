//! Engine configuration
//!
//! Loaded from TOML (all keys optional) with an environment override for
//! the debounce window:
//!
//! ```toml
//! debounce_ms = 1000
//! child_flush_timeout_ms = 5000
//! ```

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding `debounce_ms`
pub const DEBOUNCE_ENV: &str = "STUDIO_DEBOUNCE_MS";

/// Default debounce window
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

/// Panel engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Quiet period after the last qualifying edit before a save fires
    pub debounce_ms: u64,
    /// Upper bound on each child editor flush during close
    pub child_flush_timeout_ms: Option<u64>,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With debounce window
    #[inline]
    #[must_use]
    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With child flush timeout
    #[inline]
    #[must_use]
    pub fn with_child_flush_timeout(mut self, timeout: Duration) -> Self {
        self.child_flush_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Debounce window as a duration
    #[inline]
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Child flush timeout as a duration
    #[inline]
    #[must_use]
    pub fn child_flush_timeout(&self) -> Option<Duration> {
        self.child_flush_timeout_ms.map(Duration::from_millis)
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns `EngineError::Config` on malformed TOML or invalid values
    pub fn from_toml_str(text: &str) -> Result<Self, EngineError> {
        let config: Self =
            toml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file, then apply environment overrides
    ///
    /// # Errors
    /// Returns `EngineError::Config` if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)?.with_env_overrides()
    }

    /// Apply `STUDIO_DEBOUNCE_MS` if set
    ///
    /// # Errors
    /// Returns `EngineError::Config` if the variable is not a valid window
    pub fn with_env_overrides(self) -> Result<Self, EngineError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, EngineError> {
        if let Some(raw) = lookup(DEBOUNCE_ENV) {
            self.debounce_ms = raw
                .trim()
                .parse()
                .map_err(|_| EngineError::Config(format!("{DEBOUNCE_ENV}={raw} is not a number")))?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject values the scheduler cannot work with
    ///
    /// # Errors
    /// Returns `EngineError::Config` for a zero debounce window
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.debounce_ms == 0 {
            return Err(EngineError::Config(
                "debounce_ms must be greater than zero".to_string(),
            ));
        }
        if self.child_flush_timeout_ms == Some(0) {
            return Err(EngineError::Config(
                "child_flush_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            child_flush_timeout_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_to_one_second() {
        let config = EngineConfig::new();
        assert_eq!(config.debounce(), Duration::from_millis(1000));
        assert_eq!(config.child_flush_timeout(), None);
    }

    #[test]
    fn parses_partial_toml() {
        let config = EngineConfig::from_toml_str("debounce_ms = 250").unwrap();
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.child_flush_timeout_ms, None);
    }

    #[test]
    fn rejects_unknown_keys_and_zero_window() {
        assert!(matches!(
            EngineConfig::from_toml_str("debounce = 5"),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("debounce_ms = 0"),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn env_override_wins() {
        let config = EngineConfig::new()
            .with_overrides_from(|key| (key == DEBOUNCE_ENV).then(|| "400".to_string()))
            .unwrap();
        assert_eq!(config.debounce_ms, 400);

        let bad = EngineConfig::new().with_overrides_from(|_| Some("soon".to_string()));
        assert!(bad.is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "debounce_ms = 750\nchild_flush_timeout_ms = 3000").unwrap();

        let config = EngineConfig::from_toml_str(&std::fs::read_to_string(file.path()).unwrap())
            .unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(750));
        assert_eq!(config.child_flush_timeout(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = EngineConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
