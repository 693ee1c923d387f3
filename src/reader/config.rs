use std::time::Duration;

use crate::shared::AppError;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Connection settings for the reader service
#[derive(Clone)]
pub struct ReaderConfig {
    pub base_url: String,
    pub private_key: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for ReaderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderConfig")
            .field("base_url", &self.base_url)
            .field("private_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ReaderConfig {
    pub fn new(base_url: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            private_key: private_key.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads `RR_URL`, `RR_PRIVATE_KEY` and the optional `RR_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| AppError::Configuration(format!("{key} must be set")))
        };

        let timeout_secs = lookup("RR_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Self::new(required("RR_URL")?, required("RR_PRIVATE_KEY")?)
            .with_timeout(Duration::from_secs(timeout_secs)))
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.base_url.is_empty() {
            return Err(AppError::Configuration("RR_URL must be set".to_string()));
        }
        if self.private_key.is_empty() {
            return Err(AppError::Configuration(
                "RR_PRIVATE_KEY must be set".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_reads_required_values() {
        let config = ReaderConfig::from_lookup(lookup_from(&[
            ("RR_URL", "http://reader.local"),
            ("RR_PRIVATE_KEY", "xyz"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "http://reader.local");
        assert_eq!(config.private_key, "xyz");
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_from_lookup_reads_timeout() {
        let config = ReaderConfig::from_lookup(lookup_from(&[
            ("RR_URL", "http://reader.local"),
            ("RR_PRIVATE_KEY", "xyz"),
            ("RR_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();

        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_missing_values_are_configuration_errors() {
        let result = ReaderConfig::from_lookup(lookup_from(&[("RR_PRIVATE_KEY", "xyz")]));
        assert!(matches!(result, Err(AppError::Configuration(msg)) if msg.contains("RR_URL")));

        let result = ReaderConfig::from_lookup(lookup_from(&[
            ("RR_URL", "http://reader.local"),
            ("RR_PRIVATE_KEY", ""),
        ]));
        assert!(
            matches!(result, Err(AppError::Configuration(msg)) if msg.contains("RR_PRIVATE_KEY"))
        );
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let config = ReaderConfig::new("http://reader.local", "super-secret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
    }
}
