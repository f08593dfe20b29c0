use std::time::Duration;

use serde::{Deserialize, Serialize};

use castore_types::StorePath;

use crate::error::{StoreError, StoreResult};

/// Configuration shared by the bundled store backends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory that full path strings are rendered under.
    pub store_dir: String,
    /// Whether root acquisition really pins paths. When `false`, roots are
    /// simulated: witnesses are issued but nothing is protected.
    pub temp_roots: bool,
    /// Per-operation limit for suspending queries, in milliseconds.
    /// `None` disables the limit; TOML cannot express it, so an absent key
    /// means the default.
    pub query_timeout_ms: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_dir: StorePath::DEFAULT_STORE_DIR.to_string(),
            temp_roots: true,
            query_timeout_ms: Some(30_000),
        }
    }
}

impl StoreConfig {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> StoreResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> StoreResult<String> {
        toml::to_string(self).map_err(|e| StoreError::Config(e.to_string()))
    }

    pub fn validate(&self) -> StoreResult<()> {
        if !self.store_dir.starts_with('/') {
            return Err(StoreError::Config(format!(
                "store_dir must be absolute, got {:?}",
                self.store_dir
            )));
        }
        if self.store_dir.len() > 1 && self.store_dir.ends_with('/') {
            return Err(StoreError::Config(format!(
                "store_dir must not end with '/', got {:?}",
                self.store_dir
            )));
        }
        if self.query_timeout_ms == Some(0) {
            return Err(StoreError::Config(
                "query_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = StoreConfig::default();
        assert_eq!(c.store_dir, "/nix/store");
        assert!(c.temp_roots);
        assert_eq!(c.query_timeout(), Some(Duration::from_secs(30)));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_toml_takes_defaults() {
        let c = StoreConfig::from_toml_str("temp_roots = false\n").unwrap();
        assert!(!c.temp_roots);
        assert_eq!(c.store_dir, "/nix/store");
        assert_eq!(c.query_timeout_ms, Some(30_000));
    }

    #[test]
    fn full_toml() {
        let c = StoreConfig::from_toml_str(
            "store_dir = \"/gnu/store\"\ntemp_roots = true\nquery_timeout_ms = 250\n",
        )
        .unwrap();
        assert_eq!(c.store_dir, "/gnu/store");
        assert_eq!(c.query_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn toml_roundtrip() {
        let c = StoreConfig {
            store_dir: "/tmp/store".into(),
            temp_roots: false,
            query_timeout_ms: Some(5),
        };
        let text = c.to_toml_string().unwrap();
        assert_eq!(StoreConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn rejects_bad_store_dir() {
        assert!(matches!(
            StoreConfig::from_toml_str("store_dir = \"relative/store\"\n"),
            Err(StoreError::Config(_))
        ));
        assert!(matches!(
            StoreConfig::from_toml_str("store_dir = \"/nix/store/\"\n"),
            Err(StoreError::Config(_))
        ));
    }

    #[test]
    fn rejects_zero_timeout() {
        assert!(StoreConfig::from_toml_str("query_timeout_ms = 0\n").is_err());
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            StoreConfig::from_toml_str("temp_roots = \"maybe\"\n"),
            Err(StoreError::Config(_))
        ));
    }
}
