//! Service configuration.

use std::path::Path;

use herald_ledger::LedgerConfig;
use serde::{Deserialize, Serialize};

use crate::error::{HeraldError, Result};

/// Configuration for [`Herald`](crate::Herald).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeraldConfig {
    pub ledger: LedgerConfig,
    /// Save a snapshot after this many committed operations.
    ///
    /// Reopening resumes from the latest snapshot, so operations committed
    /// after it must be resubmitted by the caller.
    pub snapshot_interval: u64,
}

impl Default for HeraldConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig::default(),
            snapshot_interval: 1,
        }
    }
}

impl HeraldConfig {
    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| HeraldError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            HeraldError::Config(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.snapshot_interval == 0 {
            return Err(HeraldError::Config("snapshot_interval must be positive".into()));
        }
        self.ledger
            .validate()
            .map_err(|e| HeraldError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(HeraldConfig::from_json("{}").unwrap(), HeraldConfig::default());
    }

    #[test]
    fn test_nested_override() {
        let config = HeraldConfig::from_json(
            r#"{ "snapshot_interval": 16, "ledger": { "delegation_fee": 1 } }"#,
        )
        .unwrap();
        assert_eq!(config.snapshot_interval, 16);
        assert_eq!(config.ledger.delegation_fee, 1);
        assert_eq!(config.ledger.min_contribution, LedgerConfig::default().min_contribution);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(matches!(
            HeraldConfig::from_json(r#"{ "snapshot_interval": 0 }"#),
            Err(HeraldError::Config(_))
        ));
        assert!(matches!(
            HeraldConfig::from_json(r#"{ "ledger": { "min_contribution": 10, "max_contribution": 5 } }"#),
            Err(HeraldError::Config(_))
        ));
        assert!(matches!(
            HeraldConfig::from_json("not json"),
            Err(HeraldError::Config(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("herald.json");
        std::fs::write(&path, r#"{ "snapshot_interval": 4 }"#).unwrap();
        assert_eq!(HeraldConfig::from_file(&path).unwrap().snapshot_interval, 4);
        assert!(HeraldConfig::from_file(dir.path().join("missing.json")).is_err());
    }
}
