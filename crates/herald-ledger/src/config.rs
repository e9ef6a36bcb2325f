//! Ledger configuration.

use herald_core::{Address, Amount};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

/// One whole token in 18-decimal fixed point.
pub const TOKEN: Amount = 1_000_000_000_000_000_000;

/// Minimum stake to create a channel.
pub const DEFAULT_MIN_CONTRIBUTION: Amount = 50 * TOKEN;

/// Maximum stake to create a channel.
pub const DEFAULT_MAX_CONTRIBUTION: Amount = 250_000 * 50 * TOKEN;

/// Fee a channel owner pays per delegated subscription.
pub const DEFAULT_DELEGATION_FEE: Amount = TOKEN / 10;

/// Configuration for the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Lower bound on a channel's pool contribution, inclusive.
    pub min_contribution: Amount,
    /// Upper bound on a channel's pool contribution, inclusive.
    pub max_contribution: Amount,
    /// Charged to the channel owner on every delegated subscription.
    pub delegation_fee: Amount,
    /// The ledger's own account: custodian of the pool and owner of the
    /// promoter channel.
    pub protocol: Address,
    /// Owner of the protocol announcement channel.
    pub admin: Address,
    /// Owner of the system alert channel.
    pub alerter: Address,
    pub alerter_metadata: String,
    pub admin_metadata: String,
    pub promoter_metadata: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            min_contribution: DEFAULT_MIN_CONTRIBUTION,
            max_contribution: DEFAULT_MAX_CONTRIBUTION,
            delegation_fee: DEFAULT_DELEGATION_FEE,
            protocol: Address::from_label("herald.protocol"),
            admin: Address::from_label("herald.admin"),
            alerter: Address::ZERO,
            alerter_metadata: "herald/alerts".to_string(),
            admin_metadata: "herald/announcements".to_string(),
            promoter_metadata: "herald/promoter".to_string(),
        }
    }
}

impl LedgerConfig {
    /// Whether `amount` is an acceptable channel contribution.
    pub fn contribution_in_range(&self, amount: Amount) -> bool {
        (self.min_contribution..=self.max_contribution).contains(&amount)
    }

    /// Reject configs genesis cannot bootstrap from.
    pub fn validate(&self) -> Result<()> {
        if self.min_contribution == 0 {
            return Err(LedgerError::InvalidConfig(
                "min_contribution must be positive".into(),
            ));
        }
        if self.min_contribution > self.max_contribution {
            return Err(LedgerError::InvalidConfig(
                "min_contribution exceeds max_contribution".into(),
            ));
        }
        if self.admin == self.alerter {
            return Err(LedgerError::InvalidConfig(
                "admin and alerter must differ".into(),
            ));
        }
        Ok(())
    }
}
