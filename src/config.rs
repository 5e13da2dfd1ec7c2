//! Configuration for a payment flow.
//!
//! `SessionConfig` carries the per-flow inputs a host supplies at `start()`;
//! `FlowSettings` tunes how settlement is simulated.

use crate::domain::money::{Amount, DEFAULT_SURCHARGE};
use crate::domain::session::PurchaseDetails;
use crate::error::Result;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Latency the simulated settlement waits before answering.
pub const DEFAULT_SETTLEMENT_LATENCY: Duration = Duration::from_millis(1500);

fn default_surcharge() -> Amount {
    DEFAULT_SURCHARGE
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub purchase_details: PurchaseDetails,
    #[serde(default)]
    pub total_amount: Amount,
    #[serde(default)]
    pub wallet_balance: Amount,
    #[serde(default = "default_surcharge")]
    pub surcharge: Amount,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            username: None,
            purchase_details: PurchaseDetails::new(),
            total_amount: Amount::ZERO,
            wallet_balance: Amount::ZERO,
            surcharge: DEFAULT_SURCHARGE,
        }
    }
}

impl SessionConfig {
    pub fn new(total_amount: Amount, wallet_balance: Amount) -> Self {
        Self {
            total_amount,
            wallet_balance,
            ..Self::default()
        }
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.purchase_details.insert(key.into(), value.into());
        self
    }

    pub fn details(mut self, details: PurchaseDetails) -> Self {
        self.purchase_details.extend(details);
        self
    }

    pub fn surcharge(mut self, surcharge: Amount) -> Self {
        self.surcharge = surcharge;
        self
    }

    /// Reads a JSON session description from disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSettings {
    pub settlement_latency: Duration,
    /// Fixes the simulated failure draw; `None` uses OS entropy.
    pub seed: Option<u64>,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            settlement_latency: DEFAULT_SETTLEMENT_LATENCY,
            seed: None,
        }
    }
}
