use super::money::{Amount, ChargeBreakdown};
use super::session::{Passcode, PurchaseDetails};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Weak};

/// Why a settlement did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FailureReason {
    TransactionError,
    InsufficientFunds,
    /// Reason supplied by a non-simulated backend.
    Other(String),
}

impl FailureReason {
    pub fn as_str(&self) -> &str {
        match self {
            FailureReason::TransactionError => "Transaction error",
            FailureReason::InsufficientFunds => "Insufficient funds",
            FailureReason::Other(reason) => reason,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of a payment session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Success,
    Failure(FailureReason),
    Cancelled,
}

/// Result of a single settlement attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    Settled,
    Declined(FailureReason),
}

impl From<SettlementOutcome> for Outcome {
    fn from(outcome: SettlementOutcome) -> Self {
        match outcome {
            SettlementOutcome::Settled => Outcome::Success,
            SettlementOutcome::Declined(reason) => Outcome::Failure(reason),
        }
    }
}

/// Everything a backend needs to settle one payment.
#[derive(Debug, Clone)]
pub struct SettlementRequest {
    pub session: u64,
    pub username: String,
    pub breakdown: ChargeBreakdown,
    pub wallet_balance: Amount,
    pub passcode: Passcode,
}

/// Presentation boundary. The controller never lays anything out itself; it only
/// asks the view to show a step.
///
/// Calls are made while the controller holds its session lock, so implementations
/// must not call back into the controller synchronously.
pub trait PaymentView: Send + Sync {
    fn request_login_input(&self);
    fn show_purchase_review(&self, details: &PurchaseDetails);
    fn show_breakdown(&self, amount: Amount, surcharge: Amount, total: Amount);
    fn show_processing_indicator(&self);
    fn report_outcome(&self, outcome: &Outcome);
}

/// Host delegate notified once per session with the terminal result.
pub trait PaymentObserver: Send + Sync {
    fn on_success(&self);
    fn on_failure(&self, reason: &str);
    fn on_cancel(&self);
}

/// Performs (or simulates) the money movement once the user has authorised it.
#[async_trait]
pub trait SettlementBackend: Send + Sync {
    async fn settle(&self, request: SettlementRequest) -> SettlementOutcome;
}

pub type PaymentViewRef = Arc<dyn PaymentView>;
pub type ObserverRef = Weak<dyn PaymentObserver>;
pub type SettlementBackendRef = Arc<dyn SettlementBackend>;
