use crate::config::FlowSettings;
use crate::domain::money::{Amount, ChargeBreakdown};
use crate::domain::ports::{FailureReason, SettlementBackend, SettlementOutcome, SettlementRequest};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Settlement stand-in that checks the wallet balance locally.
///
/// A covered total always succeeds. A shortfall always fails, with the reason
/// picked by a fair coin flip that does not depend on how large the shortfall is.
pub struct SimulatedSettlement {
    latency: Duration,
    rng: Mutex<StdRng>,
}

impl SimulatedSettlement {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Same as `new` but with a reproducible failure draw.
    pub fn seeded(latency: Duration, seed: u64) -> Self {
        Self {
            latency,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_settings(settings: &FlowSettings) -> Self {
        match settings.seed {
            Some(seed) => Self::seeded(settings.settlement_latency, seed),
            None => Self::new(settings.settlement_latency),
        }
    }

    /// Outcome for a given balance; `coin` is only consulted on a shortfall.
    pub fn decide(breakdown: &ChargeBreakdown, balance: Amount, coin: bool) -> SettlementOutcome {
        if breakdown.is_covered_by(balance) {
            SettlementOutcome::Settled
        } else if coin {
            SettlementOutcome::Declined(FailureReason::TransactionError)
        } else {
            SettlementOutcome::Declined(FailureReason::InsufficientFunds)
        }
    }
}

#[async_trait]
impl SettlementBackend for SimulatedSettlement {
    #[instrument(skip_all, fields(session = request.session))]
    async fn settle(&self, request: SettlementRequest) -> SettlementOutcome {
        tokio::time::sleep(self.latency).await;

        let coin = self.rng.lock().await.gen_bool(0.5);
        let outcome = Self::decide(&request.breakdown, request.wallet_balance, coin);
        debug!(
            total = %request.breakdown.total,
            balance = %request.wallet_balance,
            ?outcome,
            "simulated settlement finished"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::Passcode;
    use rust_decimal_macros::dec;

    fn request(total: rust_decimal::Decimal, balance: rust_decimal::Decimal) -> SettlementRequest {
        SettlementRequest {
            session: 1,
            username: "alice".to_string(),
            breakdown: ChargeBreakdown::compute(
                Amount::new(total).unwrap(),
                Amount::new(dec!(1.50)).unwrap(),
            )
            .unwrap(),
            wallet_balance: Amount::new(balance).unwrap(),
            passcode: Passcode::new("1234").unwrap(),
        }
    }

    #[test]
    fn test_decide_success_ignores_coin() {
        let req = request(dec!(20), dec!(21.50));
        for coin in [true, false] {
            assert_eq!(
                SimulatedSettlement::decide(&req.breakdown, req.wallet_balance, coin),
                SettlementOutcome::Settled
            );
        }
    }

    #[test]
    fn test_decide_shortfall_reason_follows_coin() {
        let req = request(dec!(50), dec!(10));
        assert_eq!(
            SimulatedSettlement::decide(&req.breakdown, req.wallet_balance, true),
            SettlementOutcome::Declined(FailureReason::TransactionError)
        );
        assert_eq!(
            SimulatedSettlement::decide(&req.breakdown, req.wallet_balance, false),
            SettlementOutcome::Declined(FailureReason::InsufficientFunds)
        );
    }

    #[tokio::test]
    async fn test_shortfall_reaches_both_reasons() {
        let backend = SimulatedSettlement::new(Duration::ZERO);
        let mut transaction_errors = 0;
        let mut insufficient = 0;
        for _ in 0..200 {
            match backend.settle(request(dec!(50), dec!(10))).await {
                SettlementOutcome::Declined(FailureReason::TransactionError) => transaction_errors += 1,
                SettlementOutcome::Declined(FailureReason::InsufficientFunds) => insufficient += 1,
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        assert!(transaction_errors > 0);
        assert!(insufficient > 0);
    }

    #[tokio::test]
    async fn test_seeded_is_reproducible() {
        let a = SimulatedSettlement::seeded(Duration::ZERO, 7);
        let b = SimulatedSettlement::seeded(Duration::ZERO, 7);
        for _ in 0..20 {
            assert_eq!(
                a.settle(request(dec!(50), dec!(10))).await,
                b.settle(request(dec!(50), dec!(10))).await
            );
        }
    }

    #[tokio::test]
    async fn test_tiny_shortfall_still_fails() {
        let backend = SimulatedSettlement::new(Duration::ZERO);
        let outcome = backend.settle(request(dec!(20), dec!(21.49))).await;
        assert!(matches!(outcome, SettlementOutcome::Declined(_)));
    }
}
