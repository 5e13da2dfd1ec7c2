use super::money::{Amount, ChargeBreakdown};
use super::ports::Outcome;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Descriptive key/value pairs shown on the purchase review (e.g. "Item" -> "Shirt").
pub type PurchaseDetails = BTreeMap<String, String>;

/// Where a payment session currently is.
///
/// `Succeeded`, `Failed` and `Cancelled` are absorbing. The passcode is entered on
/// the breakdown screen, so `AwaitingPasscode` has no incoming edge in this flow;
/// it is kept for views that split the two steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Stage {
    #[default]
    Idle,
    AwaitingLogin,
    ReviewingPurchase,
    ReviewingBreakdown,
    AwaitingPasscode,
    Processing,
    Succeeded,
    Failed,
    Cancelled,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Succeeded | Stage::Failed | Stage::Cancelled)
    }

    /// Stages from which the user may still back out.
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            Stage::AwaitingLogin | Stage::ReviewingPurchase | Stage::ReviewingBreakdown
        )
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: Stage) -> bool {
        use Stage::*;
        match (self, next) {
            (Idle, AwaitingLogin | ReviewingPurchase) => true,
            (AwaitingLogin, ReviewingPurchase) => true,
            (ReviewingPurchase, ReviewingBreakdown) => true,
            (ReviewingBreakdown, Processing) => true,
            (Processing, Succeeded | Failed) => true,
            (from, Cancelled) => from.is_cancellable(),
            _ => false,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A passcode captured for a single settlement attempt.
///
/// Never printed: `Debug` is redacted so it cannot leak through logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Passcode(String);

impl Passcode {
    /// Returns `None` for an empty entry.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.is_empty() { None } else { Some(Self(raw)) }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Passcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passcode(***)")
    }
}

/// State of one run of the payment flow.
#[derive(Debug)]
pub struct PaymentSession {
    pub(crate) id: u64,
    pub(crate) username: Option<String>,
    pub(crate) purchase_details: PurchaseDetails,
    pub(crate) wallet_balance: Amount,
    /// Computed when the session starts; shown only after `confirm`.
    pub(crate) charges: ChargeBreakdown,
    pub(crate) breakdown: Option<ChargeBreakdown>,
    pub(crate) outcome: Option<Outcome>,
    stage: Stage,
    history: Vec<Stage>,
}

impl PaymentSession {
    pub(crate) fn new(
        id: u64,
        username: Option<String>,
        purchase_details: PurchaseDetails,
        wallet_balance: Amount,
        charges: ChargeBreakdown,
    ) -> Self {
        Self {
            id,
            username: username.filter(|u| !u.is_empty()),
            purchase_details,
            wallet_balance,
            charges,
            breakdown: None,
            outcome: None,
            stage: Stage::Idle,
            history: vec![Stage::Idle],
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn has_username(&self) -> bool {
        self.username.is_some()
    }

    /// Moves to `next`, returning `false` (and staying put) on an illegal edge.
    pub(crate) fn advance(&mut self, next: Stage) -> bool {
        if !self.stage.can_transition_to(next) {
            return false;
        }
        self.stage = next;
        self.history.push(next);
        true
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            stage: self.stage,
            username: self.username.clone(),
            purchase_details: self.purchase_details.clone(),
            breakdown: self.breakdown,
            history: self.history.clone(),
            outcome: self.outcome.clone(),
        }
    }
}

/// Read-only view of a session for hosts. Never carries the passcode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub id: u64,
    pub stage: Stage,
    pub username: Option<String>,
    pub purchase_details: PurchaseDetails,
    pub breakdown: Option<ChargeBreakdown>,
    /// Every stage visited, in order, starting from `Idle`.
    pub history: Vec<Stage>,
    pub outcome: Option<Outcome>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn session(username: Option<&str>) -> PaymentSession {
        PaymentSession::new(
            1,
            username.map(str::to_string),
            PurchaseDetails::new(),
            Amount::new(dec!(30)).unwrap(),
            ChargeBreakdown::compute(
                Amount::new(dec!(20)).unwrap(),
                Amount::new(dec!(1.5)).unwrap(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_empty_username_is_absent() {
        assert!(!session(Some("")).has_username());
        assert!(session(Some("alice")).has_username());
        assert!(!session(None).has_username());
    }

    #[test]
    fn test_advance_rejects_skipped_stage() {
        let mut s = session(None);
        assert!(!s.advance(Stage::ReviewingBreakdown));
        assert_eq!(s.stage(), Stage::Idle);
        assert!(s.advance(Stage::AwaitingLogin));
        assert!(!s.advance(Stage::Processing));
        assert!(s.advance(Stage::ReviewingPurchase));
        assert_eq!(
            s.snapshot().history,
            vec![Stage::Idle, Stage::AwaitingLogin, Stage::ReviewingPurchase]
        );
    }

    #[test]
    fn test_terminal_stages_are_absorbing() {
        for terminal in [Stage::Succeeded, Stage::Failed, Stage::Cancelled] {
            for next in [
                Stage::Idle,
                Stage::AwaitingLogin,
                Stage::ReviewingPurchase,
                Stage::Processing,
                Stage::Succeeded,
                Stage::Failed,
                Stage::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(next), "{terminal} -> {next}");
            }
        }
    }

    #[test]
    fn test_processing_is_not_cancellable() {
        assert!(!Stage::Processing.can_transition_to(Stage::Cancelled));
        assert!(Stage::ReviewingBreakdown.can_transition_to(Stage::Cancelled));
        assert!(!Stage::Idle.can_transition_to(Stage::Cancelled));
    }

    #[test]
    fn test_snapshot_serializes_to_json() {
        let mut s = session(Some("alice"));
        s.advance(Stage::ReviewingPurchase);
        let json = serde_json::to_value(s.snapshot()).unwrap();

        assert_eq!(json["stage"], "ReviewingPurchase");
        assert_eq!(json["username"], "alice");
        assert_eq!(json["history"], serde_json::json!(["Idle", "ReviewingPurchase"]));
        assert!(json["breakdown"].is_null());
        assert!(json["outcome"].is_null());
    }

    #[test]
    fn test_passcode_redacted() {
        assert!(Passcode::new("").is_none());
        let p = Passcode::new("1234").unwrap();
        assert_eq!(p.expose(), "1234");
        assert_eq!(format!("{p:?}"), "Passcode(***)");
    }
}
