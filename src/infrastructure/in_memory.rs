use crate::domain::money::Amount;
use crate::domain::ports::{Outcome, PaymentObserver, PaymentView};
use crate::domain::session::PurchaseDetails;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A step the controller asked the view to show.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    LoginRequested,
    PurchaseReview(PurchaseDetails),
    Breakdown {
        amount: Amount,
        surcharge: Amount,
        total: Amount,
    },
    Processing,
    Outcome(Outcome),
}

/// A terminal notification delivered to the observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverEvent {
    Success,
    Failure(String),
    Cancel,
}

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Headless view that records every request in order.
///
/// Useful for hosts that drive the flow from their own UI loop and for tests.
#[derive(Debug, Default)]
pub struct RecordingView {
    events: Mutex<Vec<ViewEvent>>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ViewEvent> {
        locked(&self.events).clone()
    }

    pub fn breakdowns(&self) -> Vec<(Amount, Amount, Amount)> {
        locked(&self.events)
            .iter()
            .filter_map(|e| match e {
                ViewEvent::Breakdown {
                    amount,
                    surcharge,
                    total,
                } => Some((*amount, *surcharge, *total)),
                _ => None,
            })
            .collect()
    }

    pub fn outcomes(&self) -> Vec<Outcome> {
        locked(&self.events)
            .iter()
            .filter_map(|e| match e {
                ViewEvent::Outcome(outcome) => Some(outcome.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ViewEvent) {
        locked(&self.events).push(event);
    }
}

impl PaymentView for RecordingView {
    fn request_login_input(&self) {
        self.push(ViewEvent::LoginRequested);
    }

    fn show_purchase_review(&self, details: &PurchaseDetails) {
        self.push(ViewEvent::PurchaseReview(details.clone()));
    }

    fn show_breakdown(&self, amount: Amount, surcharge: Amount, total: Amount) {
        self.push(ViewEvent::Breakdown {
            amount,
            surcharge,
            total,
        });
    }

    fn show_processing_indicator(&self) {
        self.push(ViewEvent::Processing);
    }

    fn report_outcome(&self, outcome: &Outcome) {
        self.push(ViewEvent::Outcome(outcome.clone()));
    }
}

/// Observer that records terminal notifications.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObserverEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ObserverEvent> {
        locked(&self.events).clone()
    }

    pub fn last(&self) -> Option<ObserverEvent> {
        locked(&self.events).last().cloned()
    }
}

impl PaymentObserver for RecordingObserver {
    fn on_success(&self) {
        locked(&self.events).push(ObserverEvent::Success);
    }

    fn on_failure(&self, reason: &str) {
        locked(&self.events).push(ObserverEvent::Failure(reason.to_string()));
    }

    fn on_cancel(&self) {
        locked(&self.events).push(ObserverEvent::Cancel);
    }
}
