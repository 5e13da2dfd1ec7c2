use crate::config::SessionConfig;
use crate::domain::money::ChargeBreakdown;
use crate::domain::ports::{
    ObserverRef, Outcome, PaymentObserver, PaymentViewRef, SettlementBackendRef,
    SettlementOutcome, SettlementRequest,
};
use crate::domain::session::{Passcode, PaymentSession, SessionSnapshot, Stage};
use crate::error::{FlowError, Result};
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Drives one payment session at a time from login to a terminal outcome.
///
/// Every event takes the session lock, so events are applied strictly in the order
/// they are awaited. Settlement is the only asynchronous step: entering
/// `Processing` spawns a task that reports back exactly once, unless the session
/// has been discarded in the meantime.
pub struct PaymentFlowController {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<FlowState>,
    view: PaymentViewRef,
    backend: SettlementBackendRef,
    stage_tx: watch::Sender<Stage>,
    /// Parent of every per-session settlement token; cancelled on drop.
    shutdown: CancellationToken,
}

#[derive(Default)]
struct FlowState {
    session: Option<PaymentSession>,
    settlement: Option<CancellationToken>,
    observer: Option<ObserverRef>,
    last_id: u64,
}

impl FlowState {
    fn session_mut(&mut self) -> Result<&mut PaymentSession> {
        self.session.as_mut().ok_or(FlowError::NoSession)
    }
}

impl PaymentFlowController {
    /// Creates a controller with no observer attached.
    pub fn new(view: PaymentViewRef, backend: SettlementBackendRef) -> Self {
        Self::build(view, backend, None)
    }

    /// Creates a controller that reports terminal outcomes to `observer`.
    ///
    /// Only a weak reference is kept: the host decides how long the observer lives.
    pub fn with_observer<O>(
        view: PaymentViewRef,
        backend: SettlementBackendRef,
        observer: &Arc<O>,
    ) -> Self
    where
        O: PaymentObserver + 'static,
    {
        let observer: ObserverRef = Arc::<O>::downgrade(observer);
        Self::build(view, backend, Some(observer))
    }

    fn build(
        view: PaymentViewRef,
        backend: SettlementBackendRef,
        observer: Option<ObserverRef>,
    ) -> Self {
        let (stage_tx, _) = watch::channel(Stage::Idle);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(FlowState {
                    observer,
                    ..FlowState::default()
                }),
                view,
                backend,
                stage_tx,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Replaces the observer for subsequent notifications.
    pub async fn set_observer<O>(&self, observer: &Arc<O>)
    where
        O: PaymentObserver + 'static,
    {
        let observer: ObserverRef = Arc::<O>::downgrade(observer);
        self.shared.state.lock().await.observer = Some(observer);
    }

    /// Current stage; `Idle` before the first session or after `shutdown`.
    pub fn stage(&self) -> Stage {
        *self.shared.stage_tx.borrow()
    }

    /// Stream of stage changes, useful for awaiting the settlement result.
    pub fn subscribe(&self) -> watch::Receiver<Stage> {
        self.shared.stage_tx.subscribe()
    }

    /// Copy of the current (or last finished) session, without the passcode.
    pub async fn session_snapshot(&self) -> Option<SessionSnapshot> {
        let state = self.shared.state.lock().await;
        state.session.as_ref().map(PaymentSession::snapshot)
    }

    /// Begins a new session.
    ///
    /// A finished session is replaced; an unfinished one makes this fail with
    /// `FlowError::SessionActive`.
    pub async fn start(&self, config: SessionConfig) -> Result<Stage> {
        let mut state = self.shared.state.lock().await;
        if let Some(session) = &state.session
            && !session.stage().is_terminal()
        {
            warn!(session = session.id, stage = %session.stage(), "start rejected, session in progress");
            return Err(FlowError::SessionActive(session.stage()));
        }

        // Reject overflowing totals before anything about the flow changes
        let charges = ChargeBreakdown::compute(config.total_amount, config.surcharge)
            .inspect_err(|e| warn!(error = %e, "start rejected"))?;

        state.last_id += 1;
        let id = state.last_id;
        state.settlement = None;
        let session = state.session.insert(PaymentSession::new(
            id,
            config.username,
            config.purchase_details,
            config.wallet_balance,
            charges,
        ));
        info!(
            session = session.id,
            total = %session.charges.amount,
            surcharge = %session.charges.surcharge,
            "payment flow started"
        );

        if session.has_username() {
            self.shared.advance(session, Stage::ReviewingPurchase, "start")?;
            self.shared.view.show_purchase_review(&session.purchase_details);
        } else {
            self.shared.advance(session, Stage::AwaitingLogin, "start")?;
            self.shared.view.request_login_input();
        }
        Ok(session.stage())
    }

    /// Supplies the username requested by the login step. An empty name re-requests it.
    pub async fn submit_username(&self, username: impl Into<String>) -> Result<Stage> {
        let username = username.into();
        let mut state = self.shared.state.lock().await;
        let session = state.session_mut()?;
        self.shared.expect_stage(session, Stage::AwaitingLogin, "submit_username")?;

        if username.is_empty() {
            debug!(session = session.id, "empty username, login requested again");
            self.shared.view.request_login_input();
            return Ok(session.stage());
        }

        session.username = Some(username);
        self.shared.advance(session, Stage::ReviewingPurchase, "submit_username")?;
        self.shared.view.show_purchase_review(&session.purchase_details);
        Ok(session.stage())
    }

    /// Accepts the purchase review and shows the fee-inclusive breakdown.
    pub async fn confirm(&self) -> Result<Stage> {
        let mut state = self.shared.state.lock().await;
        let session = state.session_mut()?;
        self.shared.expect_stage(session, Stage::ReviewingPurchase, "confirm")?;

        let breakdown = session.charges;
        session.breakdown = Some(breakdown);
        self.shared.advance(session, Stage::ReviewingBreakdown, "confirm")?;
        self.shared
            .view
            .show_breakdown(breakdown.amount, breakdown.surcharge, breakdown.total);
        Ok(session.stage())
    }

    /// Authorises the payment and hands it to the settlement backend.
    ///
    /// An empty passcode leaves the session on the breakdown step.
    pub async fn submit_passcode(&self, passcode: impl Into<String>) -> Result<Stage> {
        let mut state = self.shared.state.lock().await;
        let session = state.session_mut()?;
        self.shared.expect_stage(session, Stage::ReviewingBreakdown, "submit_passcode")?;

        let Some(passcode) = Passcode::new(passcode) else {
            debug!(session = session.id, "empty passcode ignored");
            return Ok(session.stage());
        };

        self.shared.advance(session, Stage::Processing, "submit_passcode")?;
        self.shared.view.show_processing_indicator();

        let request = SettlementRequest {
            session: session.id,
            username: session.username.clone().unwrap_or_default(),
            breakdown: session.charges,
            wallet_balance: session.wallet_balance,
            passcode,
        };

        let token = self.shared.shutdown.child_token();
        state.settlement = Some(token.clone());
        Shared::spawn_settlement(Arc::clone(&self.shared), request, token);
        Ok(Stage::Processing)
    }

    /// Backs out of the flow. Not accepted once settlement has started.
    pub async fn cancel(&self) -> Result<Stage> {
        let mut state = self.shared.state.lock().await;
        let stage = state.session_mut()?.stage();
        if !stage.is_cancellable() {
            return Err(self.shared.rejected("cancel", stage));
        }
        self.shared
            .finish(&mut state, Stage::Cancelled, Outcome::Cancelled, "cancel")?;
        Ok(Stage::Cancelled)
    }

    /// Discards the current session without notifying anyone.
    ///
    /// A settlement still in flight is cancelled and will never report.
    pub async fn shutdown(&self) -> Option<SessionSnapshot> {
        let mut state = self.shared.state.lock().await;
        if let Some(token) = state.settlement.take() {
            token.cancel();
        }
        let session = state.session.take()?;
        info!(session = session.id, stage = %session.stage(), "payment session discarded");
        self.shared.stage_tx.send_replace(Stage::Idle);
        Some(session.snapshot())
    }
}

impl Drop for PaymentFlowController {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}

impl Shared {
    fn rejected(&self, event: &'static str, stage: Stage) -> FlowError {
        warn!(event, %stage, "event rejected");
        FlowError::InvalidEvent { event, stage }
    }

    fn expect_stage(
        &self,
        session: &PaymentSession,
        expected: Stage,
        event: &'static str,
    ) -> Result<()> {
        if session.stage() == expected {
            Ok(())
        } else {
            Err(self.rejected(event, session.stage()))
        }
    }

    fn advance(&self, session: &mut PaymentSession, next: Stage, event: &'static str) -> Result<()> {
        let from = session.stage();
        if !session.advance(next) {
            return Err(self.rejected(event, from));
        }
        info!(session = session.id, %from, to = %next, event, "stage changed");
        self.stage_tx.send_replace(next);
        Ok(())
    }

    /// Enters a terminal stage and fires the view and observer notifications.
    fn finish(
        &self,
        state: &mut FlowState,
        next: Stage,
        outcome: Outcome,
        event: &'static str,
    ) -> Result<()> {
        let session = state.session_mut()?;
        self.advance(session, next, event)?;
        session.outcome = Some(outcome.clone());
        state.settlement = None;

        self.view.report_outcome(&outcome);
        match state.observer.as_ref().and_then(|o| o.upgrade()) {
            Some(observer) => match &outcome {
                Outcome::Success => observer.on_success(),
                Outcome::Failure(reason) => observer.on_failure(reason.as_str()),
                Outcome::Cancelled => observer.on_cancel(),
            },
            None => debug!(?outcome, "no observer attached"),
        }
        Ok(())
    }

    fn spawn_settlement(shared: Arc<Self>, request: SettlementRequest, token: CancellationToken) {
        let id = request.session;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(session = id, "settlement abandoned");
                }
                outcome = shared.backend.settle(request) => {
                    shared.complete(id, outcome).await;
                }
            }
        });
    }

    async fn complete(&self, id: u64, outcome: SettlementOutcome) {
        let mut state = self.state.lock().await;
        let current = state.session.as_ref().map(|s| (s.id, s.stage()));
        if current != Some((id, Stage::Processing)) {
            debug!(session = id, "settlement result for a discarded session dropped");
            return;
        }

        let (next, outcome) = match outcome {
            SettlementOutcome::Settled => (Stage::Succeeded, Outcome::Success),
            declined => (Stage::Failed, Outcome::from(declined)),
        };
        if let Err(e) = self.finish(&mut state, next, outcome, "settlement") {
            warn!(session = id, error = %e, "settlement result not applied");
        }
    }
}
