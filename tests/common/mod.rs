#![allow(dead_code)]

use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use walletpay::application::controller::PaymentFlowController;
use walletpay::config::SessionConfig;
use walletpay::domain::money::Amount;
use walletpay::domain::session::Stage;
use walletpay::infrastructure::in_memory::{RecordingObserver, RecordingView};
use walletpay::infrastructure::simulated::SimulatedSettlement;

pub struct Harness {
    pub controller: PaymentFlowController,
    pub view: Arc<RecordingView>,
    pub observer: Arc<RecordingObserver>,
}

pub fn harness(latency: Duration) -> Harness {
    let view = Arc::new(RecordingView::new());
    let observer = Arc::new(RecordingObserver::new());
    let controller = PaymentFlowController::with_observer(
        view.clone(),
        Arc::new(SimulatedSettlement::new(latency)),
        &observer,
    );
    Harness {
        controller,
        view,
        observer,
    }
}

pub fn amount(value: Decimal) -> Amount {
    Amount::new(value).unwrap()
}

pub fn config(total: Decimal, balance: Decimal) -> SessionConfig {
    SessionConfig::new(amount(total), amount(balance))
}

impl Harness {
    /// Waits until the settlement task has moved the session to a terminal stage.
    pub async fn settled(&self) -> Stage {
        let mut stages = self.controller.subscribe();
        let stage = *tokio::time::timeout(Duration::from_secs(5), stages.wait_for(Stage::is_terminal))
            .await
            .expect("settlement timed out")
            .unwrap();
        stage
    }

    /// Runs a session with a username straight through to settlement.
    pub async fn pay(&self, config: SessionConfig, passcode: &str) -> Stage {
        self.controller.start(config.username("bob")).await.unwrap();
        self.controller.confirm().await.unwrap();
        self.controller.submit_passcode(passcode).await.unwrap();
        self.settled().await
    }
}
