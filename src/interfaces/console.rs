use crate::domain::money::Amount;
use crate::domain::ports::{FailureReason, Outcome, PaymentView};
use crate::domain::session::PurchaseDetails;
use std::io::{self, Write};
use std::sync::Mutex;
use tracing::warn;

/// Plain-text view for terminals.
///
/// Writes each step as a short block of text to `W`. Write failures are logged
/// and otherwise ignored, since a view has no way to report back to the flow.
pub struct ConsoleView<W: Write + Send> {
    out: Mutex<W>,
}

impl ConsoleView<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn emit(&self, text: &str) {
        let mut out = self
            .out
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{text}").and_then(|_| out.flush()) {
            warn!(error = %e, "console view write failed");
        }
    }
}

impl<W: Write + Send> PaymentView for ConsoleView<W> {
    fn request_login_input(&self) {
        self.emit("Login Required\nPlease log in to proceed with payment.\nUsername (or /cancel):");
    }

    fn show_purchase_review(&self, details: &PurchaseDetails) {
        let mut text = String::from("Purchase Details:\n");
        for (key, value) in details {
            text.push_str(&format!("{key}: {value}\n"));
        }
        text.push_str("[next] to continue, [cancel] to abort:");
        self.emit(&text);
    }

    fn show_breakdown(&self, amount: Amount, surcharge: Amount, total: Amount) {
        self.emit(&format!(
            "Amount: ${amount}\nCharges: ${surcharge}\nTotal: ${total}\nEnter Passcode (or /cancel):"
        ));
    }

    fn show_processing_indicator(&self) {
        self.emit("Processing Payment...");
    }

    fn report_outcome(&self, outcome: &Outcome) {
        let text = match outcome {
            Outcome::Success => "Payment Successful".to_string(),
            Outcome::Failure(FailureReason::InsufficientFunds) => {
                "Insufficient Funds to Complete the Transaction".to_string()
            }
            Outcome::Failure(reason) => format!("Payment Failed: {reason}"),
            Outcome::Cancelled => "Payment Cancelled".to_string(),
        };
        self.emit(&text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rendered(view: ConsoleView<Vec<u8>>) -> String {
        String::from_utf8(view.into_inner()).unwrap()
    }

    #[test]
    fn test_breakdown_text() {
        let view = ConsoleView::new(Vec::new());
        view.show_breakdown(
            Amount::new(dec!(20)).unwrap(),
            Amount::new(dec!(1.5)).unwrap(),
            Amount::new(dec!(21.5)).unwrap(),
        );
        let text = rendered(view);
        assert!(text.contains("Amount: $20.00"));
        assert!(text.contains("Charges: $1.50"));
        assert!(text.contains("Total: $21.50"));
    }

    #[test]
    fn test_purchase_review_lists_details() {
        let view = ConsoleView::new(Vec::new());
        let mut details = PurchaseDetails::new();
        details.insert("Item".to_string(), "Shirt".to_string());
        view.show_purchase_review(&details);
        assert!(rendered(view).contains("Item: Shirt"));
    }

    #[test]
    fn test_outcome_messages() {
        let view = ConsoleView::new(Vec::new());
        view.report_outcome(&Outcome::Success);
        view.report_outcome(&Outcome::Failure(FailureReason::TransactionError));
        view.report_outcome(&Outcome::Failure(FailureReason::InsufficientFunds));
        let text = rendered(view);
        assert!(text.contains("Payment Successful"));
        assert!(text.contains("Payment Failed: Transaction error"));
        assert!(text.contains("Insufficient Funds to Complete the Transaction"));
    }
}
