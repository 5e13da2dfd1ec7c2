use crate::error::FlowError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed transaction fee applied when a session does not configure one.
pub const DEFAULT_SURCHARGE: Amount = Amount(dec!(1.50));

/// Represents a non-negative monetary value.
///
/// This is a wrapper around `rust_decimal::Decimal` so totals, balances and fees
/// can never be constructed negative, either in code or through deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self, FlowError> {
        if value.is_sign_negative() && !value.is_zero() {
            Err(FlowError::ValidationError(format!(
                "amount must not be negative, got {value}"
            )))
        } else {
            Ok(Self(value))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Sum of two amounts, or a validation error when it exceeds `Decimal::MAX`.
    pub fn checked_add(self, rhs: Self) -> Result<Self, FlowError> {
        self.0.checked_add(rhs.0).map(Self).ok_or_else(|| {
            FlowError::ValidationError(format!("total of {} and {} is too large", self.0, rhs.0))
        })
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = FlowError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl FromStr for Amount {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|e| FlowError::ValidationError(format!("invalid amount `{s}`: {e}")))?;
        Self::new(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// The amounts shown to the user before they authorise the payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChargeBreakdown {
    /// Pre-fee purchase total.
    pub amount: Amount,
    /// Fixed transaction fee.
    pub surcharge: Amount,
    /// `amount + surcharge`, the sum that settlement checks against the wallet.
    pub total: Amount,
}

impl ChargeBreakdown {
    pub fn compute(amount: Amount, surcharge: Amount) -> Result<Self, FlowError> {
        Ok(Self {
            amount,
            surcharge,
            total: amount.checked_add(surcharge)?,
        })
    }

    /// Whether `balance` is enough to cover the fee-inclusive total.
    pub fn is_covered_by(&self, balance: Amount) -> bool {
        balance >= self.total
    }
}

impl fmt::Display for ChargeBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Amount: ${}\nCharges: ${}\nTotal: ${}",
            self.amount, self.surcharge, self.total
        )
    }
}
