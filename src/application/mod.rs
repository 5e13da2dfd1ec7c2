//! Application layer containing the payment flow state machine.
//!
//! `PaymentFlowController` owns the active session, validates each user event
//! against the current stage and hands authorised payments to a settlement backend.

pub mod controller;
