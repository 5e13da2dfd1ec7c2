//! Domain layer: money values, session state and the ports the flow talks through.

pub mod money;
pub mod ports;
pub mod session;
