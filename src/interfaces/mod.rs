//! Adapters between the flow and the outside world: terminal I/O and CSV input.

pub mod console;
pub mod csv;
