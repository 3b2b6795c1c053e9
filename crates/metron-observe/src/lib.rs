//! Process-wide logging setup for metron binaries.
//!
//! Libraries in the workspace only emit `tracing` events; installing a subscriber is left to the
//! binary through [`init_logger`].
mod logger;
pub use logger::*;
