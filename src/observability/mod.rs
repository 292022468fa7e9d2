//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! chain facade produces:
//!     → logging.rs (structured log events)
//!     → metrics.rs (request and transaction counters)
//! ```

pub mod logging;
pub mod metrics;
