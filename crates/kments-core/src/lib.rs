//! Core of the kments comment backend.
//!
//! Holds the sliding window rate limiter with its tiered punitive actions,
//! the bounded recent comments index and the visit counter. Everything talks
//! to the stores through the adapter traits of `kments-types`.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod app;
pub mod clock;
pub mod config;
pub mod prelude;
pub mod rate_limit;
pub mod recent;
pub mod visit;

pub use app::{App, AppState, ServerMode};
pub use config::KmentsConfig;

// vim: ts=4
