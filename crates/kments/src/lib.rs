//! kments is a small comment backend for static blogs.
//!
//! # Features
//!
//! - Sliding window rate limiting per client IP and operation
//!     - delays, process-local blocks, temporary and permanent bans
//! - Recent comments index across every page
//!     - cheap pushes, rebuilt from the page partitions on deletion
//! - Unique visitor counting per page and site-wide
//!
//! Counters live in Redis, comment partitions in SQLite. Both sit behind
//! the adapter traits of `kments-types`.

// Re-export shared types and adapter traits from kments-types
pub use kments_types::comment_adapter;
pub use kments_types::counter_adapter;
pub use kments_types::error;
pub use kments_types::types;
pub use kments_types::utils;

// Core re-exports
pub use kments_core::clock;
pub use kments_core::config;
pub use kments_core::rate_limit;
pub use kments_core::recent;
pub use kments_core::visit;

// Local modules
pub mod app;
pub mod handler;
pub mod prelude;
pub mod routes;

pub use crate::app::{App, AppBuilder, ServerMode};

// vim: ts=4
