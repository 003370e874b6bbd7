//! Shared types, adapter traits, and core utilities for kments.
//!
//! This crate contains the foundational types that are shared between the
//! core crate, the HTTP surface and all adapter implementations. Adapters
//! depend only on this crate, so they compile in parallel with the core.

pub mod comment_adapter;
pub mod counter_adapter;
pub mod error;
pub mod prelude;
pub mod types;
pub mod utils;

// vim: ts=4
