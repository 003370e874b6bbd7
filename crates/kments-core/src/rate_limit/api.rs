//! Rate Limiting Internal API
//!
//! Types and the trait for programmatic rate limit management.

use async_trait::async_trait;

use super::config::RateLimitKey;
use crate::prelude::*;

/// Outcome of a limiter check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LimiterResult {
	pub allow: bool,
	/// HTTP status the request layer reports (200 or 429)
	pub status_code: u16,
	/// Window count including this request, -1 when no count was taken
	pub observed_count: i64,
}

impl LimiterResult {
	pub fn allowed(observed_count: i64) -> Self {
		Self { allow: true, status_code: 200, observed_count }
	}

	pub fn limited(observed_count: i64) -> Self {
		Self { allow: false, status_code: 429, observed_count }
	}
}

/// Statistics about the rate limiter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimiterStats {
	/// Total checks performed
	pub total_checks: u64,
	/// Total requests that were denied
	pub total_requests_limited: u64,
	/// Total persisted bans issued (permanent and expiring)
	pub total_bans_issued: u64,
	/// Identifiers currently blocked in this process
	pub local_blocks: usize,
}

/// Internal API for programmatic rate limit management
#[async_trait]
pub trait RateLimitApi: Send + Sync {
	/// Fast pre-check against the process-local block set, never touches the store
	fn is_permanently_blocked(&self, key: RateLimitKey, identifier: &str) -> bool;

	/// Remove every block record of an identifier and reset its window on `key`
	async fn unblock(&self, key: RateLimitKey, identifier: &str) -> ClResult<()>;

	/// Get statistics about rate limiter state
	fn stats(&self) -> RateLimiterStats;
}

// vim: ts=4
