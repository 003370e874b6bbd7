//! Rate Limit Manager
//!
//! Tiered sliding window limiter. A request is first checked against the
//! block records, then counted, and the most severe level its count reaches
//! decides between delaying, blocking and banning.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use kments_types::counter_adapter::CounterAdapter;

use super::api::{LimiterResult, RateLimitApi, RateLimiterStats};
use super::block::{BlockChecker, BlockStatus, LocalBlockChecker, PersistedBlockChecker};
use super::config::{BanSpan, LevelAction, RateLimitConfig, RateLimitKey, RateLimitPolicy};
use super::window::SlidingWindow;
use crate::clock::Clock;
use crate::prelude::*;

/// Main rate limit manager
#[derive(Debug)]
pub struct RateLimitManager {
	config: RateLimitConfig,
	window: SlidingWindow,
	local: LocalBlockChecker,
	persisted: PersistedBlockChecker,
	/// Statistics
	total_checks: AtomicU64,
	total_limited: AtomicU64,
	total_bans: AtomicU64,
}

impl RateLimitManager {
	pub fn new(
		config: RateLimitConfig,
		counter: Arc<dyn CounterAdapter>,
		clock: Arc<dyn Clock>,
	) -> Self {
		Self {
			config,
			window: SlidingWindow::new(counter.clone(), clock),
			local: LocalBlockChecker::new(),
			persisted: PersistedBlockChecker::new(counter),
			total_checks: AtomicU64::new(0),
			total_limited: AtomicU64::new(0),
			total_bans: AtomicU64::new(0),
		}
	}

	pub fn policy(&self, key: RateLimitKey) -> Option<&RateLimitPolicy> {
		self.config.get(key)
	}

	/// Check a request against the configured policy of `key`
	pub async fn check(&self, key: RateLimitKey, identifier: &str) -> ClResult<LimiterResult> {
		self.check_policy(key, identifier, self.config.get(key)).await
	}

	/// Check a request against an explicit policy.
	///
	/// Without a policy only the block records are consulted and the request
	/// is allowed with a count of -1. Store failures are propagated.
	pub async fn check_policy(
		&self,
		key: RateLimitKey,
		identifier: &str,
		policy: Option<&RateLimitPolicy>,
	) -> ClResult<LimiterResult> {
		self.total_checks.fetch_add(1, Ordering::Relaxed);

		if self.local.check(key, identifier).await?.is_blocked() {
			return Ok(self.limited(-1));
		}
		match self.persisted.check(key, identifier).await? {
			BlockStatus::Clear => {}
			BlockStatus::Permanent => {
				self.local.insert(key, identifier);
				return Ok(self.limited(-1));
			}
			BlockStatus::Local | BlockStatus::Temporary => return Ok(self.limited(-1)),
		}

		let Some(policy) = policy else {
			return Ok(LimiterResult::allowed(-1));
		};
		let count = self.window.count(key, identifier, policy.cycle_ms).await?;

		let Some(rule) = policy.select(count) else {
			return Ok(LimiterResult::allowed(count));
		};
		match rule.action {
			LevelAction::Delay(ms) => {
				debug!("delaying {} on {} by {}ms (count {})", identifier, key, ms, count);
				tokio::time::sleep(Duration::from_millis(ms)).await;
				Ok(LimiterResult::allowed(count))
			}
			LevelAction::Block => {
				info!("blocking {} on {} in this process (count {})", identifier, key, count);
				self.local.insert(key, identifier);
				Ok(self.limited(count))
			}
			LevelAction::Ban(BanSpan::Permanent) => {
				warn!("banning {} on {} permanently (count {})", identifier, key, count);
				self.persisted.ban_permanent(key, identifier).await?;
				self.local.insert(key, identifier);
				self.total_bans.fetch_add(1, Ordering::Relaxed);
				Ok(self.limited(count))
			}
			LevelAction::Ban(BanSpan::Expiring(seconds)) => {
				info!("banning {} for {}s (count {} on {})", identifier, seconds, count, key);
				self.persisted.ban_for(identifier, seconds).await?;
				self.total_bans.fetch_add(1, Ordering::Relaxed);
				Ok(self.limited(count))
			}
			LevelAction::Reject => Ok(self.limited(count)),
		}
	}

	fn limited(&self, count: i64) -> LimiterResult {
		self.total_limited.fetch_add(1, Ordering::Relaxed);
		LimiterResult::limited(count)
	}
}

#[async_trait]
impl RateLimitApi for RateLimitManager {
	fn is_permanently_blocked(&self, key: RateLimitKey, identifier: &str) -> bool {
		self.local.contains(key, identifier)
	}

	async fn unblock(&self, key: RateLimitKey, identifier: &str) -> ClResult<()> {
		self.persisted.unblock(key, identifier).await?;
		if self.local.remove(key, identifier) {
			info!("unblocked {} on {}", identifier, key);
		}
		Ok(())
	}

	fn stats(&self) -> RateLimiterStats {
		RateLimiterStats {
			total_checks: self.total_checks.load(Ordering::Relaxed),
			total_requests_limited: self.total_limited.load(Ordering::Relaxed),
			total_bans_issued: self.total_bans.load(Ordering::Relaxed),
			local_blocks: self.local.len(),
		}
	}
}

// vim: ts=4
