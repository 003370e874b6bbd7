//! Sliding window counter over the counter store.

use std::sync::Arc;

use kments_types::counter_adapter::{CounterAdapter, Pipeline, ScoreBound};
use kments_types::utils::{TIE_BREAKER_LENGTH, random_id};

use super::config::RateLimitKey;
use crate::clock::Clock;
use crate::prelude::*;

/// Sorted set holding the events of one `(key, identifier)` pair
pub fn window_key(key: RateLimitKey, identifier: &str) -> String {
	format!("{}:{}", key, identifier)
}

/// Counts events of an identifier over a trailing window.
///
/// Each count records one event, so the result includes the current request.
/// Events at or before `now - window` are purged first. Purge, insert and
/// count run as one atomic pipeline, which also expires the set one window
/// after its last event.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
	counter: Arc<dyn CounterAdapter>,
	clock: Arc<dyn Clock>,
}

impl SlidingWindow {
	pub fn new(counter: Arc<dyn CounterAdapter>, clock: Arc<dyn Clock>) -> Self {
		Self { counter, clock }
	}

	pub async fn count(
		&self,
		key: RateLimitKey,
		identifier: &str,
		window_ms: i64,
	) -> ClResult<i64> {
		let now = self.clock.now_ms();
		let set_key = window_key(key, identifier);
		// same-millisecond events need distinct members
		let member = format!("{}:{}", now, random_id(TIE_BREAKER_LENGTH));

		let pipeline = Pipeline::new()
			.zremrangebyscore(&set_key, ScoreBound::NegInf, ScoreBound::Inclusive(now - window_ms))
			.zadd(&set_key, now, &member)
			.zcard(&set_key)
			.pexpire(&set_key, window_ms.max(1) as u64);
		let values = self.counter.exec(pipeline).await?.into_values()?;

		values.get(2).and_then(|v| v.as_int()).ok_or_else(|| {
			Error::Internal(format!("unexpected ZCARD reply for {}: {:?}", set_key, values.get(2)))
		})
	}
}

// vim: ts=4
