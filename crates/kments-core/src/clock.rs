//! Time source of the sliding window.

use std::fmt::Debug;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::SystemTime;

/// Millisecond wall clock
pub trait Clock: Debug + Send + Sync {
	fn now_ms(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now_ms(&self) -> i64 {
		let res = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
		res.as_millis() as i64
	}
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
	now: AtomicI64,
}

impl ManualClock {
	pub fn new(now_ms: i64) -> Self {
		Self { now: AtomicI64::new(now_ms) }
	}

	pub fn set(&self, now_ms: i64) {
		self.now.store(now_ms, Ordering::SeqCst);
	}

	pub fn advance(&self, ms: i64) {
		self.now.fetch_add(ms, Ordering::SeqCst);
	}
}

impl Clock for ManualClock {
	fn now_ms(&self) -> i64 {
		self.now.load(Ordering::SeqCst)
	}
}


// vim: ts=4
