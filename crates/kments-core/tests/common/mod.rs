//! Common test utilities and helpers
//!
//! Builds the core against the in-memory counter store, a manual clock and
//! a temp-dir SQLite comment store.

#![allow(dead_code)]

use std::sync::Arc;
use tempfile::TempDir;

use kments_comment_adapter_sqlite::CommentAdapterSqlite;
use kments_core::clock::ManualClock;
use kments_core::rate_limit::{
	RateLimitConfig, RateLimitKey, RateLimitManager, RateLimitPolicy, RawPolicy, Region,
};
use kments_counter_adapter_memory::CounterAdapterMemory;
use kments_types::comment_adapter::PostedComment;
use kments_types::types::{CommentId, PageId, Timestamp};

/// Start of the test timeline, in seconds
pub const EPOCH_SECS: i64 = 1_700_000_000;

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub struct Limiter {
	pub manager: Arc<RateLimitManager>,
	pub counter: Arc<CounterAdapterMemory>,
	pub clock: Arc<ManualClock>,
}

/// Limiter with one policy on `key`, levels given as raw triples
pub fn limiter(key: RateLimitKey, cycle_ms: i64, levels: &[[i64; 3]]) -> Limiter {
	init_tracing();
	let raw = RawPolicy {
		cycle: cycle_ms,
		region: Region::All,
		level: levels.to_vec(),
	};
	let policy = RateLimitPolicy::from_raw(&raw).expect("valid policy");
	let config = RateLimitConfig::default().with_policy(key, policy);

	let counter = Arc::new(CounterAdapterMemory::new());
	let clock = Arc::new(ManualClock::new(EPOCH_SECS * 1000));
	let manager = Arc::new(RateLimitManager::new(config, counter.clone(), clock.clone()));
	Limiter { manager, counter, clock }
}

pub async fn create_comment_store() -> (Arc<CommentAdapterSqlite>, TempDir) {
	let temp_dir = TempDir::new().expect("Failed to create temp directory");
	let adapter = CommentAdapterSqlite::new(temp_dir.path().join("comments.db"))
		.await
		.expect("Failed to create comment adapter");
	(Arc::new(adapter), temp_dir)
}

pub fn page(name: &str) -> PageId {
	PageId::new(name).expect("page id")
}

/// Top-level comment created `offset` seconds after the test epoch
pub fn comment(page_name: &str, offset: i64) -> PostedComment {
	let created_at = Timestamp(EPOCH_SECS + offset);
	PostedComment {
		id: CommentId::generate(created_at),
		page_id: page(page_name),
		created_at,
		reply_to: None,
		hidden: false,
	}
}

pub fn reply(page_name: &str, offset: i64, parent: &CommentId) -> PostedComment {
	PostedComment { reply_to: Some(parent.clone()), ..comment(page_name, offset) }
}

// vim: ts=4
