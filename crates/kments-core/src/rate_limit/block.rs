//! Block records.
//!
//! A process-local set of blocked identifiers per key sits in front of the
//! persisted records in the counter store. The local set is checked first so
//! repeat offenders never cost a store round trip.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::num::NonZeroU64;
use std::sync::Arc;

use kments_types::counter_adapter::{CounterAdapter, Pipeline};

use super::config::RateLimitKey;
use super::window::window_key;
use crate::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockStatus {
	Clear,
	/// Blocked in this process
	Local,
	/// Member of the persisted block set of the key
	Permanent,
	/// Expiring ban marker present
	Temporary,
}

impl BlockStatus {
	pub fn is_blocked(&self) -> bool {
		!matches!(self, BlockStatus::Clear)
	}
}

#[async_trait]
pub trait BlockChecker: Debug + Send + Sync {
	async fn check(&self, key: RateLimitKey, identifier: &str) -> ClResult<BlockStatus>;
}

// LocalBlockChecker //
//*******************//
/// Blocked identifiers of this process, lost on restart
#[derive(Debug, Default)]
pub struct LocalBlockChecker {
	blocked: RwLock<HashMap<RateLimitKey, HashSet<Box<str>>>>,
}

impl LocalBlockChecker {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn contains(&self, key: RateLimitKey, identifier: &str) -> bool {
		self.blocked.read().get(&key).is_some_and(|set| set.contains(identifier))
	}

	/// Returns true if the identifier was not blocked before
	pub fn insert(&self, key: RateLimitKey, identifier: &str) -> bool {
		self.blocked.write().entry(key).or_default().insert(identifier.into())
	}

	pub fn remove(&self, key: RateLimitKey, identifier: &str) -> bool {
		self.blocked.write().get_mut(&key).is_some_and(|set| set.remove(identifier))
	}

	pub fn len(&self) -> usize {
		self.blocked.read().values().map(HashSet::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[async_trait]
impl BlockChecker for LocalBlockChecker {
	async fn check(&self, key: RateLimitKey, identifier: &str) -> ClResult<BlockStatus> {
		Ok(if self.contains(key, identifier) { BlockStatus::Local } else { BlockStatus::Clear })
	}
}

// PersistedBlockChecker //
//***********************//
pub fn block_set_key(key: RateLimitKey) -> String {
	format!("black-{}", key)
}

/// Temporary bans are not scoped to a key
pub fn ban_marker_key(identifier: &str) -> String {
	format!("black-ex-{}", identifier)
}

/// Block records shared by every process through the counter store
#[derive(Debug, Clone)]
pub struct PersistedBlockChecker {
	counter: Arc<dyn CounterAdapter>,
}

impl PersistedBlockChecker {
	pub fn new(counter: Arc<dyn CounterAdapter>) -> Self {
		Self { counter }
	}

	/// Adds the identifier to the key's block set and clears its window
	pub async fn ban_permanent(&self, key: RateLimitKey, identifier: &str) -> ClResult<()> {
		let pipeline = Pipeline::new()
			.sadd(&block_set_key(key), identifier)
			.del(&window_key(key, identifier));
		self.counter.exec(pipeline).await?.into_values()?;
		Ok(())
	}

	pub async fn ban_for(&self, identifier: &str, seconds: NonZeroU64) -> ClResult<()> {
		let pipeline = Pipeline::new().setex(&ban_marker_key(identifier), seconds.get(), "0");
		self.counter.exec(pipeline).await?.into_values()?;
		Ok(())
	}

	/// Removes both persisted records and resets the window of `key`
	pub async fn unblock(&self, key: RateLimitKey, identifier: &str) -> ClResult<()> {
		let pipeline = Pipeline::new()
			.srem(&block_set_key(key), identifier)
			.del(&ban_marker_key(identifier))
			.del(&window_key(key, identifier));
		self.counter.exec(pipeline).await?.into_values()?;
		Ok(())
	}
}

#[async_trait]
impl BlockChecker for PersistedBlockChecker {
	async fn check(&self, key: RateLimitKey, identifier: &str) -> ClResult<BlockStatus> {
		let pipeline = Pipeline::new()
			.sismember(&block_set_key(key), identifier)
			.exists(&ban_marker_key(identifier));
		let values = self.counter.exec(pipeline).await?.into_values()?;

		if values.first().is_some_and(|v| v.as_bool()) {
			Ok(BlockStatus::Permanent)
		} else if values.get(1).is_some_and(|v| v.as_bool()) {
			Ok(BlockStatus::Temporary)
		} else {
			Ok(BlockStatus::Clear)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_local_block_set() {
		let local = LocalBlockChecker::new();
		assert!(local.insert(RateLimitKey::Post, "1.2.3.4"));
		assert!(!local.insert(RateLimitKey::Post, "1.2.3.4"));
		assert_eq!(local.check(RateLimitKey::Post, "1.2.3.4").await.unwrap(), BlockStatus::Local);
		assert_eq!(local.check(RateLimitKey::Gets, "1.2.3.4").await.unwrap(), BlockStatus::Clear);
		assert_eq!(local.len(), 1);
		assert!(local.remove(RateLimitKey::Post, "1.2.3.4"));
		assert!(local.is_empty());
	}

	#[test]
	fn test_key_names() {
		assert_eq!(block_set_key(RateLimitKey::Login), "black-login");
		assert_eq!(ban_marker_key("1.2.3.4"), "black-ex-1.2.3.4");
	}
}

// vim: ts=4
