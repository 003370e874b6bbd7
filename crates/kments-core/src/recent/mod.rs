//! Recent comments index
//!
//! A bounded list of the newest top-level comments across every page,
//! cached in the counter store. Posting pushes into it cheaply, deletions
//! and hides shrink it and trigger a rebuild from the page partitions.

mod index;
mod rebuild;

use serde::{Deserialize, Serialize};

pub use index::{RECENT_KEY, RecentIndex, RecentRef, RemovalOutcome};
pub use rebuild::RecentList;

pub const DEFAULT_CAPACITY: usize = 10;
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 25;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecentConfig {
	/// Maximum number of cached entries
	pub capacity: usize,
	/// Partition count from which a rebuild scans pages concurrently
	pub parallel_threshold: usize,
}

impl Default for RecentConfig {
	fn default() -> Self {
		Self { capacity: DEFAULT_CAPACITY, parallel_threshold: DEFAULT_PARALLEL_THRESHOLD }
	}
}

// vim: ts=4
