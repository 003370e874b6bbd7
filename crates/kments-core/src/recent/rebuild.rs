//! Rebuild of the recent comments index from the page partitions.

use futures::future::try_join_all;

use kments_types::comment_adapter::{CommentAdapter, RecentCommentEntry};

use super::RecentConfig;
use crate::prelude::*;

/// Newest-first list of entries with a fixed capacity
#[derive(Clone, Debug)]
pub struct RecentList {
	entries: Vec<RecentCommentEntry>,
	capacity: usize,
}

impl RecentList {
	pub fn new(capacity: usize) -> Self {
		Self { entries: Vec::with_capacity(capacity + 1), capacity }
	}

	/// Ordered insert. The oldest entry is evicted once the list overflows.
	pub fn insert(&mut self, entry: RecentCommentEntry) {
		if self.entries.iter().any(|e| e.id == entry.id) {
			return;
		}
		let pos = self.entries.partition_point(|e| e.order_key() > entry.order_key());
		if pos >= self.capacity {
			return;
		}
		self.entries.insert(pos, entry);
		self.entries.truncate(self.capacity);
	}

	pub fn extend(&mut self, entries: impl IntoIterator<Item = RecentCommentEntry>) {
		for entry in entries {
			self.insert(entry);
		}
	}

	pub fn oldest(&self) -> Option<&RecentCommentEntry> {
		self.entries.last()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn into_vec(self) -> Vec<RecentCommentEntry> {
		self.entries
	}
}

/// Recomputes the newest entries from `seed` and every page partition.
///
/// Partitions are asked only for comments older than the oldest seed entry.
/// The bound stays fixed for the whole scan so all partitions are filtered
/// the same way.
pub(super) async fn collect(
	comments: &dyn CommentAdapter,
	config: &RecentConfig,
	seed: Vec<RecentCommentEntry>,
) -> ClResult<Vec<RecentCommentEntry>> {
	let mut list = RecentList::new(config.capacity);
	list.extend(seed);
	let bound = list.oldest().map(|e| e.id.clone());
	let limit = config.capacity as u32;

	let pages = comments.list_pages().await?;
	debug!("rebuilding recent comments from {} pages (seed {})", pages.len(), list.len());

	if pages.len() < config.parallel_threshold {
		for page_id in &pages {
			let candidates = comments.list_recent_top_level(page_id, bound.as_ref(), limit).await?;
			list.extend(candidates);
		}
	} else {
		let scans = pages
			.iter()
			.map(|page_id| comments.list_recent_top_level(page_id, bound.as_ref(), limit));
		for candidates in try_join_all(scans).await? {
			list.extend(candidates);
		}
	}

	Ok(list.into_vec())
}


// vim: ts=4
