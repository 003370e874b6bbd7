//! Recent comments index cached in the counter store.

use std::sync::Arc;

use kments_types::comment_adapter::{CommentAdapter, PostedComment, RecentCommentEntry};
use kments_types::counter_adapter::{CounterAdapter, CounterValue, Pipeline};

use super::{RecentConfig, rebuild};
use crate::prelude::*;

/// Sorted set of the index, member `{id}:{pageId}`, score = creation seconds
pub const RECENT_KEY: &str = "recentComments";

/// Reference to cached entries to remove
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecentRef {
	Comment(CommentId),
	/// Every entry of a page
	Page(PageId),
}

impl RecentRef {
	pub fn matches(&self, entry: &RecentCommentEntry) -> bool {
		match self {
			RecentRef::Comment(id) => &entry.id == id,
			RecentRef::Page(page_id) => &entry.page_id == page_id,
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RemovalOutcome {
	pub removed_count: usize,
	/// Cached entries left after the removal
	pub remaining: usize,
	/// Whether the index was rebuilt afterwards
	pub rebuilt: bool,
}

#[derive(Debug, Clone)]
pub struct RecentIndex {
	counter: Arc<dyn CounterAdapter>,
	comments: Arc<dyn CommentAdapter>,
	config: RecentConfig,
}

impl RecentIndex {
	pub fn new(
		counter: Arc<dyn CounterAdapter>,
		comments: Arc<dyn CommentAdapter>,
		config: RecentConfig,
	) -> Self {
		Self { counter, comments, config }
	}

	pub fn capacity(&self) -> usize {
		self.config.capacity
	}

	/// Records a newly posted comment, evicting the oldest entry on overflow.
	///
	/// Replies and hidden comments are never listed. Returns whether the
	/// comment was added.
	pub async fn push(&self, comment: &PostedComment) -> ClResult<bool> {
		if !comment.is_listable() {
			debug!("not listing comment {} in recent comments", comment.id);
			return Ok(false);
		}
		let entry = comment.to_entry();
		// keep the highest `capacity` ranks
		let stop = -(self.config.capacity as i64) - 1;
		let pipeline = Pipeline::new()
			.zadd(RECENT_KEY, entry.created_at.0, &entry.to_member())
			.zremrangebyrank(RECENT_KEY, 0, stop);
		self.counter.exec(pipeline).await?.into_values()?;
		Ok(true)
	}

	/// Cached entries, newest first, at most `min(limit, capacity)`
	pub async fn read_top(&self, limit: usize) -> ClResult<Vec<RecentCommentEntry>> {
		let limit = limit.min(self.config.capacity);
		if limit == 0 {
			return Ok(Vec::new());
		}
		// malformed members are skipped, so the cut happens after parsing
		let mut entries = self.read_all().await?;
		entries.truncate(limit);
		Ok(entries)
	}

	async fn read_all(&self) -> ClResult<Vec<RecentCommentEntry>> {
		let values =
			self.counter.exec(Pipeline::new().zrevrange(RECENT_KEY, 0, -1)).await?.into_values()?;
		let scored = values.into_iter().next().map(CounterValue::into_scored).unwrap_or_default();

		Ok(scored
			.into_iter()
			.filter_map(|sm| match RecentCommentEntry::from_member(&sm.member, sm.score) {
				Ok(entry) => Some(entry),
				Err(err) => {
					warn!("skipping malformed recent comment member {:?}: {}", sm.member, err);
					None
				}
			})
			.collect())
	}

	/// Drops matching entries from the cache only, never from the partitions
	pub async fn remove(&self, refs: &[RecentRef]) -> ClResult<RemovalOutcome> {
		let (removed, _) = self.split_matching(refs).await?;
		let remaining = self.remove_members(&removed).await?;
		Ok(RemovalOutcome { removed_count: removed.len(), remaining, rebuilt: false })
	}

	/// Drops matching entries and refills the index from the partitions.
	///
	/// Nothing is rebuilt when no cached entry matched.
	pub async fn remove_and_refill(&self, refs: &[RecentRef]) -> ClResult<RemovalOutcome> {
		let (removed, survivors) = self.split_matching(refs).await?;
		if removed.is_empty() {
			return Ok(RemovalOutcome { removed_count: 0, remaining: survivors.len(), rebuilt: false });
		}
		self.remove_members(&removed).await?;
		let rebuilt = self.rebuild(survivors).await?;
		Ok(RemovalOutcome { removed_count: removed.len(), remaining: rebuilt.len(), rebuilt: true })
	}

	/// Fills an under-full cache, called once at startup
	pub async fn warm_up(&self) -> ClResult<usize> {
		let current = self.read_all().await?;
		if current.len() >= self.config.capacity {
			return Ok(current.len());
		}
		let rebuilt = self.rebuild(current).await?;
		info!("recent comments index warmed up with {} entries", rebuilt.len());
		Ok(rebuilt.len())
	}

	/// Recomputes the index from `seed` and the page partitions, then
	/// replaces the cached set in one atomic pipeline.
	pub async fn rebuild(&self, seed: Vec<RecentCommentEntry>) -> ClResult<Vec<RecentCommentEntry>> {
		let entries = rebuild::collect(self.comments.as_ref(), &self.config, seed).await?;

		let mut pipeline = Pipeline::new().del(RECENT_KEY);
		if !entries.is_empty() {
			pipeline = pipeline.zadd_many(
				RECENT_KEY,
				entries.iter().map(|e| (e.created_at.0, e.to_member().into_boxed_str())),
			);
		}
		self.counter.exec(pipeline).await?.into_values()?;
		Ok(entries)
	}

	async fn split_matching(
		&self,
		refs: &[RecentRef],
	) -> ClResult<(Vec<RecentCommentEntry>, Vec<RecentCommentEntry>)> {
		let cached = self.read_all().await?;
		Ok(cached.into_iter().partition(|entry| refs.iter().any(|r| r.matches(entry))))
	}

	/// Removes members and returns the size left
	async fn remove_members(&self, entries: &[RecentCommentEntry]) -> ClResult<usize> {
		let mut pipeline = Pipeline::new();
		if !entries.is_empty() {
			pipeline = pipeline
				.zrem(RECENT_KEY, entries.iter().map(|e| e.to_member().into_boxed_str()));
		}
		let values = self.counter.exec(pipeline.zcard(RECENT_KEY)).await?.into_values()?;
		Ok(values.last().and_then(CounterValue::as_int).unwrap_or(0) as usize)
	}
}

// vim: ts=4
