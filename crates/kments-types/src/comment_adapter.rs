//! Adapter for the document store holding the per-page comment partitions.
//!
//! Comment bodies live outside kments. The adapter tracks the metadata the
//! recent comments index depends on: page, parent, visibility and creation
//! time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::prelude::*;

/// Entry of the recent comments index
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentCommentEntry {
	pub id: CommentId,
	pub page_id: PageId,
	pub created_at: Timestamp,
}

impl RecentCommentEntry {
	pub fn new(id: CommentId, page_id: PageId) -> Self {
		let created_at = id.created_at();
		Self { id, page_id, created_at }
	}

	/// Sorted set member: `{id}:{pageId}`
	pub fn to_member(&self) -> String {
		format!("{}:{}", self.id, self.page_id)
	}

	/// Parse a sorted set member with its score
	pub fn from_member(member: &str, score: i64) -> ClResult<Self> {
		let (id, page_id) = member
			.split_once(':')
			.ok_or_else(|| Error::ValidationError(format!("invalid recent member: {}", member)))?;
		Ok(Self {
			id: CommentId::parse(id)?,
			page_id: PageId::new(page_id)?,
			created_at: Timestamp(score),
		})
	}

	/// Ordering key, newest sorts last
	pub fn order_key(&self) -> (Timestamp, &CommentId) {
		(self.created_at, &self.id)
	}
}

/// A freshly posted comment, as reported by the posting handler
#[derive(Clone, Debug)]
pub struct PostedComment {
	pub id: CommentId,
	pub page_id: PageId,
	pub created_at: Timestamp,
	pub reply_to: Option<CommentId>,
	pub hidden: bool,
}

impl PostedComment {
	/// Top-level visible comments are the only ones the recent index lists
	pub fn is_listable(&self) -> bool {
		self.reply_to.is_none() && !self.hidden
	}

	pub fn to_entry(&self) -> RecentCommentEntry {
		RecentCommentEntry {
			id: self.id.clone(),
			page_id: self.page_id.clone(),
			created_at: self.created_at,
		}
	}
}

/// Access to the per-page comment partitions
#[async_trait]
pub trait CommentAdapter: Debug + Send + Sync {
	/// Lists the ids of every page that has a comment partition
	async fn list_pages(&self) -> ClResult<Vec<PageId>>;

	/// Lists the newest top-level, non-hidden comments of a page.
	///
	/// Only comments with an id strictly lower than `before` are returned
	/// when it is given. Results are ordered newest first, at most `limit`.
	async fn list_recent_top_level(
		&self,
		page_id: &PageId,
		before: Option<&CommentId>,
		limit: u32,
	) -> ClResult<Vec<RecentCommentEntry>>;

	async fn insert_comment(&self, comment: &PostedComment) -> ClResult<()>;

	/// Fails with `NotFound` if the comment does not exist
	async fn set_hidden(&self, id: &CommentId, hidden: bool) -> ClResult<()>;

	/// Deletes a comment together with its replies, returns the number deleted
	async fn delete_comment(&self, id: &CommentId) -> ClResult<u64>;

	/// Drops a whole partition, returns the number of comments deleted
	async fn delete_page(&self, page_id: &PageId) -> ClResult<u64>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_member_format() {
		let id = CommentId::parse("6553f100000000000000002a").unwrap();
		let entry = RecentCommentEntry::new(id, PageId::new("3f2a9c").unwrap());
		assert_eq!(entry.to_member(), "6553f100000000000000002a:3f2a9c");

		let parsed = RecentCommentEntry::from_member(&entry.to_member(), entry.created_at.0).unwrap();
		assert_eq!(parsed, entry);
		assert!(RecentCommentEntry::from_member("garbage", 0).is_err());
	}

	#[test]
	fn test_json_shape() {
		let entry = RecentCommentEntry::new(
			CommentId::parse("6553f100000000000000002a").unwrap(),
			PageId::new("3f2a9c").unwrap(),
		);
		let json = serde_json::to_value(&entry).unwrap();
		assert_eq!(json["pageId"], "3f2a9c");
		assert_eq!(json["createdAt"], 0x6553_f100);
	}
}

// vim: ts=4
