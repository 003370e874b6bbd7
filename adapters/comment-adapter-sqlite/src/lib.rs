//! SQLite implementation of the comment partitions.
//!
//! All comments share one table, a page id selects the partition.

#![forbid(unsafe_code)]

mod error;
mod schema;

use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::{self, SqlitePool, SqliteRow};
use std::path::Path;

use kments::comment_adapter::{CommentAdapter, PostedComment, RecentCommentEntry};
use kments::prelude::*;

pub use error::Error;

fn parse_entry(row: &SqliteRow) -> Result<RecentCommentEntry, Error> {
	let id: String = row.try_get("id")?;
	let page_id: String = row.try_get("page_id")?;
	let created_at: i64 = row.try_get("created_at")?;

	let id = CommentId::parse(&id).map_err(|err| Error::InvalidRow(err.to_string()))?;
	let page_id = PageId::new(&page_id).map_err(|err| Error::InvalidRow(err.to_string()))?;
	Ok(RecentCommentEntry { id, page_id, created_at: Timestamp(created_at) })
}

#[derive(Debug)]
pub struct CommentAdapterSqlite {
	db: SqlitePool,
}

impl CommentAdapterSqlite {
	pub async fn new(path: impl AsRef<Path>) -> ClResult<Self> {
		let opts = sqlite::SqliteConnectOptions::new()
			.filename(path.as_ref())
			.create_if_missing(true)
			.journal_mode(sqlite::SqliteJournalMode::Wal);
		let db = sqlite::SqlitePoolOptions::new()
			.max_connections(5)
			.connect_with(opts)
			.await
			.map_err(Error::from)?;

		schema::init_db(&db).await.map_err(Error::from)?;
		info!("comment database opened at {}", path.as_ref().display());

		Ok(Self { db })
	}
}

#[async_trait]
impl CommentAdapter for CommentAdapterSqlite {
	async fn list_pages(&self) -> ClResult<Vec<PageId>> {
		let rows = sqlx::query("SELECT DISTINCT page_id FROM comments ORDER BY page_id")
			.fetch_all(&self.db)
			.await
			.map_err(Error::from)?;

		let mut pages = Vec::with_capacity(rows.len());
		for row in &rows {
			let page_id: String = row.try_get("page_id").map_err(Error::from)?;
			pages.push(PageId::new(&page_id)?);
		}
		Ok(pages)
	}

	async fn list_recent_top_level(
		&self,
		page_id: &PageId,
		before: Option<&CommentId>,
		limit: u32,
	) -> ClResult<Vec<RecentCommentEntry>> {
		let rows = sqlx::query(
			"SELECT id, page_id, created_at FROM comments
			WHERE page_id = ?1 AND reply_to IS NULL AND hidden = 0
				AND (?2 IS NULL OR id < ?2)
			ORDER BY id DESC LIMIT ?3",
		)
		.bind(page_id.as_str())
		.bind(before.map(CommentId::as_str))
		.bind(i64::from(limit))
		.fetch_all(&self.db)
		.await
		.map_err(Error::from)?;

		let entries = rows.iter().map(parse_entry).collect::<Result<Vec<_>, _>>()?;
		Ok(entries)
	}

	async fn insert_comment(&self, comment: &PostedComment) -> ClResult<()> {
		sqlx::query(
			"INSERT INTO comments (id, page_id, reply_to, hidden, created_at)
			VALUES (?1, ?2, ?3, ?4, ?5)",
		)
		.bind(comment.id.as_str())
		.bind(comment.page_id.as_str())
		.bind(comment.reply_to.as_ref().map(CommentId::as_str))
		.bind(comment.hidden)
		.bind(comment.created_at.0)
		.execute(&self.db)
		.await
		.map_err(Error::from)?;
		Ok(())
	}

	async fn set_hidden(&self, id: &CommentId, hidden: bool) -> ClResult<()> {
		let res = sqlx::query("UPDATE comments SET hidden = ?2 WHERE id = ?1")
			.bind(id.as_str())
			.bind(hidden)
			.execute(&self.db)
			.await
			.map_err(Error::from)?;
		if res.rows_affected() == 0 {
			return Err(Error::Db(sqlx::Error::RowNotFound).into());
		}
		Ok(())
	}

	/// Deletes a comment together with its replies
	async fn delete_comment(&self, id: &CommentId) -> ClResult<u64> {
		let res = sqlx::query("DELETE FROM comments WHERE id = ?1 OR reply_to = ?1")
			.bind(id.as_str())
			.execute(&self.db)
			.await
			.map_err(Error::from)?;
		Ok(res.rows_affected())
	}

	/// Drops a whole partition
	async fn delete_page(&self, page_id: &PageId) -> ClResult<u64> {
		let res = sqlx::query("DELETE FROM comments WHERE page_id = ?1")
			.bind(page_id.as_str())
			.execute(&self.db)
			.await
			.map_err(Error::from)?;
		Ok(res.rows_affected())
	}
}

// vim: ts=4
