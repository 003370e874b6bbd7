//! Database schema initialization

use sqlx::SqlitePool;

/// Creates the comment table. Each page id forms one partition.
pub(crate) async fn init_db(db: &SqlitePool) -> Result<(), sqlx::Error> {
	let mut tx = db.begin().await?;

	sqlx::query(
		"CREATE TABLE IF NOT EXISTS comments (
		id char(24) NOT NULL,
		page_id text NOT NULL,
		reply_to char(24),
		hidden boolean NOT NULL DEFAULT 0,
		created_at integer NOT NULL,
		PRIMARY KEY(id)
	)",
	)
	.execute(&mut *tx)
	.await?;

	sqlx::query("CREATE INDEX IF NOT EXISTS idx_comments_page ON comments(page_id, id)")
		.execute(&mut *tx)
		.await?;

	tx.commit().await?;
	Ok(())
}

// vim: ts=4
