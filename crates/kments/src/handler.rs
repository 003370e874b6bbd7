//! HTTP handlers

use axum::extract::{Extension, Query, State};
use axum::http::{HeaderMap, header};
use axum::Json;
use serde::{Deserialize, Serialize};

use kments_core::rate_limit::ClientIp;
use kments_core::recent::RecentRef;
use kments_types::comment_adapter::{PostedComment, RecentCommentEntry};
use kments_types::utils::page_id;

use crate::prelude::*;

/// Default number of entries returned by the recent comments endpoint
pub const DEFAULT_RECENT_LIMIT: usize = 5;

/// Response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
	pub data: T,
}

impl<T> ApiResponse<T> {
	pub fn new(data: T) -> Self {
		Self { data }
	}
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentQuery {
	pub limit: Option<usize>,
}

/// GET /recent-comments?limit=N
///
/// Newest top-level comments across every page, newest first. At most the
/// index capacity is returned.
pub async fn get_recent_comments(
	State(app): State<App>,
	Query(query): Query<RecentQuery>,
) -> ClResult<Json<ApiResponse<Vec<RecentCommentEntry>>>> {
	let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
	let entries = app.recent.read_top(limit).await?;
	Ok(Json(ApiResponse::new(entries)))
}

/// POST /count-visit
///
/// The body is the pathname of the visited page. An empty body reads the
/// site-wide counter. Returns the counter including this visit.
pub async fn post_count_visit(
	State(app): State<App>,
	Extension(ClientIp(ip)): Extension<ClientIp>,
	body: String,
) -> ClResult<Json<ApiResponse<i64>>> {
	let pathname = body.trim();
	let pathname = (!pathname.is_empty()).then_some(pathname);
	let count = app.visits.count_visit(pathname, &ip).await?;
	Ok(Json(ApiResponse::new(count)))
}

/// POST /pages-view
///
/// The body is a JSON array of pathnames. Returns their counters in the same
/// order without counting a visit.
pub async fn post_pages_view(
	State(app): State<App>,
	Json(pathnames): Json<Vec<String>>,
) -> ClResult<Json<ApiResponse<Vec<i64>>>> {
	let counts = app.visits.pages_view(&pathnames).await?;
	Ok(Json(ApiResponse::new(counts)))
}

// Comments //
//**********//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostCommentReq {
	pub pathname: String,
	pub reply_to: Option<CommentId>,
}

/// POST /comments
///
/// Records a new comment of a page and lists it among the recent comments
/// unless it is a reply.
pub async fn post_comment(
	State(app): State<App>,
	Json(req): Json<PostCommentReq>,
) -> ClResult<Json<ApiResponse<RecentCommentEntry>>> {
	if req.pathname.trim().is_empty() {
		return Err(Error::ValidationError("pathname is required".into()));
	}
	let created_at = Timestamp(app.clock.now_ms() / 1000);
	let comment = PostedComment {
		id: CommentId::generate(created_at),
		page_id: page_id(&req.pathname)?,
		created_at,
		reply_to: req.reply_to,
		hidden: false,
	};
	app.comment_adapter.insert_comment(&comment).await?;
	app.recent.push(&comment).await?;
	Ok(Json(ApiResponse::new(comment.to_entry())))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeleteCommentsReq {
	/// Comments to delete with their replies
	pub ids: Vec<CommentId>,
	/// Pages whose every comment is deleted
	pub pages: Vec<String>,
}

/// DELETE /comments
///
/// Moderation only. Returns the number of deleted comments.
pub async fn delete_comments(
	State(app): State<App>,
	headers: HeaderMap,
	Json(req): Json<DeleteCommentsReq>,
) -> ClResult<Json<ApiResponse<u64>>> {
	require_admin(&app, &headers)?;
	if req.ids.is_empty() && req.pages.is_empty() {
		return Err(Error::ValidationError("nothing to delete".into()));
	}

	let mut refs = Vec::with_capacity(req.ids.len() + req.pages.len());
	let mut deleted = 0;
	for id in req.ids {
		deleted += app.comment_adapter.delete_comment(&id).await?;
		refs.push(RecentRef::Comment(id));
	}
	for pathname in &req.pages {
		let page_id = page_id(pathname)?;
		deleted += app.comment_adapter.delete_page(&page_id).await?;
		refs.push(RecentRef::Page(page_id));
	}

	let outcome = app.recent.remove_and_refill(&refs).await?;
	info!("deleted {} comments, {} recent entries replaced", deleted, outcome.removed_count);
	Ok(Json(ApiResponse::new(deleted)))
}

#[derive(Debug, Deserialize)]
pub struct HideCommentsReq {
	pub ids: Vec<CommentId>,
}

/// PUT /comments/hide
///
/// Moderation only. Unknown ids are skipped. Returns the number of hidden
/// comments.
pub async fn put_hide_comments(
	State(app): State<App>,
	headers: HeaderMap,
	Json(req): Json<HideCommentsReq>,
) -> ClResult<Json<ApiResponse<u64>>> {
	require_admin(&app, &headers)?;

	let mut refs = Vec::with_capacity(req.ids.len());
	let mut hidden = 0;
	for id in req.ids {
		match app.comment_adapter.set_hidden(&id, true).await {
			Ok(()) => hidden += 1,
			Err(Error::NotFound) => debug!("comment {} not found, not hidden", id),
			Err(err) => return Err(err),
		}
		refs.push(RecentRef::Comment(id));
	}

	app.recent.remove_and_refill(&refs).await?;
	Ok(Json(ApiResponse::new(hidden)))
}

/// Moderation routes need `Authorization: Bearer <adminToken>`
fn require_admin(app: &App, headers: &HeaderMap) -> ClResult<()> {
	let Some(token) = app.admin_token.as_deref() else {
		warn!("moderation request refused, no admin token configured");
		return Err(Error::PermissionDenied);
	};
	let given = headers
		.get(header::AUTHORIZATION)
		.and_then(|value| value.to_str().ok())
		.and_then(|value| value.strip_prefix("Bearer "));
	if given != Some(token) {
		return Err(Error::PermissionDenied);
	}
	Ok(())
}

// vim: ts=4
