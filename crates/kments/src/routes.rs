//! HTTP routes, each behind the rate limiter of its operation category

use axum::Router;
use axum::http::{Method, header};
use axum::routing::{delete, get, post, put};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use kments_core::rate_limit::{RateLimitKey, RateLimitLayer};

use crate::handler;
use crate::prelude::*;

pub fn init(app: App) -> Router {
	let limit = |key| RateLimitLayer::new(app.rate_limiter.clone(), key, app.mode);

	// Comments are embedded into other sites' pages
	let cors = CorsLayer::new()
		.allow_origin(Any)
		.allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
		.allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
		.max_age(Duration::from_secs(60 * 60));

	Router::new()
		.route(
			"/recent-comments",
			get(handler::get_recent_comments).layer(limit(RateLimitKey::Gets)),
		)
		.route("/count-visit", post(handler::post_count_visit).layer(limit(RateLimitKey::Count)))
		.route("/pages-view", post(handler::post_pages_view).layer(limit(RateLimitKey::Count)))
		.route(
			"/comments",
			post(handler::post_comment)
				.layer(limit(RateLimitKey::Post))
				.merge(delete(handler::delete_comments).layer(limit(RateLimitKey::Delete))),
		)
		.route(
			"/comments/hide",
			put(handler::put_hide_comments).layer(limit(RateLimitKey::Hide)),
		)
		.layer(cors)
		.layer(TraceLayer::new_for_http())
		.with_state(app)
}

// vim: ts=4
