//! Rate Limiting Error Types

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::config::RateLimitKey;

/// Rejections produced by the rate limit middleware
#[derive(Debug)]
pub enum RateLimitError {
	/// The limiter denied the request
	Limited {
		key: RateLimitKey,
		/// Observed window count, -1 when a block record matched
		observed_count: i64,
	},
	/// No usable client identifier (missing or loopback address)
	MissingClientIp,
}

impl std::fmt::Display for RateLimitError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			RateLimitError::Limited { key, observed_count } => {
				write!(f, "Rate limited on {} (count {})", key, observed_count)
			}
			RateLimitError::MissingClientIp => write!(f, "Missing client IP"),
		}
	}
}

impl std::error::Error for RateLimitError {}

impl IntoResponse for RateLimitError {
	fn into_response(self) -> Response {
		match self {
			RateLimitError::Limited { key, observed_count } => {
				let body = serde_json::json!({
					"error": {
						"code": "E-RATE-LIMITED",
						"message": "Too many requests. Please slow down.",
						"details": {
							"key": key,
							"count": observed_count
						}
					}
				});
				(StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
			}
			RateLimitError::MissingClientIp => {
				let body = serde_json::json!({
					"error": {
						"code": "E-VALIDATION",
						"message": "Missing client IP"
					}
				});
				(StatusCode::BAD_REQUEST, Json(body)).into_response()
			}
		}
	}
}

// vim: ts=4
