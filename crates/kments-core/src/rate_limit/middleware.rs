//! Rate Limiting Middleware
//!
//! Tower middleware layer for applying rate limits to Axum routes.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::IntoResponse;
use futures::future::BoxFuture;
use hyper::Request;
use tower::{Layer, Service};

use super::config::RateLimitKey;
use super::error::RateLimitError;
use super::extractors::{ClientIp, client_identifier};
use super::limiter::RateLimitManager;
use crate::app::ServerMode;
use crate::prelude::*;

/// Rate limit middleware layer
#[derive(Clone)]
pub struct RateLimitLayer {
	manager: Arc<RateLimitManager>,
	key: RateLimitKey,
	mode: ServerMode,
}

impl RateLimitLayer {
	pub fn new(manager: Arc<RateLimitManager>, key: RateLimitKey, mode: ServerMode) -> Self {
		Self { manager, key, mode }
	}
}

impl<S> Layer<S> for RateLimitLayer {
	type Service = RateLimitService<S>;

	fn layer(&self, inner: S) -> Self::Service {
		RateLimitService { inner, manager: self.manager.clone(), key: self.key, mode: self.mode }
	}
}

/// Rate limit middleware service
#[derive(Clone)]
pub struct RateLimitService<S> {
	inner: S,
	manager: Arc<RateLimitManager>,
	key: RateLimitKey,
	mode: ServerMode,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
	S: Service<Request<Body>, Response = axum::response::Response> + Clone + Send + 'static,
	S::Future: Send + 'static,
{
	type Response = S::Response;
	type Error = S::Error;
	type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

	fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		self.inner.poll_ready(cx)
	}

	fn call(&mut self, mut req: Request<Body>) -> Self::Future {
		let manager = self.manager.clone();
		let key = self.key;
		let mode = self.mode;
		let mut inner = self.inner.clone();

		Box::pin(async move {
			let Some(ip) = client_identifier(&req, mode) else {
				return Ok(RateLimitError::MissingClientIp.into_response());
			};

			match manager.check(key, &ip).await {
				Ok(res) if res.allow => {
					req.extensions_mut().insert(ClientIp(ip));
					inner.call(req).await
				}
				Ok(res) => {
					debug!("rate limited {} on {}", ip, key);
					Ok(RateLimitError::Limited { key, observed_count: res.observed_count }
						.into_response())
				}
				// unable to decide, surfaced as a server error
				Err(err) => Ok(err.into_response()),
			}
		})
	}
}

// vim: ts=4
