//! App state type

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use kments_types::comment_adapter::CommentAdapter;
use kments_types::counter_adapter::CounterAdapter;

use crate::clock::Clock;
use crate::config::KmentsConfig;
use crate::prelude::*;
use crate::rate_limit::RateLimitManager;
use crate::recent::RecentIndex;
use crate::visit::VisitCounter;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Where client addresses come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
	/// Clients connect directly
	#[default]
	Standalone,
	/// Behind a reverse proxy that sets forwarding headers
	Proxy,
}

#[derive(Debug)]
pub struct AppState {
	pub mode: ServerMode,
	pub admin_token: Option<Box<str>>,
	pub clock: Arc<dyn Clock>,

	pub counter_adapter: Arc<dyn CounterAdapter>,
	pub comment_adapter: Arc<dyn CommentAdapter>,

	pub rate_limiter: Arc<RateLimitManager>,
	pub recent: RecentIndex,
	pub visits: VisitCounter,
}

impl AppState {
	pub fn new(
		config: &KmentsConfig,
		counter_adapter: Arc<dyn CounterAdapter>,
		comment_adapter: Arc<dyn CommentAdapter>,
		clock: Arc<dyn Clock>,
	) -> ClResult<Self> {
		let rate_limiter = Arc::new(RateLimitManager::new(
			config.rate_limit_config()?,
			counter_adapter.clone(),
			clock.clone(),
		));
		let recent =
			RecentIndex::new(counter_adapter.clone(), comment_adapter.clone(), config.recent.clone());
		let visits = VisitCounter::new(counter_adapter.clone());

		Ok(Self {
			mode: config.mode,
			admin_token: config.admin_token.clone(),
			clock,
			counter_adapter,
			comment_adapter,
			rate_limiter,
			recent,
			visits,
		})
	}
}

pub type App = Arc<AppState>;

// vim: ts=4
