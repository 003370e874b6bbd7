//! Rate Limiting System
//!
//! Sliding window counting with tiered punitive actions (delay, block,
//! temporary and permanent bans) and a two-tier block record lookup.

mod api;
mod block;
mod config;
mod error;
mod extractors;
mod limiter;
mod middleware;
mod window;

pub use api::{LimiterResult, RateLimitApi, RateLimiterStats};
pub use block::{
	BlockChecker, BlockStatus, LocalBlockChecker, PersistedBlockChecker, ban_marker_key,
	block_set_key,
};
pub use config::{
	BanSpan, LevelAction, LevelRule, RateLimitConfig, RateLimitKey, RateLimitPolicy, RawPolicy,
	Region,
};
pub use error::RateLimitError;
pub use extractors::{ClientIp, client_identifier, extract_client_ip};
pub use limiter::RateLimitManager;
pub use middleware::RateLimitLayer;
pub use window::{SlidingWindow, window_key};

// vim: ts=4
