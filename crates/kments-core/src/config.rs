//! Service configuration
//!
//! Loaded from a YAML file, then overridden from the environment:
//! `KMENTS_REDIS_URL`, `KMENTS_DB`, `KMENTS_LISTEN` and `KMENTS_ADMIN_TOKEN`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::app::ServerMode;
use crate::prelude::*;
use crate::rate_limit::{RateLimitConfig, RateLimitKey, RawPolicy};
use crate::recent::RecentConfig;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KmentsConfig {
	pub listen: Box<str>,
	pub mode: ServerMode,
	pub redis_url: Box<str>,
	/// Path of the SQLite comment database
	pub db: Box<str>,
	/// Bearer token of the moderation routes, which are disabled without one
	pub admin_token: Option<Box<str>>,
	pub rate_limit: HashMap<RateLimitKey, RawPolicy>,
	pub recent: RecentConfig,
}

impl Default for KmentsConfig {
	fn default() -> Self {
		Self {
			listen: "127.0.0.1:8080".into(),
			mode: ServerMode::Standalone,
			redis_url: "redis://127.0.0.1:6379/".into(),
			db: "kments.db".into(),
			admin_token: None,
			rate_limit: HashMap::new(),
			recent: RecentConfig::default(),
		}
	}
}

impl KmentsConfig {
	/// Parses and validates a YAML document
	pub fn from_yaml(text: &str) -> ClResult<Self> {
		let config: KmentsConfig = serde_yaml::from_str(text)
			.map_err(|err| Error::ConfigError(format!("invalid config: {}", err)))?;
		config.validate()?;
		Ok(config)
	}

	/// Loads the config file, falling back to defaults when it does not exist
	pub fn load(path: &Path) -> ClResult<Self> {
		let config = match std::fs::read_to_string(path) {
			Ok(text) => Self::from_yaml(&text)?,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
				warn!("config file {} not found, using defaults", path.display());
				Self::default()
			}
			Err(err) => return Err(err.into()),
		};
		Ok(config.with_env_overrides(|name| std::env::var(name).ok()))
	}

	pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
		if let Some(url) = lookup("KMENTS_REDIS_URL") {
			self.redis_url = url.into();
		}
		if let Some(db) = lookup("KMENTS_DB") {
			self.db = db.into();
		}
		if let Some(listen) = lookup("KMENTS_LISTEN") {
			self.listen = listen.into();
		}
		if let Some(token) = lookup("KMENTS_ADMIN_TOKEN") {
			self.admin_token = Some(token.into());
		}
		self
	}

	pub fn validate(&self) -> ClResult<()> {
		self.rate_limit_config()?;
		if self.admin_token.as_deref().is_some_and(str::is_empty) {
			return Err(Error::ConfigError("adminToken cannot be empty".into()));
		}
		if self.recent.capacity == 0 {
			return Err(Error::ConfigError("recent.capacity must be positive".into()));
		}
		Ok(())
	}

	/// Typed rate limit policies
	pub fn rate_limit_config(&self) -> ClResult<RateLimitConfig> {
		RateLimitConfig::from_raw(&self.rate_limit)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::rate_limit::LevelAction;

	const SAMPLE: &str = r"
listen: 0.0.0.0:3000
mode: proxy
rateLimit:
  post:
    cycle: 60000
    region: china
    level: [[500, -1, -2], [100, -1, -1], [10, 1000, 0]]
  gets:
    cycle: 1000
    level: [[30, -1, 0]]
recent:
  parallelThreshold: 4
";

	#[test]
	fn test_parse_sample() {
		let config = KmentsConfig::from_yaml(SAMPLE).unwrap();
		assert_eq!(&*config.listen, "0.0.0.0:3000");
		assert_eq!(config.mode, ServerMode::Proxy);
		assert_eq!(config.recent.capacity, 10);
		assert_eq!(config.recent.parallel_threshold, 4);

		let limits = config.rate_limit_config().unwrap();
		let post = limits.get(RateLimitKey::Post).unwrap();
		assert_eq!(post.cycle_ms, 60_000);
		assert_eq!(post.select(150).map(|r| r.action), Some(LevelAction::Block));
		assert!(limits.get(RateLimitKey::Count).is_none());
	}

	#[test]
	fn test_malformed_policy_rejected_at_load() {
		let text = "rateLimit:\n  post:\n    cycle: 1000\n    level: [[10, -1, -1], [20, -1, -2]]\n";
		assert!(matches!(KmentsConfig::from_yaml(text), Err(Error::ConfigError(_))));
		let text = "rateLimit:\n  nope:\n    cycle: 1000\n    level: []\n";
		assert!(matches!(KmentsConfig::from_yaml(text), Err(Error::ConfigError(_))));
	}

	#[test]
	fn test_env_overrides() {
		let config = KmentsConfig::default().with_env_overrides(|name| match name {
			"KMENTS_REDIS_URL" => Some("redis://cache:6379/1".into()),
			_ => None,
		});
		assert_eq!(&*config.redis_url, "redis://cache:6379/1");
		assert_eq!(&*config.db, "kments.db");
		assert!(config.admin_token.is_none());

		let config = KmentsConfig::default().with_env_overrides(|name| {
			(name == "KMENTS_ADMIN_TOKEN").then(|| "s3cret".to_string())
		});
		assert_eq!(config.admin_token.as_deref(), Some("s3cret"));
	}

	#[test]
	fn test_empty_admin_token_rejected() {
		assert!(matches!(KmentsConfig::from_yaml("adminToken: ''"), Err(Error::ConfigError(_))));
		let config = KmentsConfig::from_yaml("adminToken: s3cret").unwrap();
		assert_eq!(config.admin_token.as_deref(), Some("s3cret"));
	}
}

// vim: ts=4
