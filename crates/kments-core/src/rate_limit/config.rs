//! Rate Limiting Configuration
//!
//! Policies are written as `[threshold, delayMs, banSecs]` triples and turned
//! into typed, validated rules when the configuration is loaded.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::num::NonZeroU64;

use crate::prelude::*;

/// Operation category a request is counted under
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitKey {
	Base,
	Admin,
	Gets,
	Post,
	Login,
	Logout,
	Delete,
	Hide,
	Count,
	Import,
}

impl RateLimitKey {
	pub const ALL: [RateLimitKey; 10] = [
		RateLimitKey::Base,
		RateLimitKey::Admin,
		RateLimitKey::Gets,
		RateLimitKey::Post,
		RateLimitKey::Login,
		RateLimitKey::Logout,
		RateLimitKey::Delete,
		RateLimitKey::Hide,
		RateLimitKey::Count,
		RateLimitKey::Import,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			RateLimitKey::Base => "base",
			RateLimitKey::Admin => "admin",
			RateLimitKey::Gets => "gets",
			RateLimitKey::Post => "post",
			RateLimitKey::Login => "login",
			RateLimitKey::Logout => "logout",
			RateLimitKey::Delete => "delete",
			RateLimitKey::Hide => "hide",
			RateLimitKey::Count => "count",
			RateLimitKey::Import => "import",
		}
	}
}

impl std::fmt::Display for RateLimitKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Geographic gating of a key, enforced in front of the limiter
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
	Main,
	China,
	#[default]
	All,
	None,
}

/// How long a ban lasts
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BanSpan {
	/// Persisted block set entry, shared by every process
	Permanent,
	/// Expiring marker blocking the identifier on every key
	Expiring(NonZeroU64),
}

/// Action applied when a level's threshold is reached
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelAction {
	/// Suspend the request for this many milliseconds, then allow it
	Delay(u64),
	/// Deny and block the identifier in this process
	Block,
	/// Deny and persist a ban
	Ban(BanSpan),
	/// Deny this request only
	Reject,
}

impl LevelAction {
	pub fn denies(&self) -> bool {
		!matches!(self, LevelAction::Delay(_))
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelRule {
	pub threshold: i64,
	pub action: LevelAction,
}

/// Raw policy as written in the configuration file
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawPolicy {
	/// Window length in milliseconds
	pub cycle: i64,
	#[serde(default)]
	pub region: Region,
	/// `[threshold, delayMs, banSecs]` triples, highest threshold first
	pub level: Vec<[i64; 3]>,
}

/// Validated policy of one key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitPolicy {
	pub cycle_ms: i64,
	pub region: Region,
	levels: Vec<LevelRule>,
}

impl RateLimitPolicy {
	/// Builds a policy, rejecting non-positive cycles and unsorted thresholds
	pub fn new(cycle_ms: i64, region: Region, levels: Vec<LevelRule>) -> ClResult<Self> {
		if cycle_ms <= 0 {
			return Err(Error::ConfigError(format!("cycle must be positive, got {}", cycle_ms)));
		}
		for (i, rule) in levels.iter().enumerate() {
			if rule.threshold < 0 {
				return Err(Error::ConfigError(format!("level[{}]: negative threshold", i)));
			}
			if i > 0 && rule.threshold >= levels[i - 1].threshold {
				return Err(Error::ConfigError(format!(
					"level[{}]: thresholds must strictly decrease ({} after {})",
					i,
					rule.threshold,
					levels[i - 1].threshold
				)));
			}
		}
		Ok(Self { cycle_ms, region, levels })
	}

	pub fn from_raw(raw: &RawPolicy) -> ClResult<Self> {
		let levels = raw
			.level
			.iter()
			.enumerate()
			.map(|(i, triple)| {
				parse_level(*triple).map_err(|msg| Error::ConfigError(format!("level[{}]: {}", i, msg)))
			})
			.collect::<ClResult<Vec<_>>>()?;
		Self::new(raw.cycle, raw.region, levels)
	}

	pub fn levels(&self) -> &[LevelRule] {
		&self.levels
	}

	/// First (most severe) rule whose threshold `count` reaches
	pub fn select(&self, count: i64) -> Option<&LevelRule> {
		self.levels.iter().find(|rule| count >= rule.threshold)
	}
}

fn parse_level([threshold, delay, ban]: [i64; 3]) -> Result<LevelRule, String> {
	let action = match (delay, ban) {
		(delay, 0) if delay >= 0 => LevelAction::Delay(delay as u64),
		(delay, ban) if delay >= 0 => {
			return Err(format!("delay {} cannot be combined with ban {}", delay, ban));
		}
		(-1, -2) => LevelAction::Ban(BanSpan::Permanent),
		(-1, -1) => LevelAction::Block,
		(-1, 0) => LevelAction::Reject,
		(-1, secs) if secs > 0 => {
			LevelAction::Ban(BanSpan::Expiring(NonZeroU64::new(secs as u64).ok_or("zero ban")?))
		}
		(delay, ban) => return Err(format!("unsupported delay/ban combination {}/{}", delay, ban)),
	};
	Ok(LevelRule { threshold, action })
}

/// Policies of every configured key
#[derive(Clone, Debug, Default)]
pub struct RateLimitConfig {
	policies: HashMap<RateLimitKey, RateLimitPolicy>,
}

impl RateLimitConfig {
	pub fn from_raw(raw: &HashMap<RateLimitKey, RawPolicy>) -> ClResult<Self> {
		let mut policies = HashMap::with_capacity(raw.len());
		for (key, raw_policy) in raw {
			let policy = RateLimitPolicy::from_raw(raw_policy).map_err(|err| match err {
				Error::ConfigError(msg) => Error::ConfigError(format!("rateLimit.{}: {}", key, msg)),
				err => err,
			})?;
			policies.insert(*key, policy);
		}
		Ok(Self { policies })
	}

	pub fn with_policy(mut self, key: RateLimitKey, policy: RateLimitPolicy) -> Self {
		self.policies.insert(key, policy);
		self
	}

	pub fn get(&self, key: RateLimitKey) -> Option<&RateLimitPolicy> {
		self.policies.get(&key)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn raw(level: Vec<[i64; 3]>) -> RawPolicy {
		RawPolicy { cycle: 60_000, region: Region::All, level }
	}

	#[test]
	fn test_level_conversion() {
		let level = vec![[500, -1, -2], [100, -1, -1], [50, -1, 600], [20, -1, 0], [10, 1000, 0]];
		let policy = RateLimitPolicy::from_raw(&raw(level)).unwrap();
		let actions: Vec<_> = policy.levels().iter().map(|r| r.action).collect();
		assert_eq!(
			actions,
			vec![
				LevelAction::Ban(BanSpan::Permanent),
				LevelAction::Block,
				LevelAction::Ban(BanSpan::Expiring(NonZeroU64::new(600).unwrap())),
				LevelAction::Reject,
				LevelAction::Delay(1000),
			]
		);
	}

	#[test]
	fn test_select_most_severe_reached() {
		let policy =
			RateLimitPolicy::from_raw(&raw(vec![[500, -1, -2], [100, -1, -1], [10, 1000, 0]])).unwrap();
		assert_eq!(policy.select(150).map(|r| r.threshold), Some(100));
		assert_eq!(policy.select(100).map(|r| r.action), Some(LevelAction::Block));
		assert_eq!(policy.select(9), None);
		assert_eq!(policy.select(10_000).map(|r| r.threshold), Some(500));
	}

	#[test]
	fn test_rejects_malformed() {
		assert!(RateLimitPolicy::from_raw(&raw(vec![[10, -1, -1], [100, -1, -2]])).is_err());
		assert!(RateLimitPolicy::from_raw(&raw(vec![[10, -1, -1], [10, 100, 0]])).is_err());
		assert!(RateLimitPolicy::from_raw(&raw(vec![[10, 5, 3]])).is_err());
		assert!(RateLimitPolicy::from_raw(&raw(vec![[10, -3, 0]])).is_err());
		assert!(RateLimitPolicy::from_raw(&raw(vec![[-1, 100, 0]])).is_err());
		assert!(RateLimitPolicy::from_raw(&RawPolicy { cycle: 0, region: Region::All, level: vec![] })
			.is_err());
	}

	#[test]
	fn test_config_error_names_key() {
		let mut raw_config = HashMap::new();
		raw_config.insert(RateLimitKey::Post, raw(vec![[10, 5, 3]]));
		let err = RateLimitConfig::from_raw(&raw_config).unwrap_err();
		assert!(err.to_string().contains("rateLimit.post: level[0]"), "{}", err);
	}
}

// vim: ts=4
