//! Common types used throughout kments.

use rand::RngExt;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use crate::prelude::*;

// Timestamp //
//***********//
/// Unix timestamp in seconds
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub i64);

impl Timestamp {
	pub fn now() -> Timestamp {
		let res = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
		Timestamp(res.as_secs() as i64)
	}
}

impl std::fmt::Display for Timestamp {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl Serialize for Timestamp {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		serializer.serialize_i64(self.0)
	}
}

impl<'de> Deserialize<'de> for Timestamp {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		Ok(Timestamp(i64::deserialize(deserializer)?))
	}
}

// CommentId //
//***********//
pub const COMMENT_ID_LENGTH: usize = 24;

/// Sequence part of generated ids, seeded randomly per process
static ID_SEQUENCE: LazyLock<AtomicU64> =
	LazyLock::new(|| AtomicU64::new(rand::rng().random::<u64>() >> 16));

/// Opaque comment identifier.
///
/// 24 lowercase hex characters. The first 8 encode the creation time in
/// seconds, so ids of the same length sort by creation time.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommentId(Box<str>);

impl CommentId {
	pub fn parse(id: &str) -> ClResult<Self> {
		let is_hex = id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
		if id.len() != COMMENT_ID_LENGTH || !is_hex {
			return Err(Error::ValidationError(format!("invalid comment id: {}", id)));
		}
		Ok(CommentId(id.into()))
	}

	/// Generate a new id for a comment created at `created_at`
	pub fn generate(created_at: Timestamp) -> Self {
		let seq = ID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
		CommentId(format!("{:08x}{:016x}", created_at.0 as u32, seq).into())
	}

	/// Creation time encoded in the leading 8 hex characters
	pub fn created_at(&self) -> Timestamp {
		let secs = u32::from_str_radix(&self.0[..8], 16).unwrap_or_default();
		Timestamp(i64::from(secs))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl std::fmt::Display for CommentId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

impl Serialize for CommentId {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		serializer.serialize_str(&self.0)
	}
}

impl<'de> Deserialize<'de> for CommentId {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		CommentId::parse(&s).map_err(serde::de::Error::custom)
	}
}

// PageId //
//********//
pub const PAGE_ID_MAX_LENGTH: usize = 64;

/// Stable identifier of a page, naming its comment partition
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PageId(Box<str>);

impl PageId {
	pub fn new(id: &str) -> ClResult<Self> {
		if id.is_empty() {
			return Err(Error::ValidationError("page id cannot be empty".into()));
		}
		if id.len() > PAGE_ID_MAX_LENGTH {
			return Err(Error::ValidationError("page id is too long".into()));
		}
		if id.contains(['.', '*']) {
			return Err(Error::ValidationError("page id cannot contain '.' or '*'".into()));
		}
		Ok(PageId(id.into()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl std::fmt::Display for PageId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

impl<'de> Deserialize<'de> for PageId {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		PageId::new(&s).map_err(serde::de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_generated_ids_sort_by_time() {
		let older = CommentId::generate(Timestamp(1_700_000_000));
		let newer = CommentId::generate(Timestamp(1_700_000_001));
		assert!(older < newer);
		assert_eq!(older.created_at(), Timestamp(1_700_000_000));
		assert_eq!(newer.as_str().len(), COMMENT_ID_LENGTH);
	}

	#[test]
	fn test_same_second_ids_are_distinct() {
		let a = CommentId::generate(Timestamp(1_700_000_000));
		let b = CommentId::generate(Timestamp(1_700_000_000));
		assert_ne!(a, b);
		assert!(a < b);
	}

	#[test]
	fn test_parse_rejects_malformed() {
		assert!(CommentId::parse("6553f100aaaaaaaaaaaaaaaa").is_ok());
		assert!(CommentId::parse("6553F100AAAAAAAAAAAAAAAA").is_err());
		assert!(CommentId::parse("6553f100").is_err());
		assert!(CommentId::parse("6553f100aaaaaaaaaaaaaaa:").is_err());
	}

	#[test]
	fn test_page_id_validation() {
		assert!(PageId::new("3f2a9c").is_ok());
		assert!(PageId::new("").is_err());
		assert!(PageId::new("a.b").is_err());
		assert!(PageId::new("a*").is_err());
		assert!(PageId::new(&"x".repeat(PAGE_ID_MAX_LENGTH + 1)).is_err());
	}
}

// vim: ts=4
