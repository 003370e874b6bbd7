//! Adapter for the key/value counter store.
//!
//! The counter store holds sliding-window event sets, block records, the
//! recent comments index and visit counters. Every interaction goes through
//! a [`Pipeline`]: a batch of commands the adapter executes atomically in a
//! single round trip, returning one result per command.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::prelude::*;

/// Bound of a score range
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoreBound {
	NegInf,
	PosInf,
	Inclusive(i64),
	Exclusive(i64),
}

impl ScoreBound {
	/// Whether `score` lies on the allowed side of this bound used as a minimum
	pub fn admits_from_below(&self, score: i64) -> bool {
		match *self {
			ScoreBound::NegInf => true,
			ScoreBound::PosInf => false,
			ScoreBound::Inclusive(min) => score >= min,
			ScoreBound::Exclusive(min) => score > min,
		}
	}

	/// Whether `score` lies on the allowed side of this bound used as a maximum
	pub fn admits_from_above(&self, score: i64) -> bool {
		match *self {
			ScoreBound::NegInf => false,
			ScoreBound::PosInf => true,
			ScoreBound::Inclusive(max) => score <= max,
			ScoreBound::Exclusive(max) => score < max,
		}
	}
}

/// A single counter store command
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CounterCmd {
	/// Add members with scores to a sorted set. Replies with the number of new members.
	ZAdd { key: Box<str>, members: Vec<(i64, Box<str>)> },
	/// Remove members from a sorted set. Replies with the number removed.
	ZRem { key: Box<str>, members: Vec<Box<str>> },
	/// Remove members with score between `min` and `max`. Replies with the number removed.
	ZRemRangeByScore { key: Box<str>, min: ScoreBound, max: ScoreBound },
	/// Remove members by ascending rank, negative ranks count from the end.
	ZRemRangeByRank { key: Box<str>, start: i64, stop: i64 },
	/// Cardinality of a sorted set
	ZCard { key: Box<str> },
	/// Members by descending score with their scores, ranks inclusive
	ZRevRange { key: Box<str>, start: i64, stop: i64 },
	SAdd { key: Box<str>, member: Box<str> },
	SRem { key: Box<str>, member: Box<str> },
	SIsMember { key: Box<str>, member: Box<str> },
	Exists { key: Box<str> },
	Get { key: Box<str> },
	Incr { key: Box<str> },
	SetEx { key: Box<str>, seconds: u64, value: Box<str> },
	/// Expire a key after `millis`. Replies 1 if the key exists, 0 otherwise.
	PExpire { key: Box<str>, millis: u64 },
	Del { key: Box<str> },
}

impl CounterCmd {
	/// Command name, for logs and error messages
	pub fn name(&self) -> &'static str {
		match self {
			CounterCmd::ZAdd { .. } => "ZADD",
			CounterCmd::ZRem { .. } => "ZREM",
			CounterCmd::ZRemRangeByScore { .. } => "ZREMRANGEBYSCORE",
			CounterCmd::ZRemRangeByRank { .. } => "ZREMRANGEBYRANK",
			CounterCmd::ZCard { .. } => "ZCARD",
			CounterCmd::ZRevRange { .. } => "ZREVRANGE",
			CounterCmd::SAdd { .. } => "SADD",
			CounterCmd::SRem { .. } => "SREM",
			CounterCmd::SIsMember { .. } => "SISMEMBER",
			CounterCmd::Exists { .. } => "EXISTS",
			CounterCmd::Get { .. } => "GET",
			CounterCmd::Incr { .. } => "INCR",
			CounterCmd::SetEx { .. } => "SETEX",
			CounterCmd::PExpire { .. } => "PEXPIRE",
			CounterCmd::Del { .. } => "DEL",
		}
	}
}

/// Sorted set member with its score
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoredMember {
	pub member: Box<str>,
	pub score: i64,
}

/// Reply value of a single command
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CounterValue {
	Nil,
	Ok,
	Int(i64),
	Bool(bool),
	Str(Box<str>),
	Scored(Vec<ScoredMember>),
}

impl CounterValue {
	/// Integer view of the reply. Numeric strings (GET of a counter) are parsed.
	pub fn as_int(&self) -> Option<i64> {
		match self {
			CounterValue::Int(n) => Some(*n),
			CounterValue::Bool(b) => Some(i64::from(*b)),
			CounterValue::Str(s) => s.parse().ok(),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> bool {
		match self {
			CounterValue::Bool(b) => *b,
			CounterValue::Int(n) => *n != 0,
			_ => false,
		}
	}

	pub fn into_scored(self) -> Vec<ScoredMember> {
		match self {
			CounterValue::Scored(list) => list,
			_ => Vec::new(),
		}
	}
}

/// Batch of commands executed atomically by [`CounterAdapter::exec`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Pipeline {
	cmds: Vec<CounterCmd>,
}

impl Pipeline {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cmd(mut self, cmd: CounterCmd) -> Self {
		self.cmds.push(cmd);
		self
	}

	pub fn zadd(self, key: &str, score: i64, member: &str) -> Self {
		self.cmd(CounterCmd::ZAdd { key: key.into(), members: vec![(score, member.into())] })
	}

	pub fn zadd_many(self, key: &str, members: impl IntoIterator<Item = (i64, Box<str>)>) -> Self {
		self.cmd(CounterCmd::ZAdd { key: key.into(), members: members.into_iter().collect() })
	}

	pub fn zrem(self, key: &str, members: impl IntoIterator<Item = Box<str>>) -> Self {
		self.cmd(CounterCmd::ZRem { key: key.into(), members: members.into_iter().collect() })
	}

	pub fn zremrangebyscore(self, key: &str, min: ScoreBound, max: ScoreBound) -> Self {
		self.cmd(CounterCmd::ZRemRangeByScore { key: key.into(), min, max })
	}

	pub fn zremrangebyrank(self, key: &str, start: i64, stop: i64) -> Self {
		self.cmd(CounterCmd::ZRemRangeByRank { key: key.into(), start, stop })
	}

	pub fn zcard(self, key: &str) -> Self {
		self.cmd(CounterCmd::ZCard { key: key.into() })
	}

	pub fn zrevrange(self, key: &str, start: i64, stop: i64) -> Self {
		self.cmd(CounterCmd::ZRevRange { key: key.into(), start, stop })
	}

	pub fn sadd(self, key: &str, member: &str) -> Self {
		self.cmd(CounterCmd::SAdd { key: key.into(), member: member.into() })
	}

	pub fn srem(self, key: &str, member: &str) -> Self {
		self.cmd(CounterCmd::SRem { key: key.into(), member: member.into() })
	}

	pub fn sismember(self, key: &str, member: &str) -> Self {
		self.cmd(CounterCmd::SIsMember { key: key.into(), member: member.into() })
	}

	pub fn exists(self, key: &str) -> Self {
		self.cmd(CounterCmd::Exists { key: key.into() })
	}

	pub fn get(self, key: &str) -> Self {
		self.cmd(CounterCmd::Get { key: key.into() })
	}

	pub fn incr(self, key: &str) -> Self {
		self.cmd(CounterCmd::Incr { key: key.into() })
	}

	pub fn setex(self, key: &str, seconds: u64, value: &str) -> Self {
		self.cmd(CounterCmd::SetEx { key: key.into(), seconds, value: value.into() })
	}

	pub fn pexpire(self, key: &str, millis: u64) -> Self {
		self.cmd(CounterCmd::PExpire { key: key.into(), millis })
	}

	pub fn del(self, key: &str) -> Self {
		self.cmd(CounterCmd::Del { key: key.into() })
	}

	pub fn len(&self) -> usize {
		self.cmds.len()
	}

	pub fn is_empty(&self) -> bool {
		self.cmds.is_empty()
	}

	pub fn commands(&self) -> &[CounterCmd] {
		&self.cmds
	}

	pub fn into_commands(self) -> Vec<CounterCmd> {
		self.cmds
	}
}

/// Per-command results of an executed pipeline
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineReply {
	results: Vec<Result<CounterValue, Box<str>>>,
}

impl PipelineReply {
	pub fn new(results: Vec<Result<CounterValue, Box<str>>>) -> Self {
		Self { results }
	}

	pub fn len(&self) -> usize {
		self.results.len()
	}

	pub fn is_empty(&self) -> bool {
		self.results.is_empty()
	}

	pub fn results(&self) -> &[Result<CounterValue, Box<str>>] {
		&self.results
	}

	/// Indices of the commands that failed
	pub fn failed(&self) -> Vec<usize> {
		self.results
			.iter()
			.enumerate()
			.filter_map(|(i, res)| res.is_err().then_some(i))
			.collect()
	}

	/// All values, or `PartialPipelineFailure` if any command failed
	pub fn into_values(self) -> ClResult<Vec<CounterValue>> {
		let failed = self.failed();
		if let Some(&first) = failed.first() {
			let message = match &self.results[first] {
				Err(msg) => msg.clone(),
				Ok(_) => Box::from("unknown"),
			};
			for (i, res) in self.results.iter().enumerate() {
				if let Err(msg) = res {
					error!("pipeline command #{} failed: {}", i, msg);
				}
			}
			return Err(Error::PartialPipelineFailure { failed, message });
		}
		Ok(self.results.into_iter().filter_map(Result::ok).collect())
	}

	/// All values with failed commands replaced by `default`
	pub fn into_values_or(self, default: &CounterValue) -> Vec<CounterValue> {
		self.results
			.into_iter()
			.enumerate()
			.map(|(i, res)| {
				res.unwrap_or_else(|msg| {
					warn!("pipeline command #{} failed, using default: {}", i, msg);
					default.clone()
				})
			})
			.collect()
	}
}

/// Key/value store with atomic sorted-set, set and string primitives
#[async_trait]
pub trait CounterAdapter: Debug + Send + Sync {
	/// Execute every command of `pipeline` atomically in a single round trip.
	///
	/// Transport or protocol failures of the whole call are reported as
	/// `Error::StoreUnavailable`. Failures of individual commands are
	/// reported per command in the returned [`PipelineReply`].
	async fn exec(&self, pipeline: Pipeline) -> ClResult<PipelineReply>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_pipeline_builder() {
		let pipeline = Pipeline::new()
			.zremrangebyscore("post:1.2.3.4", ScoreBound::NegInf, ScoreBound::Exclusive(1000))
			.zadd("post:1.2.3.4", 2000, "2000:abc")
			.zcard("post:1.2.3.4");
		assert_eq!(pipeline.len(), 3);
		assert_eq!(pipeline.commands()[1].name(), "ZADD");
	}

	#[test]
	fn test_reply_partial_failure() {
		let reply = PipelineReply::new(vec![
			Ok(CounterValue::Int(1)),
			Err("WRONGTYPE Operation against a key holding the wrong kind of value".into()),
			Ok(CounterValue::Str("7".into())),
		]);
		assert_eq!(reply.failed(), vec![1]);

		let err = reply.clone().into_values().unwrap_err();
		assert!(matches!(err, Error::PartialPipelineFailure { ref failed, .. } if failed == &[1]));

		let values = reply.into_values_or(&CounterValue::Int(-1));
		assert_eq!(values[1], CounterValue::Int(-1));
		assert_eq!(values[2].as_int(), Some(7));
	}

	#[test]
	fn test_score_bounds() {
		assert!(ScoreBound::Exclusive(10).admits_from_above(9));
		assert!(!ScoreBound::Exclusive(10).admits_from_above(10));
		assert!(ScoreBound::Inclusive(10).admits_from_below(10));
		assert!(ScoreBound::NegInf.admits_from_below(i64::MIN));
		assert!(!ScoreBound::PosInf.admits_from_below(0));
	}
}

// vim: ts=4
