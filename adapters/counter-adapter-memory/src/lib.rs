//! In-process implementation of the counter store.
//!
//! One mutex guards the whole keyspace, so every pipeline executes
//! atomically. Replies and error messages follow Redis conventions so the
//! core behaves the same on both adapters.

#![forbid(unsafe_code)]

mod zset;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use kments::counter_adapter::{CounterAdapter, CounterCmd, CounterValue, Pipeline, PipelineReply};
use kments::prelude::*;

use zset::ZSet;

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

#[derive(Debug)]
enum Entry {
	Str(Box<str>),
	Set(HashSet<Box<str>>),
	ZSet(ZSet),
}

type CmdResult = Result<CounterValue, Box<str>>;

#[derive(Debug, Default)]
struct Keyspace {
	entries: HashMap<Box<str>, Entry>,
	expires_at: HashMap<Box<str>, Instant>,
}

impl Keyspace {
	fn live(&mut self, key: &str) -> Option<&mut Entry> {
		if self.expires_at.get(key).is_some_and(|at| *at <= Instant::now()) {
			self.remove(key);
		}
		self.entries.get_mut(key)
	}

	/// Removes a key with its expiry, returning whether it existed
	fn remove(&mut self, key: &str) -> bool {
		self.expires_at.remove(key);
		self.entries.remove(key).is_some()
	}

	fn zset_mut(&mut self, key: &str) -> Result<&mut ZSet, Box<str>> {
		if self.live(key).is_none() {
			self.entries.insert(key.into(), Entry::ZSet(ZSet::default()));
		}
		match self.entries.get_mut(key) {
			Some(Entry::ZSet(zset)) => Ok(zset),
			_ => Err(WRONGTYPE.into()),
		}
	}

	fn set_mut(&mut self, key: &str) -> Result<&mut HashSet<Box<str>>, Box<str>> {
		if self.live(key).is_none() {
			self.entries.insert(key.into(), Entry::Set(HashSet::new()));
		}
		match self.entries.get_mut(key) {
			Some(Entry::Set(set)) => Ok(set),
			_ => Err(WRONGTYPE.into()),
		}
	}

	/// Runs `f` on an existing sorted set, `default` if the key is missing
	fn with_zset<T>(
		&mut self,
		key: &str,
		default: T,
		f: impl FnOnce(&mut ZSet) -> T,
	) -> Result<T, Box<str>> {
		let res = match self.live(key) {
			None => return Ok(default),
			Some(Entry::ZSet(zset)) => f(zset),
			Some(_) => return Err(WRONGTYPE.into()),
		};
		self.drop_if_empty(key);
		Ok(res)
	}

	fn drop_if_empty(&mut self, key: &str) {
		let empty = match self.entries.get(key) {
			Some(Entry::ZSet(zset)) => zset.is_empty(),
			Some(Entry::Set(set)) => set.is_empty(),
			_ => false,
		};
		if empty {
			self.remove(key);
		}
	}

	fn apply(&mut self, cmd: CounterCmd) -> CmdResult {
		match cmd {
			CounterCmd::ZAdd { key, members } => {
				let zset = self.zset_mut(&key)?;
				let mut added = 0;
				for (score, member) in &members {
					if zset.add(*score, member) {
						added += 1;
					}
				}
				self.drop_if_empty(&key);
				Ok(CounterValue::Int(added))
			}
			CounterCmd::ZRem { key, members } => {
				let removed = self.with_zset(&key, 0, |zset| {
					let mut removed = 0;
					for member in &members {
						if zset.remove(member) {
							removed += 1;
						}
					}
					removed
				})?;
				Ok(CounterValue::Int(removed))
			}
			CounterCmd::ZRemRangeByScore { key, min, max } => {
				let removed =
					self.with_zset(&key, 0, |zset| zset.remove_range_by_score(min, max))?;
				Ok(CounterValue::Int(removed as i64))
			}
			CounterCmd::ZRemRangeByRank { key, start, stop } => {
				let removed =
					self.with_zset(&key, 0, |zset| zset.remove_range_by_rank(start, stop))?;
				Ok(CounterValue::Int(removed as i64))
			}
			CounterCmd::ZCard { key } => {
				let len = self.with_zset(&key, 0, |zset| zset.len())?;
				Ok(CounterValue::Int(len as i64))
			}
			CounterCmd::ZRevRange { key, start, stop } => {
				let list = self.with_zset(&key, Vec::new(), |zset| zset.rev_range(start, stop))?;
				Ok(CounterValue::Scored(list))
			}
			CounterCmd::SAdd { key, member } => {
				let added = self.set_mut(&key)?.insert(member);
				Ok(CounterValue::Int(i64::from(added)))
			}
			CounterCmd::SRem { key, member } => {
				let removed = match self.live(&key) {
					None => false,
					Some(Entry::Set(set)) => set.remove(&member),
					Some(_) => return Err(WRONGTYPE.into()),
				};
				self.drop_if_empty(&key);
				Ok(CounterValue::Int(i64::from(removed)))
			}
			CounterCmd::SIsMember { key, member } => match self.live(&key) {
				None => Ok(CounterValue::Bool(false)),
				Some(Entry::Set(set)) => Ok(CounterValue::Bool(set.contains(&member))),
				Some(_) => Err(WRONGTYPE.into()),
			},
			CounterCmd::Exists { key } => Ok(CounterValue::Int(i64::from(self.live(&key).is_some()))),
			CounterCmd::Get { key } => match self.live(&key) {
				None => Ok(CounterValue::Nil),
				Some(Entry::Str(value)) => Ok(CounterValue::Str(value.clone())),
				Some(_) => Err(WRONGTYPE.into()),
			},
			CounterCmd::Incr { key } => {
				let next = match self.live(&key) {
					None => {
						self.entries.insert(key, Entry::Str("1".into()));
						return Ok(CounterValue::Int(1));
					}
					Some(Entry::Str(value)) => {
						let next = value
							.parse::<i64>()
							.ok()
							.and_then(|n| n.checked_add(1))
							.ok_or("ERR value is not an integer or out of range")?;
						*value = next.to_string().into();
						next
					}
					Some(_) => return Err(WRONGTYPE.into()),
				};
				Ok(CounterValue::Int(next))
			}
			CounterCmd::SetEx { key, seconds, value } => {
				if seconds == 0 {
					return Err("ERR invalid expire time in 'setex' command".into());
				}
				self.expires_at.insert(key.clone(), Instant::now() + Duration::from_secs(seconds));
				self.entries.insert(key, Entry::Str(value));
				Ok(CounterValue::Ok)
			}
			CounterCmd::PExpire { key, millis } => {
				if self.live(&key).is_none() {
					return Ok(CounterValue::Int(0));
				}
				self.expires_at.insert(key, Instant::now() + Duration::from_millis(millis));
				Ok(CounterValue::Int(1))
			}
			CounterCmd::Del { key } => {
				let existed = self.live(&key).is_some();
				self.remove(&key);
				Ok(CounterValue::Int(i64::from(existed)))
			}
		}
	}
}

/// Counter store held in process memory
#[derive(Debug, Default)]
pub struct CounterAdapterMemory {
	keyspace: Mutex<Keyspace>,
	exec_count: AtomicU64,
	unavailable: AtomicBool,
}

impl CounterAdapterMemory {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of pipelines executed so far (store round trips)
	pub fn exec_count(&self) -> u64 {
		self.exec_count.load(Ordering::SeqCst)
	}

	/// Makes every following call fail as if the store was unreachable
	pub fn set_unavailable(&self, unavailable: bool) {
		debug!("memory counter store unavailable: {}", unavailable);
		self.unavailable.store(unavailable, Ordering::SeqCst);
	}

	pub fn key_count(&self) -> usize {
		self.keyspace.lock().entries.len()
	}
}

#[async_trait]
impl CounterAdapter for CounterAdapterMemory {
	async fn exec(&self, pipeline: Pipeline) -> ClResult<PipelineReply> {
		self.exec_count.fetch_add(1, Ordering::SeqCst);
		if self.unavailable.load(Ordering::SeqCst) {
			return Err(Error::StoreUnavailable("memory store switched off".into()));
		}

		let mut keyspace = self.keyspace.lock();
		let results: Vec<CmdResult> =
			pipeline.into_commands().into_iter().map(|cmd| keyspace.apply(cmd)).collect();
		Ok(PipelineReply::new(results))
	}
}

// vim: ts=4
