//! Redis implementation of the counter store.
//!
//! Every pipeline is sent as one `MULTI`/`EXEC` transaction. Command errors
//! inside the transaction are reported per command, connection and protocol
//! failures fail the whole call.

#![forbid(unsafe_code)]

mod error;
mod reply;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{Client, Value};
use std::time::Duration;

use kments::counter_adapter::{CounterAdapter, CounterCmd, Pipeline, PipelineReply, ScoreBound};
use kments::prelude::*;

pub use error::Error;

const CONNECTION_TIMEOUT: Duration = Duration::from_millis(500);
const RETRIES: usize = 1;

fn bound_arg(bound: ScoreBound) -> String {
	match bound {
		ScoreBound::NegInf => "-inf".into(),
		ScoreBound::PosInf => "+inf".into(),
		ScoreBound::Inclusive(score) => score.to_string(),
		ScoreBound::Exclusive(score) => format!("({}", score),
	}
}

/// Builds the transaction, returning which replies are scored ranges
fn build_pipe(commands: Vec<CounterCmd>) -> (redis::Pipeline, Vec<bool>) {
	let mut pipe = redis::pipe();
	pipe.atomic().ignore_errors();
	let mut scored = Vec::with_capacity(commands.len());

	for cmd in commands {
		scored.push(matches!(cmd, CounterCmd::ZRevRange { .. }));
		match cmd {
			CounterCmd::ZAdd { key, members } => {
				pipe.cmd("ZADD").arg(&*key);
				for (score, member) in &members {
					pipe.arg(*score).arg(&**member);
				}
			}
			CounterCmd::ZRem { key, members } => {
				pipe.cmd("ZREM").arg(&*key);
				for member in &members {
					pipe.arg(&**member);
				}
			}
			CounterCmd::ZRemRangeByScore { key, min, max } => {
				pipe.cmd("ZREMRANGEBYSCORE").arg(&*key).arg(bound_arg(min)).arg(bound_arg(max));
			}
			CounterCmd::ZRemRangeByRank { key, start, stop } => {
				pipe.cmd("ZREMRANGEBYRANK").arg(&*key).arg(start).arg(stop);
			}
			CounterCmd::ZCard { key } => {
				pipe.cmd("ZCARD").arg(&*key);
			}
			CounterCmd::ZRevRange { key, start, stop } => {
				pipe.cmd("ZREVRANGE").arg(&*key).arg(start).arg(stop).arg("WITHSCORES");
			}
			CounterCmd::SAdd { key, member } => {
				pipe.cmd("SADD").arg(&*key).arg(&*member);
			}
			CounterCmd::SRem { key, member } => {
				pipe.cmd("SREM").arg(&*key).arg(&*member);
			}
			CounterCmd::SIsMember { key, member } => {
				pipe.cmd("SISMEMBER").arg(&*key).arg(&*member);
			}
			CounterCmd::Exists { key } => {
				pipe.cmd("EXISTS").arg(&*key);
			}
			CounterCmd::Get { key } => {
				pipe.cmd("GET").arg(&*key);
			}
			CounterCmd::Incr { key } => {
				pipe.cmd("INCR").arg(&*key);
			}
			CounterCmd::SetEx { key, seconds, value } => {
				pipe.cmd("SETEX").arg(&*key).arg(seconds).arg(&*value);
			}
			CounterCmd::PExpire { key, millis } => {
				pipe.cmd("PEXPIRE").arg(&*key).arg(millis);
			}
			CounterCmd::Del { key } => {
				pipe.cmd("DEL").arg(&*key);
			}
		}
	}
	(pipe, scored)
}

#[derive(Clone)]
pub struct CounterAdapterRedis {
	conn: ConnectionManager,
}

impl std::fmt::Debug for CounterAdapterRedis {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CounterAdapterRedis").finish_non_exhaustive()
	}
}

impl CounterAdapterRedis {
	pub async fn new(redis_url: &str) -> ClResult<Self> {
		let config = ConnectionManagerConfig::new()
			.set_number_of_retries(RETRIES)
			.set_connection_timeout(Some(CONNECTION_TIMEOUT));

		let client = Client::open(redis_url).map_err(Error::from)?;
		let conn = client.get_connection_manager_with_config(config).await.map_err(Error::from)?;
		info!("connected to redis");

		Ok(Self { conn })
	}
}

#[async_trait]
impl CounterAdapter for CounterAdapterRedis {
	async fn exec(&self, pipeline: Pipeline) -> ClResult<PipelineReply> {
		if pipeline.is_empty() {
			return Ok(PipelineReply::new(Vec::new()));
		}
		let (pipe, scored) = build_pipe(pipeline.into_commands());

		let mut conn = self.conn.clone();
		let values: Vec<Value> = pipe.query_async(&mut conn).await.map_err(Error::from)?;
		if values.len() != scored.len() {
			return Err(Error::UnexpectedReply(format!(
				"{} replies for {} commands",
				values.len(),
				scored.len()
			))
			.into());
		}

		let results = values
			.into_iter()
			.zip(scored)
			.map(|(value, scored)| reply::to_counter_value(value, scored))
			.collect();
		Ok(PipelineReply::new(results))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_bound_args() {
		assert_eq!(bound_arg(ScoreBound::NegInf), "-inf");
		assert_eq!(bound_arg(ScoreBound::Inclusive(500)), "500");
		assert_eq!(bound_arg(ScoreBound::Exclusive(500)), "(500");
	}

	#[test]
	fn test_scored_flags() {
		let pipeline = Pipeline::new().zadd("k", 1, "m").zrevrange("k", 0, -1).zcard("k");
		let (_, scored) = build_pipe(pipeline.into_commands());
		assert_eq!(scored, vec![false, true, false]);
	}
}

// vim: ts=4
