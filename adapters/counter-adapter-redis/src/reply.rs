//! Conversion of redis replies into counter values.
//!
//! Scored ranges arrive flat (`member, score, ...`) over RESP2 and as nested
//! pairs over RESP3, both are accepted.

use redis::Value;

use kments::counter_adapter::{CounterValue, ScoredMember};

pub(crate) type CmdResult = Result<CounterValue, Box<str>>;

pub(crate) fn to_counter_value(value: Value, scored: bool) -> CmdResult {
	match value {
		Value::ServerError(err) => Err(format!("{:?}", err).into()),
		Value::Nil => Ok(CounterValue::Nil),
		Value::Okay => Ok(CounterValue::Ok),
		Value::Int(n) => Ok(CounterValue::Int(n)),
		Value::Boolean(b) => Ok(CounterValue::Bool(b)),
		Value::Double(f) => Ok(CounterValue::Int(f as i64)),
		Value::Array(items) | Value::Set(items) if scored => parse_scored(items),
		Value::SimpleString(s) if s == "OK" => Ok(CounterValue::Ok),
		value @ (Value::SimpleString(_) | Value::BulkString(_) | Value::VerbatimString { .. }) => {
			Ok(CounterValue::Str(text(value)?))
		}
		other => Err(format!("unsupported reply {:?}", other).into()),
	}
}

fn parse_scored(items: Vec<Value>) -> CmdResult {
	let nested = items.first().is_some_and(|v| matches!(v, Value::Array(_)));
	let pairs = if nested {
		items
			.into_iter()
			.map(|item| match item {
				Value::Array(pair) => two(pair),
				other => Err(format!("malformed scored entry {:?}", other).into()),
			})
			.collect::<Result<Vec<_>, Box<str>>>()?
	} else {
		if items.len() % 2 != 0 {
			return Err("odd number of values in scored reply".into());
		}
		let mut iter = items.into_iter();
		let mut pairs = Vec::new();
		while let (Some(member), Some(score)) = (iter.next(), iter.next()) {
			pairs.push((member, score));
		}
		pairs
	};

	let list = pairs
		.into_iter()
		.map(|(member, score)| Ok(ScoredMember { member: text(member)?, score: parse_score(score)? }))
		.collect::<Result<Vec<_>, Box<str>>>()?;
	Ok(CounterValue::Scored(list))
}

fn two(pair: Vec<Value>) -> Result<(Value, Value), Box<str>> {
	let mut iter = pair.into_iter();
	match (iter.next(), iter.next(), iter.next()) {
		(Some(a), Some(b), None) => Ok((a, b)),
		_ => Err("malformed scored pair".into()),
	}
}

fn text(value: Value) -> Result<Box<str>, Box<str>> {
	match value {
		Value::BulkString(bytes) => Ok(String::from_utf8_lossy(&bytes).into()),
		Value::SimpleString(s) | Value::VerbatimString { text: s, .. } => Ok(s.into()),
		other => Err(format!("expected string, got {:?}", other).into()),
	}
}

fn parse_score(value: Value) -> Result<i64, Box<str>> {
	match value {
		Value::Double(f) => Ok(f as i64),
		Value::Int(n) => Ok(n),
		value => {
			let s = text(value)?;
			s.parse::<f64>().map(|f| f as i64).map_err(|_| format!("invalid score {}", s).into())
		}
	}
}


// vim: ts=4
