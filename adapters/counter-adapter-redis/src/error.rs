use kments::error::Error as KmentsError;
use std::fmt;

/// Internal error type for the redis adapter
#[derive(Debug)]
pub enum Error {
	Redis(redis::RedisError),
	UnexpectedReply(String),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Error::Redis(err) => write!(f, "redis error: {}", err),
			Error::UnexpectedReply(msg) => write!(f, "unexpected reply: {}", msg),
		}
	}
}

impl std::error::Error for Error {}

impl From<redis::RedisError> for Error {
	fn from(err: redis::RedisError) -> Self {
		Error::Redis(err)
	}
}

impl From<Error> for KmentsError {
	fn from(err: Error) -> Self {
		tracing::warn!("{}", err);
		KmentsError::StoreUnavailable(err.to_string())
	}
}

// vim: ts=4
