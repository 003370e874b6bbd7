use kments::error::Error as KmentsError;
use std::fmt;

/// Internal error type for the comment adapter
#[derive(Debug)]
pub enum Error {
	Db(sqlx::Error),
	InvalidRow(String),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Error::Db(err) => write!(f, "db error: {}", err),
			Error::InvalidRow(msg) => write!(f, "invalid row: {}", msg),
		}
	}
}

impl std::error::Error for Error {}

impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Error::Db(err)
	}
}

impl From<Error> for KmentsError {
	fn from(err: Error) -> Self {
		tracing::warn!("DB: {}", err);
		match err {
			Error::Db(sqlx::Error::RowNotFound) => KmentsError::NotFound,
			Error::Db(err) => KmentsError::StoreUnavailable(err.to_string()),
			Error::InvalidRow(msg) => KmentsError::Internal(msg),
		}
	}
}

// vim: ts=4
