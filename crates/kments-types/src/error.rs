//! Error type shared by the core, the HTTP surface and the adapters.

use axum::{Json, http::StatusCode, response::IntoResponse};

pub type ClResult<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
	NotFound,
	PermissionDenied,
	Parse,
	/// Input rejected before reaching any store
	ValidationError(String),
	/// Invalid configuration detected at load time
	ConfigError(String),
	/// A counter or document store call failed at the transport or protocol level
	StoreUnavailable(String),
	/// Some commands of an atomic batch failed while others succeeded
	PartialPipelineFailure {
		/// Indices of the failed commands within the batch
		failed: Vec<usize>,
		/// First error message reported by the store
		message: Box<str>,
	},
	Internal(String),

	// externals
	Io(std::io::Error),
}

impl Error {
	/// Error code used in JSON error bodies
	pub fn code(&self) -> &'static str {
		match self {
			Error::NotFound => "E-NOT-FOUND",
			Error::PermissionDenied => "E-PERMISSION",
			Error::Parse | Error::ValidationError(_) => "E-VALIDATION",
			Error::ConfigError(_) => "E-CONFIG",
			Error::StoreUnavailable(_) => "E-STORE-UNAVAILABLE",
			Error::PartialPipelineFailure { .. } => "E-STORE-PARTIAL",
			Error::Internal(_) | Error::Io(_) => "E-INTERNAL",
		}
	}

	pub fn status(&self) -> StatusCode {
		match self {
			Error::NotFound => StatusCode::NOT_FOUND,
			Error::PermissionDenied => StatusCode::FORBIDDEN,
			Error::Parse | Error::ValidationError(_) => StatusCode::BAD_REQUEST,
			Error::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
			Error::ConfigError(_)
			| Error::PartialPipelineFailure { .. }
			| Error::Internal(_)
			| Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Error::NotFound => write!(f, "not found"),
			Error::PermissionDenied => write!(f, "permission denied"),
			Error::Parse => write!(f, "parse error"),
			Error::ValidationError(msg) => write!(f, "validation error: {}", msg),
			Error::ConfigError(msg) => write!(f, "config error: {}", msg),
			Error::StoreUnavailable(msg) => write!(f, "store unavailable: {}", msg),
			Error::PartialPipelineFailure { failed, message } => {
				write!(f, "pipeline commands {:?} failed: {}", failed, message)
			}
			Error::Internal(msg) => write!(f, "internal error: {}", msg),
			Error::Io(err) => write!(f, "io error: {}", err),
		}
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Error::Io(err) => Some(err),
			_ => None,
		}
	}
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Self::Io(err)
	}
}

impl From<serde_json::Error> for Error {
	fn from(_err: serde_json::Error) -> Self {
		Self::Parse
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> axum::response::Response {
		let status = self.status();
		// Store details stay in the logs, clients only see the code
		let message = match &self {
			Error::ValidationError(msg) => msg.clone(),
			Error::NotFound => "not found".to_string(),
			Error::PermissionDenied => "permission denied".to_string(),
			_ => "internal error".to_string(),
		};
		if status.is_server_error() {
			tracing::warn!("request failed: {}", self);
		}
		let body = serde_json::json!({
			"error": {
				"code": self.code(),
				"message": message,
			}
		});
		(status, Json(body)).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_status_mapping() {
		assert_eq!(
			Error::StoreUnavailable("down".into()).status(),
			StatusCode::SERVICE_UNAVAILABLE
		);
		assert_eq!(
			Error::PartialPipelineFailure { failed: vec![1], message: "WRONGTYPE".into() }.status(),
			StatusCode::INTERNAL_SERVER_ERROR
		);
		assert_eq!(Error::ValidationError("ip".into()).status(), StatusCode::BAD_REQUEST);
	}

	#[test]
	fn test_display_lists_failed_commands() {
		let err = Error::PartialPipelineFailure { failed: vec![0, 2], message: "boom".into() };
		assert_eq!(err.to_string(), "pipeline commands [0, 2] failed: boom");
	}
}

// vim: ts=4
