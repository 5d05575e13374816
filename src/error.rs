//! Client-level error types shared across the transport, refresh, and endpoint layers.

// self
use crate::{_prelude::*, auth::RefreshError};

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, body read).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Credential refresh failed, timed out, or was abandoned.
	#[error("Credential refresh failed.")]
	Refresh(
		#[from]
		#[source]
		RefreshError,
	),

	/// Backend kept rejecting the credential after the one permitted retry.
	#[error("Backend rejected the credential after a retry (HTTP {status}).")]
	AuthorizationDenied {
		/// HTTP status code of the rejected replay.
		status: u16,
	},
	/// Backend answered with a non-success status that is not retried.
	#[error("Backend responded with HTTP {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Lossy UTF-8 rendering of the response body.
		body: String,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be encoded as JSON.")]
	Encode(#[source] serde_json::Error),
	/// Response body could not be parsed into the expected shape.
	#[error("Response body could not be decoded.")]
	Decode {
		/// Structured parsing failure including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the decoded response.
		status: u16,
	},
}
impl Error {
	/// Returns `true` when the backend's authorization failure could not be recovered, either
	/// because the replay was rejected again or because the refresh itself failed.
	pub fn is_authorization_denied(&self) -> bool {
		matches!(self, Self::AuthorizationDenied { .. } | Self::Refresh(_))
	}

	/// HTTP status code tied to the error, when one was received.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::AuthorizationDenied { status }
			| Self::Status { status, .. }
			| Self::Decode { status, .. } => Some(*status),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised while building a client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A required setting was not provided.
	#[error("Required setting `{name}` is missing.")]
	Missing {
		/// Setting name.
		name: &'static str,
	},
	/// Base address cannot be parsed.
	#[error("Base address `{value}` is invalid.")]
	InvalidBaseUrl {
		/// Raw value that failed to parse.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request path cannot be joined onto the base address.
	#[error("Request path `{path}` is invalid.")]
	InvalidPath {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A millisecond duration setting is not a non-negative integer.
	#[error("Setting `{name}` must be a whole number of milliseconds, got `{value}`.")]
	InvalidDuration {
		/// Setting name.
		name: &'static str,
		/// Raw value that failed to parse.
		value: String,
	},
	/// Credential key is empty.
	#[error("Credential key must not be empty.")]
	EmptyCredentialKey,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling `{path}`.")]
	Network {
		/// Request path that failed.
		path: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error for the given request path.
	pub fn network(
		path: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { path: path.into(), source: Box::new(src) }
	}
}
