//! Contract for obtaining a replacement credential after the backend answers 401.
//!
//! The client never talks to a refresh endpoint on its own. Deployments plug an implementation
//! of [`TokenRefresher`] into the client; until then [`UnimplementedRefresher`] fails every
//! attempt, which turns each 401 into [`RefreshError::Unsupported`] for the caller.

// self
use crate::{_prelude::*, auth::Credential};

/// Boxed future returned by [`TokenRefresher::refresh`].
pub type RefreshFuture<'a> = Pin<Box<dyn Future<Output = Result<Credential, RefreshError>> + 'a + Send>>;

/// Source of replacement credentials.
///
/// The client guarantees at most one call is in flight per client instance; requests that hit
/// a 401 meanwhile wait for that call's outcome instead of starting their own.
pub trait TokenRefresher
where
	Self: Send + Sync,
{
	/// Obtains a new credential.
	fn refresh(&self, context: RefreshContext) -> RefreshFuture<'_>;
}

/// Details about the rejected request that triggered a refresh.
#[derive(Clone, Debug)]
pub struct RefreshContext {
	/// Credential the backend rejected, if the request carried one.
	pub rejected: Option<Credential>,
	/// Path of the request that received the 401.
	pub path: String,
}

/// Refresh failures shared verbatim with every request waiting on the same refresh.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshError {
	/// No refresh flow is wired into the client.
	#[error("Unauthorized, credential refresh flow is not implemented.")]
	Unsupported,
	/// The refresh collaborator reported a failure.
	#[error("Credential refresh failed: {message}.")]
	Failed {
		/// Collaborator-supplied reason string.
		message: String,
	},
	/// The refresh did not conclude within the configured timeout.
	#[error("Credential refresh did not conclude within {timeout:?}.")]
	TimedOut {
		/// Timeout that elapsed.
		timeout: Duration,
	},
	/// The request driving the refresh was dropped before the refresh concluded.
	#[error("Credential refresh was abandoned before it concluded.")]
	Abandoned,
}
impl RefreshError {
	/// Builds a [`RefreshError::Failed`] from any displayable reason.
	pub fn failed(message: impl Display) -> Self {
		Self::Failed { message: message.to_string() }
	}
}

/// Refresher used until a real refresh flow exists; every attempt fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnimplementedRefresher;
impl TokenRefresher for UnimplementedRefresher {
	fn refresh(&self, _context: RefreshContext) -> RefreshFuture<'_> {
		Box::pin(async { Err(RefreshError::Unsupported) })
	}
}
