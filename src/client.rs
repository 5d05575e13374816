//! Bearer-decorating API client with single-flight credential refresh.
//!
//! Every call reads the credential from the configured [`CredentialStore`] and attaches it as a
//! bearer header. A 401 on a request that has not been replayed yet triggers the refresh
//! protocol: the first such request runs the [`TokenRefresher`] while later ones queue behind
//! it, and once the refresh concludes every queued request is settled (in arrival order) with
//! the same outcome. Successful settlements replay the original request exactly once; a second
//! 401 surfaces as [`Error::AuthorizationDenied`].

mod metrics;
mod queue;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{Credential, RefreshContext, RefreshError, TokenRefresher, UnimplementedRefresher},
	config::ClientConfig,
	http::{ApiRequest, ApiResponse, HttpTransport},
	obs::{self, CallKind, CallOutcome, CallSpan},
	store::{CredentialStore, MemoryStore, StoreError},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;
use queue::{RefreshQueue, Ticket};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestHttpClient>;

/// Coordinates backend calls, credential decoration, and refresh recovery.
///
/// Clones share the transport, store, refresher, metrics, and refresh state, so one client per
/// process (cloned into every call site) keeps refreshes serialized.
pub struct ApiClient<T>
where
	T: HttpTransport,
{
	/// HTTP transport used for every backend call.
	pub transport: Arc<T>,
	/// Store the bearer credential is read from and refreshed credentials are written to.
	pub store: Arc<dyn CredentialStore>,
	/// Collaborator that produces replacement credentials.
	pub refresher: Arc<dyn TokenRefresher>,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	config: Arc<ClientConfig>,
	refresh: Arc<RefreshQueue>,
}
impl<T> ApiClient<T>
where
	T: HttpTransport,
{
	/// Creates a client over a caller-provided transport.
	///
	/// The client starts with an empty [`MemoryStore`] and the [`UnimplementedRefresher`]; use
	/// [`ApiClient::with_store`] and [`ApiClient::with_refresher`] to replace them.
	pub fn with_transport(config: ClientConfig, transport: impl Into<Arc<T>>) -> Self {
		Self {
			transport: transport.into(),
			store: Arc::new(MemoryStore::default()),
			refresher: Arc::new(UnimplementedRefresher),
			refresh_metrics: Default::default(),
			config: Arc::new(config),
			refresh: Default::default(),
		}
	}

	/// Replaces the credential store.
	pub fn with_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
		self.store = store;

		self
	}

	/// Replaces the refresh collaborator.
	pub fn with_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
		self.refresher = refresher;

		self
	}

	/// Configuration the client was built with.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Returns `true` while a credential refresh is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.refresh.is_refreshing()
	}

	/// Number of requests currently waiting on the in-flight refresh.
	pub fn pending_refresh_waiters(&self) -> usize {
		self.refresh.pending()
	}

	/// Reads the credential attached to outgoing calls.
	pub async fn credential(&self) -> Result<Option<Credential>, StoreError> {
		self.store.load(&self.config.credential_key).await
	}

	/// Stores the credential attached to outgoing calls (the login flow's hand-off point).
	pub async fn set_credential(&self, credential: Credential) -> Result<(), StoreError> {
		self.store.save(&self.config.credential_key, credential).await
	}

	/// Removes the stored credential so later calls go out unauthenticated.
	pub async fn clear_credential(&self) -> Result<Option<Credential>, StoreError> {
		self.store.remove(&self.config.credential_key).await
	}

	/// Sends `request`, attaching the stored credential and recovering from one 401.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: CallKind = CallKind::Request;

		let span = CallSpan::new(KIND, &request.path);

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span.instrument(self.send_with_recovery(request)).await;

		match &result {
			Ok(_) => obs::record_call_outcome(KIND, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(KIND, CallOutcome::Failure),
		}

		result
	}

	async fn send_with_recovery(&self, mut request: ApiRequest) -> Result<ApiResponse> {
		self.decorate(&mut request).await;

		let response = self.dispatch(&request).await?;

		if !response.is_unauthorized() || request.retried {
			return Self::classify(response, request.retried);
		}

		request.retried = true;

		let credential = self.refreshed_credential(&request).await?;

		request.authorization = Some(credential);

		let replay = CallSpan::new(CallKind::Replay, &request.path);

		obs::record_call_outcome(CallKind::Replay, CallOutcome::Attempt);

		let result = replay
			.instrument(async { Self::classify(self.dispatch(&request).await?, true) })
			.await;

		match &result {
			Ok(_) => obs::record_call_outcome(CallKind::Replay, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(CallKind::Replay, CallOutcome::Failure),
		}

		result
	}

	async fn decorate(&self, request: &mut ApiRequest) {
		match self.store.load(&self.config.credential_key).await {
			Ok(Some(credential)) => request.authorization = Some(credential),
			Ok(None) => {},
			Err(e) => tracing::warn!(
				path = %request.path,
				error = %e,
				"Credential store read failed; sending the request without a credential."
			),
		}
	}

	async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse> {
		let url = self.config.endpoint(&request.path)?;
		let response = self.transport.execute(url, request).await?;

		tracing::debug!(
			method = %request.method,
			path = %request.path,
			status = response.status,
			retried = request.retried,
			"Backend responded."
		);

		Ok(response)
	}

	fn classify(response: ApiResponse, retried: bool) -> Result<ApiResponse> {
		if response.is_success() {
			return Ok(response);
		}
		if response.is_unauthorized() && retried {
			return Err(Error::AuthorizationDenied { status: response.status });
		}

		Err(Error::Status { status: response.status, body: response.text() })
	}

	async fn refreshed_credential(&self, request: &ApiRequest) -> Result<Credential, RefreshError> {
		let lead = match self.refresh.join_or_lead() {
			Ticket::Follower(waiter) => {
				self.refresh_metrics.record_queued();
				tracing::debug!(path = %request.path, "Waiting on the in-flight credential refresh.");

				return waiter.await.unwrap_or(Err(RefreshError::Abandoned));
			},
			Ticket::Leader(lead) => lead,
		};
		let context =
			RefreshContext { rejected: request.authorization.clone(), path: request.path.clone() };
		let span = CallSpan::new(CallKind::Refresh, &request.path);

		self.refresh_metrics.record_attempt();
		obs::record_call_outcome(CallKind::Refresh, CallOutcome::Attempt);

		let outcome = span.instrument(self.run_refresher(context)).await;

		match &outcome {
			Ok(credential) => {
				if let Err(e) = self.set_credential(credential.clone()).await {
					tracing::warn!(error = %e, "Refreshed credential could not be persisted.");
				}

				self.refresh_metrics.record_success();
				obs::record_call_outcome(CallKind::Refresh, CallOutcome::Success);
			},
			Err(e) => {
				tracing::warn!(error = %e, "Credential refresh failed.");
				self.refresh_metrics.record_failure();
				obs::record_call_outcome(CallKind::Refresh, CallOutcome::Failure);
			},
		}

		let settled = lead.conclude(outcome.clone());

		tracing::debug!(settled, success = outcome.is_ok(), "Credential refresh concluded.");

		outcome
	}

	async fn run_refresher(&self, context: RefreshContext) -> Result<Credential, RefreshError> {
		let refresh = self.refresher.refresh(context);

		match self.config.refresh_timeout {
			Some(timeout) => tokio::time::timeout(timeout, refresh)
				.await
				.unwrap_or(Err(RefreshError::TimedOut { timeout })),
			None => refresh.await,
		}
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestHttpClient> {
	/// Creates a client backed by its own reqwest transport.
	pub fn new(config: ClientConfig) -> Result<Self> {
		let transport = ReqwestHttpClient::build(config.keep_cookies)?;

		Ok(Self::with_transport(config, transport))
	}
}
impl<T> Clone for ApiClient<T>
where
	T: HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			refresher: self.refresher.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			config: self.config.clone(),
			refresh: self.refresh.clone(),
		}
	}
}
impl<T> Debug for ApiClient<T>
where
	T: HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("credential_key", &self.config.credential_key)
			.field("refreshing", &self.is_refreshing())
			.finish()
	}
}
