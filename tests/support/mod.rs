//! Scripted transport and refresher shared by the integration tests.

#![allow(dead_code)]

// std
use std::{
	io,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};
// crates.io
use parking_lot::Mutex;
use tokio::sync::Notify;
// self
use storefront_client::{
	auth::{Credential, RefreshContext, RefreshError, RefreshFuture, TokenRefresher},
	config::ClientConfig,
	error::TransportError,
	http::{ApiRequest, ApiResponse, HttpTransport, Method, TransportFuture},
	url::Url,
};

pub const PRODUCTS_BODY: &str = r#"[{"id":"p-1","name":"Widget","price":"10.00"},{"id":"p-2","name":"Widget XL","price":"24.5"}]"#;

pub fn config() -> ClientConfig {
	ClientConfig::new("http://storefront.test").expect("Test origin should be a valid URL.")
}

/// What the scripted backend saw for one call.
#[derive(Clone, Debug)]
pub struct RecordedCall {
	pub method: Method,
	pub url: String,
	pub path: String,
	pub authorization: Option<String>,
	pub body: Option<serde_json::Value>,
	pub retried: bool,
}

/// In-process backend that answers 401 unless the request carries the accepted credential.
///
/// `/boom` always answers 500 and `/offline` fails at the transport level.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
	accepted: Option<String>,
	calls: Mutex<Vec<RecordedCall>>,
}
impl ScriptedTransport {
	/// Backend that accepts every request, authenticated or not.
	pub fn open() -> Self {
		Self::default()
	}

	/// Backend that only accepts `token`.
	pub fn accepting(token: &str) -> Self {
		Self { accepted: Some(token.to_owned()), calls: Mutex::default() }
	}

	pub fn calls(&self) -> Vec<RecordedCall> {
		self.calls.lock().clone()
	}

	fn respond(&self, request: &ApiRequest) -> ApiResponse {
		if request.path == "/boom" {
			return ApiResponse::new(500, "backend exploded");
		}

		let authorized = match &self.accepted {
			None => true,
			Some(token) =>
				request.authorization.as_ref().map(Credential::expose) == Some(token.as_str()),
		};

		if !authorized {
			return ApiResponse::new(401, r#"{"message":"Unauthorized"}"#);
		}

		match request.path.as_str() {
			"/welcome" => ApiResponse::new(200, r#""Welcome to the storefront!""#)
				.with_content_type("application/json"),
			"/products/get-all" =>
				ApiResponse::new(200, PRODUCTS_BODY).with_content_type("application/json"),
			_ => ApiResponse::new(404, "not found"),
		}
	}
}
impl HttpTransport for ScriptedTransport {
	fn execute<'a>(&'a self, url: Url, request: &'a ApiRequest) -> TransportFuture<'a> {
		self.calls.lock().push(RecordedCall {
			method: request.method,
			url: url.to_string(),
			path: request.path.clone(),
			authorization: request.authorization.as_ref().map(Credential::bearer),
			body: request.body.as_ref().map(|body| {
				serde_json::from_slice(body).expect("Request bodies should always be JSON.")
			}),
			retried: request.retried,
		});

		let outcome = if request.path == "/offline" {
			Err(TransportError::network(
				request.path.as_str(),
				io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
			))
		} else {
			Ok(self.respond(request))
		};

		Box::pin(async move { outcome })
	}
}

/// Refresher whose attempts block until [`GatedRefresher::release`] is called.
#[derive(Debug)]
pub struct GatedRefresher {
	gate: Arc<Notify>,
	outcome: Result<Credential, RefreshError>,
	calls: AtomicUsize,
	contexts: Mutex<Vec<RefreshContext>>,
}
impl GatedRefresher {
	pub fn succeeding(token: &str) -> Self {
		Self::with_outcome(Ok(Credential::new(token)))
	}

	pub fn failing(error: RefreshError) -> Self {
		Self::with_outcome(Err(error))
	}

	fn with_outcome(outcome: Result<Credential, RefreshError>) -> Self {
		Self {
			gate: Arc::new(Notify::new()),
			outcome,
			calls: AtomicUsize::new(0),
			contexts: Mutex::default(),
		}
	}

	/// Lets the current (or next) refresh attempt conclude.
	pub fn release(&self) {
		self.gate.notify_one();
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn contexts(&self) -> Vec<RefreshContext> {
		self.contexts.lock().clone()
	}
}
impl TokenRefresher for GatedRefresher {
	fn refresh(&self, context: RefreshContext) -> RefreshFuture<'_> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.contexts.lock().push(context);

		let gate = self.gate.clone();
		let outcome = self.outcome.clone();

		Box::pin(async move {
			gate.notified().await;

			outcome
		})
	}
}
